use super::protocol::{self, BitWriter, Placement};
use super::{AlgorithmKind, StegoAlgorithm};
use crate::config::{AlgorithmConfig, BitRange};
use crate::constants::NO_FILTER_BOUNDARY;
use crate::error::Result;
use crate::message::{BitSink, BitSource};
use crate::raster::{Raster, Shot};
use image::RgbImage;

/// 光栅扫描顺序：位变化最快，其次是通道、x，最后是 y。
/// 每个地址恰好访问一次，不需要占用记录。
#[derive(Debug, Clone)]
pub(crate) struct RasterScan {
    width: u32,
    bits: BitRange,
    count: u64,
}

impl RasterScan {
    pub(crate) fn new(width: u32, bits: BitRange) -> Self {
        Self {
            width,
            bits,
            count: 0,
        }
    }
}

impl Placement for RasterScan {
    fn next_shot(&mut self) -> Shot {
        let per_channel = u64::from(self.bits.len());
        let per_pixel = per_channel * 3;
        let within = self.count % per_pixel;
        let pixel = self.count / per_pixel;
        let width = u64::from(self.width);
        self.count += 1;
        Shot::new(
            (pixel % width) as u32,
            (pixel / width) as u32,
            (within / per_channel) as u8,
            self.bits.start() + (within % per_channel) as u8,
        )
    }
}

/// 最简单的基线算法：从 (0,0) 开始顺序写入。
///
/// 种子只影响 LSB 匹配时的加减方向。
#[derive(Debug, Clone, Default)]
pub struct BlindHide {
    config: AlgorithmConfig,
}

impl BlindHide {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self { config }
    }
}

impl StegoAlgorithm for BlindHide {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::BlindHide
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut scan = RasterScan::new(cover.width(), self.config.bits());
        let mut writer = BitWriter::new(&self.config, NO_FILTER_BOUNDARY, seed);
        protocol::embed(&mut scan, message, cover, &mut writer)
    }

    fn decode(&self, stego: &Raster, _seed: u64, sink: &mut dyn BitSink) -> Result<u64> {
        protocol::ensure_header_fits(stego, self.config.bits())?;
        let mut scan = RasterScan::new(stego.width(), self.config.bits());
        let header = protocol::read_header(&mut scan, stego);
        let body = protocol::message_bits(header, stego, self.config.bits())?;
        protocol::extract(&mut scan, stego, body, sink)
    }

    fn simulate(&self, message: &dyn BitSource, cover: &Raster, _seed: u64) -> Result<RgbImage> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut scan = RasterScan::new(cover.width(), self.config.bits());
        Ok(protocol::simulate(
            &mut scan,
            message.byte_len(),
            cover.width(),
            cover.height(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn scan_order_is_bit_channel_x_y() {
        let mut scan = RasterScan::new(2, BitRange::new(1, 2).unwrap());
        let shots: Vec<_> = (0..14).map(|_| scan.next_shot()).collect();
        assert_eq!(shots[0], Shot::new(0, 0, 0, 1));
        assert_eq!(shots[1], Shot::new(0, 0, 0, 2));
        assert_eq!(shots[2], Shot::new(0, 0, 1, 1));
        assert_eq!(shots[5], Shot::new(0, 0, 2, 2));
        assert_eq!(shots[6], Shot::new(1, 0, 0, 1));
        assert_eq!(shots[12], Shot::new(0, 1, 0, 1));
    }

    #[test]
    fn scan_visits_each_slot_once() {
        let bits = BitRange::new(0, 2).unwrap();
        let raster = Raster::new(5, 4);
        let total = raster.usable_bits(bits) as usize;
        let mut scan = RasterScan::new(5, bits);
        let seen: HashSet<_> = (0..total).map(|_| scan.next_shot()).collect();
        assert_eq!(seen.len(), total);
        assert!(seen.iter().all(|s| s.x < 5 && s.y < 4 && bits.contains(s.bit)));
    }
}
