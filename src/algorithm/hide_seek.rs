use super::protocol::{self, BitWriter, Placement};
use super::{AlgorithmKind, StegoAlgorithm};
use crate::config::AlgorithmConfig;
use crate::constants::NO_FILTER_BOUNDARY;
use crate::error::Result;
use crate::message::{BitSink, BitSource};
use crate::occupancy::Occupancy;
use crate::raster::{Raster, Shot};
use crate::shot::ShotSequencer;
use image::RgbImage;

/// 从序列器抽取地址，遇到已占用的地址就重抽。
///
/// 容量已预先检查过，总有空闲地址，所以循环一定会结束。
#[derive(Debug)]
pub(crate) struct ScatterShots {
    sequencer: ShotSequencer,
    occupancy: Occupancy,
}

impl ScatterShots {
    pub(crate) fn new(seed: u64, raster: &Raster, config: &AlgorithmConfig) -> Self {
        Self {
            sequencer: ShotSequencer::new(
                seed,
                raster.width(),
                raster.height(),
                raster.layer_count(),
                config.bits(),
            ),
            occupancy: Occupancy::new(raster.width(), raster.height()),
        }
    }
}

impl Placement for ScatterShots {
    fn next_shot(&mut self) -> Shot {
        loop {
            let shot = self.sequencer.next_shot();
            if self.occupancy.insert(shot) {
                return shot;
            }
        }
    }
}

/// 伪随机散布算法。解码端用同一个种子重放完全相同的抽样和碰撞处理。
#[derive(Debug, Clone, Default)]
pub struct HideSeek {
    config: AlgorithmConfig,
}

impl HideSeek {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self { config }
    }
}

impl StegoAlgorithm for HideSeek {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::HideSeek
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut shots = ScatterShots::new(seed, cover, &self.config);
        let mut writer = BitWriter::new(&self.config, NO_FILTER_BOUNDARY, seed);
        protocol::embed(&mut shots, message, cover, &mut writer)
    }

    fn decode(&self, stego: &Raster, seed: u64, sink: &mut dyn BitSink) -> Result<u64> {
        protocol::ensure_header_fits(stego, self.config.bits())?;
        let mut shots = ScatterShots::new(seed, stego, &self.config);
        let header = protocol::read_header(&mut shots, stego);
        let body = protocol::message_bits(header, stego, self.config.bits())?;
        protocol::extract(&mut shots, stego, body, sink)
    }

    fn simulate(&self, message: &dyn BitSource, cover: &Raster, seed: u64) -> Result<RgbImage> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut shots = ScatterShots::new(seed, cover, &self.config);
        Ok(protocol::simulate(
            &mut shots,
            message.byte_len(),
            cover.width(),
            cover.height(),
        ))
    }
}
