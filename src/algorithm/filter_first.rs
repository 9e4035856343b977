use super::protocol::{self, BitWriter, Placement};
use super::{AlgorithmKind, Filterable, StegoAlgorithm};
use crate::config::{AlgorithmConfig, BitRange};
use crate::error::Result;
use crate::filter::{FilterKind, FilteredPixel, Salience, rank_all};
use crate::message::{BitSink, BitSource};
use crate::raster::{Raster, Shot};
use image::RgbImage;

/// 按排名依次消费像素。同一像素内先轮换位，再轮换通道。
#[derive(Debug, Clone)]
pub(crate) struct RankedScan {
    ranked: Vec<FilteredPixel>,
    bits: BitRange,
    position: u64,
}

impl RankedScan {
    pub(crate) fn new(ranked: Vec<FilteredPixel>, bits: BitRange) -> Self {
        Self {
            ranked,
            bits,
            position: 0,
        }
    }

    /// 跳过前 `count` 个地址。
    pub(crate) fn ignore(&mut self, count: u64) {
        self.position += count;
    }
}

impl Placement for RankedScan {
    fn next_shot(&mut self) -> Shot {
        let per_channel = u64::from(self.bits.len());
        let per_pixel = per_channel * 3;
        let pixel = self.ranked[(self.position / per_pixel) as usize];
        let within = self.position % per_pixel;
        self.position += 1;
        Shot::new(
            pixel.x,
            pixel.y,
            (within / per_channel) as u8,
            self.bits.start() + (within % per_channel) as u8,
        )
    }
}

/// 对整幅图像评分，按分数从高到低排出全部像素。
pub(crate) fn rank_pixels(raster: &Raster, config: &AlgorithmConfig) -> Vec<FilteredPixel> {
    let filter = config.filter().build(config.bits().scoring_range());
    rank_all(Salience::new(filter.as_ref(), raster).score_all())
}

/// 先写评分最高的像素。完全确定，种子只影响 LSB 匹配的方向。
#[derive(Debug, Clone, Default)]
pub struct FilterFirst {
    config: AlgorithmConfig,
}

impl FilterFirst {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self { config }
    }
}

impl StegoAlgorithm for FilterFirst {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::FilterFirst
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut scan = RankedScan::new(rank_pixels(cover, &self.config), self.config.bits());
        let boundary = self.config.bits().scoring_range().start();
        let mut writer = BitWriter::new(&self.config, boundary, seed);
        protocol::embed(&mut scan, message, cover, &mut writer)
    }

    fn decode(&self, stego: &Raster, _seed: u64, sink: &mut dyn BitSink) -> Result<u64> {
        protocol::ensure_header_fits(stego, self.config.bits())?;
        let mut scan = RankedScan::new(rank_pixels(stego, &self.config), self.config.bits());
        let header = protocol::read_header(&mut scan, stego);
        let body = protocol::message_bits(header, stego, self.config.bits())?;
        protocol::extract(&mut scan, stego, body, sink)
    }

    fn simulate(&self, message: &dyn BitSource, cover: &Raster, _seed: u64) -> Result<RgbImage> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut scan = RankedScan::new(rank_pixels(cover, &self.config), self.config.bits());
        Ok(protocol::simulate(
            &mut scan,
            message.byte_len(),
            cover.width(),
            cover.height(),
        ))
    }

    fn as_filterable(&self) -> Option<&dyn Filterable> {
        Some(self)
    }

    fn as_filterable_mut(&mut self) -> Option<&mut dyn Filterable> {
        Some(self)
    }
}

impl Filterable for FilterFirst {
    fn filter(&self) -> FilterKind {
        self.config.filter()
    }

    fn set_filter(&mut self, filter: FilterKind) {
        self.config = std::mem::take(&mut self.config).with_filter(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn cycles_bits_then_channels_within_a_pixel() {
        let ranked = vec![FilteredPixel::new(3, 4, 90), FilteredPixel::new(0, 1, 10)];
        let mut scan = RankedScan::new(ranked, BitRange::new(2, 3).unwrap());
        let shots: Vec<_> = (0..8).map(|_| scan.next_shot()).collect();
        assert_eq!(shots[0], Shot::new(3, 4, 0, 2));
        assert_eq!(shots[1], Shot::new(3, 4, 0, 3));
        assert_eq!(shots[2], Shot::new(3, 4, 1, 2));
        assert_eq!(shots[5], Shot::new(3, 4, 2, 3));
        assert_eq!(shots[6], Shot::new(0, 1, 0, 2));
        assert_eq!(shots[7], Shot::new(0, 1, 0, 3));
    }

    #[test]
    fn ignore_skips_addresses() {
        let ranked = vec![FilteredPixel::new(0, 0, 5), FilteredPixel::new(1, 0, 4)];
        let mut scan = RankedScan::new(ranked, BitRange::default());
        scan.ignore(4);
        assert_eq!(scan.next_shot(), Shot::new(1, 0, 1, 0));
    }

    #[test]
    fn brightest_edge_comes_first() {
        let mut image = RgbImage::from_pixel(8, 8, Rgb([0x40; 3]));
        image.put_pixel(6, 2, Rgb([0xf0; 3]));
        let raster = Raster::from_image(image);
        let ranked = rank_pixels(&raster, &AlgorithmConfig::default());
        assert_eq!(ranked.len(), 64);
        assert_eq!((ranked[0].x, ranked[0].y), (6, 2));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn writing_does_not_change_the_ranking() {
        let mut image =
            RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 0x77]));
        image.put_pixel(3, 3, Rgb([0xff, 0, 0xff]));
        let mut cover = Raster::from_image(image);
        let config = AlgorithmConfig::new(0, 2).unwrap().with_lsb_match(true);
        let before = rank_pixels(&cover, &config);

        let algorithm = FilterFirst::new(config.clone());
        let mut message = crate::message::MessageBits::from_bytes(b"edges").unwrap();
        algorithm.encode(&mut message, &mut cover, 12).unwrap();
        assert_eq!(rank_pixels(&cover, &config), before);
    }
}
