use super::filter_first::RankedScan;
use super::protocol::{self, BitWriter};
use super::{AlgorithmKind, Filterable, StegoAlgorithm};
use crate::config::{AlgorithmConfig, BitRange};
use crate::constants::{HEADER_BITS, SAFETY_MARGIN_BITS, TOP_K_SLACK_PIXELS};
use crate::error::Result;
use crate::filter::{FilterKind, FilteredPixel, Salience, TopK};
use crate::message::{BitSink, BitSource};
use crate::raster::Raster;
use image::RgbImage;
use tracing::trace;

/// 写入 `bits_needed` 位需要多少个像素，外加少量余量，不超过像素总数。
fn pixels_needed(bits_needed: u64, bits: BitRange, raster: &Raster) -> usize {
    let per_pixel = u64::from(bits.len()) * 3;
    let pixels = usize::try_from(bits_needed.div_ceil(per_pixel)).unwrap_or(usize::MAX);
    pixels
        .saturating_add(TOP_K_SLACK_PIXELS)
        .min(raster.pixel_count())
}

/// 只保留写入 `bits_needed` 位所需的最高分像素，按分数从高到低返回。
fn select_top(raster: &Raster, config: &AlgorithmConfig, bits_needed: u64) -> Vec<FilteredPixel> {
    let k = pixels_needed(bits_needed, config.bits(), raster);
    let filter = config.filter().build(config.bits().scoring_range());
    let mut top = TopK::new(k);
    top.extend(Salience::new(filter.as_ref(), raster).score_all());
    trace!(k, kept = top.len(), "top-k selection done");
    top.into_ranked()
}

/// 与 FilterFirst 的写入顺序相同，但不对全图排序，
/// 只用一个有界的 Top-K 结构挑出消息实际需要的像素。
///
/// 解码分两遍：第一遍只选出足够读长度头的像素，
/// 第二遍按消息长度重新选择，并跳过已经读过的头部地址。
#[derive(Debug, Clone, Default)]
pub struct DynamicFilterFirst {
    config: AlgorithmConfig,
}

impl DynamicFilterFirst {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self { config }
    }

    fn scan(&self, raster: &Raster, bits_needed: u64) -> RankedScan {
        RankedScan::new(
            select_top(raster, &self.config, bits_needed),
            self.config.bits(),
        )
    }
}

impl StegoAlgorithm for DynamicFilterFirst {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::DynamicFilterFirst
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()> {
        let len = message.byte_len();
        protocol::ensure_capacity(len, cover, self.config.bits())?;
        let mut scan = self.scan(cover, protocol::required_bits(len));
        let boundary = self.config.bits().scoring_range().start();
        let mut writer = BitWriter::new(&self.config, boundary, seed);
        protocol::embed(&mut scan, message, cover, &mut writer)
    }

    fn decode(&self, stego: &Raster, _seed: u64, sink: &mut dyn BitSink) -> Result<u64> {
        protocol::ensure_header_fits(stego, self.config.bits())?;
        let mut header_scan = self.scan(stego, HEADER_BITS + SAFETY_MARGIN_BITS);
        let header = protocol::read_header(&mut header_scan, stego);
        let body = protocol::message_bits(header, stego, self.config.bits())?;

        let mut scan = self.scan(stego, HEADER_BITS + body + SAFETY_MARGIN_BITS);
        scan.ignore(HEADER_BITS);
        protocol::extract(&mut scan, stego, body, sink)
    }

    fn simulate(&self, message: &dyn BitSource, cover: &Raster, _seed: u64) -> Result<RgbImage> {
        let len = message.byte_len();
        protocol::ensure_capacity(len, cover, self.config.bits())?;
        let mut scan = self.scan(cover, protocol::required_bits(len));
        Ok(protocol::simulate(&mut scan, len, cover.width(), cover.height()))
    }

    fn as_filterable(&self) -> Option<&dyn Filterable> {
        Some(self)
    }

    fn as_filterable_mut(&mut self) -> Option<&mut dyn Filterable> {
        Some(self)
    }
}

impl Filterable for DynamicFilterFirst {
    fn filter(&self) -> FilterKind {
        self.config.filter()
    }

    fn set_filter(&mut self, filter: FilterKind) {
        self.config = std::mem::take(&mut self.config).with_filter(filter);
    }
}
