use super::{Filter, FilterKind, masked_channels};
use crate::config::BitRange;
use crate::raster::Raster;

/// 拉普拉斯滤波器。
///
/// 每个通道分别计算 `n · 中心 - (左 + 右 + 上 + 下)` 的绝对值再求和，
/// 其中 `n` 是实际存在的邻居数，图像边缘和角落的像素只使用存在的邻居。
/// 它同时反映边缘和噪声的强度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Laplace {
    range: BitRange,
}

impl Laplace {
    pub fn new(range: BitRange) -> Self {
        Self { range }
    }
}

impl Default for Laplace {
    /// 默认使用第 1 至第 7 位评分。
    fn default() -> Self {
        Self {
            range: BitRange::new(1, 7).unwrap_or_default(),
        }
    }
}

impl Filter for Laplace {
    fn kind(&self) -> FilterKind {
        FilterKind::Laplace
    }

    fn range(&self) -> BitRange {
        self.range
    }

    fn set_range(&mut self, range: BitRange) {
        self.range = range;
    }

    fn value(&self, raster: &Raster, x: u32, y: u32) -> u32 {
        let mask = self.range.mask();
        let (width, height) = (raster.width(), raster.height());

        let neighbours = [
            (x > 0).then(|| (x - 1, y)),
            (x + 1 < width).then(|| (x + 1, y)),
            (y > 0).then(|| (x, y - 1)),
            (y + 1 < height).then(|| (x, y + 1)),
        ];

        let mut count = 0;
        let mut sum = [0i32; 3];
        for (nx, ny) in neighbours.into_iter().flatten() {
            count += 1;
            let channels = masked_channels(raster, nx, ny, mask);
            for (total, value) in sum.iter_mut().zip(channels) {
                *total += value;
            }
        }

        let center = masked_channels(raster, x, y, mask);
        center
            .iter()
            .zip(sum)
            .map(|(&c, s)| (c * count - s).unsigned_abs())
            .sum()
    }
}
