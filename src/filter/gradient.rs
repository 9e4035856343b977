use super::{Filter, FilterKind, masked_channels};
use crate::config::BitRange;
use crate::raster::Raster;

/// 3×3 梯度幅值：`isqrt(gx² + gy²)`，三个通道分别计算后求和。
/// 图像边框上的像素返回 0。`weight` 是中间行/列的权重，Sobel 为 2，Prewitt 为 1。
fn gradient_magnitude(raster: &Raster, x: u32, y: u32, mask: u8, weight: i32) -> u32 {
    if x == 0 || y == 0 || x + 1 >= raster.width() || y + 1 >= raster.height() {
        return 0;
    }
    let at = |dx: i32, dy: i32| {
        masked_channels(
            raster,
            x.wrapping_add_signed(dx),
            y.wrapping_add_signed(dy),
            mask,
        )
    };

    let (left, left_up, left_down) = (at(-1, 0), at(-1, -1), at(-1, 1));
    let (right, right_up, right_down) = (at(1, 0), at(1, -1), at(1, 1));
    let (up, down) = (at(0, -1), at(0, 1));

    (0..3)
        .map(|c| {
            let gx = (weight * right[c] + right_up[c] + right_down[c])
                - (weight * left[c] + left_up[c] + left_down[c]);
            let gy = (weight * up[c] + left_up[c] + right_up[c])
                - (weight * down[c] + left_down[c] + right_down[c]);
            (gx * gx + gy * gy).unsigned_abs().isqrt()
        })
        .sum()
}

/// Sobel 边缘检测滤波器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sobel {
    range: BitRange,
}

impl Sobel {
    pub fn new(range: BitRange) -> Self {
        Self { range }
    }
}

impl Filter for Sobel {
    fn kind(&self) -> FilterKind {
        FilterKind::Sobel
    }

    fn range(&self) -> BitRange {
        self.range
    }

    fn set_range(&mut self, range: BitRange) {
        self.range = range;
    }

    fn value(&self, raster: &Raster, x: u32, y: u32) -> u32 {
        gradient_magnitude(raster, x, y, self.range.mask(), 2)
    }
}

/// Prewitt 边缘检测滤波器，结构与 Sobel 相同，只是权重全为 1。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prewitt {
    range: BitRange,
}

impl Prewitt {
    pub fn new(range: BitRange) -> Self {
        Self { range }
    }
}

impl Filter for Prewitt {
    fn kind(&self) -> FilterKind {
        FilterKind::Prewitt
    }

    fn range(&self) -> BitRange {
        self.range
    }

    fn set_range(&mut self, range: BitRange) {
        self.range = range;
    }

    fn value(&self, raster: &Raster, x: u32, y: u32) -> u32 {
        gradient_magnitude(raster, x, y, self.range.mask(), 1)
    }
}
