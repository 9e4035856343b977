//! # 滤波器模块
//!
//! 滤波器给每个像素打一个 "显著度" 分数 (边缘或噪声强度)，
//! 分数越高的位置越适合藏数据。评分时只使用配置的位范围，
//! 这样算法将要改写的低位就不会影响评分，解码端才能复现同样的排序。

mod gradient;
mod laplace;
pub mod ranking;

pub use gradient::{Prewitt, Sobel};
pub use laplace::Laplace;
pub use ranking::{FilteredPixel, TopK, rank_all};

use crate::config::BitRange;
use crate::error::{Result, StegoError};
use crate::raster::Raster;
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// 可插拔的像素评分规则。
pub trait Filter: fmt::Debug + Send + Sync {
    fn kind(&self) -> FilterKind;

    /// 参与评分的位范围。
    fn range(&self) -> BitRange;

    fn set_range(&mut self, range: BitRange);

    /// 修改评分范围的起始位。
    ///
    /// # Errors
    ///
    /// 新的起始位高于当前结束位时返回 [`StegoError::Configuration`]。
    fn set_start_range(&mut self, start: u8) -> Result<()> {
        let range = BitRange::new(start, self.range().end())?;
        self.set_range(range);
        Ok(())
    }

    /// 修改评分范围的结束位。
    ///
    /// # Errors
    ///
    /// 新的结束位低于当前起始位或超出通道时返回 [`StegoError::Configuration`]。
    fn set_end_range(&mut self, end: u8) -> Result<()> {
        let range = BitRange::new(self.range().start(), end)?;
        self.set_range(range);
        Ok(())
    }

    /// 像素 `(x, y)` 的显著度分数。坐标必须在图像内。
    fn value(&self, raster: &Raster, x: u32, y: u32) -> u32;
}

/// 已绑定到某幅图像上的滤波器。
#[derive(Debug, Clone, Copy)]
pub struct Salience<'a> {
    filter: &'a dyn Filter,
    raster: &'a Raster,
}

impl<'a> Salience<'a> {
    pub fn new(filter: &'a dyn Filter, raster: &'a Raster) -> Self {
        Self { filter, raster }
    }

    pub fn value(&self, x: u32, y: u32) -> u32 {
        self.filter.value(self.raster, x, y)
    }

    /// 对整幅图像逐像素评分，按列优先 (x 外层、y 内层) 的扫描顺序输出。
    pub fn score_all(&self) -> impl Iterator<Item = FilteredPixel> + '_ {
        let height = self.raster.height();
        (0..self.raster.width()).flat_map(move |x| {
            (0..height).map(move |y| FilteredPixel::new(x, y, self.value(x, y)))
        })
    }
}

/// 内置滤波器的注册表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FilterKind {
    /// 四邻域拉普拉斯算子
    Laplace,
    /// 3×3 Sobel 梯度
    Sobel,
    /// 3×3 Prewitt 梯度
    Prewitt,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [FilterKind::Laplace, FilterKind::Sobel, FilterKind::Prewitt];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Laplace => "laplace",
            FilterKind::Sobel => "sobel",
            FilterKind::Prewitt => "prewitt",
        }
    }

    /// 构造一个只在 `range` 内评分的滤波器。
    pub fn build(&self, range: BitRange) -> Box<dyn Filter> {
        match self {
            FilterKind::Laplace => Box::new(Laplace::new(range)),
            FilterKind::Sobel => Box::new(Sobel::new(range)),
            FilterKind::Prewitt => Box::new(Prewitt::new(range)),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StegoError::config(format!("unknown filter '{s}'")))
    }
}

/// 取一个像素三个通道经掩码后的值。
pub(crate) fn masked_channels(raster: &Raster, x: u32, y: u32, mask: u8) -> [i32; 3] {
    let [r, g, b] = raster.image().get_pixel(x, y).0;
    [
        i32::from(r & mask),
        i32::from(g & mask),
        i32::from(b & mask),
    ]
}
