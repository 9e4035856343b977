//! # 放置算法模块
//!
//! 五种可互换的放置算法共享同一套协议 ([`StegoAlgorithm`])：
//! 容量检查、编码、解码和写入位置模拟。其中三种还由滤波器驱动，
//! 额外实现 [`Filterable`]。
//!
//! | 算法 | 地址顺序 | 随机性 | 滤波器 |
//! |------|----------|--------|--------|
//! | [`BlindHide`] | 光栅扫描 | 无 | 无 |
//! | [`HideSeek`] | 伪随机、避免碰撞 | 种子 | 无 |
//! | [`BattleSteg`] | 伪随机 + 船只附近追击 | 种子 | 有 |
//! | [`FilterFirst`] | 按评分从高到低 | 无 | 有 |
//! | [`DynamicFilterFirst`] | 同上，Top-K 选择 | 无 | 有 |
//!
//! 隐写图像不携带任何算法标识，解码端必须提供与编码时完全相同的
//! 算法、配置和种子。

mod battle_steg;
mod blind_hide;
mod dynamic_filter_first;
mod filter_first;
mod hide_seek;
pub mod protocol;

pub use battle_steg::{BattleSteg, Fleet, Mode, Pursuit};
pub use blind_hide::BlindHide;
pub use dynamic_filter_first::DynamicFilterFirst;
pub use filter_first::FilterFirst;
pub use hide_seek::HideSeek;

use crate::config::AlgorithmConfig;
use crate::error::{Result, StegoError};
use crate::filter::FilterKind;
use crate::message::{BitSink, BitSource};
use crate::raster::Raster;
use clap::ValueEnum;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// 所有放置算法共同遵守的协议。
///
/// 实现只读取自身持有的配置，调用期间配置不会改变。
pub trait StegoAlgorithm: fmt::Debug + Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    fn config(&self) -> &AlgorithmConfig;

    /// `message_len` 字节的消息能否放入 `cover`。不修改任何东西。
    fn capacity_check(&self, message_len: u64, cover: &Raster) -> bool {
        protocol::fits(message_len, cover, self.config().bits())
    }

    /// 把消息隐藏进 `cover`，直接修改图像。
    ///
    /// # Errors
    ///
    /// * 容量不足时返回 [`StegoError::Capacity`]，此时图像没有被修改。
    /// * 读取消息失败时返回 [`StegoError::Stream`]，此时图像可能已被部分修改，应当丢弃。
    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()>;

    /// 从隐写图像中恢复消息并写入 `sink`，返回恢复的字节数。
    ///
    /// # Errors
    ///
    /// * 长度头不合理时返回 [`StegoError::NoMessageFound`]。
    /// * 写出失败时返回 [`StegoError::Stream`]。
    fn decode(&self, stego: &Raster, seed: u64, sink: &mut dyn BitSink) -> Result<u64>;

    /// 生成一幅黑底图，标出编码时会触及的像素。不会隐藏任何数据。
    ///
    /// # Errors
    ///
    /// 容量不足时返回 [`StegoError::Capacity`]。
    fn simulate(&self, message: &dyn BitSource, cover: &Raster, seed: u64) -> Result<RgbImage>;

    /// 由滤波器驱动的算法返回自身的 [`Filterable`] 视图。
    fn as_filterable(&self) -> Option<&dyn Filterable> {
        None
    }

    fn as_filterable_mut(&mut self) -> Option<&mut dyn Filterable> {
        None
    }
}

/// 可更换滤波器的算法。
pub trait Filterable {
    fn filter(&self) -> FilterKind;

    fn set_filter(&mut self, filter: FilterKind);
}

/// 算法注册表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum AlgorithmKind {
    /// 从 (0,0) 开始按扫描线依次写入
    BlindHide,
    /// 伪随机地写入，避免重复地址
    HideSeek,
    /// 随机射击，命中 "船只" 后在附近追击
    BattleSteg,
    /// 按滤波器评分从高到低写入
    FilterFirst,
    /// 同 FilterFirst，但只保留所需的最高分像素
    DynamicFilterFirst,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::BlindHide,
        AlgorithmKind::HideSeek,
        AlgorithmKind::BattleSteg,
        AlgorithmKind::FilterFirst,
        AlgorithmKind::DynamicFilterFirst,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::BlindHide => "BlindHide",
            AlgorithmKind::HideSeek => "HideSeek",
            AlgorithmKind::BattleSteg => "BattleSteg",
            AlgorithmKind::FilterFirst => "FilterFirst",
            AlgorithmKind::DynamicFilterFirst => "DynamicFilterFirst",
        }
    }

    /// 算法是否使用滤波器。
    pub fn uses_filter(&self) -> bool {
        matches!(
            self,
            AlgorithmKind::BattleSteg
                | AlgorithmKind::FilterFirst
                | AlgorithmKind::DynamicFilterFirst
        )
    }

    pub fn explain(&self) -> &'static str {
        match self {
            AlgorithmKind::BlindHide => {
                "Starts writing at (0,0) and moves along each pixel, colour and bit in scan lines across the image."
            }
            AlgorithmKind::HideSeek => {
                "Randomly scatters the message over the image using the password as a seed, never writing the same bit twice."
            }
            AlgorithmKind::BattleSteg => {
                "Filters the image to find ships (good hiding places), shoots randomly until a ship is hit, then clusters shots around it for a while before moving away."
            }
            AlgorithmKind::FilterFirst => {
                "Ranks every pixel with an edge-detecting filter and writes to the best places first."
            }
            AlgorithmKind::DynamicFilterFirst => {
                "Works like FilterFirst but only keeps as many top-ranked pixels as the message needs."
            }
        }
    }

    /// 用给定配置构造算法实例。
    pub fn build(&self, config: AlgorithmConfig) -> Box<dyn StegoAlgorithm> {
        match self {
            AlgorithmKind::BlindHide => Box::new(BlindHide::new(config)),
            AlgorithmKind::HideSeek => Box::new(HideSeek::new(config)),
            AlgorithmKind::BattleSteg => Box::new(BattleSteg::new(config)),
            AlgorithmKind::FilterFirst => Box::new(FilterFirst::new(config)),
            AlgorithmKind::DynamicFilterFirst => Box::new(DynamicFilterFirst::new(config)),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = StegoError;

    /// 接受 `BattleSteg`、`battle-steg`、`battle_steg` 等写法。
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| StegoError::config(format!("unknown algorithm '{s}'")))
    }
}
