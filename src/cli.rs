//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::algorithm::{AlgorithmKind, StegoAlgorithm};
use crate::config::{AlgorithmConfig, BattleSettings, seed_from_password};
use crate::constants::{
    DEFAULT_INIT_SHOTS, DEFAULT_MOVE_AWAY, DEFAULT_SHOT_RANGE, DEFAULT_SHOTS_INCREASE,
};
use crate::error::Result;
use crate::filter::FilterKind;
use clap::{Args, Parser};
use std::path::PathBuf;

/// 一款在无损格式图像 (如 PNG, BMP) 中隐藏任意文件的自适应 LSB 隐写工具。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款在无损格式图像 (如 PNG, BMP) 中隐藏任意文件的自适应 LSB 隐写工具。\n提供五种放置算法，其中三种根据边缘检测滤波器挑选写入位置。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把文件内容隐藏进无损格式图像。
    Hide(HideArgs),

    /// 从经过隐写的图像中恢复隐藏的文件。
    Recover(RecoverArgs),

    /// 生成写入位置模拟图，不隐藏任何数据。
    Simulate(SimulateArgs),

    /// 显示图像在给定位范围下能容纳多少数据。
    Capacity(CapacityArgs),

    /// 列出所有放置算法及其说明。
    Algorithms,
}

/// 选择算法及其参数。编码和解码必须使用完全相同的取值。
#[derive(Args, Debug, Clone)]
pub struct AlgorithmArgs {
    /// 放置算法。
    #[arg(short, long, value_enum, default_value_t = AlgorithmKind::BlindHide)]
    pub algorithm: AlgorithmKind,

    /// 滤波器驱动的算法所用的滤波器。
    #[arg(long, value_enum, default_value_t = FilterKind::Laplace)]
    pub filter: FilterKind,

    /// 可写位范围的起始位 (0 为最低有效位)。
    #[arg(long, default_value_t = 0)]
    pub start_bit: u8,

    /// 可写位范围的结束位，最高为 6。
    #[arg(long, default_value_t = 0)]
    pub end_bit: u8,

    /// 使用 LSB 匹配 (±1) 代替直接替换。
    #[arg(long)]
    pub lsb_match: bool,

    /// 决定写入位置的密码。
    #[arg(short, long, conflicts_with = "seed")]
    pub password: Option<String>,

    /// 直接指定随机数种子。
    #[arg(long)]
    pub seed: Option<u64>,

    /// BattleSteg：追击多少发后强制离开。
    #[arg(long, default_value_t = DEFAULT_MOVE_AWAY)]
    pub move_away: u32,

    /// BattleSteg：首次命中后的测距射击次数。
    #[arg(long, default_value_t = DEFAULT_INIT_SHOTS)]
    pub init_shots: u32,

    /// BattleSteg：每次后续命中追加的射击次数。
    #[arg(long, default_value_t = DEFAULT_SHOTS_INCREASE)]
    pub shots_increase: u32,

    /// BattleSteg：测距射击的半径 (像素)。
    #[arg(long, default_value_t = DEFAULT_SHOT_RANGE)]
    pub shot_range: u32,
}

impl Default for AlgorithmArgs {
    fn default() -> Self {
        let battle = BattleSettings::default();
        Self {
            algorithm: AlgorithmKind::BlindHide,
            filter: FilterKind::Laplace,
            start_bit: 0,
            end_bit: 0,
            lsb_match: false,
            password: None,
            seed: None,
            move_away: battle.move_away,
            init_shots: battle.init_shots,
            shots_increase: battle.shots_increase,
            shot_range: battle.shot_range,
        }
    }
}

impl AlgorithmArgs {
    /// 把命令行参数组装成算法配置。
    ///
    /// # Errors
    ///
    /// 位范围或追击参数非法时返回 [`crate::error::StegoError::Configuration`]。
    pub fn config(&self) -> Result<AlgorithmConfig> {
        Ok(AlgorithmConfig::new(self.start_bit, self.end_bit)?
            .with_lsb_match(self.lsb_match)
            .with_filter(self.filter)
            .with_battle(BattleSettings {
                move_away: self.move_away,
                init_shots: self.init_shots,
                shots_increase: self.shots_increase,
                shot_range: self.shot_range,
            })?)
    }

    /// 显式种子优先，其次是密码；都没有时为 0。
    pub fn seed(&self) -> u64 {
        match (&self.seed, &self.password) {
            (Some(seed), _) => *seed,
            (None, Some(password)) => seed_from_password(password),
            (None, None) => 0,
        }
    }

    /// 构造所选算法。
    ///
    /// # Errors
    ///
    /// 同 [`AlgorithmArgs::config`]。
    pub fn build(&self) -> Result<Box<dyn StegoAlgorithm>> {
        Ok(self.algorithm.build(self.config()?))
    }
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 用于隐写的输入图像文件路径 (如 PNG, BMP)。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的文件路径，可以是任意二进制内容。
    #[arg(short, long)]
    pub text: PathBuf,

    /// 结果图像的输出路径，总是保存为 PNG。默认为 `doctored_<原文件名>.png`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub algorithm: AlgorithmArgs,
}

/// 'recover' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// 已隐藏数据的图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 恢复内容的输出路径。默认为 `recovered_<原文件名>.bin`。
    #[arg(short, long)]
    pub text: Option<PathBuf>,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub algorithm: AlgorithmArgs,
}

/// 'simulate' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// 载体图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 假想要隐藏的文件，只使用它的长度。
    #[arg(short, long)]
    pub text: PathBuf,

    /// 模拟图的输出路径。默认为 `simulated_<原文件名>.png`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub algorithm: AlgorithmArgs,
}

/// 'capacity' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct CapacityArgs {
    /// 载体图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 可选：检查该文件能否放入图像。
    #[arg(short, long)]
    pub text: Option<PathBuf>,

    /// 可写位范围的起始位。
    #[arg(long, default_value_t = 0)]
    pub start_bit: u8,

    /// 可写位范围的结束位。
    #[arg(long, default_value_t = 0)]
    pub end_bit: u8,
}
