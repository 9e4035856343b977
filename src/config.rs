//! # 算法配置模块
//!
//! [`AlgorithmConfig`] 是一次运行所需的全部参数。它是不可变的值：
//! 运行开始前构造，按值交给算法，运行期间不会被修改。
//! 需要并发运行的调用者各自克隆一份即可。

use crate::constants::{
    CHANNEL_BITS, DEFAULT_INIT_SHOTS, DEFAULT_MOVE_AWAY, DEFAULT_SHOTS_INCREASE,
    DEFAULT_SHOT_RANGE, MAX_WRITABLE_BIT,
};
use crate::error::{Result, StegoError};
use crate::filter::FilterKind;
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::RangeInclusive;

/// 通道内的一段连续位 `[start, end]`，0 为最低有效位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    start: u8,
    end: u8,
}

impl BitRange {
    /// 创建任意位范围，`start <= end <= 7`。
    ///
    /// # Errors
    ///
    /// 当 `start > end` 或 `end` 超出通道位数时返回 [`StegoError::Configuration`]。
    pub fn new(start: u8, end: u8) -> Result<Self> {
        if end >= CHANNEL_BITS {
            return Err(StegoError::config(format!(
                "bit {end} is outside the 0-{} channel range",
                CHANNEL_BITS - 1
            )));
        }
        if start > end {
            return Err(StegoError::config(format!(
                "start bit {start} must not be higher than end bit {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// 创建可写位范围。最高位必须留给滤波器，所以 `end <= 6`。
    ///
    /// # Errors
    ///
    /// 同 [`BitRange::new`]，另外 `end > 6` 时也会失败。
    pub fn writable(start: u8, end: u8) -> Result<Self> {
        if end > MAX_WRITABLE_BIT {
            return Err(StegoError::config(format!(
                "writable bits must lie in 0-{MAX_WRITABLE_BIT}, got end bit {end}"
            )));
        }
        Self::new(start, end)
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// 范围内的位数 (`end - start + 1`)。
    pub fn len(&self) -> u8 {
        self.end - self.start + 1
    }

    /// 范围至少包含一位，永远不为空。
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, bit: u8) -> bool {
        (self.start..=self.end).contains(&bit)
    }

    pub fn bits(&self) -> RangeInclusive<u8> {
        self.start..=self.end
    }

    /// 范围对应的字节掩码，例如 `[1, 3]` 为 `0b0000_1110`。
    pub fn mask(&self) -> u8 {
        let width = u32::from(self.len());
        let ones = ((1u16 << width) - 1) as u8;
        ones << self.start
    }

    /// 位于本范围之上的全部位，即滤波器评分使用的位。
    ///
    /// 可写范围的 `end` 不超过 6，因此结果总是非空的。
    pub fn scoring_range(&self) -> Self {
        Self {
            start: (self.end + 1).min(CHANNEL_BITS - 1),
            end: CHANNEL_BITS - 1,
        }
    }
}

impl Default for BitRange {
    fn default() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// BattleSteg 的追击参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleSettings {
    /// 进入追击后最多连续测距射击的次数，命中也不会延长。
    pub move_away: u32,
    /// 首次命中后给予的测距射击次数。
    pub init_shots: u32,
    /// 追击中每次命中追加的测距射击次数。
    pub shots_increase: u32,
    /// 测距射击相对于追击中心的最大距离 (像素)。
    pub shot_range: u32,
}

impl BattleSettings {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("move away", self.move_away),
            ("initial shots", self.init_shots),
            ("shot range", self.shot_range),
        ] {
            if value == 0 {
                return Err(StegoError::config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

impl Default for BattleSettings {
    fn default() -> Self {
        Self {
            move_away: DEFAULT_MOVE_AWAY,
            init_shots: DEFAULT_INIT_SHOTS,
            shots_increase: DEFAULT_SHOTS_INCREASE,
            shot_range: DEFAULT_SHOT_RANGE,
        }
    }
}

/// 一次编码或解码所需的完整配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmConfig {
    bits: BitRange,
    lsb_match: bool,
    filter: FilterKind,
    battle: BattleSettings,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            bits: BitRange::default(),
            lsb_match: false,
            filter: FilterKind::Laplace,
            battle: BattleSettings::default(),
        }
    }
}

impl AlgorithmConfig {
    /// 使用给定的可写位范围创建配置，其余参数取默认值。
    ///
    /// # Errors
    ///
    /// 位范围非法时返回 [`StegoError::Configuration`]。
    pub fn new(start_bit: u8, end_bit: u8) -> Result<Self> {
        Ok(Self {
            bits: BitRange::writable(start_bit, end_bit)?,
            ..Self::default()
        })
    }

    pub fn with_lsb_match(mut self, lsb_match: bool) -> Self {
        self.lsb_match = lsb_match;
        self
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    /// 替换 BattleSteg 的追击参数。
    ///
    /// # Errors
    ///
    /// `move_away`、`init_shots` 或 `shot_range` 为 0 时返回 [`StegoError::Configuration`]，
    /// 这些值会让追击永远不会发生。
    pub fn with_battle(mut self, battle: BattleSettings) -> Result<Self> {
        battle.validate()?;
        self.battle = battle;
        Ok(self)
    }

    pub fn bits(&self) -> BitRange {
        self.bits
    }

    pub fn lsb_match(&self) -> bool {
        self.lsb_match
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    pub fn battle(&self) -> BattleSettings {
        self.battle
    }
}

/// 把密码转换为伪随机数生成器的种子。
///
/// 取 SHA-256 摘要的前 8 个字节 (大端) 并保留低 60 位。空密码得到种子 0。
/// 注意这不是加密：密码只决定写入位置。
pub fn seed_from_password(password: &str) -> u64 {
    if password.is_empty() {
        return 0;
    }
    let digest = Sha256::digest(password.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) & 0x0fff_ffff_ffff_ffff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(matches!(
            BitRange::new(3, 1),
            Err(StegoError::Configuration(_))
        ));
    }

    #[test]
    fn writable_range_leaves_top_bit() {
        assert!(BitRange::writable(0, 6).is_ok());
        assert!(BitRange::writable(0, 7).is_err());
        assert!(AlgorithmConfig::new(2, 7).is_err());
    }

    #[test]
    fn masks_and_scoring_range() {
        let range = BitRange::new(1, 3).unwrap();
        assert_eq!(range.mask(), 0b0000_1110);
        assert_eq!(range.len(), 3);
        assert_eq!(range.scoring_range(), BitRange::new(4, 7).unwrap());
        assert_eq!(BitRange::new(0, 7).unwrap().mask(), 0xff);
    }

    #[test]
    fn battle_settings_need_a_pursuit() {
        let config = AlgorithmConfig::default();
        for battle in [
            BattleSettings {
                move_away: 0,
                ..BattleSettings::default()
            },
            BattleSettings {
                init_shots: 0,
                ..BattleSettings::default()
            },
            BattleSettings {
                shot_range: 0,
                ..BattleSettings::default()
            },
        ] {
            assert!(matches!(
                config.clone().with_battle(battle),
                Err(StegoError::Configuration(_))
            ));
        }
        let battle = BattleSettings {
            shots_increase: 0,
            ..BattleSettings::default()
        };
        assert_eq!(config.with_battle(battle).unwrap().battle(), battle);
    }

    #[test]
    fn password_seed_is_stable() {
        assert_eq!(seed_from_password(""), 0);
        let a = seed_from_password("correct horse");
        assert_eq!(a, seed_from_password("correct horse"));
        assert_ne!(a, seed_from_password("battery staple"));
        assert!(a < (1 << 60));
    }
}
