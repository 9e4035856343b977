//! # 常量模块
//!
//! 隐写引擎依赖的全部固定数值。编码与解码必须使用完全相同的值，
//! 否则两端无法重建相同的写入地址序列。

/// 消息长度头部占用的位数。
/// 长度以 `u32` 记录 (单位：字节)，写在前 32 个放置地址上。
pub const HEADER_BITS: u64 = 32;

/// 容量检查时在头部与消息之外额外预留的位数。
/// `HEADER_BITS + SAFETY_MARGIN_BITS == 50`。
pub const SAFETY_MARGIN_BITS: u64 = 18;

/// 每个像素可写的颜色层数 (红、绿、蓝)。
pub const LAYER_COUNT: u8 = 3;

/// 每个颜色通道的位数。
pub const CHANNEL_BITS: u8 = 8;

/// 可写位的最高位置。第 7 位始终留给滤波器评分使用。
pub const MAX_WRITABLE_BIT: u8 = 6;

/// 没有滤波器的算法在 LSB 匹配时使用的边界，即不保护任何高位。
pub const NO_FILTER_BOUNDARY: u8 = CHANNEL_BITS;

/// BattleSteg：连续测距射击多少次后强制离开当前区域。
pub const DEFAULT_MOVE_AWAY: u32 = 10;

/// BattleSteg：首次命中 "船只" 后给予的测距射击次数。
pub const DEFAULT_INIT_SHOTS: u32 = 5;

/// BattleSteg：每次后续命中追加的测距射击次数。
pub const DEFAULT_SHOTS_INCREASE: u32 = 2;

/// BattleSteg：测距射击的半径 (像素)。
pub const DEFAULT_SHOT_RANGE: u32 = 1;

/// BattleSteg：评分最高的 1/10 像素作为 "引擎"。
pub const ENGINE_FRACTION_DIVISOR: usize = 10;

/// BattleSteg：打乱同分引擎候选时使用的固定种子，与调用者的种子无关。
pub const ENGINE_SHUFFLE_SEED: u64 = 0;

/// 模拟图中被触及的像素每次变亮时或上的掩码。
pub const SIMULATION_MASK: u8 = 0x0f;

/// DynamicFilterFirst 在所需像素数之外多保留的像素数。
pub const TOP_K_SLACK_PIXELS: usize = 1;
