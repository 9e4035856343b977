//! # 射击序列模块
//!
//! 由种子驱动的伪随机地址生成器。相同的种子与参数总是产生完全相同的地址流，
//! 解码端正是依靠这一点重建编码时的写入顺序。
//!
//! 所有区间抽样都使用 `u32`，保证在 32 位与 64 位平台上消耗相同的随机数。

use crate::config::BitRange;
use crate::raster::Shot;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Clone)]
pub struct ShotSequencer {
    rng: ChaCha20Rng,
    width: u32,
    height: u32,
    layers: u8,
    bits: BitRange,
    last: Option<Shot>,
}

impl ShotSequencer {
    /// `width`、`height`、`layers` 都必须大于 0。
    pub fn new(seed: u64, width: u32, height: u32, layers: u8, bits: BitRange) -> Self {
        debug_assert!(width > 0 && height > 0 && layers > 0);
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            width,
            height,
            layers,
            bits,
            last: None,
        }
    }

    fn channel_and_bit(&mut self) -> (u8, u8) {
        let channel = self.rng.random_range(0..u32::from(self.layers)) as u8;
        let bit = self
            .rng
            .random_range(u32::from(self.bits.start())..=u32::from(self.bits.end()))
            as u8;
        (channel, bit)
    }

    /// 在整幅图像上均匀抽取一个地址，并把它记为 "上一发"。
    pub fn next_shot(&mut self) -> Shot {
        let x = self.rng.random_range(0..self.width);
        let y = self.rng.random_range(0..self.height);
        let (channel, bit) = self.channel_and_bit();
        let shot = Shot::new(x, y, channel, bit);
        self.last = Some(shot);
        shot
    }

    /// 在上一发周围 `radius` 像素内 (裁剪到图像边界) 抽取一个地址。
    ///
    /// 不会更新 "上一发"，是否以新地址为中心由调用者通过 [`set_last`] 决定。
    /// 还没有上一发时退化为 [`next_shot`]。
    ///
    /// [`set_last`]: ShotSequencer::set_last
    /// [`next_shot`]: ShotSequencer::next_shot
    pub fn next_ranged_shot(&mut self, radius: u32) -> Shot {
        let Some(center) = self.last else {
            return self.next_shot();
        };
        let x_low = center.x.saturating_sub(radius);
        let x_high = center.x.saturating_add(radius).min(self.width - 1);
        let y_low = center.y.saturating_sub(radius);
        let y_high = center.y.saturating_add(radius).min(self.height - 1);

        let x = self.rng.random_range(x_low..=x_high);
        let y = self.rng.random_range(y_low..=y_high);
        let (channel, bit) = self.channel_and_bit();
        Shot::new(x, y, channel, bit)
    }

    pub fn set_last(&mut self, shot: Shot) {
        self.last = Some(shot);
    }

    pub fn last(&self) -> Option<Shot> {
        self.last
    }
}
