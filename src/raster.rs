//! # 像素编解码模块
//!
//! 把一幅 `宽 × 高 × 3 通道 × 8 位` 的图像包装为可按 `(x, y, 通道, 位)`
//! 寻址的位空间。通道 0/1/2 分别是红/绿/蓝。

use crate::config::BitRange;
use crate::constants::{CHANNEL_BITS, LAYER_COUNT};
use image::{DynamicImage, RgbImage};

/// 一个可写位的地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shot {
    pub x: u32,
    pub y: u32,
    pub channel: u8,
    pub bit: u8,
}

impl Shot {
    pub fn new(x: u32, y: u32, channel: u8, bit: u8) -> Self {
        Self { x, y, channel, bit }
    }
}

/// 可逐位读写的 RGB 图像。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    image: RgbImage,
}

impl Raster {
    /// 创建一幅全黑图像。
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// 从任意解码后的图像构造。透明通道会被丢弃。
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn layer_count(&self) -> u8 {
        LAYER_COUNT
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// 给定可写位范围时图像能承载的总位数：
    /// `宽 · 高 · 层数 · (end - start + 1)`。
    pub fn usable_bits(&self, range: BitRange) -> u64 {
        u64::from(self.width())
            * u64::from(self.height())
            * u64::from(self.layer_count())
            * u64::from(range.len())
    }

    /// 读取一个通道的原始值。
    pub fn channel(&self, x: u32, y: u32, channel: u8) -> u8 {
        self.image.get_pixel(x, y).0[usize::from(channel)]
    }

    fn channel_mut(&mut self, x: u32, y: u32, channel: u8) -> &mut u8 {
        &mut self.image.get_pixel_mut(x, y).0[usize::from(channel)]
    }

    /// 像素打包为整数：红在最低字节，其后是绿、蓝。
    /// 因此通道 `c` 的第 `i` 位就是 `(packed >> (c * 8 + i)) & 1`。
    pub fn packed(&self, x: u32, y: u32) -> u32 {
        let [r, g, b] = self.image.get_pixel(x, y).0;
        u32::from(r) | u32::from(g) << 8 | u32::from(b) << 16
    }

    pub fn get_bit(&self, shot: Shot) -> bool {
        let layer_pos = u32::from(shot.channel) * u32::from(CHANNEL_BITS) + u32::from(shot.bit);
        (self.packed(shot.x, shot.y) >> layer_pos) & 1 == 1
    }

    /// 直接把目标位设为 `value`。
    pub fn set_bit(&mut self, shot: Shot, value: bool) {
        let slot = self.channel_mut(shot.x, shot.y, shot.channel);
        let mask = 1u8 << shot.bit;
        if value {
            *slot |= mask;
        } else {
            *slot &= !mask;
        }
    }

    /// LSB 匹配：目标位已经等于 `desired` 时不做任何修改，
    /// 否则把通道值加或减 `2^bit`，使目标位翻转。
    ///
    /// 候选值必须落在 `0..=255` 内，并且除目标位以外不能改动可写范围
    /// `writable` 中的位，也不能改动 `boundary` 及以上的位 (滤波器评分用的位)。
    /// 两个候选都合法时由 `coin_flip` 决定方向。不产生进位的那个候选总是合法的。
    pub fn match_bit(
        &mut self,
        shot: Shot,
        boundary: u8,
        writable: BitRange,
        desired: bool,
        coin_flip: bool,
    ) {
        let value = self.channel(shot.x, shot.y, shot.channel);
        if ((value >> shot.bit) & 1 == 1) == desired {
            return;
        }

        let target = 1u8 << shot.bit;
        let above_boundary = !(((1u16 << boundary.min(CHANNEL_BITS)) - 1) as u8);
        let locked = (writable.mask() & !target) | above_boundary;
        let admissible = |candidate: u8| (candidate ^ value) & locked == 0;

        let step = u16::from(target);
        let up = u16::from(value) + step;
        let up = u8::try_from(up).ok().filter(|&v| admissible(v));
        let down = value.checked_sub(target).filter(|&v| admissible(v));

        let chosen = match (up, down) {
            (Some(up), Some(down)) => {
                if coin_flip {
                    up
                } else {
                    down
                }
            }
            (Some(up), None) => up,
            (None, Some(down)) => down,
            // 不进位的方向只改动目标位，总是合法；这里仅作兜底。
            (None, None) => value ^ target,
        };
        *self.channel_mut(shot.x, shot.y, shot.channel) = chosen;
    }
}

impl From<RgbImage> for Raster {
    fn from(image: RgbImage) -> Self {
        Self::from_image(image)
    }
}
