//! 所有放置算法共用的协议：容量检查、32 位长度头、消息体的写入与读出，以及写入位置模拟图。
//!
//! 长度头按 `i = 0..32` 的顺序写入整数的第 `i` 位，读取时把第 `i` 个读出的位
//! 放回第 `i` 位。两端迭代方向相同，所以头部可以精确往返。

use crate::config::{AlgorithmConfig, BitRange};
use crate::constants::{HEADER_BITS, SAFETY_MARGIN_BITS, SIMULATION_MASK};
use crate::error::{Result, StegoError};
use crate::message::{BitSink, BitSource};
use crate::raster::{Raster, Shot};
use image::RgbImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::debug;

/// 逐个给出写入地址的放置策略。编码和解码必须得到相同的地址序列。
pub trait Placement {
    fn next_shot(&mut self) -> Shot;
}

/// 隐藏 `message_len` 字节所需的总位数 (含长度头与安全余量)。
pub fn required_bits(message_len: u64) -> u64 {
    HEADER_BITS + message_len.saturating_mul(8) + SAFETY_MARGIN_BITS
}

/// 消息能否放入载体。纯函数，不修改任何东西。
pub fn fits(message_len: u64, cover: &Raster, bits: BitRange) -> bool {
    message_len <= i32::MAX as u64 && required_bits(message_len) <= cover.usable_bits(bits)
}

/// 容量不足时返回 [`StegoError::Capacity`]。必须在写入任何像素之前调用。
pub fn ensure_capacity(message_len: u64, cover: &Raster, bits: BitRange) -> Result<()> {
    let required = required_bits(message_len);
    let available = cover.usable_bits(bits);
    debug!(message_len, required, available, "capacity check");
    if fits(message_len, cover, bits) {
        Ok(())
    } else {
        Err(StegoError::Capacity {
            required,
            available,
        })
    }
}

/// 负责把单个位写进图像：直接替换，或做 LSB 匹配。
///
/// 匹配方向使用独立的随机数流，这样编码时抛硬币不会影响地址序列，
/// 解码端无需重放这些硬币。
#[derive(Debug)]
pub struct BitWriter {
    lsb_match: bool,
    boundary: u8,
    writable: BitRange,
    coins: ChaCha20Rng,
}

impl BitWriter {
    /// `boundary` 是滤波器开始评分的位；没有滤波器时为 8。
    pub fn new(config: &AlgorithmConfig, boundary: u8, seed: u64) -> Self {
        let mut coins = ChaCha20Rng::seed_from_u64(seed);
        coins.set_stream(1);
        Self {
            lsb_match: config.lsb_match(),
            boundary,
            writable: config.bits(),
            coins,
        }
    }

    pub fn write(&mut self, cover: &mut Raster, shot: Shot, bit: bool) {
        if self.lsb_match {
            let coin = self.coins.random_bool(0.5);
            cover.match_bit(shot, self.boundary, self.writable, bit, coin);
        } else {
            cover.set_bit(shot, bit);
        }
    }
}

/// 写入长度头，然后写入消息的全部位。
///
/// # Errors
///
/// 消息读取失败时返回 [`StegoError::Stream`]。
pub fn embed(
    placement: &mut dyn Placement,
    message: &mut dyn BitSource,
    cover: &mut Raster,
    writer: &mut BitWriter,
) -> Result<()> {
    let header = u32::try_from(message.byte_len()).map_err(|_| StegoError::Capacity {
        required: required_bits(message.byte_len()),
        available: cover.usable_bits(writer.writable),
    })?;
    for i in 0..HEADER_BITS {
        let shot = placement.next_shot();
        writer.write(cover, shot, (header >> i) & 1 == 1);
    }

    let mut written = 0u64;
    while let Some(bit) = message.next_bit()? {
        let shot = placement.next_shot();
        writer.write(cover, shot, bit);
        written += 1;
    }
    debug!(header, written, "message embedded");
    Ok(())
}

/// 图像连长度头都放不下时，不可能含有消息。必须在构造任何放置之前调用。
pub fn ensure_header_fits(stego: &Raster, bits: BitRange) -> Result<()> {
    let usable = stego.usable_bits(bits);
    if usable < HEADER_BITS {
        debug!(usable, "image too small for a header");
        return Err(StegoError::NoMessageFound);
    }
    Ok(())
}

/// 读出 32 位长度头。调用前须经过 [`ensure_header_fits`]。
pub fn read_header(placement: &mut dyn Placement, stego: &Raster) -> u32 {
    (0..HEADER_BITS).fold(0u32, |size, i| {
        let bit = u32::from(stego.get_bit(placement.next_shot()));
        size | bit << i
    })
}

/// 校验长度头并换算成消息体的位数。
///
/// 头部为负数、为 0，或者头部加消息体超过图像容量时，
/// 说明这幅图像在当前配置下没有可恢复的消息。
pub fn message_bits(header: u32, stego: &Raster, bits: BitRange) -> Result<u64> {
    let size = header as i32;
    if size <= 0 {
        debug!(size, "header is not a plausible length");
        return Err(StegoError::NoMessageFound);
    }
    let body = u64::from(size as u32) * 8;
    let usable = stego.usable_bits(bits);
    if body >= usable || HEADER_BITS + body > usable {
        debug!(body, usable, "header exceeds capacity");
        return Err(StegoError::NoMessageFound);
    }
    Ok(body)
}

/// 按放置顺序读出 `body_bits` 位写入 `sink`，返回写出的字节数。
pub fn extract(
    placement: &mut dyn Placement,
    stego: &Raster,
    body_bits: u64,
    sink: &mut dyn BitSink,
) -> Result<u64> {
    for _ in 0..body_bits {
        sink.push_bit(stego.get_bit(placement.next_shot()))?;
    }
    Ok(body_bits / 8)
}

/// 生成写入位置模拟图：底色全黑，每被触及一次就把像素调亮一级。
pub fn simulate(
    placement: &mut dyn Placement,
    message_len: u64,
    width: u32,
    height: u32,
) -> RgbImage {
    let mut map = RgbImage::new(width, height);
    let total = HEADER_BITS + message_len * 8;
    for _ in 0..total {
        let shot = placement.next_shot();
        let pixel = map.get_pixel_mut(shot.x, shot.y);
        for channel in pixel.0.iter_mut() {
            *channel = *channel << 1 | SIMULATION_MASK;
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageBits, MessageSink};

    /// 逐像素、逐通道扫描最低位的简单放置。
    struct Linear {
        width: u32,
        index: u32,
    }

    impl Placement for Linear {
        fn next_shot(&mut self) -> Shot {
            let pixel = self.index / 3;
            let shot = Shot::new(pixel % self.width, pixel / self.width, (self.index % 3) as u8, 0);
            self.index += 1;
            shot
        }
    }

    fn linear(width: u32) -> Linear {
        Linear { width, index: 0 }
    }

    #[test]
    fn header_round_trips() {
        let config = AlgorithmConfig::default();
        let mut values = vec![0u32, 1, 2, 0x8000_0000, 0xdead_beef, u32::MAX, 12345];
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        values.extend((0..50).map(|_| rng.random::<u32>()));

        for value in values {
            let mut cover = Raster::new(16, 16);
            let mut writer = BitWriter::new(&config, 8, 0);
            let mut placement = linear(16);
            for i in 0..HEADER_BITS {
                writer.write(&mut cover, placement.next_shot(), (value >> i) & 1 == 1);
            }
            assert_eq!(read_header(&mut linear(16), &cover), value);
        }
    }

    #[test]
    fn embed_then_extract() {
        let config = AlgorithmConfig::default();
        let mut cover = Raster::new(32, 32);
        let mut message = MessageBits::from_bytes(b"round trip").unwrap();
        let mut writer = BitWriter::new(&config, 8, 5);
        embed(&mut linear(32), &mut message, &mut cover, &mut writer).unwrap();

        let mut placement = linear(32);
        let header = read_header(&mut placement, &cover);
        assert_eq!(header, 10);
        let body = message_bits(header, &cover, config.bits()).unwrap();
        let mut sink = MessageSink::new(Vec::new());
        assert_eq!(extract(&mut placement, &cover, body, &mut sink).unwrap(), 10);
        assert_eq!(sink.finish().unwrap(), b"round trip");
    }

    #[test]
    fn implausible_headers_mean_no_message() {
        let stego = Raster::new(10, 10);
        let bits = BitRange::default();
        // 容量 300 位。
        assert!(matches!(message_bits(0, &stego, bits), Err(StegoError::NoMessageFound)));
        assert!(matches!(message_bits(u32::MAX, &stego, bits), Err(StegoError::NoMessageFound)));
        assert!(matches!(message_bits(34, &stego, bits), Err(StegoError::NoMessageFound)));
        assert_eq!(message_bits(33, &stego, bits).unwrap(), 264);
    }

    #[test]
    fn covers_without_room_for_a_header_hold_nothing() {
        let bits = BitRange::default();
        // 3×3 只有 27 位，4×3 有 36 位。
        for (width, height) in [(0, 0), (0, 7), (1, 1), (3, 3), (1, 10)] {
            let stego = Raster::new(width, height);
            assert!(
                matches!(ensure_header_fits(&stego, bits), Err(StegoError::NoMessageFound)),
                "{width}x{height}"
            );
        }
        assert!(ensure_header_fits(&Raster::new(4, 3), bits).is_ok());
        assert!(ensure_header_fits(&Raster::new(3, 3), BitRange::new(0, 1).unwrap()).is_ok());
    }

    #[test]
    fn capacity_includes_header_and_margin() {
        let cover = Raster::new(10, 10);
        let bits = BitRange::default();
        // 300 - 50 = 250 位可用于消息，即 31 字节。
        assert!(fits(31, &cover, bits));
        assert!(!fits(32, &cover, bits));
        let err = ensure_capacity(32, &cover, bits).unwrap_err();
        assert!(matches!(
            err,
            StegoError::Capacity {
                required: 306,
                available: 300
            }
        ));
    }

    #[test]
    fn simulation_brightens_touched_pixels() {
        let map = simulate(&mut linear(4), 1, 4, 4);
        // 40 次写入，每像素 3 次：前 13 个像素被触及。
        assert_eq!(map.get_pixel(0, 0).0, [0x3f; 3]);
        assert_eq!(map.get_pixel(1, 3).0, [0x0f; 3]);
        assert_eq!(map.get_pixel(2, 3).0, [0; 3]);
    }
}
