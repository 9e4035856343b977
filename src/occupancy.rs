//! # 占用记录模块
//!
//! 一次运行内已使用地址的扁平位集合，以及 BattleSteg 的船只网格。
//! 两者都在调用开始时按图像尺寸分配，调用结束即释放。

use crate::constants::{CHANNEL_BITS, LAYER_COUNT};
use crate::raster::Shot;

/// 按下标寻址的定长位集合。
#[derive(Debug, Clone, PartialEq, Eq)]
struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.words[index / 64] >> (index % 64) & 1 == 1
    }

    /// 置位，返回该位之前是否为空。
    fn set(&mut self, index: usize) -> bool {
        debug_assert!(index < self.len);
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }

    fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// 每个 `(x, y, 通道, 位)` 地址一位的占用表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    width: u32,
    taken: BitSet,
}

impl Occupancy {
    pub fn new(width: u32, height: u32) -> Self {
        let slots =
            width as usize * height as usize * usize::from(LAYER_COUNT) * usize::from(CHANNEL_BITS);
        Self {
            width,
            taken: BitSet::new(slots),
        }
    }

    fn index(&self, shot: Shot) -> usize {
        let pixel = shot.y as usize * self.width as usize + shot.x as usize;
        (pixel * usize::from(LAYER_COUNT) + usize::from(shot.channel)) * usize::from(CHANNEL_BITS)
            + usize::from(shot.bit)
    }

    pub fn contains(&self, shot: Shot) -> bool {
        self.taken.get(self.index(shot))
    }

    /// 占用一个地址。地址此前已被占用时返回 `false`。
    pub fn insert(&mut self, shot: Shot) -> bool {
        let index = self.index(shot);
        self.taken.set(index)
    }

    pub fn len(&self) -> usize {
        self.taken.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 每个像素一位的船只标记。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipGrid {
    width: u32,
    ships: BitSet,
}

impl ShipGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            ships: BitSet::new(width as usize * height as usize),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn mark(&mut self, x: u32, y: u32) {
        let index = self.index(x, y);
        self.ships.set(index);
    }

    pub fn is_ship(&self, x: u32, y: u32) -> bool {
        self.ships.get(self.index(x, y))
    }

    pub fn count(&self) -> usize {
        self.ships.count_ones()
    }
}
