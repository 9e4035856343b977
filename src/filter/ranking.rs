//! 像素排名：完整排序与有界的在线 Top-K 选择。
//!
//! 两者使用同一个全序 (分数，x，y)，所以 Top-K 选出的序列
//! 与完整排序结果的前 K 项完全相同。

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// 带评分的像素位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilteredPixel {
    pub x: u32,
    pub y: u32,
    pub score: u32,
}

impl FilteredPixel {
    pub fn new(x: u32, y: u32, score: u32) -> Self {
        Self { x, y, score }
    }
}

impl Ord for FilteredPixel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then(self.x.cmp(&other.x))
            .then(self.y.cmp(&other.y))
    }
}

impl PartialOrd for FilteredPixel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 对全部像素按分数从高到低排序。
pub fn rank_all(pixels: impl IntoIterator<Item = FilteredPixel>) -> Vec<FilteredPixel> {
    let mut ranked: Vec<_> = pixels.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked
}

/// 只保留分数最高的 `k` 个像素。
///
/// 内部是一个大小不超过 `k` 的小顶堆：新像素比堆顶 (当前最小值) 大时
/// 弹出堆顶再插入，复杂度 `O(n log k)`，内存 `O(k)`。
#[derive(Debug, Clone)]
pub struct TopK {
    capacity: usize,
    heap: BinaryHeap<Reverse<FilteredPixel>>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1 << 20)),
        }
    }

    /// 提交一个候选像素，返回它是否 (暂时) 进入了前 K 名。
    pub fn offer(&mut self, pixel: FilteredPixel) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(pixel));
            return true;
        }
        match self.heap.peek() {
            Some(Reverse(min)) if pixel > *min => {
                self.heap.pop();
                self.heap.push(Reverse(pixel));
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 当前前 K 名中的最小值。
    pub fn min(&self) -> Option<FilteredPixel> {
        self.heap.peek().map(|Reverse(p)| *p)
    }

    /// 按分数从高到低输出选中的像素。
    pub fn into_ranked(self) -> Vec<FilteredPixel> {
        // `Reverse` 的升序就是像素的降序。
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(p)| p)
            .collect()
    }
}

impl Extend<FilteredPixel> for TopK {
    fn extend<I: IntoIterator<Item = FilteredPixel>>(&mut self, iter: I) {
        for pixel in iter {
            self.offer(pixel);
        }
    }
}
