//! BattleSteg：先在图像上找出 "船只"，然后像玩海战棋一样射击。
//!
//! 第一阶段按滤波器评分找出最显著的 10% 像素作为引擎，引擎四邻域中
//! 评分不低于中位数的像素被标为船只；至少有一个这样的邻居时，引擎本身也是船只。第二阶段在全图随机射击，
//! 命中船只后转入追击，在命中点附近做测距射击，直到预算耗尽。

use super::protocol::{self, BitWriter, Placement};
use super::{AlgorithmKind, Filterable, StegoAlgorithm};
use crate::config::{AlgorithmConfig, BattleSettings};
use crate::constants::{ENGINE_FRACTION_DIVISOR, ENGINE_SHUFFLE_SEED};
use crate::error::Result;
use crate::filter::{Filter, FilterKind, FilteredPixel, Salience};
use crate::message::{BitSink, BitSource};
use crate::occupancy::{Occupancy, ShipGrid};
use crate::raster::{Raster, Shot};
use crate::shot::ShotSequencer;
use image::RgbImage;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

/// 船只网格。只依赖评分位，编码前后计算结果一致。
#[derive(Debug, Clone)]
pub struct Fleet {
    ships: ShipGrid,
    engines: usize,
    median: u32,
}

impl Fleet {
    /// 用 `filter` 给 `raster` 的全部像素评分，找出引擎并标记船只。
    pub fn discover(raster: &Raster, filter: &dyn Filter) -> Self {
        let (width, height) = (raster.width(), raster.height());
        let mut sorted: Vec<FilteredPixel> = Salience::new(filter, raster).score_all().collect();
        sorted.sort_unstable();

        let mut ships = ShipGrid::new(width, height);
        let engine_count = sorted.len() / ENGINE_FRACTION_DIVISOR;
        let median = sorted.get(sorted.len() / 2).map_or(0, |p| p.score);
        if engine_count == 0 {
            debug!(pixels = sorted.len(), "image too small for engines");
            return Self {
                ships,
                engines: 0,
                median,
            };
        }

        // 引擎分界线上的同分像素先打乱，再决定谁进入前 10%。
        let boundary = sorted.len() - engine_count;
        let tied = sorted[boundary].score;
        let run_start = sorted[..boundary].partition_point(|p| p.score < tied);
        let run_end = boundary + sorted[boundary..].partition_point(|p| p.score == tied);
        let mut rng = ChaCha20Rng::seed_from_u64(ENGINE_SHUFFLE_SEED);
        sorted[run_start..run_end].shuffle(&mut rng);

        let scores = |x: u32, y: u32| filter.value(raster, x, y);
        for engine in &sorted[boundary..] {
            let mut crew = 0;
            for (x, y) in neighbours(engine.x, engine.y, width, height) {
                if scores(x, y) >= median {
                    ships.mark(x, y);
                    crew += 1;
                }
            }
            // 孤立的引擎不算船。
            if crew > 0 {
                ships.mark(engine.x, engine.y);
            }
        }
        debug!(
            engines = engine_count,
            ships = ships.count(),
            median,
            "fleet discovered"
        );
        Self {
            ships,
            engines: engine_count,
            median,
        }
    }

    pub fn is_ship(&self, x: u32, y: u32) -> bool {
        self.ships.is_ship(x, y)
    }

    pub fn ship_count(&self) -> usize {
        self.ships.count()
    }

    pub fn engine_count(&self) -> usize {
        self.engines
    }

    pub fn median(&self) -> u32 {
        self.median
    }
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = x.checked_sub(1).map(|x| (x, y));
    let right = (x + 1 < width).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|y| (x, y));
    let down = (y + 1 < height).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

/// 射击模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 在全图随机射击
    Explore,
    /// 在上一次命中附近测距射击
    Exploit,
}

/// 探索/追击状态机。两个计数器任一为 0 即处于探索模式。
///
/// 所有转移都是纯函数：接收旧状态，返回新状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pursuit {
    pub shots_left: u32,
    pub move_away_left: u32,
}

impl Pursuit {
    pub fn mode(self) -> Mode {
        if self.shots_left == 0 || self.move_away_left == 0 {
            Mode::Explore
        } else {
            Mode::Exploit
        }
    }

    /// 探索中命中船只：重新装填两个计数器。
    pub fn engage(self, settings: &BattleSettings) -> Self {
        Self {
            shots_left: settings.init_shots,
            move_away_left: settings.move_away,
        }
    }

    /// 打出一发测距射击。
    pub fn spend(self) -> Self {
        Self {
            shots_left: self.shots_left.saturating_sub(1),
            move_away_left: self.move_away_left.saturating_sub(1),
        }
    }

    /// 追击中再次命中：追加测距射击次数。
    pub fn on_hit(self, increase: u32) -> Self {
        Self {
            shots_left: self.shots_left.saturating_add(increase),
            ..self
        }
    }
}

/// 一发射击，以及追击时它所围绕的中心。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Salvo {
    pub shot: Shot,
    pub center: Option<Shot>,
}

#[derive(Debug)]
pub(crate) struct Shooter {
    fleet: Fleet,
    settings: BattleSettings,
    sequencer: ShotSequencer,
    occupancy: Occupancy,
    pursuit: Pursuit,
}

impl Shooter {
    pub(crate) fn new(seed: u64, raster: &Raster, config: &AlgorithmConfig) -> Self {
        let filter = config.filter().build(config.bits().scoring_range());
        Self {
            fleet: Fleet::discover(raster, filter.as_ref()),
            settings: config.battle(),
            sequencer: ShotSequencer::new(
                seed,
                raster.width(),
                raster.height(),
                raster.layer_count(),
                config.bits(),
            ),
            occupancy: Occupancy::new(raster.width(), raster.height()),
            pursuit: Pursuit::default(),
        }
    }

    pub(crate) fn next_salvo(&mut self) -> Salvo {
        loop {
            match self.pursuit.mode() {
                Mode::Explore => {
                    let shot = self.sequencer.next_shot();
                    if !self.occupancy.insert(shot) {
                        continue;
                    }
                    if self.fleet.is_ship(shot.x, shot.y) {
                        trace!(x = shot.x, y = shot.y, "ship hit, pursuing");
                        self.pursuit = self.pursuit.engage(&self.settings);
                    }
                    return Salvo { shot, center: None };
                }
                Mode::Exploit => {
                    self.pursuit = self.pursuit.spend();
                    let center = self.sequencer.last();
                    let shot = self.sequencer.next_ranged_shot(self.settings.shot_range);
                    if !self.occupancy.insert(shot) {
                        continue;
                    }
                    if self.fleet.is_ship(shot.x, shot.y) {
                        self.pursuit = self.pursuit.on_hit(self.settings.shots_increase);
                        self.sequencer.set_last(shot);
                    }
                    return Salvo { shot, center };
                }
            }
        }
    }
}

impl Placement for Shooter {
    fn next_shot(&mut self) -> Shot {
        self.next_salvo().shot
    }
}

#[derive(Debug, Clone, Default)]
pub struct BattleSteg {
    config: AlgorithmConfig,
}

impl BattleSteg {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self { config }
    }

    fn boundary(&self) -> u8 {
        self.config.bits().scoring_range().start()
    }
}

impl StegoAlgorithm for BattleSteg {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::BattleSteg
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn encode(&self, message: &mut dyn BitSource, cover: &mut Raster, seed: u64) -> Result<()> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut shooter = Shooter::new(seed, cover, &self.config);
        let mut writer = BitWriter::new(&self.config, self.boundary(), seed);
        protocol::embed(&mut shooter, message, cover, &mut writer)
    }

    fn decode(&self, stego: &Raster, seed: u64, sink: &mut dyn BitSink) -> Result<u64> {
        protocol::ensure_header_fits(stego, self.config.bits())?;
        let mut shooter = Shooter::new(seed, stego, &self.config);
        let header = protocol::read_header(&mut shooter, stego);
        let body = protocol::message_bits(header, stego, self.config.bits())?;
        protocol::extract(&mut shooter, stego, body, sink)
    }

    fn simulate(&self, message: &dyn BitSource, cover: &Raster, seed: u64) -> Result<RgbImage> {
        protocol::ensure_capacity(message.byte_len(), cover, self.config.bits())?;
        let mut shooter = Shooter::new(seed, cover, &self.config);
        Ok(protocol::simulate(
            &mut shooter,
            message.byte_len(),
            cover.width(),
            cover.height(),
        ))
    }

    fn as_filterable(&self) -> Option<&dyn Filterable> {
        Some(self)
    }

    fn as_filterable_mut(&mut self) -> Option<&mut dyn Filterable> {
        Some(self)
    }
}

impl Filterable for BattleSteg {
    fn filter(&self) -> FilterKind {
        self.config.filter()
    }

    fn set_filter(&mut self, filter: FilterKind) {
        self.config = std::mem::take(&mut self.config).with_filter(filter);
    }
}
