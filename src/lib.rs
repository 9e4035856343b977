//! # inkhide 库
//!
//! 本库包含自适应 LSB 隐写引擎的核心逻辑：像素编解码、位流适配、
//! 边缘检测滤波器、由种子驱动的射击序列，以及五种可互换的放置算法。
//!
//! ```no_run
//! use inkhide::algorithm::AlgorithmKind;
//! use inkhide::config::{AlgorithmConfig, seed_from_password};
//! use inkhide::message::{MessageBits, MessageSink};
//! use inkhide::raster::Raster;
//!
//! # fn main() -> inkhide::error::Result<()> {
//! let mut cover = Raster::new(64, 64);
//! let algorithm = AlgorithmKind::HideSeek.build(AlgorithmConfig::new(0, 1)?);
//! let seed = seed_from_password("swordfish");
//!
//! let mut message = MessageBits::from_bytes(b"meet at dawn")?;
//! algorithm.encode(&mut message, &mut cover, seed)?;
//!
//! let mut sink = MessageSink::new(Vec::new());
//! algorithm.decode(&cover, seed, &mut sink)?;
//! assert_eq!(sink.finish()?, b"meet at dawn");
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod handler;
pub mod message;
pub mod occupancy;
pub mod raster;
pub mod shot;

pub use algorithm::{AlgorithmKind, Filterable, StegoAlgorithm};
pub use config::{AlgorithmConfig, BattleSettings, BitRange};
pub use error::{Result, StegoError};
pub use filter::{Filter, FilterKind};
pub use raster::{Raster, Shot};
