//! # 命令处理逻辑模块
//!
//! 包含各个子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用放置算法以及向用户报告结果。

use crate::algorithm::{AlgorithmKind, protocol};
use crate::cli::{CapacityArgs, HideArgs, RecoverArgs, SimulateArgs};
use crate::config::BitRange;
use crate::message::{BitSource, MessageBits, MessageSink};
use crate::raster::Raster;
use anyhow::{Context, Result};
use colored::Colorize;
use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 在输入文件旁生成默认输出路径：`<prefix>_<原文件名>.<extension>`。
fn default_output(input: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{prefix}_{stem}.{extension}"))
}

/// 目标文件已存在且没有 `--force` 时拒绝继续。
fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

fn load_raster(path: &Path) -> Result<Raster> {
    let image = image::open(path).with_context(|| {
        format!(
            "Unable to read image file: {}",
            path.to_string_lossy().red().bold()
        )
    })?;
    debug!(width = image.width(), height = image.height(), path = %path.display(), "image loaded");
    Ok(Raster::from_dynamic(&image))
}

fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| {
            format!(
                "Unable to write to target image file: {}",
                path.to_string_lossy().red().bold()
            )
        })
}

fn open_message(path: &Path) -> Result<MessageBits<std::io::BufReader<fs::File>>> {
    MessageBits::open(path).with_context(|| {
        format!(
            "Unable to read message file: {}",
            path.to_string_lossy().red().bold()
        )
    })
}

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责读取图像和消息文件、检查隐写空间是否足够、调用所选算法隐藏消息，
/// 最后将结果保存为 PNG。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 目标文件已存在且没有指定 `--force`。
/// * 算法参数非法。
/// * 无法读取输入的图像或消息文件，或消息为空。
/// * 图像没有足够的空间来隐藏消息。
/// * 无法写入到目标图像文件。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| default_output(&args.image, "doctored", "png"));
    ensure_writable(&dest, args.force)?;

    let algorithm = args.algorithm.build()?;
    let mut cover = load_raster(&args.image)?;
    let mut message = open_message(&args.text)?;

    let message_len = message.byte_len();
    anyhow::ensure!(
        algorithm.capacity_check(message_len, &cover),
        "Not enough space in the image to hide the message. \nRequired: {} bits, Available: {} bits",
        protocol::required_bits(message_len).to_string().red().bold(),
        cover
            .usable_bits(algorithm.config().bits())
            .to_string()
            .green()
            .bold()
    );

    algorithm
        .encode(&mut message, &mut cover, args.algorithm.seed())
        .with_context(|| {
            format!(
                "Failed to hide {} with {}.",
                args.text.to_string_lossy().red().bold(),
                algorithm.kind()
            )
        })?;

    save_png(cover.image(), &dest)?;

    println!(
        "{} bytes hidden with {} and saved: {}",
        message_len.to_string().green(),
        algorithm.kind().to_string().cyan(),
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Recover' 命令的执行逻辑。
///
/// 用与隐藏时相同的算法、位范围和密码重放写入顺序，恢复消息后写入目标文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 目标文件已存在且没有指定 `--force`。
/// * 无法读取输入的图像文件。
/// * 图像在当前参数下不包含消息。
/// * 无法写入到目标文件。
pub fn handle_recover(args: RecoverArgs) -> Result<()> {
    let dest = args
        .text
        .clone()
        .unwrap_or_else(|| default_output(&args.image, "recovered", "bin"));
    ensure_writable(&dest, args.force)?;

    let algorithm = args.algorithm.build()?;
    let stego = load_raster(&args.image)?;

    let mut sink = MessageSink::new(Vec::new());
    let recovered = algorithm
        .decode(&stego, args.algorithm.seed(), &mut sink)
        .with_context(|| {
            format!(
                "Failed to recover a message from '{}'. \nThe image may not contain a hidden message, or the algorithm, bit range or password differ.",
                args.image.to_string_lossy().red().bold()
            )
        })?;
    let message = sink.finish().context("Failed to assemble the recovered bytes")?;

    fs::write(&dest, message).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "{} bytes recovered with {} and saved: {}",
        recovered.to_string().green(),
        algorithm.kind().to_string().cyan(),
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Simulate' 命令：生成写入位置模拟图。
///
/// # Errors
///
/// 目标文件已存在、参数非法、文件读写失败或容量不足时返回错误。
pub fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| default_output(&args.image, "simulated", "png"));
    ensure_writable(&dest, args.force)?;

    let algorithm = args.algorithm.build()?;
    let cover = load_raster(&args.image)?;
    let message = open_message(&args.text)?;

    let map = algorithm
        .simulate(&message, &cover, args.algorithm.seed())
        .with_context(|| format!("Not enough space to simulate {}.", algorithm.kind()))?;
    save_png(&map, &dest)?;

    println!(
        "Simulation of {} saved: {}",
        algorithm.kind().to_string().cyan(),
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Capacity' 命令：报告图像在给定位范围下的容量。
///
/// # Errors
///
/// 位范围非法或文件无法读取时返回错误。
pub fn handle_capacity(args: CapacityArgs) -> Result<()> {
    let bits = BitRange::writable(args.start_bit, args.end_bit)?;
    let cover = load_raster(&args.image)?;
    let usable = cover.usable_bits(bits);
    let overhead = protocol::required_bits(0);
    let max_bytes = usable.saturating_sub(overhead) / 8;

    println!(
        "{}×{} image, bits {}: {} usable bits, up to {} bytes of message",
        cover.width(),
        cover.height(),
        bits,
        usable.to_string().cyan(),
        max_bytes.to_string().green().bold()
    );

    if let Some(text) = &args.text {
        let len = fs::metadata(text)
            .with_context(|| {
                format!(
                    "Unable to read message file: {}",
                    text.to_string_lossy().red().bold()
                )
            })?
            .len();
        if protocol::fits(len, &cover, bits) {
            println!("{} ({len} bytes) {}", text.to_string_lossy(), "fits".green().bold());
        } else {
            println!(
                "{} ({len} bytes) {}",
                text.to_string_lossy(),
                "does not fit".red().bold()
            );
        }
    }
    Ok(())
}

/// 处理 'Algorithms' 命令：列出全部算法。
pub fn handle_algorithms() -> Result<()> {
    for kind in AlgorithmKind::ALL {
        let filter = if kind.uses_filter() { " [filter]" } else { "" };
        println!("{}{}", kind.name().cyan().bold(), filter.yellow());
        println!("    {}", kind.explain());
    }
    Ok(())
}
