//! # 错误类型模块
//!
//! 库内所有失败都归入 [`StegoError`]。命令行层再用 `anyhow` 附加上下文。

use std::io;
use thiserror::Error;

/// 隐写编码、解码过程中可能出现的错误。
#[derive(Error, Debug)]
pub enum StegoError {
    /// 配置非法 (位范围越界、起始位大于结束位等)。构造时立即失败，不会重试。
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// 消息无法放入载体图像。在修改任何像素之前检查。
    #[error("Not enough space in the image: required {required} bits, available {available} bits")]
    Capacity { required: u64, available: u64 },

    /// 读取消息或写出结果时发生 I/O 错误。
    #[error("Stream error: {0}")]
    Stream(#[from] io::Error),

    /// 使用当前的密码、算法和配置无法恢复出任何消息。
    #[error("No hidden message found with this password, algorithm and configuration")]
    NoMessageFound,

    /// 消息为空，没有可隐藏的内容。
    #[error("The message is empty")]
    EmptyMessage,
}

impl StegoError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// 库内统一使用的 `Result` 别名。
pub type Result<T> = std::result::Result<T, StegoError>;
