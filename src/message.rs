//! # 位流适配模块
//!
//! [`MessageBits`] 把任意字节流按最高位优先的顺序展开成位序列，
//! [`MessageSink`] 则把位重新拼成字节并写出。两者都只在一次运行中持有底层句柄。

use crate::error::{Result, StegoError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// 按顺序提供待隐藏消息的每一位，并预先知道消息的字节长度。
pub trait BitSource {
    /// 消息的总字节数。
    fn byte_len(&self) -> u64;

    /// 下一位；消息读完后返回 `None`。
    fn next_bit(&mut self) -> io::Result<Option<bool>>;
}

/// 接收恢复出来的每一位。
pub trait BitSink {
    fn push_bit(&mut self, bit: bool) -> io::Result<()>;
}

/// 从读取器中逐位读出消息，字节内最高位在前。
#[derive(Debug)]
pub struct MessageBits<R: Read> {
    reader: R,
    len: u64,
    bytes_read: u64,
    current: u8,
    remaining_bits: u8,
}

impl<R: Read> MessageBits<R> {
    /// 用给定的读取器和声明的字节长度创建位流。
    ///
    /// # Errors
    ///
    /// 长度为 0 时返回 [`StegoError::EmptyMessage`]。
    pub fn new(reader: R, len: u64) -> Result<Self> {
        if len == 0 {
            return Err(StegoError::EmptyMessage);
        }
        Ok(Self {
            reader,
            len,
            bytes_read: 0,
            current: 0,
            remaining_bits: 0,
        })
    }

    /// 是否还有未读出的位。
    pub fn not_finished(&self) -> bool {
        self.remaining_bits > 0 || self.bytes_read < self.len
    }

    /// 归还底层读取器。
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<'a> MessageBits<&'a [u8]> {
    /// 直接从内存中的字节切片创建位流。
    ///
    /// # Errors
    ///
    /// 切片为空时返回 [`StegoError::EmptyMessage`]。
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Self::new(bytes, bytes.len() as u64)
    }
}

impl MessageBits<BufReader<File>> {
    /// 打开一个文件作为消息，长度取自文件元数据。
    ///
    /// # Errors
    ///
    /// 文件无法打开时返回 [`StegoError::Stream`]；文件为空时返回
    /// [`StegoError::EmptyMessage`]。
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Self::new(BufReader::new(file), len)
    }
}

impl<R: Read> BitSource for MessageBits<R> {
    fn byte_len(&self) -> u64 {
        self.len
    }

    fn next_bit(&mut self) -> io::Result<Option<bool>> {
        if self.remaining_bits == 0 {
            if self.bytes_read >= self.len {
                return Ok(None);
            }
            let mut buffer = [0u8; 1];
            self.reader.read_exact(&mut buffer).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!(
                            "message ended after {} of {} bytes",
                            self.bytes_read, self.len
                        ),
                    )
                } else {
                    e
                }
            })?;
            self.current = buffer[0];
            self.bytes_read += 1;
            self.remaining_bits = 8;
        }
        self.remaining_bits -= 1;
        Ok(Some((self.current >> self.remaining_bits) & 1 == 1))
    }
}

/// 把位按最高位优先拼成字节并写入写入器。
#[derive(Debug)]
pub struct MessageSink<W: Write> {
    writer: BufWriter<W>,
    buffer: u8,
    bit_count: u8,
    bytes_written: u64,
}

impl<W: Write> MessageSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            buffer: 0,
            bit_count: 0,
            bytes_written: 0,
        }
    }

    /// 已经完整写出的字节数。
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn write_buffer(&mut self) -> io::Result<()> {
        self.writer.write_all(&[self.buffer])?;
        self.bytes_written += 1;
        self.buffer = 0;
        self.bit_count = 0;
        Ok(())
    }

    /// 结束写入：不足一个字节的残余位用 0 补齐低位后写出，然后刷新并归还写入器。
    ///
    /// # Errors
    ///
    /// 写入或刷新失败时返回 I/O 错误。
    pub fn finish(mut self) -> io::Result<W> {
        if self.bit_count > 0 {
            self.buffer <<= 8 - self.bit_count;
            self.write_buffer()?;
        }
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> BitSink for MessageSink<W> {
    fn push_bit(&mut self, bit: bool) -> io::Result<()> {
        self.buffer = self.buffer << 1 | u8::from(bit);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.write_buffer()?;
        }
        Ok(())
    }
}
