// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The OS terminal backend: raw mode via crossterm, writes to stdout, and an
//! async stream of input codepoints decoded from stdin bytes.

use super::terminal::{PinnedInputStream, StdMutex, Terminal};
use crate::{CommonError, CommonErrorType, CommonResult};
use miette::IntoDiagnostic;
use std::{io::Write,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};
use tokio::io::{AsyncReadExt, Stdin};

/// A [`Terminal`] attached to the process's controlling terminal.
///
/// - Construction fails with [`CommonErrorType::NoInteractiveTerminal`] when
///   stdout is not a tty (e.g. piped output).
/// - Raw mode is enabled for the lifetime of the value; [`Terminal::close`]
///   (and [`Drop`]) restore the terminal, idempotently.
/// - Writes translate `\n` to `\r\n` since raw mode disables output
///   post-processing.
pub struct SystemTerminal {
    output: Arc<StdMutex<std::io::Stdout>>,
    closed: AtomicBool,
}

impl SystemTerminal {
    pub fn try_new() -> CommonResult<Self> {
        use crossterm::tty::IsTty;
        if !std::io::stdout().is_tty() {
            return CommonError::new_error_result(
                CommonErrorType::NoInteractiveTerminal,
                "stdout is not an interactive terminal",
            );
        }
        crossterm::terminal::enable_raw_mode().into_diagnostic()?;
        Ok(Self {
            output: Arc::new(StdMutex::new(std::io::stdout())),
            closed: AtomicBool::new(false),
        })
    }
}

impl Terminal for SystemTerminal {
    fn write(&self, text: &str) {
        // Raw mode turns off ONLCR; emit explicit carriage returns.
        let normalized = text.replace('\n', "\r\n");
        let mut output = self.output.lock().unwrap();
        if let Err(error) = output
            .write_all(normalized.as_bytes())
            .and_then(|()| output.flush())
        {
            tracing::warn!(%error, "failed to write to the system terminal");
        }
    }

    fn read(&self) -> PinnedInputStream<u32> {
        let reader = CodepointReader::new(tokio::io::stdin());
        Box::pin(futures_util::stream::unfold(reader, |mut reader| async {
            reader.next_codepoint().await.map(|codepoint| (codepoint, reader))
        }))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(error) = crossterm::terminal::disable_raw_mode() {
                tracing::warn!(%error, "failed to disable raw mode");
            }
        }
    }
}

impl Drop for SystemTerminal {
    fn drop(&mut self) { self.close(); }
}

/// Incremental UTF-8 decoder over stdin. Invalid sequences decode to U+FFFD
/// rather than killing the input stream.
struct CodepointReader {
    stdin: Stdin,
    buffer: [u8; 1024],
    start: usize,
    end: usize,
}

const REPLACEMENT: u32 = 0xFFFD;

impl CodepointReader {
    fn new(stdin: Stdin) -> Self {
        Self {
            stdin,
            buffer: [0; 1024],
            start: 0,
            end: 0,
        }
    }

    async fn next_byte(&mut self) -> Option<u8> {
        if self.start == self.end {
            let read = self.stdin.read(&mut self.buffer).await.ok()?;
            if read == 0 {
                return None;
            }
            self.start = 0;
            self.end = read;
        }
        let byte = self.buffer[self.start];
        self.start += 1;
        Some(byte)
    }

    async fn next_codepoint(&mut self) -> Option<u32> {
        let first = self.next_byte().await?;
        let (len, initial) = match first {
            0x00..=0x7F => return Some(u32::from(first)),
            0xC0..=0xDF => (2, u32::from(first & 0x1F)),
            0xE0..=0xEF => (3, u32::from(first & 0x0F)),
            0xF0..=0xF7 => (4, u32::from(first & 0x07)),
            _ => return Some(REPLACEMENT),
        };
        let mut acc = initial;
        for _ in 1..len {
            let byte = self.next_byte().await?;
            if byte & 0xC0 != 0x80 {
                return Some(REPLACEMENT);
            }
            acc = (acc << 6) | u32::from(byte & 0x3F);
        }
        Some(acc)
    }
}
