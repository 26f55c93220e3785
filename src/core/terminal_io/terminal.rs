// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CommonError, CommonErrorType, CommonResult};
use futures_core::Stream;
use std::{pin::Pin, sync::Arc};

/// Disambiguate the type of `StdMutex` from stdlib and tokio to avoid conflicts.
pub type StdMutex<T> = std::sync::Mutex<T>;
/// Disambiguate the type of `StdRwLock` from stdlib and tokio to avoid conflicts.
pub type StdRwLock<T> = std::sync::RwLock<T>;

/// Type alias for a pinned stream that is async safe.
pub type PinnedInputStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Type alias for a shareable [`Terminal`] trait object.
pub type SafeTerminal = Arc<dyn Terminal>;

/// The capability set a session needs from a terminal backend. Implementations
/// are expected to be ANSI terminals: [`Terminal::write`] must pass CSI escape
/// sequences through for interpretation, and [`Terminal::read`] must deliver the
/// raw input bytes (including ESC) as codepoints, one at a time, exactly once.
///
/// The crate ships [`crate::SystemTerminal`] for the OS terminal; tests use
/// [`crate::TestTerminal`]. Other backends (e.g. a windowed virtual terminal)
/// implement this trait externally.
pub trait Terminal: Send + Sync {
    /// Write a chunk of text, which may contain CSI escape sequences. One call
    /// corresponds to one atomic repaint; implementations should not buffer
    /// across calls.
    fn write(&self, text: &str);

    /// The stream of raw input codepoints. Control bytes (ESC, CR/LF, DEL/BS)
    /// pass through untranslated; the session's key reader does the folding.
    fn read(&self) -> PinnedInputStream<u32>;

    /// Release the terminal. Idempotent.
    fn close(&self);
}

/// Try each candidate backend in order and return the first one that
/// initializes. The final error is the last candidate's failure, so a chain
/// like "system terminal, else virtual terminal" reports the most specific
/// cause.
pub fn first_available_terminal(
    candidates: impl IntoIterator<Item = Box<dyn FnOnce() -> CommonResult<SafeTerminal>>>,
) -> CommonResult<SafeTerminal> {
    let mut last_error = None;
    for candidate in candidates {
        match candidate() {
            Ok(terminal) => return Ok(terminal),
            Err(error) => last_error = Some(error),
        }
    }
    match last_error {
        Some(error) => Err(error),
        None => CommonError::new_error_result(
            CommonErrorType::NoInteractiveTerminal,
            "no terminal backend candidates were provided",
        ),
    }
}
