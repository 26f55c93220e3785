// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! An in-memory [`Terminal`] for driving sessions in tests: scripted input,
//! captured output, and a watch channel for awaiting repaints.

use crate::{Key, PinnedInputStream, StdMutex, Terminal, resolve_output};
use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};
use tokio::sync::{mpsc, watch};

/// A virtual terminal whose output is captured and whose input is scripted by
/// the test. Clone-free: wrap it in an [`Arc`] (or hand it straight to
/// [`crate::Session::try_new`]) and keep a [`TestTerminalHandle`] for the
/// test side.
pub struct TestTerminal {
    output: Arc<StdMutex<String>>,
    writes: Arc<StdMutex<Vec<String>>>,
    write_count_tx: watch::Sender<usize>,
    input_tx: mpsc::UnboundedSender<u32>,
    input_rx: StdMutex<Option<mpsc::UnboundedReceiver<u32>>>,
    closed: AtomicBool,
}

/// The test's side of a [`TestTerminal`]: feed keys, await repaints, inspect
/// output.
#[derive(Clone)]
pub struct TestTerminalHandle {
    output: Arc<StdMutex<String>>,
    writes: Arc<StdMutex<Vec<String>>>,
    write_count_rx: watch::Receiver<usize>,
    input_tx: mpsc::UnboundedSender<u32>,
}

impl TestTerminal {
    #[must_use]
    pub fn new() -> (Self, TestTerminalHandle) {
        let output = Arc::new(StdMutex::new(String::new()));
        let writes = Arc::new(StdMutex::new(Vec::new()));
        let (write_count_tx, write_count_rx) = watch::channel(0);
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let handle = TestTerminalHandle {
            output: output.clone(),
            writes: writes.clone(),
            write_count_rx,
            input_tx: input_tx.clone(),
        };
        let terminal = Self {
            output,
            writes,
            write_count_tx,
            input_tx,
            input_rx: StdMutex::new(Some(input_rx)),
            closed: AtomicBool::new(false),
        };
        (terminal, handle)
    }
}

impl Terminal for TestTerminal {
    fn write(&self, text: &str) {
        self.output.lock().unwrap().push_str(text);
        self.writes.lock().unwrap().push(text.to_string());
        self.write_count_tx.send_modify(|count| *count += 1);
    }

    fn read(&self) -> PinnedInputStream<u32> {
        match self.input_rx.lock().unwrap().take() {
            Some(receiver) => Box::pin(futures_util::stream::unfold(
                receiver,
                |mut receiver| async move {
                    receiver.recv().await.map(|codepoint| (codepoint, receiver))
                },
            )),
            None => Box::pin(futures_util::stream::empty()),
        }
    }

    fn close(&self) { self.closed.store(true, Ordering::SeqCst); }
}

impl TestTerminalHandle {
    /// Feed a raw codepoint to the session's key reader.
    pub fn send_codepoint(&self, codepoint: u32) { _ = self.input_tx.send(codepoint); }

    /// Type text, one codepoint per char.
    pub fn send_text(&self, text: &str) {
        for ch in text.chars() {
            self.send_codepoint(ch as u32);
        }
    }

    /// Send the byte sequence a real ANSI terminal would produce for `key`.
    pub fn send_key(&self, key: Key) {
        match key {
            Key::Char(ch) => self.send_codepoint(ch as u32),
            Key::Enter => self.send_codepoint(u32::from('\r')),
            Key::Backspace => self.send_codepoint(0x7F),
            Key::Esc => self.send_codepoint(0x1B),
            Key::Tab => self.send_codepoint(u32::from('\t')),
            Key::Up => self.send_text("\x1b[A"),
            Key::Down => self.send_text("\x1b[B"),
            Key::Right => self.send_text("\x1b[C"),
            Key::Left => self.send_text("\x1b[D"),
            Key::Home => self.send_text("\x1b[1~"),
            Key::Delete => self.send_text("\x1b[3~"),
            Key::End => self.send_text("\x1b[4~"),
            Key::PageUp => self.send_text("\x1b[5~"),
            Key::PageDown => self.send_text("\x1b[6~"),
        }
    }

    /// The raw bytes written so far.
    #[must_use]
    pub fn output(&self) -> String { self.output.lock().unwrap().clone() }

    /// Each `write` call's payload, in order. One repaint is one write.
    #[must_use]
    pub fn writes(&self) -> Vec<String> { self.writes.lock().unwrap().clone() }

    #[must_use]
    pub fn write_count(&self) -> usize { self.writes.lock().unwrap().len() }

    /// Suspend until at least `count` writes (repaints) have happened.
    pub async fn wait_for_writes(&self, count: usize) {
        let mut write_count_rx = self.write_count_rx.clone();
        _ = write_count_rx.wait_for(|written| *written >= count).await;
    }

    /// The final visible lines after interpreting cursor/erase codes. See
    /// [`resolve_output`].
    #[must_use]
    pub fn resolved_lines(&self) -> Vec<String> { resolve_output(&self.output()) }

    /// [`TestTerminalHandle::resolved_lines`] joined with newlines.
    #[must_use]
    pub fn resolved_text(&self) -> String { self.resolved_lines().join("\n") }
}
