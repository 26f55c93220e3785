// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # kotter
//!
//! A library for interactive terminal apps built around one **active block**:
//! a declarative render closure that reads live state, gets rerendered in
//! place (via ANSI cursor/erase codes) whenever that state changes, and
//! leaves a stable trail of history above itself.
//!
//! The moving parts:
//!
//! - [`Session`] owns the terminal, the render executor, the key reader, and
//!   the [`ConcurrentScopedData`] store that ties lifetimes together.
//! - [`Session::section`] binds a render block; running the [`Section`]
//!   stakes the session's single active slot and keeps the block's output
//!   repainted until the run block finishes.
//! - [`LiveVar`] / [`LiveList`] / [`LiveMap`] are the reactive primitives:
//!   reading one from a render pass subscribes the section, writing one
//!   schedules a coalesced rerender.
//! - [`RenderScope`] is the per-pass builder: text, colors, decorations,
//!   nested [`RenderScope::scoped_state`], [`RenderScope::offscreen`]
//!   measurement, [`RenderScope::aside`] history lines, and the
//!   [`RenderScope::input`] widget with completion and a blinking cursor.
//! - [`TimerManager`], [`TextAnim`], and [`RenderAnim`] drive time-based
//!   updates through the same rerender plumbing.
//!
//! ```no_run
//! use kotter::*;
//!
//! #[tokio::main]
//! async fn main() -> CommonResult<()> {
//!     let session = Session::try_new(SystemTerminal::try_new()?)?;
//!     let count = session.live_var(0);
//!
//!     let count_for_render = count.clone();
//!     let section = session.section(move |scope| {
//!         scope.text_line(format!("Counter: {}", count_for_render.get()));
//!         scope.text_line("Press q to quit.");
//!     });
//!     section
//!         .run_with(move |run| async move {
//!             let run_for_keys = run.clone();
//!             run.on_key_pressed(move |key| {
//!                 if key == Key::Q {
//!                     run_for_keys.abort();
//!                 }
//!             });
//!             loop {
//!                 run.pause_for(std::time::Duration::from_secs(1)).await;
//!                 count.set(count.get() + 1);
//!             }
//!         })
//!         .await
//! }
//! ```
//!
//! ## Error handling
//!
//! Fallible operations return [`CommonResult`]; runtime policy failures carry
//! a [`CommonErrorType`]. Render blocks are best-effort: a panic inside one
//! is swallowed and the partial output still flushes, because renders are
//! reactive reruns and should never take the program down.
//!
//! ## Terminal backends
//!
//! The runtime is polymorphic over the [`Terminal`] capability set
//! (`write`/`read`/`close`). [`SystemTerminal`] talks to the real OS
//! terminal; [`TestTerminal`] scripts input and captures output for tests;
//! [`first_available_terminal`] chains candidates.

// Attach sources.
pub mod core;
pub mod reactive;
pub mod render;
pub mod runtime;

// Re-export.
pub use crate::core::*;
pub use reactive::*;
pub use render::*;
pub use runtime::*;
