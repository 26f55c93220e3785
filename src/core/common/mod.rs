// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod common_result_and_error;
pub mod inline_types;
pub mod macros;
pub mod text_ptr;

// Re-export.
pub use common_result_and_error::*;
pub use inline_types::*;
pub use text_ptr::*;
