// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Stack-allocated collection aliases used on the hot render path. Render passes
//! run at interactive rates, so short strings and small command lists should not
//! hit the heap.

use smallstr::SmallString;
use smallvec::SmallVec;

/// How many bytes a string can hold before spilling to the heap.
pub const DEFAULT_STRING_STORAGE_SIZE: usize = 16;

/// How many elements a vec can hold before spilling to the heap.
pub const INLINE_VEC_SIZE: usize = 8;

pub type InlineString = SmallString<[u8; DEFAULT_STRING_STORAGE_SIZE]>;
pub type InlineVec<T> = SmallVec<[T; INLINE_VEC_SIZE]>;
