// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{error::Error,
          fmt::{Debug, Display, Formatter, Result}};

/// Type alias to make it easy to work with:
/// 1. [`core::result::Result`]
/// 2. [`miette::Result`] and [`miette::Report`], which are [`std::error::Error`]
///    wrappers.
///
/// It is basically `miette::Result<T, miette::Report>` and works hand in hand with
/// [`CommonError`] and any other type of error.
pub type CommonResult<T> = miette::Result<T>;

/// Common error struct for the session / section runtime. The [`CommonErrorType`]
/// carries the policy for the failure (see the error handling table in the crate
/// docs); the optional message carries the details.
#[derive(Debug, Clone)]
pub struct CommonError {
    pub error_type: CommonErrorType,
    pub error_message: Option<String>,
}

/// The failure kinds the runtime can produce.
#[non_exhaustive]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonErrorType {
    #[default]
    General,
    /// The backend could not attach to an interactive terminal.
    NoInteractiveTerminal,
    /// A second section tried to run while another one held the active slot.
    MultipleActiveSections,
    /// A section that already finished was run again.
    SectionConsumed,
    /// `input()` was called outside a main render pass, or twice in one pass.
    InvalidInputContext,
    /// A timer was scheduled with a non-positive duration.
    InvalidTimer,
    /// A value was inserted into the data store for a lifecycle that is not
    /// currently active.
    LifecycleNotActive,
    /// An operation was attempted against a runtime object in the wrong state
    /// (e.g. a run scope whose session has already shut down).
    InvalidState,
    IoError,
}

impl Error for CommonError {}

/// Same as the derived [`Debug`] implementation, which is what the miette report
/// prints.
impl Display for CommonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result { Debug::fmt(self, f) }
}

impl CommonError {
    /// Both [`CommonError::error_type`] and [`CommonError::error_message`] available.
    pub fn new_error_result<T>(err_type: CommonErrorType, msg: &str) -> CommonResult<T> {
        Err(miette::miette!(CommonError {
            error_type: err_type,
            error_message: Some(msg.to_string()),
        }))
    }

    /// Only [`CommonError::error_type`] available, and no
    /// [`CommonError::error_message`].
    pub fn new_error_result_with_only_type<T>(
        err_type: CommonErrorType,
    ) -> CommonResult<T> {
        Err(miette::miette!(CommonError {
            error_type: err_type,
            error_message: None,
        }))
    }

    /// Only [`CommonError::error_message`] available, and no
    /// [`CommonError::error_type`].
    pub fn new_error_result_with_only_msg<T>(msg: &str) -> CommonResult<T> {
        Err(miette::miette!(CommonError {
            error_type: CommonErrorType::default(),
            error_message: Some(msg.to_string()),
        }))
    }

    /// Check whether `report` wraps a [`CommonError`] of the given type. Handy in
    /// tests and in callers that branch on the failure kind.
    #[must_use]
    pub fn is_error_type(report: &miette::Report, err_type: CommonErrorType) -> bool {
        report
            .downcast_ref::<CommonError>()
            .is_some_and(|it| it.error_type == err_type)
    }
}
