// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Unified error type for atlas construction, diffing, and ranking.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AtlasError {
    /// Malformed input data or configuration.
    #[error("{0}")]
    InvalidInput(String),

    /// A computation produced a non-finite or otherwise unusable number.
    #[error("{0}")]
    NumericalIssue(String),

    /// Two artifacts could not be aligned for diffing.
    #[error("alignment failure: {0}")]
    Alignment(String),
}

impl AtlasError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::Alignment(msg.into())
    }
}
