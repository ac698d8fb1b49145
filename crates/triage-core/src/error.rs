//! Error types for triage core
//!
//! The classification pipeline itself never fails; the only fallible
//! surface is decoding persisted enum strings back into typed values.

/// Main core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    /// A persisted string did not name any known variant
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Name of the enum being decoded
        kind: &'static str,
        /// Offending input
        value: String,
    },

    /// Identifier was empty or malformed
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl TriageError {
    /// Create unknown-variant error
    #[inline]
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}
