use thiserror::Error;

use crate::ir::DefId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown {kind} `{name}`")]
    UnknownName { kind: &'static str, name: String },
    #[error("malformed sized type `{0}` (expected e.g. `float32`)")]
    BadSizedType(String),
    #[error("value {def} has shape {bit_size}x{num_components}; expected 1/8/16/32/64 bits and 1-4 components")]
    BadDefShape {
        def: DefId,
        bit_size: u8,
        num_components: u8,
    },
}

/// Raised by [`crate::Builder`] when structured control flow is opened and closed out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    pub message: String,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IR build error: {}", self.message)
    }
}

impl std::error::Error for BuildError {}

pub(crate) fn build_err(message: impl Into<String>) -> BuildError {
    BuildError {
        message: message.into(),
    }
}
