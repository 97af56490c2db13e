//! Error taxonomy for the decoder.
//!
//! All errors are raised synchronously by the call that detects them and are
//! never retried internally.

use crate::dispatch::BackendKind;
use crate::tensor::Device;
use thiserror::Error;

/// Errors surfaced by transition building, decoding and backend selection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// An input dimension disagrees with the flip-flop layout or with
    /// another input of the same call.
    #[error("shape mismatch in {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A specialised backend was requested but cannot run.
    #[error("{backend} backend unavailable for tensor on {device}: {reason}")]
    BackendUnavailable {
        backend: BackendKind,
        device: Device,
        reason: String,
    },

    /// No finite-scoring path exists for a batch element.
    #[error("no finite-scoring path for batch element {batch}")]
    NumericDegeneracy { batch: usize },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DecodeError>;

impl DecodeError {
    pub(crate) fn shape(
        what: &'static str,
        expected: impl Into<Vec<usize>>,
        found: impl Into<Vec<usize>>,
    ) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_names_offending_shapes() {
        let err = DecodeError::shape("score channels", [12], [11]);
        assert_eq!(
            err.to_string(),
            "shape mismatch in score channels: expected [12], found [11]"
        );
    }

    #[test]
    fn backend_unavailable_names_device() {
        let err = DecodeError::BackendUnavailable {
            backend: BackendKind::Native,
            device: Device::Accelerator(1),
            reason: "kernel disabled".into(),
        };
        assert_eq!(
            err.to_string(),
            "native backend unavailable for tensor on accelerator:1: kernel disabled"
        );
    }
}
