//! Execution backends.
//!
//! - [`portable`]: dense tensors and broadcast max-plus steps.
//! - [`native`]: fused kernel over the compact score vector (feature
//!   `native-kernel`).
//!
//! [`Backend`] owns whichever one the selector chose and forwards the
//! [`Decoder`] primitives to it.

#[cfg(feature = "native-kernel")]
pub mod native;
pub mod portable;

use crate::dispatch::BackendKind;
#[cfg(not(feature = "native-kernel"))]
use crate::error::DecodeError;
use crate::error::Result;
use crate::layout::{Backpointer, FlipFlopLayout};
use crate::tensor::Device;
use crate::traits::{Decoder, StepScores};
use ndarray::{Array4, ArrayView2, ArrayView3, ArrayViewMut2};

#[cfg(feature = "native-kernel")]
pub use native::NativeDecoder;
pub use portable::PortableDecoder;

/// An owned backend implementation.
#[derive(Clone, Copy, Debug)]
pub enum Backend {
    Portable(PortableDecoder),
    #[cfg(feature = "native-kernel")]
    Native(NativeDecoder),
}

impl Backend {
    /// Instantiate the backend of the given kind.
    ///
    /// Fails with [`crate::error::DecodeError::BackendUnavailable`] when the native kernel
    /// was not compiled in.
    #[cfg_attr(feature = "native-kernel", allow(unused_variables))]
    pub fn instantiate(kind: BackendKind, device: Device) -> Result<Self> {
        match kind {
            BackendKind::Portable => Ok(Backend::Portable(PortableDecoder)),
            #[cfg(feature = "native-kernel")]
            BackendKind::Native => Ok(Backend::Native(NativeDecoder)),
            #[cfg(not(feature = "native-kernel"))]
            BackendKind::Native => Err(DecodeError::BackendUnavailable {
                backend: kind,
                device,
                reason: crate::probe::COMPILED_OUT.into(),
            }),
        }
    }
}

impl Decoder for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Portable(d) => d.kind(),
            #[cfg(feature = "native-kernel")]
            Backend::Native(d) => d.kind(),
        }
    }

    fn make_trans(&self, layout: &FlipFlopLayout, scores: ArrayView3<'_, f32>) -> Array4<f32> {
        match self {
            Backend::Portable(d) => d.make_trans(layout, scores),
            #[cfg(feature = "native-kernel")]
            Backend::Native(d) => d.make_trans(layout, scores),
        }
    }

    fn forward_step(
        &self,
        layout: &FlipFlopLayout,
        step: StepScores<'_>,
        fwd: ArrayView2<'_, f32>,
        next: ArrayViewMut2<'_, f32>,
        backptr: ArrayViewMut2<'_, Backpointer>,
    ) {
        match self {
            Backend::Portable(d) => d.forward_step(layout, step, fwd, next, backptr),
            #[cfg(feature = "native-kernel")]
            Backend::Native(d) => d.forward_step(layout, step, fwd, next, backptr),
        }
    }
}
