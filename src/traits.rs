//! The capability every execution backend provides.
//!
//! A backend implements two primitives:
//! - the *transition builder*, expanding compact per-step scores
//!   `(T, B, C)` into dense transition matrices `(T, B, S, S)`, and
//! - one *max-plus step* of the Viterbi recursion,
//!   `next[b, to] = max_from fwd[b, from] + trans[b, from, to]`, together
//!   with the maximising `from` for every `(b, to)`.
//!
//! The engine drives time, checkpointing and backtrace; it only ever calls
//! these two primitives, so the orchestration is shared by every backend and
//! the backends need only agree on the primitives.
//!
//! Implementations must:
//! - write exactly the layout's permitted entries into the dense matrix and
//!   −∞ everywhere else,
//! - break ties towards the lowest `from` index and never let a −∞ or NaN
//!   candidate win (use [`crate::utils::argmax`]),
//! - treat batch elements independently.

use crate::dispatch::BackendKind;
use crate::layout::{Backpointer, FlipFlopLayout};
use ndarray::{Array4, ArrayView2, ArrayView3, ArrayViewMut2};

/// Scores for a single timestep, in both representations.
#[derive(Clone, Copy, Debug)]
pub struct StepScores<'a> {
    /// Compact per-step scores `(B, C)`.
    pub compact: ArrayView2<'a, f32>,
    /// Dense transition matrices `(B, S, S)` built from `compact`.
    pub trans: ArrayView3<'a, f32>,
}

/// A Viterbi execution backend.
pub trait Decoder {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Expand compact scores `(T, B, C)` into transition matrices
    /// `(T, B, S, S)`. Shapes are validated by the caller.
    fn make_trans(&self, layout: &FlipFlopLayout, scores: ArrayView3<'_, f32>) -> Array4<f32>;

    /// Advance the forward scores by one timestep.
    ///
    /// - `fwd`: forward scores `(B, S)` before the step.
    /// - `next`: receives the forward scores after the step.
    /// - `backptr`: receives, for every `(b, to)`, the maximising predecessor.
    fn forward_step(
        &self,
        layout: &FlipFlopLayout,
        step: StepScores<'_>,
        fwd: ArrayView2<'_, f32>,
        next: ArrayViewMut2<'_, f32>,
        backptr: ArrayViewMut2<'_, Backpointer>,
    );
}
