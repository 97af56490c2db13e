//! Start-state policy and decode results.

use crate::dispatch::BackendKind;
use crate::error::{DecodeError, Result};
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, Axis};

/// Absolute tolerance for comparing scores across backends in `f32`.
pub const SCORE_TOLERANCE: f32 = 1e-5;

/// Forward scores before the first timestep is consumed.
///
/// Every timestep consumes exactly one transition, so the decoded path has
/// `T + 1` states and its first state is scored only by this policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InitialState {
    /// Flip states start at 0 and flop states at −∞: a read cannot begin
    /// in the second copy of a base.
    #[default]
    FlipOnly,
    /// Every state starts at 0.
    Uniform,
    /// Caller-provided scores with shape `(B, S)`.
    Custom(Array2<f32>),
}

impl InitialState {
    /// Materialise the policy as a `(batch, nstate)` score matrix.
    pub fn scores(&self, batch: usize, nstate: usize) -> Result<Array2<f32>> {
        let nbase = nstate / 2;
        match self {
            InitialState::FlipOnly => Ok(Array2::from_shape_fn((batch, nstate), |(_, s)| {
                if s < nbase {
                    0.0
                } else {
                    f32::NEG_INFINITY
                }
            })),
            InitialState::Uniform => Ok(Array2::zeros((batch, nstate))),
            InitialState::Custom(init) => {
                let (b, s) = init.dim();
                if (b, s) != (batch, nstate) {
                    return Err(DecodeError::shape("initial state", [batch, nstate], [b, s]));
                }
                Ok(init.clone())
            }
        }
    }
}

/// Everything a decode call produces.
///
/// Shapes use `T` timesteps, `B` batch elements and `S = 2·nbase` states.
#[derive(Clone, Debug, PartialEq)]
pub struct ViterbiOutput {
    /// Best path score per batch element, `(B)`.
    pub best_score: Array1<f32>,
    /// Dense transition scores, `(T, B, S, S)`.
    pub trans: Array4<f32>,
    /// Decoded states, `(T + 1, B)`.
    pub path: Array2<usize>,
    /// Score of the transition taken at each timestep, `(T, B)`.
    pub step_scores: Array2<f32>,
    /// Forward scores for every state and timestep, `(T + 1, B, S)`, when
    /// requested.
    pub score_table: Option<Array3<f32>>,
    /// Backend that ran the call.
    pub backend: BackendKind,
}

impl ViterbiOutput {
    /// `(best_score, trans, path)`.
    pub fn into_parts(self) -> (Array1<f32>, Array4<f32>, Array2<usize>) {
        (self.best_score, self.trans, self.path)
    }

    /// Decoded states of one batch element.
    pub fn path_of(&self, batch: usize) -> ArrayView1<'_, usize> {
        self.path.index_axis(Axis(1), batch)
    }

    /// Batch elements for which no finite-scoring path exists.
    ///
    /// Their path entries are defined (every pointer of an unreachable
    /// state is 0) but carry no meaning.
    pub fn degenerate_batches(&self) -> Vec<usize> {
        self.best_score
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_finite())
            .map(|(b, _)| b)
            .collect()
    }

    /// Fail with [`DecodeError::NumericDegeneracy`] naming the first batch
    /// element without a finite-scoring path.
    pub fn ensure_reachable(&self) -> Result<()> {
        match self.degenerate_batches().first() {
            Some(&batch) => Err(DecodeError::NumericDegeneracy { batch }),
            None => Ok(()),
        }
    }

    /// Same paths, and scores equal within `tolerance` (absolute, scaled by
    /// magnitude above 1). Infinite scores must match exactly.
    pub fn agrees_with(&self, other: &Self, tolerance: f32) -> bool {
        self.path == other.path
            && self.best_score.len() == other.best_score.len()
            && self
                .best_score
                .iter()
                .zip(other.best_score.iter())
                .all(|(&a, &b)| scores_close(a, b, tolerance))
    }
}

fn scores_close(a: f32, b: f32, tolerance: f32) -> bool {
    if a.is_finite() && b.is_finite() {
        (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
    } else {
        a == b || (a.is_nan() && b.is_nan())
    }
}
