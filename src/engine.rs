//! Decode orchestration.
//!
//! A decode runs three stages in order:
//! 1. the transition builder expands `(T, B, C)` scores into `(T, B, S, S)`
//!    transition matrices;
//! 2. the forward pass advances the `(B, S)` forward scores through every
//!    timestep, recording backtrace pointers (all of them, or only block
//!    checkpoints);
//! 3. the backtrace walks the pointers from the best terminal state.
//!
//! The engine is generic over [`Decoder`]; [`ViterbiEngine`] adds input
//! validation and backend selection on top.

use crate::backtrace::{backtrace, backtrace_checkpointed, step_scores, terminal_states};
use crate::blocks::{block_bounds, Checkpoint};
use crate::dispatch::{BackendRequest, BackendSelector};
use crate::error::{DecodeError, Result};
use crate::layout::{flipflop_channels, Backpointer, FlipFlopLayout};
use crate::tensor::Scores;
use crate::traits::{Decoder, StepScores};
use crate::utils::default_block_size;
use crate::viterbi::{InitialState, ViterbiOutput};
use ndarray::{Array2, Array3, Array4, ArrayView3, ArrayView4, ArrayViewMut3, Axis};
use std::sync::Arc;

/// How backtrace pointers are retained between the forward pass and the
/// backtrace.
///
/// Pointers are [`Backpointer`]s, `2·S` bytes per `(t, b)`. The dense
/// transition tensor returned in [`ViterbiOutput::trans`] costs `4·S²` bytes
/// per `(t, b)` and is built in both modes, so it bounds peak memory:
/// checkpointing saves `1 / (2·S + 1)` of the total (a ninth for `nbase = 2`,
/// a seventeenth for `nbase = 4`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traceback {
    /// Keep every pointer: `T·B·S` indices.
    #[default]
    Full,
    /// Keep forward scores only at block boundaries and recompute each
    /// block's pointers during the backtrace. `None` picks ≈ √T.
    Checkpointed { block_size: Option<usize> },
}

/// Per-engine decode settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeConfig {
    /// Alphabet size, when known up front. Otherwise inferred from the
    /// channel count.
    pub nbase: Option<usize>,
    pub initial_state: InitialState,
    pub traceback: Traceback,
    /// Retain the `(T + 1, B, S)` forward score table in the output.
    pub keep_score_table: bool,
    pub backend: BackendRequest,
}

/// Validating, backend-selecting front end to [`decode_with`].
///
/// ```
/// use flipflop_decode::{Scores, ViterbiEngine};
/// use ndarray::Array3;
///
/// let scores = Scores::host(Array3::zeros((5, 2, 40)));
/// let out = ViterbiEngine::new().decode(&scores).unwrap();
/// assert_eq!(out.path.dim(), (6, 2));
/// ```
#[derive(Clone, Debug)]
pub struct ViterbiEngine {
    config: DecodeConfig,
    selector: BackendSelector,
}

impl Default for ViterbiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViterbiEngine {
    /// Engine with default settings and the process-wide capability probe.
    pub fn new() -> Self {
        Self::with_config(DecodeConfig::default())
    }

    pub fn with_config(config: DecodeConfig) -> Self {
        Self::with_selector(config, BackendSelector::global())
    }

    pub fn with_selector(config: DecodeConfig, selector: BackendSelector) -> Self {
        Self { config, selector }
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Layout for `scores`, checking the channel count against the
    /// configured alphabet size if there is one.
    pub fn layout_for(&self, scores: &Scores) -> Result<Arc<FlipFlopLayout>> {
        let channels = scores.channels();
        match self.config.nbase {
            Some(nbase) => {
                let expected = flipflop_channels(nbase);
                if channels != expected {
                    return Err(DecodeError::shape("score channels", [expected], [channels]));
                }
                FlipFlopLayout::shared(nbase)
            }
            None => FlipFlopLayout::for_channels(channels),
        }
    }

    /// Transition builder: `(T, B, C)` → `(T, B, S, S)`.
    pub fn make_trans(&self, scores: &Scores) -> Result<Array4<f32>> {
        let layout = self.layout_for(scores)?;
        let (backend, _) = self.selector.select(self.config.backend, scores.device())?;
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("make_trans", backend = %backend.kind()).entered();
        Ok(backend.make_trans(&layout, scores.view()))
    }

    /// Decode the best path of every batch element.
    pub fn decode(&self, scores: &Scores) -> Result<ViterbiOutput> {
        let layout = self.layout_for(scores)?;
        let (backend, _) = self.selector.select(self.config.backend, scores.device())?;
        decode_with(&backend, &layout, scores.view(), &self.config)
    }
}

/// Run the full pipeline on `decoder`.
///
/// Shapes are checked against `layout` before anything is allocated; the
/// backend request in `config` is ignored.
pub fn decode_with<D: Decoder>(
    decoder: &D,
    layout: &FlipFlopLayout,
    scores: ArrayView3<'_, f32>,
    config: &DecodeConfig,
) -> Result<ViterbiOutput> {
    let (t_len, batch, channels) = scores.dim();
    if channels != layout.nchannel() {
        let expected = layout.nchannel();
        return Err(DecodeError::shape("score channels", [expected], [channels]));
    }
    let nstate = layout.nstate();
    let init = config.initial_state.scores(batch, nstate)?;

    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!(
        "flipflop_viterbi",
        backend = %decoder.kind(),
        timesteps = t_len,
        batch,
        nbase = layout.nbase()
    )
    .entered();

    let trans = {
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("make_trans").entered();
        decoder.make_trans(layout, scores)
    };

    let mut score_table = config.keep_score_table.then(|| {
        let mut table = Array3::zeros((t_len + 1, batch, nstate));
        table.index_axis_mut(Axis(0), 0).assign(&init);
        table
    });

    let path;
    let best_score;
    match config.traceback {
        Traceback::Full => {
            let mut backptr = Array3::zeros((t_len, batch, nstate));
            let fwd = {
                #[cfg(feature = "tracing")]
                let _span = tracing::trace_span!("forward").entered();
                forward_range(
                    decoder,
                    layout,
                    scores,
                    trans.view(),
                    0,
                    t_len,
                    init,
                    Some(backptr.view_mut()),
                    score_table.as_mut().map(|t| t.view_mut()),
                )
            };
            let (terminal, best) = terminal_states(fwd.view());
            #[cfg(feature = "tracing")]
            let _span = tracing::trace_span!("backtrace").entered();
            path = backtrace(backptr.view(), terminal.view());
            best_score = best;
        }
        Traceback::Checkpointed { block_size } => {
            let block = block_size.unwrap_or_else(|| default_block_size(t_len)).max(1);
            let mut checkpoints = Vec::with_capacity(t_len.div_ceil(block));
            let mut fwd = init;
            for (start, end) in block_bounds(t_len, block) {
                #[cfg(feature = "tracing")]
                let _span = tracing::trace_span!("forward_block", start, end).entered();
                checkpoints.push(Checkpoint {
                    start,
                    end,
                    fwd: fwd.clone(),
                });
                fwd = forward_range(
                    decoder,
                    layout,
                    scores,
                    trans.view(),
                    start,
                    end,
                    fwd,
                    None,
                    score_table.as_mut().map(|t| t.view_mut()),
                );
            }
            let (terminal, best) = terminal_states(fwd.view());
            #[cfg(feature = "tracing")]
            let _span = tracing::trace_span!("backtrace", blocks = checkpoints.len()).entered();
            path = backtrace_checkpointed(
                decoder,
                layout,
                scores,
                trans.view(),
                &checkpoints,
                terminal.view(),
            );
            best_score = best;
        }
    }

    let output = ViterbiOutput {
        step_scores: step_scores(trans.view(), path.view()),
        best_score,
        trans,
        path,
        score_table,
        backend: decoder.kind(),
    };

    #[cfg(feature = "tracing")]
    {
        let degenerate = output.degenerate_batches();
        if !degenerate.is_empty() {
            tracing::warn!(?degenerate, "no finite-scoring path for batch elements");
        }
    }

    Ok(output)
}

/// Advance `fwd` through timesteps `start..end`.
///
/// `backptr`, when given, is indexed relative to `start`; `table`, when
/// given, is indexed by absolute timestep and receives the scores after each
/// step. Returns the forward scores after `end - 1`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn forward_range<D: Decoder>(
    decoder: &D,
    layout: &FlipFlopLayout,
    scores: ArrayView3<'_, f32>,
    trans: ArrayView4<'_, f32>,
    start: usize,
    end: usize,
    mut fwd: Array2<f32>,
    mut backptr: Option<ArrayViewMut3<'_, Backpointer>>,
    mut table: Option<ArrayViewMut3<'_, f32>>,
) -> Array2<f32> {
    let mut next = Array2::zeros(fwd.raw_dim());
    let mut scratch = Array2::zeros(fwd.raw_dim());
    for t in start..end {
        let step = StepScores {
            compact: scores.index_axis(Axis(0), t),
            trans: trans.index_axis(Axis(0), t),
        };
        let ptr = match backptr.as_mut() {
            Some(bp) => bp.index_axis_mut(Axis(0), t - start),
            None => scratch.view_mut(),
        };
        decoder.forward_step(layout, step, fwd.view(), next.view_mut(), ptr);
        std::mem::swap(&mut fwd, &mut next);
        if let Some(table) = table.as_mut() {
            table.index_axis_mut(Axis(0), t + 1).assign(&fwd);
        }
    }
    fwd
}
