//! Flip-flop Viterbi decoding.
//!
//! A sequence model reading raw nanopore signal emits, for every timestep
//! and batch element, a compact vector of `2·nbase·(nbase+1)` transition
//! scores over the *flip-flop* state machine: one flip and one flop state per
//! base, with a repeated base forced through the flop copy so that it can be
//! told apart from one long base. This crate turns those scores into the
//! single best state path per batch element.
//!
//! ## Pipeline
//! 1. **Transition builder**: expand `(T, B, C)` scores into dense
//!    `(T, B, S, S)` transition matrices (`S = 2·nbase`), −∞ where the
//!    grammar forbids a transition. See [`layout`] for the channel layout.
//! 2. **Forward pass**: max-plus recursion over time, recording for each
//!    state its best predecessor (ties to the lowest index).
//! 3. **Backtrace**: follow predecessors from the best final state, giving a
//!    path of `T + 1` states.
//!
//! Two backends implement stages 1 and 2 behind [`Decoder`]: a portable one
//! on dense broadcast arithmetic and a fused native kernel on the compact
//! scores. The [`dispatch`] module picks one per call from where the scores
//! reside and what the process can run; both yield identical paths.
//!
//! ## Quick start
//! ```
//! use flipflop_decode::{flipflop_viterbi, BackendRequest, Scores};
//! use ndarray::Array3;
//!
//! // 7 timesteps, 1 read, alphabet of 2 bases (12 channels)
//! let mut scores = Array3::<f32>::zeros((7, 1, 12));
//! for (t, channel) in [1, 8, 10, 6, 5, 1, 0].into_iter().enumerate() {
//!     scores[[t, 0, channel]] = 1.0;
//! }
//! let out = flipflop_viterbi(&Scores::host(scores), BackendRequest::Auto).unwrap();
//! assert_eq!(out.path.column(0).to_vec(), vec![1, 0, 2, 2, 1, 1, 0, 0]);
//! assert_eq!(out.best_score[0], 7.0);
//! ```
//!
//! ## Features
//! - `parallel` (default): batch rows run on the rayon pool.
//! - `native-kernel` (default): compile the fused kernel.
//! - `tracing` (default): spans around each stage and dispatch logging.
//! - `heavy`: enables the long-running stress tests.

pub mod backends;
pub mod backtrace;
pub mod blocks;
pub mod builder;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod layout;
pub mod probe;
pub mod tensor;
pub mod traits;
pub mod utils;
pub mod viterbi;

pub use crate::builder::ViterbiEngineBuilder;
pub use crate::dispatch::{BackendKind, BackendRequest, BackendSelector};
pub use crate::engine::{decode_with, DecodeConfig, Traceback, ViterbiEngine};
pub use crate::error::{DecodeError, Result};
pub use crate::layout::FlipFlopLayout;
pub use crate::probe::Capabilities;
pub use crate::tensor::{Device, Scores};
pub use crate::traits::Decoder;
pub use crate::viterbi::{InitialState, ViterbiOutput, SCORE_TOLERANCE};

use ndarray::Array4;

/// Expand compact scores `(T, B, 2·nbase·(nbase+1))` into transition
/// matrices `(T, B, 2·nbase, 2·nbase)`.
pub fn flipflop_make_trans(scores: &Scores, backend: BackendRequest) -> Result<Array4<f32>> {
    ViterbiEngineBuilder::new()
        .with_backend(backend)
        .build()
        .make_trans(scores)
}

/// Decode the best flip-flop path of every batch element with the default
/// start policy and full traceback.
pub fn flipflop_viterbi(scores: &Scores, backend: BackendRequest) -> Result<ViterbiOutput> {
    ViterbiEngineBuilder::new()
        .with_backend(backend)
        .build()
        .decode(scores)
}
