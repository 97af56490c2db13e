//! Checkpoints used by the recomputing traceback.
//!
//! A `Checkpoint` covers the timesteps `[start, end)` and stores the forward
//! scores entering `start`, which is enough to regenerate the block's
//! backtrace pointers on demand.

use ndarray::Array2;

/// Forward scores at the start of a block of timesteps `[start, end)`.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Inclusive first timestep.
    pub start: usize,
    /// Exclusive end timestep.
    pub end: usize,
    /// Forward scores `(B, S)` before timestep `start` is consumed.
    pub fwd: Array2<f32>,
}

impl Checkpoint {
    /// Number of timesteps in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `[0, num_steps)` into consecutive blocks of at most `block_size`.
pub fn block_bounds(num_steps: usize, block_size: usize) -> Vec<(usize, usize)> {
    let b = block_size.max(1);
    (0..num_steps.div_ceil(b))
        .map(|k| (k * b, ((k + 1) * b).min(num_steps)))
        .collect()
}
