//! Path recovery from backtrace pointers.
//!
//! A decode of `T` timesteps yields a path of `T + 1` states:
//! `path[T]` is the best terminal state and
//! `path[t] = backptr[t, b, path[t + 1]]` for `t = T-1, …, 0`.
//!
//! With checkpointed traceback the pointer table is never held in full:
//! blocks are replayed from their checkpoints, last block first, and each
//! block's pointers are dropped as soon as the walk has crossed it.

use crate::blocks::Checkpoint;
use crate::engine::forward_range;
use crate::layout::{Backpointer, FlipFlopLayout};
use crate::traits::Decoder;
use crate::utils::argmax;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, ArrayView4, Axis};

/// Best final state and its score for each batch element of `fwd` `(B, S)`.
///
/// Ties go to the lowest state index.
pub fn terminal_states(fwd: ArrayView2<'_, f32>) -> (Array1<usize>, Array1<f32>) {
    let batch = fwd.nrows();
    let mut states = Array1::zeros(batch);
    let mut scores = Array1::from_elem(batch, f32::NEG_INFINITY);
    for (b, row) in fwd.outer_iter().enumerate() {
        let (state, score) = argmax(row.iter().copied().enumerate());
        states[b] = state;
        scores[b] = score;
    }
    (states, scores)
}

/// Walk a full pointer table `(T, B, S)` back from `terminal` `(B)`.
pub fn backtrace(
    backptr: ArrayView3<'_, Backpointer>,
    terminal: ArrayView1<'_, usize>,
) -> Array2<usize> {
    let (t_len, batch, _) = backptr.dim();
    let mut path = Array2::zeros((t_len + 1, batch));
    path.row_mut(t_len).assign(&terminal);
    follow(backptr, 0, &mut path);
    path
}

/// Walk back through checkpointed blocks, regenerating each block's pointers
/// with `decoder` from the forward scores stored at its start.
pub(crate) fn backtrace_checkpointed<D: Decoder>(
    decoder: &D,
    layout: &FlipFlopLayout,
    scores: ArrayView3<'_, f32>,
    trans: ArrayView4<'_, f32>,
    checkpoints: &[Checkpoint],
    terminal: ArrayView1<'_, usize>,
) -> Array2<usize> {
    let (t_len, batch, _) = scores.dim();
    let mut path = Array2::zeros((t_len + 1, batch));
    path.row_mut(t_len).assign(&terminal);

    let mut backptr = Array3::zeros((0, batch, layout.nstate()));
    for cp in checkpoints.iter().rev() {
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("replay_block", start = cp.start, end = cp.end).entered();
        if backptr.len_of(Axis(0)) != cp.len() {
            backptr = Array3::zeros((cp.len(), batch, layout.nstate()));
        }
        forward_range(
            decoder,
            layout,
            scores,
            trans,
            cp.start,
            cp.end,
            cp.fwd.clone(),
            Some(backptr.view_mut()),
            None,
        );
        follow(backptr.view(), cp.start, &mut path);
    }
    path
}

/// Fill `path[start .. start + len]` from pointers for timesteps
/// `start .. start + len`, given `path[start + len]`.
fn follow(backptr: ArrayView3<'_, Backpointer>, start: usize, path: &mut Array2<usize>) {
    for k in (0..backptr.len_of(Axis(0))).rev() {
        let t = start + k;
        for b in 0..path.ncols() {
            let next = path[[t + 1, b]];
            path[[t, b]] = usize::from(backptr[[k, b, next]]);
        }
    }
}

/// Score of the transition taken at each timestep along `path`, `(T, B)`.
pub fn step_scores(trans: ArrayView4<'_, f32>, path: ArrayView2<'_, usize>) -> Array2<f32> {
    let (t_len, batch, _, _) = trans.dim();
    Array2::from_shape_fn((t_len, batch), |(t, b)| {
        trans[[t, b, path[[t, b]], path[[t + 1, b]]]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn terminal_prefers_lowest_on_ties() {
        let ninf = f32::NEG_INFINITY;
        let fwd = array![[1.0, 3.0, 3.0], [ninf, ninf, ninf]];
        let (states, scores) = terminal_states(fwd.view());
        assert_eq!(states, array![1, 0]);
        assert_eq!(scores[0], 3.0);
        assert_eq!(scores[1], f32::NEG_INFINITY);
    }

    #[test]
    fn follows_pointers_backwards() {
        // two steps, one batch element, two states
        let backptr = array![[[1, 0]], [[0, 0]]];
        let path = backtrace(backptr.view(), array![1].view());
        assert_eq!(path.column(0).to_vec(), vec![1, 0, 1]);
    }

    #[test]
    fn empty_time_axis_keeps_terminal() {
        let backptr = Array3::<Backpointer>::zeros((0, 2, 4));
        let path = backtrace(backptr.view(), array![3, 1].view());
        assert_eq!(path, array![[3, 1]]);
    }

    #[test]
    fn step_scores_read_taken_transitions() {
        let mut trans = Array4::from_elem((2, 1, 2, 2), f32::NEG_INFINITY);
        trans[[0, 0, 1, 0]] = 2.5;
        trans[[1, 0, 0, 0]] = -1.0;
        let path = array![[1], [0], [0]];
        let steps = step_scores(trans.view(), path.view());
        assert_eq!(steps, array![[2.5], [-1.0]]);
    }
}
