//! Fused flip-flop kernel.
//!
//! Works directly on the compact score vector through the layout's
//! predecessor lists: each flip state has `S` predecessors and each flop
//! state only two, so a step costs `nbase·S + S` additions per batch element
//! instead of `S²`. One work item handles one batch element (or, for the
//! transition builder, one timestep) and items run on the rayon pool.
//! Returning from a call is the synchronisation point; no work outlives it.

use crate::dispatch::BackendKind;
use crate::layout::{Backpointer, FlipFlopLayout};
use crate::traits::{Decoder, StepScores};
use crate::utils::argmax;
use ndarray::{
    Array4, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, ArrayViewMut2, ArrayViewMut3, Axis,
    Zip,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeDecoder;

impl Decoder for NativeDecoder {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn make_trans(&self, layout: &FlipFlopLayout, scores: ArrayView3<'_, f32>) -> Array4<f32> {
        let (t, b, _) = scores.dim();
        let nstate = layout.nstate();
        let mut trans = Array4::from_elem((t, b, nstate, nstate), f32::NEG_INFINITY);

        let scatter = |mut trans_t: ArrayViewMut3<'_, f32>, scores_t: ArrayView2<'_, f32>| {
            for (mut cell, row) in trans_t.outer_iter_mut().zip(scores_t.outer_iter()) {
                for to in 0..nstate {
                    for p in layout.predecessors(to) {
                        cell[[p.from, to]] = row[p.channel];
                    }
                }
            }
        };

        let zip = Zip::from(trans.axis_iter_mut(Axis(0))).and(scores.axis_iter(Axis(0)));
        #[cfg(feature = "parallel")]
        zip.par_for_each(scatter);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(scatter);
        trans
    }

    fn forward_step(
        &self,
        layout: &FlipFlopLayout,
        step: StepScores<'_>,
        fwd: ArrayView2<'_, f32>,
        mut next: ArrayViewMut2<'_, f32>,
        mut backptr: ArrayViewMut2<'_, Backpointer>,
    ) {
        let kernel = |mut next_b: ArrayViewMut1<'_, f32>,
                      mut ptr_b: ArrayViewMut1<'_, Backpointer>,
                      fwd_b: ArrayView1<'_, f32>,
                      scores_b: ArrayView1<'_, f32>| {
            for to in 0..layout.nstate() {
                let (from, best) = argmax(
                    layout
                        .predecessors(to)
                        .iter()
                        .map(|p| (p.from, fwd_b[p.from] + scores_b[p.channel])),
                );
                next_b[to] = best;
                ptr_b[to] = from as Backpointer;
            }
        };

        let zip = Zip::from(next.rows_mut())
            .and(backptr.rows_mut())
            .and(fwd.rows())
            .and(step.compact.rows());
        #[cfg(feature = "parallel")]
        zip.par_for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(kernel);
    }
}
