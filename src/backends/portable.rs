//! Portable backend: dense transition tensor and array-wide max-plus steps.
//!
//! The transition builder scatters whole `(T, B)` planes at once, one plane
//! per score channel. Each forward step materialises every candidate
//! `fwd[b, from] + trans[b, from, to]` by broadcasting and reduces over
//! `from`, so forbidden entries are scanned too and simply lose as −∞.

use crate::dispatch::BackendKind;
use crate::layout::{Backpointer, FlipFlopLayout};
use crate::traits::{Decoder, StepScores};
use crate::utils::argmax;
use ndarray::{s, Array4, ArrayView2, ArrayView3, ArrayViewMut1, ArrayViewMut2, Axis, Zip};

/// Vectorised implementation that runs wherever ndarray runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PortableDecoder;

impl Decoder for PortableDecoder {
    fn kind(&self) -> BackendKind {
        BackendKind::Portable
    }

    fn make_trans(&self, layout: &FlipFlopLayout, scores: ArrayView3<'_, f32>) -> Array4<f32> {
        let (t, b, _) = scores.dim();
        let nstate = layout.nstate();
        let mut trans = Array4::from_elem((t, b, nstate, nstate), f32::NEG_INFINITY);
        for (channel, tr) in layout.transitions().iter().enumerate() {
            trans
                .slice_mut(s![.., .., tr.from, tr.to])
                .assign(&scores.slice(s![.., .., channel]));
        }
        trans
    }

    fn forward_step(
        &self,
        _layout: &FlipFlopLayout,
        step: StepScores<'_>,
        fwd: ArrayView2<'_, f32>,
        mut next: ArrayViewMut2<'_, f32>,
        mut backptr: ArrayViewMut2<'_, Backpointer>,
    ) {
        // cand[b, from, to] = fwd[b, from] + trans[b, from, to]
        let cand = &fwd.insert_axis(Axis(2)) + &step.trans;

        let reduce = |mut next_b: ArrayViewMut1<'_, f32>,
                      mut ptr_b: ArrayViewMut1<'_, Backpointer>,
                      cand_b: ArrayView2<'_, f32>| {
            for (to, column) in cand_b.axis_iter(Axis(1)).enumerate() {
                let (from, best) = argmax(column.iter().copied().enumerate());
                next_b[to] = best;
                ptr_b[to] = from as Backpointer;
            }
        };

        let zip = Zip::from(next.rows_mut())
            .and(backptr.rows_mut())
            .and(cand.axis_iter(Axis(0)));
        #[cfg(feature = "parallel")]
        zip.par_for_each(reduce);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(reduce);
    }
}
