//! Assorted helpers shared by every backend.
//!
//! Both backends pick maxima through [`argmax`], which is what makes their
//! backtrace pointers agree bit for bit.

/// Block length for checkpointed traceback over `num_steps` timesteps (≈ √T).
#[inline]
pub fn default_block_size(num_steps: usize) -> usize {
    if num_steps <= 1 {
        1
    } else {
        (num_steps as f64).sqrt().ceil() as usize
    }
}

/// Index and value of the maximum of `(index, value)` candidates.
///
/// Candidates are scanned in the given order and only a strictly greater
/// value replaces the incumbent, so ties go to the first candidate. NaN never
/// wins. If no candidate exceeds −∞ the result is `(0, −∞)`.
#[inline]
pub fn argmax<I>(candidates: I) -> (usize, f32)
where
    I: IntoIterator<Item = (usize, f32)>,
{
    let mut best = f32::NEG_INFINITY;
    let mut arg = 0;
    for (idx, value) in candidates {
        if value > best {
            best = value;
            arg = idx;
        }
    }
    (arg, best)
}
