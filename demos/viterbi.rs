//! Example: decoding a short two-base read.
//!
//! Run with:
//! `cargo run --example viterbi`

use flipflop_decode::{flipflop_viterbi, BackendRequest, DecodeError, FlipFlopLayout, Scores};
use ndarray::Array3;

fn main() -> Result<(), DecodeError> {
    // Alphabet of 2 bases: states A, B (flip) and a, b (flop), 12 channels.
    // Each timestep puts a score of 1 on one channel.
    let hot = [1, 8, 10, 6, 5, 1, 0];
    let mut scores = Array3::<f32>::zeros((hot.len(), 1, 12));
    for (t, &channel) in hot.iter().enumerate() {
        scores[[t, 0, channel]] = 1.0;
    }

    let out = flipflop_viterbi(&Scores::host(scores), BackendRequest::Auto)?;
    out.ensure_reachable()?;

    let layout = FlipFlopLayout::shared(2)?;
    let names = ["A", "B", "a", "b"];
    let best = out.best_score[0];
    println!("Best path score: {best} ({} backend)", out.backend);
    println!("State sequence:");
    for (t, &state) in out.path_of(0).iter().enumerate() {
        let kind = if layout.is_flip(state) { "flip" } else { "flop" };
        println!("  t = {t:2}, state = {} ({kind})", names[state]);
    }

    // A base is called on the first state and on every change of state.
    let path = out.path_of(0);
    let mut called = String::new();
    for (t, &state) in path.iter().enumerate() {
        if t == 0 || path[t - 1] != state {
            called.push_str(&names[layout.base_of(state)].to_uppercase());
        }
    }
    println!("Called bases: {called}");
    Ok(())
}
