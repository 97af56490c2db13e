#![cfg(feature = "native-kernel")]

use flipflop_decode::{
    BackendKind, BackendRequest, Capabilities, Device, InitialState, Scores, Traceback,
    ViterbiEngine, ViterbiEngineBuilder, ViterbiOutput, SCORE_TOLERANCE,
};
use ndarray::Array3;
use proptest::prelude::*;

fn engine(request: BackendRequest, traceback: Traceback) -> ViterbiEngine {
    ViterbiEngineBuilder::new()
        .with_backend(request)
        .with_traceback(traceback)
        .with_capabilities(Capabilities::with_native_kernel())
        .build()
}

fn decode_both(scores: &Scores, traceback: Traceback) -> (ViterbiOutput, ViterbiOutput) {
    let portable = engine(BackendRequest::Portable, traceback).decode(scores).unwrap();
    let native = engine(BackendRequest::Native { fallback: false }, traceback)
        .decode(scores)
        .unwrap();
    assert_eq!(portable.backend, BackendKind::Portable);
    assert_eq!(native.backend, BackendKind::Native);
    (portable, native)
}

fn alphabet() -> impl Strategy<Value = usize> {
    prop_oneof![Just(2usize), Just(4usize)]
}

/// Continuous scores for an alphabet of 2 or 4 bases.
fn scores_strategy() -> impl Strategy<Value = Array3<f32>> {
    (alphabet(), 1usize..24, 1usize..5).prop_flat_map(|(nbase, t, b)| {
        let c = 2 * nbase * (nbase + 1);
        prop::collection::vec(-8.0f32..8.0, t * b * c)
            .prop_map(move |v| Array3::from_shape_vec((t, b, c), v).unwrap())
    })
}

/// Small integer scores: ties everywhere, so tie-breaking is exercised.
fn tied_scores_strategy() -> impl Strategy<Value = Array3<f32>> {
    (alphabet(), 1usize..16, 1usize..4).prop_flat_map(|(nbase, t, b)| {
        let c = 2 * nbase * (nbase + 1);
        prop::collection::vec(-1i8..=1, t * b * c).prop_map(move |v| {
            let v: Vec<f32> = v.into_iter().map(f32::from).collect();
            Array3::from_shape_vec((t, b, c), v).unwrap()
        })
    })
}

proptest! {
    #[test]
    fn native_matches_portable(raw in scores_strategy()) {
        let scores = Scores::host(raw).to_device(Device::Accelerator(0));
        let (portable, native) = decode_both(&scores, Traceback::Full);
        prop_assert_eq!(&portable.path, &native.path);
        prop_assert!(portable.agrees_with(&native, SCORE_TOLERANCE));
        prop_assert_eq!(&portable.trans, &native.trans);
        prop_assert_eq!(&portable.step_scores, &native.step_scores);
    }

    #[test]
    fn native_matches_portable_under_ties(raw in tied_scores_strategy()) {
        let scores = Scores::host(raw);
        let (portable, native) = decode_both(&scores, Traceback::Full);
        prop_assert_eq!(&portable.path, &native.path);
        prop_assert_eq!(&portable.best_score, &native.best_score);
    }

    #[test]
    fn checkpointed_matches_full(raw in scores_strategy(), block in 1usize..6) {
        let scores = Scores::host(raw);
        let traceback = Traceback::Checkpointed { block_size: Some(block) };
        let (full, _) = decode_both(&scores, Traceback::Full);
        let (portable, native) = decode_both(&scores, traceback);
        prop_assert_eq!(&full.path, &portable.path);
        prop_assert_eq!(&full.path, &native.path);
        prop_assert_eq!(&full.best_score, &portable.best_score);
        prop_assert_eq!(&full.best_score, &native.best_score);
    }

    #[test]
    fn uniform_start_matches_too(raw in scores_strategy()) {
        let scores = Scores::host(raw);
        let uniform = |request| {
            ViterbiEngineBuilder::new()
                .with_backend(request)
                .with_initial_state(InitialState::Uniform)
                .with_capabilities(Capabilities::with_native_kernel())
                .build()
                .decode(&scores)
                .unwrap()
        };
        let portable = uniform(BackendRequest::Portable);
        let native = uniform(BackendRequest::Native { fallback: false });
        prop_assert!(portable.agrees_with(&native, SCORE_TOLERANCE));
    }
}

#[test]
fn long_read_matches_across_backends() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(7);
    let (t, b, c) = (2_000, 3, 40);
    let raw = Array3::from_shape_fn((t, b, c), |_| rng.gen_range(-3.0f32..3.0));
    let scores = Scores::host(raw);
    let (portable, native) = decode_both(&scores, Traceback::Full);
    assert_eq!(portable.path, native.path);
    assert!(portable.agrees_with(&native, SCORE_TOLERANCE));
    let (_, checkpointed) = decode_both(&scores, Traceback::Checkpointed { block_size: None });
    assert_eq!(checkpointed.path, native.path);
}
