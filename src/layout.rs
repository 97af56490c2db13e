//! Flip-flop state space and the bijection between score channels and
//! `(from, to)` transitions.
//!
//! For an alphabet of `nbase` symbols there are `S = 2·nbase` states:
//! states `0..nbase` are *flip* states and `nbase..S` are *flop* states.
//!
//! - A flip state may be entered from every state. Entering it from itself
//!   is a stay; from any other state it is a step that emits its base.
//! - A flop state may only be entered from the flip state of the same base
//!   (a step that repeats the base) or from itself (a stay).
//!
//! Every other `(from, to)` pair is forbidden and scores −∞. This leaves
//! exactly `2·nbase·(nbase+1)` permitted transitions per timestep, one per
//! score channel:
//!
//! | channel range                       | transition             |
//! |-------------------------------------|------------------------|
//! | `to·S + from` for `to < nbase`      | any `from` → flip `to` |
//! | `S·nbase + b`                       | flip `b` → flop `b`    |
//! | `S·nbase + nbase + b`               | flop `b` → flop `b`    |
//!
//! The table is computed once per alphabet size and shared by the transition
//! builder and both decoder backends.

use crate::error::{DecodeError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Stored predecessor index in backtrace pointer tables.
pub type Backpointer = u16;

/// Largest alphabet whose states fit in a [`Backpointer`].
pub const MAX_NBASE: usize = (Backpointer::MAX as usize + 1) / 2;

static LAYOUTS: Lazy<Mutex<HashMap<usize, Arc<FlipFlopLayout>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Whether a transition emits a new base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Same state; nothing is emitted.
    Stay,
    /// Different state; the destination's base is emitted.
    Step,
}

/// One permitted transition, addressed by its score channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub kind: TransitionKind,
}

/// A permitted predecessor of some destination state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predecessor {
    pub from: usize,
    pub channel: usize,
}

/// Precomputed channel ↔ transition lookup for one alphabet size.
#[derive(Debug, PartialEq, Eq)]
pub struct FlipFlopLayout {
    nbase: usize,
    /// Indexed by channel.
    transitions: Vec<Transition>,
    /// Indexed by destination state; sorted by ascending `from`.
    predecessors: Vec<Vec<Predecessor>>,
}

/// Number of score channels for an alphabet of `nbase` symbols.
#[inline]
pub const fn flipflop_channels(nbase: usize) -> usize {
    2 * nbase * (nbase + 1)
}

/// Infer the alphabet size from a channel count.
///
/// Fails with [`DecodeError::ShapeMismatch`] unless `channels == 2n(n+1)`
/// for some `n ≥ 1`. The error reports the largest valid count below
/// `channels`.
pub fn flipflop_nbase(channels: usize) -> Result<usize> {
    // n = (√(1 + 2C) − 1) / 2, rounded down; exactness is checked below
    let root = (((channels as f64) * 2.0 + 1.0).sqrt() - 1.0) / 2.0;
    let root = root.floor() as usize;
    let candidates = root.saturating_sub(1).max(1)..=root.saturating_add(1).max(1);
    let exact = |n: &usize| checked_channels(*n) == Some(channels);
    if let Some(n) = candidates.clone().find(exact) {
        return Ok(n);
    }
    let nearest = candidates
        .rev()
        .filter_map(checked_channels)
        .find(|&c| c < channels)
        .unwrap_or(flipflop_channels(1));
    Err(DecodeError::shape("score channels", [nearest], [channels]))
}

fn checked_channels(nbase: usize) -> Option<usize> {
    nbase.checked_add(1)?.checked_mul(nbase)?.checked_mul(2)
}

impl FlipFlopLayout {
    /// Build the table for `nbase` symbols.
    pub fn new(nbase: usize) -> Result<Self> {
        if nbase == 0 {
            return Err(DecodeError::shape("alphabet size", [1], [0]));
        }
        if nbase > MAX_NBASE {
            return Err(DecodeError::shape("alphabet size", [MAX_NBASE], [nbase]));
        }
        let nstate = 2 * nbase;
        let mut transitions = Vec::with_capacity(flipflop_channels(nbase));
        for to in 0..nbase {
            for from in 0..nstate {
                transitions.push(Transition {
                    from,
                    to,
                    kind: if from == to {
                        TransitionKind::Stay
                    } else {
                        TransitionKind::Step
                    },
                });
            }
        }
        for b in 0..nbase {
            transitions.push(Transition {
                from: b,
                to: nbase + b,
                kind: TransitionKind::Step,
            });
        }
        for b in 0..nbase {
            transitions.push(Transition {
                from: nbase + b,
                to: nbase + b,
                kind: TransitionKind::Stay,
            });
        }

        let mut predecessors = vec![Vec::new(); nstate];
        for (channel, tr) in transitions.iter().enumerate() {
            predecessors[tr.to].push(Predecessor {
                from: tr.from,
                channel,
            });
        }
        for preds in &mut predecessors {
            preds.sort_by_key(|p| p.from);
        }

        let layout = Self {
            nbase,
            transitions,
            predecessors,
        };
        debug_assert_eq!(layout.transitions.len(), flipflop_channels(nbase));
        debug_assert!(layout
            .transitions
            .iter()
            .enumerate()
            .all(|(c, tr)| layout.channel(tr.from, tr.to) == Some(c)));
        Ok(layout)
    }

    /// Process-wide shared table for `nbase` symbols, built on first use.
    pub fn shared(nbase: usize) -> Result<Arc<Self>> {
        let mut cache = LAYOUTS.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(layout) = cache.get(&nbase) {
            return Ok(Arc::clone(layout));
        }
        let layout = Arc::new(Self::new(nbase)?);
        cache.insert(nbase, Arc::clone(&layout));
        Ok(layout)
    }

    /// Shared table for a score tensor with `channels` channels.
    pub fn for_channels(channels: usize) -> Result<Arc<Self>> {
        Self::shared(flipflop_nbase(channels)?)
    }

    #[inline]
    pub fn nbase(&self) -> usize {
        self.nbase
    }

    /// Number of states `S = 2·nbase`.
    #[inline]
    pub fn nstate(&self) -> usize {
        2 * self.nbase
    }

    /// Number of score channels `2·nbase·(nbase+1)`.
    #[inline]
    pub fn nchannel(&self) -> usize {
        self.transitions.len()
    }

    /// All permitted transitions, indexed by channel.
    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Permitted predecessors of `to`, in ascending `from` order.
    #[inline]
    pub fn predecessors(&self, to: usize) -> &[Predecessor] {
        &self.predecessors[to]
    }

    #[inline]
    pub fn is_flip(&self, state: usize) -> bool {
        state < self.nbase
    }

    /// Base emitted (or held) by `state`.
    #[inline]
    pub fn base_of(&self, state: usize) -> usize {
        state % self.nbase
    }

    /// Channel scoring `from → to`, or `None` when the transition is forbidden.
    pub fn channel(&self, from: usize, to: usize) -> Option<usize> {
        let n = self.nbase;
        let s = self.nstate();
        if from >= s || to >= s {
            None
        } else if to < n {
            Some(to * s + from)
        } else if from == to || from + n == to {
            Some(s * n + from)
        } else {
            None
        }
    }
}
