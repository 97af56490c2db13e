use crate::dispatch::{BackendRequest, BackendSelector};
use crate::engine::{DecodeConfig, Traceback, ViterbiEngine};
use crate::probe::Capabilities;
use crate::viterbi::InitialState;

pub struct ViterbiEngineBuilder {
    config: DecodeConfig,
    capabilities: Option<Capabilities>,
}

impl Default for ViterbiEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ViterbiEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: DecodeConfig::default(),
            capabilities: None,
        }
    }
    pub fn with_nbase(mut self, nbase: usize) -> Self {
        self.config.nbase = Some(nbase);
        self
    }
    pub fn with_initial_state(mut self, initial_state: InitialState) -> Self {
        self.config.initial_state = initial_state;
        self
    }
    pub fn with_traceback(mut self, traceback: Traceback) -> Self {
        self.config.traceback = traceback;
        self
    }
    pub fn checkpointed(self) -> Self {
        self.with_traceback(Traceback::Checkpointed { block_size: None })
    }
    pub fn keep_score_table(mut self, keep: bool) -> Self {
        self.config.keep_score_table = keep;
        self
    }
    pub fn with_backend(mut self, request: BackendRequest) -> Self {
        self.config.backend = request;
        self
    }
    /// Force the portable backend regardless of residency or capability.
    pub fn portable_only(self) -> Self {
        self.with_backend(BackendRequest::Portable)
    }
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
    pub fn build(self) -> ViterbiEngine {
        match self.capabilities {
            Some(caps) => ViterbiEngine::with_selector(self.config, BackendSelector::new(caps)),
            None => ViterbiEngine::with_config(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_field() {
        let engine = ViterbiEngineBuilder::new()
            .with_nbase(4)
            .with_initial_state(InitialState::Uniform)
            .checkpointed()
            .keep_score_table(true)
            .portable_only()
            .with_capabilities(Capabilities::portable_only())
            .build();
        let cfg = engine.config();
        assert_eq!(cfg.nbase, Some(4));
        assert_eq!(cfg.initial_state, InitialState::Uniform);
        assert_eq!(cfg.traceback, Traceback::Checkpointed { block_size: None });
        assert!(cfg.keep_score_table);
        assert_eq!(cfg.backend, BackendRequest::Portable);
        let caps = engine.selector().capabilities();
        assert!(!caps.native_kernel.is_available());
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let engine = ViterbiEngineBuilder::new().build();
        assert_eq!(engine.config(), &DecodeConfig::default());
    }
}
