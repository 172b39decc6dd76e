//! Application state.

use std::sync::Arc;

use hclip_pipeline::{HighlightPipeline, PipelineConfig, ScratchSpace};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<HighlightPipeline>,
}

impl AppState {
    /// Create state around an already built pipeline.
    pub fn new(config: ApiConfig, pipeline: HighlightPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Create state with the default collaborators configured from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        let pipeline = HighlightPipeline::from_config(PipelineConfig::from_env());
        Self::new(config, pipeline)
    }

    pub fn scratch(&self) -> &ScratchSpace {
        self.pipeline.scratch()
    }
}
