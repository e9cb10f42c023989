//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::exam::{SegmenterError, SegmenterRules};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to build question rules: {0}")]
    Rules(#[from] SegmenterError),
}

/// Shared application state
///
/// Immutable after startup; requests never write to it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    rules: SegmenterRules,
}

impl AppState {
    /// Create a new application state, compiling the line rules once
    pub fn new(config: Config) -> Result<Self, StateError> {
        let rules = SegmenterRules::new(&config.exam.question_marker, config.exam.max_answer_letter)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, rules }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the compiled segmenter rules
    pub fn rules(&self) -> &SegmenterRules {
        &self.inner.rules
    }
}
