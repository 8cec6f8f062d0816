//! Pass pipeline
//!
//! This module runs the configured transformation passes over translated
//! function bodies, one function per task.

use crate::error::{Error, Result};
use crate::il::IlFunction;
use crate::transforms::{ConstantFoldingPass, InlineReport, InliningPass, Transform};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which passes run, and whether the result is verified afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    /// Nest stack producers into their consumers
    pub inline: bool,
    /// Fold constant subexpressions after inlining
    pub fold_constants: bool,
    /// Re-check flags and back-references after every pass
    pub verify: bool,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            inline: true,
            fold_constants: false,
            verify: true,
        }
    }
}

impl InlineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// What the passes did to one function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionReport {
    pub name: String,
    pub inlining: Option<InlineReport>,
    pub folded: usize,
    pub live_instructions: usize,
}

/// Main pipeline struct
#[derive(Debug, Clone, Default)]
pub struct Decompiler {
    config: InlineConfig,
}

impl Decompiler {
    pub fn new(config: InlineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InlineConfig {
        &self.config
    }

    /// Run every enabled pass on one function
    pub fn process_function(&self, func: &mut IlFunction) -> Result<FunctionReport> {
        let mut inlining = InliningPass::new(self.config.inline);
        let mut folding = ConstantFoldingPass::new(self.config.fold_constants);
        {
            let passes: [&mut dyn Transform; 2] = [&mut inlining, &mut folding];
            for pass in passes {
                if !pass.should_run() {
                    continue;
                }
                log::debug!("Running {} on {}", pass.name(), func.name());
                pass.run(func)?;
                if self.config.verify {
                    func.verify()?;
                }
            }
        }

        Ok(FunctionReport {
            name: func.name().to_string(),
            inlining: inlining.last_report(),
            folded: folding.folded(),
            live_instructions: func.live_count(),
        })
    }

    /// Process independent functions in parallel, one task per function
    pub fn process_functions(&self, funcs: &mut [IlFunction]) -> Vec<Result<FunctionReport>> {
        funcs
            .par_iter_mut()
            .map(|func| self.process_function(func))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InlineConfig::default();
        assert!(config.inline);
        assert!(!config.fold_constants);
        assert!(config.verify);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = InlineConfig::from_json(r#"{ "fold_constants": true }"#).unwrap();
        assert!(config.inline);
        assert!(config.fold_constants);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let err = InlineConfig::from_json(r#"{ "inline": 3 }"#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
