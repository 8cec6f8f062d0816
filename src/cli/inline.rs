use crate::decompiler::{Decompiler, InlineConfig};
use crate::error::{Error, Result};
use crate::listing::Listing;
use std::fmt::Write;
use std::path::PathBuf;

/// Arguments of the inline subcommand
#[derive(Debug, Clone)]
pub struct InlineArgs {
    pub inputs: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub fold: bool,
    pub no_verify: bool,
    pub stats: bool,
    pub output_path: Option<PathBuf>,
}

impl InlineArgs {
    /// Configuration file contents with command-line overrides applied
    pub fn config(&self) -> Result<InlineConfig> {
        let mut config = match &self.config_path {
            Some(path) => InlineConfig::from_path(path)?,
            None => InlineConfig::default(),
        };
        if self.fold {
            config.fold_constants = true;
        }
        if self.no_verify {
            config.verify = false;
        }
        Ok(config)
    }
}

/// Run the inline subcommand
pub fn inline(args: &InlineArgs) -> Result<()> {
    let config = args.config()?;
    log::debug!("Pipeline configuration: {:?}", config);

    let mut funcs = args
        .inputs
        .iter()
        .map(|path| Listing::from_path(path)?.build())
        .collect::<Result<Vec<_>>>()?;

    let decompiler = Decompiler::new(config);
    let reports = decompiler
        .process_functions(&mut funcs)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let mut output = String::new();
    for func in &funcs {
        writeln!(output, "{}", func).map_err(|e| Error::internal(e.to_string()))?;
    }
    if args.stats {
        let stats = serde_json::to_string_pretty(&reports)?;
        writeln!(output, "{}", stats).map_err(|e| Error::internal(e.to_string()))?;
    }

    super::utils::write_output(&output, args.output_path.as_deref())
}
