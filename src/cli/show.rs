use crate::error::Result;
use crate::listing::Listing;
use std::path::Path;

/// Run the show subcommand
pub fn show(input_path: &Path) -> Result<()> {
    let func = Listing::from_path(input_path)?.build()?;
    super::utils::write_output(&format!("{}\n", func), None)
}
