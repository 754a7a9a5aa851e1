//! Print a site's serialised source.

use anyhow::{Context, Result};
use std::path::Path;
use treewiki_core::{Config, Site};

pub fn print_source(config_path: &Path, site: &str) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let site = Site::load(config.site(site)?)?;
    print!("{}", site.serialize());
    Ok(())
}
