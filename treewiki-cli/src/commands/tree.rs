//! Print the page outline of each site.

use anyhow::{Context, Result};
use std::path::Path;
use treewiki_core::{Config, Site};

pub fn print_tree(config_path: &Path, site: Option<&str>) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    for site_config in config.select(site)? {
        let site = Site::load(site_config)?;
        let tree = site.tree();
        let links = site.links();

        println!("{} (leaf level {})", site.name(), tree.leaf_level());
        for id in tree.traverse() {
            println!(
                "{}{} ({})",
                "  ".repeat(tree.generation(id) + 1),
                tree.name(id),
                links.output_path(id)
            );
        }
    }
    Ok(())
}
