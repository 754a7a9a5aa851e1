//! Build command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use treewiki_core::{Config, Site, SiteConfig};
use treewiki_render::{PublishOptions, PublishReport, Publisher};
use walkdir::WalkDir;

/// Publish the named site, or every configured site
pub fn build_sites(config_path: &Path, site: Option<&str>, save_source: bool) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let options = PublishOptions {
        write_source: save_source,
        ..PublishOptions::default()
    };

    for site_config in config.select(site)? {
        let report = build_site(site_config, &options)?;
        println!(
            "Built '{}': {} pages written to {}",
            site_config.name,
            report.pages_written,
            site_config.output.display()
        );
    }
    Ok(())
}

/// Load, publish and copy assets for one site
pub fn build_site(config: &SiteConfig, options: &PublishOptions) -> Result<PublishReport> {
    tracing::info!("Building site: {}", config.name);

    let site = Site::load(config).with_context(|| format!("Failed to load site '{}'", config.name))?;
    let publisher = Publisher::from_site(&site)?;
    let report = publisher
        .publish(options)
        .with_context(|| format!("Failed to publish site '{}'", config.name))?;

    if let Some(assets) = &config.assets {
        copy_dir(assets, &config.output)
            .with_context(|| format!("Failed to copy assets from {:?}", assets))?;
    }

    Ok(report)
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", entry.path(), target))?;
    }
    Ok(())
}
