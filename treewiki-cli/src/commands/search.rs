//! Search command implementation
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use treewiki_core::{Analysis, Config, SearchHit};

#[derive(Debug, Serialize)]
struct SiteHit<'a> {
    site: &'a str,
    #[serde(flatten)]
    hit: SearchHit,
}

/// Look up a word in the built index of each selected site
pub fn search_sites(config_path: &Path, word: &str, site: Option<&str>, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    let mut results = Vec::new();
    for site_config in config.select(site)? {
        let index_path = site_config.search_index_path();
        if !index_path.exists() {
            bail!(
                "Search index not found at {:?}. Run `treewiki build` first.",
                index_path
            );
        }

        let index_json = fs::read_to_string(&index_path).context("Failed to read search index")?;
        let analysis = Analysis::from_json(&index_json).context("Failed to parse search index")?;
        results.extend(analysis.lookup(word).into_iter().map(|hit| SiteHit {
            site: &site_config.name,
            hit,
        }));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for '{}'", word);
        return Ok(());
    }

    println!("Found '{}' on {} pages:\n", word, results.len());
    for result in &results {
        println!("[{}] {}", result.site, result.hit.name);
        println!("  {}", result.hit.url);
        for sentence in &result.hit.sentences {
            println!("  - {}", sentence);
        }
        println!();
    }
    Ok(())
}
