//! Init command implementation.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::fs;
use std::path::Path;

// Starter project embedded at compile time so it's available after cargo install
static SCAFFOLD: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/scaffold");

/// Initialize a new treewiki project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_dir(&SCAFFOLD, root)?;

    println!("✓ treewiki initialized in {:?}", root);
    println!("  - Edit treewiki.yml to configure sites");
    println!("  - Write pages in dictionary.txt, then run `treewiki build`");
    Ok(())
}

/// Copy embedded files into `root`, keeping any that already exist
fn write_dir(dir: &Dir<'_>, root: &Path) -> Result<()> {
    for file in dir.files() {
        let target = root.join(file.path());
        if target.exists() {
            println!("{:?} already exists", target);
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&target, file.contents())
            .with_context(|| format!("Failed to write {:?}", target))?;
        println!("Created {:?}", target);
    }
    for sub in dir.dirs() {
        write_dir(sub, root)?;
    }
    Ok(())
}
