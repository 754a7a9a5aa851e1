//! Integration tests for loading, editing and re-serialising a site
//!
//! These tests drive the core crate the way an editor would: load from a
//! configuration file, mutate pages, then serialise and index the result.

use std::fs;
use tempfile::tempdir;
use treewiki_core::{Config, Cousin, NodePath, Site, Tree};

const SOURCE: &str = "[1]Story\n\
[2]English\n[3]Chapter One\nThe ship sailed.\n[3]Chapter Two\nThe ship sank.\n\
[2]Conlang\n[3]Cheptor Wan\nLa nava veli.\n";

fn write_project(dir: &std::path::Path) -> Config {
    fs::write(dir.join("story.txt"), SOURCE).unwrap();
    fs::write(dir.join("replacements.txt"), "[i] <em>\n[/i] </em>\n").unwrap();
    fs::write(
        dir.join("treewiki.yml"),
        "sites:\n  - name: story\n    source: story.txt\n    template: story.html\n    replacements: replacements.txt\n    output: out\n    leaf_level: 2\n",
    )
    .unwrap();
    Config::from_file(dir.join("treewiki.yml")).unwrap()
}

#[test]
fn test_load_serialise_unchanged() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());
    let site = Site::load(config.site("story").unwrap()).unwrap();

    assert!(site.diagnostics().is_empty());
    assert_eq!(site.serialize(), SOURCE);
}

#[test]
fn test_cousins_across_versions() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());
    let site = Site::load(config.site("story").unwrap()).unwrap();
    let tree = site.tree();

    let one = tree.find("Chapter One").unwrap();
    let wan = tree.find("Cheptor Wan").unwrap();
    assert_eq!(tree.cousins(one), vec![Cousin::Page(wan)]);

    let two = tree.find("Chapter Two").unwrap();
    assert!(matches!(
        tree.cousins(two).as_slice(),
        [Cousin::Placeholder { .. }]
    ));
}

#[test]
fn test_edit_then_reparse_keeps_identity() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());
    let mut site = Site::load(config.site("story").unwrap()).unwrap();

    let two = site.tree().find("Chapter Two").unwrap();
    let path = site.tree().path(two);
    site.set_markdown(two, "The ship <em>sank</em>.\n");
    site.save_source().unwrap();

    let saved = fs::read_to_string(dir.path().join("story.txt")).unwrap();
    assert!(saved.contains("The ship [i]sank[/i].\n&date="));

    let reparsed = Tree::parse(&saved, 2).unwrap().tree;
    let again = reparsed.find_path(&path).unwrap();
    assert_eq!(reparsed.path(again), path);
    assert_eq!(
        path,
        NodePath::from(vec![
            "Story".to_string(),
            "English".to_string(),
            "Chapter Two".to_string(),
        ])
    );
}

#[test]
fn test_index_and_render_loaded_site() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());
    let site = Site::load(config.site("story").unwrap()).unwrap();

    let analysis = site.analysis();
    assert_eq!(analysis.names.len(), 6);
    let hits = analysis.lookup("ship");
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(urls, vec!["english/chapterone.html", "english/chaptertwo.html"]);

    let wan = site.tree().find("Cheptor Wan").unwrap();
    let rendered = site.renderer().render(wan).unwrap();
    assert_eq!(
        rendered.html,
        "<h3 id=\"cheptorwan\">Cheptor Wan</h3>\n<p>La nava veli.</p>"
    );
}
