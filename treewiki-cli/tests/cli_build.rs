use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn treewiki(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("treewiki").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn init_then_build_writes_site() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    treewiki(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("treewiki.yml").is_file());

    treewiki(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 'dictionary': 6 pages"));

    let public = dir.path().join("public");
    for file in [
        "index.html",
        "nouns/index.html",
        "nouns/kala.html",
        "nouns/pata.html",
        "verbs/sumu.html",
        "style.css",
        "search-index.json",
    ] {
        assert!(public.join(file).is_file(), "missing {file}");
    }

    let pata = fs::read_to_string(public.join("nouns/pata.html"))?;
    assert!(pata.contains("<title>pata</title>"));
    assert!(pata.contains("href=\"../style.css\""));
    assert!(pata.contains("See also <a href=\"kala.html\">kala</a>."));

    // kala and sumu are first under their elders, so they are cousins
    let kala = fs::read_to_string(public.join("nouns/kala.html"))?;
    assert!(kala.contains("<a href=\"../verbs/sumu.html\">sumu</a>"));

    Ok(())
}

#[test]
fn build_leaves_source_alone_unless_asked() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    treewiki(dir.path()).arg("init").assert().success();
    let source = dir.path().join("dictionary.txt");
    fs::write(&source, "[1]Dictionary\n[2]Nouns")?;

    treewiki(dir.path()).arg("build").assert().success();
    assert_eq!(fs::read_to_string(&source)?, "[1]Dictionary\n[2]Nouns");

    treewiki(dir.path())
        .args(["build", "--site", "dictionary", "--save-source"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&source)?, "[1]Dictionary\n[2]Nouns\n");
    Ok(())
}

#[test]
fn search_json_lists_matching_pages() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    treewiki(dir.path()).arg("init").assert().success();
    treewiki(dir.path()).arg("build").assert().success();

    let assert = treewiki(dir.path())
        .args(["search", "House", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    let arr = value.as_array().expect("json array");
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["site"], "dictionary");
    assert_eq!(arr[0]["name"], "kala");
    assert_eq!(arr[0]["url"], "nouns/kala.html");
    assert_eq!(
        arr[0]["sentences"],
        serde_json::json!(["house dwelling", "the house is old"])
    );
    Ok(())
}

#[test]
fn search_without_index_fails() {
    let dir = tempdir().unwrap();
    treewiki(dir.path()).arg("init").assert().success();
    treewiki(dir.path())
        .args(["search", "house"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("treewiki build"));
}

#[test]
fn tree_and_source_commands() {
    let dir = tempdir().unwrap();
    treewiki(dir.path()).arg("init").assert().success();

    treewiki(dir.path())
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("dictionary (leaf level 2)"))
        .stdout(predicate::str::contains("      kala (nouns/kala.html)"));

    let source = fs::read_to_string(dir.path().join("dictionary.txt")).unwrap();
    treewiki(dir.path())
        .args(["source", "--site", "dictionary"])
        .assert()
        .success()
        .stdout(source);

    treewiki(dir.path())
        .args(["source", "--site", "grammar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown site: grammar"));
}

#[test]
fn verify_reports_diagnostics() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    treewiki(dir.path()).arg("init").assert().success();
    fs::write(
        dir.path().join("dictionary.txt"),
        "[1]Dictionary\n[2]Nouns\n[3]kala\n[3]kala\n[z]odd block\n",
    )?;

    let assert = treewiki(dir.path())
        .args(["verify", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    assert_eq!(value["pages"], 4);
    assert_eq!(value["warnings"], 1);
    assert_eq!(value["errors"], 1);

    let codes: Vec<&str> = value["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .filter_map(|d| d["code"].as_str())
        .collect();
    assert!(codes.contains(&"parse.duplicate"));
    assert!(codes.contains(&"render.unknown-category"));
    Ok(())
}

#[test]
fn missing_template_is_reported_with_path() {
    let dir = tempdir().unwrap();
    treewiki(dir.path()).arg("init").assert().success();
    fs::remove_file(dir.path().join("template.html")).unwrap();

    treewiki(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("template.html"));
}
