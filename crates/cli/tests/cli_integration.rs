//! End-to-end tests driving the `tt` binary

mod common;

use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_documents(dir: &Path) -> Result<()> {
    let docs = serde_json::json!([
        { "path": "notes/n1.md", "tags": ["project/alpha"] },
        { "path": "notes/n2.md", "tags": ["#project/beta"], "title": "Beta plan" },
        { "path": "notes/loose.md", "tags": [] },
    ]);
    fs::write(dir.join("docs.json"), serde_json::to_string_pretty(&docs)?)?;
    Ok(())
}

#[test]
fn test_tree_outline_splits_nested_tags() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path())?;

    let result = tt!(dir.path(), "tree", "--documents", "docs.json", "--outline").assert_success()?;
    let lines = result.tree_lines();
    let project = lines.iter().position(|l| *l == "project").expect("project folder");
    assert_eq!(
        &lines[project..project + 5],
        &["project", "  → alpha", "    notes/n1.md", "  → beta", "    notes/n2.md"]
    );
    assert!(lines.contains(&"_untagged"));
    Ok(())
}

#[test]
fn test_tree_labels_and_counts() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path())?;

    let result = tt!(dir.path(), "tree", "--documents", "docs.json", "--counts").assert_success()?;
    let lines = result.tree_lines();
    assert!(lines.contains(&"project (2)"));
    assert!(lines.contains(&"    Beta plan"));
    assert!(result.contains_stdout("3 items"));
    Ok(())
}

#[test]
fn test_tree_search_filters_documents() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path())?;

    let result = tt!(dir.path(), "tree", "--documents", "docs.json", "--outline", "--search", "alpha").assert_success()?;
    assert!(result.contains_stdout("notes/n1.md"));
    assert!(!result.contains_stdout("notes/n2.md"));
    assert!(!result.contains_stdout("notes/loose.md"));
    Ok(())
}

#[test]
fn test_tree_reads_settings_next_to_documents() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path())?;
    fs::write(dir.path().join("tagtree.toml"), "expand_untagged_to_root = true\n")?;

    let result = tt!(dir.path(), "tree", "--documents", "docs.json", "--outline").assert_success()?;
    let lines = result.tree_lines();
    assert!(!lines.contains(&"_untagged"));
    assert!(lines.contains(&"notes/loose.md"));
    Ok(())
}

#[test]
fn test_canvas_documents_get_virtual_folder() -> Result<()> {
    let dir = TempDir::new()?;
    let docs = serde_json::json!([
        { "path": "boards/plan.canvas", "tags": [] },
        { "path": "a.md", "tags": ["alpha"] },
    ]);
    fs::write(dir.path().join("docs.json"), docs.to_string())?;

    let outline = tt!(dir.path(), "tree", "--documents", "docs.json", "--outline").assert_success()?;
    let lines = outline.tree_lines();
    let canvas = lines.iter().position(|l| *l == "_VIRTUAL_TAG_CANVAS").expect("canvas folder");
    let under: Vec<&str> = lines[canvas + 1..].iter().copied().take_while(|l| l.starts_with("  ")).collect();
    assert!(under.contains(&"  boards/plan.canvas"));

    let rendered = tt!(dir.path(), "tree", "--documents", "docs.json").assert_success()?;
    assert!(rendered.contains_stdout("📋 Canvas"));
    Ok(())
}

#[test]
fn test_pins_reorder_top_level() -> Result<()> {
    let dir = TempDir::new()?;
    let docs = serde_json::json!([
        { "path": "a.md", "tags": ["alpha"] },
        { "path": "z.md", "tags": ["zeta"] },
    ]);
    fs::write(dir.path().join("docs.json"), docs.to_string())?;
    fs::write(dir.path().join("tagtree.toml"), "use_tag_info = true\n")?;

    tt!(dir.path(), "pins", "--tag-info", "info.json", "add", "zeta").assert_success()?;
    let listed = tt!(dir.path(), "pins", "--tag-info", "info.json").assert_success()?;
    assert!(listed.contains_stdout("zeta"));

    let result =
        tt!(dir.path(), "tree", "--documents", "docs.json", "--tag-info", "info.json", "--outline").assert_success()?;
    assert_eq!(result.tree_lines(), vec!["zeta", "  z.md", "alpha", "  a.md"]);

    tt!(dir.path(), "pins", "--tag-info", "info.json", "remove", "zeta").assert_success()?;
    tt!(dir.path(), "pins", "--tag-info", "info.json", "remove", "zeta").assert_failure()?;
    Ok(())
}

#[test]
fn test_malformed_tag_info_is_not_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path())?;
    fs::write(dir.path().join("bad.json"), "{not json")?;

    let result =
        tt!(dir.path(), "tree", "--documents", "docs.json", "--tag-info", "bad.json").assert_success()?;
    assert!(result.contains_stderr("malformed tag info"));
    assert!(result.contains_stdout("project"));
    Ok(())
}

#[test]
fn test_config_set_get_and_validation() -> Result<()> {
    let dir = TempDir::new()?;

    tt!(dir.path(), "config", "--set", "merge_redundant_combination", "true").assert_success()?;
    let got = tt!(dir.path(), "config", "--get", "merge_redundant_combination").assert_success()?;
    assert_eq!(got.stdout.trim(), "true");

    tt!(dir.path(), "config", "--set", "sort_type", "MTIME_DESC").assert_success()?;
    let got = tt!(dir.path(), "config", "--get", "sort_type").assert_success()?;
    assert_eq!(got.stdout.trim(), "MTIME_DESC");

    tt!(dir.path(), "config", "--set", "expand_depth", "99").assert_failure()?;
    let unknown = tt!(dir.path(), "config", "--set", "no_such_key", "1").assert_failure()?;
    assert!(unknown.contains_stderr("Unknown config key"));

    let listed = tt!(dir.path(), "config").assert_success()?;
    assert!(listed.contains_stdout("scan_delay_ms"));
    Ok(())
}

#[test]
fn test_missing_documents_file_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let result = tt!(dir.path(), "tree", "--documents", "absent.json").assert_failure()?;
    assert!(result.contains_stderr("Failed to read documents"));
    Ok(())
}
