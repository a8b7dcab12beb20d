//! Pinned tags in a tag-info file

use super::tree::load_tag_info;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tagtree_core::TagInfoDict;

pub fn run_list(path: &Path) -> Result<()> {
    let info = load_tag_info(path)?;
    let pins = info.pins();
    if pins.is_empty() {
        println!("{}", "No pinned tags".dimmed());
        return Ok(());
    }
    println!("{}", "Pinned tags".bold());
    for (tag, key) in pins {
        println!("  {} {}", key.dimmed(), tag.yellow());
    }
    Ok(())
}

pub fn run_pin(path: &Path, tag: &str, key: &str) -> Result<()> {
    let mut info = load_or_empty(path)?;
    info.pin(tag, key);
    save(path, &info)?;
    println!("{} Pinned '{}' (key {})", "✓".green(), tag.yellow(), key.cyan());
    Ok(())
}

pub fn run_unpin(path: &Path, tag: &str) -> Result<()> {
    let mut info = load_tag_info(path)?;
    if !info.is_pinned(tag) {
        anyhow::bail!("Tag '{}' is not pinned", tag);
    }
    info.unpin(tag);
    save(path, &info)?;
    println!("{} Unpinned '{}'", "✓".green(), tag.yellow());
    Ok(())
}

fn load_or_empty(path: &Path) -> Result<TagInfoDict> {
    if path.exists() {
        load_tag_info(path)
    } else {
        Ok(TagInfoDict::new())
    }
}

fn save(path: &Path, info: &TagInfoDict) -> Result<()> {
    std::fs::write(path, info.to_json()).with_context(|| format!("Failed to write tag info: {}", path.display()))
}
