//! Settings command
//!
//! Lists, reads and writes `tagtree.toml`. Keys are the TOML field names.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tagtree_core::TreeSettings;

/// List every setting
pub fn run_list(path: &Path) -> Result<()> {
    let settings = TreeSettings::load_or_default(path)?;
    let table = to_table(&settings)?;

    println!("{}", "Tree Settings".bold());
    let location = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, showing defaults)", path.display())
    };
    println!("{}: {}\n", "Location".dimmed(), location.dimmed());

    for (key, value) in &table {
        println!("  {} = {}", key.cyan(), value);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  scan_delay_ms: 0-60000");
    println!("  expand_depth: 0-16");
    Ok(())
}

/// Print one setting
pub fn run_get(path: &Path, key: &str) -> Result<()> {
    let settings = TreeSettings::load_or_default(path)?;
    let table = to_table(&settings)?;
    match table.get(key) {
        Some(toml::Value::String(s)) => println!("{}", s),
        Some(value) => println!("{}", value),
        None => anyhow::bail!("Unknown config key: {}. Use 'tt config' to see available keys.", key),
    }
    Ok(())
}

/// Change one setting and save
pub fn run_set(path: &Path, key: &str, value: &str) -> Result<()> {
    let settings = TreeSettings::load_or_default(path)?;
    let mut table = to_table(&settings)?;
    if !table.contains_key(key) {
        anyhow::bail!("Unknown config key: {}. Use 'tt config' to see available keys.", key);
    }
    table.insert(key.to_string(), parse_value(value));

    let updated: TreeSettings = toml::Value::Table(table)
        .try_into()
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    updated.save(path)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

fn to_table(settings: &TreeSettings) -> Result<toml::Table> {
    match toml::Value::try_from(settings).context("Failed to render settings")? {
        toml::Value::Table(table) => Ok(table),
        other => anyhow::bail!("Settings rendered as {}, expected a table", other.type_str()),
    }
}

/// Interpret a command-line value as TOML, falling back to a bare string
fn parse_value(raw: &str) -> toml::Value {
    match toml::from_str::<toml::Table>(&format!("v = {raw}")) {
        Ok(mut doc) => doc.remove("v").unwrap_or_else(|| toml::Value::String(raw.to_string())),
        Err(_) => toml::Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("500"), toml::Value::Integer(500));
        assert_eq!(parse_value("NAME_DESC"), toml::Value::String("NAME_DESC".into()));
        assert!(matches!(parse_value(r#"["a", "b"]"#), toml::Value::Array(_)));
    }
}
