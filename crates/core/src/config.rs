//! Tree settings (`tagtree.toml`)
//!
//! Settings are plain data threaded into the build and sort functions.
//! Missing keys take their defaults, so an empty file is a valid config.

use crate::builder::BuildOptions;
use crate::descendants::HidePolicy;
use crate::error::TreeError;
use crate::fingerprint::{fingerprint_json, Fingerprint};
use crate::sort::{ItemSort, SortSettings, TagSort};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default file name looked up next to the documents
pub const CONFIG_FILE_NAME: &str = "tagtree.toml";

/// How a document's label is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMethod {
    /// Title or file name
    #[default]
    #[serde(rename = "NAME")]
    Name,
    /// Directory, a slash, then the name
    #[serde(rename = "PATH/NAME")]
    PathName,
    /// Name, then the directory after a colon
    #[serde(rename = "NAME : PATH")]
    NamePath,
}

impl DisplayMethod {
    /// Compose a label from a name and the directory holding the document
    pub fn label(self, name: &str, dir: &str) -> String {
        match self {
            DisplayMethod::Name => name.to_string(),
            DisplayMethod::PathName => format!("{dir}/{name}"),
            DisplayMethod::NamePath => format!("{name} : {dir}"),
        }
    }
}

/// Everything that shapes a tree build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    pub sort_type: ItemSort,
    pub sort_type_tag: TagSort,
    pub hide_items: HidePolicy,
    pub reduce_nested_parent: bool,
    pub merge_redundant_combination: bool,
    pub archive_tags: Vec<String>,
    /// Documents carrying any of these are dropped
    pub ignore_doc_tags: Vec<String>,
    /// Tags removed from every document
    pub ignore_tags: Vec<String>,
    pub ignore_folders: Vec<String>,
    /// When non-empty, only documents under these folders are used
    pub target_folders: Vec<String>,
    pub disable_nested_tags: bool,
    pub disable_narrowing_down: bool,
    pub expand_untagged_to_root: bool,
    pub use_tag_info: bool,
    /// Tag documents with their freshness bucket
    pub use_virtual_tag: bool,
    /// Prefer a document's title over its file name
    pub use_title: bool,
    pub display_method: DisplayMethod,
    pub expand_depth: usize,
    pub scan_delay_ms: u64,
    pub link_mode: bool,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            sort_type: ItemSort::default(),
            sort_type_tag: TagSort::default(),
            hide_items: HidePolicy::None,
            reduce_nested_parent: true,
            merge_redundant_combination: false,
            archive_tags: Vec::new(),
            ignore_doc_tags: Vec::new(),
            ignore_tags: Vec::new(),
            ignore_folders: Vec::new(),
            target_folders: Vec::new(),
            disable_nested_tags: false,
            disable_narrowing_down: false,
            expand_untagged_to_root: false,
            use_tag_info: false,
            use_virtual_tag: false,
            use_title: true,
            display_method: DisplayMethod::Name,
            expand_depth: 1,
            scan_delay_ms: 250,
            link_mode: false,
        }
    }
}

impl TreeSettings {
    /// Validate ranges
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.scan_delay_ms > 60_000 {
            return Err(TreeError::InvalidSettings(format!(
                "scan_delay_ms must be 0-60000, got {}",
                self.scan_delay_ms
            )));
        }
        if self.expand_depth > 16 {
            return Err(TreeError::InvalidSettings(format!(
                "expand_depth must be 0-16, got {}",
                self.expand_depth
            )));
        }
        Ok(())
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).context("Failed to parse tree settings")?;
        settings.validate().context("Invalid tree settings")?;
        Ok(settings)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Load from a file if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().context("Refusing to save invalid settings")?;
        let text = toml::to_string_pretty(self).context("Failed to render settings")?;
        fs::write(path, text).with_context(|| format!("Failed to write settings: {}", path.display()))
    }

    /// Fingerprint used to decide whether a settings change needs a rebuild
    pub fn fingerprint(&self) -> Fingerprint {
        // Serializing plain data to JSON cannot fail; fall back to a fixed
        // digest rather than panicking.
        fingerprint_json(self).unwrap_or_else(|_| Fingerprint::from_bytes([0; 32]))
    }

    pub fn sort_settings(&self) -> SortSettings {
        SortSettings {
            items: self.sort_type,
            tags: self.sort_type_tag,
        }
    }

    /// Options for the tree builder
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            reduce_nested_parent: self.reduce_nested_parent,
            split_nested: !self.link_mode,
            archive_tags: self.archive_tags.clone(),
            expand_depth: self.expand_depth,
        }
    }
}
