//! Build and print a tree from a document dump

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagtree_core::tagpath::ROOT_TAG;
use tagtree_core::{outline, render_tree, RenderOptions, TagInfoDict, TreeSettings, CONFIG_FILE_NAME};
use tagtree_session::{ControllerOptions, InMemoryStore, TreeController};
use tracing::debug;

pub struct TreeArgs {
    pub documents: PathBuf,
    pub config: Option<PathBuf>,
    pub tag_info: Option<PathBuf>,
    pub search: Option<String>,
    pub expand: Vec<String>,
    pub counts: bool,
    pub outline: bool,
}

pub async fn run(args: TreeArgs) -> Result<()> {
    let store = Arc::new(InMemoryStore::load_json(&args.documents)?);
    debug!("Loaded {} documents from {}", store.len(), args.documents.display());
    let settings = match &args.config {
        Some(path) => TreeSettings::load(path)?,
        None => {
            let dir = args.documents.parent().unwrap_or_else(|| Path::new("."));
            TreeSettings::load_or_default(&dir.join(CONFIG_FILE_NAME))?
        }
    };
    let tag_info = match &args.tag_info {
        Some(path) => load_tag_info(path)?,
        None => TagInfoDict::new(),
    };

    let handle = TreeController::spawn(store, settings.clone(), tag_info.clone(), ControllerOptions::default());
    if let Some(search) = &args.search {
        handle.set_search_string(search.clone()).await?;
    }
    if !args.expand.is_empty() {
        let keys = args.expand.iter().map(|path| node_key(path)).collect();
        handle.restore_expanded_folders(keys).await?;
    }
    handle.flush().await.context("Failed to build tree")?;
    let tree = handle.current_tree();
    handle.shutdown().await?;

    if args.outline {
        for line in outline(&tree) {
            println!("{}", line);
        }
    } else {
        let opts = RenderOptions {
            counts: args.counts,
            tag_info: settings.use_tag_info.then_some(&tag_info),
        };
        print!("{}", render_tree(&tree, &opts));
    }

    let root = tree.node(tree.root());
    println!(
        "\n{}",
        format!("{} items in {} top-level folders", root.items_count, root.folders().count()).dimmed()
    );
    Ok(())
}

pub fn load_tag_info(path: &Path) -> Result<TagInfoDict> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read tag info: {}", path.display()))?;
    Ok(TagInfoDict::parse_lenient(&text))
}

/// `a/b` → `root/a/b`
fn node_key(path: &str) -> String {
    let path = path.trim_matches('/');
    let has_root = path
        .split('/')
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(ROOT_TAG));
    if has_root {
        path.to_string()
    } else {
        format!("{ROOT_TAG}/{path}")
    }
}
