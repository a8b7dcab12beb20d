//! The rebuild worker and its handle
//!
//! One task owns the document cache and every tree mutation. Commands reach
//! it over a bounded channel; document events are coalesced and debounced
//! before a cycle runs. A cycle diffs the batch, then either skips (inputs
//! unchanged), patches metadata in place, or rebuilds from scratch on a
//! blocking thread. Readers only ever see a complete tree: the published
//! `Arc<TagTree>` is swapped after the new one is finished.

use crate::doc_cache::DocCache;
use crate::expanded::ExpandedSet;
use crate::incremental::apply_events;
use crate::source::DocumentStore;
use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tagtree_core::{
    finish, now_millis, refresh_item, reveal, run_pipeline, sort_tree, Fingerprint, Fingerprinter, IngestContext,
    ResolvedLinks, SearchFilter, SortSettings, TagInfoDict, TagTree, TreeSettings,
};
use tagtree_watcher::{DebouncedQueue, DocumentEvent};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Channel sizes
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Commands buffered before senders wait
    pub command_capacity: usize,
    /// Updates a slow subscriber may fall behind by
    pub update_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            command_capacity: 256,
            update_capacity: 16,
        }
    }
}

/// How a published tree was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Full pipeline over every document
    Rebuilt,
    /// Titles or timestamps replaced in place
    Patched,
    /// Folders opened on the existing tree
    Revealed,
    /// Same tree, new order
    Resorted,
}

/// Sent to subscribers once per published tree
#[derive(Debug, Clone)]
pub struct TreeUpdate {
    pub version: u64,
    pub kind: UpdateKind,
    /// Distinct items reachable from the root
    pub items: usize,
    /// Arena size
    pub nodes: usize,
    pub elapsed: Duration,
}

enum Command {
    Event(DocumentEvent),
    Reveal(Vec<String>),
    SetSearch(String),
    SetSettings(Box<TreeSettings>),
    SetSort(SortSettings),
    ReloadTagInfo,
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

struct Shared {
    tree: RwLock<Arc<TagTree>>,
    expanded: RwLock<ExpandedSet>,
    tag_info: RwLock<TagInfoDict>,
    rebuilding: AtomicBool,
    version: AtomicU64,
    updates: broadcast::Sender<TreeUpdate>,
}

/// Entry point for starting a controller
pub struct TreeController;

impl TreeController {
    /// Start the worker on the current tokio runtime
    ///
    /// The initial document listing and build run on the worker; call
    /// [`TreeHandle::flush`] to wait for them.
    pub fn spawn<S>(store: Arc<S>, settings: TreeSettings, tag_info: TagInfoDict, options: ControllerOptions) -> TreeHandle
    where
        S: DocumentStore + ?Sized,
    {
        let (commands, receiver) = mpsc::channel(options.command_capacity.max(1));
        let (updates, _) = broadcast::channel(options.update_capacity.max(1));
        let shared = Arc::new(Shared {
            tree: RwLock::new(Arc::new(TagTree::new())),
            expanded: RwLock::new(ExpandedSet::new()),
            tag_info: RwLock::new(tag_info),
            rebuilding: AtomicBool::new(false),
            version: AtomicU64::new(0),
            updates,
        });
        let worker = Worker {
            store,
            shared: shared.clone(),
            queue: DebouncedQueue::new(Duration::from_millis(settings.scan_delay_ms)),
            settings,
            search: SearchFilter::default(),
            cache: DocCache::new(),
            built: None,
            waiters: Vec::new(),
        };
        tokio::spawn(worker.run(receiver));
        TreeHandle { commands, shared }
    }
}

/// Cloneable handle to a running controller
#[derive(Clone)]
pub struct TreeHandle {
    commands: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

impl TreeHandle {
    /// The last complete tree
    pub fn current_tree(&self) -> Arc<TagTree> {
        self.shared.tree.read().clone()
    }

    /// Version of [`TreeHandle::current_tree`]; 0 before the first build
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::SeqCst)
    }

    pub fn is_rebuilding(&self) -> bool {
        self.shared.rebuilding.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeUpdate> {
        self.shared.updates.subscribe()
    }

    pub async fn notify_changed(&self, path: impl Into<String>) -> Result<()> {
        self.send(Command::Event(DocumentEvent::changed(path))).await
    }

    pub async fn notify_renamed(&self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        self.send(Command::Event(DocumentEvent::renamed(from, to))).await
    }

    pub async fn notify_deleted(&self, path: impl Into<String>) -> Result<()> {
        self.send(Command::Event(DocumentEvent::deleted(path))).await
    }

    /// Open or close a folder by node key (`root/a/b`)
    ///
    /// Opening materializes the folder on the current tree right away;
    /// either way the key is remembered for later rebuilds.
    pub async fn set_expanded(&self, key: &str, expanded: bool) -> Result<()> {
        let changed = self.shared.expanded.write().set(key, expanded);
        if changed && expanded {
            self.send(Command::Reveal(vec![key.to_string()])).await?;
        }
        Ok(())
    }

    pub fn serialized_expanded_folders(&self) -> Vec<String> {
        self.shared.expanded.read().serialize()
    }

    pub async fn restore_expanded_folders(&self, keys: Vec<String>) -> Result<()> {
        self.shared.expanded.write().restore(keys.iter().cloned());
        self.send(Command::Reveal(keys)).await
    }

    pub async fn set_search_string(&self, search: impl Into<String>) -> Result<()> {
        self.send(Command::SetSearch(search.into())).await
    }

    /// Replace the settings; invalid settings are rejected here
    pub async fn set_settings(&self, settings: TreeSettings) -> Result<()> {
        settings.validate().context("Invalid tree settings")?;
        self.send(Command::SetSettings(Box::new(settings))).await
    }

    pub async fn set_sort_settings(&self, sort: SortSettings) -> Result<()> {
        self.send(Command::SetSort(sort)).await
    }

    /// Re-read the tag-info table from the store
    pub async fn reload_tag_info(&self) -> Result<()> {
        self.send(Command::ReloadTagInfo).await
    }

    pub fn serialized_tag_info(&self) -> TagInfoDict {
        self.shared.tag_info.read().clone()
    }

    /// Run pending work now and wait for the cycle to finish
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx)).await?;
        rx.await.map_err(|_| anyhow!("Tree controller stopped before flushing"))
    }

    /// Stop the worker and wait for it to exit
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| anyhow!("Tree controller exited without confirming shutdown"))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Tree controller has stopped"))
    }
}

struct Worker<S: ?Sized> {
    store: Arc<S>,
    shared: Arc<Shared>,
    settings: TreeSettings,
    search: SearchFilter,
    cache: DocCache,
    queue: DebouncedQueue,
    /// Inputs of the published tree; `None` until a build succeeds
    built: Option<Fingerprint>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<S> Worker<S>
where
    S: DocumentStore + ?Sized,
{
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.load().await;
        let mut stopped = None;
        loop {
            let due = self.queue.ready();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(done)) => {
                        stopped = Some(done);
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = due, if self.queue.is_armed() => self.cycle().await,
            }
        }
        if !self.queue.is_empty() {
            warn!("Tree controller stopping with {} pending events", self.queue.len());
        }
        self.release_waiters();
        debug!("Tree controller stopped");
        if let Some(done) = stopped {
            let _ = done.send(());
        }
    }

    async fn load(&mut self) {
        match self.store.list_documents().await {
            Ok(records) => {
                info!("Loaded {} documents", records.len());
                self.cache.replace_all(records);
            }
            Err(e) => error!("Failed to list documents: {:#}", e),
        }
        self.rebuild().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Event(event) => self.queue.push(event),
            Command::Reveal(keys) => self.reveal(&keys),
            Command::SetSearch(search) => {
                self.search = SearchFilter::parse(&search);
                self.queue.poke();
            }
            Command::SetSettings(settings) => {
                self.queue.set_delay(Duration::from_millis(settings.scan_delay_ms));
                self.settings = *settings;
                self.queue.poke();
            }
            Command::SetSort(sort) => self.resort(sort),
            Command::ReloadTagInfo => match self.store.load_tag_info().await {
                Ok(text) => {
                    *self.shared.tag_info.write() = TagInfoDict::parse_lenient(&text);
                    self.queue.poke();
                }
                Err(e) => warn!("Failed to load tag info, keeping current table: {:#}", e),
            },
            Command::Flush(done) => {
                self.waiters.push(done);
                self.queue.fire_now();
            }
            // Intercepted by the run loop
            Command::Shutdown(_) => {}
        }
    }

    async fn cycle(&mut self) {
        let events = self.queue.take();
        let outcome = apply_events(&mut self.cache, self.store.as_ref(), &events, self.settings.link_mode).await;
        // Freshness tags move with the clock and with every mtime
        let reusable = !self.settings.use_virtual_tag && self.built == Some(self.inputs());
        if reusable {
            if outcome.metadata_only.is_empty() {
                debug!("Inputs unchanged after {} events, skipping rebuild", events.len());
            } else {
                self.patch(&outcome.metadata_only);
            }
        } else {
            self.rebuild().await;
        }
        self.release_waiters();
    }

    /// Everything a build depends on besides the expanded set
    fn inputs(&self) -> Fingerprint {
        let tag_info = self.shared.tag_info.read().to_json();
        let mut fp = Fingerprinter::new();
        fp.field(&self.cache.fingerprint().to_hex())
            .field(&self.settings.fingerprint().to_hex())
            .field(self.search.as_str())
            .field(&tag_info);
        fp.finalize()
    }

    async fn rebuild(&mut self) {
        let inputs = self.inputs();
        let started = Instant::now();
        self.shared.rebuilding.store(true, Ordering::SeqCst);

        let links = if self.settings.link_mode {
            match self.store.resolved_links().await {
                Ok(links) => links,
                Err(e) => {
                    warn!("Failed to load resolved links, using per-document links: {:#}", e);
                    ResolvedLinks::new()
                }
            }
        } else {
            ResolvedLinks::new()
        };
        let records = self.cache.records();
        let settings = self.settings.clone();
        let tag_info = self.shared.tag_info.read().clone();
        let search = self.search.clone();
        let expanded = self.shared.expanded.read().serialize();
        debug!("Rebuilding from {} documents ({} expanded folders)", records.len(), expanded.len());

        let result = tokio::task::spawn_blocking(move || {
            let ctx = IngestContext {
                settings: &settings,
                tag_info: &tag_info,
                search: &search,
                links: &links,
                now: now_millis(),
            };
            run_pipeline(&records, &ctx, &expanded)
        })
        .await;

        match result {
            Ok(Ok(tree)) => {
                self.built = Some(inputs);
                self.publish(tree, UpdateKind::Rebuilt, started);
            }
            Ok(Err(e)) => error!("Rebuild failed, keeping previous tree: {}", e),
            Err(e) => error!("Rebuild task failed, keeping previous tree: {}", e),
        }
        self.shared.rebuilding.store(false, Ordering::SeqCst);
    }

    /// Swap titles and timestamps into the published tree
    fn patch(&mut self, paths: &[String]) {
        let started = Instant::now();
        let mut tree = TagTree::clone(&self.shared.tree.read());
        let mut touched = 0;
        for path in paths {
            let Some(record) = self.cache.get(path) else {
                continue;
            };
            touched += tree.update_items(path, |old| Arc::new(refresh_item(old, record, &self.settings)));
        }
        if touched == 0 {
            debug!("Metadata change touched no visible items");
            return;
        }
        let tag_info = self.shared.tag_info.read().clone();
        finish(&mut tree, &self.settings, &tag_info);
        self.publish(tree, UpdateKind::Patched, started);
    }

    fn reveal(&mut self, keys: &[String]) {
        let started = Instant::now();
        let mut tree = TagTree::clone(&self.shared.tree.read());
        let tag_info = self.shared.tag_info.read().clone();
        match reveal(&mut tree, keys, &self.settings, &tag_info) {
            Ok(0) => debug!("Nothing new to reveal for {:?}", keys),
            Ok(opened) => {
                debug!("Revealed {} folders", opened);
                self.publish(tree, UpdateKind::Revealed, started);
            }
            Err(e) => error!("Failed to reveal {:?}, keeping previous tree: {}", keys, e),
        }
    }

    fn resort(&mut self, sort: SortSettings) {
        let current = self.built == Some(self.inputs());
        self.settings.sort_type = sort.items;
        self.settings.sort_type_tag = sort.tags;
        if !current {
            // A rebuild is due anyway and will pick up the new order
            self.queue.poke();
            return;
        }
        let started = Instant::now();
        let mut tree = TagTree::clone(&self.shared.tree.read());
        {
            let tag_info = self.shared.tag_info.read();
            let pins = self.settings.use_tag_info.then_some(&*tag_info);
            let root = tree.root();
            sort_tree(&mut tree, root, &sort, pins);
        }
        self.built = Some(self.inputs());
        self.publish(tree, UpdateKind::Resorted, started);
    }

    fn publish(&self, tree: TagTree, kind: UpdateKind, started: Instant) {
        let items = tree.node(tree.root()).items_count;
        let nodes = tree.arena_len();
        let version = self.shared.version.fetch_add(1, Ordering::SeqCst) + 1;
        *self.shared.tree.write() = Arc::new(tree);
        let elapsed = started.elapsed();
        info!("Tree {:?} in {:?} (version {}, {} items)", kind, elapsed, version, items);
        // No subscribers is fine
        let _ = self.shared.updates.send(TreeUpdate {
            version,
            kind,
            items,
            nodes,
            elapsed,
        });
    }

    fn release_waiters(&mut self) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryStore;
    use tagtree_core::{DocumentRecord, TagSort};
    use tokio::sync::broadcast::error::TryRecvError;

    fn start(records: Vec<DocumentRecord>, settings: TreeSettings) -> (Arc<InMemoryStore>, TreeHandle) {
        let store = Arc::new(InMemoryStore::from_records(records));
        let handle = TreeController::spawn(store.clone(), settings, TagInfoDict::new(), ControllerOptions::default());
        (store, handle)
    }

    fn top_level(tree: &TagTree) -> Vec<String> {
        tree.node(tree.root()).folders().map(|id| tree.node(id).tag.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_build_is_published() {
        let (_store, handle) = start(
            vec![DocumentRecord::new("a.md", ["x"]), DocumentRecord::new("b.md", ["y"])],
            TreeSettings::default(),
        );
        let mut updates = handle.subscribe();
        handle.flush().await.unwrap();
        let update = updates.try_recv().unwrap();
        assert_eq!(update.kind, UpdateKind::Rebuilt);
        assert_eq!(update.version, 1);
        assert_eq!(update.items, 2);
        assert_eq!(top_level(&handle.current_tree()), vec!["x", "y"]);
        assert!(!handle.is_rebuilding());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_resave_skips_rebuild() {
        let (store, handle) = start(vec![DocumentRecord::new("a.md", ["x"])], TreeSettings::default());
        handle.flush().await.unwrap();
        let mut updates = handle.subscribe();
        let before = handle.current_tree();

        store.upsert(DocumentRecord::new("a.md", ["x"]));
        handle.notify_changed("a.md").await.unwrap();
        handle.flush().await.unwrap();

        assert!(matches!(updates.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(handle.version(), 1);
        assert!(Arc::ptr_eq(&before, &handle.current_tree()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_rebuilds_once() {
        let (store, handle) = start(vec![DocumentRecord::new("a.md", ["x"])], TreeSettings::default());
        handle.flush().await.unwrap();
        let mut updates = handle.subscribe();

        for tag in ["y", "z", "w"] {
            store.upsert(DocumentRecord::new("a.md", [tag]));
            handle.notify_changed("a.md").await.unwrap();
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        // Still inside the debounce window of the last change
        assert_eq!(handle.version(), 1);
        tokio::time::sleep(Duration::from_millis(300)).await;

        let update = updates.recv().await.unwrap();
        assert_eq!(update.kind, UpdateKind::Rebuilt);
        assert!(matches!(updates.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(top_level(&handle.current_tree()), vec!["w"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_change_patches_in_place() {
        let (store, handle) = start(
            vec![DocumentRecord::new("a.md", ["x"]), DocumentRecord::new("b.md", ["y"])],
            TreeSettings::default(),
        );
        handle.flush().await.unwrap();
        let before = handle.current_tree();
        let mut updates = handle.subscribe();

        store.upsert(DocumentRecord::new("a.md", ["x"]).with_title("Alpha"));
        handle.notify_changed("a.md").await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(updates.try_recv().unwrap().kind, UpdateKind::Patched);
        let tree = handle.current_tree();
        let x = tree.find_by_tag_path("x").unwrap();
        assert_eq!(tree.node(x).leaves().next().unwrap().display_name, "Alpha");
        // The untouched branch keeps its cache
        let y_before = before.find_by_tag_path("y").unwrap();
        let y_after = tree.find_by_tag_path("y").unwrap();
        assert!(Arc::ptr_eq(
            before.node(y_before).all_descendants.as_ref().unwrap(),
            tree.node(y_after).all_descendants.as_ref().unwrap()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_tags_follow_mtime() {
        let settings = TreeSettings {
            use_virtual_tag: true,
            ..Default::default()
        };
        let (store, handle) = start(vec![DocumentRecord::new("a.md", ["x"]).with_times(0, 0)], settings);
        handle.flush().await.unwrap();
        let tree = handle.current_tree();
        assert!(tree.find_by_tag_path("_VIRTUAL_TAG_FRESHNESS/FRESHNESS_05").is_some());
        let mut updates = handle.subscribe();

        // Only the mtime changes, which would otherwise be patched in place
        store.upsert(DocumentRecord::new("a.md", ["x"]).with_times(now_millis(), 0));
        handle.notify_changed("a.md").await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(updates.try_recv().unwrap().kind, UpdateKind::Rebuilt);
        let tree = handle.current_tree();
        assert!(tree.find_by_tag_path("_VIRTUAL_TAG_FRESHNESS/FRESHNESS_01").is_some());
        assert!(tree.find_by_tag_path("_VIRTUAL_TAG_FRESHNESS/FRESHNESS_05").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_rebuild_is_not_lost() {
        let (store, handle) = start(
            vec![DocumentRecord::new("a.md", ["x"]), DocumentRecord::new("b.md", ["x"])],
            TreeSettings::default(),
        );
        handle.flush().await.unwrap();

        store.upsert(DocumentRecord::new("a.md", ["y"]));
        handle.notify_changed("a.md").await.unwrap();
        let late = async {
            tokio::task::yield_now().await;
            store.upsert(DocumentRecord::new("b.md", ["z"]));
            handle.notify_changed("b.md").await
        };
        let (flushed, sent) = tokio::join!(handle.flush(), late);
        flushed.unwrap();
        sent.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(top_level(&handle.current_tree()), vec!["y", "z"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_string_triggers_rebuild() {
        let (_store, handle) = start(
            vec![DocumentRecord::new("a.md", ["web/css"]), DocumentRecord::new("b.md", ["rust"])],
            TreeSettings::default(),
        );
        handle.flush().await.unwrap();

        handle.set_search_string("css").await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(top_level(&handle.current_tree()), vec!["web"]);

        handle.set_search_string("").await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(top_level(&handle.current_tree()), vec!["rust", "web"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expanded_folders_survive_rebuild() {
        let (store, handle) = start(vec![DocumentRecord::new("n1", ["x", "y", "z"])], TreeSettings::default());
        handle.flush().await.unwrap();
        assert!(handle.current_tree().find_by_tag_path("x/y/z").is_none());

        handle.set_expanded("root/x/y", true).await.unwrap();
        handle.flush().await.unwrap();
        assert!(handle.current_tree().find_by_tag_path("x/y/z").is_some());
        assert_eq!(handle.serialized_expanded_folders(), vec!["root/x/y"]);

        // A structural change rebuilds from scratch; the folder stays open
        store.upsert(DocumentRecord::new("n2", ["x", "y", "z"]));
        handle.notify_changed("n2").await.unwrap();
        handle.flush().await.unwrap();
        let tree = handle.current_tree();
        let z = tree.find_by_tag_path("x/y/z").unwrap();
        assert_eq!(tree.node(z).items_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sort_change_resorts_without_rebuild() {
        let (_store, handle) = start(
            vec![DocumentRecord::new("a.md", ["alpha"]), DocumentRecord::new("b.md", ["beta"])],
            TreeSettings::default(),
        );
        handle.flush().await.unwrap();
        let mut updates = handle.subscribe();

        let sort = SortSettings {
            tags: "NAME_DESC".parse::<TagSort>().unwrap(),
            ..Default::default()
        };
        handle.set_sort_settings(sort).await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(updates.try_recv().unwrap().kind, UpdateKind::Resorted);
        assert!(matches!(updates.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(top_level(&handle.current_tree()), vec!["beta", "alpha"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_tag_info_applies_pins() {
        let (store, handle) = start(
            vec![DocumentRecord::new("a.md", ["alpha"]), DocumentRecord::new("b.md", ["zeta"])],
            TreeSettings {
                use_tag_info: true,
                ..Default::default()
            },
        );
        handle.flush().await.unwrap();
        assert_eq!(top_level(&handle.current_tree()), vec!["alpha", "zeta"]);

        store.set_tag_info(r#"{"zeta": {"key": "0"}}"#);
        handle.reload_tag_info().await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(top_level(&handle.current_tree()), vec!["zeta", "alpha"]);
        assert!(handle.serialized_tag_info().is_pinned("zeta"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_document_leaves_tree() {
        let (store, handle) = start(
            vec![DocumentRecord::new("a.md", ["x"]), DocumentRecord::new("b.md", ["y"])],
            TreeSettings::default(),
        );
        handle.flush().await.unwrap();
        store.remove("b.md");
        handle.notify_deleted("b.md").await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(top_level(&handle.current_tree()), vec!["x"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_settings_rejected() {
        let (_store, handle) = start(Vec::new(), TreeSettings::default());
        let bad = TreeSettings {
            scan_delay_ms: 120_000,
            ..Default::default()
        };
        assert!(handle.set_settings(bad).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_worker() {
        let (_store, handle) = start(Vec::new(), TreeSettings::default());
        handle.flush().await.unwrap();
        handle.shutdown().await.unwrap();
        assert!(handle.notify_changed("a.md").await.is_err());
    }
}
