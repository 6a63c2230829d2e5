//! # Module Loader
//!
//! Mounts one page module at a time into the document container.
//!
//! ## Load Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load_module(name, payload)            seq = ++latest                   │
//! │                                                                         │
//! │  1. registry.describe(name) ───────────── miss ──► Error panel, stop    │
//! │  2. unmount previous instance, container = loading placeholder          │
//! │  3. fetch markup ─────────── (await) ──── fail ──► Error panel, stop    │
//! │        └─ newer load started? ──► Superseded, stop                      │
//! │  4. stylesheet tagged for name attached?  no ──► attach (once, ever)    │
//! │  5. container = markup                                                  │
//! │  6. remove every script element, insert a fresh one tagged for name     │
//! │  7. fetch script ─────────── (await) ──── fail ──► Error panel, stop    │
//! │        └─ newer load started? ──► Superseded, stop                      │
//! │     factory() ──► init(ctx, payload)  (error / panic: logged, go on)    │
//! │  8. current = name, title = descriptor.title                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machine
//! ```text
//!  Idle ──► Loading ──► Mounted ──► Unmounting ──► Loading ──► ...
//!              │                                      │
//!              └──────────────► Error ◄───────────────┘
//!                                 │
//!                                 └──► Loading (next load_module)
//! ```
//!
//! Nothing is cached between loads: markup and script are fetched every time
//! and every load gets a fresh module instance.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use showroom_core::events::describe_panic;
use showroom_core::{ModuleDescriptor, ModuleRegistry};
use showroom_store::StateStore;

use crate::document::{DocumentHandle, LOADING_PLACEHOLDER};
use crate::error::{ErrorDisplay, ShellError};
use crate::fetch::ResourceFetcher;
use crate::module::{BundleRegistry, ModuleContext, PageModule};

/// Loader state, as observed between suspension points.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderState {
    /// Nothing loaded yet.
    Idle,
    /// Load `seq` of `module` is fetching resources.
    Loading { module: String, seq: u64 },
    /// `module` is current.
    Mounted { module: String },
    /// `module` is being torn down.
    Unmounting { module: String },
    /// The error panel is shown. Terminal until the next load.
    Error(ErrorDisplay),
}

/// How a single `load_module` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The module is current.
    Mounted { module: String },
    /// A newer load started before this one finished; its results were
    /// discarded.
    Superseded,
    /// The error panel is shown.
    Failed(ErrorDisplay),
}

struct MountedModule {
    name: String,
    instance: Option<Box<dyn PageModule>>,
    ctx: ModuleContext,
}

/// The single module loader.
pub struct ModuleLoader {
    registry: Arc<ModuleRegistry>,
    bundles: Arc<BundleRegistry>,
    fetcher: Arc<dyn ResourceFetcher>,
    store: Arc<StateStore>,
    document: DocumentHandle,
    latest: AtomicU64,
    state: Mutex<LoaderState>,
    current: Mutex<Option<MountedModule>>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("state", &self.state())
            .field("latest", &self.latest.load(Ordering::Acquire))
            .finish()
    }
}

impl ModuleLoader {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        bundles: Arc<BundleRegistry>,
        fetcher: Arc<dyn ResourceFetcher>,
        store: Arc<StateStore>,
        document: DocumentHandle,
    ) -> Self {
        ModuleLoader {
            registry,
            bundles,
            fetcher,
            store,
            document,
            latest: AtomicU64::new(0),
            state: Mutex::new(LoaderState::Idle),
            current: Mutex::new(None),
        }
    }

    /// Name of the current module, if any.
    pub fn current_module(&self) -> Option<String> {
        self.lock_current().as_ref().map(|mounted| mounted.name.clone())
    }

    pub fn state(&self) -> LoaderState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Loads `name` and hands `payload` to its entry point.
    pub async fn load_module(&self, name: &str, payload: Option<Value>) -> LoadOutcome {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        info!(module = name, seq, "Loading module");

        // 1. Descriptor
        let descriptor: ModuleDescriptor = match self.registry.describe(name) {
            Ok(descriptor) => descriptor.clone(),
            Err(e) => {
                error!(module = name, "Navigation to unknown module");
                return self.fail(seq, ShellError::from(e));
            }
        };

        // 2. Previous instance goes, placeholder comes
        self.unmount_current();
        self.set_state(LoaderState::Loading {
            module: name.to_string(),
            seq,
        });
        self.document.lock().replace_container(LOADING_PLACEHOLDER);

        // 3. Markup
        let markup = match self.fetcher.fetch_text(&descriptor.markup_path).await {
            Ok(markup) => markup,
            Err(e) => return self.fail(seq, e),
        };
        if !self.is_latest(seq) {
            debug!(module = name, seq, "Load superseded after markup fetch");
            return LoadOutcome::Superseded;
        }

        // 4–6. Style, markup, script element
        {
            let mut document = self.document.lock();
            if !document.has_stylesheet_for(name) {
                document.attach_stylesheet(name, &descriptor.style_path);
                debug!(module = name, href = %descriptor.style_path, "Stylesheet attached");
            }
            document.replace_container(markup);
            let removed = document.clear_scripts();
            document.insert_script(name, &descriptor.script_path);
            debug!(module = name, removed, "Script element replaced");
        }

        // 7. Behavior bundle
        if let Err(e) = self.fetcher.fetch_text(&descriptor.script_path).await {
            return self.fail(seq, e);
        }
        if !self.is_latest(seq) {
            debug!(module = name, seq, "Load superseded after script fetch");
            return LoadOutcome::Superseded;
        }

        let ctx = ModuleContext::new(name, seq, self.store.clone(), self.document.clone());
        self.document.lock().claim_container(seq);

        let instance = self.bundles.instantiate(name);
        match &instance {
            Some(module) => run_init(name, &**module, &ctx, payload),
            None => warn!(module = name, "No behavior bundle registered, markup mounted without behavior"),
        }

        // 8. Record as current
        let mut current = self.lock_current();
        if !self.is_latest(seq) {
            drop(current);
            debug!(module = name, seq, "Load superseded during init");
            teardown(MountedModule {
                name: name.to_string(),
                instance,
                ctx,
            });
            return LoadOutcome::Superseded;
        }

        *current = Some(MountedModule {
            name: name.to_string(),
            instance,
            ctx,
        });
        self.document.lock().set_title(descriptor.title.as_str());
        self.set_state(LoaderState::Mounted {
            module: name.to_string(),
        });
        drop(current);

        info!(module = name, seq, title = %descriptor.title, "Module mounted");
        LoadOutcome::Mounted {
            module: name.to_string(),
        }
    }

    /// Tears down the current module without loading another one.
    pub fn unmount_current(&self) {
        let previous = self.lock_current().take();
        if let Some(previous) = previous {
            self.set_state(LoaderState::Unmounting {
                module: previous.name.clone(),
            });
            self.document.lock().remove_scripts_for(&previous.name);
            teardown(previous);
        }
    }

    fn fail(&self, seq: u64, err: ShellError) -> LoadOutcome {
        if !self.is_latest(seq) {
            debug!(seq, error = %err, "Failure of superseded load ignored");
            return LoadOutcome::Superseded;
        }

        let shown = ErrorDisplay::from(&err);
        error!(seq, code = shown.code.as_str(), error = %err, "Module load failed");

        self.unmount_current();
        {
            let mut document = self.document.lock();
            document.clear_scripts();
            document.replace_container(shown.to_markup());
        }
        self.set_state(LoaderState::Error(shown.clone()));

        LoadOutcome::Failed(shown)
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.latest.load(Ordering::Acquire) == seq
    }

    fn set_state(&self, state: LoaderState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<MountedModule>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a module's entry point, containing errors and panics.
fn run_init(name: &str, module: &dyn PageModule, ctx: &ModuleContext, payload: Option<Value>) {
    match catch_unwind(AssertUnwindSafe(|| module.init(ctx, payload))) {
        Ok(Ok(())) => debug!(module = name, "Module initialized"),
        Ok(Err(e)) => error!(module = name, error = %e, "Module init failed"),
        Err(panic) => error!(
            module = name,
            reason = %describe_panic(panic.as_ref()),
            "Module init panicked"
        ),
    }
}

fn teardown(mounted: MountedModule) {
    if let Some(instance) = &mounted.instance {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| instance.unmount(&mounted.ctx))) {
            error!(
                module = %mounted.name,
                reason = %describe_panic(panic.as_ref()),
                "Module unmount panicked"
            );
        }
    }

    let released = mounted.ctx.release_subscriptions();
    debug!(module = %mounted.name, released, "Module unmounted");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadElementKind;
    use crate::error::{ErrorCode, ShellResult};
    use crate::fetch::StaticFetcher;
    use serde_json::json;
    use showroom_core::{EventBus, ModuleDescriptor};
    use showroom_store::MemoryStorage;
    use std::time::Duration;

    struct Recorder {
        seen: Arc<Mutex<Vec<Option<Value>>>>,
    }

    impl PageModule for Recorder {
        fn init(&self, ctx: &ModuleContext, payload: Option<Value>) -> ShellResult<()> {
            ctx.render("body", "ready");
            ctx.subscribe_key("cart", |_| {});
            self.seen.lock().unwrap().push(payload);
            Ok(())
        }
    }

    struct Exploding;

    impl PageModule for Exploding {
        fn init(&self, _ctx: &ModuleContext, _payload: Option<Value>) -> ShellResult<()> {
            panic!("boom");
        }
    }

    struct Failing;

    impl PageModule for Failing {
        fn init(&self, _ctx: &ModuleContext, _payload: Option<Value>) -> ShellResult<()> {
            Err(ShellError::invalid("no products"))
        }
    }

    fn resources(fetcher: StaticFetcher, name: &str) -> StaticFetcher {
        fetcher
            .with(format!("modules/{name}/{name}.html"), format!("<main>{name}</main>"))
            .with(format!("modules/{name}/{name}.js"), "")
    }

    struct Fixture {
        loader: ModuleLoader,
        store: Arc<StateStore>,
        seen: Arc<Mutex<Vec<Option<Value>>>>,
    }

    fn fixture(fetcher: StaticFetcher) -> Fixture {
        let registry = ModuleRegistry::from_table(vec![
            ModuleDescriptor::conventional("catalog", "Catalog"),
            ModuleDescriptor::conventional("cart", "Cart"),
            ModuleDescriptor::conventional("broken", "Broken"),
            ModuleDescriptor::conventional("failing", "Failing"),
            ModuleDescriptor::conventional("bare", "Bare"),
        ])
        .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let bundles = BundleRegistry::new();
        for name in ["catalog", "cart"] {
            let seen = seen.clone();
            bundles.register_module(name, move || Box::new(Recorder { seen: seen.clone() }));
        }
        bundles.register_module("broken", || Box::new(Exploding));
        bundles.register_module("failing", || Box::new(Failing));

        let store = Arc::new(StateStore::new(Arc::new(MemoryStorage::new()), EventBus::new()));
        let loader = ModuleLoader::new(
            Arc::new(registry),
            Arc::new(bundles),
            Arc::new(fetcher),
            store.clone(),
            DocumentHandle::new(),
        );

        Fixture { loader, store, seen }
    }

    fn all_resources() -> StaticFetcher {
        ["catalog", "cart", "broken", "failing", "bare"]
            .into_iter()
            .fold(StaticFetcher::new(), resources)
    }

    #[tokio::test]
    async fn test_load_mounts_module_and_passes_payload() {
        let f = fixture(all_resources());

        let outcome = f.loader.load_module("catalog", Some(json!({"category": "sofas"}))).await;
        assert_eq!(outcome, LoadOutcome::Mounted { module: "catalog".into() });

        let doc = f.loader.document();
        assert_eq!(doc.title(), "Catalog");
        assert_eq!(doc.container(), "<main>catalog</main>");
        assert_eq!(doc.region("body").as_deref(), Some("ready"));
        assert_eq!(f.loader.current_module().as_deref(), Some("catalog"));
        assert_eq!(f.loader.state(), LoaderState::Mounted { module: "catalog".into() });
        assert_eq!(*f.seen.lock().unwrap(), vec![Some(json!({"category": "sofas"}))]);
    }

    #[tokio::test]
    async fn test_stylesheet_once_script_every_time() {
        let f = fixture(all_resources());

        f.loader.load_module("catalog", None).await;
        f.loader.load_module("cart", None).await;
        f.loader.load_module("catalog", None).await;

        let doc = f.loader.document().lock();
        assert_eq!(doc.count(HeadElementKind::Stylesheet, "catalog"), 1);
        assert_eq!(doc.count(HeadElementKind::Stylesheet, "cart"), 1);
        assert_eq!(doc.count(HeadElementKind::Script, "catalog"), 1);
        assert_eq!(doc.count(HeadElementKind::Script, "cart"), 0);
        assert_eq!(f.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_navigation_releases_previous_module() {
        let f = fixture(all_resources());
        f.store.set("cart", json!([1]));

        f.loader.load_module("catalog", None).await;
        assert_eq!(f.store.bus().subscriber_count(showroom_core::STATE_UPDATED), 1);

        f.loader.load_module("cart", None).await;
        let doc = f.loader.document();
        assert!(!doc.container().contains("catalog"));
        assert_eq!(f.store.bus().subscriber_count(showroom_core::STATE_UPDATED), 1);
        assert_eq!(f.store.get("cart"), json!([1]));
    }

    #[tokio::test]
    async fn test_navigation_removes_previous_script() {
        let f = fixture(all_resources());

        f.loader.load_module("catalog", None).await;
        f.loader.load_module("cart", None).await;

        let doc = f.loader.document().lock();
        assert_eq!(doc.count(HeadElementKind::Script, "catalog"), 0);
        assert_eq!(doc.count(HeadElementKind::Script, "cart"), 1);
        assert_eq!(doc.count(HeadElementKind::Stylesheet, "catalog"), 1);
    }

    #[tokio::test]
    async fn test_failed_load_and_unmount_leave_no_scripts() {
        let f = fixture(all_resources());

        f.loader.load_module("catalog", None).await;
        f.loader.load_module("nonexistent", None).await;
        assert_eq!(f.loader.document().lock().count(HeadElementKind::Script, "catalog"), 0);

        f.loader.load_module("cart", None).await;
        f.loader.unmount_current();
        assert_eq!(f.loader.document().lock().count(HeadElementKind::Script, "cart"), 0);
        assert!(f.loader.current_module().is_none());
    }

    #[tokio::test]
    async fn test_unknown_module_shows_error_panel() {
        let f = fixture(all_resources());
        f.loader.load_module("catalog", None).await;

        let outcome = f.loader.load_module("nonexistent", None).await;
        let LoadOutcome::Failed(display) = outcome.clone() else {
            panic!("expected failure, got {outcome:?}");
        };

        assert_eq!(display.code, ErrorCode::ModuleNotFound);
        assert!(f.loader.document().container().contains("MODULE_NOT_FOUND"));
        assert!(f.loader.current_module().is_none());
        assert!(matches!(f.loader.state(), LoaderState::Error(_)));
    }

    #[tokio::test]
    async fn test_missing_markup_is_a_resource_failure() {
        let f = fixture(StaticFetcher::new());

        let outcome = f.loader.load_module("catalog", None).await;
        assert!(matches!(
            outcome,
            LoadOutcome::Failed(ErrorDisplay { code: ErrorCode::ResourceLoadFailure, .. })
        ));
        assert!(f.loader.document().container().contains("data-action=\"reload\""));
    }

    #[tokio::test]
    async fn test_init_panic_is_contained() {
        let f = fixture(all_resources());

        let outcome = f.loader.load_module("broken", None).await;
        assert_eq!(outcome, LoadOutcome::Mounted { module: "broken".into() });
        assert_eq!(f.loader.current_module().as_deref(), Some("broken"));
        assert_eq!(f.loader.document().title(), "Broken");

        let outcome = f.loader.load_module("failing", None).await;
        assert_eq!(outcome, LoadOutcome::Mounted { module: "failing".into() });
    }

    #[tokio::test]
    async fn test_module_without_bundle_still_mounts() {
        let f = fixture(all_resources());
        let outcome = f.loader.load_module("bare", None).await;
        assert_eq!(outcome, LoadOutcome::Mounted { module: "bare".into() });
        assert_eq!(f.loader.document().container(), "<main>bare</main>");
    }

    #[tokio::test]
    async fn test_slow_load_is_superseded_by_newer_one() {
        let fetcher = all_resources()
            .with_delay("modules/catalog/catalog.html", Duration::from_millis(80));
        let f = fixture(fetcher);

        let (slow, fast) = tokio::join!(
            f.loader.load_module("catalog", None),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                f.loader.load_module("cart", None).await
            }
        );

        assert_eq!(slow, LoadOutcome::Superseded);
        assert_eq!(fast, LoadOutcome::Mounted { module: "cart".into() });
        assert_eq!(f.loader.current_module().as_deref(), Some("cart"));
        assert_eq!(f.loader.document().container(), "<main>cart</main>");
        assert_eq!(f.loader.document().title(), "Cart");
        assert_eq!(f.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_markup_is_refetched_on_every_load() {
        let fetcher = Arc::new(all_resources());
        let registry = ModuleRegistry::from_table(vec![ModuleDescriptor::conventional("cart", "Cart")]).unwrap();
        let store = Arc::new(StateStore::new(Arc::new(MemoryStorage::new()), EventBus::new()));
        let loader = ModuleLoader::new(
            Arc::new(registry),
            Arc::new(BundleRegistry::new()),
            fetcher.clone(),
            store,
            DocumentHandle::new(),
        );

        loader.load_module("cart", None).await;
        loader.load_module("cart", None).await;
        assert_eq!(fetcher.fetch_count("modules/cart/cart.html"), 2);
        assert_eq!(fetcher.fetch_count("modules/cart/cart.js"), 2);
    }
}
