//! # Showroom Shell Library
//!
//! Module loader, router and headless console for the showroom
//! single-page application.
//!
//! ## Module Organization
//! ```text
//! showroom_shell/
//! ├── lib.rs          ◄─── You are here (bootstrap & run)
//! ├── config.rs       ◄─── shell.toml + environment overrides
//! ├── error.rs        ◄─── ShellError, ErrorDisplay panel
//! ├── document.rs     ◄─── Container, regions, head elements
//! ├── fetch.rs        ◄─── ResourceFetcher (filesystem / static)
//! ├── module.rs       ◄─── PageModule, BundleRegistry, ModuleContext
//! ├── loader.rs       ◄─── ModuleLoader (one module at a time)
//! ├── router.rs       ◄─── Bus events → module loads
//! ├── console.rs      ◄─── Line commands for terminal use
//! └── modules/        ◄─── Built-in page modules
//! ```
//!
//! ## Bootstrap
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. EventBus                                                            │
//! │  2. StateStore over the configured backend (file / memory)              │
//! │  3. Hydrate every collection key from durable storage                   │
//! │  4. If `users` is empty, seed it from the seed document (demo fallback) │
//! │  5. ModuleRegistry + built-in bundles                                   │
//! │  6. ModuleLoader + Router (subscribes to the bus)                       │
//! │  7. Initial route: login / admin landing / default landing              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod document;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod module;
pub mod modules;
pub mod router;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use showroom_core::{keys, AppEvent, EventBus, ModuleRegistry};
use showroom_store::{
    demo_users, seed_users, users_present, DurableStorage, FileStorage, MemoryStorage, StateStore,
};

use config::{ShellConfig, StorageBackend};
use console::{ConsoleCommand, USAGE};
use document::DocumentHandle;
use error::ShellResult;
use fetch::{FsFetcher, ResourceFetcher};
use loader::ModuleLoader;
use router::{Router, RouterCommand};

/// A fully wired shell.
#[derive(Debug)]
pub struct Shell {
    store: Arc<StateStore>,
    router: Arc<Router>,
}

impl Shell {
    /// Builds the shell over the storage backend named by `config`.
    pub async fn bootstrap(config: &ShellConfig, fetcher: Arc<dyn ResourceFetcher>) -> ShellResult<Self> {
        let storage = open_storage(config)?;
        Self::with_storage(config, storage, fetcher).await
    }

    /// Builds the shell over an explicit storage backend.
    pub async fn with_storage(
        config: &ShellConfig,
        storage: Arc<dyn DurableStorage>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> ShellResult<Self> {
        let bus = EventBus::new();
        let store = Arc::new(StateStore::with_prefix(storage, bus, config.storage.prefix.clone()));

        let hydrated = store.hydrate(&keys::ALL);
        info!(hydrated, "State hydrated");

        if users_present(&store) {
            debug!("Users already stored, seed document not read");
        } else {
            let seed = load_seed(fetcher.as_ref(), &config.assets.seed_users).await;
            let seeded = seed_users(&store, seed);
            info!(seeded, "Seeded users");
        }

        let loader = Arc::new(ModuleLoader::new(
            Arc::new(ModuleRegistry::furniture_store()),
            Arc::new(modules::builtin_bundles()),
            fetcher,
            store.clone(),
            DocumentHandle::new(),
        ));

        let router = Arc::new(Router::new(loader, store.clone(), config.routing.clone()));

        Ok(Shell { store, router })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        self.router.loader()
    }

    pub fn document(&self) -> &DocumentHandle {
        self.router.loader().document()
    }

    /// Carries out a console command. Returns text to print, if any.
    ///
    /// Navigation and session commands only publish; the router task (or
    /// [`Router::drain`]) performs the load.
    pub fn execute(&self, command: ConsoleCommand) -> Option<String> {
        let bus = self.store.bus();

        match command {
            ConsoleCommand::Go { module, data } => {
                bus.publish(AppEvent::navigate(module, data));
                None
            }
            ConsoleCommand::Emit { event, detail } => {
                let listeners = bus.subscriber_count(&event);
                bus.publish(AppEvent::custom(event.clone(), detail));
                (listeners == 0).then(|| format!("no listeners for '{event}'"))
            }
            ConsoleCommand::Login { email, password } => {
                if bus.subscriber_count(modules::LOGIN_SUBMIT) == 0 {
                    return Some("the login module is not mounted (try: go login)".to_string());
                }
                bus.publish(AppEvent::custom(
                    modules::LOGIN_SUBMIT,
                    json!({"email": email, "password": password}),
                ));
                None
            }
            ConsoleCommand::Logout => {
                bus.publish(AppEvent::UserLogout);
                None
            }
            ConsoleCommand::Reload => {
                if self.router.commands().send(RouterCommand::Reload).is_err() {
                    warn!("Router stopped, reload dropped");
                }
                None
            }
            ConsoleCommand::Show => Some(self.document().lock().render_text()),
            ConsoleCommand::State { key } => Some(pretty(&self.store.get(&key))),
            ConsoleCommand::Help => Some(USAGE.to_string()),
            ConsoleCommand::Quit => None,
        }
    }
}

fn open_storage(config: &ShellConfig) -> ShellResult<Arc<dyn DurableStorage>> {
    let storage: Arc<dyn DurableStorage> = match config.storage.backend {
        StorageBackend::File => {
            let dir = config.storage_dir()?;
            info!(?dir, "Using file storage");
            Arc::new(FileStorage::open(dir)?)
        }
        StorageBackend::Memory => {
            info!(quota = ?config.storage.quota_bytes, "Using memory storage");
            match config.storage.quota_bytes {
                Some(quota) => Arc::new(MemoryStorage::with_quota(quota)),
                None => Arc::new(MemoryStorage::new()),
            }
        }
    };
    Ok(storage)
}

/// Reads the seed document. Falls back to the demo accounts when it is
/// missing or is not a JSON array.
async fn load_seed(fetcher: &dyn ResourceFetcher, path: &str) -> Vec<Value> {
    let text = match fetcher.fetch_text(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path, error = %e, "Seed document unavailable, using demo users");
            return demo_users();
        }
    };

    match serde_json::from_str::<Vec<Value>>(&text) {
        Ok(records) => records,
        Err(e) => {
            warn!(path, error = %e, "Seed document is not a JSON array, using demo users");
            demo_users()
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string())
}

/// Runs the shell in the terminal until `quit`, end of input or Ctrl-C.
///
/// ## Startup Sequence
/// 1. Load configuration (`SHOWROOM_CONFIG` names the file)
/// 2. Initialize tracing
/// 3. Bootstrap the shell over the assets directory
/// 4. Load the initial route
/// 5. Spawn the router task and read console commands
pub async fn run() -> ShellResult<()> {
    let config_path = std::env::var("SHOWROOM_CONFIG").ok().map(PathBuf::from);
    let config = ShellConfig::load(config_path)?;

    init_tracing(&config.logging.filter);
    info!("Starting Showroom shell");

    let fetcher = Arc::new(FsFetcher::new(config.assets.root.clone()));
    let shell = Shell::bootstrap(&config, fetcher).await?;

    shell.router().start().await;
    let router_task = tokio::spawn(shell.router().clone().run());

    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if let Some(output) = shell.execute(command) {
                            println!("{output}");
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    router_task.abort();
    info!("Shell stopped");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=showroom=trace` - Show trace for showroom crates only
/// - Default: `logging.filter` from the config
///
/// Logs go to stderr so console output stays readable.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
