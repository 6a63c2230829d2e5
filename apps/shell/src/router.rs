//! # Router
//!
//! Turns bus signals into module loads.
//!
//! ## Signal Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EventBus                         RouterCommand channel      Router     │
//! │  ────────                         ─────────────────────      ──────     │
//! │  navigate-to-module {module,data} ──► Navigate(request) ──┐             │
//! │  user-authenticated {user}        ──► Authenticated(user) ├─► handle()  │
//! │  user-logout                      ──► Logout              │     │       │
//! │  (error panel reload button)      ──► Reload ─────────────┘     │       │
//! │                                                                 ▼       │
//! │                                                  ModuleLoader::load_module
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bus handlers only enqueue. Loads run on the router task, so a handler
//! publishing `navigate-to-module` never suspends inside a bus delivery.
//!
//! ## Initial Route
//! | persisted session                 | first module      |
//! |-----------------------------------|-------------------|
//! | none                              | `login_module`    |
//! | role in `admin_roles`             | `admin_module`    |
//! | any other role                    | `default_module`  |

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use showroom_core::{
    AppEvent, NavigationRequest, Session, Subscription, NAVIGATE_TO_MODULE, USER_AUTHENTICATED,
    USER_LOGOUT,
};
use showroom_store::StateStore;

use crate::config::RoutingConfig;
use crate::loader::{LoadOutcome, ModuleLoader};

/// Work item for the router task.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterCommand {
    /// Mount a module.
    Navigate(NavigationRequest),
    /// A login succeeded with this user record.
    Authenticated(Value),
    /// End the session.
    Logout,
    /// Re-run the most recent load.
    Reload,
}

/// Routes navigation and session events to the loader.
pub struct Router {
    loader: Arc<ModuleLoader>,
    store: Arc<StateStore>,
    routing: RoutingConfig,
    commands: UnboundedSender<RouterCommand>,
    /// Taken by [`Router::run`]; `None` while the router task owns it.
    inbox: Mutex<Option<UnboundedReceiver<RouterCommand>>>,
    last_request: Mutex<Option<NavigationRequest>>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routing", &self.routing)
            .field("current", &self.loader.current_module())
            .finish()
    }
}

impl Router {
    /// Creates the router and subscribes it to the bus.
    pub fn new(loader: Arc<ModuleLoader>, store: Arc<StateStore>, routing: RoutingConfig) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let bus = store.bus().clone();

        let forward = |commands: &UnboundedSender<RouterCommand>| {
            let commands = commands.clone();
            move |event: &AppEvent| {
                let command = match event {
                    AppEvent::NavigateToModule(request) => RouterCommand::Navigate(request.clone()),
                    AppEvent::UserAuthenticated { user } => RouterCommand::Authenticated(user.clone()),
                    AppEvent::UserLogout => RouterCommand::Logout,
                    _ => return,
                };
                if commands.send(command).is_err() {
                    debug!(event = event.name(), "Router stopped, event dropped");
                }
            }
        };

        let subscriptions = vec![
            bus.subscribe(NAVIGATE_TO_MODULE, forward(&commands)),
            bus.subscribe(USER_AUTHENTICATED, forward(&commands)),
            bus.subscribe(USER_LOGOUT, forward(&commands)),
        ];

        Router {
            loader,
            store,
            routing,
            commands,
            inbox: Mutex::new(Some(inbox)),
            last_request: Mutex::new(None),
            subscriptions,
        }
    }

    /// Sender for commands that do not originate on the bus.
    pub fn commands(&self) -> UnboundedSender<RouterCommand> {
        self.commands.clone()
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    /// The module the current session lands on.
    pub fn initial_module(&self) -> &str {
        match self.store.current_session() {
            Some(session) => self.landing_module(&session),
            None => &self.routing.login_module,
        }
    }

    fn landing_module(&self, session: &Session) -> &str {
        if session.is_admin_of(&self.routing.admin_roles) {
            &self.routing.admin_module
        } else {
            &self.routing.default_module
        }
    }

    /// Loads the initial module.
    pub async fn start(&self) -> LoadOutcome {
        let module = self.initial_module().to_string();
        info!(module = %module, "Initial route");
        self.load(NavigationRequest::to(module)).await
    }

    /// Executes one command.
    pub async fn handle(&self, command: RouterCommand) -> LoadOutcome {
        match command {
            RouterCommand::Navigate(request) => self.load(request).await,

            RouterCommand::Authenticated(user) => match Session::from_user_record(&user) {
                Ok(session) => {
                    let module = self.landing_module(&session).to_string();
                    self.store.set_session(session);
                    self.load(NavigationRequest::to(module)).await
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed user-authenticated payload");
                    self.reload().await
                }
            },

            RouterCommand::Logout => {
                self.store.clear_session();
                let login = self.routing.login_module.clone();
                self.load(NavigationRequest::to(login)).await
            }

            RouterCommand::Reload => self.reload().await,
        }
    }

    /// Re-runs the most recent load request; falls back to the initial route.
    pub async fn reload(&self) -> LoadOutcome {
        let last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match last {
            Some(request) => self.load(request).await,
            None => self.start().await,
        }
    }

    /// Processes every queued command in order. Returns how many ran.
    ///
    /// Returns 0 without waiting once [`run`](Self::run) has taken the inbox.
    pub async fn drain(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = self
                .lock_inbox()
                .as_mut()
                .and_then(|inbox| inbox.try_recv().ok());
            let Some(command) = next else {
                break;
            };
            self.handle(command).await;
            handled += 1;
        }
        handled
    }

    /// Runs the router task. The router keeps a sender of its own, so this
    /// only ends when the task is aborted.
    ///
    /// The task takes sole ownership of the inbox. A second call returns at
    /// once, and [`drain`](Self::drain) finds nothing to do.
    ///
    /// Each command gets its own task, so a slow fetch never blocks a newer
    /// navigation; the loader's sequence numbers discard the stale one.
    pub async fn run(self: Arc<Self>) {
        let taken = self.lock_inbox().take();
        let Some(mut inbox) = taken else {
            warn!("Router task already running");
            return;
        };

        info!("Router running");
        while let Some(command) = inbox.recv().await {
            debug!(?command, "Router command");
            let router = self.clone();
            tokio::spawn(async move {
                router.handle(command).await;
            });
        }
        info!("Router stopped");
    }

    async fn load(&self, request: NavigationRequest) -> LoadOutcome {
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        self.loader.load_module(&request.module, request.data).await
    }

    fn lock_inbox(&self) -> MutexGuard<'_, Option<UnboundedReceiver<RouterCommand>>> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        let bus = self.store.bus();
        for subscription in &self.subscriptions {
            bus.unsubscribe(subscription);
        }
    }
}
