//! End-to-end flows through the wired shell: bus events in, documents out.

use std::sync::Arc;

use serde_json::json;

use showroom_core::{keys, AppEvent, EventBus, ModuleDescriptor, ModuleRegistry, Session};
use showroom_shell::config::ShellConfig;
use showroom_shell::console::ConsoleCommand;
use showroom_shell::document::{DocumentHandle, HeadElementKind};
use showroom_shell::error::ErrorCode;
use showroom_shell::fetch::StaticFetcher;
use showroom_shell::loader::{LoadOutcome, LoaderState, ModuleLoader};
use showroom_shell::module::BundleRegistry;
use showroom_shell::Shell;
use showroom_store::{DurableStorage, MemoryStorage, StateStore};

const MODULES: [&str; 5] = ["login", "register", "catalog", "cart", "dashboard"];

fn assets() -> StaticFetcher {
    let fetcher = MODULES.into_iter().fold(StaticFetcher::new(), |fetcher, name| {
        fetcher
            .with(
                format!("modules/{name}/{name}.html"),
                format!("<section id=\"{name}\"></section>"),
            )
            .with(format!("modules/{name}/{name}.css"), "")
            .with(format!("modules/{name}/{name}.js"), "")
    });

    fetcher.with(
        "data/users.json",
        json!([
            {"id": "1", "nombre": "Ana", "email": "ana@showroom.test", "password": "admin123", "rol": "administrador"},
            {"id": "2", "nombre": "Luis", "email": "luis@showroom.test", "password": "cliente123", "rol": "cliente"}
        ])
        .to_string(),
    )
}

async fn shell_over(storage: Arc<MemoryStorage>) -> Shell {
    Shell::with_storage(&ShellConfig::default(), storage, Arc::new(assets()))
        .await
        .unwrap()
}

fn storage_with_session(role: &str) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    StateStore::new(storage.clone(), EventBus::new()).set_session(Session::new("9", "Eva", role));
    storage
}

#[tokio::test]
async fn initial_route_follows_the_persisted_session() {
    for (storage, expected) in [
        (Arc::new(MemoryStorage::new()), "login"),
        (storage_with_session("administrador"), "dashboard"),
        (storage_with_session("cliente"), "catalog"),
    ] {
        let shell = shell_over(storage).await;
        assert_eq!(
            shell.router().start().await,
            LoadOutcome::Mounted { module: expected.to_string() }
        );
        assert_eq!(shell.loader().current_module().as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn seed_document_populates_users_once() {
    let storage = Arc::new(MemoryStorage::new());
    let shell = shell_over(storage.clone()).await;
    assert_eq!(shell.store().get(keys::USERS).as_array().unwrap().len(), 2);

    shell.store().set(keys::USERS, json!([{"id": "7", "email": "solo@showroom.test"}]));
    drop(shell);

    let shell = shell_over(storage).await;
    assert_eq!(shell.store().get(keys::USERS), json!([{"id": "7", "email": "solo@showroom.test"}]));
}

#[tokio::test]
async fn seed_document_is_only_read_while_users_are_missing() {
    let storage = Arc::new(MemoryStorage::new());

    let first = Arc::new(assets());
    Shell::with_storage(&ShellConfig::default(), storage.clone(), first.clone())
        .await
        .unwrap();
    assert_eq!(first.fetch_count("data/users.json"), 1);

    let second = Arc::new(assets());
    let shell = Shell::with_storage(&ShellConfig::default(), storage, second.clone())
        .await
        .unwrap();
    assert_eq!(second.fetch_count("data/users.json"), 0);
    assert_eq!(shell.store().get(keys::USERS).as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_seed_document_falls_back_to_demo_accounts() {
    let shell = Shell::with_storage(
        &ShellConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(StaticFetcher::new()),
    )
    .await
    .unwrap();

    let users = shell.store().get(keys::USERS);
    assert!(users
        .as_array()
        .unwrap()
        .iter()
        .any(|user| user["email"] == "admin@showroom.test"));
}

#[tokio::test]
async fn navigation_replaces_the_previous_module() {
    let shell = shell_over(storage_with_session("cliente")).await;
    shell.router().start().await;

    shell.execute(ConsoleCommand::Go { module: "cart".into(), data: None });
    assert_eq!(shell.router().drain().await, 1);

    let document = shell.document().lock();
    assert_eq!(document.container(), "<section id=\"cart\"></section>");
    assert_eq!(document.count(HeadElementKind::Script, "catalog"), 0);
    assert_eq!(document.count(HeadElementKind::Script, "cart"), 1);
    assert_eq!(document.title(), "Cart");
    drop(document);

    assert_eq!(shell.loader().current_module().as_deref(), Some("cart"));
}

#[tokio::test]
async fn unknown_module_shows_error_without_touching_state() {
    let shell = shell_over(Arc::new(MemoryStorage::new())).await;
    shell.store().set(keys::CART, json!([{"productId": 1, "quantity": 1}]));
    let before: Vec<_> = keys::ALL.iter().map(|key| shell.store().get(key)).collect();

    let outcome = shell.loader().load_module("nonexistent", None).await;

    let LoadOutcome::Failed(display) = outcome.clone() else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(display.code, ErrorCode::ModuleNotFound);
    assert!(matches!(shell.loader().state(), LoaderState::Error(_)));
    assert!(shell.document().container().contains("data-action=\"reload\""));

    let after: Vec<_> = keys::ALL.iter().map(|key| shell.store().get(key)).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn catalog_loaded_twice_keeps_a_single_stylesheet() {
    let registry = ModuleRegistry::from_table([ModuleDescriptor::new(
        "catalog",
        "/catalog.html",
        "/catalog.css",
        "/catalog.js",
        "Catalog",
    )])
    .unwrap();
    let fetcher = StaticFetcher::new()
        .with("/catalog.html", "<ul class=\"products\"></ul>")
        .with("/catalog.css", "ul { margin: 0 }")
        .with("/catalog.js", "");

    let store = Arc::new(StateStore::new(Arc::new(MemoryStorage::new()), EventBus::new()));
    let loader = ModuleLoader::new(
        Arc::new(registry),
        Arc::new(BundleRegistry::new()),
        Arc::new(fetcher),
        store,
        DocumentHandle::new(),
    );

    loader.load_module("catalog", None).await;
    loader.load_module("catalog", None).await;

    let document = loader.document().lock();
    assert_eq!(document.title(), "Catalog");
    assert_eq!(document.container(), "<ul class=\"products\"></ul>");
    assert_eq!(document.count(HeadElementKind::Stylesheet, "catalog"), 1);
    assert_eq!(document.count(HeadElementKind::Script, "catalog"), 1);
}

#[tokio::test]
async fn console_login_routes_by_role_and_logout_returns_to_login() {
    let storage = Arc::new(MemoryStorage::new());
    let shell = shell_over(storage.clone()).await;
    shell.router().start().await;

    let reply = shell.execute(ConsoleCommand::Login {
        email: "ana@showroom.test".into(),
        password: "admin123".into(),
    });
    assert_eq!(reply, None);
    shell.router().drain().await;

    assert_eq!(shell.loader().current_module().as_deref(), Some("dashboard"));
    assert_eq!(shell.store().current_session().unwrap().id, "1");
    assert!(storage.get_item("showroomCurrentUser").unwrap().is_some());
    assert_eq!(
        shell.document().region("greeting").as_deref(),
        Some("Welcome, Ana")
    );

    shell.store().bus().publish(AppEvent::UserLogout);
    shell.router().drain().await;

    assert!(shell.store().current_session().is_none());
    assert_eq!(storage.get_item("showroomCurrentUser").unwrap(), None);
    assert_eq!(shell.loader().current_module().as_deref(), Some("login"));
}

#[tokio::test]
async fn storefront_flow_adds_and_clears_the_cart() {
    let shell = shell_over(storage_with_session("cliente")).await;
    shell.store().set(
        keys::PRODUCTS,
        json!([{"id": 1, "nombre": "Sofá Oslo", "precio": 899.0}]),
    );
    shell.router().start().await;

    assert_eq!(
        shell.execute(ConsoleCommand::Emit { event: "add-to-cart".into(), detail: json!({"productId": 1}) }),
        None
    );
    assert_eq!(shell.document().region("cart-count").as_deref(), Some("1"));

    shell.execute(ConsoleCommand::Go { module: "cart".into(), data: None });
    shell.router().drain().await;
    assert_eq!(shell.document().region("total").as_deref(), Some("899.00"));

    shell.execute(ConsoleCommand::Emit { event: "clear-cart".into(), detail: json!({}) });
    assert_eq!(shell.store().get(keys::CART), json!([]));

    let reply = shell.execute(ConsoleCommand::Emit { event: "add-to-cart".into(), detail: json!({"productId": 1}) });
    assert_eq!(reply.as_deref(), Some("no listeners for 'add-to-cart'"));
}
