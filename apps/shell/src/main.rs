//! # Showroom Shell Entry Point
//!
//! Runs the shell headless: the document lives in memory and a line console
//! stands in for clicks and form submits.
//!
//! ## Startup Sequence
//! 1. Load configuration (file, then environment)
//! 2. Initialize tracing (logging)
//! 3. Open durable storage and hydrate state
//! 4. Seed users, build the module registry and bundles
//! 5. Load the initial route
//! 6. Read console commands until `quit`

#[tokio::main]
async fn main() {
    // The actual setup is in lib.rs so integration tests can reuse it
    if let Err(e) = showroom_shell::run().await {
        eprintln!("showroom-shell: {e}");
        std::process::exit(1);
    }
}
