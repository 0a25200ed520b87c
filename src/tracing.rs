//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `symbol_search=debug`.
pub const LOG_ENV: &str = "SYMBOL_SEARCH_LOG";

static INIT: Once = Once::new();

/// Initialize tracing. Safe to call multiple times.
///
/// `verbose` raises the default level from `warn` to `debug`; an explicit
/// filter in [`LOG_ENV`] always wins.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();
        let level = if is_test || verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .with_env_var(LOG_ENV)
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true)
            .compact();

        let installed = if is_test {
            builder.with_test_writer().try_init()
        } else {
            builder.with_writer(std::io::stderr).try_init()
        };
        if let Err(e) = installed {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
