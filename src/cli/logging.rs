//! Logging setup for the command-line front end.

use std::{io::IsTerminal, sync::Once};

use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    EnvFilter,
};

static DATALAB_LOG_ENV_VAR: &str = "DATALAB_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Installs a stderr subscriber.
///
/// `RUST_LOG` directives are honoured as usual; `DATALAB_LOG` sets the level
/// for this crate unless `RUST_LOG` already names it.
pub fn init() {
    // tests call this repeatedly
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .init();
    });
}

fn env_filter() -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(&directives);

    if directives.contains("datalab=") {
        return filter;
    }

    let level = std::env::var(DATALAB_LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    let directive: Result<Directive, _> = format!("datalab={level}")
        .parse()
        .or_else(|_| format!("datalab={DEFAULT_LEVEL}").parse());
    match directive {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
