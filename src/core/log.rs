//! Diagnostics go to stderr so the tables on stdout stay clean.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const APP_TARGET: &str = "tiltfolio";

/// Level for the crate's own events given how many times `-v` was passed.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG`, when set, replaces the default directive. Dependencies stay
/// at warnings unless it says otherwise.
fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match verbosity {
            0 => "off".to_string(),
            _ => format!("warn,{APP_TARGET}={}", level_for(verbosity)),
        };
        EnvFilter::new(directive)
    })
}

pub fn init_logging(verbosity: u8) {
    let app_filter = Targets::new()
        .with_target(APP_TARGET, level_for(verbosity))
        .with_default(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(app_filter)
        .with(env_filter(verbosity))
        .init();
}
