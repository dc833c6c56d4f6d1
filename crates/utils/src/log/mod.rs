//! `tracing` initialization: a console layer plus an optional JSON file
//! layer, both honoring `RUST_LOG` over the configured fallback level.

pub mod config;

pub use tracing::{
    debug, debug_span, error, error_span, event, info, info_span, span, trace,
    trace_span, warn, warn_span, Level, Subscriber,
};
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use self::config::LogConfig;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .expect("failed to create logger filter")
}

impl LogConfig {
    /// Install the global subscriber. Safe to call more than once; only the
    /// first call takes effect.
    pub fn init(&self) {
        INIT_ONCE.call_once(|| {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(env_filter(&self.console_level));

            match self.file.clone() {
                Some(log_file) => {
                    let file_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(move || {
                            let file = std::fs::OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(&log_file)
                                .expect("failed to open log file");
                            Box::new(file)
                                as Box<dyn std::io::Write + Send + Sync>
                        })
                        .with_filter(env_filter(&self.file_level));
                    tracing_subscriber::registry()
                        .with(console_layer)
                        .with(file_layer)
                        .init();
                }
                None => {
                    tracing_subscriber::registry().with(console_layer).init();
                }
            }
        });
    }
}

pub fn init_logging_with_config(cfg: LogConfig) {
    cfg.init();
}

pub fn must_init_logging() {
    LogConfig::must_load().init();
}
