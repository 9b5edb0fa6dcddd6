//! gemspec CLI library - expose modules for testing

pub mod commands;
pub mod common;

pub use common::{GlobalOpts, Outcome, OutputOpts};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber; `RUST_LOG` wins over the verbosity flags
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| gemspec_logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
