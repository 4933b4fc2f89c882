use std::io;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Install the global subscriber. Log lines go to stderr so rendered
/// dashboards on stdout stay clean. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_log = fmt::layer().with_writer(io::stderr).with_target(false);

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(filter).with(stderr_log).try_init();
}
