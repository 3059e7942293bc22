use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

const DEFAULT_DIRECTIVE: &str = "alt_switch=info";

/// Builds the filter from `RUST_LOG`, falling back to the crate default.
/// `verbose` raises the crate to debug (1) or trace (2+).
pub fn env_filter(verbose: u8) -> EnvFilter {
    let base = match verbose {
        0 => DEFAULT_DIRECTIVE,
        1 => "alt_switch=debug",
        _ => "alt_switch=trace",
    };
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() && verbose == 0 => {
            EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(base))
        }
        _ => EnvFilter::new(base),
    }
}

pub fn init_logging(verbose: u8) {
    let tree = HierarchicalLayer::default()
        .with_writer(std::io::stderr)
        .with_indent_lines(true)
        .with_targets(true)
        .with_deferred_spans(true);
    // Ignore the error: a subscriber may already be installed (tests).
    let _ = Registry::default().with(env_filter(verbose)).with(tree).try_init();
}
