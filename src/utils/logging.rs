use tracing::Level;

/// Install the global tracing subscriber at the given level.
///
/// Unrecognized level strings fall back to `info`. Safe to call more than
/// once; later calls keep the first subscriber.
pub fn init(level: &str) {
    let max_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .try_init();
}
