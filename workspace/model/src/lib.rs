pub mod entities;

// Re-export tracing so entity consumers log through the same facade
pub use tracing;

/// Installs a plain stdout subscriber, filtered by `RUST_LOG`.
///
/// For standalone use of the entity crate; the server binary installs its
/// own layered subscriber instead.
#[cfg(not(test))]
pub fn init_tracing() {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .init();
}
