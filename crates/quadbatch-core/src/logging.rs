//! Logging setup built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str =
    "info,quadbatch_render=debug,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Installs a global fmt subscriber.
///
/// Honors `RUST_LOG` when set, otherwise falls back to [`DEFAULT_FILTER`].
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Installs a global fmt subscriber with an explicit filter directive string,
/// e.g. `"quadbatch_render=trace"`.
pub fn init_with_filter(directives: &str) {
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    // A second init (tests, embedding apps) keeps the first subscriber.
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init_with_filter("quadbatch_core=trace");
        init();
    }
}
