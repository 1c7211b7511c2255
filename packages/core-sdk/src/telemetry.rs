use tracing_subscriber::EnvFilter;

/** \brief Filter used when `RUST_LOG` is unset or unparsable. */
pub const DEFAULT_FILTER: &str = "info";

fn env_filter(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|r| EnvFilter::try_new(r).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/**
 * \brief Installs the console tracing subscriber, filtered by `RUST_LOG` (default `info`).
 * \details A second call is a no-op.
 */
pub fn init_tracing() {
    let raw = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(raw.as_deref()))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_env_filter_falls_back_to_default() {
        assert_eq!(env_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            env_filter(Some("chatrelay_core_sdk=debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
