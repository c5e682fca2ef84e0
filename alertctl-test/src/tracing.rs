use tracing_subscriber::EnvFilter;

const CRATE_NAMES: &[&str] = &["alertctl_cli", "alertctl_client", "alertctl_test"];

/// Initialize the logger for testing.
///
/// This logs to the stdout registered by the Rust test runner, and only captures logs from the
/// alertctl crates.
///
/// # Example
///
/// ```
/// alertctl_test::tracing::init();
/// ```
pub fn init() {
    let mut env_filter = EnvFilter::new("ERROR");

    // Add all internal modules with maximum log-level.
    for name in CRATE_NAMES {
        env_filter = env_filter.add_directive(format!("{name}=TRACE").parse().unwrap());
    }

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_only_workspace_crates() {
        assert!(CRATE_NAMES.contains(&env!("CARGO_CRATE_NAME")));
        assert!(CRATE_NAMES.iter().all(|name| name.starts_with("alertctl_")));

        // Repeated initialization must not panic.
        init();
        init();
    }
}
