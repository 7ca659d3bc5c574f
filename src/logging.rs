//! Log output for the CLI.

use tracing_subscriber::EnvFilter;
use vbackup::constants::LOG_ENV;

/// Installs a stderr subscriber filtered by the `VBK_LOG` environment
/// variable, defaulting to warnings only.
pub(crate) fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
