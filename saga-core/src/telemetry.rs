//! Tracing subscriber installation.
//!
//! Library code only emits `tracing` events; binaries and tests call
//! [`init_tracing`] once to route them somewhere.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::GeneralConfig;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `general.log_level`. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(general: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if general.json_logs {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_a_noop() {
        let general = GeneralConfig::default();
        let _ = init_tracing(&general);
        assert!(!init_tracing(&general));
    }
}
