//! CLI configuration: a thin layer over `syncline_config`.
//!
//! Resolves the active profile and applies `GlobalOpts` flag overrides
//! (--server, --insecure, --timeout) on top of it.

use std::time::Duration;

use syncline_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use syncline_config::{Config, Profile, config_path, load_config, save_config};

/// Build a `ClientConfig` from the config file, the active profile,
/// and CLI overrides. Flags win over the profile, the profile wins over
/// `[defaults]`.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config()?;
    resolve_with(&cfg, global)
}

pub(crate) fn resolve_with(cfg: &Config, global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let (name, mut profile) = cfg.profile(global.profile.as_deref())?;
    tracing::debug!(profile = %name, "resolved profile");

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    let mut config = syncline_config::profile_to_client_config(&profile, &cfg.defaults)?;

    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}
