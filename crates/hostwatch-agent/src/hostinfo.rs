//! Host identity: hostname detection and the instance identifier.

use std::env;
use std::fs;
use tracing::warn;

use crate::error::AgentError;

const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Get the system hostname.
///
/// Tries, in order: the `HW_HOSTNAME` override, the `HOSTNAME` environment
/// variable, `gethostname()`, then falls back to `"unknown"` so the agent
/// keeps running without a valid hostname.
#[must_use]
pub fn get_hostname() -> String {
    if let Ok(hostname) = env::var("HW_HOSTNAME") {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname_osstr) => {
            if let Some(hostname_str) = hostname_osstr.to_str() {
                if !hostname_str.is_empty() {
                    return hostname_str.to_string();
                }
            }
        }
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
        }
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}

/// Resolve the stable instance identifier.
///
/// The identifier-generation protocol itself lives outside the core; this
/// accepts an externally supplied `HW_INSTANCE_ID` or falls back to the
/// machine id. Failure here is fatal: everything downstream (log group
/// names, metric dimensions) assumes a stable identity.
pub fn get_instance_id() -> Result<String, AgentError> {
    if let Ok(id) = env::var("HW_INSTANCE_ID") {
        if !id.trim().is_empty() {
            return Ok(id.trim().to_string());
        }
    }

    match fs::read_to_string(MACHINE_ID_PATH) {
        Ok(contents) => {
            let id = contents.trim();
            if id.is_empty() {
                Err(AgentError::Identity(format!("{MACHINE_ID_PATH} is empty")))
            } else {
                Ok(id.to_string())
            }
        }
        Err(e) => Err(AgentError::Identity(format!(
            "could not read {MACHINE_ID_PATH}: {e}"
        ))),
    }
}
