// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname written into syslog headers.

use std::env;
use tracing::warn;

/// Syslog NILVALUE, used when no hostname can be determined.
pub const NIL_HOSTNAME: &str = "-";

/// Resolves the hostname to stamp on outgoing syslog messages.
///
/// Tries, in order:
/// 1. `SYSLOG_FWD_HOSTNAME`
/// 2. `HOSTNAME`
/// 3. the system hostname
/// 4. `-`
///
/// Whitespace is not allowed in a syslog HOSTNAME field, so candidates containing any are
/// skipped.
#[must_use]
pub fn get_hostname() -> String {
    for var in ["SYSLOG_FWD_HOSTNAME", "HOSTNAME"] {
        if let Ok(hostname) = env::var(var) {
            if is_valid(&hostname) {
                return hostname;
            }
        }
    }

    match system_hostname() {
        Some(hostname) if is_valid(&hostname) => return hostname,
        Some(hostname) => warn!("Ignoring unusable system hostname '{}'", hostname),
        None => {}
    }

    warn!("Could not determine hostname, using '{}'", NIL_HOSTNAME);
    NIL_HOSTNAME.to_string()
}

fn is_valid(hostname: &str) -> bool {
    !hostname.is_empty() && !hostname.chars().any(char::is_whitespace)
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname.into_string().ok(),
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok()
}
