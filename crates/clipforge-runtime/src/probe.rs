//! Advisory HTTP probe against a server that already claimed readiness.
//!
//! The ready marker is authoritative. A failed probe is logged and never
//! turns a ready session into a failed one.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

/// Per-request timeout for the advisory probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this HTTP status.
    Reachable(u16),
    Unreachable(String),
}

impl ProbeOutcome {
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable(_))
    }
}

/// Issue a single GET against `url`.
pub async fn probe_url(url: &str, timeout: Duration) -> ProbeOutcome {
    let client = match Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => return ProbeOutcome::Unreachable(e.to_string()),
    };

    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            debug!(url = %url, status = status, "Probe answered");
            ProbeOutcome::Reachable(status)
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Probe failed");
            ProbeOutcome::Unreachable(e.to_string())
        }
    }
}
