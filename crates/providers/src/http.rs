//! Shared reqwest clients.
//!
//! Generation calls tolerate long model latencies (30 s); validation probes
//! are minimal requests and get a tight 10 s budget so a dead key never
//! blocks the UI for long.

use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static GENERATION_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(GENERATION_TIMEOUT)
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

static PROBE_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(PROBE_TIMEOUT)
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

pub fn generation_client() -> Client {
    GENERATION_HTTP.clone()
}

pub fn probe_client() -> Client {
    PROBE_HTTP.clone()
}
