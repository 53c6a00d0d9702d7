// [libs/core/probe/src/errors.rs]
//! Typed failure kinds for the probe pipeline (design notes: probe
//! errors never propagate out of the engine — they become `ProbeResult`
//! fields — but the internal stages still need a shared error vocabulary).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("[PROBE_DNS_FAULT] dns resolution failed for {host}: {reason}")]
    DnsFailure { host: String, reason: String },

    #[error("[PROBE_TCP_FAULT] tcp connect failed for {target}: {reason}")]
    TcpFailure { target: String, reason: String },

    #[error("[PROBE_HTTP_FAULT] http transport failure: {0}")]
    HttpTransportFailure(String),

    #[error("[PROBE_TIMEOUT] probe exceeded its {0}s budget")]
    Timeout(u64),

    #[error("[PROBE_BAD_URL] not an absolute http(s) url: {0}")]
    InvalidUrl(String),
}
