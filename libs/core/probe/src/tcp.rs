// [libs/core/probe/src/tcp.rs]
//! TCP stage: a single connect attempt against one address, timed.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::errors::ProbeError;

#[async_trait]
pub trait TcpDialer: Send + Sync {
    /// Connects to `host:port` (host may be a hostname or an IP literal
    /// formatted as a string) and returns the elapsed connect time.
    async fn dial(&self, host: &str, port: u16, connect_timeout: Duration) -> Result<Duration, ProbeError>;
}

pub struct TokioTcpDialer;

#[async_trait]
impl TcpDialer for TokioTcpDialer {
    async fn dial(&self, host: &str, port: u16, connect_timeout: Duration) -> Result<Duration, ProbeError> {
        let target = format!("{host}:{port}");
        let started = Instant::now();
        match timeout(connect_timeout, TcpStream::connect(&target)).await {
            Ok(Ok(_stream)) => Ok(started.elapsed()),
            Ok(Err(error)) => Err(ProbeError::TcpFailure {
                target,
                reason: error.to_string(),
            }),
            Err(_elapsed) => Err(ProbeError::TcpFailure {
                target,
                reason: "connect timed out".to_string(),
            }),
        }
    }
}

/// Default port for a scheme when the target URL omits one.
pub fn default_port(scheme: &str) -> u16 {
    if scheme == "https" {
        443
    } else {
        80
    }
}

/// Tries each IP in order, returning the first success's address + latency.
/// If `ips` is empty, dials by hostname directly.
pub async fn connect_in_order(
    dialer: &dyn TcpDialer,
    host: &str,
    ips: &[IpAddr],
    port: u16,
    connect_timeout: Duration,
) -> (bool, Option<String>, Option<Duration>) {
    if ips.is_empty() {
        return match dialer.dial(host, port, connect_timeout).await {
            Ok(elapsed) => (true, None, Some(elapsed)),
            Err(_) => (false, None, None),
        };
    }

    let mut first_failure_ip: Option<String> = None;
    for ip in ips {
        let ip_string = ip.to_string();
        match dialer.dial(&ip_string, port, connect_timeout).await {
            Ok(elapsed) => return (true, Some(ip_string), Some(elapsed)),
            Err(_) => {
                if first_failure_ip.is_none() {
                    first_failure_ip = Some(ip_string);
                }
            }
        }
    }
    (false, first_failure_ip, None)
}
