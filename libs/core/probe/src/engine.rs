// [libs/core/probe/src/engine.rs]
//! Orchestrates DNS -> TCP -> HTTP -> heuristics into one `ProbeResult`.
//! This is the only module that knows the full pipeline order; each
//! stage module stays ignorant of its neighbors.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use monitor_domain_models::Target;
use tracing::{instrument, warn};
use url::Url;

use crate::dns::DnsResolver;
use crate::heuristics;
use crate::http::{self, ProbeClient};
use crate::tcp::{self, TcpDialer};
use crate::types::ProbeResult;

pub const PER_TARGET_TIMEOUT: Duration = Duration::from_secs(45);
const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct ProbeEngine {
    dns: Box<dyn DnsResolver>,
    tcp: Box<dyn TcpDialer>,
    http: Box<dyn ProbeClient>,
}

impl ProbeEngine {
    pub fn new(dns: Box<dyn DnsResolver>, tcp: Box<dyn TcpDialer>, http: Box<dyn ProbeClient>) -> Self {
        Self { dns, tcp, http }
    }

    /// Runs one full probe of `target`, wrapped in the per-target timeout.
    /// A timeout produces the same shape as any other unreachable result —
    /// it never propagates as an `Err` (design notes: probe errors become
    /// `ProbeResult` fields, not propagated exceptions).
    #[instrument(skip(self, target), fields(target_id = target.target_id))]
    pub async fn probe(&self, target: &Target) -> ProbeResult {
        match tokio::time::timeout(PER_TARGET_TIMEOUT, self.probe_inner(target)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(target_id = target.target_id, "probe exceeded 45s budget");
                ProbeResult {
                    target_id: target.target_id,
                    tcp_ok: false,
                    tcp_latency_ms: None,
                    used_ip: None,
                    http_ok: false,
                    http_status_code: None,
                    http_latency_ms: None,
                    final_url: None,
                    login_detected: false,
                    detected_login_type: None,
                    summary: "TCP FAIL (timeout); HTTP FAIL (timeout)".to_string(),
                }
            }
        }
    }

    async fn probe_inner(&self, target: &Target) -> ProbeResult {
        let parsed = match Url::parse(&target.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            _ => return ProbeResult::unparseable(target.target_id, &target.url),
        };

        let host = match parsed.host_str() {
            Some(host) => host.to_string(),
            None => return ProbeResult::unparseable(target.target_id, &target.url),
        };
        let port = parsed.port().unwrap_or_else(|| tcp::default_port(parsed.scheme()));

        let ips = self.dns.resolve(&host).await;
        let (tcp_ok, tcp_used_ip, tcp_elapsed) =
            tcp::connect_in_order(self.tcp.as_ref(), &host, &ips, port, TCP_CONNECT_TIMEOUT).await;

        let http_outcome = self.walk_redirects(target, parsed.clone()).await;

        let summary = build_summary(tcp_ok, tcp_elapsed, &http_outcome);

        ProbeResult {
            target_id: target.target_id,
            tcp_ok,
            tcp_latency_ms: tcp_elapsed.map(|d| d.as_millis() as u64),
            used_ip: tcp_used_ip,
            http_ok: http_outcome.http_ok,
            http_status_code: http_outcome.status_code,
            http_latency_ms: http_outcome.elapsed.map(|d| d.as_millis() as u64),
            final_url: http_outcome.final_url,
            login_detected: http_outcome.login_detected,
            detected_login_type: http_outcome.detected_login_type,
            summary,
        }
    }

    async fn walk_redirects(&self, target: &Target, start_url: Url) -> HttpOutcome {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = start_url;
        let started = Instant::now();
        let mut last_outcome: Option<HttpOutcome> = None;

        for _hop in 0..=http::MAX_REDIRECTS {
            let current_str = current.to_string();
            if visited.contains(&current_str) {
                // Loop detected: a seen-URL repeat terminates the walk and
                // the last response actually fetched is the classified outcome.
                break;
            }
            visited.insert(current_str.clone());

            let response = match self.http.get(&current_str, HTTP_REQUEST_TIMEOUT).await {
                Ok(response) => response,
                Err(_error) => {
                    return HttpOutcome {
                        http_ok: false,
                        status_code: None,
                        elapsed: Some(started.elapsed()),
                        final_url: None,
                        login_detected: false,
                        detected_login_type: None,
                    }
                }
            };

            let status_code = response.status.as_u16();
            let header_blob = http::header_blob(&response.headers);
            let body_snippet = if http::should_sample_body(&response.headers) {
                http::decode_body_sample(&response.headers, &response.body)
            } else {
                String::new()
            };

            let (mut login_detected, detected_login_type) =
                heuristics::classify(&current_str, &header_blob, &body_snippet);

            let mut http_ok = status_code >= target.http_expected_status_min
                && status_code <= target.http_expected_status_max;

            // Login-gated override.
            if !http_ok && (status_code == 401 || status_code == 403) && login_detected {
                http_ok = true;
            }
            if !login_detected {
                login_detected = false;
            }

            let outcome = HttpOutcome {
                http_ok,
                status_code: Some(status_code),
                elapsed: Some(started.elapsed()),
                final_url: Some(current_str),
                login_detected,
                detected_login_type,
            };

            if http::is_redirect_status(response.status) {
                if let Some(location) = http::location_header(&response.headers) {
                    if let Ok(next) = current.join(&location) {
                        current = next;
                        last_outcome = Some(outcome);
                        continue;
                    }
                }
            }

            return outcome;
        }

        last_outcome.unwrap_or(HttpOutcome {
            http_ok: false,
            status_code: None,
            elapsed: Some(started.elapsed()),
            final_url: Some(current.to_string()),
            login_detected: false,
            detected_login_type: None,
        })
    }
}

struct HttpOutcome {
    http_ok: bool,
    status_code: Option<u16>,
    elapsed: Option<Duration>,
    final_url: Option<String>,
    login_detected: bool,
    detected_login_type: Option<String>,
}

fn build_summary(tcp_ok: bool, tcp_elapsed: Option<Duration>, http: &HttpOutcome) -> String {
    let tcp_part = match (tcp_ok, tcp_elapsed) {
        (true, Some(elapsed)) => format!("TCP OK ({}ms)", elapsed.as_millis()),
        _ => "TCP FAIL".to_string(),
    };

    let http_part = match (http.http_ok, http.status_code, http.elapsed) {
        (true, Some(code), Some(elapsed)) => format!("HTTP OK ({}, {}ms)", code, elapsed.as_millis()),
        (false, Some(code), Some(elapsed)) => format!("HTTP FAIL ({}, {}ms)", code, elapsed.as_millis()),
        _ => "HTTP FAIL".to_string(),
    };

    format!("{tcp_part}; {http_part}")
}
