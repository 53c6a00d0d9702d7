// [libs/core/probe/tests/engine_test.rs]
//! Exercises `ProbeEngine` end to end against fake DNS/TCP/HTTP stages.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use monitor_core_probe::dns::DnsResolver;
use monitor_core_probe::engine::ProbeEngine;
use monitor_core_probe::errors::ProbeError;
use monitor_core_probe::http::{ProbeClient, RawResponse};
use monitor_core_probe::tcp::TcpDialer;
use monitor_domain_models::Target;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::StatusCode;

struct FakeDns;
#[async_trait]
impl DnsResolver for FakeDns {
    async fn resolve(&self, _host: &str) -> Vec<IpAddr> {
        vec!["93.184.216.34".parse().unwrap()]
    }
}

struct FakeTcpAlwaysOk;
#[async_trait]
impl TcpDialer for FakeTcpAlwaysOk {
    async fn dial(&self, _host: &str, _port: u16, _timeout: Duration) -> Result<Duration, ProbeError> {
        Ok(Duration::from_millis(5))
    }
}

struct FakeTcpAlwaysFail;
#[async_trait]
impl TcpDialer for FakeTcpAlwaysFail {
    async fn dial(&self, host: &str, _port: u16, _timeout: Duration) -> Result<Duration, ProbeError> {
        Err(ProbeError::TcpFailure {
            target: host.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Serves a fixed script of responses keyed by URL, for redirect-chain tests.
struct ScriptedHttp {
    script: Vec<(&'static str, StatusCode, Vec<(&'static str, &'static str)>, &'static str)>,
}

#[async_trait]
impl ProbeClient for ScriptedHttp {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<RawResponse, ProbeError> {
        let (_, status, header_pairs, body) = self
            .script
            .iter()
            .find(|(script_url, ..)| *script_url == url)
            .unwrap_or_else(|| panic!("no scripted response for {url}"));

        let mut headers = HeaderMap::new();
        for (key, value) in header_pairs {
            headers.insert(
                reqwest::header::HeaderName::from_bytes(key.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }

        Ok(RawResponse {
            status: *status,
            headers,
            body: body.as_bytes().to_vec(),
        })
    }
}

fn target(url: &str) -> Target {
    Target {
        target_id: 1,
        instance_id: "acme".to_string(),
        url: url.to_string(),
        enabled: true,
        http_expected_status_min: 200,
        http_expected_status_max: 399,
        login_rule: None,
    }
}

#[tokio::test]
async fn healthy_target_reports_tcp_and_http_ok() {
    let http = ScriptedHttp {
        script: vec![("https://example.com/", StatusCode::OK, vec![], "<h1>ok</h1>")],
    };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysOk), Box::new(http));
    let result = engine.probe(&target("https://example.com/")).await;

    assert!(result.tcp_ok);
    assert!(result.http_ok);
    assert_eq!(result.http_status_code, Some(200));
    assert_eq!(result.final_url.as_deref(), Some("https://example.com/"));
}

#[tokio::test]
async fn tcp_failure_still_attempts_http() {
    let http = ScriptedHttp {
        script: vec![("https://example.com/", StatusCode::OK, vec![], "<h1>ok</h1>")],
    };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysFail), Box::new(http));
    let result = engine.probe(&target("https://example.com/")).await;

    assert!(!result.tcp_ok);
    assert!(result.http_ok);
}

#[tokio::test]
async fn follows_redirect_chain_to_final_url() {
    let http = ScriptedHttp {
        script: vec![
            (
                "https://example.com/",
                StatusCode::FOUND,
                vec![("location", "/next")],
                "",
            ),
            ("https://example.com/next", StatusCode::OK, vec![], "<h1>landed</h1>"),
        ],
    };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysOk), Box::new(http));
    let result = engine.probe(&target("https://example.com/")).await;

    assert!(result.http_ok);
    assert_eq!(result.final_url.as_deref(), Some("https://example.com/next"));
}

#[tokio::test]
async fn redirect_loop_classifies_on_last_fetched_response() {
    let http = ScriptedHttp {
        script: vec![
            (
                "https://example.com/",
                StatusCode::FOUND,
                vec![("location", "/a")],
                "",
            ),
            (
                "https://example.com/a",
                StatusCode::FOUND,
                vec![("location", "/")],
                "",
            ),
        ],
    };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysOk), Box::new(http));
    let result = engine.probe(&target("https://example.com/")).await;

    // The chain goes / -> /a -> / again, a repeated URL, so the walk stops
    // there. It must classify on the /a response actually fetched, not fall
    // through to a blanked-out failure with a null status and final_url.
    assert_eq!(result.http_status_code, Some(302));
    assert_eq!(result.final_url.as_deref(), Some("https://example.com/a"));
}

#[tokio::test]
async fn login_gated_401_is_lifted_to_ok() {
    let http = ScriptedHttp {
        script: vec![(
            "https://example.com/",
            StatusCode::UNAUTHORIZED,
            vec![],
            "<input type=\"password\">",
        )],
    };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysOk), Box::new(http));
    let result = engine.probe(&target("https://example.com/")).await;

    assert!(result.http_ok, "401 with a password form should be lifted to ok");
    assert!(result.login_detected);
    assert_eq!(result.detected_login_type.as_deref(), Some("PasswordForm"));
}

#[tokio::test]
async fn invalid_url_produces_all_failed_result() {
    let http = ScriptedHttp { script: vec![] };
    let engine = ProbeEngine::new(Box::new(FakeDns), Box::new(FakeTcpAlwaysOk), Box::new(http));
    let result = engine.probe(&target("not-a-url")).await;

    assert!(!result.tcp_ok);
    assert!(!result.http_ok);
    assert!(result.final_url.is_none());
}
