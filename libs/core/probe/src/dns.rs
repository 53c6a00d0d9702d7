// [libs/core/probe/src/dns.rs]
//! DNS stage: host -> ordered IP list. Failure is swallowed to an empty
//! list — the engine still attempts a hostname-based
//! TCP connect when no IP resolved.

use std::net::IpAddr;

use async_trait::async_trait;
use tracing::{instrument, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Vec<IpAddr>;
}

pub struct TrustDnsResolver {
    inner: TokioAsyncResolver,
}

impl TrustDnsResolver {
    pub fn from_system_config() -> Result<Self, trust_dns_resolver::error::ResolveError> {
        let inner = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self { inner })
    }
}

#[async_trait]
impl DnsResolver for TrustDnsResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, host: &str) -> Vec<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return vec![ip];
        }

        match self.inner.lookup_ip(host).await {
            Ok(lookup) => lookup.iter().collect(),
            Err(error) => {
                warn!(host, %error, "dns resolution failed");
                Vec::new()
            }
        }
    }
}
