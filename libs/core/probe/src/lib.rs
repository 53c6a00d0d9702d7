// [libs/core/probe/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROBE ENGINE (V1.0)
 * CLASIFICACION: CORE DOMAIN SERVICE (ESTRATO L1)
 * RESPONSABILIDAD: DNS -> TCP -> HTTP -> HEURISTICAS DE LOGIN
 *
 * Punto unico de verdad del pipeline de sondeo. El Scheduler (apps/monitor)
 * solo conoce `ProbeEngine::probe(&Target) -> ProbeResult`; nunca toca
 * DNS/TCP/HTTP directamente.
 * =================================================================
 */

pub mod dns;
pub mod engine;
pub mod errors;
pub mod heuristics;
pub mod http;
pub mod tcp;
pub mod types;

pub use dns::{DnsResolver, TrustDnsResolver};
pub use engine::ProbeEngine;
pub use errors::ProbeError;
pub use http::{ProbeClient, ReqwestProbeClient};
pub use tcp::{TcpDialer, TokioTcpDialer};
pub use types::ProbeResult;
