// [libs/infra/store/src/gate.rs]
/*!
 * =================================================================
 * APARATO: STORE GATE (V1.0)
 * CLASIFICACION: INFRASTRUCTURE CORE (ESTRATO L3 - GLOBAL)
 * RESPONSABILIDAD: SERIALIZACION DE ESCRITURAS CONTRA EL ESCRITOR UNICO
 *
 * El unico estado global mutable del workspace. Se inicializa una vez
 * al arrancar el proceso y vive para siempre; todas
 * las escrituras (Persister, Alert Evaluator, admin SMTP/webhook saves)
 * pasan por `StoreGate::write`. Las lecturas no pasan por el gate.
 * =================================================================
 */

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::StoreError;

const MAX_ATTEMPTS: u32 = 10;
const MAX_BACKOFF_MS: u64 = 5000;

/// Process-wide write serialization primitive. Cheaply cloneable; all
/// clones share the same underlying mutex.
#[derive(Clone)]
pub struct StoreGate {
    write_lock: Arc<Mutex<()>>,
}

impl Default for StoreGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreGate {
    pub fn new() -> Self {
        Self {
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs `operation` under the global write lock, retrying transient
    /// contention with quadratic backoff (`min(5000ms, 100*attempt^2ms)`)
    /// up to 10 attempts. A non-transient error short-circuits immediately.
    pub async fn write<F, Fut, T>(&self, mut operation: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let _permit = self.write_lock.lock().await;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < MAX_ATTEMPTS => {
                    let backoff_ms = (100u64 * (attempt as u64).pow(2)).min(MAX_BACKOFF_MS);
                    warn!(attempt, backoff_ms, %error, "store write contended, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(error) => {
                    if attempt >= MAX_ATTEMPTS {
                        warn!(attempt, %error, "store write exhausted retry budget");
                    } else {
                        debug!(%error, "store write failed non-transiently");
                    }
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let gate = StoreGate::new();
        let attempts = AtomicU32::new(0);

        let result = gate
            .write(|| {
                let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if count < 3 {
                        Err(StoreError::Busy("locked".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_error_short_circuits() {
        let gate = StoreGate::new();
        let attempts = AtomicU32::new(0);

        let result: Result<(), StoreError> = gate
            .write(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Fatal("disk full".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn serializes_concurrent_writers() {
        let gate = StoreGate::new();
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for id in 0..5u32 {
            let gate = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                gate.write(|| {
                    let order = order.clone();
                    async move {
                        order.lock().await.push(id);
                        Ok::<(), StoreError>(())
                    }
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(order.lock().await.len(), 5);
    }
}
