// [libs/infra/store/src/client.rs]
/*!
 * =================================================================
 * APARATO: STORE CONNECTION CLIENT (V1.0)
 * CLASIFICACION: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE ACID DE ESCRITOR UNICO CONTRA LIBSQL
 *
 * El ancla de memoria evita que SQLite purgue el esquema cuando
 * `dataRoot` apunta a `file::memory:?cache=shared` en pruebas de
 * integracion.
 * =================================================================
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{error, info, instrument};

use crate::errors::StoreError;
use crate::schema::apply_full_schema;

#[derive(Clone)]
pub struct StoreClient {
    driver: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl StoreClient {
    #[instrument(skip(access_token))]
    pub async fn connect(connection_url: &str, access_token: Option<String>) -> Result<Self, StoreError> {
        if connection_url.is_empty() {
            return Err(StoreError::ConfigurationError("STORE_URL_UNDEFINED".into()));
        }

        info!(url = connection_url, "opening store connection");

        let is_remote = connection_url.starts_with("libsql://") || connection_url.starts_with("https://");
        let is_memory = connection_url.contains(":memory:") || connection_url.contains("mode=memory");

        let driver = if is_remote {
            let token = access_token
                .ok_or_else(|| StoreError::ConfigurationError("remote store requires an access token".into()))?;
            Builder::new_remote(connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(connection_url).build().await
        }
        .map_err(|error| StoreError::ConnectionError(error.to_string()))?;

        let shared_driver = Arc::new(driver);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = shared_driver
                .connect()
                .map_err(|error| StoreError::ConnectionError(format!("anchor connect failed: {error}")))?;
            apply_full_schema(&anchor_conn)
                .await
                .map_err(|error| StoreError::ConnectionError(format!("schema sync failed: {error}")))?;
            anchor = Some(Arc::new(anchor_conn));
        } else {
            let bootstrap_conn = shared_driver
                .connect()
                .map_err(|error| StoreError::ConnectionError(format!("bootstrap connect failed: {error}")))?;
            apply_full_schema(&bootstrap_conn)
                .await
                .map_err(|error| StoreError::ConnectionError(format!("schema sync failed: {error}")))?;
        }

        Ok(Self {
            driver: shared_driver,
            _memory_anchor: anchor,
        })
    }

    pub fn get_connection(&self) -> Result<Connection, StoreError> {
        self.driver.connect().map_err(|error| {
            error!(%error, "connection allocation failed");
            StoreError::ConnectionError(error.to_string())
        })
    }
}
