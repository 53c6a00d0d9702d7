// [apps/monitor/src/bin/migrator.rs]
/*!
 * =================================================================
 * APARATO: DB MIGRATOR CLI (V1.0)
 * CLASIFICACION: OPS INFRASTRUCTURE (ESTRATO L6)
 * RESPONSABILIDAD: APLICAR EL ESQUEMA SOBRE EL ESCRITOR UNICO
 *
 * Conecta directamente, evitando todo el resto del kernel, y aplica el
 * esquema completo de forma idempotente. Seguro de correr
 * repetidamente contra la misma base.
 * =================================================================
 */

use dotenvy::dotenv;
use monitor_infra_store::schema::apply_full_schema;
use monitor_infra_store::StoreClient;
use monitor_shared_telemetry::init_tracing;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing("monitor-migrator");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        info!("applying website-monitor schema");

        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "./data/monitor.db".to_string());
        let database_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let client = match StoreClient::connect(&database_url, database_token).await {
            Ok(client) => client,
            Err(error) => {
                error!(%error, "failed to connect to store");
                return Err(anyhow::anyhow!(error));
            }
        };

        let connection = client.get_connection().map_err(|error| anyhow::anyhow!(error))?;

        match apply_full_schema(&connection).await {
            Ok(()) => {
                info!("schema applied successfully");
                Ok(())
            }
            Err(error) => {
                error!(%error, "schema application failed");
                std::process::exit(1);
            }
        }
    })
}
