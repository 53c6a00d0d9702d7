// [apps/monitor/src/main.rs]
/*!
 * =================================================================
 * APARATO: MONITOR MAIN ENTRY POINT (V1.0)
 * CLASIFICACION: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICION
 *
 * Carga de entorno, inicializacion de trazado, y un runtime Tokio con
 * pila ampliada antes de construir el kernel. Sin servidor HTTP propio
 * — el proceso vive mientras el scheduler y el evaluador de alertas
 * corran en segundo plano.
 * =================================================================
 */

use dotenvy::dotenv;
use monitor_app::bootstrap::MonitorKernel;
use monitor_app::config::Config;
use monitor_shared_telemetry::init_tracing;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("monitor");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        info!("monitor ignition sequence starting");

        let config = Config::from_env();
        let kernel = MonitorKernel::ignite(&config).await;
        kernel.launch().await;

        info!("monitor online; scheduler and alert evaluator running in the background");

        tokio::signal::ctrl_c().await.expect("failed to listen for shutdown signal");
        info!("shutdown signal received, exiting");

        Ok(())
    })
}
