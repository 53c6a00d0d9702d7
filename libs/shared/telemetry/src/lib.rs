// [libs/shared/telemetry/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY INIT (V1.0)
 * CLASIFICACION: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: TRAZADO ESTRUCTURADO Y CAPTURA GLOBAL DE PANICOS
 *
 * Filtro de entorno con fallback por modo debug/release, JSON plano en
 * produccion, salida compacta en desarrollo, y un panic hook que emite
 * un evento `tracing::error!` antes de que el proceso termine.
 * =================================================================
 */

use std::panic;

use tracing::{error, info, instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Initializes the global tracing subscriber plus a panic hook that logs
/// before the process exits. Call once from `main`; library crates never
/// call this.
#[instrument(skip_all)]
pub fn init_tracing(service_name: &str) {
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},hyper=warn,libsql=warn",
            service_name,
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    }

    let service_name = service_name.to_string();
    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("no panic message");

        error!(target: "panic", service = %service_name, location = %location, "worker panicked: {payload}");
    }));

    info!(service = %service_name, "telemetry initialized");
}
