// [libs/infra/store/src/lib.rs]
/*!
 * =================================================================
 * MONITOR-INFRA-STORE
 * CLASIFICACION: INFRASTRUCTURE LAYER (ESTRATO L3)
 *
 * Adaptador de persistencia ACID de escritor unico (libSQL/Turso) para
 * el motor de monitoreo de disponibilidad. Expone el `StoreClient`
 * (conexion + esquema), el `StoreGate` (serializacion de escrituras) y
 * los repositorios por entidad, mas el `Persister` que los conecta con
 * el ciclo de sondeo.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod gate;
pub mod persister;
pub mod repositories;
pub mod schema;

pub use client::StoreClient;
pub use errors::StoreError;
pub use gate::StoreGate;
pub use persister::Persister;
pub use repositories::{
    CheckRepository, EventRepository, InstanceRepository, NotificationChannelRepository,
    TargetRepository, TargetStateRepository,
};
