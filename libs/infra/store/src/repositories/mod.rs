// [libs/infra/store/src/repositories/mod.rs]
//! Barrel module: one repository per entity, grouped by the stratum they
//! serve.

// --- ESTRATO: TOPOLOGIA DE INSTANCIAS Y OBJETIVOS ---
pub mod instance_repository;
pub mod target_repository;

// --- ESTRATO: OBSERVABILIDAD DEL SONDEO ---
pub mod check_repository;
pub mod target_state_repository;

// --- ESTRATO: AUDITORIA Y ALERTAS ---
pub mod event_repository;
pub mod notification_channel_repository;

pub use check_repository::CheckRepository;
pub use event_repository::EventRepository;
pub use instance_repository::InstanceRepository;
pub use notification_channel_repository::NotificationChannelRepository;
pub use target_repository::TargetRepository;
pub use target_state_repository::TargetStateRepository;
