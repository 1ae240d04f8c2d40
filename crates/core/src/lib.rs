//! Repair ticket tracking backed by a single JSON file.

pub mod clock;
pub mod config;
pub mod purge;
pub mod testing;
pub mod ticket;

pub use clock::{Clock, SystemClock};
pub use config::{
    default_data_dir, load_config, load_config_from_str, load_config_or_default, validate_config,
    Config, ConfigError, LogFormat, LoggingConfig, RetentionConfig, StorageConfig,
};
pub use purge::{PurgeTimer, DEFAULT_PURGE_INTERVAL};
pub use ticket::{
    JsonFileBackend, LoadedTickets, NewTicket, PurgeReport, StorageError, Ticket, TicketBackend,
    TicketError, TicketStatus, TicketStore, DATE_FORMAT, DEFAULT_RETENTION_DAYS,
};
