//! Repair tickets and the store that owns them.

mod backend;
mod store;
mod types;

pub use backend::{JsonFileBackend, LoadedTickets, StorageError, TicketBackend};
pub use store::{PurgeReport, TicketError, TicketStore, DEFAULT_RETENTION_DAYS};
pub use types::{NewTicket, Ticket, TicketStatus, DATE_FORMAT};
