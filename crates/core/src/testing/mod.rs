//! Test doubles for the ticket store.
//!
//! # Example
//!
//! ```rust,ignore
//! use repairdesk_core::testing::{FixedClock, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
//! let mut store = TicketStore::open(Box::new(backend.clone()), Box::new(clock))?;
//!
//! backend.fail_next_save();
//! assert!(store.add(NewTicket::new("Laptop", "Won't boot")).is_err());
//! ```

mod fixed_clock;
mod memory_backend;

pub use fixed_clock::FixedClock;
pub use memory_backend::MemoryBackend;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::ticket::{Ticket, TicketStatus};

    /// A Pending ticket with only the required fields filled in.
    pub fn pending_ticket(id: u64, device: &str, submitted: NaiveDate) -> Ticket {
        Ticket {
            id,
            device: device.to_string(),
            serial: String::new(),
            issue: format!("{} needs repair", device),
            submitted_by: String::new(),
            contact: String::new(),
            status: TicketStatus::Pending,
            date_submitted: submitted,
            date_repaired: None,
        }
    }

    /// A ticket closed with `status` on `closed`.
    pub fn closed_ticket(
        id: u64,
        device: &str,
        status: TicketStatus,
        closed: NaiveDate,
    ) -> Ticket {
        Ticket {
            status,
            date_repaired: Some(closed),
            ..pending_ticket(id, device, closed)
        }
    }
}
