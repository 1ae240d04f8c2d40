//! In-memory ticket backend with failure injection.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::ticket::{LoadedTickets, StorageError, Ticket, TicketBackend};

#[derive(Debug, Default)]
struct MemoryState {
    tickets: Vec<Ticket>,
    corrupt: Option<String>,
    fail_loads: bool,
    fail_next_save: bool,
    fail_all_saves: bool,
    save_count: usize,
}

/// Backend that keeps the "document" in memory.
///
/// Provides controllable behavior for testing:
/// - Seed the stored collection
/// - Simulate a corrupt document or an unreadable one
/// - Fail the next save, or every save
/// - Count successful saves
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose document already holds `tickets`.
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().tickets = tickets;
        backend
    }

    /// Tickets as of the last successful save.
    pub fn saved_tickets(&self) -> Vec<Ticket> {
        self.state.lock().unwrap().tickets.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state.lock().unwrap().save_count
    }

    /// Make the next load report a corrupt document.
    pub fn set_corrupt(&self, reason: impl Into<String>) {
        self.state.lock().unwrap().corrupt = Some(reason.into());
    }

    /// Make every load fail with a read error.
    pub fn fail_loads(&self) {
        self.state.lock().unwrap().fail_loads = true;
    }

    /// Make only the next save fail.
    pub fn fail_next_save(&self) {
        self.state.lock().unwrap().fail_next_save = true;
    }

    /// Make every save fail until [`MemoryBackend::heal`] is called.
    pub fn fail_all_saves(&self) {
        self.state.lock().unwrap().fail_all_saves = true;
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_loads = false;
        state.fail_next_save = false;
        state.fail_all_saves = false;
    }
}

impl TicketBackend for MemoryBackend {
    fn load(&self) -> Result<LoadedTickets, StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_loads {
            return Err(StorageError::Read {
                path: PathBuf::from(self.location()),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "simulated read failure"),
            });
        }
        if let Some(reason) = state.corrupt.take() {
            return Ok(LoadedTickets {
                tickets: Vec::new(),
                corrupt: Some(reason),
            });
        }
        Ok(LoadedTickets::new(state.tickets.clone()))
    }

    fn save(&self, tickets: &[Ticket]) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all_saves || std::mem::take(&mut state.fail_next_save) {
            return Err(StorageError::Unavailable("simulated write failure".to_string()));
        }
        state.tickets = tickets.to_vec();
        state.save_count += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
