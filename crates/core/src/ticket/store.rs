//! The ticket store: an ordered in-memory collection mirrored to a backend.
//!
//! Every mutation is written through to the backend before it is reported as
//! successful. When the write fails, the in-memory change is undone so the
//! collection always matches the last successful save.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use super::backend::{StorageError, TicketBackend};
use super::{NewTicket, Ticket, TicketStatus};
use crate::clock::Clock;

/// Default number of days a repaired ticket is kept before purging.
pub const DEFAULT_RETENTION_DAYS: u32 = 10;

/// Error type for ticket operations.
///
/// Everything except [`TicketError::Storage`] is a refusal: the store was left
/// untouched and the user only needs to be told why.
#[derive(Debug, Error)]
pub enum TicketError {
    /// A required form field was empty after trimming.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// No ticket has this id.
    #[error("Ticket not found: {0}")]
    NotFound(u64),

    /// The ticket is already in the requested status.
    #[error("Ticket {id} is already {status}")]
    AlreadyInStatus { id: u64, status: TicketStatus },

    /// The highest stored id is `u64::MAX`, so no new id can be assigned.
    #[error("No ticket id left after {}", u64::MAX)]
    IdsExhausted,

    /// The change could not be persisted and was rolled back.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TicketError {
    /// Whether this is a normal refusal rather than an I/O failure.
    pub fn is_refusal(&self) -> bool {
        !matches!(self, TicketError::Storage(_))
    }
}

/// Tickets removed by a purge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: Vec<Ticket>,
}

impl PurgeReport {
    pub fn count(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Owner of the ticket collection.
pub struct TicketStore {
    backend: Box<dyn TicketBackend>,
    clock: Box<dyn Clock>,
    tickets: Vec<Ticket>,
    retention_days: u32,
    load_warning: Option<String>,
}

impl TicketStore {
    /// Load the collection from `backend`.
    ///
    /// A corrupt document yields an empty store with [`TicketStore::load_warning`] set.
    /// Any other read failure is returned.
    pub fn open(
        backend: Box<dyn TicketBackend>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let loaded = backend.load()?;
        info!(
            "Loaded {} tickets from {}",
            loaded.tickets.len(),
            backend.location()
        );

        Ok(Self {
            backend,
            clock,
            tickets: loaded.tickets,
            retention_days: DEFAULT_RETENTION_DAYS,
            load_warning: loaded.corrupt,
        })
    }

    /// Set how many days repaired tickets are kept.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Parse error from load, if the data file was corrupt.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    /// Tickets in insertion order.
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn get(&self, id: u64) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Where the collection is persisted.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Write the whole collection to the backend.
    pub fn save(&self) -> Result<(), StorageError> {
        self.backend.save(&self.tickets)
    }

    /// Create a Pending ticket from the form fields.
    pub fn add(&mut self, request: NewTicket) -> Result<Ticket, TicketError> {
        let request = request.trimmed();
        if request.device.is_empty() {
            return Err(TicketError::MissingField("Device name"));
        }
        if request.issue.is_empty() {
            return Err(TicketError::MissingField("Issue description"));
        }

        let ticket = Ticket {
            id: self.next_id().ok_or(TicketError::IdsExhausted)?,
            device: request.device,
            serial: request.serial,
            issue: request.issue,
            submitted_by: request.submitted_by,
            contact: request.contact,
            status: TicketStatus::Pending,
            date_submitted: self.clock.today(),
            date_repaired: None,
        };

        self.tickets.push(ticket.clone());
        if let Err(e) = self.save() {
            self.tickets.pop();
            error!("Failed to save new ticket for '{}': {}", ticket.device, e);
            return Err(e.into());
        }

        info!("Added ticket {} for '{}'", ticket.id, ticket.device);
        Ok(ticket)
    }

    /// Mark a ticket Repaired, stamping today's date.
    pub fn mark_repaired(&mut self, id: u64) -> Result<Ticket, TicketError> {
        self.close(id, TicketStatus::Repaired)
    }

    /// Mark a ticket Canceled, stamping today's date.
    pub fn cancel_repair(&mut self, id: u64) -> Result<Ticket, TicketError> {
        self.close(id, TicketStatus::Canceled)
    }

    /// Remove a ticket. Callers confirm with the user first.
    pub fn delete(&mut self, id: u64) -> Result<Ticket, TicketError> {
        let index = self.index_of(id)?;
        let ticket = self.tickets.remove(index);

        if let Err(e) = self.save() {
            error!("Failed to save after deleting ticket {}: {}", id, e);
            self.tickets.insert(index, ticket);
            return Err(e.into());
        }

        info!("Deleted ticket {} ('{}')", ticket.id, ticket.device);
        Ok(ticket)
    }

    /// Remove Repaired tickets closed at least `retention_days` before `now`.
    ///
    /// Nothing is written when nothing is removed.
    pub fn purge_old_repaired(&mut self, now: NaiveDate) -> Result<PurgeReport, TicketError> {
        let days = self.retention_days;
        let (removed, kept): (Vec<Ticket>, Vec<Ticket>) = self
            .tickets
            .iter()
            .cloned()
            .partition(|t| t.repaired_at_least_days_before(now, days));

        if removed.is_empty() {
            return Ok(PurgeReport::default());
        }

        let previous = std::mem::replace(&mut self.tickets, kept);
        if let Err(e) = self.save() {
            error!("Failed to save after purging old repaired tickets: {}", e);
            self.tickets = previous;
            return Err(e.into());
        }

        info!(
            "Purged {} repaired tickets older than {} days",
            removed.len(),
            days
        );
        Ok(PurgeReport { removed })
    }

    /// Purge as of the clock's current date.
    pub fn purge_due(&mut self) -> Result<PurgeReport, TicketError> {
        let now = self.clock.today();
        self.purge_old_repaired(now)
    }

    fn close(&mut self, id: u64, status: TicketStatus) -> Result<Ticket, TicketError> {
        let today = self.clock.today();
        let index = self.index_of(id)?;
        let ticket = &mut self.tickets[index];

        if ticket.status == status {
            return Err(TicketError::AlreadyInStatus { id, status });
        }

        let previous = (ticket.status, ticket.date_repaired);
        ticket.status = status;
        ticket.date_repaired = Some(today);

        if let Err(e) = self.save() {
            warn!("Rolling back ticket {} to {}", id, previous.0);
            let ticket = &mut self.tickets[index];
            ticket.status = previous.0;
            ticket.date_repaired = previous.1;
            error!("Failed to save status change for ticket {}: {}", id, e);
            return Err(e.into());
        }

        let ticket = self.tickets[index].clone();
        info!("Ticket {} ('{}') is now {}", id, ticket.device, status);
        Ok(ticket)
    }

    fn index_of(&self, id: u64) -> Result<usize, TicketError> {
        self.tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or(TicketError::NotFound(id))
    }

    /// One past the highest id currently stored. Ids freed by deleting the
    /// newest ticket are handed out again. `None` once `u64::MAX` is taken.
    fn next_id(&self) -> Option<u64> {
        self.tickets.iter().map(|t| t.id).max().unwrap_or(0).checked_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, FixedClock, MemoryBackend};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 6, 15)
    }

    fn create_test_store() -> (TicketStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = TicketStore::open(
            Box::new(backend.clone()),
            Box::new(FixedClock::new(today())),
        )
        .unwrap();
        (store, backend)
    }

    fn laptop() -> NewTicket {
        NewTicket::new("Laptop", "Won't boot")
            .with_serial("SN1")
            .with_submitted_by("Alice")
            .with_contact("a@x.com")
    }

    #[test]
    fn test_add_ticket() {
        let (mut store, backend) = create_test_store();

        let ticket = store.add(laptop()).unwrap();

        assert_eq!(ticket.id, 1);
        assert_eq!(ticket.device, "Laptop");
        assert_eq!(ticket.serial, "SN1");
        assert_eq!(ticket.submitted_by, "Alice");
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.date_submitted, today());
        assert_eq!(ticket.date_repaired, None);
        assert_eq!(store.len(), 1);
        assert_eq!(backend.saved_tickets(), store.tickets());
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let (mut store, _) = create_test_store();

        let ids: Vec<u64> = (0..5)
            .map(|i| store.add(NewTicket::new(format!("Device {i}"), "issue")).unwrap().id)
            .collect();

        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_add_continues_after_loaded_max_id() {
        let backend = MemoryBackend::new();
        {
            let mut seed = TicketStore::open(
                Box::new(backend.clone()),
                Box::new(FixedClock::new(today())),
            )
            .unwrap();
            seed.add(NewTicket::new("A", "x")).unwrap();
            seed.add(NewTicket::new("B", "y")).unwrap();
            seed.add(NewTicket::new("C", "z")).unwrap();
            seed.delete(2).unwrap();
        }

        let mut store =
            TicketStore::open(Box::new(backend), Box::new(FixedClock::new(today()))).unwrap();
        assert_eq!(store.add(NewTicket::new("D", "w")).unwrap().id, 4);
    }

    #[test]
    fn test_add_refuses_when_max_id_is_taken() {
        let backend = MemoryBackend::with_tickets(vec![fixtures::pending_ticket(
            u64::MAX,
            "Server",
            date(2024, 6, 1),
        )]);
        let mut store =
            TicketStore::open(Box::new(backend.clone()), Box::new(FixedClock::new(today())))
                .unwrap();

        let err = store.add(NewTicket::new("Laptop", "x")).unwrap_err();

        assert!(matches!(err, TicketError::IdsExhausted));
        assert!(err.is_refusal());
        assert_eq!(store.len(), 1);
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn test_deleting_newest_ticket_frees_its_id() {
        let (mut store, _) = create_test_store();
        store.add(NewTicket::new("A", "x")).unwrap();
        store.add(NewTicket::new("B", "y")).unwrap();

        store.delete(2).unwrap();

        assert_eq!(store.add(NewTicket::new("C", "z")).unwrap().id, 2);
    }

    #[test]
    fn test_add_rejects_blank_required_fields() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();
        let saves = backend.save_count();

        let blank_device = store.add(NewTicket::new("   ", "Won't boot"));
        assert!(matches!(blank_device, Err(TicketError::MissingField("Device name"))));

        let blank_issue = store.add(NewTicket::new("Phone", "\t"));
        assert!(matches!(blank_issue, Err(TicketError::MissingField("Issue description"))));

        assert_eq!(store.len(), 1);
        assert_eq!(backend.save_count(), saves);
        assert!(blank_issue.unwrap_err().is_refusal());
    }

    #[test]
    fn test_add_trims_all_fields() {
        let (mut store, _) = create_test_store();

        let ticket = store
            .add(NewTicket::new(" Monitor ", " flicker ").with_contact("  ext 12 "))
            .unwrap();

        assert_eq!(ticket.device, "Monitor");
        assert_eq!(ticket.issue, "flicker");
        assert_eq!(ticket.contact, "ext 12");
    }

    #[test]
    fn test_add_rolls_back_on_save_failure() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();
        let before = store.tickets().to_vec();

        backend.fail_next_save();
        let result = store.add(NewTicket::new("Phone", "cracked"));

        assert!(matches!(result, Err(TicketError::Storage(_))));
        assert!(!result.unwrap_err().is_refusal());
        assert_eq!(store.tickets(), before.as_slice());
        assert_eq!(backend.saved_tickets(), before);
    }

    #[test]
    fn test_mark_repaired() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();

        let ticket = store.mark_repaired(1).unwrap();

        assert_eq!(ticket.status, TicketStatus::Repaired);
        assert_eq!(ticket.date_repaired, Some(today()));
        assert_eq!(backend.saved_tickets()[0].status, TicketStatus::Repaired);
    }

    #[test]
    fn test_mark_repaired_twice_is_refused() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();
        store.mark_repaired(1).unwrap();
        let saves = backend.save_count();

        let result = store.mark_repaired(1);

        assert!(matches!(
            result,
            Err(TicketError::AlreadyInStatus {
                id: 1,
                status: TicketStatus::Repaired
            })
        ));
        assert_eq!(store.get(1).unwrap().date_repaired, Some(today()));
        assert_eq!(backend.save_count(), saves);
    }

    #[test]
    fn test_mark_repaired_rolls_back_on_save_failure() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();

        backend.fail_next_save();
        let result = store.mark_repaired(1);

        assert!(matches!(result, Err(TicketError::Storage(_))));
        let ticket = store.get(1).unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.date_repaired, None);
    }

    #[test]
    fn test_cancel_repair() {
        let (mut store, _) = create_test_store();
        store.add(laptop()).unwrap();

        let ticket = store.cancel_repair(1).unwrap();
        assert_eq!(ticket.status, TicketStatus::Canceled);
        assert_eq!(ticket.date_repaired, Some(today()));

        let again = store.cancel_repair(1);
        assert!(matches!(again, Err(TicketError::AlreadyInStatus { .. })));
        assert_eq!(store.get(1).unwrap().status, TicketStatus::Canceled);
    }

    #[test]
    fn test_cancel_after_repair_restores_previous_state_on_failure() {
        let clock = FixedClock::new(date(2024, 6, 1));
        let backend = MemoryBackend::new();
        let mut store =
            TicketStore::open(Box::new(backend.clone()), Box::new(clock.clone())).unwrap();
        store.add(laptop()).unwrap();
        store.mark_repaired(1).unwrap();

        clock.set(today());
        backend.fail_next_save();
        assert!(store.cancel_repair(1).is_err());

        let ticket = store.get(1).unwrap();
        assert_eq!(ticket.status, TicketStatus::Repaired);
        assert_eq!(ticket.date_repaired, Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_status_change_on_unknown_id_is_not_found() {
        let (mut store, _) = create_test_store();

        assert!(matches!(store.mark_repaired(42), Err(TicketError::NotFound(42))));
        assert!(matches!(store.cancel_repair(42), Err(TicketError::NotFound(42))));
        assert!(matches!(store.delete(42), Err(TicketError::NotFound(42))));
    }

    #[test]
    fn test_delete_removes_only_target() {
        let (mut store, _) = create_test_store();
        for name in ["A", "B", "C"] {
            store.add(NewTicket::new(name, "issue")).unwrap();
        }
        let first = store.get(1).unwrap().clone();
        let third = store.get(3).unwrap().clone();

        let deleted = store.delete(2).unwrap();

        assert_eq!(deleted.device, "B");
        assert_eq!(store.tickets(), &[first, third]);
    }

    #[test]
    fn test_delete_rolls_back_in_place_on_save_failure() {
        let (mut store, backend) = create_test_store();
        for name in ["A", "B", "C"] {
            store.add(NewTicket::new(name, "issue")).unwrap();
        }
        let before = store.tickets().to_vec();

        backend.fail_next_save();
        assert!(store.delete(2).is_err());

        assert_eq!(store.tickets(), before.as_slice());
    }

    fn store_with_closed_ticket(status: TicketStatus, closed_on: NaiveDate) -> TicketStore {
        let clock = FixedClock::new(closed_on);
        let mut store =
            TicketStore::open(Box::new(MemoryBackend::new()), Box::new(clock)).unwrap();
        store.add(laptop()).unwrap();
        match status {
            TicketStatus::Repaired => store.mark_repaired(1).unwrap(),
            TicketStatus::Canceled => store.cancel_repair(1).unwrap(),
            TicketStatus::Pending => unreachable!(),
        };
        store
    }

    #[test]
    fn test_purge_removes_repaired_after_ten_days() {
        let mut store = store_with_closed_ticket(TicketStatus::Repaired, date(2024, 6, 1));

        let report = store.purge_old_repaired(date(2024, 6, 11)).unwrap();

        assert_eq!(report.count(), 1);
        assert_eq!(report.removed[0].id, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_keeps_repaired_nine_days_old() {
        let mut store = store_with_closed_ticket(TicketStatus::Repaired, date(2024, 6, 1));

        let report = store.purge_old_repaired(date(2024, 6, 10)).unwrap();

        assert!(report.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_never_removes_canceled() {
        let mut store = store_with_closed_ticket(TicketStatus::Canceled, date(2020, 1, 1));

        let report = store.purge_old_repaired(date(2024, 6, 11)).unwrap();

        assert!(report.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_without_removals_does_not_save() {
        let (mut store, backend) = create_test_store();
        store.add(laptop()).unwrap();
        let saves = backend.save_count();

        store.purge_old_repaired(date(2030, 1, 1)).unwrap();

        assert_eq!(backend.save_count(), saves);
    }

    #[test]
    fn test_purge_respects_retention_days() {
        let mut store = store_with_closed_ticket(TicketStatus::Repaired, date(2024, 6, 1))
            .with_retention_days(3);

        assert!(store.purge_old_repaired(date(2024, 6, 3)).unwrap().is_empty());
        assert_eq!(store.purge_old_repaired(date(2024, 6, 4)).unwrap().count(), 1);
    }

    #[test]
    fn test_purge_rolls_back_on_save_failure() {
        let backend = MemoryBackend::new();
        let clock = FixedClock::new(date(2024, 6, 1));
        let mut store =
            TicketStore::open(Box::new(backend.clone()), Box::new(clock.clone())).unwrap();
        store.add(NewTicket::new("A", "x")).unwrap();
        store.add(NewTicket::new("B", "y")).unwrap();
        store.mark_repaired(1).unwrap();
        let before = store.tickets().to_vec();

        backend.fail_next_save();
        let result = store.purge_old_repaired(date(2024, 7, 1));

        assert!(matches!(result, Err(TicketError::Storage(_))));
        assert_eq!(store.tickets(), before.as_slice());
    }

    #[test]
    fn test_purge_due_uses_clock() {
        let clock = FixedClock::new(date(2024, 6, 1));
        let mut store =
            TicketStore::open(Box::new(MemoryBackend::new()), Box::new(clock.clone())).unwrap();
        store.add(laptop()).unwrap();
        store.mark_repaired(1).unwrap();

        assert!(store.purge_due().unwrap().is_empty());

        clock.advance_days(10);
        assert_eq!(store.purge_due().unwrap().count(), 1);
    }

    #[test]
    fn test_open_propagates_read_failure() {
        let backend = MemoryBackend::new();
        backend.fail_loads();

        let result = TicketStore::open(Box::new(backend), Box::new(FixedClock::new(today())));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_surfaces_corrupt_data_warning() {
        let backend = MemoryBackend::new();
        backend.set_corrupt("expected value at line 1 column 1");

        let store =
            TicketStore::open(Box::new(backend), Box::new(FixedClock::new(today()))).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.load_warning(), Some("expected value at line 1 column 1"));
    }
}
