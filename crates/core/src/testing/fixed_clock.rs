//! Settable clock for tests.

use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};

use crate::clock::Clock;

/// Clock that returns a date chosen by the test.
///
/// Clones share the same date, so a test can keep one handle and move the
/// other into a store.
#[derive(Debug, Clone)]
pub struct FixedClock {
    date: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Arc::new(Mutex::new(date)),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap() = date;
    }

    pub fn advance_days(&self, days: u64) {
        let mut date = self.date.lock().unwrap();
        *date = *date + Days::new(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap()
    }
}
