use std::sync::Arc;

use crate::db::ScheduleStore;
use crate::services::{BookingLocks, ClassService, ConflictDetector, EnrollmentGuard};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub locks: Arc<BookingLocks>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            locks: Arc::new(BookingLocks::new()),
        }
    }

    pub fn classes(&self) -> ClassService {
        ClassService::new(self.store.clone(), self.locks.clone())
    }

    pub fn enrollments(&self) -> EnrollmentGuard {
        EnrollmentGuard::new(self.store.clone(), self.locks.clone())
    }

    pub fn conflicts(&self) -> ConflictDetector {
        ConflictDetector::new(self.store.clone())
    }
}
