use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{ScheduleStore, StoreError};
use crate::models::{Class, ClassRecord, Schedule, TimeInterval, TimeSlot};

/// An existing session in the same room that overlaps the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConflict {
    pub class_id: String,
    pub class_title: String,
    pub teacher_name: String,
    #[serde(flatten)]
    pub booked: TimeInterval,
}

impl RoomConflict {
    pub fn describe(&self) -> String {
        format!(
            "Room {} is already booked on {} by '{}' (teacher: {})",
            self.booked.room, self.booked.slot, self.class_title, self.teacher_name
        )
    }
}

/// An existing session of the same teacher that overlaps the candidate, in any room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherConflict {
    pub class_id: String,
    pub class_title: String,
    #[serde(flatten)]
    pub booked: TimeInterval,
}

impl TeacherConflict {
    pub fn describe(&self) -> String {
        format!(
            "Teacher already teaches '{}' on {} in room {}",
            self.class_title, self.booked.slot, self.booked.room
        )
    }
}

/// A stored class left out of the scan because its schedule could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedClass {
    pub class_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub room_conflicts: Vec<RoomConflict>,
    pub teacher_conflicts: Vec<TeacherConflict>,
    pub skipped_classes: Vec<SkippedClass>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.room_conflicts.is_empty() || !self.teacher_conflicts.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.room_conflicts
            .iter()
            .map(RoomConflict::describe)
            .chain(self.teacher_conflicts.iter().map(TeacherConflict::describe))
            .collect()
    }

    fn skip(&mut self, class_id: &str, reason: String) {
        if !self.skipped_classes.iter().any(|s| s.class_id == class_id) {
            self.skipped_classes.push(SkippedClass {
                class_id: class_id.to_string(),
                reason,
            });
        }
    }
}

/// Rooms: every session on the candidate's day in the same room that overlaps.
pub fn room_conflicts(classes: &[Class], candidate: &TimeInterval) -> Vec<RoomConflict> {
    classes
        .iter()
        .flat_map(move |class| {
            class
                .schedule
                .for_day(candidate.day())
                .into_iter()
                .filter(move |booked| booked.same_room(candidate) && booked.overlaps(candidate))
                .map(move |booked| RoomConflict {
                    class_id: class.id.clone(),
                    class_title: class.title.clone(),
                    teacher_name: class.teacher_display_name().to_string(),
                    booked,
                })
        })
        .collect()
}

/// Teachers: every session on the candidate's day that overlaps, room ignored.
pub fn teacher_conflicts(classes: &[Class], candidate: &TimeSlot) -> Vec<TeacherConflict> {
    classes
        .iter()
        .flat_map(move |class| {
            class
                .schedule
                .for_day(candidate.day)
                .into_iter()
                .filter(move |booked| booked.slot.overlaps(candidate))
                .map(move |booked| TeacherConflict {
                    class_id: class.id.clone(),
                    class_title: class.title.clone(),
                    booked,
                })
        })
        .collect()
}

/// Scans stored class schedules for room and teacher collisions.
///
/// Classes whose stored schedule fails to parse are skipped and listed in
/// [`ConflictReport::skipped_classes`] instead of failing the whole check.
pub struct ConflictDetector {
    store: Arc<dyn ScheduleStore>,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Room and (when a teacher is given) teacher conflicts for one candidate.
    pub async fn find_conflicts(
        &self,
        candidate: &TimeInterval,
        teacher_id: Option<&str>,
        exclude_class_id: Option<&str>,
    ) -> Result<ConflictReport, StoreError> {
        self.check_intervals(std::slice::from_ref(candidate), teacher_id, exclude_class_id)
            .await
    }

    /// Union of the conflicts of every session in `schedule`.
    pub async fn check_schedule(
        &self,
        schedule: &Schedule,
        teacher_id: Option<&str>,
        exclude_class_id: Option<&str>,
    ) -> Result<ConflictReport, StoreError> {
        let candidates: Vec<TimeInterval> = schedule.intervals().collect();
        self.check_intervals(&candidates, teacher_id, exclude_class_id)
            .await
    }

    pub async fn check_room(
        &self,
        candidate: &TimeInterval,
        exclude_class_id: Option<&str>,
    ) -> Result<ConflictReport, StoreError> {
        self.check_intervals(std::slice::from_ref(candidate), None, exclude_class_id)
            .await
    }

    pub async fn check_teacher(
        &self,
        candidate: &TimeSlot,
        teacher_id: &str,
        exclude_class_id: Option<&str>,
    ) -> Result<ConflictReport, StoreError> {
        let mut report = ConflictReport::default();
        let taught = load(
            self.store.find_classes_by_teacher(teacher_id).await?,
            exclude_class_id,
            &mut report,
        );
        report.teacher_conflicts = teacher_conflicts(&taught, candidate);
        Ok(report)
    }

    async fn check_intervals(
        &self,
        candidates: &[TimeInterval],
        teacher_id: Option<&str>,
        exclude_class_id: Option<&str>,
    ) -> Result<ConflictReport, StoreError> {
        let mut report = ConflictReport::default();

        let all = load(self.store.find_all_classes().await?, exclude_class_id, &mut report);
        for candidate in candidates {
            report.room_conflicts.extend(room_conflicts(&all, candidate));
        }

        if let Some(teacher_id) = teacher_id {
            let taught = load(
                self.store.find_classes_by_teacher(teacher_id).await?,
                exclude_class_id,
                &mut report,
            );
            for candidate in candidates {
                report
                    .teacher_conflicts
                    .extend(teacher_conflicts(&taught, &candidate.slot));
            }
        }

        debug!(
            candidates = candidates.len(),
            room = report.room_conflicts.len(),
            teacher = report.teacher_conflicts.len(),
            skipped = report.skipped_classes.len(),
            "conflict scan finished"
        );
        Ok(report)
    }
}

fn load(records: Vec<ClassRecord>, exclude_class_id: Option<&str>, report: &mut ConflictReport) -> Vec<Class> {
    records
        .into_iter()
        .filter(|record| Some(record.id.as_str()) != exclude_class_id)
        .filter_map(|record| {
            let id = record.id.clone();
            match record.into_class() {
                Ok(class) => Some(class),
                Err(e) => {
                    warn!(class_id = %id, error = %e, "skipping class with unreadable schedule");
                    report.skip(&id, e.to_string());
                    None
                }
            }
        })
        .collect()
}
