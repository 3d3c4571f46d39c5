use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::types::{Enrollment, EnrollmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonCompletion {
    /// The lesson was counted towards progress.
    Recorded,
    /// The lesson had been completed before; only time spent and access time were updated.
    AlreadyCompleted,
}

/// Percentage of completed lessons, rounded half up. Only a fully completed course reaches 100.
pub fn progress_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    if completed >= total {
        return 100;
    }

    let rounded = (completed as u64 * 100 + total as u64 / 2) / total as u64;
    rounded.min(99) as u8
}

impl Enrollment {
    /// Records a completed lesson. `total_lessons` is the current size of the course curriculum.
    pub fn complete_lesson(
        &mut self,
        lesson_id: Uuid,
        time_spent_seconds: u64,
        total_lessons: u32,
        now: DateTime<Utc>,
    ) -> LessonCompletion {
        self.last_accessed_at = now;
        self.time_spent_seconds = self.time_spent_seconds.saturating_add(time_spent_seconds);
        self.total_lessons = total_lessons;

        if self.completed_lesson_ids.contains(&lesson_id) {
            return LessonCompletion::AlreadyCompleted;
        }

        self.completed_lesson_ids.push(lesson_id);
        self.completed_lessons += 1;
        self.progress = progress_percentage(self.completed_lessons, self.total_lessons);

        if self.progress == 100 {
            self.status = EnrollmentStatus::Completed;
            self.completed_at.get_or_insert(now);
        } else if self.status == EnrollmentStatus::NotStarted {
            self.status = EnrollmentStatus::InProgress;
        }

        LessonCompletion::Recorded
    }

    /// Attaches a certificate reference to a completed enrollment, once.
    pub fn issue_certificate(&mut self, now: DateTime<Utc>) -> Option<&str> {
        if !self.is_completed() {
            return None;
        }

        if self.certificate_id.is_none() {
            let prefix = self.enrollment_id.simple().to_string()[..8].to_uppercase();
            self.certificate_id = Some(format!("CERT-{}-{}", prefix, now.format("%Y%m%d")));
        }

        self.certificate_id.as_deref()
    }
}

/// Per-enrollment FIFO locks serializing progress updates within the process.
#[derive(Debug, Default)]
pub struct ProgressLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProgressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock of `enrollment_id`. Waiters are served in the order they arrived.
    pub async fn lock(&self, enrollment_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(enrollment_id).or_default().clone()
        };

        lock.lock_owned().await
    }
}
