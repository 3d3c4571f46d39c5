//! Enrollment records and lesson progress tracking.

pub mod progress;
pub mod types;

pub use progress::{LessonCompletion, ProgressLocks};
pub use types::{Enrollment, EnrollmentStatus, EnrollmentType, InvalidRating};
