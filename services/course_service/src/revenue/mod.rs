//! Revenue split and analytics rollups. Every figure is derived from completed payments, never from
//! course price times enrollment count.

pub mod analytics;
pub mod split;

pub use analytics::{
    instructor_revenue, platform_summary, CategoryBreakdown, CourseRating, CourseRevenue, InstructorRevenue,
    PlatformSummary,
};
pub use split::RevenueSplit;
