//! Service layer

mod tracker;

pub use tracker::{DomainPatch, RetentionSummary, TagPatch, TimeSlotPatch, TrackerService};
