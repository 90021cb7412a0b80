//! Database entity definitions.

pub mod badge;
pub mod location_sample;

pub use badge::SurveyorBadgeEntity;
pub use location_sample::LocationSampleEntity;
