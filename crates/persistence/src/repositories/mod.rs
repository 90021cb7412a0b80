//! Repository implementations.

pub mod badge;
pub mod location_sample;

pub use badge::BadgeRepository;
pub use location_sample::LocationSampleRepository;
