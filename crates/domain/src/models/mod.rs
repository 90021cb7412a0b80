//! Domain models.

pub mod badge;
pub mod presence;
pub mod sample;

pub use badge::{BadgeResponse, BadgeStatus, LastLocation, SurveyorBadge, UpdateBadgeRequest};
pub use presence::{PresenceSnapshotResponse, PresenceView};
pub use sample::{
    LocationSample, RecordSampleRequest, RecordSampleResponse, SampleHistoryItem,
    SampleHistoryQuery, SampleHistoryResponse,
};
