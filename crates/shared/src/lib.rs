//! Shared utilities and common types for the Field Tracker backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic (coordinates, timestamps, surveyor identifiers)
//! - Relative time formatting for "last seen" rendering

pub mod relative_time;
pub mod validation;
