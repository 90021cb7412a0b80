//! Persistence layer for the Field Tracker backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations for the badge registry and location store

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
