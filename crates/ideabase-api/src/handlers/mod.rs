//! HTTP handlers, grouped by resource.

pub mod attachments;
pub mod auth;
pub mod notes;
pub mod system;
pub mod tags;
pub mod uploads;
