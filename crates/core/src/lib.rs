//! # Calbook Core
//!
//! Domain types and decision logic for the calendar booking service.
//! This crate has no I/O: it defines the data model, the error taxonomy,
//! the conflict engine that decides whether slots can be created, booked
//! or cancelled, and the typed events broadcast to connected clients.

pub mod conflict;
pub mod errors;
pub mod models;
