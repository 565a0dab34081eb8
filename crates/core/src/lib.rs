//! Domain logic for the DAPS administration console.
//!
//! Everything here is synchronous and performs no IO:
//!
//! - [`schema`]: static descriptions of every configurable module.
//! - [`form`]: field rendering and form assembly over a module config.
//! - [`validation`]: client-side pre-save checks.
//! - [`payload`]: the `POST /api/config` body for each module kind.
//! - [`save`] and [`dirty`]: the save state machine and unsaved-edit guard.
//! - [`state`]: the explicit application state tying them together.

pub mod dirty;
pub mod error;
pub mod form;
pub mod notifications;
pub mod payload;
pub mod save;
pub mod schedule;
pub mod schema;
pub mod state;
pub mod validation;
pub mod version;

pub use error::CoreError;
pub use state::AppState;
