//! # Tracking Module
//!
//! Session control and scheduling.
//!
//! This module handles:
//! - Starting and stopping a single tracking session
//! - Session tokens that invalidate ticks from superseded sessions
//! - The periodic scheduler driving sampling and syncing at independent cadences

pub mod controller;
pub mod session;

pub use controller::{TickOutcome, TrackingController};
pub use session::{Countdowns, Due, Schedule, SessionToken};
