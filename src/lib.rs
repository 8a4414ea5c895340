//! Trilha core - battery accounting and mission progression
//!
//! Client core of the study-trail platform: the server-authoritative
//! battery (energy) resource that gates free-tier actions, and the mission
//! state machine that drives one learning attempt from reading content
//! through questions to a pass/fail verdict with a massification retry.

pub mod battery;
pub mod core;
pub mod entitlement;
pub mod mission;
