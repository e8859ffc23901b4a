//! Shared types for SessionKeeper: configuration, errors, structured trace
//! events and the user-directory capability.

pub mod config;
pub mod directory;
pub mod error;
pub mod trace;
