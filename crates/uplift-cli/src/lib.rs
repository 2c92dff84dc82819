//! `Uplift` CLI Library
//!
//! Coordinator side of an elevated session: allocates the named endpoints,
//! launches the agent through the elevation front-end, relays the caller's
//! standard streams, and propagates the final exit status.

pub mod coordinator;
pub mod elevate;
