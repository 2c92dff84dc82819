//! `Uplift` Agent Library
//!
//! Elevated side of a session: attaches to the endpoints the coordinator
//! already listens on, runs the target with captured standard streams, and
//! relays them until each reaches end-of-data.

pub mod runner;
