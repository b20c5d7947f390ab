//! Change-o-matic kiosk controller library.
//!
//! Exposes the kiosk logic, drivers and runtime for the binary and for
//! integration testing.  Everything except `adapters::linux` (feature
//! `rpi`) builds and tests on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod hub;
pub mod runtime;
pub mod scan;
pub mod server;
pub mod submit;
