//! Application core: pure kiosk logic, zero I/O.
//!
//! The screen state machine lives in [`service`]; everything it talks to
//! goes through the traits in [`ports`], keeping this layer fully testable
//! without a coin validator, a QR reader or a display attached.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
