//! Hardware-facing drivers.  Everything here is generic over the
//! `embedded-hal` traits and runs on the host in tests.

pub mod button;
pub mod code_reader;
pub mod coin;
pub mod sampler;
