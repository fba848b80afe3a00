//! Utilities shared between the Tamariba binaries and libraries.

pub mod logger;
pub mod time;
