//! Foundation module - Core utilities shared by the rest of the crate
//!
//! Currently this only hosts logging setup; the crate itself logs through the
//! `log` facade and leaves logger installation to binaries.

pub mod logging;
