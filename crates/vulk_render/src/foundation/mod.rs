//! Foundation utilities shared across the renderer

pub mod logging;
pub mod math;
