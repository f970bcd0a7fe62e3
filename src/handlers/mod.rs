//! HTTP handlers for the SensorThings resource tree.

pub mod entity;
pub use entity::*;
