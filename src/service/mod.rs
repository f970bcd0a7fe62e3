//! Request validation ahead of engine writes.

mod validation;
pub use validation::RequestValidator;
pub(crate) use validation::is_time_or_interval;
