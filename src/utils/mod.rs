//! Utility functions

pub mod time;

pub use time::{elapsed_millis, now_millis};
