//! Mathematical utilities

pub mod morton;
