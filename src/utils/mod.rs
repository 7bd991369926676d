//! Small text and JSON helpers shared by the report generators

pub mod format;
pub mod json_extract;
pub mod lenient;
