//! Configuration and shared request/response models

pub mod config;
pub mod models;
