//! Configuration loading and logging bootstrap.

pub mod config;
pub mod logger;
