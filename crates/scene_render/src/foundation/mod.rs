//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the pipeline:
//! - Math types, projection helpers and transforms
//! - Logging utilities

pub mod math;
pub mod logging;
