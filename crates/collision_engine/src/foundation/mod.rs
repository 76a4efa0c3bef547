//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the collision engine:
//! - Math types and rigid transforms
//! - Generation-checked handle collections and pools
//! - Time measurement for profiling
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
