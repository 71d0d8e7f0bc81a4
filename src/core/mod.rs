//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Table, reader options and source descriptors
//! - Rendering functions for different output formats
//! - Path and cache-key helpers
//! - Common utilities

pub mod model;
pub mod paths;
pub mod render;
pub mod util;
