//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `airwave` application.
//!
//! This module centralizes the error taxonomy and logging setup to promote
//! code consistency and reduce duplication.

pub mod error;
pub mod logging;
