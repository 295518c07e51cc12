//! The `aqi` module converts raw pollutant concentrations into an Air
//! Quality Index.
//!
//! The conversion is a pure, table-driven breakpoint interpolation: each
//! pollutant has a fixed six-band concentration table mapped onto six AQI
//! bands; the input is located in its band and linearly interpolated. The
//! overall index is the maximum sub-index (the worst pollutant dominates
//! health risk), and the dominant pollutant is the one achieving that
//! maximum, with ties broken by a fixed priority order so output is
//! deterministic.
//!
//! Everything in here is CPU-only and total over finite non-negative
//! input; validation happens at the ingestion boundary, not here.

pub mod breakpoints;
pub mod engine;

pub use engine::{AqiResult, Category, Concentrations, Pollutant, compute_aqi};
