//! Resource quantity parsing and normalization.
//!
//! Cluster APIs encode CPU and memory amounts as suffixed strings (`250m`,
//! `1.5Gi`, `128974848`). This crate turns them into canonical numbers:
//! cores for CPU and bytes for memory.
//!
//! Parsing is total. Missing, malformed, negative or absurd input never
//! produces an error value that callers have to propagate; it yields a
//! defined [`Quantity`] with a zero (or clamped) value and the recorded
//! [`QuantityAnomaly`], so one bad field cannot abort a larger aggregation.
//!
//! # Example
//!
//! ```rust
//! use pulse_quantity::{parse_cpu, parse_memory, usage_percent};
//!
//! let request = parse_cpu("250m");
//! assert!((request.value() - 0.25).abs() < f64::EPSILON);
//!
//! let memory = parse_memory("1Gi");
//! assert_eq!(memory.value(), 1024.0 * 1024.0 * 1024.0);
//!
//! let broken = parse_memory("lots");
//! assert!(broken.is_anomalous());
//! assert_eq!(broken.value(), 0.0);
//!
//! assert_eq!(usage_percent(0.0, 0.0), 0.0);
//! ```

#![doc(html_root_url = "https://docs.rs/pulse-quantity/0.1.0")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod quantity;
pub mod validate;

pub use error::QuantityAnomaly;
pub use format::{format_cpu, format_memory};
pub use quantity::{
    Quantity, Resource, SANITY_CEILING, Unit, parse, parse_cpu, parse_memory, usage_percent,
};
pub use validate::{Advisory, LimitField, validate_limits, validate_requirements};
