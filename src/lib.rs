//! Meos – a spatiotemporal data engine.
//!
//! The crate models values that change over time. Its building blocks are
//! ordered collections of base values and time:
//! * A [`set::Set`] is an ordered, duplicate-free collection of base values.
//! * A [`span::Span`] is an interval of an ordered base type, and a
//!   [`spanset::SpanSet`] a normalized union of disjoint spans.
//! * A [`tbox::TBox`] bounds a temporal number in value and time, an
//!   [`stbox::STBox`] bounds a moving point in space and time.
//! * A [`temporal::Temporal`] is a function from time to a base value,
//!   held as an instant, a sequence with discrete, step or linear
//!   interpolation, or a set of time-disjoint sequences.
//!
//! ## Modules
//! * [`catalog`] – Type identifiers and their relationships.
//! * [`datatype`] – The [`datatype::DataType`] trait implemented by all base types.
//! * [`temporal`] – Temporal values, lifting, restriction, comparison and analytics.
//! * [`agg`] – Temporal and extent aggregates, including windowed aggregates.
//! * [`spatial`] – Points, temporal points and network-constrained points.
//! * [`rtree`] – An in-memory R-tree over spans and boxes.
//! * [`io`] – Canonical text, WKB, hex-WKB and MF-JSON representations.
//! * [`session`] – Process-wide settings such as the time zone and float digits.
//!
//! ## Quick Start
//! ```
//! use meos::span::IntSpan;
//! use meos::temporal::TFloat;
//! use meos::time::parse_timestamp;
//!
//! let span = IntSpan::parse("[1, 10]").expect("valid span");
//! assert_eq!(span.to_string(), "[1, 11)");
//!
//! let temp = TFloat::parse("[1@2020-01-01, 3@2020-01-03]").expect("valid temporal float");
//! let t = parse_timestamp("2020-01-02").expect("valid timestamp");
//! assert_eq!(temp.value_at_timestamp(&t, false), Some(2.0));
//! ```
//!
//! ## Session
//! Output of timestamps and floats depends on the session, which is set up
//! from [`config::Settings`] by [`initialize`] and restored to its defaults
//! by [`finalize`].

pub mod agg;
pub mod bins;
pub mod catalog;
pub mod config;
pub mod datatype;
pub mod error;
pub mod io;
pub mod rtree;
pub mod session;
pub mod set;
pub mod span;
pub mod spanset;
pub mod spatial;
pub mod stbox;
pub mod tbox;
pub mod temporal;
pub mod time;

pub use error::{MeosError, Result};
pub use session::{finalize, initialize, initialize_from};
