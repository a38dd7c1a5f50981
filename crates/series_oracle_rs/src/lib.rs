//! Test oracle for a Prometheus remote-write compatible metrics system.
//!
//! Generators build series in the remote-write wire format, float samples or
//! native histograms in four flavours, together with the instant vector and
//! range matrix a query for those series is expected to return. The expected
//! results are computed independently of the wire encoding so an integration
//! test can compare what it reads back against them.

pub mod config;
pub mod convert;
pub mod error;
pub mod histogram;
pub mod model;
pub mod prompb;
pub mod series;
pub mod util;

#[cfg(test)]
mod testhelper;

pub use config::GeneratorConfig;
pub use error::OracleError;
pub use series::{GeneratedBatch, GeneratedSeries, HistogramKind, SeriesGenerator, SeriesKind};

type Result<T> = std::result::Result<T, crate::error::OracleError>;

/// Reserved label holding the metric name.
pub const METRIC_NAME: &str = "__name__";
