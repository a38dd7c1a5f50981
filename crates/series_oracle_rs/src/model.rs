//! Query-API result model: the vector and matrix entries a Prometheus
//! compatible query endpoint returns, with the same JSON shape.

use hashbrown::HashMap;
use itertools::Itertools;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OracleError;
use crate::prompb::Label;
use crate::util::{api_seconds_to_millis, millis_to_api_seconds};
use crate::{Result, METRIC_NAME};

/// Label set of a query result. Unlike wire labels, order carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metric(HashMap<String, String>);

impl Metric {
    pub fn new() -> Self {
        Metric(HashMap::new())
    }

    /// Set a label, returning the previous value if the name was taken.
    pub fn insert<N: Into<String>, V: Into<String>>(
        &mut self,
        name: N,
        value: V,
    ) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(METRIC_NAME)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<&[Label]> for Metric {
    /// Later labels win when a name repeats, as they do in a query result.
    fn from(labels: &[Label]) -> Metric {
        labels
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for Metric {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Metric(iter.into_iter().collect())
    }
}

impl fmt::Display for Metric {
    /// `name{a="1", b="2"}` with labels sorted by name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self
            .iter()
            .filter(|(k, _)| *k != METRIC_NAME)
            .sorted()
            .map(|(k, v)| format!("{k}={v:?}"))
            .join(", ");

        match (self.name(), labels.is_empty()) {
            (Some(name), true) => write!(f, "{name}"),
            (Some(name), false) => write!(f, "{name}{{{labels}}}"),
            (None, _) => write!(f, "{{{labels}}}"),
        }
    }
}

/// Format a float the way the query API does: shortest representation, no
/// exponent, `+Inf`/`-Inf`/`NaN` for the special values.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "+Inf" } else { "-Inf" };
        s.to_string()
    } else {
        v.to_string()
    }
}

fn parse_float(s: &str) -> std::result::Result<f64, String> {
    match s {
        "NaN" => Ok(f64::NAN),
        "+Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => s
            .parse::<f64>()
            .map_err(|e| format!("invalid float string {s:?}: {e}")),
    }
}

/// A float carried as a JSON string.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FloatString(f64);

impl Serialize for FloatString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_float(self.0))
    }
}

impl<'de> Deserialize<'de> for FloatString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_float(&s).map(FloatString).map_err(de::Error::custom)
    }
}

mod float_string {
    use super::FloatString;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        FloatString(*v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        FloatString::deserialize(deserializer).map(|f| f.0)
    }
}

/// One bucket of a [`SampleHistogram`].
///
/// `boundaries` follows the query API: 0 left open, 1 right open, 2 open on
/// both sides, 3 closed on both sides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "BucketRepr", try_from = "BucketRepr")]
pub struct HistogramBucket {
    pub boundaries: i32,
    pub lower: f64,
    pub upper: f64,
    pub count: f64,
}

#[derive(Serialize, Deserialize)]
struct BucketRepr(i32, FloatString, FloatString, FloatString);

impl From<HistogramBucket> for BucketRepr {
    fn from(b: HistogramBucket) -> BucketRepr {
        BucketRepr(
            b.boundaries,
            FloatString(b.lower),
            FloatString(b.upper),
            FloatString(b.count),
        )
    }
}

impl TryFrom<BucketRepr> for HistogramBucket {
    type Error = String;

    fn try_from(r: BucketRepr) -> std::result::Result<Self, String> {
        if !(0..=3).contains(&r.0) {
            return Err(format!("invalid bucket boundaries {}", r.0));
        }
        Ok(HistogramBucket {
            boundaries: r.0,
            lower: r.1 .0,
            upper: r.2 .0,
            count: r.3 .0,
        })
    }
}

/// A native histogram as returned by the query API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleHistogram {
    #[serde(with = "float_string")]
    pub count: f64,
    #[serde(with = "float_string")]
    pub sum: f64,
    #[serde(default)]
    pub buckets: Vec<HistogramBucket>,
}

/// Value of an instant-vector entry.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleValue {
    Scalar(f64),
    Histogram(SampleHistogram),
}

/// One element of an instant-query vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "SampleRepr", try_from = "SampleRepr")]
pub struct Sample {
    pub metric: Metric,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub value: SampleValue,
}

#[derive(Serialize, Deserialize)]
struct SampleRepr {
    metric: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<(f64, FloatString)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    histogram: Option<(f64, SampleHistogram)>,
}

impl From<Sample> for SampleRepr {
    fn from(s: Sample) -> SampleRepr {
        let ts = millis_to_api_seconds(s.timestamp);
        match s.value {
            SampleValue::Scalar(v) => SampleRepr {
                metric: s.metric,
                value: Some((ts, FloatString(v))),
                histogram: None,
            },
            SampleValue::Histogram(h) => SampleRepr {
                metric: s.metric,
                value: None,
                histogram: Some((ts, h)),
            },
        }
    }
}

impl TryFrom<SampleRepr> for Sample {
    type Error = String;

    fn try_from(r: SampleRepr) -> std::result::Result<Self, String> {
        let (ts, value) = match (r.value, r.histogram) {
            (Some((ts, v)), None) => (ts, SampleValue::Scalar(v.0)),
            (None, Some((ts, h))) => (ts, SampleValue::Histogram(h)),
            (Some(_), Some(_)) => return Err("sample has both value and histogram".to_string()),
            (None, None) => return Err("sample has neither value nor histogram".to_string()),
        };
        Ok(Sample {
            metric: r.metric,
            timestamp: api_seconds_to_millis(ts),
            value,
        })
    }
}

/// A float point of a range-query series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "PairRepr", from = "PairRepr")]
pub struct SamplePair {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Serialize, Deserialize)]
struct PairRepr(f64, FloatString);

impl From<SamplePair> for PairRepr {
    fn from(p: SamplePair) -> PairRepr {
        PairRepr(millis_to_api_seconds(p.timestamp), FloatString(p.value))
    }
}

impl From<PairRepr> for SamplePair {
    fn from(r: PairRepr) -> SamplePair {
        SamplePair {
            timestamp: api_seconds_to_millis(r.0),
            value: r.1 .0,
        }
    }
}

/// A histogram point of a range-query series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "HistogramPairRepr", from = "HistogramPairRepr")]
pub struct SampleHistogramPair {
    pub timestamp: i64,
    pub histogram: SampleHistogram,
}

#[derive(Serialize, Deserialize)]
struct HistogramPairRepr(f64, SampleHistogram);

impl From<SampleHistogramPair> for HistogramPairRepr {
    fn from(p: SampleHistogramPair) -> HistogramPairRepr {
        HistogramPairRepr(millis_to_api_seconds(p.timestamp), p.histogram)
    }
}

impl From<HistogramPairRepr> for SampleHistogramPair {
    fn from(r: HistogramPairRepr) -> SampleHistogramPair {
        SampleHistogramPair {
            timestamp: api_seconds_to_millis(r.0),
            histogram: r.1,
        }
    }
}

/// One element of a range-query matrix.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub metric: Metric,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<SamplePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub histograms: Vec<SampleHistogramPair>,
}

pub type Vector = Vec<Sample>;
pub type Matrix = Vec<SampleStream>;

/// Parse the `result` array of an instant query response.
pub fn vector_from_json(json: &str) -> Result<Vector> {
    serde_json::from_str(json).map_err(|e| OracleError::json("vector", e))
}

/// Parse the `result` array of a range query response.
pub fn matrix_from_json(json: &str) -> Result<Matrix> {
    serde_json::from_str(json).map_err(|e| OracleError::json("matrix", e))
}

pub fn vector_to_json(vector: &[Sample]) -> Result<String> {
    serde_json::to_string(vector).map_err(|e| OracleError::json("vector", e))
}

pub fn matrix_to_json(matrix: &[SampleStream]) -> Result<String> {
    serde_json::to_string(matrix).map_err(|e| OracleError::json("matrix", e))
}
