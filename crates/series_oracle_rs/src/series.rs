//! Series generators. Each call returns the wire series to push through
//! remote write together with the query results expected when reading them
//! back.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::convert::{float_histogram_to_proto, generate_test_sample_histogram, histogram_to_proto};
use crate::histogram::{
    generate_test_float_histogram, generate_test_gauge_float_histogram,
    generate_test_gauge_histogram, generate_test_histogram,
};
use crate::model::{
    Matrix, Metric, Sample, SampleHistogramPair, SamplePair, SampleStream, SampleValue, Vector,
};
use crate::prompb::{self, Exemplar, Label, TimeSeries, WriteRequest};
use crate::util::time_to_millis;
use crate::METRIC_NAME;

/// The four native histogram flavours: counter or gauge reset semantics,
/// crossed with integer or float bucket counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistogramKind {
    CounterInt,
    CounterFloat,
    GaugeInt,
    GaugeFloat,
}

impl HistogramKind {
    pub const ALL: [HistogramKind; 4] = [
        HistogramKind::CounterInt,
        HistogramKind::CounterFloat,
        HistogramKind::GaugeInt,
        HistogramKind::GaugeFloat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HistogramKind::CounterInt => "counter-integer",
            HistogramKind::CounterFloat => "counter-float",
            HistogramKind::GaugeInt => "gauge-integer",
            HistogramKind::GaugeFloat => "gauge-float",
        }
    }

    /// Encode the test histogram for seed `value` as a wire histogram.
    pub fn encode(self, ts_millis: i64, value: u32) -> prompb::Histogram {
        match self {
            HistogramKind::CounterInt => {
                histogram_to_proto(ts_millis, &generate_test_histogram(value))
            }
            HistogramKind::CounterFloat => {
                float_histogram_to_proto(ts_millis, &generate_test_float_histogram(value))
            }
            HistogramKind::GaugeInt => {
                histogram_to_proto(ts_millis, &generate_test_gauge_histogram(value))
            }
            HistogramKind::GaugeFloat => {
                float_histogram_to_proto(ts_millis, &generate_test_gauge_float_histogram(value))
            }
        }
    }
}

impl fmt::Display for HistogramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a generated series carries: plain float samples or one of the
/// native histogram flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Float,
    Histogram(HistogramKind),
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 5] = [
        SeriesKind::Float,
        SeriesKind::Histogram(HistogramKind::CounterInt),
        SeriesKind::Histogram(HistogramKind::CounterFloat),
        SeriesKind::Histogram(HistogramKind::GaugeInt),
        SeriesKind::Histogram(HistogramKind::GaugeFloat),
    ];

    /// Pick a kind by index, cycling through all kinds with period 5.
    /// Use it for a large enough number of series (say more than 100) to get
    /// a good mix.
    pub fn alternating(i: usize) -> SeriesKind {
        Self::ALL[i % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeriesKind::Float => "float",
            SeriesKind::Histogram(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generated series and the results expected from querying it.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedSeries {
    pub series: Vec<TimeSeries>,
    /// Expected instant query result at the series' timestamp.
    pub vector: Vector,
    /// Expected range query result over a range containing the timestamp.
    pub matrix: Matrix,
}

/// Many generated series and the instant query result expected for them.
/// `vector[i]` belongs to `series[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedBatch {
    pub series: Vec<TimeSeries>,
    pub vector: Vector,
}

impl GeneratedSeries {
    pub fn write_request(&self) -> WriteRequest {
        WriteRequest::new(self.series.clone())
    }
}

impl GeneratedBatch {
    pub fn write_request(&self) -> WriteRequest {
        WriteRequest::new(self.series.clone())
    }
}

/// Builds test series. The random source is owned by the generator, so
/// fixtures are reproducible for a seeded `R` and independent generators
/// can be used from parallel tests.
#[derive(Clone, Debug)]
pub struct SeriesGenerator<R> {
    rng: R,
    config: GeneratorConfig,
}

impl<R: Rng> SeriesGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self::with_config(rng, GeneratorConfig::default())
    }

    /// Draw the value for the next random series from `0..value_range`.
    /// Panics if `value_range` is zero; `GeneratorConfig::validate` rejects that.
    pub fn next_value(&mut self) -> u32 {
        self.rng.gen_range(0..self.config.value_range)
    }

    /// Generate one series of `kind` from a random value.
    pub fn generate(
        &mut self,
        kind: SeriesKind,
        name: &str,
        ts: DateTime<Utc>,
        additional_labels: &[Label],
    ) -> GeneratedSeries {
        let value = self.next_value();
        self.generate_with_value(kind, name, ts, additional_labels, value)
    }
}

impl<R> SeriesGenerator<R> {
    pub fn with_config(rng: R, config: GeneratorConfig) -> Self {
        SeriesGenerator { rng, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn exemplar(&self, value: f64, ts_millis: i64) -> Exemplar {
        Exemplar {
            labels: self.config.exemplar_labels(),
            value,
            timestamp: ts_millis,
        }
    }

    /// Generate one series of `kind` from an explicit `value`.
    ///
    /// The wire series gets `__name__` followed by `additional_labels` in
    /// order, one sample at `ts` and one exemplar carrying `value`. The
    /// expected entries are built separately from `name` and
    /// `additional_labels`, not from the wire series.
    pub fn generate_with_value(
        &self,
        kind: SeriesKind,
        name: &str,
        ts: DateTime<Utc>,
        additional_labels: &[Label],
        value: u32,
    ) -> GeneratedSeries {
        debug_assert!(!name.is_empty(), "metric name must not be empty");

        let ts_millis = time_to_millis(ts);

        let mut labels = Vec::with_capacity(additional_labels.len() + 1);
        labels.push(Label::new(METRIC_NAME, name));
        labels.extend_from_slice(additional_labels);

        let mut series = TimeSeries {
            labels,
            exemplars: vec![self.exemplar(f64::from(value), ts_millis)],
            ..Default::default()
        };

        let mut metric = Metric::new();
        metric.insert(METRIC_NAME, name);
        for lbl in additional_labels {
            metric.insert(lbl.name.as_str(), lbl.value.as_str());
        }

        let (sample_value, stream) = match kind {
            SeriesKind::Float => {
                let v = f64::from(value);
                series.samples.push(prompb::Sample {
                    value: v,
                    timestamp: ts_millis,
                });
                (
                    SampleValue::Scalar(v),
                    SampleStream {
                        metric: metric.clone(),
                        values: vec![SamplePair {
                            timestamp: ts_millis,
                            value: v,
                        }],
                        histograms: vec![],
                    },
                )
            }
            SeriesKind::Histogram(hkind) => {
                series.histograms.push(hkind.encode(ts_millis, value));
                (
                    SampleValue::Histogram(generate_test_sample_histogram(value)),
                    SampleStream {
                        metric: metric.clone(),
                        values: vec![],
                        histograms: vec![SampleHistogramPair {
                            timestamp: ts_millis,
                            histogram: generate_test_sample_histogram(value),
                        }],
                    },
                )
            }
        };

        debug!(%kind, metric = name, value, ts_millis, "generated series");

        GeneratedSeries {
            series: vec![series],
            vector: vec![Sample {
                metric,
                timestamp: ts_millis,
                value: sample_value,
            }],
            matrix: vec![stream],
        }
    }

    /// Generate `n_series` counter histogram series, the `i`-th built from
    /// seed `i`. Only the first `n_exemplars` series get an exemplar.
    ///
    /// `name` and `additional_labels` are called once per series. The
    /// expected labels are read back from the built series rather than
    /// recomputed, so they always match the wire labels.
    pub fn generate_n_histogram_series(
        &self,
        n_series: u32,
        n_exemplars: u32,
        mut name: impl FnMut() -> String,
        ts: DateTime<Utc>,
        mut additional_labels: Option<&mut dyn FnMut() -> Vec<Label>>,
    ) -> GeneratedBatch {
        let ts_millis = time_to_millis(ts);

        let series: Vec<TimeSeries> = (0..n_series)
            .map(|i| {
                let mut labels = vec![Label::new(METRIC_NAME, name())];
                if let Some(f) = additional_labels.as_deref_mut() {
                    labels.extend(f());
                }

                let exemplars = if i < n_exemplars {
                    vec![self.exemplar(f64::from(i), ts_millis)]
                } else {
                    vec![]
                };
                trace!(i, labels = labels.len(), "built histogram series");

                TimeSeries {
                    labels,
                    samples: vec![],
                    exemplars,
                    histograms: vec![histogram_to_proto(ts_millis, &generate_test_histogram(i))],
                }
            })
            .collect();

        let vector = series
            .iter()
            .zip(0..n_series)
            .map(|(s, i)| Sample {
                metric: Metric::from(s.labels.as_slice()),
                timestamp: ts_millis,
                value: SampleValue::Histogram(generate_test_sample_histogram(i)),
            })
            .collect();

        debug!(n_series, n_exemplars, ts_millis, "generated histogram series batch");

        GeneratedBatch { series, vector }
    }

    /// Float sample counterpart of [`Self::generate_n_histogram_series`]:
    /// series `i` holds a single sample of value `i`. The expected value is
    /// read back from the built sample.
    pub fn generate_n_float_series(
        &self,
        n_series: u32,
        n_exemplars: u32,
        mut name: impl FnMut() -> String,
        ts: DateTime<Utc>,
        mut additional_labels: Option<&mut dyn FnMut() -> Vec<Label>>,
    ) -> GeneratedBatch {
        let ts_millis = time_to_millis(ts);

        let series: Vec<TimeSeries> = (0..n_series)
            .map(|i| {
                let mut labels = vec![Label::new(METRIC_NAME, name())];
                if let Some(f) = additional_labels.as_deref_mut() {
                    labels.extend(f());
                }

                let value = f64::from(i);
                let exemplars = if i < n_exemplars {
                    vec![self.exemplar(value, ts_millis)]
                } else {
                    vec![]
                };

                TimeSeries {
                    labels,
                    samples: vec![prompb::Sample {
                        value,
                        timestamp: ts_millis,
                    }],
                    exemplars,
                    histograms: vec![],
                }
            })
            .collect();

        let vector = series
            .iter()
            .map(|s| Sample {
                metric: Metric::from(s.labels.as_slice()),
                timestamp: ts_millis,
                value: SampleValue::Scalar(s.samples[0].value),
            })
            .collect();

        debug!(n_series, n_exemplars, ts_millis, "generated float series batch");

        GeneratedBatch { series, vector }
    }
}
