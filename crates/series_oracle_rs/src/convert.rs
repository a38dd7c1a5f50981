//! Conversions between the in-memory histograms, the remote-write wire
//! histogram and the query-API sample histogram.
//!
//! The write path (`*_to_proto`) is what a client sends, the read path
//! (`to_sample_histogram`) is what the query API returns. `from_proto`
//! decodes a wire histogram again so the two can be compared.

use smallvec::SmallVec;

use crate::error::OracleError;
use crate::histogram::{
    check_span_indices, deltas_to_counts, spans_len, Bucket, CounterResetHint, FloatHistogram,
    Histogram, Span, Spans, SCHEMA_MAX, SCHEMA_MIN,
};
use crate::model::{HistogramBucket, SampleHistogram};
use crate::prompb;
use crate::prompb::histogram::{Count, ResetHint, ZeroCount};
use crate::util::cast_chk;
use crate::Result;

impl From<CounterResetHint> for ResetHint {
    fn from(hint: CounterResetHint) -> ResetHint {
        match hint {
            CounterResetHint::Unknown => ResetHint::Unknown,
            CounterResetHint::CounterReset => ResetHint::Yes,
            CounterResetHint::NotCounterReset => ResetHint::No,
            CounterResetHint::Gauge => ResetHint::Gauge,
        }
    }
}

impl From<ResetHint> for CounterResetHint {
    fn from(hint: ResetHint) -> CounterResetHint {
        match hint {
            ResetHint::Unknown => CounterResetHint::Unknown,
            ResetHint::Yes => CounterResetHint::CounterReset,
            ResetHint::No => CounterResetHint::NotCounterReset,
            ResetHint::Gauge => CounterResetHint::Gauge,
        }
    }
}

fn spans_to_proto(spans: &[Span]) -> Vec<prompb::BucketSpan> {
    spans
        .iter()
        .map(|s| prompb::BucketSpan {
            offset: s.offset,
            length: s.length,
        })
        .collect()
}

fn spans_from_proto(spans: &[prompb::BucketSpan]) -> Spans {
    spans
        .iter()
        .map(|s| Span {
            offset: s.offset,
            length: s.length,
        })
        .collect::<SmallVec<_>>()
}

/// Encode an integer histogram for remote write, stamped with `ts_millis`.
pub fn histogram_to_proto(ts_millis: i64, h: &Histogram) -> prompb::Histogram {
    prompb::Histogram {
        count: Some(Count::CountInt(h.count)),
        sum: h.sum,
        schema: h.schema,
        zero_threshold: h.zero_threshold,
        zero_count: Some(ZeroCount::ZeroCountInt(h.zero_count)),
        negative_spans: spans_to_proto(&h.negative_spans),
        negative_deltas: h.negative_buckets.clone(),
        negative_counts: vec![],
        positive_spans: spans_to_proto(&h.positive_spans),
        positive_deltas: h.positive_buckets.clone(),
        positive_counts: vec![],
        reset_hint: ResetHint::from(h.counter_reset_hint).into(),
        timestamp: ts_millis,
    }
}

/// Encode a float histogram for remote write, stamped with `ts_millis`.
pub fn float_histogram_to_proto(ts_millis: i64, fh: &FloatHistogram) -> prompb::Histogram {
    prompb::Histogram {
        count: Some(Count::CountFloat(fh.count)),
        sum: fh.sum,
        schema: fh.schema,
        zero_threshold: fh.zero_threshold,
        zero_count: Some(ZeroCount::ZeroCountFloat(fh.zero_count)),
        negative_spans: spans_to_proto(&fh.negative_spans),
        negative_deltas: vec![],
        negative_counts: fh.negative_buckets.clone(),
        positive_spans: spans_to_proto(&fh.positive_spans),
        positive_deltas: vec![],
        positive_counts: fh.positive_buckets.clone(),
        reset_hint: ResetHint::from(fh.counter_reset_hint).into(),
        timestamp: ts_millis,
    }
}

/// Resolve one side of a wire histogram into absolute counts, checking them
/// against the spans.
fn side_from_proto(
    side: &'static str,
    spans: &[Span],
    deltas: &[i64],
    counts: &[f64],
) -> Result<Vec<f64>> {
    if !deltas.is_empty() && !counts.is_empty() {
        return Err(OracleError::MixedCounts(side));
    }

    let expected = spans
        .iter()
        .map(|s| cast_chk::<u32, usize>(s.length, "span length"))
        .sum::<Result<usize>>()?;

    let buckets = if counts.is_empty() {
        deltas_to_counts(deltas)?
    } else {
        counts.to_vec()
    };

    if buckets.len() != expected {
        return Err(OracleError::span_mismatch(side, expected, buckets.len()));
    }
    check_span_indices(spans)?;
    Ok(buckets)
}

/// Decode a wire histogram into a float histogram. Integer histograms are
/// resolved from their deltas, so both wire flavours of the same statistical
/// value decode to equal results.
pub fn float_histogram_from_proto(hp: &prompb::Histogram) -> Result<FloatHistogram> {
    let count = match hp.count {
        Some(Count::CountInt(c)) => c as f64,
        Some(Count::CountFloat(c)) => c,
        None => return Err(OracleError::MissingField("count")),
    };
    let zero_count = match hp.zero_count {
        Some(ZeroCount::ZeroCountInt(c)) => c as f64,
        Some(ZeroCount::ZeroCountFloat(c)) => c,
        None => return Err(OracleError::MissingField("zero_count")),
    };
    let reset_hint = ResetHint::try_from(hp.reset_hint)
        .map_err(|_| OracleError::InvalidResetHint(hp.reset_hint))?;
    if !(SCHEMA_MIN..=SCHEMA_MAX).contains(&hp.schema) {
        return Err(OracleError::InvalidSchema(hp.schema));
    }

    let negative_spans = spans_from_proto(&hp.negative_spans);
    let positive_spans = spans_from_proto(&hp.positive_spans);
    let negative_buckets = side_from_proto(
        "negative",
        &negative_spans,
        &hp.negative_deltas,
        &hp.negative_counts,
    )?;
    let positive_buckets = side_from_proto(
        "positive",
        &positive_spans,
        &hp.positive_deltas,
        &hp.positive_counts,
    )?;

    let fh = FloatHistogram {
        counter_reset_hint: reset_hint.into(),
        schema: hp.schema,
        zero_threshold: hp.zero_threshold,
        zero_count,
        count,
        sum: hp.sum,
        positive_spans,
        negative_spans,
        positive_buckets,
        negative_buckets,
    };
    debug_assert_eq!(spans_len(&fh.positive_spans), fh.positive_buckets.len());

    Ok(fh)
}

impl From<&Bucket> for HistogramBucket {
    fn from(bucket: &Bucket) -> HistogramBucket {
        let boundaries = match (bucket.lower_inclusive, bucket.upper_inclusive) {
            // Left open.
            (false, true) => 0,
            // Right open.
            (true, false) => 1,
            (false, false) => 2,
            (true, true) => 3,
        };

        HistogramBucket {
            boundaries,
            lower: bucket.lower,
            upper: bucket.upper,
            count: bucket.count,
        }
    }
}

impl FloatHistogram {
    /// Render the histogram the way the query API returns it. Empty buckets
    /// are dropped and the reset hint is not part of the result.
    pub fn to_sample_histogram(&self) -> SampleHistogram {
        let buckets = self
            .all_buckets()
            .filter(|b| b.count != 0.0)
            .map(|b| HistogramBucket::from(&b))
            .collect();

        SampleHistogram {
            count: self.count,
            sum: self.sum,
            buckets,
        }
    }
}

/// The expected query result for seed `i`. Every variant is read back as
/// this value; integer/float and counter/gauge differences do not survive
/// the read path.
pub fn generate_test_sample_histogram(i: u32) -> SampleHistogram {
    crate::histogram::generate_test_float_histogram(i).to_sample_histogram()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::histogram::{
        generate_test_float_histogram, generate_test_gauge_float_histogram,
        generate_test_gauge_histogram, generate_test_histogram,
    };

    #[test]
    fn test_histogram_to_proto() {
        let hp = histogram_to_proto(1000, &generate_test_histogram(3));

        assert_eq!(Some(Count::CountInt(39)), hp.count);
        assert_eq!(Some(ZeroCount::ZeroCountInt(5)), hp.zero_count);
        assert_eq!(vec![4, 1, -1, 0], hp.positive_deltas);
        assert!(hp.positive_counts.is_empty());
        assert_eq!(ResetHint::Unknown, hp.reset_hint());
        assert_eq!(1000, hp.timestamp);
        assert!(!hp.is_float());
    }

    #[test]
    fn test_float_histogram_to_proto() {
        let hp = float_histogram_to_proto(1000, &generate_test_gauge_float_histogram(3));

        assert_eq!(Some(Count::CountFloat(39.0)), hp.count);
        assert_eq!(vec![4.0, 5.0, 4.0, 4.0], hp.negative_counts);
        assert!(hp.negative_deltas.is_empty());
        assert_eq!(ResetHint::Gauge, hp.reset_hint());
        assert!(hp.is_float());
    }

    #[test]
    fn test_from_proto_recovers_float_histogram() {
        for i in [0, 5, 999] {
            let expected = generate_test_float_histogram(i);
            let int = float_histogram_from_proto(&histogram_to_proto(
                0,
                &generate_test_histogram(i),
            ))
            .expect("decoding integer histogram");
            let float = float_histogram_from_proto(&float_histogram_to_proto(0, &expected))
                .expect("decoding float histogram");

            assert_eq!(expected, int, "integer wire histogram, seed {i}");
            assert_eq!(expected, float, "float wire histogram, seed {i}");
        }

        let gauge = float_histogram_from_proto(&histogram_to_proto(
            0,
            &generate_test_gauge_histogram(1),
        ))
        .expect("decoding gauge histogram");
        assert_eq!(CounterResetHint::Gauge, gauge.counter_reset_hint);
    }

    #[test]
    fn test_from_proto_errors() {
        let valid = histogram_to_proto(0, &generate_test_histogram(1));

        let no_count = prompb::Histogram {
            count: None,
            ..valid.clone()
        };
        assert!(matches!(
            float_histogram_from_proto(&no_count),
            Err(OracleError::MissingField("count"))
        ));

        let no_zero = prompb::Histogram {
            zero_count: None,
            ..valid.clone()
        };
        assert!(matches!(
            float_histogram_from_proto(&no_zero),
            Err(OracleError::MissingField("zero_count"))
        ));

        let short = prompb::Histogram {
            positive_deltas: vec![2, 1],
            ..valid.clone()
        };
        assert!(matches!(
            float_histogram_from_proto(&short),
            Err(OracleError::SpanMismatch {
                side: "positive",
                spans: 4,
                buckets: 2
            })
        ));

        let mixed = prompb::Histogram {
            negative_counts: vec![1.0, 1.0, 1.0, 1.0],
            ..valid.clone()
        };
        assert!(matches!(
            float_histogram_from_proto(&mixed),
            Err(OracleError::MixedCounts("negative"))
        ));

        let bad_hint = prompb::Histogram {
            reset_hint: 9,
            ..valid
        };
        assert!(matches!(
            float_histogram_from_proto(&bad_hint),
            Err(OracleError::InvalidResetHint(9))
        ));
    }

    #[test]
    fn test_from_proto_rejects_schema_out_of_range() {
        let valid = histogram_to_proto(0, &generate_test_histogram(1));

        for schema in [SCHEMA_MIN - 1, SCHEMA_MAX + 1, 40, i32::MIN] {
            let hp = prompb::Histogram {
                schema,
                ..valid.clone()
            };
            assert!(
                matches!(
                    float_histogram_from_proto(&hp),
                    Err(OracleError::InvalidSchema(s)) if s == schema
                ),
                "schema {schema} rejected"
            );
        }

        for schema in [SCHEMA_MIN, 0, SCHEMA_MAX] {
            let hp = prompb::Histogram {
                schema,
                ..valid.clone()
            };
            let fh = float_histogram_from_proto(&hp).expect("schema in range");
            assert_eq!(9, fh.to_sample_histogram().buckets.len(), "schema {schema}");
        }
    }

    #[test]
    fn test_from_proto_rejects_overflowing_spans() {
        let valid = histogram_to_proto(0, &generate_test_histogram(1));

        let past_max = prompb::Histogram {
            positive_spans: vec![
                prompb::BucketSpan {
                    offset: i32::MAX - 1,
                    length: 2,
                },
                prompb::BucketSpan {
                    offset: 0,
                    length: 2,
                },
            ],
            ..valid.clone()
        };
        assert!(matches!(
            float_histogram_from_proto(&past_max),
            Err(OracleError::Overflow { ty: "i32", .. })
        ));

        let no_lower_bound = prompb::Histogram {
            negative_spans: vec![prompb::BucketSpan {
                offset: i32::MIN,
                length: 4,
            }],
            ..valid
        };
        assert!(matches!(
            float_histogram_from_proto(&no_lower_bound),
            Err(OracleError::Overflow { .. })
        ));
    }

    #[test]
    fn test_from_proto_rejects_overflowing_deltas() {
        let hp = prompb::Histogram {
            positive_deltas: vec![1, i64::MAX, 0, 0],
            ..histogram_to_proto(0, &generate_test_histogram(1))
        };
        assert!(matches!(
            float_histogram_from_proto(&hp),
            Err(OracleError::Overflow { ty: "i64", .. })
        ));
    }

    #[test]
    fn test_sample_histogram_seed_zero() {
        let sh = generate_test_sample_histogram(0);

        assert_eq!(12.0, sh.count);
        assert_eq!(18.4, sh.sum);
        assert_eq!(9, sh.buckets.len());

        let zero = &sh.buckets[4];
        assert_eq!(3, zero.boundaries, "zero bucket is closed");
        assert_eq!(2.0, zero.count);
        assert_eq!(1, sh.buckets[0].boundaries, "negative buckets are right open");
        assert_eq!(0, sh.buckets[8].boundaries, "positive buckets are left open");
        assert_eq!(
            sh.buckets.iter().map(|b| b.count).sum::<f64>(),
            sh.count,
            "bucket counts add up"
        );
    }

    fn bucket(boundaries: i32, lower: f64, upper: f64, count: f64) -> HistogramBucket {
        HistogramBucket {
            boundaries,
            lower,
            upper,
            count,
        }
    }

    /// Buckets of the seed scheme as the Prometheus query API renders them,
    /// for a histogram whose bucket counts at indices 0, 1, 3, 4 are
    /// `[a, b, a, a]` on both sides and whose zero bucket holds `zero`.
    fn query_api_buckets(a: f64, b: f64, zero: f64) -> Vec<HistogramBucket> {
        vec![
            bucket(1, -4.0, -2.82842712474619, a),
            bucket(1, -2.82842712474619, -2.0, a),
            bucket(1, -1.414213562373095, -1.0, b),
            bucket(1, -1.0, -0.7071067811865475, a),
            bucket(3, -0.001, 0.001, zero),
            bucket(0, 0.7071067811865475, 1.0, a),
            bucket(0, 1.0, 1.414213562373095, b),
            bucket(0, 2.0, 2.82842712474619, a),
            bucket(0, 2.82842712474619, 4.0, a),
        ]
    }

    #[test]
    fn test_sample_histogram_matches_query_api() {
        let sh = generate_test_sample_histogram(0);
        assert_eq!(
            SampleHistogram {
                count: 12.0,
                sum: 18.4,
                buckets: query_api_buckets(1.0, 2.0, 2.0),
            },
            sh
        );

        let sh = generate_test_sample_histogram(42);
        assert_eq!(
            SampleHistogram {
                count: 390.0,
                sum: 791.1999999999999,
                buckets: query_api_buckets(43.0, 44.0, 44.0),
            },
            sh
        );

        assert_eq!(
            r#"[0,"0.7071067811865475","1","43"]"#,
            serde_json::to_string(&sh.buckets[5]).unwrap()
        );
        assert_eq!(
            r#"[1,"-1.414213562373095","-1","44"]"#,
            serde_json::to_string(&sh.buckets[2]).unwrap()
        );
    }

    #[test]
    fn test_sample_histogram_drops_empty_buckets() {
        let mut fh = generate_test_float_histogram(0);
        fh.positive_buckets = vec![0.0, 2.0, 0.0, 3.0];
        fh.zero_count = 0.0;

        let sh = fh.to_sample_histogram();
        assert_eq!(4 + 2, sh.buckets.len());
        assert!(sh.buckets.iter().all(|b| b.count != 0.0));
    }
}
