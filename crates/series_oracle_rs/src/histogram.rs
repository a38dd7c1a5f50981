//! In-memory native histograms and the canonical seed scheme every test
//! histogram is built from.

use smallvec::{smallvec, SmallVec};

use crate::util::{cast_chk, CheckedOps};
use crate::Result;

mod bounds;

pub use bounds::{bucket_bound, SCHEMA_MAX, SCHEMA_MIN};

/// Spans of one side of a histogram. Test histograms never use more than two.
pub type Spans = SmallVec<[Span; 2]>;

/// How a histogram relates to its predecessor in the same series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CounterResetHint {
    /// Nothing is known; the reader has to detect resets itself.
    #[default]
    Unknown,
    /// This histogram is the first one after a counter reset.
    CounterReset,
    /// No counter reset happened since the previous histogram.
    NotCounterReset,
    /// A gauge histogram, counter resets do not apply.
    Gauge,
}

/// A run of `length` consecutive buckets starting `offset` buckets after the
/// end of the previous span (or at index `offset` for the first span).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: i32,
    pub length: u32,
}

/// Integer native histogram. Bucket counts are delta encoded: the first
/// entry is absolute, every following one is the difference to its
/// predecessor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Histogram {
    pub counter_reset_hint: CounterResetHint,
    pub schema: i32,
    pub zero_threshold: f64,
    pub zero_count: u64,
    pub count: u64,
    pub sum: f64,
    pub positive_spans: Spans,
    pub negative_spans: Spans,
    pub positive_buckets: Vec<i64>,
    pub negative_buckets: Vec<i64>,
}

/// Float native histogram. Bucket counts are absolute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FloatHistogram {
    pub counter_reset_hint: CounterResetHint,
    pub schema: i32,
    pub zero_threshold: f64,
    pub zero_count: f64,
    pub count: f64,
    pub sum: f64,
    pub positive_spans: Spans,
    pub negative_spans: Spans,
    pub positive_buckets: Vec<f64>,
    pub negative_buckets: Vec<f64>,
}

/// One bucket yielded by [`FloatHistogram::all_buckets`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucket {
    pub lower: f64,
    pub upper: f64,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
    pub count: f64,
}

const TEST_SCHEMA: i32 = 1;
const TEST_ZERO_THRESHOLD: f64 = 0.001;

fn test_spans() -> Spans {
    smallvec![
        Span {
            offset: 0,
            length: 2
        },
        Span {
            offset: 1,
            length: 2
        },
    ]
}

/// Counter histogram with integer counts for seed `i`.
///
/// Count is `12 + 9i`, made of a zero bucket of `2 + i` and two sides with
/// absolute bucket counts `[i+1, i+2, i+1, i+1]` each. Sum is `18.4 * (i+1)`.
pub fn generate_test_histogram(i: u32) -> Histogram {
    let first = i64::from(i) + 1;
    let i = u64::from(i);

    Histogram {
        counter_reset_hint: CounterResetHint::Unknown,
        schema: TEST_SCHEMA,
        zero_threshold: TEST_ZERO_THRESHOLD,
        zero_count: 2 + i,
        count: 12 + i * 9,
        sum: 18.4 * (i + 1) as f64,
        positive_spans: test_spans(),
        negative_spans: test_spans(),
        positive_buckets: vec![first, 1, -1, 0],
        negative_buckets: vec![first, 1, -1, 0],
    }
}

/// Counter histogram with float counts for seed `i`, numerically equal to
/// [`generate_test_histogram`].
pub fn generate_test_float_histogram(i: u32) -> FloatHistogram {
    let i = f64::from(i);

    FloatHistogram {
        counter_reset_hint: CounterResetHint::Unknown,
        schema: TEST_SCHEMA,
        zero_threshold: TEST_ZERO_THRESHOLD,
        zero_count: 2.0 + i,
        count: 12.0 + i * 9.0,
        sum: 18.4 * (i + 1.0),
        positive_spans: test_spans(),
        negative_spans: test_spans(),
        positive_buckets: vec![i + 1.0, i + 2.0, i + 1.0, i + 1.0],
        negative_buckets: vec![i + 1.0, i + 2.0, i + 1.0, i + 1.0],
    }
}

pub fn generate_test_gauge_histogram(i: u32) -> Histogram {
    Histogram {
        counter_reset_hint: CounterResetHint::Gauge,
        ..generate_test_histogram(i)
    }
}

pub fn generate_test_gauge_float_histogram(i: u32) -> FloatHistogram {
    FloatHistogram {
        counter_reset_hint: CounterResetHint::Gauge,
        ..generate_test_float_histogram(i)
    }
}

impl Histogram {
    /// Convert to a float histogram, resolving the bucket deltas into
    /// absolute counts.
    pub fn to_float(&self) -> Result<FloatHistogram> {
        Ok(FloatHistogram {
            counter_reset_hint: self.counter_reset_hint,
            schema: self.schema,
            zero_threshold: self.zero_threshold,
            zero_count: self.zero_count as f64,
            count: self.count as f64,
            sum: self.sum,
            positive_spans: self.positive_spans.clone(),
            negative_spans: self.negative_spans.clone(),
            positive_buckets: deltas_to_counts(&self.positive_buckets)?,
            negative_buckets: deltas_to_counts(&self.negative_buckets)?,
        })
    }
}

/// Resolve delta encoded bucket counts into absolute float counts.
pub(crate) fn deltas_to_counts(deltas: &[i64]) -> Result<Vec<f64>> {
    let mut current = 0i64;
    deltas
        .iter()
        .map(|&d| {
            current = current.add_chk(d)?;
            Ok(current as f64)
        })
        .collect()
}

/// Number of buckets covered by a set of spans.
pub(crate) fn spans_len(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.length as usize).sum()
}

/// Check that every bucket index `spans` cover, and the index below each
/// span's first bucket, fits in an `i32`.
pub(crate) fn check_span_indices(spans: &[Span]) -> Result<()> {
    let mut next = 0i32;
    for span in spans {
        let start = next.add_chk(span.offset)?;
        let len = cast_chk::<u32, i32>(span.length, "span length")?;
        next = start.add_chk(len)?;
        if len > 0 {
            // Lower bound of the first bucket.
            start.add_chk(-1)?;
        }
    }
    Ok(())
}

/// Bucket indices covered by `spans`, in ascending order. The spans must
/// pass [`check_span_indices`]; generated histograms always do.
fn span_indices(spans: &[Span]) -> impl Iterator<Item = i32> + '_ {
    let mut next = 0i32;
    spans.iter().flat_map(move |span| {
        let start = next + span.offset;
        let len = span.length as i32;
        next = start + len;
        start..start + len
    })
}

impl FloatHistogram {
    /// Iterate over all buckets from the most negative upwards: negative
    /// buckets, the zero bucket, then positive buckets. Buckets are yielded
    /// regardless of their count.
    ///
    /// The schema must be in `SCHEMA_MIN..=SCHEMA_MAX`.
    pub fn all_buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        let negative: Vec<Bucket> = span_indices(&self.negative_spans)
            .zip(self.negative_buckets.iter())
            .map(|(idx, &count)| Bucket {
                lower: -bucket_bound(idx, self.schema),
                upper: -bucket_bound(idx - 1, self.schema),
                lower_inclusive: true,
                upper_inclusive: false,
                count,
            })
            .collect();

        let zero = (self.zero_threshold != 0.0 || self.zero_count != 0.0).then(|| Bucket {
            lower: -self.zero_threshold,
            upper: self.zero_threshold,
            lower_inclusive: true,
            upper_inclusive: true,
            count: self.zero_count,
        });

        let positive = span_indices(&self.positive_spans)
            .zip(self.positive_buckets.iter())
            .map(|(idx, &count)| Bucket {
                lower: bucket_bound(idx - 1, self.schema),
                upper: bucket_bound(idx, self.schema),
                lower_inclusive: false,
                upper_inclusive: true,
                count,
            });

        negative.into_iter().rev().chain(zero).chain(positive)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::OracleError;

    #[test]
    fn test_generate_test_histogram_totals() {
        for i in [0, 1, 42, 999] {
            let h = generate_test_histogram(i);
            let fh = h.to_float().expect("resolving deltas");

            let buckets: f64 = fh.positive_buckets.iter().sum::<f64>()
                + fh.negative_buckets.iter().sum::<f64>()
                + fh.zero_count;
            assert_eq!(h.count as f64, buckets, "count matches buckets for seed {i}");
            assert_eq!(12 + 9 * u64::from(i), h.count);
        }
    }

    #[test]
    fn test_integer_and_float_histograms_agree() {
        for i in 0..1000 {
            assert_eq!(
                generate_test_float_histogram(i),
                generate_test_histogram(i).to_float().unwrap(),
                "seed {i}"
            );
            assert_eq!(
                generate_test_gauge_float_histogram(i),
                generate_test_gauge_histogram(i).to_float().unwrap(),
                "gauge seed {i}"
            );
        }
    }

    #[test]
    fn test_gauge_only_changes_hint() {
        let counter = generate_test_histogram(7);
        let gauge = generate_test_gauge_histogram(7);

        assert_eq!(CounterResetHint::Unknown, counter.counter_reset_hint);
        assert_eq!(CounterResetHint::Gauge, gauge.counter_reset_hint);
        assert_eq!(
            counter,
            Histogram {
                counter_reset_hint: CounterResetHint::Unknown,
                ..gauge
            }
        );
    }

    #[test]
    fn test_deltas_to_counts() {
        assert_eq!(
            vec![4.0, 5.0, 4.0, 4.0],
            deltas_to_counts(&[4, 1, -1, 0]).unwrap()
        );
        assert!(deltas_to_counts(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_deltas_to_counts_overflow() {
        assert!(matches!(
            deltas_to_counts(&[i64::MAX, 1]),
            Err(OracleError::Overflow { ty: "i64", .. })
        ));
        assert!(matches!(
            deltas_to_counts(&[-1, i64::MIN]),
            Err(OracleError::Overflow { .. })
        ));

        let h = Histogram {
            positive_buckets: vec![1, i64::MAX],
            ..generate_test_histogram(0)
        };
        assert!(h.to_float().is_err(), "to_float propagates the overflow");
    }

    #[test]
    fn test_check_span_indices() {
        assert!(check_span_indices(&generate_test_histogram(0).positive_spans).is_ok());
        assert!(check_span_indices(&[]).is_ok());

        let span = |offset, length| Span { offset, length };
        assert!(check_span_indices(&[span(i32::MAX - 2, 2)]).is_ok());
        assert!(
            matches!(
                check_span_indices(&[span(i32::MAX, 2)]),
                Err(OracleError::Overflow { ty: "i32", .. })
            ),
            "span runs past i32::MAX"
        );
        assert!(
            check_span_indices(&[span(i32::MAX - 4, 2), span(i32::MAX, 1)]).is_err(),
            "second offset overflows"
        );
        assert!(
            check_span_indices(&[span(i32::MIN, 1)]).is_err(),
            "first bucket has no lower bound"
        );
        assert!(
            matches!(
                check_span_indices(&[span(0, u32::MAX)]),
                Err(OracleError::FailedCast { .. })
            ),
            "length beyond i32"
        );
    }

    #[test]
    fn test_all_buckets_order() {
        let fh = generate_test_float_histogram(0);
        let buckets: Vec<Bucket> = fh.all_buckets().collect();

        assert_eq!(9, buckets.len(), "four per side plus the zero bucket");
        assert!(
            buckets.windows(2).all(|w| w[0].lower < w[1].lower),
            "buckets ascend"
        );

        let zero = buckets[4];
        assert_eq!((-0.001, 0.001), (zero.lower, zero.upper));
        assert!(zero.lower_inclusive && zero.upper_inclusive);
        assert_eq!(2.0, zero.count);

        // Positive indices are 0, 1, 3, 4.
        let uppers: Vec<f64> = buckets[5..].iter().map(|b| b.upper).collect();
        assert_eq!(1.0, uppers[0]);
        assert_eq!(4.0, uppers[3]);
        assert_eq!(2.0, buckets[7].lower);

        let first = buckets[0];
        assert_eq!(-4.0, first.lower);
        assert!(first.lower_inclusive && !first.upper_inclusive);
    }
}
