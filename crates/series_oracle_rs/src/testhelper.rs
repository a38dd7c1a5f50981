use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::model::{Sample, SampleHistogram, SampleValue};
use crate::prompb::Label;
use crate::series::SeriesGenerator;

/// 2024-01-01T00:00:00Z.
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A generator with a fixed seed and the default config.
pub fn seeded_generator(seed: u64) -> SeriesGenerator<StdRng> {
    SeriesGenerator::new(StdRng::seed_from_u64(seed))
}

pub fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
    pairs.iter().map(|(k, v)| Label::new(*k, *v)).collect()
}

/// The histogram of an expected vector entry. Panics on scalar entries.
pub fn histogram_of(sample: &Sample) -> &SampleHistogram {
    match &sample.value {
        SampleValue::Histogram(h) => h,
        SampleValue::Scalar(v) => panic!("expected a histogram sample, got scalar {v}"),
    }
}

mod test {
    use super::*;

    #[test]
    fn test_test_time() {
        assert_eq!(1_704_067_200_000, test_time().timestamp_millis());
    }

    #[test]
    fn test_labels() {
        let out = labels(&[("a", "1"), ("b", "2")]);
        assert_eq!(vec![Label::new("a", "1"), Label::new("b", "2")], out);
    }

    #[test]
    #[should_panic(expected = "got scalar")]
    fn test_histogram_of_scalar() {
        let sample = Sample {
            metric: Default::default(),
            timestamp: 0,
            value: SampleValue::Scalar(1.0),
        };
        histogram_of(&sample);
    }
}
