use std::any;
use std::fmt::Display;
use thiserror::Error;

/// Errors returned by the fallible parts of the crate. Generating series is
/// total and never fails; only decoding wire data, reading query-API JSON and
/// loading configuration can.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Protobuf bytes could not be decoded into a wire message.
    #[error("failed to decode {message}: {err}")]
    Decode {
        message: &'static str,
        err: prost::DecodeError,
    },
    /// A required oneof of a wire histogram was not set.
    #[error("histogram has no {0} set")]
    MissingField(&'static str),
    /// The spans of one side of a histogram cover a different number of
    /// buckets than were encoded.
    #[error("{side} spans cover {spans} buckets but {buckets} were encoded")]
    SpanMismatch {
        side: &'static str,
        spans: usize,
        buckets: usize,
    },
    /// Integer deltas and float counts were both encoded for one side.
    #[error("{0} buckets carry both integer deltas and float counts")]
    MixedCounts(&'static str),
    /// The reset hint is not one the remote-write schema defines.
    #[error("unknown histogram reset hint {0}")]
    InvalidResetHint(i32),
    /// The histogram schema is outside `-4..=8`.
    #[error("histogram schema {0} out of range")]
    InvalidSchema(i32),
    /// A numeric operation overflowed.
    #[error("overflow when {op} {value} and {added} of type {ty}")]
    Overflow {
        value: String,
        added: String,
        op: String,
        ty: &'static str,
    },
    /// A failed attempt to cast an integer from one type to another.
    #[error("failed to cast {object_name} {value} from {from} to {to}")]
    FailedCast {
        from: &'static str,
        to: &'static str,
        value: String,
        object_name: String,
    },
    /// Query-API JSON or configuration could not be (de)serialized.
    #[error("invalid {what} JSON: {err}")]
    Json {
        what: &'static str,
        err: serde_json::Error,
    },
    /// Configuration parsed but holds unusable values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl OracleError {
    pub fn decode(message: &'static str, err: prost::DecodeError) -> Self {
        OracleError::Decode { message, err }
    }

    pub fn json(what: &'static str, err: serde_json::Error) -> Self {
        OracleError::Json { what, err }
    }

    pub fn failed_cast<T: Display, U>(value: T, object_name: &str) -> Self {
        OracleError::FailedCast {
            from: any::type_name::<T>(),
            to: any::type_name::<U>(),
            value: value.to_string(),
            object_name: object_name.to_string(),
        }
    }

    pub fn overflowed<T: Display>(value: T, added: T, op: &str) -> Self {
        OracleError::Overflow {
            value: value.to_string(),
            added: added.to_string(),
            op: op.to_string(),
            ty: any::type_name::<T>(),
        }
    }

    pub fn span_mismatch(side: &'static str, spans: usize, buckets: usize) -> Self {
        OracleError::SpanMismatch {
            side,
            spans,
            buckets,
        }
    }
}
