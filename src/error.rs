use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// AccelError

/// Errors produced by the accelerated property-write pipeline.
///
/// The wiring variants (`Integration`, `MissingBucket`, `InvalidIndex`,
/// `InstanceMismatch`) and `Generation` signal contract violations: they are
/// fatal for the accelerated writer of the affected type, and the caller must
/// stay on its generic write path. `AccessDenied` is the one recoverable
/// variant; writers retry the affected call through their fallback writer.
/// `Application` carries host-side failures through both paths unchanged.
#[derive(Debug, Error)]
pub enum AccelError {
    /// Invalid writer or accessor wiring detected at setup or first use.
    #[error("invalid accessor wiring: {0}")]
    Integration(String),

    /// An operation was invoked on a bucket that was empty at generation time.
    #[error("no {bucket} accessor was generated for `{owner}`")]
    MissingBucket {
        owner: &'static str,
        bucket: &'static str,
    },

    /// A dispatch index outside the `[0, len)` domain of the generated bucket.
    #[error("invalid accessor index {index} for `{owner}` ({bucket} bucket of size {len})")]
    InvalidIndex {
        owner: &'static str,
        bucket: &'static str,
        index: usize,
        len: usize,
    },

    /// The accessor was handed an instance of a type other than its owner.
    #[error("accessor for `{expected}` received an instance of another type")]
    InstanceMismatch { expected: &'static str },

    /// The fast-path read was rejected by an access-control check.
    #[error("access denied while reading `{member}`: {reason}")]
    AccessDenied { member: String, reason: String },

    /// A property value turned out to be the instance currently being written.
    #[error("direct self-reference detected for property `{property}`")]
    SelfReference { property: String },

    /// Collected member metadata could not be turned into a valid accessor.
    #[error("failed to generate accessor for `{owner}`: {detail}")]
    Generation {
        owner: &'static str,
        detail: String,
    },

    /// A failure raised by host-supplied reader or serializer code.
    #[error("{0}")]
    Application(Box<dyn core::error::Error + Send + Sync>),

    /// A failure reported by the document sink.
    #[error("document sink error: {0}")]
    Sink(String),
}

impl AccelError {
    /// Shorthand for the [`AccessDenied`](Self::AccessDenied) variant.
    pub fn access_denied(member: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a host-side error so it propagates unchanged through the
    /// fast and fallback paths alike.
    pub fn application(err: impl core::error::Error + Send + Sync + 'static) -> Self {
        Self::Application(Box::new(err))
    }

    /// Whether this error is the per-call recoverable access-denied event.
    #[inline]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}
