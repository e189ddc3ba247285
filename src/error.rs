use crate::tracker::EndpointConstraint;

/// Errors raised while configuring a tracking run.
///
/// Per-streamline terminations are not errors; they are reported as
/// [`Termination`](crate::tracker::Termination) counts in the run report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackingError {
    #[error("no {mask} image set but endpoint constraint {constraint} chosen")]
    MissingMask {
        constraint: EndpointConstraint,
        mask: &'static str,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Io(String),
}

pub type Result<T, E = TrackingError> = std::result::Result<T, E>;
