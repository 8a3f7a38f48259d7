use thiserror::Error;

/// Errors raised by the simulation components.
#[derive(Debug, Error)]
pub enum SimError {
    /// Out-of-range or non-positive sizing/parameter input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested strategy is not compiled into this binary.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(&'static str),

    #[error(transparent)]
    Normal(#[from] rand_distr::NormalError),

    #[error(transparent)]
    Weighted(#[from] rand_distr::weighted::Error),
}
