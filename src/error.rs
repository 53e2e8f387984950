use thiserror::Error;

/// Errors raised by the estimation core.
///
/// Non-convergence of the optimizer is not an error; it is reported as a flag
/// on the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    /// Malformed knot grid, mismatched lengths or non-finite inputs.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Numerical integration did not reach its tolerance.
    #[error(
        "quadrature failed on [{start}, {end}]: estimated error {error_estimate:e} after {subdivisions} subdivisions"
    )]
    QuadratureFailure {
        start: f64,
        end: f64,
        error_estimate: f64,
        subdivisions: usize,
    },
}

impl EstimateError {
    pub fn invalid_domain(message: impl Into<String>) -> Self {
        EstimateError::InvalidDomain(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        let exit_code = match err {
            EstimateError::InvalidDomain(_) => 2,
            EstimateError::QuadratureFailure { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
