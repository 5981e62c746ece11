use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use thiserror::Error;

/// Error taxonomy shared by every report pipeline.
///
/// Per-account failures (`AccessDenied`, exhausted `Throttled`,
/// `MalformedResponse`) skip the account in organization-wide runs;
/// `Authentication` and `InvalidInput` always abort.
#[derive(Debug, Error)]
pub enum CostError {
    #[error("no usable AWS credentials: {0}")]
    Authentication(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("throttled by AWS: {0}")]
    Throttled(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Provider(String),
}

impl CostError {
    /// True for transient rate-limit signals worth retrying with backoff.
    pub fn is_throttle(&self) -> bool {
        matches!(self, CostError::Throttled(_))
    }

    /// True when an organization-wide run should skip the current account
    /// and continue, rather than abort.
    pub fn is_account_skippable(&self) -> bool {
        matches!(
            self,
            CostError::AccessDenied(_)
                | CostError::Throttled(_)
                | CostError::MalformedResponse(_)
                | CostError::Provider(_)
        )
    }
}

const THROTTLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "LimitExceededException",
];

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "AuthFailure",
    "ExpiredToken",
    "ExpiredTokenException",
];

/// Map an AWS SDK error onto the taxonomy using its service error code.
pub fn from_sdk<E, R>(operation: &str, err: SdkError<E, R>) -> CostError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_owned);
    let message = err
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| err.to_string());
    let detail = match &code {
        Some(code) => format!("{operation}: {code}: {message}"),
        None => format!("{operation}: {message}"),
    };

    match code.as_deref() {
        Some(code) if THROTTLE_CODES.contains(&code) => CostError::Throttled(detail),
        Some(code) if ACCESS_DENIED_CODES.contains(&code) => CostError::AccessDenied(detail),
        _ => CostError::Provider(detail),
    }
}
