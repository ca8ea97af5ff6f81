//! # Service Errors
//!
//! Structured error taxonomy shared by validators, providers and handlers.
//!
//! Every error carries an [`ErrorKind`] which maps to a stable reason code and an
//! HTTP status class. Callers branch on the kind, never on message text.
//! Lookups signal "not found" with `Ok(None)`; an `Err` is always a real failure.

use thiserror::Error;

/// Classification of a service failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input shape or field value
    Validation,
    /// Request is well formed but cannot be honoured
    BadRequest,
    MalformedKafkaClusterName,
    DuplicateKafkaClusterName,
    DuplicateClusterId,
    /// State conflict (e.g. an operation already in flight)
    Conflict,
    NotFound,
    Unauthenticated,
    Unauthorized,
    Forbidden,
    InstanceTypeNotSupported,
    InstancePlanNotSupported,
    RegionNotSupported,
    ProviderNotSupported,
    InvalidBillingAccount,
    /// Unexpected or infrastructure failure
    General,
}

impl ErrorKind {
    /// Stable reason code, suitable for metrics labels and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::MalformedKafkaClusterName => "malformed_kafka_cluster_name",
            ErrorKind::DuplicateKafkaClusterName => "duplicate_kafka_cluster_name",
            ErrorKind::DuplicateClusterId => "duplicate_cluster_id",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InstanceTypeNotSupported => "instance_type_not_supported",
            ErrorKind::InstancePlanNotSupported => "instance_plan_not_supported",
            ErrorKind::RegionNotSupported => "region_not_supported",
            ErrorKind::ProviderNotSupported => "provider_not_supported",
            ErrorKind::InvalidBillingAccount => "invalid_billing_account",
            ErrorKind::General => "general",
        }
    }

    /// HTTP status the kind surfaces as
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation
            | ErrorKind::BadRequest
            | ErrorKind::MalformedKafkaClusterName
            | ErrorKind::InstanceTypeNotSupported
            | ErrorKind::InstancePlanNotSupported
            | ErrorKind::RegionNotSupported
            | ErrorKind::ProviderNotSupported
            | ErrorKind::InvalidBillingAccount => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Unauthorized | ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateKafkaClusterName
            | ErrorKind::DuplicateClusterId
            | ErrorKind::Conflict => 409,
            ErrorKind::General => 500,
        }
    }

    /// Whether the failure is caused by the caller (4xx) rather than the service (5xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by validators and service collaborators
#[derive(Debug, Error)]
#[error("{kind}: {reason}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub reason: String,
    #[source]
    pub cause: Option<anyhow::Error>,
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn with_cause(kind: ErrorKind, cause: anyhow::Error, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            cause: Some(cause),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, reason)
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, reason)
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, reason)
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, reason)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, reason)
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, reason)
    }

    pub fn general(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::General, reason)
    }

    /// Reason safe to show to API users.
    ///
    /// Client errors carry their reason verbatim; server errors are replaced with a
    /// generic message so internal details never leak.
    pub fn public_reason(&self) -> String {
        if self.kind.is_client_error() {
            self.reason.clone()
        } else {
            "Unspecified error".to_string()
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        let reason = format!("{err:#}");
        Self::with_cause(ErrorKind::General, err, reason)
    }
}
