//! Checks on the claims of the calling user.

use crate::api::{require_claims, Claims};
use crate::error::ServiceResult;

/// A single check on resolved claims
pub type ClaimsCheck = fn(&Claims) -> ServiceResult<()>;

pub fn validate_username(claims: &Claims) -> ServiceResult<()> {
    claims.username().map(|_| ())
}

pub fn validate_organisation_id(claims: &Claims) -> ServiceResult<()> {
    claims.org_id().map(|_| ())
}

/// The caller must be authenticated and pass every check
pub fn validate_kafka_claims(claims: Option<&Claims>, checks: &[ClaimsCheck]) -> ServiceResult<()> {
    let claims = require_claims(claims)?;
    checks.iter().try_for_each(|check| check(claims))
}
