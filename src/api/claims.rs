//! Authenticated caller claims.

use crate::error::{ErrorKind, ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

/// Identity claims extracted from an authenticated request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    pub username: Option<String>,
    pub org_id: Option<String>,
    pub is_org_admin: bool,
}

impl Claims {
    pub fn new(username: impl Into<String>, org_id: impl Into<String>, is_org_admin: bool) -> Self {
        Self {
            username: Some(username.into()),
            org_id: Some(org_id.into()),
            is_org_admin,
        }
    }

    pub fn username(&self) -> ServiceResult<&str> {
        self.username
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ServiceError::new(ErrorKind::Forbidden, "can't find any of the username claims")
            })
    }

    pub fn org_id(&self) -> ServiceResult<&str> {
        self.org_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ServiceError::new(ErrorKind::Forbidden, "can't find any of the org id claims")
            })
    }
}

/// Resolve the claims of the current request, failing when the caller is anonymous
pub fn require_claims(claims: Option<&Claims>) -> ServiceResult<&Claims> {
    claims.ok_or_else(|| ServiceError::new(ErrorKind::Unauthenticated, "user not authenticated"))
}
