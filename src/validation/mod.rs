//! # Validation
//!
//! Ordered, fail-fast validation pipelines for kafka and cluster requests.
//!
//! A pipeline is a list of boxed futures. Each validator runs only after every
//! earlier one has passed; the first failure is returned and recorded in the
//! validation metrics. Validators are plain functions taking their
//! configuration explicitly.
//!
//! - `claims` - Caller claim checks
//! - `create` - Kafka creation requests
//! - `promotion` - Billing model promotion
//! - `update` - Administrative and owner-facing updates
//! - `versions` - Semantic version comparison and version compatibility

pub mod claims;
pub mod create;
pub mod promotion;
pub mod update;
pub mod versions;

pub use claims::{validate_kafka_claims, validate_organisation_id, validate_username, ClaimsCheck};
pub use create::KafkaCreateValidator;
pub use promotion::{
    validate_kafka_promotion, AmsPromoteValidator, KafkaPromoteValidator,
    KafkaPromoteValidatorFactory, KafkaPromoteValidatorRequest, QuotaManagementListPromoteValidator,
};
pub use update::{
    validate_kafka_storage_size, validate_kafka_update_fields,
    validate_kafka_user_facing_update_fields, validate_user_is_kafka_owner_or_org_admin,
};
pub use versions::{
    compare_build_aware_semantic_versions, compare_semantic_versions_major_and_minor,
    validate_versions_compatibility,
};

use crate::config::KafkaConfig;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::observability::metrics;
use anyhow::Context;
use futures::future::BoxFuture;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// One deferred validator
pub type Validation<'a> = BoxFuture<'a, ServiceResult<()>>;

/// Run `validations` in order, stopping at the first failure
pub async fn run_validations(pipeline: &str, validations: Vec<Validation<'_>>) -> ServiceResult<()> {
    for validation in validations {
        if let Err(err) = validation.await {
            debug!("Validation pipeline {} rejected request: {}", pipeline, err);
            metrics::increment_validation_failures(pipeline, err.kind.as_str());
            return Err(err);
        }
    }
    Ok(())
}

/// `value` must be at least `min` characters and, when given, at most `max`
pub fn validate_length(value: &str, field: &str, min: usize, max: Option<usize>) -> ServiceResult<()> {
    let length = value.chars().count();
    if length < min {
        return Err(ServiceError::validation(format!(
            "{field} is not valid. Minimum length {min} is required"
        )));
    }
    if let Some(max) = max {
        if length > max {
            return Err(ServiceError::validation(format!(
                "{field} is not valid. Maximum length {max} is required"
            )));
        }
    }
    Ok(())
}

pub fn validate_not_empty(value: &str, field: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    Ok(())
}

// RFC 1123 subdomain: dot-separated labels of at most 63 characters
static DNS_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?(\.[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?)*$")
        .expect("Failed to compile DNS name regex - this should never happen")
});

const MAX_DNS_NAME_LENGTH: usize = 253;

pub fn validate_dns_name(value: &str, field: &str) -> ServiceResult<()> {
    if value.len() > MAX_DNS_NAME_LENGTH || !DNS_NAME_REGEX.is_match(value) {
        return Err(ServiceError::validation(format!(
            "{field} does not match a valid DNS name"
        )));
    }
    Ok(())
}

/// Naming rules for kafka instances
#[derive(Debug, Clone)]
pub struct NameRules {
    pub max_length: usize,
    pub pattern: Regex,
}

impl NameRules {
    pub fn new(max_length: usize, pattern: &str) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid kafka cluster name pattern '{pattern}'"))?;
        Ok(Self {
            max_length,
            pattern,
        })
    }

    pub fn from_config(config: &KafkaConfig) -> anyhow::Result<Self> {
        Self::new(
            config.max_kafka_name_length,
            &config.kafka_cluster_name_pattern,
        )
    }
}

/// Name must be non-empty, within the maximum length and match the naming pattern
pub fn validate_kafka_cluster_name(value: &str, field: &str, rules: &NameRules) -> ServiceResult<()> {
    validate_length(value, field, 1, Some(rules.max_length))?;
    if !rules.pattern.is_match(value) {
        return Err(ServiceError::new(
            ErrorKind::MalformedKafkaClusterName,
            format!("{field} does not match {}", rules.pattern.as_str()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rules() -> NameRules {
        NameRules::from_config(&KafkaConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_first_failure() {
        let calls = AtomicUsize::new(0);
        let validations: Vec<Validation<'_>> = vec![
            async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed(),
            async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::bad_request("second"))
            }
            .boxed(),
            async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::validation("third"))
            }
            .boxed(),
        ];
        let err = run_validations("test", validations).await.unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes() {
        assert!(run_validations("test", Vec::new()).await.is_ok());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length("abc", "name", 1, Some(3)).is_ok());
        assert!(validate_length("", "name", 1, None).is_err());
        assert!(validate_length("abcd", "name", 1, Some(3)).is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("x", "cluster id").is_ok());
        let err = validate_not_empty("  ", "cluster id").unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[test]
    fn test_validate_dns_name() {
        assert!(validate_dns_name("apps.example.com", "cluster dns name").is_ok());
        assert!(validate_dns_name("Apps.Example.com", "cluster dns name").is_err());
        assert!(validate_dns_name("-bad.example.com", "cluster dns name").is_err());
        assert!(validate_dns_name("", "cluster dns name").is_err());
    }

    #[test]
    fn test_validate_kafka_cluster_name() {
        let rules = rules();
        assert!(validate_kafka_cluster_name("my-kafka-1", "name", &rules).is_ok());

        let err = validate_kafka_cluster_name("My_Kafka", "name", &rules).unwrap_err();
        assert!(err.is(ErrorKind::MalformedKafkaClusterName));

        let err = validate_kafka_cluster_name("kafka-", "name", &rules).unwrap_err();
        assert!(err.is(ErrorKind::MalformedKafkaClusterName));

        let too_long = "a".repeat(33);
        let err = validate_kafka_cluster_name(&too_long, "name", &rules).unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[test]
    fn test_invalid_name_pattern_is_rejected() {
        assert!(NameRules::new(32, "([a-z").is_err());
    }
}
