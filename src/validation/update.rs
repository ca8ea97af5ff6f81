//! # Update Validation
//!
//! Administrative updates (versions, storage, suspension) and owner-facing
//! updates (ownership transfer).

use super::validate_length;
use crate::api::{require_claims, Claims, KafkaRequest, KafkaUpdateRequest, KafkaUserUpdateRequest};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::services::AuthorizationService;
use regex::Regex;
use std::sync::LazyLock;

fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

/// At least one updatable field must be provided
pub fn validate_kafka_update_fields(update: &KafkaUpdateRequest) -> ServiceResult<()> {
    let any_set = is_set(&update.strimzi_version)
        || is_set(&update.kafka_version)
        || is_set(&update.kafka_ibp_version)
        || is_set(&update.deprecated_kafka_storage_size)
        || is_set(&update.max_data_retention_size)
        || update.suspended.is_some();
    if !any_set {
        return Err(ServiceError::validation(
            "failed to update Kafka Request. Expecting at least one of the following fields: \
             strimzi_version, kafka_version, kafka_ibp_version, kafka_storage_size, \
             max_data_retention_size or suspended to be provided",
        ));
    }
    Ok(())
}

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<number>[0-9]+(?:\.[0-9]+)?)(?P<suffix>Ki|Mi|Gi|Ti|Pi|Ei|k|M|G|T|P|E)?$")
        .expect("Failed to compile quantity regex - this should never happen")
});

/// Parse a storage quantity such as `1000Gi` or `1T` into bytes
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    let captures = QUANTITY_REGEX.captures(quantity.trim())?;
    let number: f64 = captures.name("number")?.as_str().parse().ok()?;
    let multiplier: f64 = match captures.name("suffix").map(|m| m.as_str()) {
        None => 1.0,
        Some("k") => 1e3,
        Some("M") => 1e6,
        Some("G") => 1e9,
        Some("T") => 1e12,
        Some("P") => 1e15,
        Some("E") => 1e18,
        Some("Ki") => 1024.0,
        Some("Mi") => 1024f64.powi(2),
        Some("Gi") => 1024f64.powi(3),
        Some("Ti") => 1024f64.powi(4),
        Some("Pi") => 1024f64.powi(5),
        Some("Ei") => 1024f64.powi(6),
        Some(_) => return None,
    };
    Some(number * multiplier)
}

/// A requested storage size must parse and must not be smaller than the current one
pub fn validate_kafka_storage_size(
    kafka: &KafkaRequest,
    update: &KafkaUpdateRequest,
) -> ServiceResult<()> {
    let requested = if is_set(&update.max_data_retention_size) {
        update.max_data_retention_size.as_str()
    } else {
        update.deprecated_kafka_storage_size.as_str()
    };
    if !is_set(requested) {
        return Ok(());
    }

    let current_size = parse_quantity(&kafka.kafka_storage_size).ok_or_else(|| {
        ServiceError::validation(format!(
            "failed to update Kafka Request. Unable to parse current storage size: {:?}",
            kafka.kafka_storage_size
        ))
    })?;
    let requested_size = parse_quantity(requested).ok_or_else(|| {
        ServiceError::validation(format!(
            "failed to update Kafka Request. Unable to parse current requested size: {requested:?}"
        ))
    })?;
    if requested_size < current_size {
        return Err(ServiceError::validation(format!(
            "failed to update Kafka Request. Requested size: {requested:?} should be greater than current size: {:?}",
            kafka.kafka_storage_size
        )));
    }
    Ok(())
}

/// Caller must belong to the kafka's organisation and either own it or be an org admin
pub fn validate_user_is_kafka_owner_or_org_admin(
    claims: &Claims,
    kafka: &KafkaRequest,
) -> ServiceResult<()> {
    let username = claims.username()?;
    let org_id = claims.org_id()?;
    let authorized =
        kafka.organisation_id == org_id && (claims.is_org_admin || kafka.owner == username);
    if !authorized {
        return Err(ServiceError::unauthorized(
            "user not authorized to perform this action",
        ));
    }
    Ok(())
}

/// Owner-facing update: authorization first, then the new owner must be a user of the organisation
pub async fn validate_kafka_user_facing_update_fields(
    claims: Option<&Claims>,
    authorization: &dyn AuthorizationService,
    kafka: &KafkaRequest,
    update: &KafkaUserUpdateRequest,
) -> ServiceResult<()> {
    let claims = require_claims(claims)?;
    validate_user_is_kafka_owner_or_org_admin(claims, kafka)?;

    let Some(owner) = &update.owner else {
        return Ok(());
    };
    validate_length(owner, "owner", 1, None)?;

    let org_id = claims.org_id()?;
    let valid = authorization
        .check_user_valid(owner, org_id)
        .await
        .map_err(|err| {
            ServiceError::with_cause(
                ErrorKind::General,
                err.into(),
                "unable to update kafka request owner",
            )
        })?;
    if !valid {
        return Err(ServiceError::bad_request(format!(
            "user {owner} does not belong in your organization"
        )));
    }
    Ok(())
}
