//! # Version Comparison
//!
//! Semantic version comparison for strimzi, kafka and inter-broker protocol
//! versions, and the compatibility checks applied to administrative version
//! updates.
//!
//! Versions may omit minor and patch (`3.2` is an IBP version). Missing parts
//! compare as zero.

use crate::api::{KafkaRequest, KafkaUpdateRequest};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::services::ClusterService;
use anyhow::{bail, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:-(?P<pre>[0-9A-Za-z.-]+))?(?:\+(?P<build>[0-9A-Za-z.-]+))?$",
    )
    .expect("Failed to compile version regex - this should never happen")
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<String>,
    build: Option<String>,
}

impl SemanticVersion {
    fn parse(version: &str) -> Result<Self> {
        let Some(captures) = VERSION_REGEX.captures(version.trim()) else {
            bail!("'{version}' is not a semantic version");
        };
        let number = |name: &str| -> Result<u64> {
            match captures.name(name) {
                Some(part) => Ok(part.as_str().parse()?),
                None => Ok(0),
            }
        };
        Ok(Self {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre: captures.name("pre").map(|m| m.as_str().to_string()),
            build: captures.name("build").map(|m| m.as_str().to_string()),
        })
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

/// A release sorts after any of its pre-releases
fn compare_pre_release(left: Option<&str>, right: Option<&str>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => compare_identifiers(left, right),
    }
}

/// Dot-separated identifiers, numeric ones compared as numbers
fn compare_identifiers(left: &str, right: &str) -> Ordering {
    let mut left_parts = left.split('.');
    let mut right_parts = right.split('.');
    loop {
        match (left_parts.next(), right_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Compare two versions including pre-release and build metadata.
///
/// Equal versions are ordered by their build metadata, a version without
/// build metadata sorting first.
pub fn compare_build_aware_semantic_versions(left: &str, right: &str) -> Result<Ordering> {
    let left = SemanticVersion::parse(left)?;
    let right = SemanticVersion::parse(right)?;
    Ok(left
        .core()
        .cmp(&right.core())
        .then_with(|| compare_pre_release(left.pre.as_deref(), right.pre.as_deref()))
        .then_with(|| match (left.build.as_deref(), right.build.as_deref()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => compare_identifiers(l, r),
        }))
}

/// Compare only the major and minor parts of two versions
pub fn compare_semantic_versions_major_and_minor(left: &str, right: &str) -> Result<Ordering> {
    let left = SemanticVersion::parse(left)?;
    let right = SemanticVersion::parse(right)?;
    Ok((left.major, left.minor).cmp(&(right.major, right.minor)))
}

fn first_non_empty<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    }
}

/// Check an administrative version update against the kafka's cluster.
///
/// In order: the cluster supports the desired kafka version under the desired
/// strimzi version; that strimzi version is ready; the IBP version is not
/// downgraded; the IBP version does not exceed the kafka version; the kafka
/// version is not downgraded (major and minor only).
pub async fn validate_versions_compatibility(
    cluster_service: &dyn ClusterService,
    kafka: &KafkaRequest,
    update: &KafkaUpdateRequest,
) -> ServiceResult<()> {
    let desired_strimzi = first_non_empty(&update.strimzi_version, &kafka.desired_strimzi_version);
    let desired_kafka = first_non_empty(&update.kafka_version, &kafka.desired_kafka_version);
    let desired_ibp = first_non_empty(&update.kafka_ibp_version, &kafka.desired_kafka_ibp_version);

    let cluster = cluster_service
        .find_cluster_by_id(&kafka.cluster_id)
        .await
        .map_err(|err| {
            ServiceError::with_cause(
                ErrorKind::General,
                err.into(),
                format!(
                    "unable to find cluster associated with kafka request: {}",
                    kafka.id
                ),
            )
        })?
        .ok_or_else(|| {
            ServiceError::validation(format!("unable to get cluster for kafka {}", kafka.id))
        })?;

    let available = cluster_service
        .is_strimzi_kafka_version_available_in_cluster(
            &cluster,
            desired_strimzi,
            desired_kafka,
            desired_ibp,
        )
        .await
        .map_err(|err| ServiceError::validation(err.reason))?;
    if !available {
        return Err(ServiceError::validation(format!(
            "unable to update kafka: {} with kafka version: {}",
            kafka.id, desired_kafka
        )));
    }

    let ready = cluster_service
        .check_strimzi_version_ready(&cluster, desired_strimzi)
        .await
        .map_err(|err| ServiceError::validation(err.reason))?;
    if !ready {
        return Err(ServiceError::validation(format!(
            "unable to update kafka: {} with strimzi version: {}",
            kafka.id, desired_strimzi
        )));
    }

    let current_ibp = first_non_empty(&kafka.actual_kafka_ibp_version, desired_ibp);
    match compare_build_aware_semantic_versions(current_ibp, desired_ibp) {
        Err(_) => {
            return Err(ServiceError::validation(format!(
                "unable to compare actual ibp version: {current_ibp} with desired ibp version: {desired_ibp}"
            )))
        }
        Ok(Ordering::Greater) => {
            return Err(ServiceError::validation(format!(
                "unable to downgrade kafka: {} ibp version: {} to a lower version: {}",
                kafka.id, current_ibp, desired_ibp
            )))
        }
        Ok(_) => {}
    }

    match compare_build_aware_semantic_versions(desired_ibp, desired_kafka) {
        Err(_) => {
            return Err(ServiceError::validation(format!(
                "unable to compare kafka ibp version: {desired_ibp} with kafka version: {desired_kafka}"
            )))
        }
        Ok(Ordering::Greater) => {
            return Err(ServiceError::validation(format!(
                "unable to update kafka: {} ibp version: {} with kafka version: {}",
                kafka.id, desired_ibp, desired_kafka
            )))
        }
        Ok(_) => {}
    }

    let current_kafka = first_non_empty(&kafka.actual_kafka_version, desired_kafka);
    match compare_semantic_versions_major_and_minor(current_kafka, desired_kafka) {
        Err(_) => Err(ServiceError::validation(format!(
            "unable to compare desired kafka version: {desired_kafka} with actual kafka version: {current_kafka}"
        ))),
        Ok(Ordering::Greater) => Err(ServiceError::validation(format!(
            "unable to downgrade kafka: {} version: {} to the following kafka version: {}",
            kafka.id, current_kafka, desired_kafka
        ))),
        Ok(_) => Ok(()),
    }
}
