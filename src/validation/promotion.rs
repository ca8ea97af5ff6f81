//! # Promotion Validation
//!
//! Gate for billing model promotions of an existing kafka instance (for
//! example `eval` to `standard`). Checks run in a fixed order and the first
//! failure wins:
//!
//! 1. no promotion is already in progress
//! 2. the desired billing model differs from the actual one
//! 3. the actual billing model is promotable
//! 4. the instance status is promotable
//! 5. the desired billing model is a valid destination
//! 6. the quota backend's own rules accept the request
//! 7. marketplace destinations have a valid billing account

use super::{run_validations, Validation};
use crate::api::{KafkaPromoteRequest, KafkaPromotionStatus, KafkaRequest, QuotaType};
use crate::config::PromotionPolicy;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::services::QuotaService;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a quota backend validator sees of a promotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaPromoteValidatorRequest {
    pub desired_kafka_billing_model: String,
    pub desired_marketplace: String,
    pub desired_billing_cloud_account_id: String,
    pub kafka_instance_type: String,
}

/// Quota backend specific promotion rules
pub trait KafkaPromoteValidator: Send + Sync {
    fn validate(&self, request: &KafkaPromoteValidatorRequest) -> ServiceResult<()>;
}

/// Quota management list: entitlement comes from a static allow list, so
/// marketplace billing is not available
#[derive(Debug, Clone)]
pub struct QuotaManagementListPromoteValidator {
    policy: PromotionPolicy,
}

impl QuotaManagementListPromoteValidator {
    pub fn new(policy: PromotionPolicy) -> Self {
        Self { policy }
    }
}

impl KafkaPromoteValidator for QuotaManagementListPromoteValidator {
    fn validate(&self, request: &KafkaPromoteValidatorRequest) -> ServiceResult<()> {
        if self.policy.is_marketplace(&request.desired_kafka_billing_model) {
            return Err(ServiceError::bad_request(format!(
                "kafka billing model {:?} is not supported with {} quota",
                request.desired_kafka_billing_model,
                QuotaType::QuotaManagementList
            )));
        }
        Ok(())
    }
}

/// AMS: marketplace destinations need a marketplace and a cloud account, other
/// destinations must not carry either
#[derive(Debug, Clone)]
pub struct AmsPromoteValidator {
    policy: PromotionPolicy,
}

impl AmsPromoteValidator {
    pub fn new(policy: PromotionPolicy) -> Self {
        Self { policy }
    }
}

impl KafkaPromoteValidator for AmsPromoteValidator {
    fn validate(&self, request: &KafkaPromoteValidatorRequest) -> ServiceResult<()> {
        let has_marketplace = !request.desired_marketplace.trim().is_empty();
        let has_cloud_account = !request.desired_billing_cloud_account_id.trim().is_empty();

        if self.policy.is_marketplace(&request.desired_kafka_billing_model) {
            if !has_marketplace || !has_cloud_account {
                return Err(ServiceError::new(
                    ErrorKind::InvalidBillingAccount,
                    format!(
                        "kafka billing model {:?} requires a marketplace and a billing cloud account id",
                        request.desired_kafka_billing_model
                    ),
                ));
            }
        } else if has_marketplace || has_cloud_account {
            return Err(ServiceError::bad_request(format!(
                "marketplace and billing cloud account id are only allowed for marketplace billing, not {:?}",
                request.desired_kafka_billing_model
            )));
        }
        Ok(())
    }
}

/// Promotion validators keyed by quota backend
#[derive(Clone)]
pub struct KafkaPromoteValidatorFactory {
    validators: BTreeMap<QuotaType, Arc<dyn KafkaPromoteValidator>>,
}

impl std::fmt::Debug for KafkaPromoteValidatorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaPromoteValidatorFactory")
            .field("quota_types", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KafkaPromoteValidatorFactory {
    /// Factory with the validators of every supported quota backend
    pub fn new(policy: &PromotionPolicy) -> Self {
        Self::empty()
            .register(
                QuotaType::QuotaManagementList,
                Arc::new(QuotaManagementListPromoteValidator::new(policy.clone())),
            )
            .register(QuotaType::Ams, Arc::new(AmsPromoteValidator::new(policy.clone())))
    }

    pub fn empty() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn register(mut self, quota_type: QuotaType, validator: Arc<dyn KafkaPromoteValidator>) -> Self {
        self.validators.insert(quota_type, validator);
        self
    }

    pub fn get_validator(&self, quota_type: QuotaType) -> ServiceResult<Arc<dyn KafkaPromoteValidator>> {
        self.validators
            .get(&quota_type)
            .map(Arc::clone)
            .ok_or_else(|| {
                ServiceError::general(format!(
                    "no kafka promotion validator for quota type {quota_type}"
                ))
            })
    }
}

fn validate_no_promotion_in_progress(kafka: &KafkaRequest) -> ServiceResult<()> {
    if kafka.promotion_status == KafkaPromotionStatus::Promoting {
        return Err(ServiceError::conflict(format!(
            "promotion already in progress. kafka request {:?} is being promoted from kafka billing {:?} to {:?}",
            kafka.id, kafka.actual_kafka_billing_model, kafka.desired_kafka_billing_model
        )));
    }
    Ok(())
}

fn validate_different_billing_model(
    request: &KafkaPromoteRequest,
    kafka: &KafkaRequest,
) -> ServiceResult<()> {
    if request.desired_kafka_billing_model == kafka.actual_kafka_billing_model {
        return Err(ServiceError::bad_request(format!(
            "kafka request {:?} already has {:?} kafka billing model",
            kafka.id, kafka.actual_kafka_billing_model
        )));
    }
    Ok(())
}

fn validate_promotable_billing_model(kafka: &KafkaRequest, policy: &PromotionPolicy) -> ServiceResult<()> {
    if !policy
        .promotable_billing_models
        .contains(&kafka.actual_kafka_billing_model)
    {
        return Err(ServiceError::bad_request(format!(
            "kafka request {:?} has a kafka billing model {:?}. Only kafka requests with a kafka billing model in {:?} can be promoted",
            kafka.id, kafka.actual_kafka_billing_model, policy.promotable_billing_models
        )));
    }
    Ok(())
}

fn validate_promotable_status(kafka: &KafkaRequest, policy: &PromotionPolicy) -> ServiceResult<()> {
    if !policy.promotable_statuses.contains(&kafka.status) {
        let statuses: Vec<&str> = policy
            .promotable_statuses
            .iter()
            .map(|status| status.as_str())
            .collect();
        return Err(ServiceError::bad_request(format!(
            "kafka request {:?} with status {:?} cannot be promoted: promotable status are: {:?}",
            kafka.id,
            kafka.status.as_str(),
            statuses
        )));
    }
    Ok(())
}

fn validate_promotion_destination(
    request: &KafkaPromoteRequest,
    policy: &PromotionPolicy,
) -> ServiceResult<()> {
    if !policy
        .promotion_destinations
        .contains(&request.desired_kafka_billing_model)
    {
        return Err(ServiceError::validation(format!(
            "desired kafka billing model {:?} promotion destination is not allowed",
            request.desired_kafka_billing_model
        )));
    }
    Ok(())
}

fn validate_with_quota_backend(
    request: &KafkaPromoteRequest,
    kafka: &KafkaRequest,
    quota_type: QuotaType,
    factory: &KafkaPromoteValidatorFactory,
) -> ServiceResult<()> {
    let validator = factory.get_validator(quota_type)?;
    validator
        .validate(&KafkaPromoteValidatorRequest {
            desired_kafka_billing_model: request.desired_kafka_billing_model.clone(),
            desired_marketplace: request.desired_marketplace.clone(),
            desired_billing_cloud_account_id: request.desired_billing_cloud_account_id.clone(),
            kafka_instance_type: kafka.instance_type.clone(),
        })
        .map_err(|err| {
            ServiceError::new(err.kind, format!("error performing promotion: {}", err.reason))
        })
}

async fn validate_marketplace_billing_account(
    request: &KafkaPromoteRequest,
    kafka: &KafkaRequest,
    policy: &PromotionPolicy,
    quota: &dyn QuotaService,
) -> ServiceResult<()> {
    if !policy.is_marketplace(&request.desired_kafka_billing_model) {
        return Ok(());
    }
    quota
        .validate_billing_account(
            &kafka.organisation_id,
            &kafka.instance_type,
            &request.desired_kafka_billing_model,
            &request.desired_billing_cloud_account_id,
            Some(request.desired_marketplace.as_str()),
        )
        .await
}

/// Validate a billing model promotion of `kafka`
pub async fn validate_kafka_promotion(
    kafka: &KafkaRequest,
    request: &KafkaPromoteRequest,
    policy: &PromotionPolicy,
    quota_type: QuotaType,
    factory: &KafkaPromoteValidatorFactory,
    quota: &dyn QuotaService,
) -> ServiceResult<()> {
    let validations: Vec<Validation<'_>> = vec![
        async move { validate_no_promotion_in_progress(kafka) }.boxed(),
        async move { validate_different_billing_model(request, kafka) }.boxed(),
        async move { validate_promotable_billing_model(kafka, policy) }.boxed(),
        async move { validate_promotable_status(kafka, policy) }.boxed(),
        async move { validate_promotion_destination(request, policy) }.boxed(),
        async move { validate_with_quota_backend(request, kafka, quota_type, factory) }.boxed(),
        validate_marketplace_billing_account(request, kafka, policy, quota).boxed(),
    ];
    run_validations("promotion", validations).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{billing_model, KafkaStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingQuota {
        billing_checks: AtomicUsize,
        reject: bool,
    }

    #[async_trait]
    impl QuotaService for RecordingQuota {
        async fn assign_instance_type(&self, _owner: &str, _organisation_id: &str) -> ServiceResult<String> {
            Ok("standard".to_string())
        }

        async fn validate_billing_account(
            &self,
            _organisation_id: &str,
            _instance_type: &str,
            _billing_model: &str,
            _billing_cloud_account_id: &str,
            _marketplace: Option<&str>,
        ) -> ServiceResult<()> {
            self.billing_checks.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ServiceError::new(
                    ErrorKind::InvalidBillingAccount,
                    "billing account is not entitled",
                ));
            }
            Ok(())
        }
    }

    fn eval_kafka() -> KafkaRequest {
        KafkaRequest {
            id: "kafka-1".to_string(),
            organisation_id: "org-1".to_string(),
            instance_type: "standard".to_string(),
            status: KafkaStatus::Ready,
            actual_kafka_billing_model: billing_model::EVAL.to_string(),
            ..Default::default()
        }
    }

    fn promote_to(model: &str) -> KafkaPromoteRequest {
        KafkaPromoteRequest {
            desired_kafka_billing_model: model.to_string(),
            ..Default::default()
        }
    }

    async fn promote(
        kafka: &KafkaRequest,
        request: &KafkaPromoteRequest,
        quota_type: QuotaType,
        quota: &RecordingQuota,
    ) -> ServiceResult<()> {
        let policy = PromotionPolicy::default();
        let factory = KafkaPromoteValidatorFactory::new(&policy);
        validate_kafka_promotion(kafka, request, &policy, quota_type, &factory, quota).await
    }

    #[tokio::test]
    async fn test_eval_to_standard_is_accepted() {
        let quota = RecordingQuota::default();
        promote(
            &eval_kafka(),
            &promote_to(billing_model::STANDARD),
            QuotaType::QuotaManagementList,
            &quota,
        )
        .await
        .unwrap();
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_promotion_in_progress_wins_over_other_failures() {
        let mut kafka = eval_kafka();
        kafka.promotion_status = KafkaPromotionStatus::Promoting;
        kafka.status = KafkaStatus::Failed;
        let err = promote(
            &kafka,
            &promote_to(billing_model::EVAL),
            QuotaType::QuotaManagementList,
            &RecordingQuota::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert!(err.reason.contains("already in progress"));
    }

    #[tokio::test]
    async fn test_same_billing_model_is_rejected() {
        let err = promote(
            &eval_kafka(),
            &promote_to(billing_model::EVAL),
            QuotaType::QuotaManagementList,
            &RecordingQuota::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
        assert!(err.reason.contains("already has"));
    }

    #[tokio::test]
    async fn test_only_eval_can_be_promoted() {
        let mut kafka = eval_kafka();
        kafka.actual_kafka_billing_model = billing_model::STANDARD.to_string();
        let err = promote(
            &kafka,
            &promote_to(billing_model::MARKETPLACE),
            QuotaType::Ams,
            &RecordingQuota::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_status_must_be_promotable() {
        let mut kafka = eval_kafka();
        kafka.status = KafkaStatus::Provisioning;
        let err = promote(
            &kafka,
            &promote_to(billing_model::STANDARD),
            QuotaType::QuotaManagementList,
            &RecordingQuota::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));

        kafka.status = KafkaStatus::Suspended;
        assert!(promote(
            &kafka,
            &promote_to(billing_model::STANDARD),
            QuotaType::QuotaManagementList,
            &RecordingQuota::default(),
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_destination_must_be_allowed() {
        let err = promote(
            &eval_kafka(),
            &promote_to(billing_model::ENTERPRISE),
            QuotaType::QuotaManagementList,
            &RecordingQuota::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_quota_list_refuses_marketplace() {
        let quota = RecordingQuota::default();
        let err = promote(
            &eval_kafka(),
            &promote_to(billing_model::MARKETPLACE),
            QuotaType::QuotaManagementList,
            &quota,
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
        assert!(err.reason.starts_with("error performing promotion"));
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ams_marketplace_checks_billing_account() {
        let request = KafkaPromoteRequest {
            desired_kafka_billing_model: billing_model::MARKETPLACE.to_string(),
            desired_marketplace: "aws".to_string(),
            desired_billing_cloud_account_id: "123456789012".to_string(),
        };

        let quota = RecordingQuota::default();
        promote(&eval_kafka(), &request, QuotaType::Ams, &quota)
            .await
            .unwrap();
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 1);

        let rejecting = RecordingQuota {
            reject: true,
            ..Default::default()
        };
        let err = promote(&eval_kafka(), &request, QuotaType::Ams, &rejecting)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidBillingAccount));
    }

    #[tokio::test]
    async fn test_ams_marketplace_requires_cloud_account() {
        let request = KafkaPromoteRequest {
            desired_kafka_billing_model: billing_model::MARKETPLACE.to_string(),
            desired_marketplace: "aws".to_string(),
            desired_billing_cloud_account_id: String::new(),
        };
        let quota = RecordingQuota::default();
        let err = promote(&eval_kafka(), &request, QuotaType::Ams, &quota)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidBillingAccount));
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_factory_without_validator() {
        let factory = KafkaPromoteValidatorFactory::empty();
        assert!(factory.get_validator(QuotaType::Ams).is_err());
    }
}
