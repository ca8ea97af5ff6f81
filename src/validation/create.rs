//! # Create Validation
//!
//! Checks applied to a kafka creation request before it is accepted: caller
//! claims, naming, cloud provider and region, plan, billing model and billing
//! account.
//!
//! The instance type a request is validated against is the one the quota
//! backend assigns to the caller, never one taken from the payload.

use super::claims::{validate_kafka_claims, validate_organisation_id, validate_username};
use super::{run_validations, validate_kafka_cluster_name, NameRules, Validation};
use crate::api::{billing_model, Claims, KafkaRequestPayload};
use crate::config::{parse_plan, KafkaConfig, ProviderConfig};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::services::{KafkaService, QuotaService};
use futures::FutureExt;

/// Validates kafka creation requests against the configured instance types and cloud providers
pub struct KafkaCreateValidator<'a> {
    kafka_service: &'a dyn KafkaService,
    quota: &'a dyn QuotaService,
    kafka_config: &'a KafkaConfig,
    provider_config: &'a ProviderConfig,
    name_rules: &'a NameRules,
}

impl std::fmt::Debug for KafkaCreateValidator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaCreateValidator")
            .field("name_rules", self.name_rules)
            .field("providers", &self.provider_config.provider_names())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.trim().is_empty())
}

impl<'a> KafkaCreateValidator<'a> {
    pub fn new(
        kafka_service: &'a dyn KafkaService,
        quota: &'a dyn QuotaService,
        kafka_config: &'a KafkaConfig,
        provider_config: &'a ProviderConfig,
        name_rules: &'a NameRules,
    ) -> Self {
        Self {
            kafka_service,
            quota,
            kafka_config,
            provider_config,
            name_rules,
        }
    }

    /// Run every create check in order, returning the first failure
    pub async fn validate(
        &self,
        claims: Option<&Claims>,
        payload: &KafkaRequestPayload,
    ) -> ServiceResult<()> {
        let validations: Vec<Validation<'_>> = vec![
            async move {
                validate_kafka_claims(claims, &[validate_username, validate_organisation_id])
            }
            .boxed(),
            async move { validate_kafka_cluster_name(&payload.name, "name", self.name_rules) }
                .boxed(),
            self.validate_name_is_unique(&payload.name).boxed(),
            self.validate_cloud_provider(claims, payload).boxed(),
            self.validate_plan(claims, payload).boxed(),
            self.validate_billing_model(claims, payload).boxed(),
            self.validate_billing_account(claims, payload).boxed(),
        ];
        run_validations("create", validations).await
    }

    async fn assigned_instance_type(&self, claims: Option<&Claims>) -> ServiceResult<String> {
        let claims = crate::api::require_claims(claims)?;
        let owner = claims.username()?;
        let organisation_id = claims.org_id()?;
        self.quota
            .assign_instance_type(owner, organisation_id)
            .await
            .map_err(|err| {
                ServiceError::with_cause(
                    ErrorKind::General,
                    err.into(),
                    "error assigning instance type",
                )
            })
    }

    async fn validate_name_is_unique(&self, name: &str) -> ServiceResult<()> {
        if self.kafka_service.count_by_name(name).await? > 0 {
            return Err(ServiceError::new(
                ErrorKind::DuplicateKafkaClusterName,
                format!("kafka cluster name {name:?} is already used"),
            ));
        }
        Ok(())
    }

    /// Provider and region must be supported unless the kafka goes to a dedicated cluster
    async fn validate_cloud_provider(
        &self,
        claims: Option<&Claims>,
        payload: &KafkaRequestPayload,
    ) -> ServiceResult<()> {
        let dedicated = payload.dedicated_cluster_id().is_some();
        let provider_name = if payload.cloud_provider.trim().is_empty() {
            self.provider_config
                .default_provider()
                .map(|provider| provider.name.as_str())
                .unwrap_or_default()
        } else {
            payload.cloud_provider.as_str()
        };

        let provider = match self.provider_config.provider(provider_name) {
            Some(provider) => provider,
            None if dedicated => return Ok(()),
            None => {
                return Err(ServiceError::new(
                    ErrorKind::ProviderNotSupported,
                    format!(
                        "provider {} is not supported, supported providers are: {:?}",
                        provider_name,
                        self.provider_config.provider_names()
                    ),
                ))
            }
        };
        if dedicated {
            return Ok(());
        }

        let region = if payload.region.trim().is_empty() {
            provider.default_region()
        } else {
            let region = provider.region(&payload.region);
            if region.is_none() {
                return Err(ServiceError::new(
                    ErrorKind::RegionNotSupported,
                    format!(
                        "region {} is not supported for {}, supported regions are: {:?}",
                        payload.region,
                        provider.name,
                        provider.region_names()
                    ),
                ));
            }
            region
        };

        let instance_type = self.assigned_instance_type(claims).await?;
        if !region.is_some_and(|region| region.supports_instance_type(&instance_type)) {
            return Err(ServiceError::new(
                ErrorKind::InstanceTypeNotSupported,
                format!(
                    "instance type {:?} not supported for region {:?}",
                    instance_type,
                    region.map(|region| region.name.as_str()).unwrap_or_default()
                ),
            ));
        }
        Ok(())
    }

    /// A plan names the assigned instance type and one of its sizes; without a plan the
    /// instance type must have at least one size
    async fn validate_plan(
        &self,
        claims: Option<&Claims>,
        payload: &KafkaRequestPayload,
    ) -> ServiceResult<()> {
        let instance_type = self.assigned_instance_type(claims).await?;

        if payload.plan.trim().is_empty() {
            if self.kafka_config.first_available_size(&instance_type).is_none() {
                return Err(ServiceError::new(
                    ErrorKind::InstanceTypeNotSupported,
                    format!("unsupported kafka instance type: {instance_type:?} provided"),
                ));
            }
            return Ok(());
        }

        let plan = payload.plan.as_str();
        let Some((plan_instance_type, size)) = parse_plan(plan) else {
            return Err(ServiceError::bad_request(format!(
                "unable to detect instance type in plan provided: {plan:?}"
            )));
        };
        if plan_instance_type != instance_type {
            return Err(ServiceError::bad_request(format!(
                "unable to detect instance type in plan provided: {plan:?}"
            )));
        }
        if self
            .kafka_config
            .instance_size(plan_instance_type, size)
            .is_none()
        {
            return Err(ServiceError::new(
                ErrorKind::InstancePlanNotSupported,
                format!("unsupported plan provided: {plan:?}"),
            ));
        }
        Ok(())
    }

    /// Enterprise billing and a dedicated cluster id go together; any other model must be
    /// supported by the assigned instance type
    async fn validate_billing_model(
        &self,
        claims: Option<&Claims>,
        payload: &KafkaRequestPayload,
    ) -> ServiceResult<()> {
        let Some(model) = non_empty(payload.billing_model.as_ref()) else {
            return Ok(());
        };
        let is_enterprise = model.eq_ignore_ascii_case(billing_model::ENTERPRISE);
        let dedicated = payload.dedicated_cluster_id().is_some();

        if dedicated && !is_enterprise {
            return Err(ServiceError::new(
                ErrorKind::InvalidBillingAccount,
                format!(
                    "invalid billing model: {model:?}, only {:?} is allowed",
                    billing_model::ENTERPRISE
                ),
            ));
        }
        if !dedicated && is_enterprise {
            return Err(ServiceError::bad_request(format!(
                "cluster_id must be supplied when selected billing model is: {:?}",
                billing_model::ENTERPRISE
            )));
        }

        let instance_type = self.assigned_instance_type(claims).await?;
        let instance_type_config = self.kafka_config.instance_type(&instance_type).ok_or_else(|| {
            ServiceError::new(
                ErrorKind::InstanceTypeNotSupported,
                format!("unsupported kafka instance type: {instance_type:?}"),
            )
        })?;
        if !instance_type_config.supports_billing_model(model) {
            return Err(ServiceError::bad_request(format!(
                "kafka billing model {model:?} is not supported by instance type {instance_type:?}"
            )));
        }
        Ok(())
    }

    /// Marketplace billing needs a cloud account; a supplied account is checked by the quota backend
    async fn validate_billing_account(
        &self,
        claims: Option<&Claims>,
        payload: &KafkaRequestPayload,
    ) -> ServiceResult<()> {
        let cloud_account = non_empty(payload.billing_cloud_account_id.as_ref());
        let marketplace = non_empty(payload.marketplace.as_ref());

        let cloud_account = match (cloud_account, marketplace) {
            (None, None) => return Ok(()),
            (None, Some(marketplace)) => {
                return Err(ServiceError::new(
                    ErrorKind::InvalidBillingAccount,
                    format!("no billing account provided for marketplace: {marketplace}"),
                ))
            }
            (Some(cloud_account), _) => cloud_account,
        };

        let instance_type = self.assigned_instance_type(claims).await?;
        let claims = crate::api::require_claims(claims)?;
        self.quota
            .validate_billing_account(
                claims.org_id()?,
                &instance_type,
                payload.billing_model.as_deref().unwrap_or_default(),
                cloud_account,
                marketplace,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Names {
        taken: Vec<&'static str>,
    }

    #[async_trait]
    impl KafkaService for Names {
        async fn count_by_name(&self, name: &str) -> ServiceResult<u64> {
            Ok(self.taken.iter().filter(|taken| **taken == name).count() as u64)
        }
    }

    struct Entitlement {
        instance_type: &'static str,
        billing_checks: AtomicUsize,
    }

    impl Entitlement {
        fn of(instance_type: &'static str) -> Self {
            Self {
                instance_type,
                billing_checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuotaService for Entitlement {
        async fn assign_instance_type(&self, _owner: &str, _organisation_id: &str) -> ServiceResult<String> {
            Ok(self.instance_type.to_string())
        }

        async fn validate_billing_account(
            &self,
            _organisation_id: &str,
            _instance_type: &str,
            _billing_model: &str,
            billing_cloud_account_id: &str,
            _marketplace: Option<&str>,
        ) -> ServiceResult<()> {
            self.billing_checks.fetch_add(1, Ordering::SeqCst);
            if billing_cloud_account_id == "unknown" {
                return Err(ServiceError::new(
                    ErrorKind::InvalidBillingAccount,
                    "billing account id missing or invalid",
                ));
            }
            Ok(())
        }
    }

    fn payload(name: &str) -> KafkaRequestPayload {
        KafkaRequestPayload {
            name: name.to_string(),
            cloud_provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            ..Default::default()
        }
    }

    async fn validate(quota: &Entitlement, payload: &KafkaRequestPayload) -> ServiceResult<()> {
        let names = Names {
            taken: vec!["existing"],
        };
        let kafka_config = KafkaConfig::default();
        let provider_config = ProviderConfig::default();
        let rules = NameRules::from_config(&kafka_config).unwrap();
        let claims = Claims::new("alice", "org-1", false);
        KafkaCreateValidator::new(&names, quota, &kafka_config, &provider_config, &rules)
            .validate(Some(&claims), payload)
            .await
    }

    #[tokio::test]
    async fn test_minimal_request_is_accepted() {
        let quota = Entitlement::of("standard");
        validate(&quota, &payload("my-kafka")).await.unwrap();
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_rejected() {
        let names = Names { taken: vec![] };
        let quota = Entitlement::of("standard");
        let kafka_config = KafkaConfig::default();
        let provider_config = ProviderConfig::default();
        let rules = NameRules::from_config(&kafka_config).unwrap();
        let err = KafkaCreateValidator::new(&names, &quota, &kafka_config, &provider_config, &rules)
            .validate(None, &payload("my-kafka"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthenticated));
    }

    #[tokio::test]
    async fn test_name_rules() {
        let quota = Entitlement::of("standard");
        let err = validate(&quota, &payload("My_Kafka")).await.unwrap_err();
        assert!(err.is(ErrorKind::MalformedKafkaClusterName));

        let err = validate(&quota, &payload("existing")).await.unwrap_err();
        assert!(err.is(ErrorKind::DuplicateKafkaClusterName));
    }

    #[tokio::test]
    async fn test_unknown_provider_and_region() {
        let quota = Entitlement::of("standard");
        let mut request = payload("my-kafka");
        request.cloud_provider = "azure".to_string();
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::ProviderNotSupported));

        let mut request = payload("my-kafka");
        request.region = "mars-north-1".to_string();
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::RegionNotSupported));

        let mut request = payload("my-kafka");
        request.cloud_provider = String::new();
        request.region = String::new();
        assert!(validate(&quota, &request).await.is_ok());
    }

    #[tokio::test]
    async fn test_dedicated_cluster_skips_region_checks() {
        let quota = Entitlement::of("standard");
        let request = KafkaRequestPayload {
            cloud_provider: "azure".to_string(),
            region: "mars-north-1".to_string(),
            billing_model: Some("enterprise".to_string()),
            cluster_id: Some("a".repeat(32)),
            ..payload("my-kafka")
        };
        assert!(validate(&quota, &request).await.is_ok());
    }

    #[tokio::test]
    async fn test_plan_must_match_assigned_instance_type() {
        let quota = Entitlement::of("standard");
        let mut request = payload("my-kafka");

        request.plan = "standard.x2".to_string();
        assert!(validate(&quota, &request).await.is_ok());

        request.plan = "developer.x1".to_string();
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));

        request.plan = "standard.x9".to_string();
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::InstancePlanNotSupported));

        request.plan = "standard".to_string();
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_enterprise_billing_and_cluster_id_go_together() {
        let quota = Entitlement::of("standard");

        let request = KafkaRequestPayload {
            billing_model: Some("enterprise".to_string()),
            ..payload("my-kafka")
        };
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));

        let request = KafkaRequestPayload {
            billing_model: Some("standard".to_string()),
            cluster_id: Some("a".repeat(32)),
            ..payload("my-kafka")
        };
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidBillingAccount));
    }

    #[tokio::test]
    async fn test_billing_model_must_be_supported_by_instance_type() {
        let quota = Entitlement::of("developer");
        let request = KafkaRequestPayload {
            billing_model: Some("marketplace".to_string()),
            ..payload("my-kafka")
        };
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_marketplace_requires_cloud_account() {
        let quota = Entitlement::of("standard");
        let request = KafkaRequestPayload {
            billing_model: Some("marketplace".to_string()),
            marketplace: Some("aws".to_string()),
            ..payload("my-kafka")
        };
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidBillingAccount));
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 0);

        let request = KafkaRequestPayload {
            billing_model: Some("marketplace".to_string()),
            marketplace: Some("aws".to_string()),
            billing_cloud_account_id: Some("123456789012".to_string()),
            ..payload("my-kafka")
        };
        validate(&quota, &request).await.unwrap();
        assert_eq!(quota.billing_checks.load(Ordering::SeqCst), 1);

        let request = KafkaRequestPayload {
            billing_cloud_account_id: Some("unknown".to_string()),
            ..payload("my-kafka")
        };
        let err = validate(&quota, &request).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidBillingAccount));
    }
}
