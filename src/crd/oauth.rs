//! # OAuth Identity Provider Patch
//!
//! The cluster-wide `config.openshift.io/v1` `OAuth` resource is applied as an
//! untyped document. The client secret is never embedded; the patch references
//! the secret holding it by name.

use crate::api::OpenIdIdentityProvider;
use crate::constants::KAFKA_SRE_IDP_SECRET_NAME;
use serde_json::{json, Value};

pub const OAUTH_API_VERSION: &str = "config.openshift.io/v1";
pub const OAUTH_KIND: &str = "OAuth";
/// OpenShift only honours the singleton named `cluster`
pub const OAUTH_RESOURCE_NAME: &str = "cluster";

/// Build the `OAuth/cluster` document registering `provider` as an OpenID identity provider
pub fn identity_provider_document(provider: &OpenIdIdentityProvider) -> Value {
    json!({
        "apiVersion": OAUTH_API_VERSION,
        "kind": OAUTH_KIND,
        "metadata": {
            "name": OAUTH_RESOURCE_NAME,
        },
        "spec": {
            "identityProviders": [
                {
                    "name": provider.name,
                    "mappingMethod": "claim",
                    "type": "OpenID",
                    "openID": {
                        "clientID": provider.client_id,
                        "issuer": provider.issuer,
                        "clientSecret": {
                            "name": KAFKA_SRE_IDP_SECRET_NAME,
                        },
                        "claims": {
                            "email": ["email"],
                            "preferredUsername": ["preferred_username"],
                            "last_name": ["preferred_username"],
                        },
                    },
                }
            ],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SecretString;

    #[test]
    fn test_document_references_secret_by_name_only() {
        let provider = OpenIdIdentityProvider {
            id: String::new(),
            name: "kafka-sre".to_string(),
            client_id: "client".to_string(),
            client_secret: SecretString::new("super-secret-value"),
            issuer: "https://sso.example.com/auth/realms/sre".to_string(),
        };
        let doc = identity_provider_document(&provider);
        let serialized = serde_json::to_string(&doc).unwrap();
        assert!(!serialized.contains("super-secret-value"));

        let idp = &doc["spec"]["identityProviders"][0];
        assert_eq!(idp["openID"]["clientSecret"]["name"], KAFKA_SRE_IDP_SECRET_NAME);
        assert_eq!(idp["mappingMethod"], "claim");
        assert_eq!(idp["type"], "OpenID");
        assert_eq!(doc["metadata"]["name"], "cluster");
    }
}
