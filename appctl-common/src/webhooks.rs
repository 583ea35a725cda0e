//! Declarative webhook subscriptions.
//!
//! The `[webhooks]` table of an app configuration declares subscriptions on
//! three levels:
//!
//! ```toml
//! [webhooks]
//! api_version = "2024-01"
//! endpoint = "https://example.com"          # top-level endpoint
//! topics = ["products/create"]              # delivered to the top-level endpoint
//!
//! [[webhooks.subscriptions]]
//! topic = "products/delete"
//! path = "/delete"                          # appended to an endpoint
//!
//! [[webhooks.subscriptions]]
//! topic = "orders/create"
//! endpoint = "pubsub://project:topic"       # replaces the top-level endpoint
//! ```
//!
//! [`normalize_subscriptions`] flattens these into the list submitted to the
//! platform.

use crate::endpoint::{UrlPolicy, validate_endpoint, validate_url};
use crate::preprocess::deserialize_endpoint;
use crate::validation::{Issue, field, index};
use serde::{Deserialize, Serialize};

pub const PATH_RULE_MESSAGE: &str =
    "Path must start with a forward slash and be longer than 1 character";

/// The `[webhooks]` table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WebhooksConfig {
    /// API version webhook payloads are rendered with.
    pub api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_compliance: Option<PrivacyCompliance>,

    /// Topics delivered to the top-level `endpoint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,

    /// Default endpoint, stored without trailing slashes.
    #[serde(
        default,
        deserialize_with = "deserialize_endpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<WebhookSubscription>>,
}

/// Mandatory privacy compliance webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct PrivacyCompliance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_deletion_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_data_request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_deletion_url: Option<String>,
}

/// One `[[webhooks.subscriptions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WebhookSubscription {
    pub topic: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_fields: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafield_namespaces: Option<Vec<String>>,

    /// Replaces the top-level endpoint for this topic.
    #[serde(
        default,
        deserialize_with = "deserialize_endpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint: Option<String>,

    /// Suffix appended to the resolved endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A fully resolved subscription, as submitted to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSubscription {
    pub endpoint: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafield_namespaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,
}

impl NormalizedSubscription {
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic: topic.into(),
            include_fields: None,
            metafield_namespaces: None,
            sub_topic: None,
        }
    }
}

/// Whether the cross-field subscription rules run during validation.
///
/// The rules reject configurations the platform currently still accepts, so
/// they are off unless requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionRules {
    #[default]
    Disabled,
    Enforced,
}

impl WebhooksConfig {
    pub fn topics(&self) -> &[String] {
        self.topics.as_deref().unwrap_or_default()
    }

    pub fn subscriptions(&self) -> &[WebhookSubscription] {
        self.subscriptions.as_deref().unwrap_or_default()
    }

    /// True when the config declares at least one subscription on any level.
    pub fn declares_subscriptions(&self) -> bool {
        !self.topics().is_empty() || !self.subscriptions().is_empty()
    }
}

/// Flatten a webhooks config into one record per subscription.
///
/// Top-level topics come first, in order, followed by one record per
/// `subscriptions` entry, in order. Nothing is deduplicated.
pub fn normalize_subscriptions(config: &WebhooksConfig) -> Vec<NormalizedSubscription> {
    let base = config.endpoint.as_deref().map(strip_slashes);
    if base.is_none() && config.declares_subscriptions() {
        tracing::warn!("normalizing webhook subscriptions without a top-level endpoint");
    }
    let base = base.unwrap_or_default();

    let top_level = config
        .topics()
        .iter()
        .map(|topic| NormalizedSubscription::new(base, topic.as_str()));

    let overrides = config.subscriptions().iter().map(|sub| {
        let endpoint = resolve_endpoint(base, sub);
        NormalizedSubscription {
            endpoint,
            topic: sub.topic.clone(),
            include_fields: sub.include_fields.clone(),
            metafield_namespaces: sub.metafield_namespaces.clone(),
            sub_topic: sub.sub_topic.clone(),
        }
    });

    top_level.chain(overrides).collect()
}

fn resolve_endpoint(base: &str, sub: &WebhookSubscription) -> String {
    let endpoint = sub.endpoint.as_deref().map(strip_slashes).unwrap_or(base);
    match &sub.path {
        Some(path) => format!("{endpoint}{path}"),
        None => endpoint.to_string(),
    }
}

fn strip_slashes(value: &str) -> &str {
    crate::preprocess::remove_trailing_slash(value)
}

fn path_is_valid(path: &str) -> bool {
    path.starts_with('/') && path.chars().count() > 1
}

/// Topics declared at the top level need a top-level endpoint.
pub fn validate_top_level_subscriptions(config: &WebhooksConfig) -> Option<Issue> {
    if !config.topics().is_empty() && config.endpoint.is_none() {
        return Some(Issue::new(
            "webhooks.endpoint",
            "A top-level endpoint is required when top-level topics are declared",
        ));
    }
    None
}

/// Every subscription must be able to resolve an endpoint and carry a valid path.
///
/// Reports the first offending entry.
pub fn validate_inner_subscriptions(config: &WebhooksConfig) -> Option<Issue> {
    for (i, sub) in config.subscriptions().iter().enumerate() {
        let entry = index("webhooks.subscriptions", i);
        if sub.endpoint.is_none() && config.endpoint.is_none() {
            let message = if sub.path.is_some() {
                format!(
                    "Subscription for '{}' has a path but no endpoint to append it to",
                    sub.topic
                )
            } else {
                format!(
                    "Subscription for '{}' needs an endpoint, either its own or a top-level one",
                    sub.topic
                )
            };
            return Some(Issue::new(field(&entry, "endpoint"), message));
        }
        if let Some(path) = &sub.path
            && !path_is_valid(path)
        {
            return Some(Issue::new(field(&entry, "path"), PATH_RULE_MESSAGE));
        }
    }
    None
}

/// Validate the `[webhooks]` table, collecting every issue.
pub fn validate_webhooks(config: &WebhooksConfig, rules: SubscriptionRules) -> Vec<Issue> {
    let mut issues = Vec::new();

    if let Some(topics) = &config.topics
        && topics.is_empty()
    {
        issues.push(Issue::new(
            "webhooks.topics",
            "topics must contain at least one topic",
        ));
    }

    if let Some(endpoint) = &config.endpoint
        && let Err(message) = validate_endpoint(endpoint)
    {
        issues.push(Issue::new("webhooks.endpoint", message));
    }

    for (i, sub) in config.subscriptions().iter().enumerate() {
        let entry = index("webhooks.subscriptions", i);
        if let Some(endpoint) = &sub.endpoint
            && let Err(message) = validate_endpoint(endpoint)
        {
            issues.push(Issue::new(field(&entry, "endpoint"), message));
        }
        if let Some(path) = &sub.path
            && !path_is_valid(path)
        {
            issues.push(Issue::new(field(&entry, "path"), PATH_RULE_MESSAGE));
        }
    }

    if let Some(privacy) = &config.privacy_compliance {
        let urls = [
            ("customer_deletion_url", &privacy.customer_deletion_url),
            ("customer_data_request_url", &privacy.customer_data_request_url),
            ("shop_deletion_url", &privacy.shop_deletion_url),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                let path = field("webhooks.privacy_compliance", name);
                if let Err(message) = validate_url(url, UrlPolicy::HttpsOnly) {
                    issues.push(Issue::new(path, message));
                } else if url.ends_with('/') {
                    issues.push(Issue::new(path, "URL can’t end with a forward slash"));
                }
            }
        }
    }

    if rules == SubscriptionRules::Enforced {
        if let Some(issue) = validate_top_level_subscriptions(config) {
            issues.push(issue);
        } else if let Some(issue) = validate_inner_subscriptions(config) {
            issues.push(issue);
        }
    }

    issues
}
