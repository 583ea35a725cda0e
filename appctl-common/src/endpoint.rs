//! Webhook endpoint and URL classification.
//!
//! A webhook endpoint is exactly one of:
//! - an HTTPS URL
//! - a Google Pub/Sub URI, `pubsub://{project}:{topic}`
//! - an Amazon EventBridge partner event source ARN,
//!   `arn:aws:events:{region}::event-source/aws.partner/shopify.com/{app_id}/{name}`

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

static PUBSUB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^pubsub://(?<gcp_project_id>[^:]+):(?<gcp_topic>.+)$").expect("valid pubsub regex")
});

static ARN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^arn:aws:events:(?<aws_region>[a-z]{2}-[a-z]+-[0-9]+)::event-source/aws\.partner/shopify\.com(?<test>\.test)?/(?<api_client_id>\d+)/(?<event_source_name>.+)$",
    )
    .expect("valid arn regex")
});

/// Message reported for an endpoint matching none of the accepted formats.
pub const INVALID_ENDPOINT_MESSAGE: &str =
    "Endpoint must be an https URL, a pubsub://{project}:{topic} URI or an EventBridge partner event source ARN";

/// The delivery mechanism an endpoint string designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Https,
    PubSub,
    EventBridge,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Https => "https",
            EndpointKind::PubSub => "pubsub",
            EndpointKind::EventBridge => "eventbridge",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parts of a Pub/Sub endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubEndpoint<'a> {
    pub project: &'a str,
    pub topic: &'a str,
}

/// Parts of an EventBridge partner event source ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBridgeArn<'a> {
    pub region: &'a str,
    pub test_partner: bool,
    pub app_id: &'a str,
    pub event_source_name: &'a str,
}

/// Classify `value`, returning `None` when it matches no endpoint format.
pub fn classify_endpoint(value: &str) -> Option<EndpointKind> {
    if is_https_url(value) {
        Some(EndpointKind::Https)
    } else if parse_pubsub(value).is_some() {
        Some(EndpointKind::PubSub)
    } else if parse_event_bridge_arn(value).is_some() {
        Some(EndpointKind::EventBridge)
    } else {
        None
    }
}

/// Validate an endpoint, returning the message to report when invalid.
pub fn validate_endpoint(value: &str) -> Result<EndpointKind, &'static str> {
    classify_endpoint(value).ok_or(INVALID_ENDPOINT_MESSAGE)
}

pub fn is_https_url(value: &str) -> bool {
    value.starts_with("https://") && validate_url(value, UrlPolicy::HttpsOnly).is_ok()
}

pub fn parse_pubsub(value: &str) -> Option<PubSubEndpoint<'_>> {
    let caps = PUBSUB_RE.captures(value)?;
    Some(PubSubEndpoint {
        project: caps.name("gcp_project_id")?.as_str(),
        topic: caps.name("gcp_topic")?.as_str(),
    })
}

pub fn parse_event_bridge_arn(value: &str) -> Option<EventBridgeArn<'_>> {
    let caps = ARN_RE.captures(value)?;
    Some(EventBridgeArn {
        region: caps.name("aws_region")?.as_str(),
        test_partner: caps.name("test").is_some(),
        app_id: caps.name("api_client_id")?.as_str(),
        event_source_name: caps.name("event_source_name")?.as_str(),
    })
}

/// Which URL schemes a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlPolicy {
    #[default]
    HttpOrHttps,
    HttpsOnly,
}

impl UrlPolicy {
    fn message(&self) -> &'static str {
        match self {
            UrlPolicy::HttpOrHttps => "Invalid url",
            UrlPolicy::HttpsOnly => "Only https urls are allowed",
        }
    }
}

/// Validate a URL field.
///
/// The URL parser silently drops embedded newlines, so they are rejected
/// before parsing.
pub fn validate_url(value: &str, policy: UrlPolicy) -> Result<(), &'static str> {
    if value.contains('\n') || value.contains('\r') {
        return Err(policy.message());
    }
    let url = Url::parse(value).map_err(|_| policy.message())?;
    let allowed = match policy {
        UrlPolicy::HttpOrHttps => value.starts_with("http://") || value.starts_with("https://"),
        UrlPolicy::HttpsOnly => value.starts_with("https://"),
    };
    if !allowed || !url.has_host() {
        return Err(policy.message());
    }
    Ok(())
}
