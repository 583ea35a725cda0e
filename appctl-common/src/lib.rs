//! Configuration logic shared by the `appctl` CLI.
//!
//! Everything in this crate is pure data handling: parsing the app
//! configuration, validating it into a list of [`validation::Issue`]s and
//! normalizing declarative webhook subscriptions. No network access; the
//! only filesystem work is reading extension assets and writing bundles.

pub mod app;
pub mod archive;
pub mod endpoint;
pub mod error;
pub mod extension;
pub mod preprocess;
pub mod validation;
pub mod web;
pub mod webhooks;

pub use app::{
    AppConfiguration, ConfigShape, CurrentAppConfiguration, LegacyAppConfiguration,
    parse_app_configuration, validate_app_configuration,
};
pub use archive::{BundleEntry, create_bundle};
pub use endpoint::{EndpointKind, UrlPolicy, classify_endpoint, validate_url};
pub use error::CommonError;
pub use extension::{
    DeployContext, ExtensionConfig, ExtensionInstance, ExtensionKind,
    validate_function_extensions_with_ui_handle,
};
pub use validation::{Issue, ValidationErrors, Validator};
pub use web::{Web, WebConfiguration, WebType, app_is_launchable};
pub use webhooks::{
    NormalizedSubscription, SubscriptionRules, WebhookSubscription, WebhooksConfig,
    normalize_subscriptions,
};
