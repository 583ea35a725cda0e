//! Partners API access.
//!
//! Every remote operation of the CLI goes through the [`PartnersApi`] trait.
//! [`HttpPartnersClient`] talks JSON to `{partners_url}/api/apps/{api_key}/...`
//! with a bearer token.

use anyhow::{Context, Result};
use appctl_common::NormalizedSubscription;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::AppctlError;

/// An extension registered remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteExtension {
    pub id: String,
    pub uuid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub extension_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRegistrations {
    #[serde(default)]
    pub extension_registrations: Vec<RemoteExtension>,
    #[serde(default)]
    pub dashboard_managed_extension_registrations: Vec<RemoteExtension>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationOptions {
    #[serde(default)]
    pub management_experience: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpecification {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub options: SpecificationOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppModuleVersion {
    pub registration_id: String,
    pub registration_uuid: String,
    pub registration_title: String,
    #[serde(rename = "type")]
    pub module_type: String,
    #[serde(default)]
    pub specification: Option<ModuleSpecification>,
}

impl AppModuleVersion {
    pub fn is_dashboard_managed(&self) -> bool {
        self.specification
            .as_ref()
            .is_some_and(|s| s.options.management_experience == "dashboard")
    }
}

/// The version currently released to users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAppVersion {
    #[serde(default)]
    pub app_module_versions: Vec<AppModuleVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBetas {
    #[serde(default)]
    pub declarative_webhooks: bool,
    #[serde(default)]
    pub unified_app_deployment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExtension {
    pub title: String,
    pub handle: String,
    #[serde(rename = "type")]
    pub extension_type: String,
}

/// One module of an uploaded version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppModule {
    pub uuid: String,
    /// JSON-encoded deploy configuration.
    pub config: String,
    pub context: String,
    pub handle: String,
}

/// A version upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleUpload {
    pub bundle_path: Option<PathBuf>,
    pub app_modules: Vec<AppModule>,
    pub extension_ids: BTreeMap<String, String>,
    pub release: bool,
    pub message: Option<String>,
    pub version: Option<String>,
    pub commit_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadValidationError {
    pub uuid: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    #[serde(default)]
    pub validation_errors: Vec<UploadValidationError>,
    pub version_tag: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deploy_error: Option<String>,
    pub location: String,
}

/// Remote operations used by deploy and draft push.
pub trait PartnersApi {
    fn app_extension_registrations(&self, api_key: &str) -> Result<ExtensionRegistrations>;

    fn active_app_version(&self, api_key: &str) -> Result<Option<ActiveAppVersion>>;

    fn app_betas(&self, api_key: &str) -> Result<AppBetas>;

    fn create_extension(&self, api_key: &str, extension: &NewExtension) -> Result<RemoteExtension>;

    /// Upload a compiled function, returning its module id.
    fn upload_function(&self, api_key: &str, handle: &str, wasm: &[u8]) -> Result<String>;

    fn upload_extensions_bundle(&self, api_key: &str, upload: &BundleUpload) -> Result<UploadResult>;

    fn update_extension_draft(&self, api_key: &str, registration_id: &str, config: &Value) -> Result<()>;

    fn enable_developer_preview(&self, api_key: &str) -> Result<()>;

    fn submit_webhook_subscriptions(
        &self,
        api_key: &str,
        subscriptions: &[NormalizedSubscription],
    ) -> Result<()>;
}

/// [`PartnersApi`] over HTTP.
pub struct HttpPartnersClient {
    client: Client,
    base_url: Url,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveVersionResponse {
    active_app_version: Option<ActiveAppVersion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionUploadResponse {
    module_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleUploadBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle: Option<String>,
    app_modules: &'a [AppModule],
    extension_ids: &'a BTreeMap<String, String>,
    release: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_reference: Option<&'a str>,
}

impl HttpPartnersClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("Invalid Partners API URL: {base_url}"))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("Invalid Partners API URL: {base_url}");
        }
        let client = Client::builder()
            .user_agent(concat!("appctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: parsed,
            token: token.into(),
        })
    }

    /// `<base>/api/apps/<api_key>/<path...>`, each segment percent-encoded.
    fn url(&self, api_key: &str, path: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "apps", api_key])
                .extend(path);
        }
        url.to_string()
    }

    fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response> {
        tracing::debug!(endpoint, "partners request");
        let response = request
            .bearer_auth(&self.token)
            .send()
            .with_context(|| format!("Failed to reach {endpoint}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppctlError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(response)
    }

    fn get<T: DeserializeOwned>(&self, api_key: &str, path: &str) -> Result<T> {
        let url = self.url(api_key, &[path]);
        self.send(self.client.get(&url), &url)?
            .json()
            .with_context(|| format!("Invalid response from {url}"))
    }
}

impl PartnersApi for HttpPartnersClient {
    fn app_extension_registrations(&self, api_key: &str) -> Result<ExtensionRegistrations> {
        self.get(api_key, "extension_registrations")
    }

    fn active_app_version(&self, api_key: &str) -> Result<Option<ActiveAppVersion>> {
        let response: ActiveVersionResponse = self.get(api_key, "active_version")?;
        Ok(response.active_app_version)
    }

    fn app_betas(&self, api_key: &str) -> Result<AppBetas> {
        self.get(api_key, "betas")
    }

    fn create_extension(&self, api_key: &str, extension: &NewExtension) -> Result<RemoteExtension> {
        let url = self.url(api_key, &["extension_registrations"]);
        self.send(self.client.post(&url).json(extension), &url)?
            .json()
            .with_context(|| format!("Invalid response from {url}"))
    }

    fn upload_function(&self, api_key: &str, handle: &str, wasm: &[u8]) -> Result<String> {
        let url = self.url(api_key, &["functions"]);
        let body = serde_json::json!({ "handle": handle, "module": STANDARD.encode(wasm) });
        let response: FunctionUploadResponse = self
            .send(self.client.post(&url).json(&body), &url)?
            .json()
            .with_context(|| format!("Invalid response from {url}"))?;
        Ok(response.module_id)
    }

    fn upload_extensions_bundle(&self, api_key: &str, upload: &BundleUpload) -> Result<UploadResult> {
        let bundle = match &upload.bundle_path {
            Some(path) => Some(STANDARD.encode(
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
            )),
            None => None,
        };
        let body = BundleUploadBody {
            bundle,
            app_modules: &upload.app_modules,
            extension_ids: &upload.extension_ids,
            release: upload.release,
            message: upload.message.as_deref(),
            version: upload.version.as_deref(),
            commit_reference: upload.commit_reference.as_deref(),
        };
        let url = self.url(api_key, &["versions"]);
        self.send(self.client.post(&url).json(&body), &url)?
            .json()
            .with_context(|| format!("Invalid response from {url}"))
    }

    fn update_extension_draft(&self, api_key: &str, registration_id: &str, config: &Value) -> Result<()> {
        let url = self.url(api_key, &["extensions", registration_id, "draft"]);
        let body = serde_json::json!({ "config": config.to_string() });
        self.send(self.client.patch(&url).json(&body), &url)?;
        Ok(())
    }

    fn enable_developer_preview(&self, api_key: &str) -> Result<()> {
        let url = self.url(api_key, &["developer_preview"]);
        self.send(self.client.post(&url), &url)?;
        Ok(())
    }

    fn submit_webhook_subscriptions(
        &self,
        api_key: &str,
        subscriptions: &[NormalizedSubscription],
    ) -> Result<()> {
        let url = self.url(api_key, &["webhook_subscriptions"]);
        let body = serde_json::json!({ "subscriptions": subscriptions });
        self.send(self.client.put(&url).json(&body), &url)?;
        Ok(())
    }
}

/// Test utilities for Partners API mocking.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// A recorded call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum ApiCall {
        CreateExtension(NewExtension),
        UploadFunction { handle: String, size: usize },
        UploadBundle(BundleUpload),
        UpdateDraft { registration_id: String, config: Value },
        EnableDeveloperPreview,
        SubmitWebhooks(Vec<NormalizedSubscription>),
    }

    /// In-memory API returning configured responses and recording writes.
    #[derive(Default)]
    pub struct MockPartnersApi {
        pub registrations: ExtensionRegistrations,
        pub active_version: Option<ActiveAppVersion>,
        pub betas: AppBetas,
        pub upload_result: UploadResult,
        calls: Mutex<Vec<ApiCall>>,
    }

    impl MockPartnersApi {
        pub fn new() -> Self {
            Self {
                upload_result: UploadResult {
                    version_tag: "unique-version-tag".to_string(),
                    location: "https://partners.shopify.com/0/apps/0/versions/1".to_string(),
                    ..UploadResult::default()
                },
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<ApiCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn uploads(&self) -> Vec<BundleUpload> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    ApiCall::UploadBundle(upload) => Some(upload),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: ApiCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl PartnersApi for MockPartnersApi {
        fn app_extension_registrations(&self, _api_key: &str) -> Result<ExtensionRegistrations> {
            Ok(self.registrations.clone())
        }

        fn active_app_version(&self, _api_key: &str) -> Result<Option<ActiveAppVersion>> {
            Ok(self.active_version.clone())
        }

        fn app_betas(&self, _api_key: &str) -> Result<AppBetas> {
            Ok(self.betas.clone())
        }

        fn create_extension(&self, _api_key: &str, extension: &NewExtension) -> Result<RemoteExtension> {
            self.record(ApiCall::CreateExtension(extension.clone()));
            Ok(RemoteExtension {
                id: format!("id-{}", extension.handle),
                uuid: format!("uuid-{}", extension.handle),
                title: extension.title.clone(),
                extension_type: extension.extension_type.clone(),
            })
        }

        fn upload_function(&self, _api_key: &str, handle: &str, wasm: &[u8]) -> Result<String> {
            self.record(ApiCall::UploadFunction {
                handle: handle.to_string(),
                size: wasm.len(),
            });
            Ok("module-id".to_string())
        }

        fn upload_extensions_bundle(&self, _api_key: &str, upload: &BundleUpload) -> Result<UploadResult> {
            self.record(ApiCall::UploadBundle(upload.clone()));
            Ok(self.upload_result.clone())
        }

        fn update_extension_draft(&self, _api_key: &str, registration_id: &str, config: &Value) -> Result<()> {
            self.record(ApiCall::UpdateDraft {
                registration_id: registration_id.to_string(),
                config: config.clone(),
            });
            Ok(())
        }

        fn enable_developer_preview(&self, _api_key: &str) -> Result<()> {
            self.record(ApiCall::EnableDeveloperPreview);
            Ok(())
        }

        fn submit_webhook_subscriptions(
            &self,
            _api_key: &str,
            subscriptions: &[NormalizedSubscription],
        ) -> Result<()> {
            self.record(ApiCall::SubmitWebhooks(subscriptions.to_vec()));
            Ok(())
        }
    }
}
