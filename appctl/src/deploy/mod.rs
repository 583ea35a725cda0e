//! `appctl deploy`: upload a new app version.
//!
//! The workflow validates the app, reconciles its extensions with the
//! registrations known remotely, asks for confirmation unless forced, and
//! then executes a [`DeployPlan`]. With `--dry-run` it stops after planning.

mod plan;
mod summary;

pub use plan::{BUNDLE_DIRECTORY, BUNDLE_FILE, DeployCommand, DeployOptions, DeployPlan, DeployResult};
pub use summary::{DeploymentMode, SourceSummary, confirmation_prompt, reconcile};

use anyhow::Result;
use appctl_common::SubscriptionRules;

use crate::command_runner::CommandRunner;
use crate::identifiers::EnvFile;
use crate::loader::LoadedApp;
use crate::output::{BodyPart, MessageKind, ResultMessage};
use crate::package_manager::PackageManager;
use crate::partners::{PartnersApi, UploadResult};
use crate::plan::{ExecuteContext, Plan, PlanContext, PlanSummary, Plannable};
use crate::prompt::Prompter;

/// How a deploy ended.
#[derive(Debug)]
pub enum DeployOutcome {
    /// The user declined the confirmation.
    Cancelled,
    /// Dry run: what would have happened.
    Planned(PlanSummary),
    Deployed(DeployResult),
}

/// The collaborators a deploy talks to.
pub struct Deployer<'a> {
    pub api: &'a dyn PartnersApi,
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
}

impl Deployer<'_> {
    pub fn run(
        &self,
        app: &LoadedApp,
        options: &DeployOptions,
        rules: SubscriptionRules,
        dry_run: bool,
    ) -> Result<DeployOutcome> {
        app.validate(rules)?;
        let api_key = app.api_key()?;

        let registrations = self.api.app_extension_registrations(&api_key)?;
        let betas = self.api.app_betas(&api_key)?;
        let mode = DeploymentMode::from_betas(&betas);
        tracing::debug!(?mode, ?betas, "deployment mode");

        let env = EnvFile::load(&app.directory)?;
        let question = SourceSummary::question_for(mode, app.configuration.name());
        let summary = reconcile(question, &app.extensions, &env, &registrations);

        if !options.force && !dry_run {
            let active_version = match mode {
                DeploymentMode::Unified => self.api.active_app_version(&api_key)?,
                DeploymentMode::Legacy => None,
            };
            let prompt = confirmation_prompt(&summary, mode, active_version.as_ref());
            if !self.prompter.confirm(&prompt)? {
                tracing::info!("deploy cancelled");
                return Ok(DeployOutcome::Cancelled);
            }
        }

        let plan = DeployCommand::new(options, &summary, &betas)
            .plan(&PlanContext::new(app, self.api))?;
        if dry_run {
            return Ok(DeployOutcome::Planned(plan.describe()));
        }

        let mut ctx = ExecuteContext::new(self.runner, self.api);
        Ok(DeployOutcome::Deployed(plan.execute(&mut ctx)?))
    }
}

/// The message shown once a version has been uploaded.
pub fn result_message(
    upload: &UploadResult,
    options: &DeployOptions,
    package_manager: PackageManager,
) -> ResultMessage {
    let link = BodyPart::Link {
        label: upload.version_tag.clone(),
        url: upload.location.clone(),
    };
    let message = BodyPart::Text(
        upload
            .message
            .as_deref()
            .map(|m| format!("\n{m}"))
            .unwrap_or_default(),
    );

    if options.no_release {
        let release = package_manager.format_command(
            "shopify app release",
            &[format!("--version={}", upload.version_tag).as_str()],
        );
        return ResultMessage {
            kind: MessageKind::Success,
            headline: "New version created.".to_string(),
            body: vec![link, message],
            next_steps: vec![format!("Run `{release}` to release this version to users.")],
        };
    }

    match &upload.deploy_error {
        Some(error) => ResultMessage {
            kind: MessageKind::Info,
            headline: "New version created, but not released.".to_string(),
            body: vec![link, message, BodyPart::Text(format!("\n\n{error}"))],
            next_steps: Vec::new(),
        },
        None => ResultMessage {
            kind: MessageKind::Success,
            headline: "New version released to users.".to_string(),
            body: vec![link, message],
            next_steps: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_runner::testing::MockCommandRunner;
    use crate::error::AppctlError;
    use crate::loader::load_app;
    use crate::partners::testing::{ApiCall, MockPartnersApi};
    use crate::partners::{
        ActiveAppVersion, AppBetas, AppModule, AppModuleVersion, RemoteExtension,
        UploadValidationError,
    };
    use crate::plan::Verb;
    use crate::prompt::testing::ScriptedPrompter;
    use appctl_common::NormalizedSubscription;
    use std::fs;
    use std::path::Path;

    const APP: &str = r#"
name = "my-app"
client_id = "api-key"
application_url = "https://example.com"
embedded = true

[webhooks]
api_version = "2024-01"
"#;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn app_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LoadedApp) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shopify.app.toml", APP);
        for (path, contents) in files {
            write(dir.path(), path, contents);
        }
        let app = load_app(dir.path(), None).unwrap();
        (dir, app)
    }

    fn forced() -> DeployOptions {
        DeployOptions {
            force: true,
            ..DeployOptions::default()
        }
    }

    fn deploy(
        app: &LoadedApp,
        api: &MockPartnersApi,
        runner: &MockCommandRunner,
        prompter: &ScriptedPrompter,
        options: &DeployOptions,
    ) -> Result<DeployOutcome> {
        Deployer {
            api,
            runner,
            prompter,
        }
        .run(app, options, SubscriptionRules::Disabled, false)
    }

    fn deployed(outcome: DeployOutcome) -> DeployResult {
        match outcome {
            DeployOutcome::Deployed(result) => result,
            other => panic!("expected a deploy, got {other:?}"),
        }
    }

    #[test]
    fn deploys_app_without_extensions() {
        let (_dir, app) = app_with(&[]);
        let api = MockPartnersApi::new();
        let runner = MockCommandRunner::new();
        let prompter = ScriptedPrompter::answering(&[]);

        let result = deployed(deploy(&app, &api, &runner, &prompter, &forced()).unwrap());

        let uploads = api.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].app_modules.is_empty());
        assert!(uploads[0].bundle_path.is_none());
        assert!(uploads[0].extension_ids.is_empty());
        assert!(uploads[0].release);
        assert!(runner.calls().is_empty());
        assert!(prompter.asked().is_empty());
        assert_eq!(result.report.completed(), vec![(Verb::Upload, "version")]);
    }

    #[test]
    fn passes_message_version_and_commit_reference() {
        let (_dir, app) = app_with(&[]);
        let api = MockPartnersApi::new();
        let options = DeployOptions {
            force: true,
            no_release: true,
            message: Some("Deployed from CLI with flag".into()),
            version: Some("1.1.0".into()),
            source_control_url: Some("https://github.com/org/repo/commit/abc".into()),
        };
        deploy(
            &app,
            &api,
            &MockCommandRunner::new(),
            &ScriptedPrompter::default(),
            &options,
        )
        .unwrap();

        let upload = &api.uploads()[0];
        assert!(!upload.release);
        assert_eq!(upload.message.as_deref(), Some("Deployed from CLI with flag"));
        assert_eq!(upload.version.as_deref(), Some("1.1.0"));
        assert_eq!(
            upload.commit_reference.as_deref(),
            Some("https://github.com/org/repo/commit/abc")
        );
    }

    #[test]
    fn registers_builds_and_bundles_ui_extension() {
        let (dir, app) = app_with(&[
            (
                "extensions/checkout/shopify.extension.toml",
                "name = \"checkout\"\ntype = \"web_pixel_extension\"\n[build]\ncommand = \"npm run build\"",
            ),
            ("extensions/checkout/dist/checkout.js", "console.log(1)"),
        ]);
        let api = MockPartnersApi::new();
        let runner = MockCommandRunner::new();

        deployed(deploy(&app, &api, &runner, &ScriptedPrompter::default(), &forced()).unwrap());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "npm");
        assert_eq!(calls[0].args, vec!["run", "build"]);
        assert_eq!(
            calls[0].options.cwd.as_deref(),
            Some(dir.path().join("extensions/checkout").as_path())
        );

        assert!(matches!(&api.calls()[0], ApiCall::CreateExtension(new) if new.extension_type == "WEB_PIXEL_EXTENSION"));
        let upload = &api.uploads()[0];
        assert_eq!(
            upload.app_modules,
            vec![AppModule {
                uuid: "uuid-checkout".into(),
                config: "{}".into(),
                context: String::new(),
                handle: "checkout".into(),
            }]
        );
        let bundle = upload.bundle_path.as_ref().unwrap();
        assert!(bundle.ends_with(".shopify/bundle.zip"));
        let archive = zip::ZipArchive::new(fs::File::open(bundle).unwrap()).unwrap();
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["uuid-checkout/checkout.js"]);

        let env = EnvFile::load(dir.path()).unwrap();
        assert_eq!(env.get("SHOPIFY_CHECKOUT_ID"), Some("uuid-checkout"));
    }

    #[test]
    fn theme_extension_config_lists_files() {
        let (_dir, app) = app_with(&[(
            "extensions/theme/shopify.extension.toml",
            "name = \"theme\"\ntype = \"theme\"",
        )]);
        let mut api = MockPartnersApi::new();
        api.registrations.extension_registrations = vec![RemoteExtension {
            id: "id-1".into(),
            uuid: "uuid-1".into(),
            title: "theme".into(),
            extension_type: "THEME".into(),
        }];

        deployed(
            deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced()).unwrap(),
        );

        let upload = &api.uploads()[0];
        assert_eq!(upload.app_modules[0].uuid, "uuid-1");
        assert_eq!(upload.app_modules[0].config, r#"{"theme_extension":{"files":{}}}"#);
        assert_eq!(upload.extension_ids.get("theme").map(String::as_str), Some("id-1"));
        assert!(upload.bundle_path.is_some());
        assert!(!api.calls().iter().any(|c| matches!(c, ApiCall::CreateExtension(_))));
    }

    #[test]
    fn uploads_functions_without_bundle() {
        let (_dir, app) = app_with(&[
            (
                "extensions/discount/shopify.extension.toml",
                "name = \"discount\"\ntype = \"function\"\napi_version = \"2023-07\"\ndescription = \"d\"",
            ),
            ("extensions/discount/dist/index.wasm", "wasm"),
        ]);
        let api = MockPartnersApi::new();

        deployed(
            deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced()).unwrap(),
        );

        assert!(api.calls().contains(&ApiCall::UploadFunction {
            handle: "discount".into(),
            size: 4,
        }));
        let upload = &api.uploads()[0];
        assert!(upload.bundle_path.is_none());
        let config: serde_json::Value = serde_json::from_str(&upload.app_modules[0].config).unwrap();
        assert_eq!(
            config,
            serde_json::json!({
                "title": "discount",
                "module_id": "module-id",
                "description": "d",
                "app_key": "api-key",
                "api_type": "function",
                "api_version": "2023-07",
                "enable_creation_ui": true,
                "localization": {},
            })
        );
    }

    #[test]
    fn missing_function_output_fails() {
        let (_dir, app) = app_with(&[(
            "extensions/discount/shopify.extension.toml",
            "name = \"discount\"\ntype = \"function\"",
        )]);
        let api = MockPartnersApi::new();
        let err = deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced())
            .unwrap_err();
        assert!(err.to_string().contains("index.wasm"));
        assert!(api.uploads().is_empty());
    }

    #[test]
    fn failing_build_stops_the_deploy() {
        let (_dir, app) = app_with(&[(
            "extensions/checkout/shopify.extension.toml",
            "name = \"checkout\"\ntype = \"ui_extension\"\n[build]\ncommand = \"npm run build\"",
        )]);
        let api = MockPartnersApi::new();
        let err = deploy(&app, &api, &MockCommandRunner::failing(1), &ScriptedPrompter::default(), &forced())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppctlError>(),
            Some(AppctlError::CommandFailed { .. })
        ));
        assert!(api.uploads().is_empty());
    }

    #[test]
    fn upload_validation_errors_abort() {
        let (_dir, app) = app_with(&[(
            "extensions/checkout/shopify.extension.toml",
            "name = \"checkout\"\ntype = \"ui_extension\"",
        )]);
        let mut api = MockPartnersApi::new();
        api.upload_result.validation_errors = vec![UploadValidationError {
            uuid: "uuid-checkout".into(),
            errors: vec!["is too big".into()],
        }];
        let err = deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced())
            .unwrap_err();
        match err.downcast_ref::<AppctlError>() {
            Some(AppctlError::UploadRejected(errors)) => {
                assert_eq!(errors, &vec!["checkout: is too big".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn declining_the_prompt_cancels() {
        let (_dir, app) = app_with(&[(
            "extensions/checkout/shopify.extension.toml",
            "name = \"checkout\"\ntype = \"ui_extension\"",
        )]);
        let api = MockPartnersApi::new();
        let prompter = ScriptedPrompter::answering(&[false]);

        let outcome = deploy(&app, &api, &MockCommandRunner::new(), &prompter, &DeployOptions::default()).unwrap();

        assert!(matches!(outcome, DeployOutcome::Cancelled));
        assert!(api.calls().is_empty());
        let asked = prompter.asked();
        assert_eq!(asked[0].confirmation_message, "Yes, deploy to push changes");
        assert_eq!(asked[0].info_table[0].items, vec!["checkout"]);
    }

    #[test]
    fn unified_prompt_uses_active_version() {
        let (_dir, app) = app_with(&[]);
        let mut api = MockPartnersApi::new();
        api.betas = AppBetas {
            unified_app_deployment: true,
            ..AppBetas::default()
        };
        api.active_version = Some(ActiveAppVersion {
            app_module_versions: vec![AppModuleVersion {
                registration_id: "id".into(),
                registration_uuid: "old".into(),
                registration_title: "old extension".into(),
                module_type: "ui".into(),
                specification: None,
            }],
        });
        let prompter = ScriptedPrompter::answering(&[true]);

        deployed(deploy(&app, &api, &MockCommandRunner::new(), &prompter, &DeployOptions::default()).unwrap());

        let asked = prompter.asked();
        assert_eq!(asked[0].message, "Release a new version of my-app?");
        assert_eq!(asked[0].confirmation_message, "Yes, release this new version");
        assert_eq!(asked[0].info_table[0].header, "Removed");
        assert_eq!(asked[0].info_table[0].items, vec!["old extension"]);
    }

    #[test]
    fn submits_webhooks_only_with_beta() {
        let (dir, _) = app_with(&[]);
        write(
            dir.path(),
            "shopify.app.toml",
            &format!("{APP}endpoint = \"https://example.com/\"\ntopics = [\"products/create\"]\n"),
        );
        let app = load_app(dir.path(), None).unwrap();

        let api = MockPartnersApi::new();
        deployed(deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced()).unwrap());
        assert!(!api.calls().iter().any(|c| matches!(c, ApiCall::SubmitWebhooks(_))));

        let mut api = MockPartnersApi::new();
        api.betas.declarative_webhooks = true;
        deployed(deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced()).unwrap());
        assert!(api.calls().contains(&ApiCall::SubmitWebhooks(vec![
            NormalizedSubscription::new("https://example.com", "products/create")
        ])));
    }

    #[test]
    fn invalid_app_fails_before_remote_calls() {
        let (_dir, app) = app_with(&[(
            "extensions/f/shopify.extension.toml",
            "name = \"f\"\ntype = \"function\"\n[ui]\nhandle = \"missing\"",
        )]);
        let api = MockPartnersApi::new();
        let err = deploy(&app, &api, &MockCommandRunner::new(), &ScriptedPrompter::default(), &forced())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppctlError>(),
            Some(AppctlError::ValidationFailed(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn dry_run_only_plans() {
        let (_dir, app) = app_with(&[(
            "extensions/checkout/shopify.extension.toml",
            "name = \"checkout\"\ntype = \"ui_extension\"\n[build]\ncommand = \"npm run build\"",
        )]);
        let api = MockPartnersApi::new();
        let runner = MockCommandRunner::new();
        let prompter = ScriptedPrompter::default();

        let outcome = Deployer {
            api: &api,
            runner: &runner,
            prompter: &prompter,
        }
        .run(&app, &DeployOptions::default(), SubscriptionRules::Disabled, true)
        .unwrap();

        let DeployOutcome::Planned(summary) = outcome else {
            panic!("expected a plan");
        };
        let verbs: Vec<Verb> = summary.operations.iter().map(|o| o.verb).collect();
        assert_eq!(
            verbs,
            vec![Verb::Create, Verb::Build, Verb::Bundle, Verb::Upload, Verb::Write]
        );
        assert!(api.calls().is_empty());
        assert!(runner.calls().is_empty());
        assert!(prompter.asked().is_empty());
    }

    fn upload(message: Option<&str>, deploy_error: Option<&str>) -> UploadResult {
        UploadResult {
            version_tag: "unique-version-tag".into(),
            location: "https://partners.shopify.com/0/apps/0/versions/1".into(),
            message: message.map(String::from),
            deploy_error: deploy_error.map(String::from),
            ..UploadResult::default()
        }
    }

    fn link() -> BodyPart {
        BodyPart::Link {
            label: "unique-version-tag".into(),
            url: "https://partners.shopify.com/0/apps/0/versions/1".into(),
        }
    }

    #[test]
    fn released_message() {
        let msg = result_message(&upload(None, None), &DeployOptions::default(), PackageManager::Npm);
        assert_eq!(
            msg,
            ResultMessage {
                kind: MessageKind::Success,
                headline: "New version released to users.".into(),
                body: vec![link(), BodyPart::Text(String::new())],
                next_steps: vec![],
            }
        );
    }

    #[test]
    fn release_error_message() {
        let msg = result_message(
            &upload(Some("version message"), Some("no release error")),
            &DeployOptions::default(),
            PackageManager::Npm,
        );
        assert_eq!(msg.kind, MessageKind::Info);
        assert_eq!(msg.headline, "New version created, but not released.");
        assert_eq!(
            msg.body,
            vec![
                link(),
                BodyPart::Text("\nversion message".into()),
                BodyPart::Text("\n\nno release error".into()),
            ]
        );
    }

    #[test]
    fn no_release_message() {
        let options = DeployOptions {
            no_release: true,
            ..DeployOptions::default()
        };
        let msg = result_message(&upload(Some("version message"), None), &options, PackageManager::Npm);
        assert_eq!(msg.kind, MessageKind::Success);
        assert_eq!(msg.headline, "New version created.");
        assert_eq!(msg.body, vec![link(), BodyPart::Text("\nversion message".into())]);
        assert_eq!(
            msg.next_steps,
            vec![
                "Run `npm run shopify app release -- --version=unique-version-tag` to release this version to users."
                    .to_string()
            ]
        );
    }
}
