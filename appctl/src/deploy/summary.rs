//! Reconciling local extensions with remote registrations, and the
//! confirmation shown before a deploy.

use appctl_common::ExtensionInstance;
use std::collections::{BTreeMap, BTreeSet};

use crate::identifiers::{EnvFile, find_registration};
use crate::partners::{ActiveAppVersion, AppBetas, ExtensionRegistrations, RemoteExtension};
use crate::prompt::{ConfirmationPrompt, InfoTableSection, SectionColor};

const DASHBOARD_HEADER: &str = "Included from\nPartner dashboard";
const REMOVED_HELPER: &str = "Will be removed for users when this version is released.";

/// How a deploy reaches users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Extensions are pushed individually.
    Legacy,
    /// Every deploy produces a complete app version.
    Unified,
}

impl DeploymentMode {
    pub fn from_betas(betas: &AppBetas) -> Self {
        if betas.unified_app_deployment {
            DeploymentMode::Unified
        } else {
            DeploymentMode::Legacy
        }
    }

    fn confirmation_message(self) -> &'static str {
        match self {
            DeploymentMode::Legacy => "Yes, deploy to push changes",
            DeploymentMode::Unified => "Yes, release this new version",
        }
    }
}

/// Local extensions set against what the Partners API knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub question: String,
    /// Handle to registration uuid, for extensions registered already.
    pub identifiers: BTreeMap<String, String>,
    /// Handle to registration id, for the same extensions.
    pub extension_ids: BTreeMap<String, String>,
    /// Handles of local extensions with no registration yet.
    pub to_create: Vec<String>,
    pub only_remote: Vec<RemoteExtension>,
    pub dashboard_only: Vec<RemoteExtension>,
}

impl SourceSummary {
    pub fn question_for(mode: DeploymentMode, app_name: Option<&str>) -> String {
        match (mode, app_name) {
            (DeploymentMode::Unified, Some(name)) => format!("Release a new version of {name}?"),
            (DeploymentMode::Unified, None) => "Release a new version of this app?".to_string(),
            (DeploymentMode::Legacy, _) => {
                "Make the following changes to your extensions in Shopify Partners?".to_string()
            }
        }
    }
}

/// Match every local extension to a registration, if it has one.
pub fn reconcile(
    question: impl Into<String>,
    extensions: &[ExtensionInstance],
    env: &EnvFile,
    registrations: &ExtensionRegistrations,
) -> SourceSummary {
    let mut summary = SourceSummary {
        question: question.into(),
        dashboard_only: registrations.dashboard_managed_extension_registrations.clone(),
        ..SourceSummary::default()
    };
    let mut matched = BTreeSet::new();

    for extension in extensions {
        let handle = extension.handle();
        match find_registration(
            extension,
            env.extension_uuid(extension),
            &registrations.extension_registrations,
        ) {
            Some(remote) => {
                tracing::debug!(%handle, uuid = %remote.uuid, "matched registration");
                matched.insert(remote.uuid.clone());
                summary.identifiers.insert(handle.clone(), remote.uuid.clone());
                summary.extension_ids.insert(handle, remote.id.clone());
            }
            None => summary.to_create.push(handle),
        }
    }

    summary.only_remote = registrations
        .extension_registrations
        .iter()
        .filter(|r| !matched.contains(&r.uuid))
        .cloned()
        .collect();
    summary
}

/// The prompt asking whether to go ahead with a deploy.
pub fn confirmation_prompt(
    summary: &SourceSummary,
    mode: DeploymentMode,
    active_version: Option<&ActiveAppVersion>,
) -> ConfirmationPrompt {
    let info_table = match (mode, active_version) {
        (DeploymentMode::Unified, Some(active)) => unified_table(summary, active),
        _ => legacy_table(summary),
    };
    ConfirmationPrompt {
        message: summary.question.clone(),
        info_table: info_table
            .into_iter()
            .filter(|section| !section.items.is_empty())
            .collect(),
        confirmation_message: mode.confirmation_message().to_string(),
        cancellation_message: "No, cancel".to_string(),
    }
}

fn titles(remotes: &[RemoteExtension]) -> Vec<String> {
    remotes.iter().map(|r| r.title.clone()).collect()
}

fn legacy_table(summary: &SourceSummary) -> Vec<InfoTableSection> {
    vec![
        InfoTableSection::new("Add", summary.to_create.clone()),
        InfoTableSection::new("Update", summary.identifiers.keys().cloned().collect()),
        InfoTableSection::new(DASHBOARD_HEADER, titles(&summary.dashboard_only)),
        InfoTableSection::new("Missing locally", titles(&summary.only_remote)),
    ]
}

fn unified_table(summary: &SourceSummary, active: &ActiveAppVersion) -> Vec<InfoTableSection> {
    let active_uuids: BTreeSet<&str> = active
        .app_module_versions
        .iter()
        .filter(|m| !m.is_dashboard_managed())
        .map(|m| m.registration_uuid.as_str())
        .collect();

    let (update, add): (Vec<_>, Vec<_>) = summary
        .identifiers
        .iter()
        .partition(|(_, uuid)| active_uuids.contains(uuid.as_str()));
    let handles = |pairs: Vec<(&String, &String)>| -> Vec<String> {
        pairs.into_iter().map(|(handle, _)| handle.clone()).collect()
    };
    let update = handles(update);
    let mut add = handles(add);
    add.extend(summary.to_create.iter().cloned());

    let local_uuids: BTreeSet<&str> = summary.identifiers.values().map(String::as_str).collect();
    let removed = active
        .app_module_versions
        .iter()
        .filter(|m| !local_uuids.contains(m.registration_uuid.as_str()))
        .map(|m| m.registration_title.clone())
        .collect();

    vec![
        InfoTableSection::new("Add", add),
        InfoTableSection::new("Update", update),
        InfoTableSection::new(DASHBOARD_HEADER, titles(&summary.dashboard_only)),
        InfoTableSection {
            helper_text: Some(REMOVED_HELPER.to_string()),
            color: Some(SectionColor::Red),
            ..InfoTableSection::new("Removed", removed)
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partners::{AppModuleVersion, ModuleSpecification, SpecificationOptions};
    use serde_json::json;

    fn remote(id: &str, uuid: &str, title: &str) -> RemoteExtension {
        RemoteExtension {
            id: id.into(),
            uuid: uuid.into(),
            title: title.into(),
            extension_type: "type".into(),
        }
    }

    fn summary() -> SourceSummary {
        SourceSummary {
            question: "question".into(),
            identifiers: BTreeMap::from([
                ("extension1".to_string(), "uuid1".to_string()),
                ("extension2".to_string(), "uuid2".to_string()),
            ]),
            extension_ids: BTreeMap::new(),
            to_create: vec!["id1".into()],
            only_remote: vec![remote("remote_id1", "remote_uuid1", "remote_title1")],
            dashboard_only: vec![remote("dashboard_id1", "dashboard_uuid1", "dashboard_title1")],
        }
    }

    fn module(uuid: &str, title: &str, experience: &str) -> AppModuleVersion {
        AppModuleVersion {
            registration_id: format!("id-{uuid}"),
            registration_uuid: uuid.into(),
            registration_title: title.into(),
            module_type: "type".into(),
            specification: Some(ModuleSpecification {
                identifier: "spec".into(),
                name: "spec".into(),
                options: SpecificationOptions {
                    management_experience: experience.into(),
                },
            }),
        }
    }

    fn section(header: &str, items: &[&str]) -> InfoTableSection {
        InfoTableSection::new(header, items.iter().map(|s| s.to_string()).collect())
    }

    fn legacy_sections() -> Vec<InfoTableSection> {
        vec![
            section("Add", &["id1"]),
            section("Update", &["extension1", "extension2"]),
            section("Included from\nPartner dashboard", &["dashboard_title1"]),
            section("Missing locally", &["remote_title1"]),
        ]
    }

    #[test]
    fn legacy_prompt_lists_every_source() {
        let prompt = confirmation_prompt(&summary(), DeploymentMode::Legacy, None);
        assert_eq!(
            prompt,
            ConfirmationPrompt {
                message: "question".into(),
                info_table: legacy_sections(),
                confirmation_message: "Yes, deploy to push changes".into(),
                cancellation_message: "No, cancel".into(),
            }
        );
    }

    #[test]
    fn unified_prompt_without_active_version() {
        let prompt = confirmation_prompt(&summary(), DeploymentMode::Unified, None);
        assert_eq!(prompt.info_table, legacy_sections());
        assert_eq!(prompt.confirmation_message, "Yes, release this new version");
    }

    #[test]
    fn unified_prompt_compares_with_active_version() {
        let active = ActiveAppVersion {
            app_module_versions: vec![
                module("uuid3", "title3", "cli"),
                module("uuid2", "extension2", "cli"),
                module("dashboard_uuid1", "dashboard_title3", "dashboard"),
            ],
        };
        let prompt = confirmation_prompt(&summary(), DeploymentMode::Unified, Some(&active));

        let removed = InfoTableSection {
            helper_text: Some("Will be removed for users when this version is released.".into()),
            color: Some(SectionColor::Red),
            ..section("Removed", &["title3", "dashboard_title3"])
        };
        assert_eq!(
            prompt.info_table,
            vec![
                section("Add", &["extension1", "id1"]),
                section("Update", &["extension2"]),
                section("Included from\nPartner dashboard", &["dashboard_title1"]),
                removed,
            ]
        );
        assert_eq!(prompt.confirmation_message, "Yes, release this new version");
    }

    #[test]
    fn empty_sections_are_omitted() {
        let summary = SourceSummary {
            question: "q".into(),
            to_create: vec!["new".into()],
            ..SourceSummary::default()
        };
        let prompt = confirmation_prompt(&summary, DeploymentMode::Legacy, None);
        assert_eq!(prompt.info_table, vec![section("Add", &["new"])]);
    }

    #[test]
    fn reconcile_splits_local_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "SHOPIFY_CHECKOUT_ID=u1\n").unwrap();
        let env = EnvFile::load(dir.path()).unwrap();

        let ext = |name: &str, kind: &str| {
            ExtensionInstance::new(
                dir.path().join(name),
                serde_json::from_value(json!({ "name": name, "type": kind })).unwrap(),
            )
        };
        let extensions = vec![ext("checkout", "ui_extension"), ext("fresh", "theme")];
        let registrations = ExtensionRegistrations {
            extension_registrations: vec![remote("i1", "u1", "Checkout"), remote("i9", "u9", "stale")],
            dashboard_managed_extension_registrations: vec![remote("d1", "du1", "link")],
        };

        let summary = reconcile("q", &extensions, &env, &registrations);
        assert_eq!(summary.identifiers, BTreeMap::from([("checkout".into(), "u1".into())]));
        assert_eq!(summary.extension_ids, BTreeMap::from([("checkout".into(), "i1".into())]));
        assert_eq!(summary.to_create, vec!["fresh"]);
        assert_eq!(titles(&summary.only_remote), vec!["stale"]);
        assert_eq!(titles(&summary.dashboard_only), vec!["link"]);
    }

    #[test]
    fn mode_follows_beta() {
        let betas = AppBetas {
            unified_app_deployment: true,
            ..AppBetas::default()
        };
        assert_eq!(DeploymentMode::from_betas(&betas), DeploymentMode::Unified);
        assert_eq!(DeploymentMode::from_betas(&AppBetas::default()), DeploymentMode::Legacy);
        assert_eq!(
            SourceSummary::question_for(DeploymentMode::Unified, Some("shop")),
            "Release a new version of shop?"
        );
    }
}
