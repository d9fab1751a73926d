// File: src/services/permission_resolver.rs
//
// Per-server, per-command authorization over the closed command list. A
// stored policy row overrides the synthesized default; absent rows resolve to
// enabled + admin-only. Bulk saves commit command-by-command and report the
// failed subset so callers can retry just those.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use guildpass_common::error::Error;
use guildpass_common::models::policy::{CommandPolicy, ConfigurableCommand};
use guildpass_common::traits::repository_traits::CommandPolicyRepository;

/// Who is asking: resolved upstream from the platform's member object.
#[derive(Debug, Clone)]
pub struct CommandCaller {
    pub is_server_admin: bool,
    pub role_ids: Vec<String>,
}

/// Outcome of a bulk policy save. Successes stay committed either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    PartiallyFailed(Vec<ConfigurableCommand>),
}

pub struct CommandPermissionResolver {
    policy_repo: Arc<dyn CommandPolicyRepository>,
}

impl CommandPermissionResolver {
    pub fn new(policy_repo: Arc<dyn CommandPolicyRepository>) -> Self {
        Self { policy_repo }
    }

    /// The effective policy for one command: the stored row if present, else
    /// the default (enabled, admin-only, no explicit roles).
    pub async fn resolve(
        &self,
        server_id: Uuid,
        command: ConfigurableCommand,
    ) -> Result<CommandPolicy, Error> {
        match self.policy_repo.get_policy(server_id, command).await? {
            Some(policy) => Ok(policy),
            None => Ok(CommandPolicy::default_for(server_id, command)),
        }
    }

    /// Effective policies for every command in the closed list.
    pub async fn list_policies(&self, server_id: Uuid) -> Result<Vec<CommandPolicy>, Error> {
        let stored: HashMap<ConfigurableCommand, CommandPolicy> = self
            .policy_repo
            .list_policies(server_id)
            .await?
            .into_iter()
            .map(|p| (p.command, p))
            .collect();

        Ok(ConfigurableCommand::ALL
            .into_iter()
            .map(|command| {
                stored
                    .get(&command)
                    .cloned()
                    .unwrap_or_else(|| CommandPolicy::default_for(server_id, command))
            })
            .collect())
    }

    /// `enabled AND (require_admin ? caller is admin : caller holds one of
    /// the allowed roles)`.
    pub async fn authorize(
        &self,
        server_id: Uuid,
        command: ConfigurableCommand,
        caller: &CommandCaller,
    ) -> Result<bool, Error> {
        let policy = self.resolve(server_id, command).await?;
        if !policy.enabled {
            return Ok(false);
        }
        if policy.require_admin {
            return Ok(caller.is_server_admin);
        }
        Ok(caller
            .role_ids
            .iter()
            .any(|r| policy.allowed_role_ids.contains(r)))
    }

    /// Upsert each draft in turn. A failing upsert does not roll back the
    /// ones already committed; the failed commands come back for retry.
    pub async fn save_policies(
        &self,
        drafts: &[CommandPolicy],
    ) -> Result<SaveOutcome, Error> {
        let mut failed = Vec::new();
        for draft in drafts {
            if let Err(e) = self.policy_repo.upsert_policy(draft).await {
                warn!(
                    "policy save failed for {} on server {}: {e}",
                    draft.command, draft.server_id
                );
                failed.push(draft.command);
            }
        }
        if failed.is_empty() {
            Ok(SaveOutcome::Saved)
        } else {
            Ok(SaveOutcome::PartiallyFailed(failed))
        }
    }
}
