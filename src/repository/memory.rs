//! In-memory repository used by the test suite and embeddable deployments.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Account, Permission, Role, Session, SessionKind};

use super::{Repository, RepositoryError};

/// DashMap-backed store. Writes clone the record in, reads clone it out, so
/// callers never observe partially updated entities.
#[derive(Default)]
pub struct InMemoryRepository {
    accounts: DashMap<Uuid, Account>,
    sessions: DashMap<Uuid, Session>,
    roles: DashMap<Uuid, Role>,
    permissions: DashMap<Uuid, Permission>,
    account_roles: DashMap<Uuid, Vec<Uuid>>,
    account_permissions: DashMap<Uuid, Vec<Uuid>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_credential_conflict(&self, account: &Account) -> bool {
        self.accounts.iter().any(|existing| {
            existing.id != account.id
                && !existing.deleted
                && (existing.email == account.email
                    || existing.username == account.username
                    || (account.phone.is_some() && existing.phone == account.phone))
        })
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_account(&self, account: &Account) -> Result<(), RepositoryError> {
        if self.has_credential_conflict(account) {
            return Err(RepositoryError::Conflict);
        }
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .accounts
            .get(&id)
            .filter(|a| !a.deleted)
            .map(|a| a.clone()))
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let email = email.to_lowercase();
        Ok(self
            .accounts
            .iter()
            .find(|a| !a.deleted && a.email == email)
            .map(|a| a.clone()))
    }

    async fn account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| !a.deleted && a.username == username)
            .map(|a| a.clone()))
    }

    async fn save_account(&self, account: &Account) -> Result<(), RepositoryError> {
        if self.has_credential_conflict(account) {
            return Err(RepositoryError::Conflict);
        }
        let mut updated = account.clone();
        updated.date_updated = Utc::now();
        self.accounts.insert(updated.id, updated);
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), RepositoryError> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .sessions
            .get(&id)
            .filter(|s| !s.deleted)
            .map(|s| s.clone()))
    }

    async fn save_session(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut updated = session.clone();
        updated.date_updated = Utc::now();
        self.sessions.insert(updated.id, updated);
        Ok(())
    }

    async fn authentication_ip_known(
        &self,
        account_id: Uuid,
        ip: IpAddr,
    ) -> Result<bool, RepositoryError> {
        Ok(self.sessions.iter().any(|s| {
            !s.deleted && s.is_authentication() && s.account_id == Some(account_id) && s.ip == ip
        }))
    }

    async fn revoke_authentication_sessions(
        &self,
        account_id: Uuid,
    ) -> Result<(), RepositoryError> {
        for mut entry in self.sessions.iter_mut() {
            if entry.account_id == Some(account_id) && !entry.deleted {
                if let SessionKind::Authentication { active, .. } = &mut entry.kind {
                    *active = false;
                    entry.date_updated = Utc::now();
                }
            }
        }
        Ok(())
    }

    async fn create_role(&self, role: &Role) -> Result<(), RepositoryError> {
        self.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .roles
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.clone()))
    }

    async fn assign_role(&self, account_id: Uuid, role_id: Uuid) -> Result<(), RepositoryError> {
        let mut assigned = self.account_roles.entry(account_id).or_default();
        if !assigned.contains(&role_id) {
            assigned.push(role_id);
        }
        Ok(())
    }

    async fn roles_for_account(&self, account_id: Uuid) -> Result<Vec<Role>, RepositoryError> {
        let ids = self
            .account_roles
            .get(&account_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.roles.get(id).map(|r| r.clone()))
            .collect())
    }

    async fn create_permission(&self, permission: &Permission) -> Result<(), RepositoryError> {
        self.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn assign_permission(
        &self,
        account_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let mut assigned = self.account_permissions.entry(account_id).or_default();
        if !assigned.contains(&permission_id) {
            assigned.push(permission_id);
        }
        Ok(())
    }

    async fn permissions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let ids = self
            .account_permissions
            .get(&account_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.permissions.get(id).map(|p| p.clone()))
            .collect())
    }
}
