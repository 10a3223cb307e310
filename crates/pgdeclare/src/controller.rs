//! Reconciliation over a whole [`Registry`].

use crate::entity::Context;
use crate::error::Result;
use crate::registry::Registry;
use crate::session::Session;
use tracing::{Instrument, info, info_span};

/// Runs lifecycle operations over every registered entity.
///
/// Creation and granting walk the registry in execution order; revoking and
/// dropping walk it in reverse. The first error stops the walk; statements
/// already committed stay committed.
///
/// ```no_run
/// # async fn demo() -> pgdeclare::Result<()> {
/// use pgdeclare::{ConnectionConfig, Controller, Database, GrantOn, Privilege, Registry, Role, Session};
///
/// let mut registry = Registry::new();
/// let dev = registry.add_database(Database::new("dev"))?;
/// registry.add_role(Role::new("dev_reader").grants([GrantOn::new([Privilege::Connect], [dev])]))?;
///
/// let session = Session::postgres(ConnectionConfig::from_env()?);
/// Controller::new(&registry, &session).run_all().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy)]
pub struct Controller<'a> {
    registry: &'a Registry,
    session: &'a Session,
}

impl<'a> Controller<'a> {
    pub fn new(registry: &'a Registry, session: &'a Session) -> Self {
        Self { registry, session }
    }

    fn cx(&self) -> Context<'a> {
        Context::new(self.registry, self.session)
    }

    /// Create every entity that does not exist yet.
    pub async fn create_all(&self) -> Result<()> {
        let span = info_span!("create_all", entities = self.registry.len());
        self.create_each().instrument(span).await
    }

    async fn create_each(&self) -> Result<()> {
        let cx = self.cx();
        for (_, entity) in self.registry.entities() {
            entity.safe_create(cx).await?;
        }
        Ok(())
    }

    /// Grant every privilege stored on a role.
    pub async fn grant_all(&self) -> Result<()> {
        self.grant_each().instrument(info_span!("grant_all")).await
    }

    async fn grant_each(&self) -> Result<()> {
        let cx = self.cx();
        for role in self.registry.roles() {
            role.safe_grant(cx).await?;
        }
        Ok(())
    }

    pub async fn run_all(&self) -> Result<()> {
        self.create_all().await?;
        self.grant_all().await?;
        info!(entities = self.registry.len(), "cluster matches declarations");
        Ok(())
    }

    /// Drop every entity that exists, last registered first.
    pub async fn drop_all(&self) -> Result<()> {
        let span = info_span!("drop_all", entities = self.registry.len());
        self.drop_each().instrument(span).await
    }

    async fn drop_each(&self) -> Result<()> {
        let cx = self.cx();
        for (_, entity) in self.registry.entities().rev() {
            entity.safe_drop(cx).await?;
        }
        Ok(())
    }

    /// Revoke every privilege stored on a role, last registered first.
    pub async fn revoke_all(&self) -> Result<()> {
        self.revoke_each().instrument(info_span!("revoke_all")).await
    }

    async fn revoke_each(&self) -> Result<()> {
        let cx = self.cx();
        for role in self.registry.roles().rev() {
            role.safe_revoke(cx).await?;
        }
        Ok(())
    }

    pub async fn remove_all(&self) -> Result<()> {
        self.revoke_all().await?;
        self.drop_all().await?;
        info!(entities = self.registry.len(), "declared entities removed");
        Ok(())
    }

    /// Whether every registered entity exists.
    pub async fn all_entities_exist(&self) -> Result<bool> {
        let cx = self.cx();
        for (_, entity) in self.registry.entities() {
            if !entity.exists(cx).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every privilege stored on a role is granted.
    pub async fn all_grants_exist(&self) -> Result<bool> {
        let cx = self.cx();
        for role in self.registry.roles() {
            if !role.grants_exist(cx).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn all_exist(&self) -> Result<bool> {
        Ok(self.all_entities_exist().await? && self.all_grants_exist().await?)
    }
}
