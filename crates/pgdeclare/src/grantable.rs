//! The capability of being a grant target.

use crate::BoxFuture;
use crate::config::ConnectionConfig;
use crate::entities::Role;
use crate::entity::{Context, Entity, EntityKind};
use crate::error::{Error, Result};
use crate::privilege::{
    Privilege, PrivilegeSet, check_privileges, format_privileges, privilege_clause,
};
use pgdeclare_sql::Ident;
use tracing::info;

/// An object privileges can be granted on: a database, a schema or a table.
///
/// Implementors describe how to reach the object and how to read its current
/// privileges; statement emission and existence gating are shared.
pub trait Grantable: Send + Sync {
    fn target_kind(&self) -> EntityKind;

    /// Name as written after `ON <KIND>` in GRANT/REVOKE.
    fn target_sql_name(&self) -> String;

    /// Privileges that may be granted on this kind of object.
    fn allowed_privileges(&self) -> &'static [Privilege];

    /// Connection target GRANT/REVOKE and privilege lookups run on.
    fn grant_connection<'a>(&'a self, cx: Context<'a>) -> Result<&'a ConnectionConfig>;

    fn target_exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>>;

    /// Privileges currently granted on this object to `grantee`.
    fn existing_privileges<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
    ) -> BoxFuture<'a, Result<PrivilegeSet>>;

    fn grant_sql(&self, grantee: &Role, privileges: &PrivilegeSet) -> String {
        format!(
            "GRANT {} ON {} {} TO {}",
            privilege_clause(privileges),
            self.target_kind().object_keyword(),
            self.target_sql_name(),
            Ident(grantee.name())
        )
    }

    fn revoke_sql(&self, grantee: &Role, privileges: &PrivilegeSet) -> String {
        format!(
            "REVOKE {} ON {} {} FROM {}",
            privilege_clause(privileges),
            self.target_kind().object_keyword(),
            self.target_sql_name(),
            Ident(grantee.name())
        )
    }

    fn grant<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
        privileges: &'a PrivilegeSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = self.grant_connection(cx)?;
            let statement = self.grant_sql(grantee, privileges);
            cx.session.executor().commit(target, &[statement]).await
        })
    }

    fn revoke<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
        privileges: &'a PrivilegeSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = self.grant_connection(cx)?;
            let statement = self.revoke_sql(grantee, privileges);
            cx.session.executor().commit(target, &[statement]).await
        })
    }

    /// Whether `privileges` (with `ALL PRIVILEGES` expanded) are all granted
    /// to `grantee`. A grantee with no entry at all yields `false`.
    fn grants_exist<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
        privileges: &'a PrivilegeSet,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let existing = self.existing_privileges(cx, grantee).await?;
            Ok(check_privileges(privileges, &existing, self.allowed_privileges()))
        })
    }

    /// Grant after checking that this object exists.
    fn safe_grant<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
        privileges: &'a PrivilegeSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.require_exists(cx, "grant").await?;
            self.grant(cx, grantee, privileges).await?;
            info!(
                kind = %self.target_kind(),
                target = %self.target_sql_name(),
                grantee = grantee.name(),
                privileges = %format_privileges(privileges),
                "granted"
            );
            Ok(())
        })
    }

    /// Revoke after checking that this object exists.
    fn safe_revoke<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
        privileges: &'a PrivilegeSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.require_exists(cx, "revoke").await?;
            self.revoke(cx, grantee, privileges).await?;
            info!(
                kind = %self.target_kind(),
                target = %self.target_sql_name(),
                grantee = grantee.name(),
                privileges = %format_privileges(privileges),
                "revoked"
            );
            Ok(())
        })
    }

    fn require_exists<'a>(
        &'a self,
        cx: Context<'a>,
        action: &'static str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.target_exists(cx).await? {
                return Ok(());
            }
            Err(Error::MustExist {
                kind: self.target_kind(),
                name: self.target_sql_name(),
                action,
            })
        })
    }
}
