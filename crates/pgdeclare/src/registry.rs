//! The registry: every declared entity, the order they are reconciled in,
//! and the grants declared between them.

use crate::entities::{Database, DatabaseContent, Role, Schema, Table};
use crate::entity::{
    ContentId, DatabaseId, Entity, EntityKey, EntityRef, RoleId, SchemaId, TableId,
};
use crate::error::{Error, Result};
use crate::grant::{GrantOn, GrantTarget, GrantTo};
use crate::grantable::Grantable;
use crate::privilege::{Privilege, invalid_privileges};
use std::collections::HashMap;
use tracing::debug;

/// Declared entities in execution order.
///
/// Registration appends; the only reordering is the one performed by
/// [`Registry::grant`], which moves grantees ahead of the object they are
/// granted privileges on. Handles returned by the `add_*` methods are only
/// meaningful for the registry that issued them: methods returning
/// [`Result`] reject a handle this registry never issued with
/// [`Error::UnknownHandle`], while the plain accessors panic on one.
#[derive(Debug, Default)]
pub struct Registry {
    databases: Vec<Database>,
    roles: Vec<Role>,
    schemas: Vec<Schema>,
    contents: Vec<DatabaseContent>,
    order: Vec<EntityRef>,
    keys: HashMap<EntityKey, EntityRef>,
    check_if_any_exist: bool,
}

/// Fail with [`Error::InvalidPrivilege`] unless every privilege is allowed on `target`.
fn validate_privileges(target: &dyn Grantable, privileges: &[Privilege]) -> Result<()> {
    let allowed = target.allowed_privileges();
    let invalid = invalid_privileges(privileges, allowed);
    if invalid.is_empty() {
        return Ok(());
    }
    Err(Error::InvalidPrivilege {
        kind: target.target_kind(),
        invalid,
        valid: allowed.to_vec(),
    })
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default existence-check policy for entities that do not set their own.
    pub fn check_if_any_exist(&self) -> bool {
        self.check_if_any_exist
    }

    pub fn set_check_if_any_exist(&mut self, check: bool) {
        self.check_if_any_exist = check;
    }

    pub fn with_check_if_any_exist(mut self, check: bool) -> Self {
        self.check_if_any_exist = check;
        self
    }

    fn ensure_unique(&self, key: &EntityKey) -> Result<()> {
        if self.keys.contains_key(key) {
            return Err(Error::DuplicateEntity(key.clone()));
        }
        Ok(())
    }

    fn ensure_issued(&self, entity: impl Into<EntityRef>) -> Result<()> {
        let entity = entity.into();
        let issued = match entity {
            EntityRef::Database(id) => id.0 < self.databases.len(),
            EntityRef::Role(id) => id.0 < self.roles.len(),
            EntityRef::Schema(id) => id.0 < self.schemas.len(),
            EntityRef::Content(id) => id.0 < self.contents.len(),
        };
        if issued {
            Ok(())
        } else {
            Err(Error::UnknownHandle(format!("{entity:?}")))
        }
    }

    fn ensure_target(&self, target: GrantTarget) -> Result<()> {
        match target {
            GrantTarget::Database(id) => self.ensure_issued(id),
            GrantTarget::Schema(id) => self.ensure_issued(id),
            GrantTarget::Table(id) => {
                self.ensure_issued(id.content)?;
                if id.index < self.contents[id.content.0].handles.len() {
                    Ok(())
                } else {
                    Err(Error::UnknownHandle(format!("{target:?}")))
                }
            }
        }
    }

    fn ensure_roles(&self, roles: impl IntoIterator<Item = RoleId>) -> Result<()> {
        roles.into_iter().try_for_each(|role| self.ensure_issued(role))
    }

    fn validate_grant_to(&self, target: GrantTarget, grants: &[GrantTo]) -> Result<()> {
        self.ensure_target(target)?;
        for grant in grants {
            self.ensure_roles(grant.to.iter().copied())?;
            validate_privileges(self.grantable(target), &grant.privileges)?;
        }
        Ok(())
    }

    fn register(&mut self, key: EntityKey, entity: EntityRef) {
        debug!(%key, position = self.order.len(), "registered");
        self.keys.insert(key, entity);
        self.order.push(entity);
    }

    pub fn add_role(&mut self, mut role: Role) -> Result<RoleId> {
        let key = EntityKey::Role(role.name().to_string());
        self.ensure_unique(&key)?;
        self.ensure_roles(role.referenced_roles())?;
        let pending = std::mem::take(&mut role.pending);
        self.validate_grant_on(&pending)?;

        let id = RoleId(self.roles.len());
        self.roles.push(role);
        self.register(key, id.into());
        self.apply_grant_on(id, &pending);
        Ok(id)
    }

    pub fn add_database(&mut self, mut database: Database) -> Result<DatabaseId> {
        let key = EntityKey::Database(database.name().to_string());
        self.ensure_unique(&key)?;
        self.ensure_roles(database.referenced_roles())?;
        let pending = std::mem::take(&mut database.pending);
        for grant in &pending {
            self.ensure_roles(grant.to.iter().copied())?;
            validate_privileges(&database, &grant.privileges)?;
        }

        let id = DatabaseId(self.databases.len());
        self.databases.push(database);
        self.register(key, id.into());
        self.apply_grant_to(id.into(), &pending);
        Ok(id)
    }

    pub fn add_schema(&mut self, mut schema: Schema) -> Result<SchemaId> {
        self.ensure_issued(schema.database())?;
        let key = EntityKey::Schema {
            database: self.database(schema.database()).name().to_string(),
            name: schema.name().to_string(),
        };
        self.ensure_unique(&key)?;
        self.ensure_roles(schema.referenced_roles())?;
        let pending = std::mem::take(&mut schema.pending);
        for grant in &pending {
            self.ensure_roles(grant.to.iter().copied())?;
            validate_privileges(&schema, &grant.privileges)?;
        }

        let id = SchemaId(self.schemas.len());
        self.schemas.push(schema);
        self.register(key, id.into());
        self.apply_grant_to(id.into(), &pending);
        Ok(id)
    }

    pub fn add_content(&mut self, mut content: DatabaseContent) -> Result<ContentId> {
        self.ensure_issued(content.database())?;
        let key = EntityKey::Content {
            database: self.database(content.database()).name().to_string(),
            name: content.name().to_string(),
        };
        self.ensure_unique(&key)?;

        let id = ContentId(self.contents.len());
        content.build_handles(id);
        self.contents.push(content);
        self.register(key, id.into());
        Ok(id)
    }

    /// # Panics
    ///
    /// If `id` was not issued by this registry. The same holds for the other
    /// handle accessors below.
    pub fn database(&self, id: DatabaseId) -> &Database {
        &self.databases[id.0]
    }

    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.0]
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.0]
    }

    pub fn content(&self, id: ContentId) -> &DatabaseContent {
        &self.contents[id.0]
    }

    /// Handle to the table `key` (`name` or `schema.name`) of a content.
    pub fn table(&self, content: ContentId, key: &str) -> Result<TableId> {
        self.ensure_issued(content)?;
        let owner = self.content(content);
        owner
            .table_index(key)
            .map(|index| TableId { content, index })
            .ok_or_else(|| Error::UnknownTable {
                content: owner.name().to_string(),
                table: key.to_string(),
            })
    }

    pub fn table_handle(&self, id: TableId) -> &Table {
        &self.content(id.content).handles[id.index]
    }

    pub fn entity(&self, entity: EntityRef) -> &dyn Entity {
        match entity {
            EntityRef::Database(id) => self.database(id),
            EntityRef::Role(id) => self.role(id),
            EntityRef::Schema(id) => self.schema(id),
            EntityRef::Content(id) => self.content(id),
        }
    }

    pub fn grantable(&self, target: GrantTarget) -> &dyn Grantable {
        match target {
            GrantTarget::Database(id) => self.database(id),
            GrantTarget::Schema(id) => self.schema(id),
            GrantTarget::Table(id) => self.table_handle(id),
        }
    }

    /// The execution order.
    pub fn order(&self) -> &[EntityRef] {
        &self.order
    }

    /// Entities in execution order.
    pub fn entities(&self) -> impl DoubleEndedIterator<Item = (EntityRef, &dyn Entity)> {
        self.order.iter().map(|entity| (*entity, self.entity(*entity)))
    }

    /// Roles in execution order.
    pub fn roles(&self) -> impl DoubleEndedIterator<Item = &Role> {
        self.order.iter().filter_map(|entity| match entity {
            EntityRef::Role(id) => Some(self.role(*id)),
            _ => None,
        })
    }

    pub fn lookup(&self, key: &EntityKey) -> Option<EntityRef> {
        self.keys.get(key).copied()
    }

    pub fn position(&self, entity: EntityRef) -> Option<usize> {
        self.order.iter().position(|e| *e == entity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Declare privileges on `target` for the grantees of each declaration.
    ///
    /// Every declaration is validated before anything is stored. Grantees
    /// registered after the target (after the owning content, for a table)
    /// are then moved to just before it.
    pub fn grant(&mut self, target: impl Into<GrantTarget>, grants: &[GrantTo]) -> Result<()> {
        let target = target.into();
        self.validate_grant_to(target, grants)?;
        self.apply_grant_to(target, grants);
        Ok(())
    }

    /// Declare privileges for `role` on the targets of each declaration.
    ///
    /// Every declaration is validated before anything is stored. The
    /// execution order is left as is.
    pub fn grant_on(&mut self, role: RoleId, grants: &[GrantOn]) -> Result<()> {
        self.ensure_issued(role)?;
        self.validate_grant_on(grants)?;
        self.apply_grant_on(role, grants);
        Ok(())
    }

    fn validate_grant_on(&self, grants: &[GrantOn]) -> Result<()> {
        for grant in grants {
            for target in &grant.on {
                self.ensure_target(*target)?;
                validate_privileges(self.grantable(*target), &grant.privileges)?;
            }
        }
        Ok(())
    }

    fn apply_grant_on(&mut self, role: RoleId, grants: &[GrantOn]) {
        let store = &mut self.roles[role.0].grants;
        for grant in grants.iter().filter(|grant| !grant.privileges.is_empty()) {
            for target in &grant.on {
                store.add(*target, grant.privileges.iter().copied());
            }
        }
    }

    fn apply_grant_to(&mut self, target: GrantTarget, grants: &[GrantTo]) {
        let mut grantees = Vec::new();
        for grant in grants {
            for grantee in &grant.to {
                if !grant.privileges.is_empty() {
                    self.roles[grantee.0]
                        .grants
                        .add(target, grant.privileges.iter().copied());
                }
                grantees.push(EntityRef::Role(*grantee));
            }
        }
        self.move_before(grantees, target.anchor());
    }

    /// Move every entity of `entities` positioned after `anchor` to just
    /// before it, keeping their relative order.
    fn move_before(&mut self, entities: Vec<EntityRef>, anchor: EntityRef) {
        let Some(anchor_pos) = self.position(anchor) else {
            return;
        };
        let mut late: Vec<usize> = entities
            .into_iter()
            .filter_map(|entity| self.position(entity))
            .filter(|pos| *pos > anchor_pos)
            .collect();
        if late.is_empty() {
            return;
        }
        late.sort_unstable();
        late.dedup();

        let moved: Vec<EntityRef> = late.iter().map(|pos| self.order[*pos]).collect();
        for pos in late.iter().rev() {
            self.order.remove(*pos);
        }
        self.order
            .splice(anchor_pos..anchor_pos, moved.iter().copied());
        debug!(?anchor, ?moved, "moved grantees ahead of grant target");
    }
}
