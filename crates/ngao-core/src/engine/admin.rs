//! Admin units, officers and citizens.

use super::Engine;
use crate::admin::{AdminUnit, NewAdminUnit};
use crate::citizens::{Citizen, NewCitizen};
use crate::officers::{NewOfficer, Officer};
use crate::permissions::Permission;
use crate::roles::Role;
use crate::storage::{self, RecordStore};
use crate::{CitizenId, NgaoError, Timestamp, UnitId, UserId};

impl Engine {
    // =========================================================================
    // ADMIN UNITS
    // =========================================================================

    /// Add a unit to the hierarchy. The parent must be within the actor's scope.
    pub fn create_admin_unit(
        &mut self,
        actor: UserId,
        new: NewAdminUnit,
        now: Timestamp,
    ) -> Result<AdminUnit, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::ADMIN_UNITS_CREATE, new.parent)?;
        // A unit without a parent sits outside every officer's scope.
        if new.parent.is_none() && !actor.is_superuser {
            return Err(NgaoError::PermissionDenied {
                role: actor.role.slug().to_string(),
                permission: Permission::ADMIN_UNITS_CREATE.to_string(),
            });
        }
        self.tree.validate(&new)?;

        let mut change = self.begin();
        let id = UnitId(change.allocate(&self.store, storage::ADMIN_UNITS)?);
        let unit = AdminUnit {
            id,
            name: new.name.trim().to_string(),
            code: new.code.trim().to_string(),
            level: new.level,
            parent: new.parent,
            created_at: now,
        };
        change.put(&unit)?;
        self.commit(change)?;
        self.tree.insert_validated(unit.clone());
        Ok(unit)
    }

    pub fn admin_unit(&self, id: UnitId) -> Result<&AdminUnit, NgaoError> {
        self.tree.get(id)
    }

    // =========================================================================
    // OFFICERS
    // =========================================================================

    /// Create the first account, a superuser. Refused once any officer exists.
    pub fn bootstrap_superuser(
        &mut self,
        new: NewOfficer,
        now: Timestamp,
    ) -> Result<Officer, NgaoError> {
        if self.store.counter(storage::OFFICERS)? > 0 {
            return Err(NgaoError::Validation(
                "officers already exist; bootstrap is only allowed on an empty directory"
                    .to_string(),
            ));
        }
        new.validate()?;
        if let Some(unit) = new.admin_unit {
            self.tree.get(unit)?;
        }
        let mut change = self.begin();
        let id = UserId(change.allocate(&self.store, storage::OFFICERS)?);
        let officer = new.into_officer(id, true, now);
        change.put(&officer)?;
        self.commit(change)?;
        Ok(officer)
    }

    /// Register an officer below the actor in rank and within the actor's scope.
    pub fn register_officer(
        &mut self,
        actor: UserId,
        new: NewOfficer,
        now: Timestamp,
    ) -> Result<Officer, NgaoError> {
        let actor = self.actor(actor)?;
        new.validate()?;
        self.check_officer_admin(&actor, Permission::OFFICERS_CREATE, new.admin_unit, &[new.role])?;
        self.check_posting(new.role, new.admin_unit)?;
        new.check_unique(&self.all_officers()?)?;

        let mut change = self.begin();
        let id = UserId(change.allocate(&self.store, storage::OFFICERS)?);
        let officer = new.into_officer(id, false, now);
        change.put(&officer)?;
        change.notify(
            &self.store,
            [officer.id],
            "Welcome to NGAO",
            format!(
                "You were registered as {} by {}.",
                officer.role.title(),
                actor.full_name()
            ),
            officer.admin_unit,
            now,
        )?;
        self.commit(change)?;
        Ok(officer)
    }

    pub fn change_officer_role(
        &mut self,
        actor: UserId,
        officer: UserId,
        role: Role,
    ) -> Result<Officer, NgaoError> {
        let actor = self.actor(actor)?;
        let mut target: Officer = self.load("officer", officer.0)?;
        self.check_officer_admin(
            &actor,
            Permission::OFFICERS_UPDATE,
            target.admin_unit,
            &[target.role, role],
        )?;
        self.check_posting(role, target.admin_unit)?;
        target.role = role;

        let mut change = self.begin();
        change.put(&target)?;
        self.commit(change)?;
        Ok(target)
    }

    pub fn set_officer_active(
        &mut self,
        actor: UserId,
        officer: UserId,
        active: bool,
    ) -> Result<Officer, NgaoError> {
        let actor = self.actor(actor)?;
        let mut target: Officer = self.load("officer", officer.0)?;
        if target.id == actor.id {
            return Err(NgaoError::HierarchyViolation(
                "officers cannot change their own active flag".to_string(),
            ));
        }
        self.check_officer_admin(
            &actor,
            Permission::OFFICERS_UPDATE,
            target.admin_unit,
            &[target.role],
        )?;
        target.is_active = active;

        let mut change = self.begin();
        change.put(&target)?;
        self.commit(change)?;
        Ok(target)
    }

    pub fn officer(&self, id: UserId) -> Result<Officer, NgaoError> {
        self.load("officer", id.0)
    }

    /// Active officers posted to `unit`, optionally holding `role`, ascending id.
    pub fn officers_in(&self, unit: UnitId, role: Option<Role>) -> Result<Vec<Officer>, NgaoError> {
        self.tree.get(unit)?;
        Ok(self
            .all_officers()?
            .into_iter()
            .filter(|o| o.is_active && o.admin_unit == Some(unit))
            .filter(|o| role.is_none_or(|r| o.role == r))
            .collect())
    }

    /// Permission, scope and rank checks shared by officer administration.
    fn check_officer_admin(
        &self,
        actor: &Officer,
        permission: Permission,
        unit: Option<UnitId>,
        roles: &[Role],
    ) -> Result<(), NgaoError> {
        self.gate().authorize(actor, permission, unit)?;
        if actor.is_superuser {
            return Ok(());
        }
        if unit.is_none() {
            return Err(NgaoError::HierarchyViolation(
                "only a superuser can administer officers without an admin unit".to_string(),
            ));
        }
        match roles.iter().find(|r| !actor.role.outranks(**r)) {
            Some(role) => Err(NgaoError::HierarchyViolation(format!(
                "{} does not outrank {}",
                actor.role.title(),
                role.title()
            ))),
            None => Ok(()),
        }
    }

    /// A territorial role must be posted to a unit of its own level.
    fn check_posting(&self, role: Role, unit: Option<UnitId>) -> Result<(), NgaoError> {
        let Some(unit) = unit else {
            return Ok(());
        };
        let unit = self.tree.get(unit)?;
        match role.unit_level() {
            Some(level) if level != unit.level => Err(NgaoError::Validation(format!(
                "a {} is posted to a {} unit, not a {} unit",
                role.title(),
                level,
                unit.level
            ))),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // CITIZENS
    // =========================================================================

    pub fn register_citizen(
        &mut self,
        actor: UserId,
        new: NewCitizen,
        now: Timestamp,
    ) -> Result<Citizen, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::CITIZENS_CREATE, Some(new.area))?;
        self.tree.get(new.area)?;
        new.validate()?;
        if let Some(number) = &new.id_number {
            self.check_id_number_free(number)?;
        }

        let mut change = self.begin();
        let id = CitizenId(change.allocate(&self.store, storage::CITIZENS)?);
        let citizen = new.into_citizen(id, now);
        change.put(&citizen)?;
        self.commit(change)?;
        Ok(citizen)
    }

    pub fn citizen(&self, id: CitizenId) -> Result<Citizen, NgaoError> {
        self.load("citizen", id.0)
    }

    /// Citizen record visible to `actor` (`citizens.view` scoped to the area).
    pub fn citizen_for(&self, actor: UserId, id: CitizenId) -> Result<Citizen, NgaoError> {
        let actor = self.actor(actor)?;
        let citizen = self.citizen(id)?;
        self.gate()
            .authorize(&actor, Permission::CITIZENS_VIEW, Some(citizen.area))?;
        Ok(citizen)
    }

    pub(super) fn check_id_number_free(&self, number: &str) -> Result<(), NgaoError> {
        let number = number.trim();
        let taken = self
            .store
            .all::<Citizen>()?
            .iter()
            .any(|c| c.id_number.as_deref() == Some(number));
        if taken {
            Err(NgaoError::Duplicate(format!(
                "id number {number} is already assigned"
            )))
        } else {
            Ok(())
        }
    }
}
