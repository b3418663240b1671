//! # Permission Gate
//!
//! Role-based permissions of the form `resource.action`, a per-role grant
//! table and the gate that combines grants with admin-unit scoping.
//!
//! Check order in [`PermissionGate::authorize`]:
//! 1. inactive officer is refused
//! 2. superuser is allowed
//! 3. the role must grant the permission
//! 4. the target unit must be within the officer's unit

use crate::admin::AdminTree;
use crate::officers::Officer;
use crate::roles::Role;
use crate::{NgaoError, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// RESOURCES & ACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    Incidents,
    Officers,
    AdminUnits,
    Reports,
    Registrations,
    Citizens,
    Communications,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Incidents,
        Resource::Officers,
        Resource::AdminUnits,
        Resource::Reports,
        Resource::Registrations,
        Resource::Citizens,
        Resource::Communications,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::Officers => "officers",
            Self::AdminUnits => "admin_units",
            Self::Reports => "reports",
            Self::Registrations => "registrations",
            Self::Citizens => "citizens",
            Self::Communications => "communications",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    View,
    Create,
    Update,
    Escalate,
    Assign,
    Close,
    Generate,
    Verify,
    Submit,
    Approve,
    Broadcast,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::View,
        Action::Create,
        Action::Update,
        Action::Escalate,
        Action::Assign,
        Action::Close,
        Action::Generate,
        Action::Verify,
        Action::Submit,
        Action::Approve,
        Action::Broadcast,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Escalate => "escalate",
            Self::Assign => "assign",
            Self::Close => "close",
            Self::Generate => "generate",
            Self::Verify => "verify",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Broadcast => "broadcast",
        }
    }
}

fn parse_resource(s: &str) -> Option<Resource> {
    Resource::ALL.into_iter().find(|r| r.slug() == s)
}

fn parse_action(s: &str) -> Option<Action> {
    Action::ALL.into_iter().find(|a| a.slug() == s)
}

// =============================================================================
// PERMISSION
// =============================================================================

/// A single `resource.action` permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    #[must_use]
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub const INCIDENTS_VIEW: Self = Self::new(Resource::Incidents, Action::View);
    pub const INCIDENTS_CREATE: Self = Self::new(Resource::Incidents, Action::Create);
    pub const INCIDENTS_UPDATE: Self = Self::new(Resource::Incidents, Action::Update);
    pub const INCIDENTS_ESCALATE: Self = Self::new(Resource::Incidents, Action::Escalate);
    pub const INCIDENTS_ASSIGN: Self = Self::new(Resource::Incidents, Action::Assign);
    pub const INCIDENTS_CLOSE: Self = Self::new(Resource::Incidents, Action::Close);
    pub const OFFICERS_VIEW: Self = Self::new(Resource::Officers, Action::View);
    pub const OFFICERS_CREATE: Self = Self::new(Resource::Officers, Action::Create);
    pub const OFFICERS_UPDATE: Self = Self::new(Resource::Officers, Action::Update);
    pub const ADMIN_UNITS_CREATE: Self = Self::new(Resource::AdminUnits, Action::Create);
    pub const REPORTS_VIEW: Self = Self::new(Resource::Reports, Action::View);
    pub const REGISTRATIONS_VIEW: Self = Self::new(Resource::Registrations, Action::View);
    pub const REGISTRATIONS_CREATE: Self = Self::new(Resource::Registrations, Action::Create);
    pub const REGISTRATIONS_VERIFY: Self = Self::new(Resource::Registrations, Action::Verify);
    pub const REGISTRATIONS_SUBMIT: Self = Self::new(Resource::Registrations, Action::Submit);
    pub const REGISTRATIONS_APPROVE: Self = Self::new(Resource::Registrations, Action::Approve);
    pub const CITIZENS_VIEW: Self = Self::new(Resource::Citizens, Action::View);
    pub const CITIZENS_CREATE: Self = Self::new(Resource::Citizens, Action::Create);
    pub const COMMUNICATIONS_CREATE: Self = Self::new(Resource::Communications, Action::Create);
    pub const COMMUNICATIONS_BROADCAST: Self =
        Self::new(Resource::Communications, Action::Broadcast);
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource.slug(), self.action.slug())
    }
}

impl FromStr for Permission {
    type Err = NgaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once('.')
            .ok_or_else(|| NgaoError::InvalidPermission(s.to_string()))?;
        match (parse_resource(resource), parse_action(action)) {
            (Some(resource), Some(action)) => Ok(Self { resource, action }),
            _ => Err(NgaoError::InvalidPermission(s.to_string())),
        }
    }
}

// =============================================================================
// GRANTS
// =============================================================================

/// One entry in a role's grant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grant {
    /// `ALL`: every permission.
    All,
    /// `resource.*`
    Wildcard(Resource),
    Exact(Permission),
}

impl Grant {
    #[must_use]
    pub fn covers(self, permission: Permission) -> bool {
        match self {
            Self::All => true,
            Self::Wildcard(resource) => resource == permission.resource,
            Self::Exact(p) => p == permission,
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Wildcard(resource) => write!(f, "{}.*", resource.slug()),
            Self::Exact(p) => p.fmt(f),
        }
    }
}

impl FromStr for Grant {
    type Err = NgaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            return Ok(Self::All);
        }
        if let Some(resource) = s.strip_suffix(".*") {
            return parse_resource(resource)
                .map(Self::Wildcard)
                .ok_or_else(|| NgaoError::InvalidPermission(s.to_string()));
        }
        s.parse().map(Self::Exact)
    }
}

// =============================================================================
// PERMISSION TABLE
// =============================================================================

/// Role → grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    grants: BTreeMap<Role, BTreeSet<Grant>>,
}

fn exact(resource: Resource, actions: &[Action]) -> impl Iterator<Item = Grant> + '_ {
    actions
        .iter()
        .map(move |a| Grant::Exact(Permission::new(resource, *a)))
}

impl PermissionTable {
    /// A table with no grants at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            grants: BTreeMap::new(),
        }
    }

    /// The built-in NGAO role table.
    #[must_use]
    pub fn builtin() -> Self {
        use Action::{
            Approve, Assign, Broadcast, Close, Create, Escalate, Generate, Submit, Update, Verify,
            View,
        };
        use Resource::{Citizens, Communications, Incidents, Officers, Registrations, Reports};

        let mut table = Self::empty();
        table.set(Role::CabinetSecretary, [Grant::All]);
        table.set(
            Role::PrincipalSecretary,
            Resource::ALL.into_iter().map(Grant::Wildcard),
        );
        table.set(
            Role::RegionalCommissioner,
            exact(Incidents, &[View, Update, Escalate, Assign, Close])
                .chain(exact(Officers, &[View, Update]))
                .chain(exact(Reports, &[View, Generate]))
                .chain(exact(Registrations, &[View]))
                .chain(exact(Communications, &[Create, Broadcast])),
        );
        table.set(
            Role::CountyCommissioner,
            exact(Incidents, &[View, Update, Escalate, Close])
                .chain(exact(Officers, &[View]))
                .chain(exact(Reports, &[View]))
                .chain(exact(Registrations, &[View, Approve]))
                .chain(exact(Communications, &[Create, Broadcast])),
        );
        table.set(
            Role::DeputyCountyCommissioner,
            exact(Incidents, &[View, Update, Escalate])
                .chain(exact(Registrations, &[View, Approve]))
                .chain(exact(Communications, &[Create, Broadcast])),
        );
        table.set(
            Role::AssistantCountyCommissioner,
            exact(Incidents, &[View, Update])
                .chain(exact(Registrations, &[View, Approve]))
                .chain(exact(Communications, &[Create, Broadcast])),
        );
        table.set(
            Role::Chief,
            exact(Incidents, &[Create, View, Update])
                .chain(exact(Registrations, &[Create, View, Verify, Submit]))
                .chain(exact(Citizens, &[Create, View]))
                .chain(exact(Communications, &[Create, Broadcast])),
        );
        table.set(
            Role::AssistantChief,
            exact(Incidents, &[Create, View])
                .chain(exact(Registrations, &[Create, View]))
                .chain(exact(Citizens, &[View]))
                .chain(exact(Communications, &[Create])),
        );
        table.set(
            Role::VillageElder,
            exact(Incidents, &[Create, View]).chain(exact(Communications, &[Create])),
        );
        table.set(
            Role::Police,
            exact(Incidents, &[View, Update, Close]).chain(exact(Communications, &[Create])),
        );
        table.set(Role::Citizen, exact(Incidents, &[Create]));
        table
    }

    /// Replace the grants of `role`.
    pub fn set(&mut self, role: Role, grants: impl IntoIterator<Item = Grant>) {
        self.grants.insert(role, grants.into_iter().collect());
    }

    /// Apply textual overrides (`role slug → grant strings`). Each listed role
    /// has its grants replaced; nothing is applied when any entry fails to parse.
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a [String])>,
    ) -> Result<Self, NgaoError> {
        let mut parsed = Vec::new();
        for (role, grants) in overrides {
            let role: Role = role.parse()?;
            let grants = grants
                .iter()
                .map(|g| g.parse::<Grant>())
                .collect::<Result<BTreeSet<_>, _>>()?;
            parsed.push((role, grants));
        }
        for (role, grants) in parsed {
            self.grants.insert(role, grants);
        }
        Ok(self)
    }

    #[must_use]
    pub fn allows(&self, role: Role, permission: Permission) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|grants| grants.iter().any(|g| g.covers(permission)))
    }

    #[must_use]
    pub fn grants(&self, role: Role) -> Vec<Grant> {
        self.grants
            .get(&role)
            .map(|g| g.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Borrowing view combining the grant table with the admin tree.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate<'a> {
    table: &'a PermissionTable,
    tree: &'a AdminTree,
}

impl<'a> PermissionGate<'a> {
    #[must_use]
    pub fn new(table: &'a PermissionTable, tree: &'a AdminTree) -> Self {
        Self { table, tree }
    }

    /// Whether the role grants `permission`, ignoring scope and activity.
    #[must_use]
    pub fn has_permission(&self, officer: &Officer, permission: Permission) -> bool {
        officer.is_superuser || self.table.allows(officer.role, permission)
    }

    /// Full check: activity, superuser, grant, then scope.
    pub fn authorize(
        &self,
        officer: &Officer,
        permission: Permission,
        target: Option<UnitId>,
    ) -> Result<(), NgaoError> {
        if !officer.is_active {
            return Err(NgaoError::InactiveOfficer(officer.id));
        }
        if officer.is_superuser {
            return Ok(());
        }
        if !self.table.allows(officer.role, permission) {
            return Err(NgaoError::PermissionDenied {
                role: officer.role.slug().to_string(),
                permission: permission.to_string(),
            });
        }
        match target {
            Some(unit) => self.check_scope(officer, unit),
            None => Ok(()),
        }
    }

    /// Scope check alone. Superusers see every unit.
    pub fn check_scope(&self, officer: &Officer, unit: UnitId) -> Result<(), NgaoError> {
        if officer.is_superuser || self.in_scope(officer, unit) {
            Ok(())
        } else {
            Err(NgaoError::OutOfScope {
                officer: officer.id,
                unit,
            })
        }
    }

    #[must_use]
    pub fn in_scope(&self, officer: &Officer, unit: UnitId) -> bool {
        officer.is_superuser
            || officer
                .admin_unit
                .is_some_and(|scope| self.tree.is_within(scope, unit))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminUnit, UnitLevel};
    use crate::UserId;
    use chrono::{TimeZone, Utc};

    fn tree() -> AdminTree {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time");
        let unit = |id, level, parent: Option<u64>| AdminUnit {
            id: UnitId(id),
            name: format!("u{id}"),
            code: format!("U{id}"),
            level,
            parent: parent.map(UnitId),
            created_at: at,
        };
        AdminTree::from_units(vec![
            unit(1, UnitLevel::Country, None),
            unit(2, UnitLevel::County, Some(1)),
            unit(3, UnitLevel::Location, Some(2)),
            unit(4, UnitLevel::County, Some(1)),
        ])
        .expect("tree")
    }

    fn officer(role: Role, unit: Option<u64>) -> Officer {
        Officer {
            id: UserId(10),
            email: "a@b.go.ke".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone: "+254700000000".into(),
            badge_number: None,
            role,
            admin_unit: unit.map(UnitId),
            is_active: true,
            is_superuser: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time"),
        }
    }

    #[test]
    fn grant_strings_roundtrip() {
        for text in ["ALL", "incidents.*", "registrations.approve"] {
            let grant: Grant = text.parse().expect("parse");
            assert_eq!(grant.to_string(), text);
        }
        assert!("incidents".parse::<Grant>().is_err());
        assert!("weather.view".parse::<Grant>().is_err());
        assert!("incidents.fly".parse::<Grant>().is_err());
    }

    #[test]
    fn builtin_table_matches_roles() {
        let t = PermissionTable::builtin();
        assert!(t.allows(Role::CabinetSecretary, Permission::ADMIN_UNITS_CREATE));
        assert!(t.allows(Role::PrincipalSecretary, Permission::OFFICERS_CREATE));
        assert!(t.allows(Role::CountyCommissioner, Permission::REGISTRATIONS_APPROVE));
        assert!(!t.allows(Role::RegionalCommissioner, Permission::REGISTRATIONS_APPROVE));
        assert!(t.allows(Role::Chief, Permission::REGISTRATIONS_VERIFY));
        assert!(!t.allows(Role::Chief, Permission::INCIDENTS_ESCALATE));
        assert!(t.allows(Role::Police, Permission::INCIDENTS_CLOSE));
        assert!(!t.allows(Role::Citizen, Permission::INCIDENTS_VIEW));
    }

    #[test]
    fn overrides_replace_role_grants() {
        let grants = vec!["incidents.view".to_string()];
        let t = PermissionTable::builtin()
            .with_overrides([("chief", grants.as_slice())])
            .expect("override");
        assert!(t.allows(Role::Chief, Permission::INCIDENTS_VIEW));
        assert!(!t.allows(Role::Chief, Permission::INCIDENTS_CREATE));

        let bad = vec!["incidents.fly".to_string()];
        let err = PermissionTable::builtin().with_overrides([("chief", bad.as_slice())]);
        assert!(matches!(err, Err(NgaoError::InvalidPermission(_))));
    }

    #[test]
    fn authorize_checks_in_order() {
        let table = PermissionTable::builtin();
        let tree = tree();
        let gate = PermissionGate::new(&table, &tree);

        let mut cc = officer(Role::CountyCommissioner, Some(2));
        assert!(gate.authorize(&cc, Permission::INCIDENTS_VIEW, Some(UnitId(3))).is_ok());
        assert!(matches!(
            gate.authorize(&cc, Permission::INCIDENTS_VIEW, Some(UnitId(4))),
            Err(NgaoError::OutOfScope { .. })
        ));
        assert!(matches!(
            gate.authorize(&cc, Permission::OFFICERS_CREATE, Some(UnitId(3))),
            Err(NgaoError::PermissionDenied { .. })
        ));

        cc.is_active = false;
        assert!(matches!(
            gate.authorize(&cc, Permission::INCIDENTS_VIEW, Some(UnitId(3))),
            Err(NgaoError::InactiveOfficer(_))
        ));
    }

    #[test]
    fn unit_less_officer_is_out_of_scope() {
        let table = PermissionTable::builtin();
        let tree = tree();
        let gate = PermissionGate::new(&table, &tree);
        let police = officer(Role::Police, None);
        assert!(gate.authorize(&police, Permission::INCIDENTS_VIEW, None).is_ok());
        assert!(gate.check_scope(&police, UnitId(3)).is_err());

        let mut root = officer(Role::Citizen, None);
        root.is_superuser = true;
        assert!(gate.authorize(&root, Permission::ADMIN_UNITS_CREATE, Some(UnitId(4))).is_ok());
    }
}
