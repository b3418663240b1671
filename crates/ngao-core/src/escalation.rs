//! # Role Hierarchy Resolver
//!
//! Deterministic lookup of the officer who should handle an incident or
//! approve a registration at a given place:
//!
//! 1. a role is posted to exactly one unit level (`Role::unit_level`)
//! 2. the responsible unit is the ancestor of the record's unit at that level
//! 3. the handler is the lowest-id active officer holding the role there
//!
//! Walking [`ESCALATION_CHAIN`] upward from a starting index gives the next
//! handler; vacant posts are skipped.

use crate::admin::AdminTree;
use crate::officers::Officer;
use crate::permissions::{Permission, PermissionTable};
use crate::roles::{ESCALATION_CHAIN, Role};
use crate::UnitId;

/// Active officer holding `role` at the unit responsible for `unit`.
pub fn find_handler<'a>(
    tree: &AdminTree,
    officers: &'a [Officer],
    role: Role,
    unit: UnitId,
) -> Option<&'a Officer> {
    let post = tree.ancestor_at_level(unit, role.unit_level()?)?;
    officers
        .iter()
        .filter(|o| o.is_active && o.role == role && o.admin_unit == Some(post))
        .min_by_key(|o| o.id)
}

/// First officer found walking the chain after index `after` (from the
/// bottom when `None`). Returns the chain index with the officer.
pub fn next_handler<'a>(
    tree: &AdminTree,
    officers: &'a [Officer],
    unit: UnitId,
    after: Option<usize>,
) -> Option<(usize, &'a Officer)> {
    let start = after.map_or(0, |i| i + 1);
    ESCALATION_CHAIN
        .iter()
        .enumerate()
        .skip(start)
        .find_map(|(i, role)| find_handler(tree, officers, *role, unit).map(|o| (i, o)))
}

/// Nearest officer above `initiator_role` whose role may approve registrations.
pub fn next_approver<'a>(
    tree: &AdminTree,
    officers: &'a [Officer],
    table: &PermissionTable,
    unit: UnitId,
    initiator_role: Role,
) -> Option<&'a Officer> {
    ESCALATION_CHAIN
        .iter()
        .filter(|role| role.outranks(initiator_role))
        .filter(|role| table.allows(**role, Permission::REGISTRATIONS_APPROVE))
        .find_map(|role| find_handler(tree, officers, *role, unit))
}
