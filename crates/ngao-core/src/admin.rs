//! # Administrative Hierarchy
//!
//! The geographic tree that scopes every officer and record:
//! Country → Region → County → Sub-County → Division → Location →
//! Sub-Location → Village.
//!
//! `AdminTree` is the in-memory index over stored `AdminUnit` records. It is
//! rebuilt when the engine opens and updated after each committed insert.

use crate::primitives::{MAX_HIERARCHY_DEPTH, MAX_NAME_LENGTH, bounded};
use crate::storage::{self, Record};
use crate::{NgaoError, Timestamp, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// UNIT LEVEL
// =============================================================================

/// Level of an administrative unit, ordered from the top of the tree down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitLevel {
    Country,
    Region,
    County,
    SubCounty,
    Division,
    Location,
    SubLocation,
    Village,
}

impl UnitLevel {
    pub const ALL: [UnitLevel; 8] = [
        UnitLevel::Country,
        UnitLevel::Region,
        UnitLevel::County,
        UnitLevel::SubCounty,
        UnitLevel::Division,
        UnitLevel::Location,
        UnitLevel::SubLocation,
        UnitLevel::Village,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Region => "region",
            Self::County => "county",
            Self::SubCounty => "sub_county",
            Self::Division => "division",
            Self::Location => "location",
            Self::SubLocation => "sub_location",
            Self::Village => "village",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, NgaoError> {
        Self::ALL
            .into_iter()
            .find(|level| level.slug() == slug)
            .ok_or_else(|| NgaoError::Validation(format!("unknown unit level '{slug}'")))
    }

    /// True when `self` sits strictly below `other` in the tree.
    #[must_use]
    pub fn is_below(self, other: UnitLevel) -> bool {
        self > other
    }
}

impl fmt::Display for UnitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// =============================================================================
// ADMIN UNIT
// =============================================================================

/// One administrative unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUnit {
    pub id: UnitId,
    pub name: String,
    /// Official unit code, unique across the tree (e.g. `KE-047`).
    pub code: String,
    pub level: UnitLevel,
    pub parent: Option<UnitId>,
    pub created_at: Timestamp,
}

impl Record for AdminUnit {
    const TABLE: &'static str = storage::ADMIN_UNITS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

/// Input for creating an admin unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdminUnit {
    pub name: String,
    pub code: String,
    pub level: UnitLevel,
    pub parent: Option<UnitId>,
}

// =============================================================================
// ADMIN TREE
// =============================================================================

/// In-memory index of the admin-unit hierarchy.
///
/// Uses `BTreeMap` for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct AdminTree {
    units: BTreeMap<UnitId, AdminUnit>,
    children: BTreeMap<UnitId, BTreeSet<UnitId>>,
    codes: BTreeMap<String, UnitId>,
}

impl AdminTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from stored units, validating every parent link.
    pub fn from_units(units: impl IntoIterator<Item = AdminUnit>) -> Result<Self, NgaoError> {
        let mut pending: Vec<AdminUnit> = units.into_iter().collect();
        // Parents always have lower ids than their children, so id order inserts top-down.
        pending.sort_by_key(|u| u.id);
        let mut tree = Self::new();
        for unit in pending {
            tree.validate(&NewAdminUnit {
                name: unit.name.clone(),
                code: unit.code.clone(),
                level: unit.level,
                parent: unit.parent,
            })?;
            tree.insert_validated(unit);
        }
        Ok(tree)
    }

    /// Check that a new unit can join the tree.
    pub fn validate(&self, new: &NewAdminUnit) -> Result<(), NgaoError> {
        bounded("unit name", &new.name, MAX_NAME_LENGTH)?;
        bounded("unit code", &new.code, MAX_NAME_LENGTH)?;
        if self.codes.contains_key(new.code.trim()) {
            return Err(NgaoError::Duplicate(format!(
                "admin unit code '{}' already exists",
                new.code.trim()
            )));
        }
        match new.parent {
            None if new.level != UnitLevel::Country => Err(NgaoError::Validation(format!(
                "a {} unit needs a parent",
                new.level
            ))),
            None => Ok(()),
            Some(parent_id) => {
                let parent = self.get(parent_id)?;
                if new.level.is_below(parent.level) {
                    Ok(())
                } else {
                    Err(NgaoError::Validation(format!(
                        "a {} unit cannot sit under a {} unit",
                        new.level, parent.level
                    )))
                }
            }
        }
    }

    /// Insert a unit that already passed [`AdminTree::validate`].
    pub fn insert_validated(&mut self, unit: AdminUnit) {
        if let Some(parent) = unit.parent {
            self.children.entry(parent).or_default().insert(unit.id);
        }
        self.codes.insert(unit.code.trim().to_string(), unit.id);
        self.units.insert(unit.id, unit);
    }

    pub fn get(&self, id: UnitId) -> Result<&AdminUnit, NgaoError> {
        self.units
            .get(&id)
            .ok_or_else(|| NgaoError::not_found("admin unit", id.0))
    }

    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&AdminUnit> {
        self.codes.get(code.trim()).and_then(|id| self.units.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &AdminUnit> {
        self.units.values()
    }

    /// Parents of `id`, nearest first. Bounded by `MAX_HIERARCHY_DEPTH`.
    pub fn ancestors(&self, id: UnitId) -> Result<Vec<UnitId>, NgaoError> {
        let mut out = Vec::new();
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if out.len() >= MAX_HIERARCHY_DEPTH {
                return Err(NgaoError::Validation(format!(
                    "admin hierarchy above unit {id} exceeds {MAX_HIERARCHY_DEPTH} levels"
                )));
            }
            out.push(parent);
            current = self.get(parent)?.parent;
        }
        Ok(out)
    }

    /// True when `target` equals `scope` or `scope` is one of its ancestors.
    ///
    /// Unknown units are never within anything.
    #[must_use]
    pub fn is_within(&self, scope: UnitId, target: UnitId) -> bool {
        if !self.contains(scope) || !self.contains(target) {
            return false;
        }
        scope == target
            || self
                .ancestors(target)
                .map(|chain| chain.contains(&scope))
                .unwrap_or(false)
    }

    /// The unit itself or its ancestor at `level`, if the tree has one.
    #[must_use]
    pub fn ancestor_at_level(&self, id: UnitId, level: UnitLevel) -> Option<UnitId> {
        let unit = self.units.get(&id)?;
        if unit.level == level {
            return Some(id);
        }
        if unit.level < level {
            return None;
        }
        self.ancestors(id)
            .ok()?
            .into_iter()
            .find(|ancestor| self.units.get(ancestor).is_some_and(|u| u.level == level))
    }

    /// Direct children of `id` in id order.
    #[must_use]
    pub fn children(&self, id: UnitId) -> Vec<UnitId> {
        self.children
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `id` and every unit below it, breadth first.
    #[must_use]
    pub fn descendants(&self, id: UnitId) -> Vec<UnitId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = vec![id];
        let mut cursor = 0;
        while cursor < out.len() {
            let next = self.children(out[cursor]);
            out.extend(next);
            cursor += 1;
        }
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn unit(id: u64, code: &str, level: UnitLevel, parent: Option<u64>) -> AdminUnit {
        AdminUnit {
            id: UnitId(id),
            name: code.to_string(),
            code: code.to_string(),
            level,
            parent: parent.map(UnitId),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time"),
        }
    }

    fn sample() -> AdminTree {
        AdminTree::from_units(vec![
            unit(1, "KE", UnitLevel::Country, None),
            unit(2, "NRB-R", UnitLevel::Region, Some(1)),
            unit(3, "NRB", UnitLevel::County, Some(2)),
            unit(4, "WESTLANDS", UnitLevel::SubCounty, Some(3)),
            unit(5, "KANGEMI", UnitLevel::Location, Some(4)),
            unit(6, "COAST", UnitLevel::Region, Some(1)),
        ])
        .expect("tree")
    }

    #[test]
    fn ancestors_nearest_first() {
        let tree = sample();
        assert_eq!(
            tree.ancestors(UnitId(5)).expect("ancestors"),
            vec![UnitId(4), UnitId(3), UnitId(2), UnitId(1)]
        );
        assert!(tree.ancestors(UnitId(1)).expect("root").is_empty());
    }

    #[test]
    fn is_within_is_reflexive_and_downward_only() {
        let tree = sample();
        assert!(tree.is_within(UnitId(3), UnitId(3)));
        assert!(tree.is_within(UnitId(3), UnitId(5)));
        assert!(!tree.is_within(UnitId(5), UnitId(3)));
        assert!(!tree.is_within(UnitId(6), UnitId(5)));
        assert!(!tree.is_within(UnitId(99), UnitId(5)));
    }

    #[test]
    fn ancestor_at_level_skips_missing_levels() {
        let tree = sample();
        assert_eq!(tree.ancestor_at_level(UnitId(5), UnitLevel::County), Some(UnitId(3)));
        assert_eq!(tree.ancestor_at_level(UnitId(5), UnitLevel::Location), Some(UnitId(5)));
        // No division between sub-county and location in this tree.
        assert_eq!(tree.ancestor_at_level(UnitId(5), UnitLevel::Division), None);
        // Level below the unit itself.
        assert_eq!(tree.ancestor_at_level(UnitId(3), UnitLevel::Village), None);
    }

    #[test]
    fn validate_rejects_bad_parents() {
        let tree = sample();
        let upside_down = NewAdminUnit {
            name: "x".into(),
            code: "X".into(),
            level: UnitLevel::Region,
            parent: Some(UnitId(5)),
        };
        assert!(matches!(tree.validate(&upside_down), Err(NgaoError::Validation(_))));

        let orphan = NewAdminUnit {
            name: "y".into(),
            code: "Y".into(),
            level: UnitLevel::County,
            parent: None,
        };
        assert!(matches!(tree.validate(&orphan), Err(NgaoError::Validation(_))));

        let dup = NewAdminUnit {
            name: "z".into(),
            code: "NRB".into(),
            level: UnitLevel::SubCounty,
            parent: Some(UnitId(3)),
        };
        assert!(matches!(tree.validate(&dup), Err(NgaoError::Duplicate(_))));
    }

    #[test]
    fn descendants_breadth_first() {
        let tree = sample();
        assert_eq!(
            tree.descendants(UnitId(2)),
            vec![UnitId(2), UnitId(3), UnitId(4), UnitId(5)]
        );
        assert_eq!(tree.children(UnitId(1)), vec![UnitId(2), UnitId(6)]);
    }
}
