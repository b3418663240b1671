//! # Seed Files
//!
//! JSON bootstrap data: admin units (parents referenced by code) and the
//! officers posted to them.
//!
//! ```json
//! {
//!   "units": [
//!     { "name": "Kenya", "code": "KE", "level": "country" },
//!     { "name": "Nairobi", "code": "KE-047", "level": "county", "parent": "KE" }
//!   ],
//!   "officers": [
//!     {
//!       "email": "cc.nairobi@ngao.go.ke",
//!       "first_name": "Amina",
//!       "last_name": "Otieno",
//!       "phone": "+254712345678",
//!       "role": "cc",
//!       "unit": "KE-047"
//!     }
//!   ]
//! }
//! ```
//!
//! Units whose code already exists are skipped, so a seed can be re-run
//! after adding units to it.

use ngao_core::{
    Engine, NewAdminUnit, NewOfficer, NgaoError, Role, Timestamp, UnitId, UnitLevel, UserId,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum seed file size (10 MB).
const MAX_SEED_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    #[serde(default)]
    pub units: Vec<SeedUnit>,
    #[serde(default)]
    pub officers: Vec<SeedOfficer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUnit {
    pub name: String,
    pub code: String,
    /// Level slug (`country` … `village`).
    pub level: String,
    /// Code of the parent unit.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedOfficer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub badge_number: Option<String>,
    /// Role slug (`village_elder` … `cs`).
    pub role: String,
    /// Code of the unit the officer is posted to.
    #[serde(default)]
    pub unit: Option<String>,
}

/// What a seed run created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub units_created: usize,
    pub units_skipped: usize,
    pub officers_created: Vec<UserId>,
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Canonicalize `path` and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, NgaoError> {
    let canonical = path.canonicalize().map_err(|e| {
        NgaoError::Storage(format!("invalid file path '{}': {e}", path.display()))
    })?;
    if !canonical.is_file() {
        return Err(NgaoError::Storage(format!(
            "path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), NgaoError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| NgaoError::Storage(format!("cannot read file metadata: {e}")))?;
    if metadata.len() > max_size {
        return Err(NgaoError::Validation(format!(
            "file size {} bytes exceeds maximum allowed {max_size} bytes",
            metadata.len()
        )));
    }
    Ok(())
}

// =============================================================================
// LOADING & APPLYING
// =============================================================================

impl Seed {
    pub fn parse(text: &str) -> Result<Self, NgaoError> {
        serde_json::from_str(text).map_err(|e| NgaoError::Validation(format!("invalid seed: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, NgaoError> {
        let path = validate_file_path(path)?;
        validate_file_size(&path, MAX_SEED_FILE_SIZE)?;
        let text = std::fs::read_to_string(&path)
            .map_err(|e| NgaoError::Storage(format!("cannot read seed file: {e}")))?;
        Self::parse(&text)
    }

    /// Create the units, then the officers, acting as `actor`.
    ///
    /// Stops at the first failing record; records created before it stay.
    pub fn apply(
        &self,
        engine: &mut Engine,
        actor: UserId,
        now: Timestamp,
    ) -> Result<SeedReport, NgaoError> {
        let mut report = SeedReport::default();

        for unit in &self.units {
            if engine.tree().by_code(&unit.code).is_some() {
                report.units_skipped += 1;
                continue;
            }
            let new = NewAdminUnit {
                name: unit.name.clone(),
                code: unit.code.clone(),
                level: UnitLevel::from_slug(&unit.level)?,
                parent: unit
                    .parent
                    .as_deref()
                    .map(|code| unit_by_code(engine, code))
                    .transpose()?,
            };
            engine.create_admin_unit(actor, new, now)?;
            report.units_created += 1;
        }

        for officer in &self.officers {
            let new = NewOfficer {
                email: officer.email.clone(),
                first_name: officer.first_name.clone(),
                last_name: officer.last_name.clone(),
                phone: officer.phone.clone(),
                badge_number: officer.badge_number.clone(),
                role: officer.role.parse::<Role>()?,
                admin_unit: officer
                    .unit
                    .as_deref()
                    .map(|code| unit_by_code(engine, code))
                    .transpose()?,
            };
            let created = engine.register_officer(actor, new, now)?;
            report.officers_created.push(created.id);
        }

        Ok(report)
    }
}

fn unit_by_code(engine: &Engine, code: &str) -> Result<UnitId, NgaoError> {
    engine
        .tree()
        .by_code(code)
        .map(|unit| unit.id)
        .ok_or_else(|| NgaoError::Validation(format!("unknown admin unit code '{code}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_fields() {
        assert!(Seed::parse(r#"{"units": [], "citizens": []}"#).is_err());
    }

    #[test]
    fn empty_document_is_an_empty_seed() {
        assert_eq!(Seed::parse("{}").expect("seed"), Seed::default());
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Seed::from_file(&dir.path().join("absent.json")).is_err());
        assert!(Seed::from_file(dir.path()).is_err());
    }
}
