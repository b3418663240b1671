//! # Roles
//!
//! The NGAO officer ranks, their hierarchy levels and the escalation chain.

use crate::NgaoError;
use crate::admin::UnitLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Officer role.
///
/// Variants are declared in ascending hierarchy order, but `Chief` and
/// `Police` share level 3, so compare ranks with [`Role::level`] or
/// [`Role::outranks`], not with `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Citizen,
    VillageElder,
    AssistantChief,
    Chief,
    Police,
    AssistantCountyCommissioner,
    DeputyCountyCommissioner,
    CountyCommissioner,
    RegionalCommissioner,
    PrincipalSecretary,
    CabinetSecretary,
}

/// Roles walked, in order, when an incident or approval moves up the hierarchy.
pub const ESCALATION_CHAIN: [Role; 9] = [
    Role::VillageElder,
    Role::AssistantChief,
    Role::Chief,
    Role::AssistantCountyCommissioner,
    Role::DeputyCountyCommissioner,
    Role::CountyCommissioner,
    Role::RegionalCommissioner,
    Role::PrincipalSecretary,
    Role::CabinetSecretary,
];

impl Role {
    pub const ALL: [Role; 11] = [
        Role::Citizen,
        Role::VillageElder,
        Role::AssistantChief,
        Role::Chief,
        Role::Police,
        Role::AssistantCountyCommissioner,
        Role::DeputyCountyCommissioner,
        Role::CountyCommissioner,
        Role::RegionalCommissioner,
        Role::PrincipalSecretary,
        Role::CabinetSecretary,
    ];

    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Citizen => 0,
            Self::VillageElder => 1,
            Self::AssistantChief => 2,
            Self::Chief | Self::Police => 3,
            Self::AssistantCountyCommissioner => 4,
            Self::DeputyCountyCommissioner => 5,
            Self::CountyCommissioner => 6,
            Self::RegionalCommissioner => 7,
            Self::PrincipalSecretary => 8,
            Self::CabinetSecretary => 9,
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::VillageElder => "village_elder",
            Self::AssistantChief => "assistant_chief",
            Self::Chief => "chief",
            Self::Police => "police",
            Self::AssistantCountyCommissioner => "acc",
            Self::DeputyCountyCommissioner => "dcc",
            Self::CountyCommissioner => "cc",
            Self::RegionalCommissioner => "rc",
            Self::PrincipalSecretary => "ps",
            Self::CabinetSecretary => "cs",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Citizen => "Citizen",
            Self::VillageElder => "Village Elder",
            Self::AssistantChief => "Assistant Chief",
            Self::Chief => "Chief",
            Self::Police => "Police",
            Self::AssistantCountyCommissioner => "Assistant County Commissioner",
            Self::DeputyCountyCommissioner => "Deputy County Commissioner",
            Self::CountyCommissioner => "County Commissioner",
            Self::RegionalCommissioner => "Regional Commissioner",
            Self::PrincipalSecretary => "Principal Secretary",
            Self::CabinetSecretary => "Cabinet Secretary",
        }
    }

    /// The admin-unit level this role is posted to. `None` for roles outside
    /// the territorial chain.
    #[must_use]
    pub const fn unit_level(self) -> Option<UnitLevel> {
        match self {
            Self::Citizen | Self::Police => None,
            Self::VillageElder => Some(UnitLevel::Village),
            Self::AssistantChief => Some(UnitLevel::SubLocation),
            Self::Chief => Some(UnitLevel::Location),
            Self::AssistantCountyCommissioner => Some(UnitLevel::Division),
            Self::DeputyCountyCommissioner => Some(UnitLevel::SubCounty),
            Self::CountyCommissioner => Some(UnitLevel::County),
            Self::RegionalCommissioner => Some(UnitLevel::Region),
            Self::PrincipalSecretary | Self::CabinetSecretary => Some(UnitLevel::Country),
        }
    }

    /// Position in [`ESCALATION_CHAIN`].
    #[must_use]
    pub fn chain_index(self) -> Option<usize> {
        ESCALATION_CHAIN.iter().position(|r| *r == self)
    }

    /// Strictly higher hierarchy level.
    #[must_use]
    pub const fn outranks(self, other: Role) -> bool {
        self.level() > other.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Role {
    type Err = NgaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.slug() == s)
            .ok_or_else(|| NgaoError::Validation(format!("unknown role '{s}'")))
    }
}
