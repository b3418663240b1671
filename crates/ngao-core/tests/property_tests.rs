//! # Property-Based Tests
//!
//! Determinism and state-machine invariants checked with proptest.

use chrono::{TimeZone, Utc};
use ngao_core::escalation::{find_handler, next_handler};
use ngao_core::registrations::reference_number;
use ngao_core::{
    AdminTree, AdminUnit, BirthStatus, Incident, IncidentId, IncidentStatus, IncidentType,
    NationalIdStatus, Officer, RegistrationId, RegistrationStatus, Role, UnitId, UnitLevel,
    UserId, WorkflowStatus, check_transition,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// HELPERS
// =============================================================================

fn at() -> ngao_core::Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("time")
}

/// Country → ... → Village, ids 1..=8.
fn branch() -> AdminTree {
    let units = UnitLevel::ALL.into_iter().enumerate().map(|(i, level)| {
        let id = i as u64 + 1;
        AdminUnit {
            id: UnitId(id),
            name: format!("{level}"),
            code: format!("U{id}"),
            level,
            parent: (id > 1).then_some(UnitId(id.saturating_sub(1))),
            created_at: at(),
        }
    });
    AdminTree::from_units(units).expect("tree")
}

fn officer(id: u64, role: Role, unit: u64, active: bool) -> Officer {
    Officer {
        id: UserId(id),
        email: format!("o{id}@ngao.go.ke"),
        first_name: "Test".to_string(),
        last_name: "Officer".to_string(),
        phone: format!("+2547{id:08}"),
        badge_number: None,
        role,
        admin_unit: Some(UnitId(unit)),
        is_active: active,
        is_superuser: false,
        created_at: at(),
    }
}

fn territorial_role() -> impl Strategy<Value = Role> {
    prop::sample::select(ngao_core::ESCALATION_CHAIN.to_vec())
}

fn terminal_states_have_no_exit<S: WorkflowStatus>() -> bool {
    S::all()
        .iter()
        .filter(|s| s.is_terminal())
        .all(|from| S::all().iter().all(|to| check_transition(*from, *to).is_err()))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Walking random edges of the incident machine never leaves a closed
    /// incident and only ever reaches legal states.
    #[test]
    fn incident_walk_respects_edges(steps in vec(0usize..6, 1..40)) {
        let all = IncidentStatus::all();
        let mut state = IncidentStatus::Reported;
        for step in steps {
            let to = all[step];
            match check_transition(state, to) {
                Ok(()) => {
                    prop_assert!(state != IncidentStatus::Closed);
                    state = to;
                }
                Err(_) => prop_assert!(!state.can_transition_to(to)),
            }
        }
    }

    /// Reference numbers carry the prefix, timestamp and a zero-padded id.
    #[test]
    fn reference_number_layout(id in 0u64..10_000_000, secs in 0i64..4_000_000_000) {
        let when = Utc.timestamp_opt(secs, 0).single().expect("time");
        let reference = reference_number("NID", when, RegistrationId(id));
        let parts: Vec<&str> = reference.split('-').collect();
        prop_assert_eq!(parts.len(), 3);
        prop_assert_eq!(parts[0], "NID");
        prop_assert_eq!(parts[1].len(), 14);
        prop_assert!(parts[2].len() >= 5);
        prop_assert_eq!(parts[2].parse::<u64>().expect("id"), id);
    }

    /// The handler for a post is the lowest active id, whatever the input order.
    #[test]
    fn find_handler_ignores_directory_order(
        ids in vec(1u64..500, 1..20),
        role in territorial_role(),
        rotate in 0usize..20,
    ) {
        let tree = branch();
        let level = role.unit_level().expect("territorial");
        let post = tree.units().find(|u| u.level == level).expect("post").id;
        let mut officers: Vec<Officer> = ids
            .iter()
            .map(|id| officer(*id, role, post.0, id % 3 != 0))
            .collect();

        let village = UnitId(8);
        let first = find_handler(&tree, &officers, role, village).map(|o| o.id);
        let len = officers.len();
        officers.rotate_left(rotate % len);
        let second = find_handler(&tree, &officers, role, village).map(|o| o.id);

        prop_assert_eq!(first, second);
        let expected = ids.iter().filter(|id| *id % 3 != 0).min().map(|id| UserId(*id));
        prop_assert_eq!(first, expected);
    }

    /// Escalation only ever moves up the chain.
    #[test]
    fn next_handler_moves_upward(filled in vec(any::<bool>(), 9), after in 0usize..9) {
        let tree = branch();
        let officers: Vec<Officer> = ngao_core::ESCALATION_CHAIN
            .iter()
            .zip(&filled)
            .enumerate()
            .filter(|(_, (_, present))| **present)
            .map(|(i, (role, _))| {
                let level = role.unit_level().expect("territorial");
                let post = tree.units().find(|u| u.level == level).expect("post").id;
                officer(i as u64 + 1, *role, post.0, true)
            })
            .collect();

        match next_handler(&tree, &officers, UnitId(8), Some(after)) {
            Some((index, handler)) => {
                prop_assert!(index > after);
                prop_assert!(filled[index]);
                prop_assert_eq!(handler.role, ngao_core::ESCALATION_CHAIN[index]);
            }
            None => prop_assert!(filled.iter().skip(after + 1).all(|f| !f)),
        }
    }

    /// Round-robin visits every handler exactly once per cycle.
    #[test]
    fn rotation_cycles_all_handlers(count in 1u64..12) {
        let mut incident = Incident {
            id: IncidentId(1),
            title: "Fire".to_string(),
            description: "Smoke".to_string(),
            incident_type: IncidentType::Fire,
            reporter_phone: None,
            location: UnitId(8),
            status: IncidentStatus::Reported,
            handlers: Vec::new(),
            current_handler: None,
            escalation_level: 0,
            chain_index: None,
            reported_by: UserId(100),
            reported_at: at(),
            resolved_at: None,
        };
        for id in 1..=count {
            incident.hand_to(UserId(id));
        }
        let mut seen = Vec::new();
        for _ in 0..count {
            incident.current_handler = incident.next_in_rotation();
            seen.push(incident.current_handler.expect("handler"));
        }
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len() as u64, count);
        prop_assert_eq!(incident.current_handler, Some(UserId(count)));
    }
}

#[test]
fn terminal_states_are_final() {
    assert!(terminal_states_have_no_exit::<IncidentStatus>());
    assert!(terminal_states_have_no_exit::<BirthStatus>());
    assert!(terminal_states_have_no_exit::<RegistrationStatus>());
    assert!(terminal_states_have_no_exit::<NationalIdStatus>());
}
