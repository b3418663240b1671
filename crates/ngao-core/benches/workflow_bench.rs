//! # Workflow Benchmarks
//!
//! Performance benchmarks for the escalation resolver, the permission gate
//! and the in-memory engine.
//!
//! Run with: `cargo bench -p ngao-core`

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ngao_core::escalation::next_handler;
use ngao_core::{
    AdminTree, AdminUnit, Engine, IncidentType, NewAdminUnit, NewIncident, NewOfficer, Officer,
    Permission, PermissionGate, PermissionTable, Role, Timestamp, UnitId, UnitLevel, UserId,
};
use std::hint::black_box;

fn at() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("time")
}

/// A tree with `width` villages under every unit above the village level.
fn create_tree(width: u64) -> AdminTree {
    let mut units = Vec::new();
    let mut next = 1u64;
    let mut frontier = vec![None];
    for level in UnitLevel::ALL {
        let fan = if level == UnitLevel::Country { 1 } else { width };
        let mut created = Vec::new();
        for parent in &frontier {
            for _ in 0..fan {
                units.push(AdminUnit {
                    id: UnitId(next),
                    name: format!("unit {next}"),
                    code: format!("U{next}"),
                    level,
                    parent: *parent,
                    created_at: at(),
                });
                created.push(Some(UnitId(next)));
                next += 1;
            }
        }
        frontier = created;
    }
    AdminTree::from_units(units).expect("tree")
}

/// One officer per territorial post along every branch.
fn create_officers(tree: &AdminTree) -> Vec<Officer> {
    tree.units()
        .filter_map(|unit| {
            ngao_core::ESCALATION_CHAIN
                .iter()
                .find(|role| role.unit_level() == Some(unit.level))
                .map(|role| Officer {
                    id: UserId(unit.id.0),
                    email: format!("o{}@ngao.go.ke", unit.id),
                    first_name: "Bench".to_string(),
                    last_name: "Officer".to_string(),
                    phone: format!("+2547{:08}", unit.id.0),
                    badge_number: None,
                    role: *role,
                    admin_unit: Some(unit.id),
                    is_active: true,
                    is_superuser: false,
                    created_at: at(),
                })
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_next_handler(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_handler");

    for width in [1u64, 2, 3].iter() {
        let tree = create_tree(*width);
        let officers = create_officers(&tree);
        let village = tree
            .units()
            .filter(|u| u.level == UnitLevel::Village)
            .map(|u| u.id)
            .last()
            .expect("village");

        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, _| {
            b.iter(|| black_box(next_handler(&tree, &officers, village, Some(2))));
        });
    }

    group.finish();
}

fn bench_authorize(c: &mut Criterion) {
    let tree = create_tree(2);
    let officers = create_officers(&tree);
    let table = PermissionTable::builtin();
    let gate = PermissionGate::new(&table, &tree);
    let chief = officers
        .iter()
        .find(|o| o.role == Role::Chief)
        .expect("chief");
    let village = tree
        .units()
        .find(|u| u.level == UnitLevel::Village)
        .map(|u| u.id)
        .expect("village");

    c.bench_function("authorize_scoped", |b| {
        b.iter(|| black_box(gate.authorize(chief, Permission::INCIDENTS_VIEW, Some(village))));
    });
}

fn bench_report_incident(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_incident");

    for count in [10u64, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut engine = Engine::new();
                let root = engine
                    .bootstrap_superuser(
                        NewOfficer {
                            email: "root@ngao.go.ke".to_string(),
                            first_name: "Root".to_string(),
                            last_name: "User".to_string(),
                            phone: "+254700000000".to_string(),
                            badge_number: None,
                            role: Role::CabinetSecretary,
                            admin_unit: None,
                        },
                        at(),
                    )
                    .expect("root")
                    .id;
                let country = engine
                    .create_admin_unit(
                        root,
                        NewAdminUnit {
                            name: "Kenya".to_string(),
                            code: "KE".to_string(),
                            level: UnitLevel::Country,
                            parent: None,
                        },
                        at(),
                    )
                    .expect("unit")
                    .id;
                for i in 0..count {
                    let _ = engine.report_incident(
                        root,
                        NewIncident {
                            title: format!("incident {i}"),
                            description: "bench".to_string(),
                            incident_type: IncidentType::Other,
                            reporter_phone: None,
                            location: country,
                        },
                        at(),
                    );
                }
                black_box(engine)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_next_handler,
    bench_authorize,
    bench_report_incident,
);
criterion_main!(benches);
