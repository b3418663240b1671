//! Integration tests for the NGAO HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket. The
//! directory is loaded through the seed module, as `ngao seed` does.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::{TestRequest, TestServer};
use chrono::{NaiveDate, Utc};
use ngao::api::{AppState, ErrorResponse, HealthResponse, OFFICER_HEADER, create_router};
use ngao::config::SecurityConfig;
use ngao::seed::Seed;
use ngao_core::{
    CitizenId, Communication, CommunicationKind, Dashboard, DecisionOutcome, Engine,
    EscalationOutcome, Gender, Incident, IncidentStatus, NewCitizen, NewOfficer, Role,
    TransitionRecord, UnitId, UserId,
};
use serde_json::json;

// =============================================================================
// FIXTURE
// =============================================================================

struct Fixture {
    server: TestServer,
    root: UserId,
    elder: UserId,
    assistant_chief: UserId,
    chief: UserId,
    acc: UserId,
    cc: UserId,
    village: UnitId,
    mother: CitizenId,
    applicant: CitizenId,
}

fn seed() -> Seed {
    let levels = [
        "country",
        "region",
        "county",
        "sub_county",
        "division",
        "location",
        "sub_location",
        "village",
    ];
    let units: Vec<_> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            json!({
                "name": format!("{level} one"),
                "code": format!("{level}-1"),
                "level": level,
                "parent": i.checked_sub(1).map(|p| format!("{}-1", levels[p])),
            })
        })
        .collect();
    let officers: Vec<_> = [
        ("village_elder", "village"),
        ("assistant_chief", "sub_location"),
        ("chief", "location"),
        ("acc", "division"),
        ("dcc", "sub_county"),
        ("cc", "county"),
    ]
    .iter()
    .enumerate()
    .map(|(n, (role, level))| {
        json!({
            "email": format!("{role}@ngao.go.ke"),
            "first_name": "Officer",
            "last_name": format!("{n}"),
            "phone": format!("+25471100000{n}"),
            "role": role,
            "unit": format!("{level}-1"),
        })
    })
    .collect();
    Seed::parse(&json!({ "units": units, "officers": officers }).to_string()).unwrap()
}

fn fixture_with(security: &SecurityConfig) -> Fixture {
    let mut engine = Engine::new();
    let now = Utc::now();
    let root = engine
        .bootstrap_superuser(
            NewOfficer {
                email: "root@ngao.go.ke".to_string(),
                first_name: "System".to_string(),
                last_name: "Admin".to_string(),
                phone: "+254700000000".to_string(),
                badge_number: None,
                role: Role::CabinetSecretary,
                admin_unit: None,
            },
            now,
        )
        .unwrap()
        .id;
    let report = seed().apply(&mut engine, root, now).unwrap();
    assert_eq!(report.units_created, 8);
    let [elder, assistant_chief, chief, acc, _dcc, cc] = report.officers_created[..] else {
        panic!("expected six officers, got {:?}", report.officers_created);
    };
    let village = engine.tree().by_code("village-1").unwrap().id;
    let mother = engine
        .register_citizen(
            chief,
            NewCitizen {
                id_number: Some("23456789".to_string()),
                first_name: "Akinyi".to_string(),
                middle_name: None,
                last_name: "Odhiambo".to_string(),
                gender: Gender::Female,
                date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 14).unwrap(),
                place_of_birth: "Kisumu".to_string(),
                father_id_number: None,
                mother_id_number: None,
                area: village,
            },
            now,
        )
        .unwrap()
        .id;

    let applicant = engine
        .register_citizen(
            chief,
            NewCitizen {
                id_number: None,
                first_name: "Otieno".to_string(),
                middle_name: None,
                last_name: "Odhiambo".to_string(),
                gender: Gender::Male,
                date_of_birth: NaiveDate::from_ymd_opt(2005, 7, 2).unwrap(),
                place_of_birth: "Kisumu".to_string(),
                father_id_number: None,
                mother_id_number: Some("23456789".to_string()),
                area: village,
            },
            now,
        )
        .unwrap()
        .id;

    let router = create_router(AppState::new(engine), security);
    Fixture {
        server: TestServer::new(router).unwrap(),
        root,
        elder,
        assistant_chief,
        chief,
        acc,
        cc,
        village,
        mother,
        applicant,
    }
}

/// No API key and no rate limit.
fn fixture() -> Fixture {
    fixture_with(&SecurityConfig {
        api_key: None,
        rate_limit: 0,
        cors_origins: None,
    })
}

fn officer_header() -> HeaderName {
    HeaderName::from_static(OFFICER_HEADER)
}

fn acting(request: TestRequest, officer: UserId) -> TestRequest {
    request.add_header(officer_header(), HeaderValue::from(officer.0))
}

impl Fixture {
    fn get(&self, path: &str, officer: UserId) -> TestRequest {
        acting(self.server.get(path), officer)
    }

    fn post(&self, path: &str, officer: UserId) -> TestRequest {
        acting(self.server.post(path), officer)
    }

    async fn report_fire(&self) -> Incident {
        let response = self
            .post("/incidents", self.elder)
            .json(&json!({
                "title": "Market fire",
                "description": "Stalls burning near the bus stage",
                "incident_type": "Fire",
                "reporter_phone": "+254722000111",
                "location": self.village,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }
}

// =============================================================================
// HEALTH & IDENTITY
// =============================================================================

#[tokio::test]
async fn health_needs_no_officer() {
    let fx = fixture();
    let response = fx.server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.persistent);
}

#[tokio::test]
async fn missing_officer_header_is_a_bad_request() {
    let fx = fixture();
    let response = fx.server.get("/incidents").await;
    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_officer_is_unauthorized() {
    let fx = fixture();
    let response = fx.get("/incidents", UserId(999)).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "UNKNOWN_OFFICER");
}

// =============================================================================
// INCIDENTS
// =============================================================================

#[tokio::test]
async fn reported_incident_goes_to_the_village_elder() {
    let fx = fixture();
    let incident = fx.report_fire().await;
    assert_eq!(incident.status, IncidentStatus::Reported);
    assert_eq!(incident.current_handler, Some(fx.elder));

    let fetched: Incident = fx
        .get(&format!("/incidents/{}", incident.id), fx.elder)
        .await
        .json();
    assert_eq!(fetched, incident);
}

#[tokio::test]
async fn escalation_hands_the_incident_up() {
    let fx = fixture();
    let incident = fx.report_fire().await;

    let response = fx
        .post(&format!("/incidents/{}/escalate", incident.id), fx.elder)
        .await;
    response.assert_status_ok();
    let outcome: EscalationOutcome = response.json();
    assert!(matches!(
        outcome,
        EscalationOutcome::Escalated { handler, .. } if handler == fx.assistant_chief
    ));

    let mine: Vec<Incident> = fx.get("/incidents", fx.assistant_chief).await.json();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, IncidentStatus::Escalated);
    assert_eq!(mine[0].current_handler, Some(fx.assistant_chief));
}

#[tokio::test]
async fn invalid_transition_is_a_conflict() {
    let fx = fixture();
    let incident = fx.report_fire().await;
    let path = format!("/incidents/{}/transition", incident.id);

    fx.post(&path, fx.elder)
        .json(&json!({ "status": "resolved", "note": "Put out by neighbours" }))
        .await
        .assert_status_ok();

    let response = fx
        .post(&path, fx.elder)
        .json(&json!({ "status": "dispatched" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "INVALID_TRANSITION");

    let history: Vec<TransitionRecord> = fx
        .get(&format!("/history/incident/{}", incident.id), fx.elder)
        .await
        .json();
    let steps: Vec<&str> = history.iter().map(|r| r.to.as_str()).collect();
    assert_eq!(steps, ["reported", "resolved"]);
    assert_eq!(history[1].note.as_deref(), Some("Put out by neighbours"));
}

#[tokio::test]
async fn unknown_status_in_query_is_rejected() {
    let fx = fixture();
    fx.get("/incidents?status=burning", fx.cc)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn responses_are_listed_per_incident() {
    let fx = fixture();
    let incident = fx.report_fire().await;
    let path = format!("/incidents/{}/responses", incident.id);

    fx.post(&path, fx.elder)
        .json(&json!({ "comment": "Fire brigade called" }))
        .await
        .assert_status(StatusCode::CREATED);

    let responses: Vec<serde_json::Value> = fx.get(&path, fx.elder).await.json();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["comment"], "Fire brigade called");
}

#[tokio::test]
async fn assignment_needs_the_assign_permission() {
    let fx = fixture();
    let incident = fx.report_fire().await;
    let path = format!("/incidents/{}/assign", incident.id);

    let denied = fx
        .post(&path, fx.cc)
        .json(&json!({ "officer": fx.chief }))
        .await;
    denied.assert_status(StatusCode::FORBIDDEN);
    let error: ErrorResponse = denied.json();
    assert_eq!(error.code, "PERMISSION_DENIED");

    let response = fx
        .post(&path, fx.root)
        .json(&json!({ "officer": fx.chief }))
        .await;
    response.assert_status_ok();
    let assigned: Incident = response.json();
    assert_eq!(assigned.current_handler, Some(fx.chief));
    assert_eq!(assigned.chain_index, Some(2));

    let inbox: Vec<Communication> = fx.get("/inbox", fx.chief).await.json();
    assert_eq!(inbox[0].title, "Incident assigned");
}

// =============================================================================
// REGISTRATIONS
// =============================================================================

#[tokio::test]
async fn birth_is_approved_by_the_assistant_county_commissioner() {
    let fx = fixture();
    let response = fx
        .post("/registrations/births", fx.chief)
        .json(&json!({
            "child_first_name": "Baraka",
            "child_last_name": "Odhiambo",
            "gender": "Male",
            "date_of_birth": "2024-05-01",
            "place_of_birth": "Kisumu County Hospital",
            "mother": fx.mother,
            "admin_unit": fx.village,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let birth: serde_json::Value = response.json();
    let id = birth["id"].as_u64().unwrap();
    assert_eq!(birth["status"], "Draft");

    fx.post(&format!("/registrations/births/{id}/submit"), fx.chief)
        .await
        .assert_status_ok();

    let decision = format!("/registrations/birth/{id}/decision");
    let denied = fx
        .post(&decision, fx.chief)
        .json(&json!({ "decision": "approve" }))
        .await;
    denied.assert_status(StatusCode::FORBIDDEN);

    let response = fx
        .post(&decision, fx.acc)
        .json(&json!({ "decision": "approve" }))
        .await;
    response.assert_status_ok();
    let outcome: DecisionOutcome = response.json();
    assert_eq!(outcome.status, "approved");
    assert!(outcome.citizen.is_some());

    let stored: serde_json::Value = fx
        .get(&format!("/registrations/birth/{id}"), fx.acc)
        .await
        .json();
    assert_eq!(stored["status"], "Approved");
}

#[tokio::test]
async fn rejection_needs_a_reason() {
    let fx = fixture();
    fx.post("/registrations/birth/1/decision", fx.acc)
        .json(&json!({ "decision": "reject" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn unknown_registration_kind_is_rejected() {
    let fx = fixture();
    fx.get("/registrations/adoption/1", fx.acc)
        .await
        .assert_status_bad_request();
    fx.get("/history/adoption/1", fx.acc)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn missing_registration_is_not_found() {
    let fx = fixture();
    let response = fx.get("/registrations/death/42", fx.cc).await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn national_id_request_is_rejected_once() {
    let fx = fixture();
    let response = fx
        .post("/national-id", fx.chief)
        .json(&json!({
            "applicant": fx.applicant,
            "mother": fx.mother,
            "admin_unit": fx.village,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let request: serde_json::Value = response.json();
    let id = request["id"].as_u64().unwrap();
    assert_eq!(request["status"], "Initiated");

    let path = format!("/national-id/{id}/reject");
    let body = json!({ "reason": "mother's records do not match" });
    fx.post(&path, fx.elder)
        .json(&body)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = fx.post(&path, fx.chief).json(&body).await;
    response.assert_status_ok();
    let rejected: serde_json::Value = response.json();
    assert_eq!(rejected["status"], "Rejected");
    assert_eq!(rejected["rejection_reason"], "mother's records do not match");

    let again = fx.post(&path, fx.chief).json(&body).await;
    again.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = again.json();
    assert_eq!(error.code, "INVALID_TRANSITION");

    let history: Vec<TransitionRecord> = fx
        .get(&format!("/history/national_id/{id}"), fx.chief)
        .await
        .json();
    let steps: Vec<&str> = history.iter().map(|r| r.to.as_str()).collect();
    assert_eq!(steps, ["initiated", "rejected"]);
}

// =============================================================================
// MESSAGING & STATS
// =============================================================================

#[tokio::test]
async fn direct_message_reaches_the_inbox() {
    let fx = fixture();
    let response = fx
        .post("/messages", fx.chief)
        .json(&json!({ "recipient": fx.elder, "body": "Baraza on Friday at 10am" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let messages = |inbox: Vec<Communication>| -> Vec<Communication> {
        inbox
            .into_iter()
            .filter(|c| c.kind == CommunicationKind::Message)
            .collect()
    };

    let inbox = messages(fx.get("/inbox", fx.elder).await.json());
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].sender, Some(fx.chief));
    assert!(!inbox[0].is_read_by(fx.elder));

    let read: Communication = fx
        .post(&format!("/inbox/{}/read", inbox[0].id), fx.elder)
        .await
        .json();
    assert!(read.is_read_by(fx.elder));

    let chiefs = messages(fx.get("/inbox", fx.chief).await.json());
    assert!(chiefs.is_empty());
}

#[tokio::test]
async fn dashboard_counts_open_incidents() {
    let fx = fixture();
    fx.report_fire().await;
    fx.report_fire().await;

    let response = fx.get("/stats", fx.cc).await;
    response.assert_status_ok();
    let dashboard: Dashboard = response.json();
    assert_eq!(dashboard.total_incidents, 2);
    assert_eq!(dashboard.open_incidents, 2);
}

// =============================================================================
// SECURITY
// =============================================================================

#[tokio::test]
async fn api_key_guards_everything_but_health() {
    let fx = fixture_with(&SecurityConfig {
        api_key: Some("test-secret-key-12345".to_string()),
        rate_limit: 0,
        cors_origins: None,
    });

    fx.server.get("/health").await.assert_status_ok();
    fx.get("/stats", fx.cc)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    fx.get("/stats", fx.cc)
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    fx.get("/stats", fx.cc)
        .add_header(
            header::AUTHORIZATION,
            "Bearer test-secret-key-12345".parse::<HeaderValue>().unwrap(),
        )
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn rate_limit_returns_too_many_requests() {
    let fx = fixture_with(&SecurityConfig {
        api_key: None,
        rate_limit: 1,
        cors_origins: None,
    });
    fx.server.get("/health").await.assert_status_ok();
    fx.server
        .get("/health")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn cors_preflight_allows_localhost_and_the_officer_header() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let router = create_router(
        AppState::new(Engine::new()),
        &SecurityConfig {
            api_key: None,
            rate_limit: 0,
            cors_origins: None,
        },
    );
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/incidents")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, OFFICER_HEADER)
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok());
    assert_eq!(allowed, Some("http://localhost:3000"));
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let fx = fixture();
    let response = fx
        .post("/incidents", fx.elder)
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;
    assert!(response.status_code().is_client_error());

    let response = fx.server.post("/health").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}
