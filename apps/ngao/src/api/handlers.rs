//! # API Endpoint Handlers
//!
//! Each handler names the acting officer through [`Actor`], takes the
//! engine lock, and passes the current time into the engine.

use super::{
    AppState,
    auth::Actor,
    types::{
        AnnouncementRequest, ApiError, ApiResult, AssignRequest, CompleteRequest,
        DecisionRequest, HealthResponse, IncidentQuery, MessageRequest, RejectRequest,
        ResponseRequest, TransitionRequest, VerifyRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ngao_core::{
    BirthRegistration, Communication, CommunicationId, Dashboard, DeathRegistration,
    DecisionOutcome, EntityKind, EntityRef, EscalationOutcome, Incident, IncidentId,
    IncidentStatus, MarriageRegistration, NationalIdRequest, NewBirth, NewDeath, NewIncident,
    NewMarriage, NewNationalId, NgaoError, RegistrationId, RegistrationRef, Response,
    Timestamp, TransitionRecord, UserId,
};
use serde::Serialize;

/// Created response with a JSON body.
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

fn now() -> Timestamp {
    chrono::Utc::now()
}

fn created<T>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, NgaoError> {
    serde_json::to_value(value).map_err(|e| NgaoError::Serialization(e.to_string()))
}

// =============================================================================
// HEALTH
// =============================================================================

/// Health check endpoint. Never requires an officer.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.engine.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistent: engine.is_persistent(),
    })
}

// =============================================================================
// INCIDENTS
// =============================================================================

pub async fn list_incidents_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<IncidentQuery>,
) -> ApiResult<Vec<Incident>> {
    let filter = query.to_filter()?;
    let engine = state.engine.read().await;
    Ok(Json(engine.incidents_visible_to(actor, filter)?))
}

pub async fn report_incident_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewIncident>,
) -> Created<Incident> {
    let mut engine = state.engine.write().await;
    let incident = engine.report_incident(actor, request, now())?;
    tracing::info!(
        event = "incident_reported",
        incident = %incident.id,
        location = %incident.location,
        handler = ?incident.current_handler,
        "Incident reported"
    );
    Ok(created(incident))
}

pub async fn get_incident_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<Incident> {
    let engine = state.engine.read().await;
    Ok(Json(engine.incident(actor, IncidentId(id))?))
}

pub async fn transition_incident_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Incident> {
    let to: IncidentStatus = request.status.parse()?;
    let mut engine = state.engine.write().await;
    let incident = engine.transition_incident(actor, IncidentId(id), to, request.note, now())?;
    tracing::info!(event = "incident_transition", incident = id, status = %incident.status);
    Ok(Json(incident))
}

pub async fn escalate_incident_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<EscalationOutcome> {
    let mut engine = state.engine.write().await;
    let outcome = engine.escalate_incident(actor, IncidentId(id), now())?;
    tracing::info!(event = "incident_escalated", incident = id, outcome = ?outcome);
    Ok(Json(outcome))
}

pub async fn assign_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Incident> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.assign_handler(
        actor,
        IncidentId(id),
        UserId(request.officer),
        now(),
    )?))
}

pub async fn list_responses_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<Vec<Response>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.responses(actor, IncidentId(id))?))
}

pub async fn add_response_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<ResponseRequest>,
) -> Created<Response> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.add_response(
        actor,
        IncidentId(id),
        request.comment,
        now(),
    )?))
}

// =============================================================================
// REGISTRATIONS
// =============================================================================

pub async fn create_birth_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewBirth>,
) -> Created<BirthRegistration> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.create_birth(actor, request, now())?))
}

pub async fn submit_birth_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<BirthRegistration> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.submit_birth(actor, RegistrationId(id), now())?))
}

pub async fn file_death_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewDeath>,
) -> Created<DeathRegistration> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.file_death(actor, request, now())?))
}

pub async fn file_marriage_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewMarriage>,
) -> Created<MarriageRegistration> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.file_marriage(actor, request, now())?))
}

pub async fn decide_registration_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((kind, id)): Path<(String, u64)>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<DecisionOutcome> {
    let registration = RegistrationRef::from_slug(&kind, RegistrationId(id))?;
    let decision = request.to_decision()?;
    let mut engine = state.engine.write().await;
    let outcome = engine.decide_registration(actor, registration, decision, now())?;
    tracing::info!(
        event = "registration_decided",
        entity = %outcome.entity,
        status = %outcome.status,
        "Registration decided"
    );
    Ok(Json(outcome))
}

/// Any registration by kind slug (`birth`, `death`, `marriage`, `national_id`).
pub async fn get_registration_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((kind, id)): Path<(String, u64)>,
) -> ApiResult<serde_json::Value> {
    let id = RegistrationId(id);
    let engine = state.engine.read().await;
    let value = match EntityKind::from_slug(&kind)? {
        EntityKind::BirthRegistration => to_json(&engine.registration::<BirthRegistration>(actor, id)?),
        EntityKind::DeathRegistration => to_json(&engine.registration::<DeathRegistration>(actor, id)?),
        EntityKind::MarriageRegistration => {
            to_json(&engine.registration::<MarriageRegistration>(actor, id)?)
        }
        EntityKind::NationalIdRequest => to_json(&engine.registration::<NationalIdRequest>(actor, id)?),
        EntityKind::Incident => Err(NgaoError::Validation(
            "incidents are served under /incidents".to_string(),
        )),
    }?;
    Ok(Json(value))
}

// =============================================================================
// NATIONAL ID
// =============================================================================

pub async fn initiate_national_id_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewNationalId>,
) -> Created<NationalIdRequest> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.initiate_national_id(actor, request, now())?))
}

pub async fn verify_national_id_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<NationalIdRequest> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.verify_national_id_parents(
        actor,
        RegistrationId(id),
        request.mother_verified,
        request.father_verified,
        now(),
    )?))
}

pub async fn submit_national_id_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<NationalIdRequest> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.submit_national_id_to_nrb(
        actor,
        RegistrationId(id),
        now(),
    )?))
}

pub async fn complete_national_id_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<NationalIdRequest> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.complete_national_id(
        actor,
        RegistrationId(id),
        request.id_number,
        now(),
    )?))
}

pub async fn reject_national_id_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<NationalIdRequest> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.reject_national_id(
        actor,
        RegistrationId(id),
        request.reason,
        now(),
    )?))
}

// =============================================================================
// MESSAGING
// =============================================================================

pub async fn send_message_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<MessageRequest>,
) -> Created<Communication> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.send_message(
        actor,
        request.recipient,
        request.body,
        now(),
    )?))
}

pub async fn announce_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<AnnouncementRequest>,
) -> Created<Communication> {
    let mut engine = state.engine.write().await;
    Ok(created(engine.announce(
        actor,
        request.unit,
        request.title,
        request.body,
        now(),
    )?))
}

pub async fn inbox_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Vec<Communication>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.inbox(actor)?))
}

pub async fn mark_read_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<u64>,
) -> ApiResult<Communication> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.mark_read(actor, CommunicationId(id))?))
}

// =============================================================================
// STATS & HISTORY
// =============================================================================

pub async fn stats_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Dashboard> {
    let engine = state.engine.read().await;
    Ok(Json(engine.dashboard(actor)?))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((kind, id)): Path<(String, u64)>,
) -> ApiResult<Vec<TransitionRecord>> {
    let entity = EntityRef::new(EntityKind::from_slug(&kind)?, id);
    let engine = state.engine.read().await;
    Ok(Json(engine.history(actor, entity)?))
}
