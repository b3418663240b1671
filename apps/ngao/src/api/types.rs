//! # API Request/Response Types
//!
//! JSON bodies for the HTTP API and the mapping from engine errors to
//! HTTP status codes. Records are returned as the engine's own types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ngao_core::{
    Decision, IncidentFilter, IncidentStatus, IncidentType, NgaoError, UnitId, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// ERRORS
// =============================================================================

/// An engine error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub NgaoError);

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<NgaoError> for ApiError {
    fn from(e: NgaoError) -> Self {
        Self(e)
    }
}

/// HTTP status and stable error code for an engine error.
#[must_use]
pub fn status_for(error: &NgaoError) -> (StatusCode, &'static str) {
    match error {
        NgaoError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        NgaoError::UnknownOfficer(_) => (StatusCode::UNAUTHORIZED, "UNKNOWN_OFFICER"),
        NgaoError::InactiveOfficer(_) => (StatusCode::FORBIDDEN, "INACTIVE_OFFICER"),
        NgaoError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        NgaoError::OutOfScope { .. } => (StatusCode::FORBIDDEN, "OUT_OF_SCOPE"),
        NgaoError::HierarchyViolation(_) => (StatusCode::FORBIDDEN, "HIERARCHY_VIOLATION"),
        NgaoError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        NgaoError::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE"),
        NgaoError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        NgaoError::InvalidPermission(_) => (StatusCode::BAD_REQUEST, "INVALID_PERMISSION"),
        NgaoError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        NgaoError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, code, "Request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub persistent: bool,
}

// =============================================================================
// INCIDENTS
// =============================================================================

/// Query string for `GET /incidents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentQuery {
    pub status: Option<String>,
    pub incident_type: Option<String>,
    pub within: Option<u64>,
}

impl IncidentQuery {
    pub fn to_filter(&self) -> Result<IncidentFilter, NgaoError> {
        Ok(IncidentFilter {
            status: self
                .status
                .as_deref()
                .map(str::parse::<IncidentStatus>)
                .transpose()?,
            incident_type: self
                .incident_type
                .as_deref()
                .map(str::parse::<IncidentType>)
                .transpose()?,
            within: self.within.map(UnitId),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub officer: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRequest {
    pub comment: String,
}

// =============================================================================
// REGISTRATIONS
// =============================================================================

/// Body of `POST /registrations/{kind}/{id}/decision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// `approve` or `reject`.
    pub decision: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DecisionRequest {
    pub fn to_decision(&self) -> Result<Decision, NgaoError> {
        match (self.decision.as_str(), &self.reason) {
            ("approve", _) => Ok(Decision::Approve),
            ("reject", Some(reason)) => Ok(Decision::Reject {
                reason: reason.clone(),
            }),
            ("reject", None) => Err(NgaoError::Validation(
                "a rejection needs a reason".to_string(),
            )),
            (other, _) => Err(NgaoError::Validation(format!(
                "decision must be 'approve' or 'reject', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub mother_verified: bool,
    #[serde(default)]
    pub father_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub id_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

// =============================================================================
// MESSAGING
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub recipient: UserId,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRequest {
    pub unit: UnitId,
    pub title: String,
    pub body: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ngao_core::EntityKind;

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (NgaoError::not_found("incident", 1), StatusCode::NOT_FOUND),
            (NgaoError::UnknownOfficer(UserId(9)), StatusCode::UNAUTHORIZED),
            (
                NgaoError::OutOfScope {
                    officer: UserId(1),
                    unit: UnitId(2),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                NgaoError::InvalidTransition {
                    kind: EntityKind::Incident,
                    from: "closed".to_string(),
                    to: "reported".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (NgaoError::Validation("x".to_string()), StatusCode::BAD_REQUEST),
            (
                NgaoError::Storage("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).into_response().status(), status);
        }
    }

    #[test]
    fn decision_request_parsing() {
        let approve = DecisionRequest {
            decision: "approve".to_string(),
            reason: None,
        };
        assert_eq!(approve.to_decision(), Ok(Decision::Approve));

        let reject = DecisionRequest {
            decision: "reject".to_string(),
            reason: None,
        };
        assert!(reject.to_decision().is_err());

        let bogus = DecisionRequest {
            decision: "maybe".to_string(),
            reason: None,
        };
        assert!(bogus.to_decision().is_err());
    }

    #[test]
    fn incident_query_parses_filters() {
        let query = IncidentQuery {
            status: Some("on_scene".to_string()),
            incident_type: None,
            within: Some(4),
        };
        let filter = query.to_filter().expect("filter");
        assert_eq!(filter.status, Some(IncidentStatus::OnScene));
        assert_eq!(filter.within, Some(UnitId(4)));

        let bad = IncidentQuery {
            status: Some("burning".to_string()),
            ..IncidentQuery::default()
        };
        assert!(bad.to_filter().is_err());
    }
}
