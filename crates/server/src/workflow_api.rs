//! JSON API over the workflow service.
//!
//! - `POST /api/initiatives`                              — submit an initiative
//! - `GET  /api/initiatives`                              — list initiatives
//! - `GET  /api/initiatives/{id}`                         — fetch one
//! - `GET  /api/initiatives/{id}/workflow/pending`        — stage awaiting a decision
//! - `POST /api/initiatives/{id}/workflow/approve`        — approve the pending stage
//! - `POST /api/initiatives/{id}/workflow/reject`         — reject the pending stage
//! - `GET  /api/initiatives/{id}/workflow/transactions`   — decision history
//!
//! The acting user's role/site/identity comes from the authentication
//! collaborator and is carried in the request body of mutating calls.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use opexflow_core::domain::initiative::{
    BudgetType, DisciplineRef, Initiative, InitiativeDraft, InitiativeId, InitiativeStatus,
    Priority, SiteRef,
};
use opexflow_core::domain::transaction::{Decision, WorkflowTransaction};
use opexflow_core::domain::user::{Actor, RoleCode};
use opexflow_core::errors::WorkflowError;

use crate::service::{ApprovalFields, DecisionRecord, ServiceError, WorkflowService};

#[derive(Clone)]
pub struct AppState {
    service: Arc<WorkflowService>,
}

pub fn router(service: Arc<WorkflowService>) -> Router {
    Router::new()
        .route("/api/initiatives", post(create_initiative).get(list_initiatives))
        .route("/api/initiatives/{id}", get(get_initiative))
        .route("/api/initiatives/{id}/workflow/pending", get(pending_stage))
        .route("/api/initiatives/{id}/workflow/approve", post(approve))
        .route("/api/initiatives/{id}/workflow/reject", post(reject))
        .route("/api/initiatives/{id}/workflow/transactions", get(list_transactions))
        .with_state(AppState { service })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInitiativeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub site: SiteRef,
    pub discipline: DisciplineRef,
    pub proposer: String,
    pub priority: Priority,
    pub budget_type: BudgetType,
    pub estimated_savings: Decimal,
    pub proposal_date: NaiveDate,
    pub expected_closure_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUserRequest {
    pub role: RoleCode,
    #[serde(default)]
    pub site: Option<String>,
    pub identity: String,
}

impl ActingUserRequest {
    fn into_actor(self) -> Actor {
        Actor { identity: self.identity, role: self.role, site: self.site }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub acting_user: ActingUserRequest,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub initiative_lead: Option<String>,
    #[serde(default)]
    pub moc_required: Option<bool>,
    #[serde(default)]
    pub moc_number: Option<String>,
    #[serde(default)]
    pub capex_required: Option<bool>,
    #[serde(default)]
    pub capex_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub acting_user: ActingUserRequest,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeResponse {
    pub initiative_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub site: Option<SiteRef>,
    pub discipline: DisciplineRef,
    pub proposer: String,
    pub priority: Priority,
    pub budget_type: BudgetType,
    pub estimated_savings: Decimal,
    pub proposal_date: NaiveDate,
    pub expected_closure_date: NaiveDate,
    pub status: InitiativeStatus,
    pub current_stage: u8,
    pub initiative_lead: Option<String>,
    pub moc_required: Option<bool>,
    pub moc_number: Option<String>,
    pub capex_required: Option<bool>,
    pub capex_details: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Initiative> for InitiativeResponse {
    fn from(initiative: Initiative) -> Self {
        Self {
            initiative_id: initiative.id.0,
            title: initiative.title,
            description: initiative.description,
            category: initiative.category,
            site: initiative.site,
            discipline: initiative.discipline,
            proposer: initiative.proposer,
            priority: initiative.priority,
            budget_type: initiative.budget_type,
            estimated_savings: initiative.estimated_savings,
            proposal_date: initiative.proposal_date,
            expected_closure_date: initiative.expected_closure_date,
            status: initiative.status,
            current_stage: initiative.current_stage,
            initiative_lead: initiative.initiative_lead,
            moc_required: initiative.moc.as_ref().map(|moc| moc.required),
            moc_number: initiative.moc.and_then(|moc| moc.number),
            capex_required: initiative.capex.as_ref().map(|capex| capex.required),
            capex_details: initiative.capex.and_then(|capex| capex.details),
            version: initiative.version,
            created_at: initiative.created_at,
            updated_at: initiative.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub initiative_id: String,
    pub stage_number: u8,
    pub stage_name: String,
    pub decision: Decision,
    pub comment: String,
    pub action_by: String,
    pub action_at: DateTime<Utc>,
    pub pending_with: Option<String>,
    pub initiative_lead: Option<String>,
    pub moc_required: Option<bool>,
    pub moc_number: Option<String>,
    pub capex_required: Option<bool>,
    pub capex_details: Option<String>,
}

impl From<WorkflowTransaction> for TransactionResponse {
    fn from(transaction: WorkflowTransaction) -> Self {
        Self {
            initiative_id: transaction.initiative_id.0,
            stage_number: transaction.stage_number,
            stage_name: transaction.stage_name,
            decision: transaction.decision,
            comment: transaction.comment,
            action_by: transaction.action_by,
            action_at: transaction.action_at,
            pending_with: transaction.pending_with,
            initiative_lead: transaction.initiative_lead,
            moc_required: transaction.moc_required,
            moc_number: transaction.moc_number,
            capex_required: transaction.capex_required,
            capex_details: transaction.capex_details,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub transaction_id: i64,
    pub initiative: InitiativeResponse,
    pub transaction: TransactionResponse,
}

impl From<DecisionRecord> for DecisionResponse {
    fn from(record: DecisionRecord) -> Self {
        Self {
            transaction_id: record.transaction_id.0,
            initiative: record.initiative.into(),
            transaction: record.transaction.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStageResponse {
    pub step_number: u8,
    pub stage_name: &'static str,
    pub required_role: &'static str,
    pub pending_with: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_fields: Option<Vec<String>>,
    retryable: bool,
}

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, missing_fields) = match &self.0 {
            ServiceError::Workflow(WorkflowError::NotFound(_)) => (StatusCode::NOT_FOUND, None),
            ServiceError::Workflow(WorkflowError::Forbidden { .. }) => (StatusCode::FORBIDDEN, None),
            ServiceError::Workflow(WorkflowError::InvalidPayload { missing_fields }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some(missing_fields.clone()))
            }
            ServiceError::Workflow(WorkflowError::Conflict(_)) => (StatusCode::CONFLICT, None),
            ServiceError::Workflow(WorkflowError::InvalidStage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            ServiceError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
        };

        let retryable = matches!(
            &self.0,
            ServiceError::Workflow(WorkflowError::Conflict(_)) | ServiceError::Storage(_)
        );
        let body = ErrorBody { error: self.0.to_string(), missing_fields, retryable };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_initiative(
    State(state): State<AppState>,
    Json(request): Json<CreateInitiativeRequest>,
) -> Result<(StatusCode, Json<InitiativeResponse>), ApiError> {
    let draft = InitiativeDraft {
        title: request.title,
        description: request.description,
        category: request.category,
        site: request.site,
        discipline: request.discipline,
        proposer: request.proposer,
        priority: request.priority,
        budget_type: request.budget_type,
        estimated_savings: request.estimated_savings,
        proposal_date: request.proposal_date,
        expected_closure_date: request.expected_closure_date,
    };
    let initiative = state.service.submit(draft).await?;
    Ok((StatusCode::CREATED, Json(initiative.into())))
}

async fn list_initiatives(
    State(state): State<AppState>,
) -> Result<Json<Vec<InitiativeResponse>>, ApiError> {
    let initiatives = state.service.list().await?;
    Ok(Json(initiatives.into_iter().map(InitiativeResponse::from).collect()))
}

async fn get_initiative(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InitiativeResponse>, ApiError> {
    let initiative = state.service.get(&InitiativeId(id)).await?;
    Ok(Json(initiative.into()))
}

async fn pending_stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PendingStageResponse>, ApiError> {
    let pending = state.service.pending_stage(&InitiativeId(id)).await?;
    Ok(Json(PendingStageResponse {
        step_number: pending.step_number,
        stage_name: pending.stage_name,
        required_role: pending.required_role,
        pending_with: pending.pending_with,
    }))
}

async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let actor = request.acting_user.into_actor();
    let fields = ApprovalFields {
        comment: request.comment,
        initiative_lead: request.initiative_lead,
        moc_required: request.moc_required,
        moc_number: request.moc_number,
        capex_required: request.capex_required,
        capex_details: request.capex_details,
    };
    let record = state.service.approve(&InitiativeId(id), &actor, fields).await?;
    Ok(Json(record.into()))
}

async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let actor = request.acting_user.into_actor();
    let record = state.service.reject(&InitiativeId(id), &actor, &request.comment).await?;
    Ok(Json(record.into()))
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let transactions = state.service.transactions(&InitiativeId(id)).await?;
    Ok(Json(transactions.into_iter().map(TransactionResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use opexflow_db::InMemoryWorkflowStore;

    use crate::service::WorkflowService;

    fn app() -> Router {
        let store = InMemoryWorkflowStore::new();
        let service = WorkflowService::new(Arc::new(store.clone()), Arc::new(store));
        super::router(Arc::new(service))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body collects");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn create_body() -> Value {
        json!({
            "title": "Cooling tower fan upgrade",
            "description": "Replace fixed-pitch fans with VFD drives",
            "category": "COST_REDUCTION",
            "site": {"code": "NDS", "name": "NDS Plant"},
            "discipline": {"code": "EN", "name": "Energy"},
            "proposer": "nds_stld@example.com",
            "priority": "MEDIUM",
            "budgetType": "BUDGETED",
            "estimatedSavings": "150000.00",
            "proposalDate": "2025-03-01",
            "expectedClosureDate": "2025-12-01"
        })
    }

    fn acting_user(role: &str, site: &str) -> Value {
        json!({
            "role": role,
            "site": site,
            "identity": format!("{}_{}@example.com", site.to_ascii_lowercase(), role.to_ascii_lowercase()),
        })
    }

    async fn create_initiative(app: &Router) -> String {
        let (status, body) =
            send(app, Method::POST, "/api/initiatives", Some(create_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        body["initiativeId"].as_str().expect("initiative id").to_string()
    }

    async fn approve(app: &Router, id: &str, role: &str, site: &str, extra: Value) -> (StatusCode, Value) {
        let mut body = json!({"actingUser": acting_user(role, site), "comment": "ok"});
        if let (Some(target), Some(source)) = (body.as_object_mut(), extra.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        send(app, Method::POST, &format!("/api/initiatives/{id}/workflow/approve"), Some(body))
            .await
    }

    #[tokio::test]
    async fn create_returns_the_generated_business_id() {
        let app = app();
        let (status, body) =
            send(&app, Method::POST, "/api/initiatives", Some(create_body())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["initiativeId"], "NDS-25-EN-01-001");
        assert_eq!(body["status"], "PROPOSED");
        assert_eq!(body["currentStage"], 1);
        assert_eq!(body["estimatedSavings"], "150000.00");
    }

    #[tokio::test]
    async fn full_chain_completes_with_five_logged_transactions() {
        let app = app();
        let id = create_initiative(&app).await;

        let (status, _) = approve(&app, &id, "STLD", "NDS", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = approve(&app, &id, "SH", "NDS", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            approve(&app, &id, "EH", "NDS", json!({"initiativeLead": "nds_il@example.com"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["initiative"]["initiativeLead"], "nds_il@example.com");
        let (status, _) = approve(
            &app,
            &id,
            "IL",
            "NDS",
            json!({"mocRequired": true, "mocNumber": "MOC-NDS-2025-001"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            approve(&app, &id, "IL", "NDS", json!({"capexRequired": false})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["initiative"]["status"], "COMPLETED");
        assert_eq!(body["initiative"]["currentStage"], 5);
        assert!(body["transaction"]["pendingWith"].is_null());

        let (status, pending) = send(
            &app,
            Method::GET,
            &format!("/api/initiatives/{id}/workflow/pending"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(pending["pendingWith"].is_null());

        let (status, history) = send(
            &app,
            Method::GET,
            &format!("/api/initiatives/{id}/workflow/transactions"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().expect("history array");
        assert_eq!(history.len(), 5);
        assert_eq!(history[0]["stageNumber"], 1);
        assert_eq!(history[4]["stageNumber"], 5);
        assert_eq!(history[3]["mocNumber"], "MOC-NDS-2025-001");
    }

    #[tokio::test]
    async fn pending_endpoint_reports_the_next_responsible_role() {
        let app = app();
        let id = create_initiative(&app).await;
        approve(&app, &id, "STLD", "NDS", json!({})).await;

        let (status, pending) = send(
            &app,
            Method::GET,
            &format!("/api/initiatives/{id}/workflow/pending"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["stepNumber"], 2);
        assert_eq!(pending["stageName"], "Approval");
        assert_eq!(pending["requiredRole"], "SH");
        assert_eq!(pending["pendingWith"], "SH");
    }

    #[tokio::test]
    async fn foreign_site_approver_gets_403() {
        let app = app();
        let id = create_initiative(&app).await;

        let (status, body) = approve(&app, &id, "STLD", "HSD3", json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn missing_moc_number_gets_422_listing_the_field() {
        let app = app();
        let id = create_initiative(&app).await;
        approve(&app, &id, "STLD", "NDS", json!({})).await;
        approve(&app, &id, "SH", "NDS", json!({})).await;
        approve(&app, &id, "EH", "NDS", json!({"initiativeLead": "nds_il@example.com"})).await;

        let (status, body) = approve(&app, &id, "IL", "NDS", json!({"mocRequired": true})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["missingFields"], json!(["mocNumber"]));

        let (_, history) = send(
            &app,
            Method::GET,
            &format!("/api/initiatives/{id}/workflow/transactions"),
            None,
        )
        .await;
        assert_eq!(history.as_array().expect("history array").len(), 3, "refused call logs nothing");
    }

    #[tokio::test]
    async fn rejected_initiative_returns_404_for_further_decisions() {
        let app = app();
        let id = create_initiative(&app).await;
        approve(&app, &id, "STLD", "NDS", json!({})).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/initiatives/{id}/workflow/reject"),
            Some(json!({"actingUser": acting_user("SH", "NDS"), "comment": "insufficient data"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["initiative"]["status"], "REJECTED");
        assert_eq!(body["initiative"]["currentStage"], 2);

        let (status, _) = approve(&app, &id, "SH", "NDS", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_comment_is_rejected_with_422() {
        let app = app();
        let id = create_initiative(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/initiatives/{id}/workflow/approve"),
            Some(json!({"actingUser": acting_user("STLD", "NDS"), "comment": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["missingFields"], json!(["comment"]));
    }

    #[tokio::test]
    async fn unknown_initiative_returns_404() {
        let app = app();
        let (status, _) =
            send(&app, Method::GET, "/api/initiatives/NDS-25-EN-09-999/workflow/pending", None)
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_created_initiatives() {
        let app = app();
        create_initiative(&app).await;
        create_initiative(&app).await;

        let (status, body) = send(&app, Method::GET, "/api/initiatives", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("list array").len(), 2);
    }
}
