use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    BusinessTripId, ExpenseApplicationId, ExpenseItemDraft, RegulationDraft, RegulationId,
    TripDraft, UserId, UserProfile,
};
use super::error::{ReimbursementError, TransitionError};
use super::lifecycle::Transition;
use super::service::{ApplicationRef, ApprovalQueue, ReimbursementService};
use super::store::{IdentityProvider, ReimbursementStore, StoreError};

/// Header carrying the authenticated caller's user id.
pub const USER_HEADER: &str = "x-user-id";

/// Shared state for the reimbursement endpoints.
pub struct ReimbursementState<S, P> {
    pub service: Arc<ReimbursementService<S>>,
    pub identity: Arc<P>,
}

impl<S, P> Clone for ReimbursementState<S, P> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Router exposing estimate, application, approval, statistics, and
/// regulation endpoints.
pub fn reimbursement_router<S, P>(
    service: Arc<ReimbursementService<S>>,
    identity: Arc<P>,
) -> Router
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/allowance", get(allowance_handler::<S, P>))
        .route(
            "/api/v1/allowance/estimate",
            post(estimate_handler::<S, P>),
        )
        .route(
            "/api/v1/business-trips",
            post(create_trip_handler::<S, P>).get(list_trips_handler::<S, P>),
        )
        .route(
            "/api/v1/business-trips/:trip_id",
            put(update_trip_handler::<S, P>),
        )
        .route(
            "/api/v1/business-trips/:trip_id/transitions/:transition",
            post(trip_transition_handler::<S, P>),
        )
        .route(
            "/api/v1/expenses",
            post(create_expense_handler::<S, P>).get(list_expenses_handler::<S, P>),
        )
        .route(
            "/api/v1/expenses/incomplete",
            get(incomplete_expenses_handler::<S, P>),
        )
        .route(
            "/api/v1/expenses/:expense_id/items",
            get(expense_items_handler::<S, P>),
        )
        .route(
            "/api/v1/expenses/:expense_id/transitions/:transition",
            post(expense_transition_handler::<S, P>),
        )
        .route(
            "/api/v1/approvals/pending",
            get(pending_handler::<S, P>),
        )
        .route(
            "/api/v1/statistics/monthly",
            get(monthly_handler::<S, P>),
        )
        .route(
            "/api/v1/regulations",
            post(create_regulation_handler::<S, P>).get(list_regulations_handler::<S, P>),
        )
        .route(
            "/api/v1/regulations/:regulation_id/activate",
            post(activate_regulation_handler::<S, P>),
        )
        .with_state(ReimbursementState {
            service,
            identity,
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct EstimateRequest {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DecisionBody {
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpenseSubmission {
    title: String,
    items: Vec<ExpenseItemDraft>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MonthQuery {
    year: i32,
    month: u32,
}

pub(crate) async fn allowance_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state.service.allowance_for(&caller).await {
        Ok(allowance) => (StatusCode::OK, axum::Json(allowance)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn estimate_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    axum::Json(query): axum::Json<EstimateRequest>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .preview_estimate(&caller, query.start_date, query.end_date)
        .await
    {
        Ok(estimate) => {
            (StatusCode::OK, axum::Json(json!({ "estimate": estimate }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_trip_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<TripDraft>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state.service.create_business_trip(&caller, draft).await {
        Ok(trip) => (StatusCode::CREATED, axum::Json(trip)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_trip_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Path(trip_id): Path<BusinessTripId>,
    axum::Json(draft): axum::Json<TripDraft>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .update_business_trip(&caller, &trip_id, draft)
        .await
    {
        Ok(trip) => (StatusCode::OK, axum::Json(trip)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_trips_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state.service.business_trips(&caller.id).await {
        Ok(trips) => (StatusCode::OK, axum::Json(trips)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn trip_transition_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Path((trip_id, transition)): Path<(BusinessTripId, Transition)>,
    body: Option<axum::Json<DecisionBody>>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let application = ApplicationRef::BusinessTrip(trip_id);
    transition_response(&state, &headers, application, transition, body).await
}

pub(crate) async fn create_expense_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ExpenseSubmission>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .create_expense_application(&caller, &submission.title, submission.items)
        .await
    {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_expenses_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state.service.expense_applications(&caller.id).await {
        Ok(expenses) => (StatusCode::OK, axum::Json(expenses)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn incomplete_expenses_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .incomplete_expense_applications(&caller.id)
        .await
    {
        Ok(expenses) => (StatusCode::OK, axum::Json(expenses)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expense_items_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Path(expense_id): Path<ExpenseApplicationId>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let application = match state.service.expense_application(&expense_id).await {
        Ok(application) => application,
        Err(error) => return error_response(error),
    };
    if application.user_id != caller.id {
        let visible = caller.role.can_decide()
            && match shares_company(&state, &caller, &application.user_id).await {
                Ok(shared) => shared,
                Err(error) => return error_response(error),
            };
        if !visible {
            return error_response(StoreError::NotFound.into());
        }
    }
    match state.service.expense_items(&expense_id).await {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expense_transition_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Path((expense_id, transition)): Path<(ExpenseApplicationId, Transition)>,
    body: Option<axum::Json<DecisionBody>>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let application = ApplicationRef::Expense(expense_id);
    transition_response(&state, &headers, application, transition, body).await
}

pub(crate) async fn pending_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let queue = match state.service.pending_approvals(&caller).await {
        Ok(queue) => queue,
        Err(error) => return error_response(error),
    };
    match same_company_queue(&state, &caller, queue).await {
        Ok(queue) => (StatusCode::OK, axum::Json(queue)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn monthly_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Query(query): Query<MonthQuery>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .monthly_totals(&caller.id, query.year, query.month)
        .await
    {
        Ok(totals) => (StatusCode::OK, axum::Json(totals)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_regulation_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<RegulationDraft>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state.service.create_regulation(&caller, draft).await {
        Ok(regulation) => (StatusCode::CREATED, axum::Json(regulation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_regulations_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Some(company_name) = caller.company_name.as_deref() else {
        return (StatusCode::OK, axum::Json(json!([]))).into_response();
    };
    match state.service.regulations(company_name).await {
        Ok(regulations) => (StatusCode::OK, axum::Json(regulations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activate_regulation_handler<S, P>(
    State(state): State<ReimbursementState<S, P>>,
    headers: HeaderMap,
    Path(regulation_id): Path<RegulationId>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(&state, &headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match state
        .service
        .activate_regulation(&caller, &regulation_id)
        .await
    {
        Ok(regulation) => (StatusCode::OK, axum::Json(regulation)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn transition_response<S, P>(
    state: &ReimbursementState<S, P>,
    headers: &HeaderMap,
    application: ApplicationRef,
    transition: Transition,
    body: Option<axum::Json<DecisionBody>>,
) -> Response
where
    S: ReimbursementStore,
    P: IdentityProvider + 'static,
{
    let caller = match authenticate(state, headers).await {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if transition != Transition::Submit {
        let owner = match application {
            ApplicationRef::BusinessTrip(id) => {
                state.service.business_trip(&id).await.map(|trip| trip.user_id)
            }
            ApplicationRef::Expense(id) => state
                .service
                .expense_application(&id)
                .await
                .map(|expense| expense.user_id),
        };
        let shared = match owner {
            Ok(owner) => shares_company(state, &caller, &owner).await,
            Err(error) => Err(error),
        };
        match shared {
            Ok(true) => {}
            Ok(false) => return error_response(StoreError::NotFound.into()),
            Err(error) => return error_response(error),
        }
    }
    let comment = body.and_then(|axum::Json(body)| body.comment);
    match state
        .service
        .transition(&caller, application, transition, comment)
        .await
    {
        Ok(trail) => (StatusCode::OK, axum::Json(trail)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Whether `owner` belongs to the caller's company. Applicants without a
/// resolvable profile are treated as foreign.
async fn shares_company<S, P>(
    state: &ReimbursementState<S, P>,
    caller: &UserProfile,
    owner: &UserId,
) -> Result<bool, ReimbursementError>
where
    P: IdentityProvider,
{
    if &caller.id == owner {
        return Ok(true);
    }
    let Some(company) = caller.company_name.as_deref() else {
        return Ok(false);
    };
    let applicant = state.identity.profile(owner).await?;
    Ok(applicant.and_then(|profile| profile.company_name).as_deref() == Some(company))
}

/// Drop queue entries filed by users of other companies.
async fn same_company_queue<S, P>(
    state: &ReimbursementState<S, P>,
    caller: &UserProfile,
    queue: ApprovalQueue,
) -> Result<ApprovalQueue, ReimbursementError>
where
    P: IdentityProvider,
{
    let mut verdicts: HashMap<UserId, bool> = HashMap::new();
    let applicants = queue
        .business_trips
        .iter()
        .map(|trip| &trip.user_id)
        .chain(queue.expenses.iter().map(|expense| &expense.user_id));
    for user_id in applicants {
        if !verdicts.contains_key(user_id) {
            let shared = shares_company(state, caller, user_id).await?;
            verdicts.insert(user_id.clone(), shared);
        }
    }

    let visible = |user_id: &UserId| verdicts.get(user_id).copied().unwrap_or(false);
    Ok(ApprovalQueue {
        business_trips: queue
            .business_trips
            .into_iter()
            .filter(|trip| visible(&trip.user_id))
            .collect(),
        expenses: queue
            .expenses
            .into_iter()
            .filter(|expense| visible(&expense.user_id))
            .collect(),
    })
}

/// Resolve the caller's profile from the user header.
async fn authenticate<S, P>(
    state: &ReimbursementState<S, P>,
    headers: &HeaderMap,
) -> Result<UserProfile, Response>
where
    P: IdentityProvider,
{
    let Some(user_id) = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        let payload = json!({
            "error": format!("missing {USER_HEADER} header"),
        });
        return Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response());
    };

    let user_id = UserId(user_id.to_string());
    match state.identity.profile(&user_id).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => {
            let payload = json!({
                "error": "unknown user",
                "user_id": user_id,
            });
            Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
        }
        Err(error) => Err(error_response(error.into())),
    }
}

/// HTTP status for a service error.
pub fn status_for(error: &ReimbursementError) -> StatusCode {
    match error {
        ReimbursementError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReimbursementError::Transition(
            TransitionError::InvalidState { .. } | TransitionError::NotEditable { .. },
        ) => StatusCode::CONFLICT,
        ReimbursementError::Transition(_) => StatusCode::FORBIDDEN,
        ReimbursementError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ReimbursementError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        ReimbursementError::Store(StoreError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        ReimbursementError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ReimbursementError::PartialCreation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ReimbursementError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        ReimbursementError::PartialCreation { application_id, .. } => json!({
            "error": error.to_string(),
            "application_id": application_id,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
