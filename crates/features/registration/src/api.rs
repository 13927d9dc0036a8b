use crate::Registrations;
use crate::error::RegistrationError;
use crate::model::{
    EventConfig, Registration, RegistrationPage, RegistrationRequest, SearchParams, SeatsInfo,
    SeatsRequest,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use evreg_domain::constants::REGISTRATION_TAG;
use evreg_derive::api_handler;
use evreg_kernel::server::{ApiError, ApiState, ErrorBody};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match &err {
            RegistrationError::ConfigNotFound { .. } => Self::not_found(err.code(), err.to_string()),
            e if e.is_client_error() => Self::bad_request(err.code(), err.to_string()),
            _ => Self::internal(&err),
        }
    }
}

fn rejected(message: String) -> ApiError {
    RegistrationError::validation(message).into()
}

pub(crate) fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(search_handler, register_handler))
        .routes(routes!(seats_handler, update_seats_handler))
}

#[api_handler(
    post,
    path = "/api/registrations",
    request_body = RegistrationRequest,
    responses(
        (status = CREATED, description = "Attendee registered", body = Registration),
        (status = BAD_REQUEST, description = "Invalid input, duplicate phone or no seats left", body = ErrorBody),
    ),
    tag = REGISTRATION_TAG,
)]
pub(crate) async fn register_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let Json(request) = payload.map_err(|e| rejected(e.body_text()))?;
    let registrations = state.try_get_slice::<Registrations>()?;

    let registration = registrations.service.register(request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

#[api_handler(
    get,
    path = "/api/registrations",
    params(SearchParams),
    responses(
        (status = OK, description = "One page of registrations", body = RegistrationPage),
        (status = BAD_REQUEST, description = "Invalid sort field or paging parameters", body = ErrorBody),
    ),
    tag = REGISTRATION_TAG,
)]
pub(crate) async fn search_handler(
    State(state): State<ApiState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<RegistrationPage>, ApiError> {
    let Query(params) = params.map_err(|e| rejected(e.body_text()))?;
    let registrations = state.try_get_slice::<Registrations>()?;

    Ok(Json(registrations.service.search(&params).await?))
}

#[api_handler(
    get,
    path = "/api/registrations/seats",
    responses(
        (status = OK, description = "Remaining and total seats", body = SeatsInfo),
        (status = NOT_FOUND, description = "No seat configuration yet", body = ErrorBody),
    ),
    tag = REGISTRATION_TAG,
)]
pub(crate) async fn seats_handler(
    State(state): State<ApiState>,
) -> Result<Json<SeatsInfo>, ApiError> {
    let registrations = state.try_get_slice::<Registrations>()?;
    Ok(Json(registrations.service.seats().await?))
}

#[api_handler(
    put,
    path = "/api/registrations/seats",
    request_body = SeatsRequest,
    responses(
        (status = OK, description = "Seat limit updated", body = EventConfig),
        (status = BAD_REQUEST, description = "Seat limit is not a positive integer", body = ErrorBody),
        (status = NOT_FOUND, description = "No seat configuration yet", body = ErrorBody),
    ),
    tag = REGISTRATION_TAG,
)]
pub(crate) async fn update_seats_handler(
    State(state): State<ApiState>,
    payload: Result<Json<SeatsRequest>, JsonRejection>,
) -> Result<Json<EventConfig>, ApiError> {
    let Json(request) = payload.map_err(|e| rejected(e.body_text()))?;
    let registrations = state.try_get_slice::<Registrations>()?;

    Ok(Json(registrations.service.set_seats(&request.total_seats).await?))
}
