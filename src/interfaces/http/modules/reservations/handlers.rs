//! Reservation API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    to_dtos, CreateReservationRequest, CreatedReservation, ReservationDto, UpdateReservationRequest,
};
use crate::application::ReservationService;
use crate::interfaces::http::common::{ok, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Message returned when a rent / return / lookup targets an unknown id
pub const RESERVATION_NOT_FOUND: &str = "Reservation with given id does not exist";

#[derive(Clone)]
pub struct ReservationHandlerState {
    pub reservation_service: Arc<ReservationService>,
}

#[utoipa::path(
    post,
    path = "/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ApiResponse<CreatedReservation>),
        (status = 400, description = "Window ends before it starts"),
        (status = 403, description = "Role not allowed"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedReservation>>), ApiError> {
    let id = state
        .reservation_service
        .create(request.into(), &caller.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedReservation { id })),
    ))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservation_service
        .get_reservation(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(RESERVATION_NOT_FOUND))?;
    ok(reservation.into())
}

#[utoipa::path(
    get,
    path = "/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All reservations", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationHandlerState>,
) -> ApiResult<Vec<ReservationDto>> {
    ok(to_dtos(state.reservation_service.get_all_reservations().await?))
}

/// A plain user always gets their own list; an admin gets the list of the
/// user named in the path.
#[utoipa::path(
    get,
    path = "/reservations/users/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID (ignored for non-admin callers)")),
    responses(
        (status = 200, description = "Reservations of the user", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn list_user_reservations(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ReservationDto>> {
    let user_id = if caller.is_admin() { id } else { caller.user_id };
    ok(to_dtos(
        state
            .reservation_service
            .get_reservations_by_user_id(&user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/reservations/bikes/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Reservations of the bike", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn list_bike_reservations(
    State(state): State<ReservationHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ReservationDto>> {
    ok(to_dtos(
        state
            .reservation_service
            .get_reservations_by_bike_id(&id)
            .await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Reservation updated"),
        (status = 400, description = "Window ends before it starts"),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateReservationRequest>,
) -> ApiResult<()> {
    state
        .reservation_service
        .update_reservation(&id, request.into(), &caller.user_id)
        .await?;
    ok(())
}

#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation deleted"),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state
        .reservation_service
        .delete_reservation(&id, &caller.user_id)
        .await?;
    ok(())
}

#[utoipa::path(
    get,
    path = "/reservations/rents/present",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservations whose bike is out", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn present_rents(
    State(state): State<ReservationHandlerState>,
) -> ApiResult<Vec<ReservationDto>> {
    ok(to_dtos(state.reservation_service.get_present_rents().await?))
}

#[utoipa::path(
    put,
    path = "/reservations/rent/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Bike handed out", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation with given id does not exist")
    )
)]
pub async fn rent_bike(
    State(state): State<ReservationHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservation_service
        .rent_bike(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(RESERVATION_NOT_FOUND))?;
    ok(reservation.into())
}

#[utoipa::path(
    put,
    path = "/reservations/return/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Bike brought back", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation with given id does not exist")
    )
)]
pub async fn return_bike(
    State(state): State<ReservationHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservation_service
        .return_bike(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(RESERVATION_NOT_FOUND))?;
    ok(reservation.into())
}
