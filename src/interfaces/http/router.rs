//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, patch, post, put, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{ReservationService, UserService};
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::middleware::{auth_middleware, require_roles, AllowedRoles, AuthState};
use crate::interfaces::http::modules::{
    auth, health, metrics, request_id::request_id_middleware, reservations, users,
};

/// Shared state for every route. Handlers extract their own slice via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub user_service: Arc<UserService>,
    pub reservation_service: Arc<ReservationService>,
    pub jwt_config: JwtConfig,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        jwt_config: JwtConfig,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            user_service: Arc::new(UserService::new(
                repos.clone(),
                jwt_config.clone(),
                password_hash_cost,
            )),
            reservation_service: Arc::new(ReservationService::new(repos.clone())),
            repos,
            jwt_config,
            started_at: Arc::new(Instant::now()),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        AuthState {
            jwt_config: s.jwt_config.clone(),
        }
    }
}

impl FromRef<AppState> for auth::AuthHandlerState {
    fn from_ref(s: &AppState) -> Self {
        auth::AuthHandlerState {
            user_service: Arc::clone(&s.user_service),
        }
    }
}

impl FromRef<AppState> for users::UserHandlerState {
    fn from_ref(s: &AppState) -> Self {
        users::UserHandlerState {
            user_service: Arc::clone(&s.user_service),
        }
    }
}

impl FromRef<AppState> for reservations::ReservationHandlerState {
    fn from_ref(s: &AppState) -> Self {
        reservations::ReservationHandlerState {
            reservation_service: Arc::clone(&s.reservation_service),
        }
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        health::HealthState {
            repos: Arc::clone(&s.repos),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::signup,
        auth::login,
        // Users
        users::get_me,
        users::update_me,
        users::change_my_password,
        users::create_user,
        users::get_user,
        users::get_user_by_email,
        users::update_user,
        users::delete_user,
        // Reservations
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::list_reservations,
        reservations::list_user_reservations,
        reservations::list_bike_reservations,
        reservations::update_reservation,
        reservations::delete_reservation,
        reservations::present_rents,
        reservations::rent_bike,
        reservations::return_bike,
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::SignupRequest,
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            users::UpdateProfileRequest,
            users::ChangePasswordRequest,
            reservations::ReservationDto,
            reservations::CreateReservationRequest,
            reservations::UpdateReservationRequest,
            reservations::CreatedReservation,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check"),
        (name = "Authentication", description = "Signup and login (JWT)"),
        (name = "Users", description = "Own profile and admin user management"),
        (name = "Reservations", description = "Bike reservations and the rent / return lifecycle"),
    ),
    info(
        title = "Bike Rental API",
        version = "1.0.0",
        description = "REST API for bike reservations and rentals"
    )
)]
pub struct ApiDoc;

/// Attach a role allow-list to one method route.
fn guarded<S>(roles: AllowedRoles, route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(roles, require_roles))
}

/// Create the API router with all routes
pub fn create_api_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    use AllowedRoles as Roles;

    let auth_state = AuthState::from_ref(&state);

    // Public routes
    let public_routes = Router::<AppState>::new()
        .route("/health", get(health::health_check))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login));

    // Reservation routes
    let reservation_routes = Router::<AppState>::new()
        .route(
            "/reservations",
            guarded(Roles::USER, post(reservations::create_reservation))
                .merge(guarded(Roles::ADMIN, get(reservations::list_reservations))),
        )
        .route(
            "/reservations/{id}",
            guarded(Roles::ADMIN, get(reservations::get_reservation))
                .merge(guarded(
                    Roles::USER,
                    patch(reservations::update_reservation)
                        .delete(reservations::delete_reservation),
                )),
        )
        .route(
            "/reservations/users/{id}",
            guarded(Roles::ANY, get(reservations::list_user_reservations)),
        )
        .route(
            "/reservations/bikes/{id}",
            guarded(Roles::ADMIN, get(reservations::list_bike_reservations)),
        )
        .route(
            "/reservations/rents/present",
            guarded(Roles::ADMIN, get(reservations::present_rents)),
        )
        .route(
            "/reservations/rent/{id}",
            guarded(Roles::ADMIN, put(reservations::rent_bike)),
        )
        .route(
            "/reservations/return/{id}",
            guarded(Roles::ADMIN, put(reservations::return_bike)),
        );

    // User routes
    let user_routes = Router::<AppState>::new()
        .route(
            "/users/me",
            guarded(Roles::ANY, get(users::get_me).patch(users::update_me)),
        )
        .route(
            "/users/me/password",
            guarded(Roles::ANY, put(users::change_my_password)),
        )
        .route("/users", guarded(Roles::ADMIN, post(users::create_user)))
        .route(
            "/users/by-email/{email}",
            guarded(Roles::ADMIN, get(users::get_user_by_email)),
        )
        .route(
            "/users/{id}",
            guarded(
                Roles::ADMIN,
                get(users::get_user)
                    .patch(users::update_user)
                    .delete(users::delete_user),
            ),
        );

    // Bearer auth wraps every protected route, outside the role guards
    let protected_routes = reservation_routes
        .merge(user_routes)
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(api_routes)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics::MetricsState {
                handle: prometheus_handle,
            }),
        )
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
