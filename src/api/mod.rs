pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Settings,
    service::ServiceContext,
    storage::MAX_FILE_SIZE,
};
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "ScholarMart API", description = "Academic project marketplace"),
    paths(
        handlers::payments::initialize,
        handlers::payments::verify,
        handlers::payments::methods,
        handlers::currency::rate,
    ),
    components(schemas(
        crate::domain::InitializePaymentRequest,
        crate::domain::PaymentInitialization,
        crate::domain::VerifyPaymentRequest,
        crate::domain::PaymentVerification,
        crate::domain::Order,
        crate::domain::OrderStatus,
        crate::domain::PaymentMethod,
        crate::domain::OrderMetadata,
        crate::domain::CurrencyConversion,
        crate::domain::Project,
        crate::domain::Purchase,
        crate::domain::CreatorEarnings,
        crate::domain::CreatorBalance,
        crate::domain::Withdrawal,
        crate::domain::WithdrawalStatus,
        crate::domain::Notification,
        crate::currency::RateQuote,
        crate::currency::RateSource,
    )),
    tags(
        (name = "payments", description = "Checkout and settlement"),
        (name = "currency", description = "Exchange rates"),
    )
)]
pub struct ApiDoc;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))

        // API routes
        .nest("/api", api_routes(app_state.clone()))

        // OpenAPI document and Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/projects", project_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/currency", currency_routes())
        .nest("/admin", admin_routes(state.clone()))
        .merge(account_routes(state))
}

fn project_routes(state: AppState) -> Router<AppState> {
    // Browsing the catalog needs no identity
    let public = Router::new()
        .route("/", get(handlers::projects::list))
        .route("/:id", get(handlers::projects::get));

    let protected = Router::new()
        .route("/", post(handlers::projects::create))
        .route("/mine", get(handlers::projects::mine))
        .route(
            "/:id/file",
            post(handlers::projects::upload_file)
                .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024)),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::identity::require_user,
        ));

    public.merge(protected)
}

fn payment_routes(state: AppState) -> Router<AppState> {
    // Webhooks authenticate by signature, not by user
    let public = Router::new()
        .route("/methods", get(handlers::payments::methods))
        .route("/webhook/paystack", post(handlers::webhooks::paystack))
        .route("/webhook/flutterwave", post(handlers::webhooks::flutterwave))
        .route("/webhook/stripe", post(handlers::webhooks::stripe));

    let protected = Router::new()
        .route("/initialize", post(handlers::payments::initialize))
        .route("/verify", post(handlers::payments::verify))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::identity::require_user,
        ));

    public.merge(protected)
}

fn currency_routes() -> Router<AppState> {
    Router::new()
        .route("/rate", get(handlers::currency::rate))
        .route("/convert", get(handlers::currency::convert))
}

fn account_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(handlers::orders::list))
        .route("/orders/:id", get(handlers::orders::get))
        .route("/purchases", get(handlers::orders::purchases))
        .route("/download/:project_id", get(handlers::projects::download))
        .route("/earnings", get(handlers::earnings::list))
        .route("/earnings/balance", get(handlers::earnings::balance))
        .route(
            "/bank-details",
            get(handlers::earnings::list_bank_details).post(handlers::earnings::add_bank_details),
        )
        .route(
            "/withdrawals",
            get(handlers::earnings::list_withdrawals).post(handlers::earnings::request_withdrawal),
        )
        .route("/notifications", get(handlers::notifications::list))
        .route("/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/notifications/:id/read", post(handlers::notifications::mark_read))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::identity::require_user,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bank-details/:id/verify", post(handlers::earnings::verify_bank_details))
        .route("/bank-details/:id/account-number", get(handlers::earnings::reveal_account_number))
        .route("/withdrawals/:id/status", post(handlers::earnings::update_withdrawal_status))
        .route("/currency/clear-cache", post(handlers::currency::clear_cache))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::identity::require_admin,
        ))
}
