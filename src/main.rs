pub mod admin;
pub mod cart;
pub mod certificates;
pub mod clients;
pub mod db;
pub mod error;
pub mod orders;
pub mod queue;
pub mod scheduler;
pub mod validation;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use tokio::sync::watch;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use admin::{GrowthRates, MonthTotals, MonthlyReport, StatisticsResponse};
use cart::{AddToCartRequest, CartLine, CartRepository, UpdateCartItemRequest};
use certificates::{
    Certificate, CertificateRepository, CertificateStatus, CertificateWorker,
};
use clients::UserDirectory;
use orders::{CheckoutRequest, OrderRepository, OrderResponse, OrderService, OrderStatus};
use queue::{RedisQueue, CERTIFICATE_QUEUE};
use scheduler::Scheduler;

/// Simulated document rendering time in the certificate worker
const RENDER_DELAY: Duration = Duration::from_secs(2);

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        cart::handlers::add_to_cart_handler,
        cart::handlers::get_cart_handler,
        cart::handlers::update_cart_item_handler,
        cart::handlers::remove_from_cart_handler,
        cart::handlers::clear_cart_handler,
        orders::handlers::checkout_handler,
        orders::handlers::get_order_handler,
        orders::handlers::order_history_handler,
        orders::handlers::user_certificates_handler,
        admin::handlers::monthly_report_handler,
        admin::handlers::date_range_handler,
        admin::handlers::statistics_handler,
    ),
    components(
        schemas(
            CartLine,
            AddToCartRequest,
            UpdateCartItemRequest,
            CheckoutRequest,
            OrderResponse,
            OrderStatus,
            Certificate,
            CertificateStatus,
            MonthlyReport,
            MonthTotals,
            GrowthRates,
            StatisticsResponse,
        )
    ),
    tags(
        (name = "cart", description = "Shopping cart management endpoints"),
        (name = "orders", description = "Checkout and order history endpoints"),
        (name = "admin", description = "Reporting and statistics endpoints")
    ),
    info(
        title = "Carbon Offset API",
        version = "1.0.0",
        description = "RESTful API for purchasing carbon offsets and issuing certificates"
    )
)]
struct ApiDoc;

/// Order service wired to the production stores and queue
pub type AppOrderService =
    OrderService<CartRepository, OrderRepository, CertificateRepository, RedisQueue>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cart_repo: CartRepository,
    pub order_repo: OrderRepository,
    pub cert_repo: CertificateRepository,
    pub order_service: AppOrderService,
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Cart routes
        .route(
            "/api/v1/cart/:user_id",
            get(cart::get_cart_handler).delete(cart::clear_cart_handler),
        )
        .route("/api/v1/cart/:user_id/items", post(cart::add_to_cart_handler))
        .route(
            "/api/v1/cart/:user_id/items/:project_id",
            put(cart::update_cart_item_handler).delete(cart::remove_from_cart_handler),
        )
        // Order routes. Axum requires one capture name per position, so
        // the group shares :id (a user id or an order id per route).
        .route("/api/v1/orders/:id", get(orders::get_order_handler))
        .route(
            "/api/v1/orders/:id/checkout",
            post(orders::checkout_handler),
        )
        .route(
            "/api/v1/orders/:id/history",
            get(orders::order_history_handler),
        )
        .route(
            "/api/v1/orders/:id/certificates",
            get(orders::user_certificates_handler),
        )
        // Admin reporting routes
        .route(
            "/api/v1/admin/reports/monthly",
            get(admin::monthly_report_handler),
        )
        .route(
            "/api/v1/admin/orders/date-range",
            get(admin::date_range_handler),
        )
        .route(
            "/api/v1/admin/statistics",
            get(admin::statistics_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Carbon Offset API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let queue_name = std::env::var("CERTIFICATE_QUEUE_NAME")
        .unwrap_or_else(|_| CERTIFICATE_QUEUE.to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Connect to the message queue
    tracing::info!("Connecting to Redis...");
    let message_queue = RedisQueue::connect(&redis_url)
        .await
        .expect("Failed to connect to Redis");

    let cart_repo = CartRepository::new(db_pool.clone());
    let order_repo = OrderRepository::new(db_pool.clone());
    let cert_repo = CertificateRepository::new(db_pool);

    let order_service = OrderService::new(
        cart_repo.clone(),
        order_repo.clone(),
        cert_repo.clone(),
        message_queue.clone(),
        queue_name.clone(),
    );

    // Background workers share one shutdown signal with the server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = CertificateWorker::new(
        cert_repo.clone(),
        order_repo.clone(),
        message_queue.clone(),
        queue_name.clone(),
        RENDER_DELAY,
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));

    let background_scheduler = Scheduler::new(
        order_repo.clone(),
        cert_repo.clone(),
        message_queue,
        queue_name,
        UserDirectory::new(),
        Utc::now(),
    );
    let scheduler_handle = tokio::spawn(background_scheduler.run(shutdown_rx));

    let state = AppState {
        cart_repo,
        order_repo,
        cert_repo,
        order_service,
    };
    let app = create_router(state);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Carbon Offset API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    // Let in-flight background work finish before exiting
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
    let _ = scheduler_handle.await;

    tracing::info!("Carbon Offset API stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every endpoint the service serves, as documented.
    #[test]
    fn test_openapi_documents_the_full_route_surface() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/cart/{user_id}",
            "/api/v1/cart/{user_id}/items",
            "/api/v1/cart/{user_id}/items/{project_id}",
            "/api/v1/orders/{order_id}",
            "/api/v1/orders/{user_id}/checkout",
            "/api/v1/orders/{user_id}/history",
            "/api/v1/orders/{user_id}/certificates",
            "/api/v1/admin/reports/monthly",
            "/api/v1/admin/orders/date-range",
            "/api/v1/admin/statistics",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing documented path: {}",
                path
            );
        }
    }
}
