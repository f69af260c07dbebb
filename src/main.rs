use std::{net::SocketAddr, sync::Arc};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use dashmap::DashMap;
use reqwest::Client;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mentionflow_backend::config::Config;
use mentionflow_backend::db::postgres_interaction_repository::PostgresInteractionRepository;
use mentionflow_backend::db::postgres_view_repository::PostgresViewRepository;
use mentionflow_backend::db::postgres_workflow_repository::PostgresWorkflowRepository;
use mentionflow_backend::db::{
    interaction_repository::InteractionRepository, view_repository::ViewRepository,
    workflow_repository::WorkflowRepository,
};
use mentionflow_backend::responses::JsonResponse;
use mentionflow_backend::routes::{
    analytics,
    ingest::ingest_interaction,
    interactions::{
        approve_response, bulk_action, generate_response, list_by_view, list_dead_letters,
        reject_pending_response, requeue_dead_letter, respond,
    },
    views::{create_view, delete_view, duplicate_view, list_views, pin_view, update_view},
    workflows::{
        activate_workflow, create_workflow, delete_workflow, get_workflow, list_workflows,
        pause_workflow, reorder_workflows, update_workflow,
    },
};
use mentionflow_backend::services::ai::{Classifier, HttpAiService, ResponseGenerator};
use mentionflow_backend::services::platform::{HttpPlatformClient, PlatformClient};
use mentionflow_backend::worker::start_background_worker;
use mentionflow_backend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(20);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Periodically drop rate-limiter entries for idle peers.
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let pg_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let workflow_repo = Arc::new(PostgresWorkflowRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn WorkflowRepository>;
    let interaction_repo = Arc::new(PostgresInteractionRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn InteractionRepository>;
    let view_repo = Arc::new(PostgresViewRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn ViewRepository>;

    workflow_repo
        .ensure_system_workflows()
        .await
        .expect("Failed to seed system workflows");

    let http_client = Client::new();
    let ai = Arc::new(HttpAiService::new(
        http_client.clone(),
        &config.ai_base_url,
        &config.ai_api_key,
        config.ai_timeout,
    ));
    let platform = Arc::new(HttpPlatformClient::new(
        http_client.clone(),
        &config.platform_gateway_url,
        config.platform_timeout,
    )) as Arc<dyn PlatformClient>;

    let state = AppState {
        workflow_repo,
        interaction_repo,
        view_repo,
        classifier: ai.clone() as Arc<dyn Classifier>,
        generator: ai as Arc<dyn ResponseGenerator>,
        platform,
        http_client: Arc::new(http_client),
        config: config.clone(),
        dispatch_guard: Arc::new(DashMap::new()),
    };
    let state_for_worker = state.clone();

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let workflow_routes = Router::new()
        .route("/", get(list_workflows).post(create_workflow))
        .route("/reorder", post(reorder_workflows))
        .route(
            "/{workflow_id}",
            get(get_workflow)
                .patch(update_workflow)
                .delete(delete_workflow),
        )
        .route("/{workflow_id}/activate", post(activate_workflow))
        .route("/{workflow_id}/pause", post(pause_workflow));

    let interaction_routes = Router::new()
        .route("/by-view/{view_id}", get(list_by_view))
        .route("/bulk-action", post(bulk_action))
        .route("/dead-letters", get(list_dead_letters))
        .route("/dead-letters/{failure_id}/requeue", post(requeue_dead_letter))
        .route("/{interaction_id}/generate-response", post(generate_response))
        .route("/{interaction_id}/respond", post(respond))
        .route(
            "/{interaction_id}/pending-response",
            delete(reject_pending_response),
        )
        .route("/{interaction_id}/approve-response", post(approve_response));

    let view_routes = Router::new()
        .route("/", get(list_views).post(create_view))
        .route("/{view_id}", axum::routing::patch(update_view).delete(delete_view))
        .route("/{view_id}/pin", post(pin_view))
        .route("/{view_id}/duplicate", post(duplicate_view));

    let analytics_routes = Router::new()
        .route("/overview", get(analytics::overview))
        .route("/workflows", get(analytics::workflows));

    let ingest_routes = Router::new().route("/{platform}", post(ingest_interaction));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/workflows", workflow_routes)
        .nest("/api/interactions", interaction_routes)
        .nest("/api/views", view_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/ingest", ingest_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    start_background_worker(state_for_worker).await;

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.unwrap();
    info!(%addr, "mentionflow backend listening");
    axum::serve(listener, make_service).await.unwrap();

    Ok(())
}

async fn root() -> Response {
    JsonResponse::success("MentionFlow API").into_response()
}
