use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingua_api::{config::Config, create_router, services::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracer_provider = init_telemetry()?;
    let tracer = tracer_provider.tracer("lingua-api");

    // LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingua_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!("Starting Lingua practice API");

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    tracing::info!("MongoDB connected");

    let redis_client = config
        .redis_uri
        .as_deref()
        .map(redis::Client::open)
        .transpose()
        .context("Failed to create Redis client")?;

    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(
        AppState::new(config, mongo_client, redis_client)
            .await
            .context("Failed to initialize application state")?,
    );

    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    tracing::info!("Shutting down OpenTelemetry");
    if let Err(e) = tracer_provider.shutdown() {
        eprintln!("OpenTelemetry shutdown failed: {}", e);
    }
    Ok(())
}

fn init_telemetry() -> anyhow::Result<opentelemetry_sdk::trace::SdkTracerProvider> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(otlp_endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    let resource = Resource::builder_empty()
        .with_service_name("lingua-api")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok(provider)
}
