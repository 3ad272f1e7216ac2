use clap::Parser;
use futures::Stream;
use quartet_tonic_core::proto::{
    blog::BlogServiceServer, calculator::CalculatorServiceServer, greet::GreetServiceServer,
};
use quartet_tonic_server::server::arrival::ArrivalLayer;
use quartet_tonic_server::server::config::{CliArgs, ServerConfig};
use quartet_tonic_server::server::service::{
    Services, blog::BlogHandler, calculator::CalculatorHandler, greet::GreetHandler,
};
use quartet_tonic_server::server::telemetry::{TelemetryProviders, init_telemetry};
use quartet_tonic_core::quartet::store::MemoryStore;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::transport::server::Connected;
use tonic_health::server::HealthReporter;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    if config.uds {
        #[cfg(unix)]
        {
            use tokio::net::UnixListener;
            use tokio_stream::wrappers::UnixListenerStream;
            let uds_path = config.server_addr.clone();
            let uds = UnixListener::bind(&uds_path)?;
            let incoming = UnixListenerStream::new(uds);
            log_startup_info(&uds_path, &config);
            let res = run_server_with_incoming(providers, incoming, config).await;
            // A panic can still leave the socket file behind.
            let _ = std::fs::remove_file(&uds_path);
            res
        }
        #[cfg(not(unix))]
        {
            anyhow::bail!("Unix domain sockets are not supported on this platform");
        }
    } else {
        let tcp_path = config.server_addr.clone();
        let tcp = TcpListener::bind(&tcp_path).await?;
        let incoming = TcpListenerStream::new(tcp);
        log_startup_info(&tcp_path, &config);
        run_server_with_incoming(providers, incoming, config).await
    }
}

async fn run_server_with_incoming<I, IO, IE>(
    providers: TelemetryProviders,
    incoming: I,
    config: ServerConfig,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CalculatorServiceServer<CalculatorHandler>>()
        .await;
    health_reporter
        .set_serving::<BlogServiceServer<BlogHandler<MemoryStore>>>()
        .await;
    health_reporter
        .set_serving::<GreetServiceServer<GreetHandler>>()
        .await;

    let services = Services::new(&config);

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(ArrivalLayer)
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(services.calculator_server())
        .add_service(services.blog_server())
        .add_service(services.greet_server())
        .serve_with_incoming_shutdown(
            incoming,
            shutdown_signal(services.clone(), health_reporter),
        )
        .await?;

    providers.shutdown();
    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(addr: &str, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting quartet on {} with full config: {:#?}", addr, config);
    } else {
        tracing::info!(
            "Starting quartet on {} (stream buffer {}, default deadline {:?})",
            addr,
            config.stream_buffer_size,
            config.default_deadline
        );
    }
}

async fn shutdown_signal(services: Services, health_reporter: HealthReporter) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<CalculatorServiceServer<CalculatorHandler>>()
        .await;
    health_reporter
        .set_not_serving::<BlogServiceServer<BlogHandler<MemoryStore>>>()
        .await;
    health_reporter
        .set_not_serving::<GreetServiceServer<GreetHandler>>()
        .await;

    // 2. Drain in-flight calls, then cancel the stragglers
    services.shutdown().await;
}
