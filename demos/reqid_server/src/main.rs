use async_trait::async_trait;
use pingora::server::Server;
use pingora::services::listening::Service;
use pingora_reqid::rpc::RequestIdInterceptor;
use pingora_reqid::{
    App, GeneratorConfig, Handler, Level, LoggingMiddleware, Request, RequestIdGenerator, Response,
    StatusCode, TracingLogger, TracingMiddleware, WebError, handler_fn,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::service::InterceptorLayer;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Reports the request id the chain bound for this request.
struct WhoAmI;

#[async_trait]
impl Handler for WhoAmI {
    async fn handle(&self, req: Request) -> Result<Response, WebError> {
        tracing::info!("serving {}", req.path());
        if req.path() == "/fail" {
            return Err(pingora_reqid::error::internal_error("deliberate failure"));
        }
        Ok(Response::json(
            StatusCode::OK,
            serde_json::json!({
                "path": req.path(),
                "request_id": req.request_id(),
            }),
        ))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let config = match std::env::var("REQID_HOSTNAME") {
        Ok(host) => GeneratorConfig::new().hostname(host),
        Err(_) => GeneratorConfig::new(),
    };
    // Built eagerly, before any request can race on it
    let generator = match RequestIdGenerator::with_config(config) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            tracing::error!(error = %e, "cannot start without a request id prefix");
            std::process::exit(1);
        }
    };

    let mut app = App::new(Arc::new(WhoAmI), generator);
    app.use_middleware(TracingMiddleware::new());
    app.use_middleware(LoggingMiddleware::new(TracingLogger::new().min_level(Level::Info)));

    // A second app sharing the counter, to show one generator per process
    let health = App::new(
        handler_fn(|_req| Ok(Response::text(StatusCode::OK, "ok"))),
        Arc::clone(app.generator()),
    );

    // gRPC health service behind the same generator, on its own runtime
    let interceptor = RequestIdInterceptor::new(Arc::clone(app.generator()));
    let grpc_addr: SocketAddr = ([0, 0, 0, 0], 50051).into();
    std::thread::spawn(move || run_grpc(interceptor, grpc_addr));

    if let Err(e) = run_server(app, health, "0.0.0.0:8080", "0.0.0.0:8081") {
        tracing::error!(error = %e, "pingora server error");
    }
}

fn run_server(app: App, health: App, addr: &str, health_addr: &str) -> std::io::Result<()> {
    let mut server = Server::new(None).map_err(|e| std::io::Error::other(e.to_string()))?;
    server.bootstrap();

    let mut service = Service::new("reqid demo".to_string(), app);
    service.add_tcp(addr);
    let mut health_service = Service::new("reqid health".to_string(), health);
    health_service.add_tcp(health_addr);
    server.add_services(vec![Box::new(service), Box::new(health_service)]);

    tracing::info!("listening on http://{} (health on {})", addr, health_addr);
    server.run_forever();
}

fn run_grpc(interceptor: RequestIdInterceptor, addr: SocketAddr) {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "cannot start grpc runtime");
            return;
        }
    };
    runtime.block_on(async move {
        let (_reporter, health) = tonic_health::server::health_reporter();
        tracing::info!("grpc health on {}", addr);
        let served = tonic::transport::Server::builder()
            .layer(InterceptorLayer::new(interceptor))
            .add_service(health)
            .serve(addr)
            .await;
        if let Err(e) = served {
            tracing::error!(error = %e, "grpc server error");
        }
    });
}
