use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenvy::dotenv;
use tracing::info;

use coordinator_api::api::{self, RouteHandlerAdapter};
use coordinator_core::config::{CoordinatorConfig, LogFormat};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = CoordinatorConfig::from_env().map_err(|e| {
        eprintln!("configuration error: {e}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&config);

    info!(http_port = config.http_port, rpc_port = config.rpc_port, "starting coordinator");

    let http_port = config.http_port;
    let rpc_port = config.rpc_port;

    let bootstrapped = coordinator_api::bootstrap(config);

    let state = bootstrapped.state.clone();
    let rpc_handler: Arc<dyn coordinator_rpc::RouteHandler> = Arc::new(RouteHandlerAdapter::new(state.clone()));
    let rpc_addr = format!("0.0.0.0:{rpc_port}");

    let http_server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::routes::configure)
    })
    .bind(("0.0.0.0", http_port))?
    .run();

    let rpc_server = async move {
        coordinator_rpc::serve(&rpc_addr, rpc_handler).await
    };

    tokio::try_join!(http_server, rpc_server)?;

    if let Some(handle) = bootstrapped.health_sweep_handle {
        handle.abort();
    }

    Ok(())
}

fn init_logging(config: &CoordinatorConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }
}
