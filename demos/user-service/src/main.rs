//! Example service: a `/users` resource under `/v2`
//!
//! ```text
//! curl localhost:3000/v2/users/<id>
//! curl -X POST localhost:3000/v2/users \
//!      -H 'Authorization: Bearer demo' \
//!      -d '{"firstName":"Ada","lastName":"Lovelace","email":"ada@example.com","password":"pw"}'
//! ```

use sleepy::prelude::*;
use sleepy::TracingLogger;

mod users;

fn log_request(req: &Request, data: &mut CallData) -> Result<()> {
    debug!(request_id = %data.request_id(), method = %req.method(), uri = %req.uri(), "Request received");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", err);
    }
}

#[sleepy::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let mut config = ApiConfig::from_env()?;
    if config.base_path.is_empty() {
        config.base_path = "/v2".to_string();
    }
    let addr = std::env::var("SLEEPY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let logger = TracingLogger::for_environment(&config.environment);
    let mut api = Api::with_config(config).with_logger(logger);
    api.filter(log_request);
    api.register(users::resource(users::UserStore::default()))?;

    info!(routes = api.route_count(), "Starting user service");
    api.serve_with_shutdown(&addr, shutdown_signal()).await?;
    Ok(())
}
