//! HTTP server implementation

use crate::api::Api;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Failure to start or keep running the server
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid listen address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Api {
    /// Serve on `addr` until the process exits
    pub async fn serve(self, addr: &str) -> Result<(), ServeError> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve on `addr` until `signal` resolves.
    ///
    /// Once the signal fires no new connections are accepted; connections
    /// already running finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, addr: &str, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "Sleepy server listening");

        run(Arc::new(self), listener, signal).await
    }
}

async fn run<F>(api: Arc<Api>, listener: TcpListener, signal: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(signal);

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = &mut signal => {
                info!("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let api = api.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: hyper::Request<Incoming>| {
                let api = api.clone();
                async move { Ok::<_, Infallible>(api.handle_http(req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(remote = %remote_addr, "Connection error: {}", err);
            }
        });
    }
}
