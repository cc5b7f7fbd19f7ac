use std::convert::Infallible;
use std::net::SocketAddr;

use log::{error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::{Filter, Reply};

use crate::config::ServerConfig;
use crate::handlers::{handle_compress, handle_rejection};
use crate::state::ServerState;
use crate::web::serve_web_ui;

pub fn routes(
    state: &ServerState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + Send + Sync + 'static {
    let compress = warp::path("compress")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(state.upload_limit()))
        .and(state.with_state())
        .and_then(handle_compress);

    // Serve the upload page (embedded in the binary)
    let web_ui = warp::path("webui")
        .and(warp::get())
        .and(warp::path::tail())
        .and_then(serve_web_ui);

    let root_redirect = warp::path::end()
        .and(warp::get())
        .map(|| warp::redirect(warp::http::Uri::from_static("/webui")));

    compress
        .or(web_ui)
        .or(root_redirect)
        .recover(handle_rejection)
        .with(warp::log("file_compressor::http"))
}

/// A server bound and running on the current tokio runtime.
pub struct RunningServer {
    addr: SocketAddr,
    state: ServerState,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Returns false if shutdown was already requested.
    pub fn shutdown(&self) -> bool {
        match self.state.take_shutdown_tx() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!("Server task failed: {}", e);
        }
    }
}

/// Binds `config.bind` (port 0 picks a free port) and starts serving.
pub fn spawn(config: ServerConfig) -> Result<RunningServer, warp::Error> {
    let state = ServerState::new(config.clone());

    let (tx, rx) = oneshot::channel::<()>();
    state.set_shutdown_tx(tx);

    let (addr, server) = warp::serve(routes(&state)).try_bind_with_graceful_shutdown(config.bind, async move {
        rx.await.ok();
        info!("Server shutting down");
    })?;

    info!("Serving on http://{} (upload page at /webui)", addr);
    let task = tokio::spawn(server);

    Ok(RunningServer { addr, state, task })
}

/// Serves until Ctrl+C.
pub async fn run(config: ServerConfig) -> Result<(), warp::Error> {
    let server = spawn(config)?;
    info!("Press Ctrl+C to stop the server");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    server.shutdown();
    let compressed = server.state().files_compressed();
    server.wait().await;
    info!("Stopped after compressing {} file(s)", compressed);

    Ok(())
}
