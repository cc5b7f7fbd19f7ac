use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use warp::Filter;

use crate::config::ServerConfig;

pub struct ServerStateInner {
    pub shutdown_tx: Option<oneshot::Sender<()>>,
    pub config: ServerConfig,
    pub files_compressed: u64,
}

#[derive(Clone)]
pub struct ServerState {
    inner: Arc<Mutex<ServerStateInner>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServerStateInner {
                shutdown_tx: None,
                config,
                files_compressed: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerStateInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_shutdown_tx(&self, tx: oneshot::Sender<()>) {
        self.lock().shutdown_tx = Some(tx);
    }

    pub fn take_shutdown_tx(&self) -> Option<oneshot::Sender<()>> {
        self.lock().shutdown_tx.take()
    }

    pub fn with_state(&self) -> impl Filter<Extract = (ServerState,), Error = std::convert::Infallible> + Clone {
        let state = self.clone();
        warp::any().map(move || state.clone())
    }

    pub fn compression_level(&self) -> u32 {
        self.lock().config.compression_level
    }

    pub fn upload_limit(&self) -> u64 {
        self.lock().config.upload_limit
    }

    pub fn record_compressed(&self) -> u64 {
        let mut state = self.lock();
        state.files_compressed += 1;
        state.files_compressed
    }

    pub fn files_compressed(&self) -> u64 {
        self.lock().files_compressed
    }
}
