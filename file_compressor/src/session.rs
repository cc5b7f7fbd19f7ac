use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use log::{debug, error, info};
use thiserror::Error;

use crate::client::{CompressError, Compressor, HttpCompressor, Upload, UploadPayload};
use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("no compressed result is ready for download")]
    NotReady,
    #[error(transparent)]
    Compress(#[from] CompressError),
    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle to a user-chosen local file. The content is only read when the
/// file is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    path: PathBuf,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => path.to_string_lossy().to_string(),
        };
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Bytes returned by a successful compress call, held in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedResult {
    bytes: Bytes,
}

impl CompressedResult {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoFile,
    Selected(SelectedFile),
    Compressing(SelectedFile),
    Ready {
        file: SelectedFile,
        result: CompressedResult,
    },
}

impl SessionState {
    pub fn selected_file(&self) -> Option<&SelectedFile> {
        match self {
            SessionState::NoFile => None,
            SessionState::Selected(file) | SessionState::Compressing(file) => Some(file),
            SessionState::Ready { file, .. } => Some(file),
        }
    }

    pub fn result(&self) -> Option<&CompressedResult> {
        match self {
            SessionState::Ready { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn can_compress(&self) -> bool {
        self.selected_file().is_some()
    }

    pub fn can_download(&self) -> bool {
        self.result().is_some()
    }
}

/// A compressed result paired with the name it is saved under.
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub bytes: Bytes,
}

impl DownloadArtifact {
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = dir.as_ref().join(&self.file_name);
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|source| SessionError::Save {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

struct SessionInner {
    state: SessionState,
    // Bumped on every selection; responses from an older cycle are dropped.
    cycle: u64,
    in_flight: usize,
}

/// One select → compress → download cycle over a [`Compressor`].
///
/// Clones share the same state, so overlapping `compress` calls can be
/// driven from separate tasks. The lock is never held across the upload:
/// whichever response resolves last overwrites the result.
pub struct CompressionSession<C> {
    inner: Arc<Mutex<SessionInner>>,
    compressor: Arc<C>,
    suffix: String,
    placeholder: bool,
}

impl<C> Clone for CompressionSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            compressor: Arc::clone(&self.compressor),
            suffix: self.suffix.clone(),
            placeholder: self.placeholder,
        }
    }
}

impl CompressionSession<HttpCompressor> {
    pub fn connect(config: &ClientConfig) -> Result<Self, SessionError> {
        let compressor = HttpCompressor::new(config)?;
        Ok(Self::new(compressor, config))
    }
}

impl<C: Compressor> CompressionSession<C> {
    pub fn new(compressor: C, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::NoFile,
                cycle: 0,
                in_flight: 0,
            })),
            compressor: Arc::new(compressor),
            suffix: config.suffix.clone(),
            placeholder: config.placeholder,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.lock().state.selected_file().cloned()
    }

    pub fn result(&self) -> Option<CompressedResult> {
        self.lock().state.result().cloned()
    }

    /// Records `file` and starts a new cycle. Any earlier result is dropped.
    pub fn select_file(&self, file: SelectedFile) {
        info!("Selected {}", file.path().display());
        let mut inner = self.lock();
        inner.state = SessionState::Selected(file);
        inner.cycle += 1;
        inner.in_flight = 0;
    }

    /// Uploads the selected file and stores the response body as the result.
    ///
    /// Failures are logged and returned; the state falls back to `Selected`
    /// once no other upload of the same cycle is pending.
    pub async fn compress(&self) -> Result<(), SessionError> {
        let (file, cycle) = {
            let mut inner = self.lock();
            let Some(file) = inner.state.selected_file().cloned() else {
                error!("Error compressing file: {}", SessionError::NoFileSelected);
                return Err(SessionError::NoFileSelected);
            };
            if matches!(inner.state, SessionState::Selected(_)) {
                inner.state = SessionState::Compressing(file.clone());
            }
            inner.in_flight += 1;
            (file, inner.cycle)
        };

        let outcome = self.submit(&file).await;

        let mut inner = self.lock();
        if inner.cycle != cycle {
            if let Err(err) = &outcome {
                error!("Error compressing file: {}", err);
            }
            debug!("Discarding response for {}: a new file was selected", file.name());
            return outcome.map(|_| ());
        }
        inner.in_flight -= 1;

        match outcome {
            Ok(bytes) => {
                info!("Compressed {} ({} bytes)", file.name(), bytes.len());
                inner.state = SessionState::Ready {
                    file,
                    result: CompressedResult { bytes },
                };
                Ok(())
            }
            Err(err) => {
                error!("Error compressing file: {}", err);
                let fallback = match &inner.state {
                    SessionState::Compressing(pending) if inner.in_flight == 0 => {
                        Some(pending.clone())
                    }
                    _ => None,
                };
                if let Some(pending) = fallback {
                    inner.state = SessionState::Selected(pending);
                }
                Err(err)
            }
        }
    }

    async fn submit(&self, file: &SelectedFile) -> Result<Bytes, SessionError> {
        let payload = if self.placeholder {
            UploadPayload::Placeholder
        } else {
            let content = tokio::fs::read(file.path())
                .await
                .map_err(CompressError::from)?;
            UploadPayload::File(Bytes::from(content))
        };

        let upload = Upload {
            file_name: file.name().to_string(),
            payload,
        };
        Ok(self.compressor.compress(upload).await?)
    }

    /// The artifact `download` would save, named after the selected file.
    pub fn download_artifact(&self) -> Result<DownloadArtifact, SessionError> {
        match &self.lock().state {
            SessionState::Ready { file, result } => Ok(DownloadArtifact {
                file_name: format!("{}{}", file.name(), self.suffix),
                bytes: result.bytes.clone(),
            }),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Saves the result into `dir` and returns the written path.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let artifact = self.download_artifact()?;
        let path = artifact.save_to(dir).await?;
        info!("Saved {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(path)
    }
}
