use std::{
    fmt::{self, Display, Formatter},
    fs, io, thread,
};

use log::{debug, warn};

use crate::config::ViewerConfig;

pub const FILE_SCHEME: &str = "file://";

#[derive(Debug)]
pub enum FetchError {
    Io { path: String, error: io::Error },
    Status { url: String, status: u16, text: String },
    Transport { url: String, message: String },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Io { path, error } => write!(f, "Cannot read \"{}\": {}", path, error),
            FetchError::Status { url, status, text } => {
                write!(f, "Request to {} returned {} {}", url, status, text)
            }
            FetchError::Transport { url, message } => {
                write!(f, "Request to {} failed: {}", url, message)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type FetchCallback = Box<dyn FnOnce(Result<Vec<u8>, FetchError>) + Send + 'static>;

/// Resolves an artifact reference into raw bytes without blocking the caller.
/// `on_done` may run on any thread.
pub trait ArtifactFetcher: Send {
    fn fetch(&self, artifact_ref: &str, on_done: FetchCallback);
}

/// Treats the reference as a local path, read on a background thread.
#[derive(Debug, Default, Clone)]
pub struct FileFetcher {}

impl ArtifactFetcher for FileFetcher {
    fn fetch(&self, artifact_ref: &str, on_done: FetchCallback) {
        let path = artifact_ref.to_string();
        thread::spawn(move || {
            debug!("Reading artifact {}", path);
            let result = fs::read(&path).map_err(|error| FetchError::Io { path, error });
            on_done(result);
        });
    }
}

/// GETs `<base>/<ref>` from the artifact endpoint.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, artifact_ref: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            artifact_ref.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "http")]
impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, artifact_ref: &str, on_done: FetchCallback) {
        let url = self.url(artifact_ref);
        debug!("Fetching artifact {}", url);
        let request = ehttp::Request::get(&url);
        ehttp::fetch(request, move |result| {
            let result = match result {
                Ok(response) if response.ok => Ok(response.bytes),
                Ok(response) => Err(FetchError::Status {
                    url,
                    status: response.status,
                    text: response.status_text,
                }),
                Err(message) => Err(FetchError::Transport { url, message }),
            };
            on_done(result);
        });
    }
}

/// Routes `file://` references and, without an endpoint, every reference to
/// the file fetcher. Everything else goes to the endpoint.
pub struct ArtifactResolver {
    file: FileFetcher,
    remote: Option<Box<dyn ArtifactFetcher>>,
}

impl ArtifactResolver {
    pub fn new(remote: Option<Box<dyn ArtifactFetcher>>) -> Self {
        Self {
            file: FileFetcher::default(),
            remote,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let Some(endpoint) = &config.endpoint else {
            return Self::new(None);
        };
        #[cfg(feature = "http")]
        {
            Self::new(Some(Box::new(HttpFetcher::new(endpoint.clone()))))
        }
        #[cfg(not(feature = "http"))]
        {
            warn!(
                "Endpoint {} configured but HTTP support is disabled, using local files",
                endpoint
            );
            Self::new(None)
        }
    }
}

impl ArtifactFetcher for ArtifactResolver {
    fn fetch(&self, artifact_ref: &str, on_done: FetchCallback) {
        if let Some(path) = artifact_ref.strip_prefix(FILE_SCHEME) {
            return self.file.fetch(path, on_done);
        }
        match &self.remote {
            Some(remote) => remote.fetch(artifact_ref, on_done),
            None => {
                if artifact_ref.is_empty() {
                    warn!("Empty artifact reference");
                }
                self.file.fetch(artifact_ref, on_done)
            }
        }
    }
}
