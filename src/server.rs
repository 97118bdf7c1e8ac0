//! HTTP server: routes, shared state and error mapping.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | Gallery page |
//! | `GET /api/images` | JSON list of `{filename, mtime}`, newest first |
//! | `GET /api/image/{*filename}` | Original file bytes |
//! | `GET /api/thumbnail/{*filename}` | JPEG thumbnail (cached) |
//! | `GET /api/metadata/{*filename}` | Embedded metadata as a JSON object |
//!
//! Handlers run on the tokio runtime but never decode pixels there. Thumbnail
//! generation and metadata extraction go to a bounded rayon pool and the
//! result comes back over a oneshot channel; plain file reads use
//! `spawn_blocking`.

use crate::cache::{CacheError, CacheStats, ThumbnailCache};
use crate::config::{GalleryConfig, effective_threads};
use crate::imaging::{JpegThumbnailer, ThumbnailCodec, ThumbnailSpec};
use crate::metadata::{self, Metadata};
use crate::page;
use crate::store::{ImageEntry, ImageStore, StoreError, content_type};
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::json;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

const PAGE_TITLE: &str = "Comfy Gallery";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("Server error: {0}")]
    Io(#[from] io::Error),
}

/// Request failures, mapped to status codes in [`IntoResponse`].
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Timed out processing {0}")]
    Timeout(String),
    /// Metadata failures answer with a JSON body.
    #[error("{0}")]
    Metadata(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(filename) => ApiError::NotFound(filename),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::NotFound(filename) => ApiError::NotFound(filename),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            ApiError::Metadata(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Timeout(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    store: ImageStore,
    cache: Arc<ThumbnailCache>,
    pool: ThreadPool,
    timeout: Option<Duration>,
}

impl AppState {
    /// Build the state with the JPEG thumbnailer configured in `config`.
    pub fn new(config: &GalleryConfig) -> Result<Self, ServerError> {
        let codec = JpegThumbnailer::new(ThumbnailSpec::from(&config.thumbnails));
        Self::with_codec(config, Arc::new(codec))
    }

    /// Build the state around any codec.
    pub fn with_codec(
        config: &GalleryConfig,
        codec: Arc<dyn ThumbnailCodec>,
    ) -> Result<Self, ServerError> {
        let store = ImageStore::new(&config.image_dir);
        let cache = ThumbnailCache::new(store.clone(), &config.cache_dir, codec);
        let pool = ThreadPoolBuilder::new()
            .num_threads(effective_threads(&config.processing))
            .thread_name(|i| format!("thumb-worker-{i}"))
            .panic_handler(|_| error!("worker panicked"))
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                cache: Arc::new(cache),
                pool,
                timeout: config.processing.timeout(),
            }),
        })
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.inner.cache.stats()
    }

    /// Run CPU-bound work on the pool and wait for its result.
    ///
    /// With a timeout configured, the request gives up after the limit; the
    /// job itself keeps running to completion.
    async fn run_on_pool<T, F>(&self, filename: &str, job: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.inner.pool.spawn_fifo(move || {
            let _ = tx.send(job());
        });

        let received = match self.inner.timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| ApiError::Timeout(filename.to_string()))?,
            None => rx.await,
        };
        received.map_err(|_| ApiError::Internal(format!("Worker failed processing {filename}")))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/images", get(list_images))
        .route("/api/image/{*filename}", get(serve_image))
        .route("/api/thumbnail/{*filename}", get(serve_thumbnail))
        .route("/api/metadata/{*filename}", get(serve_metadata))
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(page::render_index(PAGE_TITLE).into_string())
}

async fn list_images(State(state): State<AppState>) -> Json<Vec<ImageEntry>> {
    let store = state.inner.store.clone();
    let listed = tokio::task::spawn_blocking(move || store.list_entries()).await;
    match listed {
        Ok(Ok(entries)) => Json(entries),
        Ok(Err(e)) => {
            warn!(error = %e, "image listing failed");
            Json(Vec::new())
        }
        Err(e) => {
            warn!(error = %e, "image listing task failed");
            Json(Vec::new())
        }
    }
}

async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.inner.store.clone();
    let name = filename.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        if !store.exists(&name) {
            return Err(StoreError::NotFound(name));
        }
        store.read_bytes(&name)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(ApiError::from)
    .inspect_err(|e| log_failure(&filename, e))?;

    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes).into_response())
}

async fn serve_thumbnail(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let cache = Arc::clone(&state.inner.cache);
    let name = filename.clone();
    let thumbnail = state
        .run_on_pool(&filename, move || cache.get(&name))
        .await
        .and_then(|result| result.map_err(ApiError::from))
        .inspect_err(|e| log_failure(&filename, e))?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], thumbnail.bytes).into_response())
}

async fn serve_metadata(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Metadata>, ApiError> {
    let store = state.inner.store.clone();
    let name = filename.clone();
    let extracted = state
        .run_on_pool(&filename, move || -> Result<Metadata, ApiError> {
            if !store.exists(&name) {
                return Err(ApiError::NotFound(name));
            }
            let bytes = store.read_bytes(&name)?;
            metadata::extract(&bytes).map_err(|e| ApiError::Metadata(e.to_string()))
        })
        .await;

    // Every failure except a missing file answers with a JSON error body
    let metadata = extracted
        .and_then(|result| result)
        .map_err(|e| match e {
            ApiError::NotFound(_) | ApiError::Metadata(_) => e,
            other => ApiError::Metadata(other.to_string()),
        })
        .inspect_err(|e| log_failure(&filename, e))?;
    Ok(Json(metadata))
}

fn log_failure(filename: &str, e: &ApiError) {
    match e {
        ApiError::NotFound(_) => {}
        ApiError::Timeout(_) => warn!(%filename, "request timed out"),
        _ => error!(%filename, error = %e, "request failed"),
    }
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: GalleryConfig) -> Result<(), ServerError> {
    let state = AppState::new(&config)?;
    let app = router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(
        %addr,
        images = %config.image_dir.display(),
        cache = %config.cache_dir.display(),
        workers = effective_threads(&config.processing),
        "gallery listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(cache = %state.cache_stats(), "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
