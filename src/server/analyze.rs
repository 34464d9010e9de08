use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::auth::CurrentUser;
use super::AppState;
use crate::error::AppError;
use crate::framing;
use crate::image::{DataUri, DataUriError};
use crate::llm::{prompt, ModelStream};
use crate::storage::{persist, Scan, ScanStore, PLACEHOLDER_IMAGE};

/// Marks the body as the line-framed text protocol the client decodes.
pub const STREAM_PROTOCOL_HEADER: &str = "x-vercel-ai-data-stream";

const NO_IMAGE: &str = "No image provided";
const NOT_AN_IMAGE: &str = "Uploaded file is not an image";

/// JSON form of an analyze request: data URIs for one or two images.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeBody {
    pub image: Option<String>,
    pub image2: Option<String>,
}

#[derive(Debug, Default)]
struct Uploads {
    first: Option<DataUri>,
    second: Option<DataUri>,
}

/// Where the finished text goes once the stream ends cleanly.
struct PendingScan {
    store: ScanStore,
    user_id: String,
    image_ref: String,
    timeout: Duration,
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    user: Option<CurrentUser>,
    request: Request,
) -> Result<Response, AppError> {
    state.gateway.ensure_credentials()?;

    let uploads = read_uploads(request, &state).await?;
    let first = uploads
        .first
        .ok_or_else(|| AppError::Input(NO_IMAGE.to_string()))?;
    if !first.is_image() || uploads.second.as_ref().is_some_and(|i| !i.is_image()) {
        return Err(AppError::Input(NOT_AN_IMAGE.to_string()));
    }

    let image_ref = if state.config.storage.store_images {
        first.to_string()
    } else {
        PLACEHOLDER_IMAGE.to_string()
    };

    let analysis = prompt::build_request(first, uploads.second);
    info!(
        mode = %analysis.mode,
        images = analysis.images.len(),
        user = user.as_ref().map(|u| u.0.as_str()).unwrap_or("anonymous"),
        "analysis requested"
    );

    let started = state.gateway.stream(&analysis).await?;

    let pending = user.map(|CurrentUser(user_id)| PendingScan {
        store: state.store.clone(),
        user_id,
        image_ref,
        timeout: Duration::from_secs(state.config.storage.write_timeout_secs),
    });

    Ok(stream_response(started, pending))
}

fn stream_response(started: ModelStream, pending: Option<PendingScan>) -> Response {
    let ModelStream { model, mut stream } = started;

    let frames = async_stream::stream! {
        let mut full = String::new();
        let mut failed = false;

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    full.push_str(&fragment);
                    yield Ok::<_, std::io::Error>(framing::encode_text(&fragment));
                }
                Err(e) => {
                    warn!(model = %model, error = %e, chars = full.len(), "stream failed mid-response");
                    failed = true;
                    yield Ok(framing::encode_error(&e.to_string()));
                    break;
                }
            }
        }

        if !failed {
            info!(model = %model, chars = full.len(), "stream complete");
            match pending {
                Some(_) if full.trim().is_empty() => debug!("empty analysis, not saving"),
                Some(p) => {
                    let scan = Scan::new(&p.user_id, &p.image_ref, full);
                    persist::spawn_save(p.store, scan, p.timeout);
                }
                None => debug!("anonymous request, not saving"),
            }
        }
    };

    (
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (
                HeaderName::from_static(STREAM_PROTOCOL_HEADER),
                HeaderValue::from_static("v1"),
            ),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

fn rejection(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Input(text)
    }
}

async fn read_uploads(request: Request, state: &Arc<AppState>) -> Result<Uploads, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        read_multipart(multipart).await
    } else {
        let Json(body) = Json::<AnalyzeBody>::from_request(request, state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        read_json(body)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Uploads, AppError> {
    let mut uploads = Uploads::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection(e.status(), e.body_text()))?
    {
        let slot = match field.name() {
            Some("file") => &mut uploads.first,
            Some("file2") => &mut uploads.second,
            _ => continue,
        };
        let mime = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;

        // Empty file parts count as absent
        match DataUri::from_bytes(&bytes, mime.as_deref()) {
            Ok(image) => *slot = Some(image),
            Err(DataUriError::Empty) => {}
            Err(e) => return Err(AppError::Input(e.to_string())),
        }
    }

    Ok(uploads)
}

fn read_json(body: AnalyzeBody) -> Result<Uploads, AppError> {
    let parse = |raw: Option<String>| -> Result<Option<DataUri>, AppError> {
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => DataUri::parse(raw)
                .map(Some)
                .map_err(|e| AppError::Input(e.to_string())),
        }
    };

    Ok(Uploads {
        first: parse(body.image)?,
        second: parse(body.image2)?,
    })
}
