use std::path::{Path, PathBuf};

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

const IMAGE_FIELD: &str = "image";
const NUMERIC_FIELDS: [&str; 3] = ["total_tickets", "available_tickets", "ticket_price"];
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Uploaded file part, held in memory until it is written under the static directory.
#[derive(Debug)]
pub struct ImagePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Event payload from either a JSON body or a `multipart/form-data` form with an optional image.
#[derive(Debug)]
pub struct EventForm<T> {
    pub payload: T,
    pub image: Option<ImagePart>,
}

impl<T> FromRequest<AppState> for EventForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(payload) = Json::<T>::from_request(req, state).await?;
            return Ok(Self { payload, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::ValidationError(e.body_text()))?;

        let mut fields = Map::new();
        let mut image = None;
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                // Browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    image = Some(ImagePart { file_name, bytes: bytes.to_vec() });
                }
                continue;
            }

            let text = field.text().await.map_err(malformed)?;
            fields.insert(name.clone(), form_value(&name, text));
        }

        let payload = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::ValidationError(format!("invalid form: {}", e)))?;
        Ok(Self { payload, image })
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("malformed multipart body: {}", err))
}

/// Form fields arrive as text; inventory and price fields are coerced to JSON numbers.
fn form_value(name: &str, text: String) -> Value {
    if !NUMERIC_FIELDS.contains(&name) {
        return Value::String(text);
    }
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Number(n.into());
    }
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(text),
    }
}

/// Keeps the last path segment and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// A file written under `{static_dir}/uploads`.
#[derive(Debug)]
pub struct StoredImage {
    pub url: String,
    path: PathBuf,
}

impl StoredImage {
    /// Removes the file after the request it belonged to failed.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to remove unused upload {}: {}", self.path.display(), e);
        }
    }
}

pub async fn store_image(static_dir: Option<&str>, image: &ImagePart) -> Result<StoredImage, AppError> {
    let static_dir = static_dir
        .ok_or_else(|| AppError::ValidationError("image uploads are not enabled".to_string()))?;

    let sanitized = sanitize_file_name(&image.file_name);
    let extension = Path::new(&sanitized)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::ValidationError(format!(
            "image must be one of: {}",
            IMAGE_EXTENSIONS.join(", ")
        )));
    }

    let file_name = format!("{}_{}", Uuid::new_v4().simple(), sanitized);
    let dir = Path::new(static_dir).join("uploads");
    let path = dir.join(&file_name);

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("could not create upload directory: {}", e)))?;
    tokio::fs::write(&path, &image.bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("could not save image: {}", e)))?;
    debug!(bytes = image.bytes.len(), "Stored upload {}", path.display());

    Ok(StoredImage { url: format!("/static/uploads/{}", file_name), path })
}
