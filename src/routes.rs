use std::{path::Path, sync::Arc};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::ALLOWED_EXTENSIONS,
    error::AppError,
    events::{self, Event},
    ewaste,
    model::DeviceKind,
    state::AppState,
};

pub async fn hello_handler() -> Json<Value> {
    Json(json!({ "hellow": "check" }))
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Client filenames are only trusted for their extension; everything that
/// could traverse paths is stripped.
fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

fn unique_filename(original: &str) -> String {
    let extension = extension(original).unwrap_or_default();
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

fn require_device(device: Option<DeviceKind>) -> Result<DeviceKind, AppError> {
    device.ok_or_else(|| {
        AppError::BadRequest("No device type available. Please upload an image first.".into())
    })
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        if field.name() == Some("images") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let Some((filename, data)) = upload else {
        return Err(AppError::BadRequest("No images part in the request".into()));
    };

    if filename.is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }

    if !allowed_file(&filename) {
        return Err(AppError::BadRequest(format!(
            "File type not allowed: {filename}"
        )));
    }

    let stored_name = unique_filename(&sanitize_filename(&filename));
    let filepath = Path::new(&state.config.upload_dir).join(&stored_name);
    tokio::fs::write(&filepath, &data)
        .await
        .map_err(|err| AppError::Internal(err.into()))?;

    let device = {
        let model = state.model.lock().await;
        model.predict(&data)?
    };

    *state.last_device.lock().await = Some(device);

    info!("Stored {stored_name}, classified as {device}");

    let device_info = ewaste::device_info(&state.http, &state.config.gemini_api_key, device).await;

    Ok(Json(json!({
        "success": true,
        "message": format!("Image classified as {device}"),
        "device_type": device,
        "device_info": device_info,
    })))
}

pub async fn upload_options_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn analyze_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let device = require_device(*state.last_device.lock().await)?;

    let device_info = ewaste::device_info(&state.http, &state.config.gemini_api_key, device).await;

    Ok(Json(device_info))
}

pub async fn create_event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Event>,
) -> Json<Value> {
    events::push_event(
        &state.http,
        &state.config.database_url,
        state.database_auth.as_deref(),
        &event,
    )
    .await;

    Json(json!({
        "success": true,
        "message": "Event created successfully",
        "event_data": event,
    }))
}

pub async fn get_events_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let events = state.events.lock().await;
    Json(json!({ "events": events.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_the_allowed_extensions() {
        for name in ["a.png", "b.jpg", "c.jpeg", "d.gif", "e.PNG", "f.JpEg"] {
            assert!(allowed_file(name), "{name} should be allowed");
        }
        for name in ["a.pdf", "b.exe", "c.png.sh", "noext", "trailingdot."] {
            assert!(!allowed_file(name), "{name} should be rejected");
        }
    }

    #[test]
    fn extension_takes_the_last_dot() {
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("photo.PNG").as_deref(), Some("png"));
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("ok photo (1).png"), "okphoto1.png");
    }

    #[test]
    fn unique_filenames_keep_the_extension_and_differ() {
        let first = unique_filename("cat.png");
        let second = unique_filename("cat.png");

        assert!(first.ends_with(".png"));
        assert!(second.ends_with(".png"));
        assert_ne!(first, second);
        // uuid4 hex + dot + extension
        assert_eq!(first.len(), 32 + 1 + 3);
    }

    #[test]
    fn analyze_requires_a_prior_classification() {
        let err = require_device(None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("upload an image first"));
    }

    #[test]
    fn analyze_uses_the_stored_device() {
        let device = require_device(Some(DeviceKind::Laptop)).unwrap();
        assert_eq!(device, DeviceKind::Laptop);
    }
}
