use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;

use orbyt_dto::{SignatureRequest, UploadSignature};

use crate::{
    config::CloudinaryConfig,
    error::{AppError, AppResult},
    utils::{auth::AuthUser, extract::AppJson, media::sign_upload},
};

const DEFAULT_FOLDER: &str = "tweets";

// POST /api/media/cloudinary-signature
pub async fn cloudinary_signature(
    State(cloudinary): State<Arc<CloudinaryConfig>>,
    _auth: AuthUser,
    body: Option<AppJson<SignatureRequest>>,
) -> AppResult<impl IntoResponse> {
    let (Some(cloud_name), Some(api_key), Some(api_secret)) = (
        cloudinary.cloud_name.as_deref(),
        cloudinary.api_key.as_deref(),
        cloudinary.api_secret.as_deref(),
    ) else {
        return Err(AppError::NotConfigured("Cloudinary env not configured"));
    };

    let folder = body
        .and_then(|AppJson(request)| request.folder)
        .map(|folder| folder.trim().to_string())
        .filter(|folder| !folder.is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
    let timestamp = Utc::now().timestamp();

    let signature = sign_upload(
        &[
            ("folder", folder.clone()),
            ("timestamp", timestamp.to_string()),
        ],
        api_secret,
    );

    Ok(Json(UploadSignature {
        signature,
        timestamp,
        api_key: api_key.to_string(),
        folder,
        cloud_name: cloud_name.to_string(),
    }))
}
