//! Crop endpoint handlers.
//!
//! Every route is gated by the access-token extractor. Authorization is the
//! ownership check against the caller's owned list, and it runs before any
//! record lookup, so a non-owner learns nothing about whether a given id
//! exists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::models::crop::{Crop, CropPatch};
use crate::models::User;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::http_helpers::{AuthenticatedUser, HTTPError};

/// Registers crop resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/crops", post(create_crop).get(get_all_crops))
        .route("/api/crops/current", get(get_current_crop))
        .route(
            "/api/crops/:id",
            get(get_crop).put(update_crop).delete(delete_crop),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCropRequest {
    #[serde(default)]
    crop_name: Option<String>,
    #[serde(default)]
    crop_type: Option<String>,
    #[serde(default)]
    season: Option<String>,
}

#[derive(Serialize)]
struct CropResponse {
    message: String,
    crop: Crop,
}

#[derive(Serialize)]
struct CropsResponse {
    message: String,
    crops: Vec<Crop>,
}

#[derive(Serialize)]
struct CurrentCropResponse {
    message: String,
    crop: Option<Crop>,
}

/// Rejects absent or blank required fields.
fn required(field: Option<String>, name: &str) -> Result<String, HTTPError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(HTTPError::validation(format!(
            "Missing required field: {}",
            name
        ))),
    }
}

/// The ownership gate: the id must appear in the caller's owned list.
fn ensure_owned(user: &User, crop_id: &str) -> Result<(), HTTPError> {
    if user.crops.iter().any(|id| id == crop_id) {
        Ok(())
    } else {
        Err(HTTPError::forbidden(
            "Forbidden: You do not have access to this crop",
        ))
    }
}

fn store_error(e: String) -> HTTPError {
    error!("Store error: {}", e);
    HTTPError::server("Internal server error")
}

/// Persists a new crop and appends it to the caller's owned list.
async fn create_crop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Json(body): Json<CreateCropRequest>,
) -> Result<(StatusCode, Json<CropResponse>), HTTPError> {
    let crop_name = required(body.crop_name, "cropName")?;
    let crop_type = required(body.crop_type, "cropType")?;
    let season = required(body.season, "season")?;

    let crop = state
        .store
        .insert_crop(&user.id, Crop::new(crop_name, crop_type, season))
        .await
        .map_err(|e| {
            error!("Failed to create crop: {}", e);
            HTTPError::server("Error in creating crop")
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CropResponse {
            message: "Crop created successfully".to_string(),
            crop,
        }),
    ))
}

/// Resolves the caller's owned list into full records, in list order.
async fn get_all_crops(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<CropsResponse>, HTTPError> {
    let crops = state
        .store
        .find_crops(&user.crops)
        .await
        .map_err(store_error)?;
    Ok(Json(CropsResponse {
        message: "Crops fetched successfully".to_string(),
        crops,
    }))
}

/// The caller's current crop: the most recently appended entry of the owned
/// list, not the most recently updated record.
async fn get_current_crop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<CurrentCropResponse>, HTTPError> {
    let Some(current_id) = user.crops.last() else {
        return Ok(Json(CurrentCropResponse {
            message: "No crops found".to_string(),
            crop: None,
        }));
    };

    let crop = state.store.find_crop(current_id).await.map_err(store_error)?;
    let message = match &crop {
        Some(_) => "Current crop fetched successfully".to_string(),
        None => "No crops found".to_string(),
    };
    Ok(Json(CurrentCropResponse { message, crop }))
}

async fn get_crop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CropResponse>, HTTPError> {
    ensure_owned(&user, &id)?;

    let crop = state
        .store
        .find_crop(&id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| HTTPError::not_found("Crop not found"))?;

    Ok(Json(CropResponse {
        message: "Crop fetched successfully".to_string(),
        crop,
    }))
}

async fn update_crop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CropPatch>,
) -> Result<Json<CropResponse>, HTTPError> {
    ensure_owned(&user, &id)?;

    let crop = state
        .store
        .update_crop(&id, &patch)
        .await
        .map_err(store_error)?
        .ok_or_else(|| HTTPError::not_found("Crop not found"))?;

    Ok(Json(CropResponse {
        message: "Crop updated successfully".to_string(),
        crop,
    }))
}

/// Deletes the record and removes its id from the caller's owned list.
async fn delete_crop(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CropResponse>, HTTPError> {
    ensure_owned(&user, &id)?;

    let crop = state
        .store
        .delete_crop(&user.id, &id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| HTTPError::not_found("Crop not found"))?;

    Ok(Json(CropResponse {
        message: "Crop deleted successfully".to_string(),
        crop,
    }))
}
