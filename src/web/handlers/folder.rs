//! Folder handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::web::dto::{
    ApiResponse, CreateFolderRequest, FolderDeleteResponse, FolderListParams, FolderResponse,
    FolderTreeNode, MoveFolderRequest, RenameRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 404, description = "Parent folder not found"),
        (status = 409, description = "A folder with this name already exists"),
        (status = 422, description = "Invalid folder name")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let folder = state
        .folders()
        .create(user.id, &req.name, req.parent_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::from(folder))),
    ))
}

/// GET /api/folders - List folders under a parent, or all with `all=true`.
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "folders",
    params(FolderListParams),
    responses(
        (status = 200, description = "Folders sorted by name", body = Vec<FolderResponse>),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<FolderListParams>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let folders = state.folders().list(user.id, params.scope()).await?;

    Ok(Json(ApiResponse::new(
        folders.into_iter().map(FolderResponse::from).collect(),
    )))
}

/// GET /api/folders/tree - The user's folders as a nested tree.
#[utoipa::path(
    get,
    path = "/api/folders/tree",
    tag = "folders",
    responses(
        (status = 200, description = "Root folders with nested children", body = Vec<FolderTreeNode>)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn folder_tree(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<FolderTreeNode>>>, ApiError> {
    let tree = state.folders().tree(user.id).await?;

    Ok(Json(ApiResponse::new(
        tree.into_iter().map(FolderTreeNode::from).collect(),
    )))
}

/// PUT /api/folders/:id - Rename a folder and rewrite descendant paths.
#[utoipa::path(
    put,
    path = "/api/folders/{id}",
    tag = "folders",
    params(
        ("id" = i64, Path, description = "Folder ID")
    ),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Folder renamed", body = FolderResponse),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "A folder with this name already exists"),
        (status = 422, description = "Invalid folder name")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_folder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(folder_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state
        .folders()
        .rename(user.id, folder_id, &req.name)
        .await?;

    Ok(Json(ApiResponse::new(FolderResponse::from(folder))))
}

/// PUT /api/folders/:id/move - Move a folder under another folder or to the root.
#[utoipa::path(
    put,
    path = "/api/folders/{id}/move",
    tag = "folders",
    params(
        ("id" = i64, Path, description = "Folder ID")
    ),
    request_body = MoveFolderRequest,
    responses(
        (status = 200, description = "Folder moved", body = FolderResponse),
        (status = 400, description = "Target is the folder itself or a descendant"),
        (status = 404, description = "Folder or target folder not found"),
        (status = 409, description = "A folder with this name already exists")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn move_folder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(folder_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MoveFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state
        .folders()
        .move_folder(user.id, folder_id, req.parent_id)
        .await?;

    Ok(Json(ApiResponse::new(FolderResponse::from(folder))))
}

/// DELETE /api/folders/:id - Delete a folder with its subtree and files.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    tag = "folders",
    params(
        ("id" = i64, Path, description = "Folder ID")
    ),
    responses(
        (status = 200, description = "Folder deleted", body = FolderDeleteResponse),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<FolderDeleteResponse>>, ApiError> {
    let deletion = state.folders().delete(user.id, folder_id).await?;

    Ok(Json(ApiResponse::new(FolderDeleteResponse::from(deletion))))
}
