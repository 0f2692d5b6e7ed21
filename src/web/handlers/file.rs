//! File handlers.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{
    display_name, resolve_mime_type, FileMetadata, PendingUpload, FILES_FIELD, FOLDER_FIELD,
};
use crate::web::dto::{
    parse_optional_id, ApiResponse, FileListParams, FileResponse, MessageResponse,
    MoveFileRequest, RenameRequest, TokenQuery, UploadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// How the browser should present a streamed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Build a Content-Disposition value safe against header injection.
///
/// Control characters are dropped; non-ASCII names get an RFC 5987
/// `filename*` parameter next to an ASCII-safe fallback.
fn content_disposition_header(disposition: Disposition, filename: &str) -> String {
    let filename: String = filename.chars().filter(|c| !c.is_control()).collect();
    let kind = disposition.as_str();

    if filename.is_ascii() && !filename.contains(['"', '\\']) {
        return format!("{kind}; filename=\"{filename}\"");
    }

    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(&filename);

    format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File too large")
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Read every part of an upload, staging file parts on disk.
///
/// Staged files are pushed to `pending` as they complete so the caller can
/// remove them if a later part fails.
async fn receive_parts(
    state: &AppState,
    user_id: i64,
    multipart: &mut Multipart,
    pending: &mut Vec<PendingUpload>,
) -> Result<Option<i64>, ApiError> {
    let policy = &state.upload;
    let mut folder_id = None;
    let mut file_parts = 0;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            if name == FOLDER_FIELD {
                let text = field.text().await.map_err(multipart_error)?;
                folder_id = parse_optional_id(&text).map_err(ApiError::bad_request)?;
            }
            continue;
        }

        if name != FILES_FIELD {
            return Err(ApiError::bad_request("Unexpected file field"));
        }

        file_parts += 1;
        policy.check_count(file_parts)?;

        let original_name = display_name(field.file_name());
        let mime_type = resolve_mime_type(field.content_type(), &original_name);
        policy.check_mime(&mime_type)?;

        let staged = state
            .storage
            .write_stream(user_id, &original_name, field, policy.max_file_size)
            .await?;
        pending.push(PendingUpload {
            original_name,
            mime_type,
            staged,
        });
    }

    Ok(folder_id)
}

/// POST /api/files/upload - Upload files.
///
/// Request body: multipart/form-data with one or more `files` parts and an
/// optional `folderId` text field.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "`files` parts and optional `folderId`"
    ),
    responses(
        (status = 201, description = "Files uploaded", body = UploadResponse),
        (status = 400, description = "No files, malformed body or unexpected file field"),
        (status = 404, description = "Folder not found"),
        (status = 413, description = "File too large, too many files or quota exceeded"),
        (status = 415, description = "File type not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let mut pending = Vec::new();

    let folder_id = match receive_parts(&state, user.id, &mut multipart, &mut pending).await {
        Ok(folder_id) => folder_id,
        Err(e) => {
            let paths: Vec<&str> = pending
                .iter()
                .map(|p| p.staged.relative_path.as_str())
                .collect();
            state.storage.discard(&paths).await;
            return Err(e);
        }
    };

    let files = state
        .files()
        .commit_upload(user.id, folder_id, pending)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UploadResponse::new(files))),
    ))
}

/// GET /api/files - List files with filter, search and sort.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FileListParams),
    responses(
        (status = 200, description = "Matching files", body = Vec<FileResponse>),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<FileListParams>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.files().list(user.id, &params.to_query()).await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// Stream a stored file with its metadata headers.
async fn stream_file(
    state: &AppState,
    file: FileMetadata,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let (handle, disk_size) = state
        .storage
        .open(&file.file_path)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found on disk"))?;

    let content_length = if disk_size == file.file_size as u64 {
        file.file_size as u64
    } else {
        tracing::warn!(
            file_id = file.id,
            recorded = file.file_size,
            on_disk = disk_size,
            "Stored file size differs from metadata"
        );
        disk_size
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &file.original_name),
        )
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from_stream(ReaderStream::new(handle)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files/:id/download - Download a file as an attachment.
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID"),
        TokenQuery
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found, or file not found on disk")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
    Query(_token): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    let file = state.files().get(user.id, file_id).await?;
    stream_file(&state, file, Disposition::Attachment).await
}

/// GET /api/files/:id/preview - Stream a file inline.
#[utoipa::path(
    get,
    path = "/api/files/{id}/preview",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID"),
        TokenQuery
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found, or file not found on disk")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
    Query(_token): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    let file = state.files().get(user.id, file_id).await?;
    stream_file(&state, file, Disposition::Inline).await
}

/// PUT /api/files/:id/rename - Change a file's display name.
#[utoipa::path(
    put,
    path = "/api/files/{id}/rename",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "File renamed", body = FileResponse),
        (status = 404, description = "File not found"),
        (status = 422, description = "Invalid file name")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.files().rename(user.id, file_id, &req.name).await?;

    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// PUT /api/files/:id/move - Move a file to a folder or to the root.
#[utoipa::path(
    put,
    path = "/api/files/{id}/move",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    request_body = MoveFileRequest,
    responses(
        (status = 200, description = "File moved", body = FileResponse),
        (status = 404, description = "File or target folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MoveFileRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state
        .files()
        .move_file(user.id, file_id, req.folder_id)
        .await?;

    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// DELETE /api/files/:id - Delete a file and release its quota.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.files().delete(user.id, file_id).await?;

    Ok(Json(ApiResponse::new(MessageResponse::new(
        "File deleted successfully",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header(Disposition::Attachment, "report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition_header(Disposition::Inline, "photo.jpg"),
            "inline; filename=\"photo.jpg\""
        );
    }

    #[test]
    fn test_content_disposition_strips_control_chars() {
        let header = content_disposition_header(Disposition::Attachment, "evil\r\nX-Injected: 1.txt");
        assert!(!header.contains('\r'));
        assert!(!header.contains('\n'));
        assert_eq!(header, "attachment; filename=\"evilX-Injected: 1.txt\"");
    }

    #[test]
    fn test_content_disposition_quotes() {
        let header = content_disposition_header(Disposition::Attachment, "a\"b.txt");
        assert_eq!(
            header,
            "attachment; filename=\"a_b.txt\"; filename*=UTF-8''a%22b.txt"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let header = content_disposition_header(Disposition::Inline, "日本.txt");
        assert_eq!(
            header,
            "inline; filename=\"__.txt\"; filename*=UTF-8''%E6%97%A5%E6%9C%AC.txt"
        );
    }
}
