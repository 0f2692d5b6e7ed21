//! OpenAPI document for the REST API.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::dto::{
    AuthResponse, CreateFolderRequest, FileResponse, FolderDeleteResponse, FolderResponse,
    FolderTreeNode, HealthResponse, LoginRequest, MessageResponse, MoveFileRequest,
    MoveFolderRequest, RegisterRequest, RenameRequest, UploadResponse, UserResponse,
};
use super::handlers;

/// Registers the bearer token scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Successful responses are wrapped as `{"data": ...}`; errors as
/// `{"error": {"code", "message"}}`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Drivebox API"),
    paths(
        handlers::register,
        handlers::login,
        handlers::profile,
        handlers::create_folder,
        handlers::list_folders,
        handlers::folder_tree,
        handlers::rename_folder,
        handlers::move_folder,
        handlers::delete_folder,
        handlers::upload_files,
        handlers::list_files,
        handlers::download_file,
        handlers::preview_file,
        handlers::rename_file,
        handlers::move_file,
        handlers::delete_file,
        handlers::health_check,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        UserResponse,
        CreateFolderRequest,
        RenameRequest,
        MoveFolderRequest,
        MoveFileRequest,
        FolderResponse,
        FolderTreeNode,
        FolderDeleteResponse,
        FileResponse,
        UploadResponse,
        MessageResponse,
        HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "folders", description = "Folder hierarchy"),
        (name = "files", description = "Upload, download and file management"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/auth/login"));
        assert!(paths.contains_key("/api/folders/{id}/move"));
        assert!(paths.contains_key("/api/files/upload"));
        assert!(paths.contains_key("/api/health"));
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("FolderTreeNode"));
    }
}
