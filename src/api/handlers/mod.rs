mod admin;
mod auth;
mod files;
mod images;

use crate::api::response::ApiError;
use crate::auth::AuthError;

pub use admin::health;
pub use auth::{current_user, login, logout, register};
pub use files::serve_file;
pub use images::{list_images, upload_multiple, upload_single, MAX_BATCH_FILES};

/// Map an AuthError to an ApiError
fn auth_error(e: AuthError) -> ApiError {
    match e {
        AuthError::MissingCredentials => {
            ApiError::bad_request("Username and password are required")
        }
        AuthError::InvalidCredentials => ApiError::unauthorized("Invalid username or password"),
        AuthError::UsernameTaken => ApiError::conflict("Username already exists"),
        AuthError::Hashing | AuthError::Store(_) => ApiError::internal(e.to_string()),
    }
}
