//! services/api/src/web/middleware.rs
//!
//! Resolves which user's library a request addresses.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::warn;

pub const USER_ID_HEADER: &str = "x-user-id";
const MAX_USER_ID_LEN: usize = 128;

/// The user a request acts for. `None` means the shared anonymous library.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserScope(pub Option<String>);

impl UserScope {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Middleware that reads the optional `x-user-id` header into a `UserScope`
/// request extension.
///
/// The id ends up in a storage key, so anything other than ASCII letters,
/// digits, `-` and `_` is rejected with 400.
pub async fn user_scope(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let scope = match req.headers().get(USER_ID_HEADER) {
        None => UserScope(None),
        Some(value) => {
            let id = value
                .to_str()
                .map(str::trim)
                .map_err(|_| StatusCode::BAD_REQUEST)?;
            if !is_valid_user_id(id) {
                warn!("Rejected malformed {} header", USER_ID_HEADER);
                return Err(StatusCode::BAD_REQUEST);
            }
            UserScope(Some(id.to_string()))
        }
    };

    req.extensions_mut().insert(scope);
    Ok(next.run(req).await)
}

fn is_valid_user_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_USER_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
