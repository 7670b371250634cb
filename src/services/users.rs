use tracing::info;
use validator::Validate;

use floortrack_common::{User, UserDraft};

use crate::client::ApiClient;
use crate::errors::ApiError;

pub async fn list_users(api: &ApiClient) -> Result<Vec<User>, ApiError> {
    api.get("/users/").await
}

pub async fn register_user(api: &ApiClient, draft: &UserDraft) -> Result<User, ApiError> {
    draft.validate()?;
    let user: User = api.post("/users/register", draft).await?;
    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// The signed-in user.
pub async fn current_user(api: &ApiClient) -> Result<User, ApiError> {
    api.get("/users/me").await
}
