use tracing::info;
use validator::Validate;

use floortrack_common::{Customer, CustomerDraft};

use crate::client::{ApiClient, validate_all};
use crate::errors::ApiError;

pub async fn list_customers(api: &ApiClient) -> Result<Vec<Customer>, ApiError> {
    let path = "/customers/";
    let customers: Vec<Customer> = api.get(path).await?;
    validate_all(path, &customers)?;
    Ok(customers)
}

pub async fn get_customer(api: &ApiClient, customer_id: i64) -> Result<Customer, ApiError> {
    api.get_validated(&format!("/customers/{}", customer_id))
        .await
}

/// Validated locally first; field errors come back as `ApiError::Validation`.
pub async fn create_customer(api: &ApiClient, draft: &CustomerDraft) -> Result<Customer, ApiError> {
    draft.validate()?;
    let created: Customer = api.post("/customers/", draft).await?;
    info!(customer_id = created.id, "Customer created");
    Ok(created)
}

pub async fn update_customer(
    api: &ApiClient,
    customer_id: i64,
    draft: &CustomerDraft,
) -> Result<Customer, ApiError> {
    draft.validate()?;
    let updated: Customer = api
        .put(&format!("/customers/{}", customer_id), draft)
        .await?;
    info!(customer_id, "Customer updated");
    Ok(updated)
}

pub async fn delete_customer(api: &ApiClient, customer_id: i64) -> Result<(), ApiError> {
    api.delete(&format!("/customers/{}", customer_id)).await?;
    info!(customer_id, "Customer deleted");
    Ok(())
}
