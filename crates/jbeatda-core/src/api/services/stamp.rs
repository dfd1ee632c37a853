use tracing::debug;

use super::StampService;
use crate::api::{ApiClient, ApiError};
use crate::models::Stamp;

const MY_STAMPS_PATH: &str = "stamps/user/me";

/// `StampService` over the shared HTTP client.
#[derive(Clone)]
pub struct HttpStampService {
    client: ApiClient,
}

impl HttpStampService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl StampService for HttpStampService {
    async fn my_stamps(&self) -> Result<Vec<Stamp>, ApiError> {
        let stamps: Vec<Stamp> = self.client.get(MY_STAMPS_PATH).await?;
        debug!(count = stamps.len(), "Fetched stamps");
        Ok(stamps)
    }

    async fn stamp_for_menu(&self, menu_id: i64) -> Result<Stamp, ApiError> {
        let path = format!("{}/menu/{}", MY_STAMPS_PATH, menu_id);
        self.client.get(&path).await
    }

    async fn delete_stamp(&self, stamp_id: i64) -> Result<(), ApiError> {
        let path = format!("stamps/{}", stamp_id);
        self.client.delete(&path).await?;
        debug!(stamp_id, "Stamp deleted");
        Ok(())
    }
}
