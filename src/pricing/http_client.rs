use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::{PricingError, PricingLookup};

/// Pricing lookup backed by the catalog service's product endpoint.
pub struct HttpPricingClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProductPrice {
    #[serde(alias = "Price")]
    price: f64,
}

impl HttpPricingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PricingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PricingError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn product_url(&self, product_id: Uuid) -> String {
        format!("{}/api/v1/products/{}", self.base_url, product_id)
    }
}

#[async_trait]
impl PricingLookup for HttpPricingClient {
    async fn get_unit_price(&self, product_id: Uuid) -> Result<f64, PricingError> {
        let url = self.product_url(product_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PricingError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(PricingError::NotFound(product_id)),
            status if !status.is_success() => {
                return Err(PricingError::Unavailable(format!(
                    "catalog returned {} for product {}",
                    status, product_id
                )));
            }
            _ => {}
        }

        let body: ProductPrice = response
            .json()
            .await
            .map_err(|e| PricingError::Unavailable(format!("invalid catalog response: {}", e)))?;

        tracing::debug!(
            product_id = %product_id,
            price = body.price,
            "Resolved unit price from catalog"
        );

        Ok(body.price)
    }
}
