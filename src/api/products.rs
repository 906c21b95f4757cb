use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::EnrichedRecord;
use crate::error::AppError;
use crate::projection::{export_csv, ProductFilter, EXPORT_FILE_NAME};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    pub count: usize,
    pub products: Vec<ProductDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub item_id: String,
    pub title: String,
    pub image: String,
    pub product_code: String,
    pub selling_price: String,
    pub platform_fees: String,
    pub acquisition_cost: String,
    pub net_profit: String,
    pub roi: String,
    pub status: String,
}

impl From<&EnrichedRecord> for ProductDto {
    fn from(r: &EnrichedRecord) -> Self {
        ProductDto {
            item_id: r.record.item_id.as_str().to_string(),
            title: r.record.title.clone(),
            image: r.record.image.clone(),
            product_code: r.record.product_code.as_str().to_string(),
            selling_price: r.record.selling_price.to_canonical_string(),
            platform_fees: r.record.platform_fees.to_canonical_string(),
            acquisition_cost: r.acquisition_cost.to_canonical_string(),
            net_profit: r.net_profit.to_fixed(2),
            roi: r.roi.to_fixed(2),
            status: r.status.to_string(),
        }
    }
}

pub async fn get_products(
    Query(filter): Query<ProductFilter>,
    State(state): State<AppState>,
) -> Json<ProductsResponse> {
    let records = state.view.records();
    let products: Vec<ProductDto> = filter
        .apply(&records)
        .into_iter()
        .map(ProductDto::from)
        .collect();

    Json(ProductsResponse {
        count: products.len(),
        products,
    })
}

/// CSV download of the currently filtered products; 204 when there are none.
pub async fn export_products(
    Query(filter): Query<ProductFilter>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let records = state.view.records();
    let Some(csv) = export_csv(filter.apply(&records))? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
