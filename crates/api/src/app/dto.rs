use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_pickup::{PickupPoint, Product, Reception};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePvzRequest {
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenReceptionRequest {
    #[serde(rename = "pvzId")]
    pub pvz_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(rename = "pvzId")]
    pub pvz_id: String,
}

/// Listing query. Values stay raw strings; malformed ones fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPvzQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvzDto {
    pub id: String,
    pub registration_date: DateTime<Utc>,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionDto {
    pub id: String,
    pub date_time: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub pvz_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub product_type: String,
    pub reception_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionWithProducts {
    pub reception: ReceptionDto,
    pub products: Vec<ProductDto>,
}

/// A point with its full reception log, as returned by listing and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvzWithReceptions {
    pub pvz: PvzDto,
    pub receptions: Vec<ReceptionWithProducts>,
}

impl From<&PickupPoint> for PvzDto {
    fn from(point: &PickupPoint) -> Self {
        Self {
            id: point.id_typed().to_string(),
            registration_date: point.registered_at(),
            city: point.city().to_string(),
        }
    }
}

impl From<&Reception> for ReceptionDto {
    fn from(reception: &Reception) -> Self {
        Self {
            id: reception.id_typed().to_string(),
            date_time: reception.opened_at(),
            closed_at: reception.closed_at(),
            pvz_id: reception.pickup_point_id().to_string(),
            status: reception.status().as_str().to_string(),
        }
    }
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id_typed().to_string(),
            date_time: product.added_at(),
            product_type: product.product_type().to_string(),
            reception_id: product.reception_id().to_string(),
        }
    }
}

impl From<&PickupPoint> for PvzWithReceptions {
    fn from(point: &PickupPoint) -> Self {
        Self {
            pvz: point.into(),
            receptions: point
                .receptions()
                .iter()
                .map(|r| ReceptionWithProducts {
                    reception: r.into(),
                    products: r.products().iter().map(ProductDto::from).collect(),
                })
                .collect(),
        }
    }
}
