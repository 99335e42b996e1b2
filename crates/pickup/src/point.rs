//! Pickup point aggregate and its nested reception/product document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{
    AggregateRoot, DomainError, DomainResult, Entity, PickupPointId, ProductId, ReceptionId,
    find_by_id, first_duplicate_id,
};

use crate::catalog::{City, ProductType};

/// Derived state of a reception.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptionStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "close")]
    Closed,
}

impl ReceptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceptionStatus::InProgress => "in_progress",
            ReceptionStatus::Closed => "close",
        }
    }
}

/// One scanned product. Owned by exactly one reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    reception_id: ReceptionId,
    #[serde(rename = "type")]
    product_type: ProductType,
    added_at: DateTime<Utc>,
}

impl Product {
    pub(crate) fn new(
        id: ProductId,
        reception_id: ReceptionId,
        product_type: ProductType,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            reception_id,
            product_type,
            added_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn reception_id(&self) -> ReceptionId {
        self.reception_id
    }

    pub fn product_type(&self) -> &ProductType {
        &self.product_type
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One goods-intake session. Open until `closed_at` is set, then frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reception {
    id: ReceptionId,
    pickup_point_id: PickupPointId,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    products: Vec<Product>,
}

impl Reception {
    pub(crate) fn open(
        id: ReceptionId,
        pickup_point_id: PickupPointId,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            pickup_point_id,
            opened_at,
            closed_at: None,
            products: Vec::new(),
        }
    }

    pub fn id_typed(&self) -> ReceptionId {
        self.id
    }

    pub fn pickup_point_id(&self) -> PickupPointId {
        self.pickup_point_id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn status(&self) -> ReceptionStatus {
        if self.is_open() {
            ReceptionStatus::InProgress
        } else {
            ReceptionStatus::Closed
        }
    }

    /// Products in insertion order; the tail is the most recent one.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn last_product(&self) -> Option<&Product> {
        self.products.last()
    }

    /// Whether this reception's `[opened_at, closed_at]` interval overlaps
    /// `[start, end]`. An open reception extends indefinitely.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.opened_at <= end && self.closed_at.is_none_or(|closed| closed >= start)
    }

    pub(crate) fn push_product(&mut self, product: Product) {
        self.products.push(product);
    }

    pub(crate) fn pop_product(&mut self) -> Option<Product> {
        self.products.pop()
    }

    pub(crate) fn close(&mut self, closed_at: DateTime<Utc>) {
        self.closed_at = Some(closed_at);
    }
}

impl Entity for Reception {
    type Id = ReceptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: PickupPoint.
///
/// Serializes as a single nested document (point fields + ordered reception
/// array, each with its ordered product array). Deserialization goes through
/// [`PickupPointDocument`] and rejects documents that break the structural
/// invariants, most importantly "at most one open reception".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PickupPointDocument", into = "PickupPointDocument")]
pub struct PickupPoint {
    id: PickupPointId,
    city: City,
    registered_at: DateTime<Utc>,
    receptions: Vec<Reception>,
    version: u64,
}

/// Raw, unvalidated storage shape of a [`PickupPoint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPointDocument {
    pub id: PickupPointId,
    pub city: City,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub receptions: Vec<Reception>,
}

impl PickupPoint {
    /// A freshly registered point with an empty reception log.
    pub fn register(id: PickupPointId, city: City, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            city,
            registered_at,
            receptions: Vec::new(),
            version: 0,
        }
    }

    /// Decode a stored JSON document, surfacing any defect as `CorruptAggregate`.
    pub fn from_json(value: serde_json::Value) -> DomainResult<Self> {
        let document: PickupPointDocument = serde_json::from_value(value)
            .map_err(|e| DomainError::corrupt(format!("malformed document: {e}")))?;
        Self::try_from(document)
    }

    pub fn to_json(&self) -> DomainResult<serde_json::Value> {
        serde_json::to_value(self.to_document())
            .map_err(|e| DomainError::corrupt(format!("document encoding failed: {e}")))
    }

    pub fn id_typed(&self) -> PickupPointId {
        self.id
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Reception log in creation order.
    pub fn receptions(&self) -> &[Reception] {
        &self.receptions
    }

    pub fn reception(&self, id: ReceptionId) -> Option<&Reception> {
        find_by_id(&self.receptions, &id)
    }

    /// The currently open reception, if any. Only the tail can be open.
    pub fn open_reception(&self) -> Option<&Reception> {
        self.receptions.last().filter(|r| r.is_open())
    }

    pub(crate) fn open_reception_mut(&mut self) -> Option<&mut Reception> {
        self.receptions.last_mut().filter(|r| r.is_open())
    }

    pub(crate) fn push_reception(&mut self, reception: Reception) {
        self.receptions.push(reception);
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Whether any reception overlaps `[start, end]`.
    pub fn has_reception_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.receptions.iter().any(|r| r.overlaps(start, end))
    }

    /// Storage shape of this aggregate.
    pub fn to_document(&self) -> PickupPointDocument {
        PickupPointDocument::from(self.clone())
    }
}

impl AggregateRoot for PickupPoint {
    type Id = PickupPointId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl From<PickupPoint> for PickupPointDocument {
    fn from(point: PickupPoint) -> Self {
        Self {
            id: point.id,
            city: point.city,
            registered_at: point.registered_at,
            version: point.version,
            receptions: point.receptions,
        }
    }
}

impl TryFrom<PickupPointDocument> for PickupPoint {
    type Error = DomainError;

    fn try_from(doc: PickupPointDocument) -> Result<Self, Self::Error> {
        let open_count = doc.receptions.iter().filter(|r| r.is_open()).count();
        if open_count > 1 {
            return Err(DomainError::corrupt(format!(
                "pickup point {} has {open_count} open receptions",
                doc.id
            )));
        }
        if let Some(idx) = doc.receptions.iter().position(|r| r.is_open()) {
            if idx + 1 != doc.receptions.len() {
                return Err(DomainError::corrupt(format!(
                    "pickup point {} has an open reception before the tail (index {idx})",
                    doc.id
                )));
            }
        }

        if let Some(id) = first_duplicate_id(&doc.receptions) {
            return Err(DomainError::corrupt(format!(
                "pickup point {} lists reception {id} twice",
                doc.id
            )));
        }

        for reception in &doc.receptions {
            if let Some(id) = first_duplicate_id(&reception.products) {
                return Err(DomainError::corrupt(format!(
                    "reception {} lists product {id} twice",
                    reception.id
                )));
            }
            if reception.pickup_point_id != doc.id {
                return Err(DomainError::corrupt(format!(
                    "reception {} belongs to pickup point {}, found inside {}",
                    reception.id, reception.pickup_point_id, doc.id
                )));
            }
            if let Some(product) = reception
                .products
                .iter()
                .find(|p| p.reception_id != reception.id)
            {
                return Err(DomainError::corrupt(format!(
                    "product {} belongs to reception {}, found inside {}",
                    product.id, product.reception_id, reception.id
                )));
            }
        }

        Ok(Self {
            id: doc.id,
            city: doc.city,
            registered_at: doc.registered_at,
            receptions: doc.receptions,
            version: doc.version,
        })
    }
}
