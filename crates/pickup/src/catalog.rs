//! Allow-lists for cities and product types.
//!
//! Which cities host pickup points and which product types can be received is
//! configuration, not structure: the lists live in a [`Catalog`] and values are
//! only ever constructed by validating raw input against it.

use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, DomainResult, ValueObject};

pub const DEFAULT_CITIES: [&str; 3] = ["Москва", "Санкт-Петербург", "Казань"];
pub const DEFAULT_PRODUCT_TYPES: [&str; 3] = ["электроника", "одежда", "обувь"];

/// City a pickup point is registered in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct City(String);

impl City {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for City {}

impl core::fmt::Display for City {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type of a received product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductType(String);

impl ProductType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for ProductType {}

impl core::fmt::Display for ProductType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allowed cities and product types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    cities: Vec<String>,
    product_types: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|s| s.to_string()).collect(),
            product_types: DEFAULT_PRODUCT_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Catalog {
    /// Build a catalog from explicit lists. Blank entries are dropped.
    pub fn new<C, T>(cities: C, product_types: T) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            cities: normalize(cities),
            product_types: normalize(product_types),
        }
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn product_types(&self) -> &[String] {
        &self.product_types
    }

    /// Validate a raw city name.
    pub fn city(&self, raw: &str) -> DomainResult<City> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(DomainError::validation("city cannot be empty"));
        }
        if !self.cities.iter().any(|c| c == value) {
            return Err(DomainError::validation(format!(
                "city '{value}' is not allowed (allowed: {})",
                self.cities.join(", ")
            )));
        }
        Ok(City(value.to_string()))
    }

    /// Validate a raw product type.
    pub fn product_type(&self, raw: &str) -> DomainResult<ProductType> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(DomainError::validation("product type cannot be empty"));
        }
        if !self.product_types.iter().any(|t| t == value) {
            return Err(DomainError::validation(format!(
                "product type '{value}' is not allowed (allowed: {})",
                self.product_types.join(", ")
            )));
        }
        Ok(ProductType(value.to_string()))
    }
}

fn normalize<I>(values: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_accepts_known_values() {
        let catalog = Catalog::default();
        assert_eq!(catalog.city("Москва").unwrap().as_str(), "Москва");
        assert_eq!(
            catalog.product_type(" обувь ").unwrap().as_str(),
            "обувь"
        );
    }

    #[test]
    fn rejects_unknown_city() {
        let err = Catalog::default().city("Новосибирск").unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("Новосибирск")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_product_type() {
        let err = Catalog::default().product_type("   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn custom_catalog_drops_blank_entries() {
        let catalog = Catalog::new(["Казань", " "], ["книги", ""]);
        assert_eq!(catalog.cities(), ["Казань".to_string()]);
        assert_eq!(catalog.product_types(), ["книги".to_string()]);
        assert!(catalog.product_type("электроника").is_err());
        assert!(catalog.product_type("книги").is_ok());
    }
}
