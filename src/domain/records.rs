//! Store records the aggregator reads from
//!
//! Mirrors the persisted retail model: stores, categories, products, sales,
//! shelf allocations and traffic zones. Every section of a [`Dataset`]
//! defaults to empty so partial files load.

use crate::domain::types::{CategoryId, StoreId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub category_id: CategoryId,
    pub store_id: StoreId,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub shelf_space_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(default)]
    pub id: Option<i64>,
    pub product_id: i64,
    pub store_id: StoreId,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub date: NaiveDateTime,
    #[serde(default)]
    pub units_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfSpace {
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub current_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficZone {
    pub store_id: StoreId,
    pub zone_name: String,
    pub x: i32,
    pub y: i32,
    pub traffic_score: f64,
}

/// All records available to the aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub shelf_space: Vec<ShelfSpace>,
    #[serde(default)]
    pub traffic_zones: Vec<TrafficZone>,
}

impl Dataset {
    pub fn store(&self, id: StoreId) -> Option<&Store> {
        self.stores.iter().find(|s| s.id == id)
    }

    /// Record counts per section, for logging
    pub fn counts(&self) -> DatasetCounts {
        DatasetCounts {
            stores: self.stores.len(),
            categories: self.categories.len(),
            products: self.products.len(),
            sales: self.sales.len(),
            shelf_space: self.shelf_space.len(),
            traffic_zones: self.traffic_zones.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetCounts {
    pub stores: usize,
    pub categories: usize,
    pub products: usize,
    pub sales: usize,
    pub shelf_space: usize,
    pub traffic_zones: usize,
}

/// Sale dates accept the same forms as query parameters
fn deserialize_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    crate::domain::types::parse_datetime(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_dataset_defaults_to_empty() {
        let dataset: Dataset = serde_json::from_str(r#"{"categories":[{"id":1,"name":"Dairy"}]}"#).unwrap();
        assert_eq!(dataset.categories.len(), 1);
        assert!(dataset.sales.is_empty());
        assert!(dataset.traffic_zones.is_empty());
    }

    #[test]
    fn test_sale_date_forms() {
        let sale: Sale = serde_json::from_str(
            r#"{"product_id":1,"store_id":2,"date":"2024-05-01","revenue":10.5}"#,
        )
        .unwrap();
        assert_eq!(sale.date.to_string(), "2024-05-01 00:00:00");
        assert_eq!(sale.units_sold, 0);

        let bad = serde_json::from_str::<Sale>(
            r#"{"product_id":1,"store_id":2,"date":"May 1st","revenue":10.5}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_store_lookup() {
        let dataset = Dataset {
            stores: vec![Store { id: StoreId(7), name: "Downtown".to_string(), location: None }],
            ..Default::default()
        };
        assert_eq!(dataset.store(StoreId(7)).map(|s| s.name.as_str()), Some("Downtown"));
        assert!(dataset.store(StoreId(8)).is_none());
    }
}
