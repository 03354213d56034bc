//! Dataset loading - reads store records from a JSON file

use crate::domain::records::Dataset;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

/// Load and parse a dataset file
pub fn load_dataset<P: AsRef<Path>>(path: P) -> anyhow::Result<Dataset> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file {}", path.display()))?;

    let dataset: Dataset = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset file {}", path.display()))?;

    let counts = dataset.counts();
    info!(
        file = %path.display(),
        stores = counts.stores,
        categories = counts.categories,
        products = counts.products,
        sales = counts.sales,
        shelf_space = counts.shelf_space,
        traffic_zones = counts.traffic_zones,
        "dataset_loaded"
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_dataset() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "categories": [{"id": 1, "name": "Dairy"}],
                "products": [{"id": 10, "sku": "D-1", "name": "Milk", "category_id": 1, "store_id": 1}],
                "sales": [{"product_id": 10, "store_id": 1, "date": "2024-02-01T09:30:00", "units_sold": 2, "revenue": 3.8}],
                "traffic_zones": [{"store_id": 1, "zone_name": "Entrance", "x": 0, "y": 1, "traffic_score": 0.8}]
            }"#,
        )
        .unwrap();
        file.flush().unwrap();

        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.products[0].sku, "D-1");
        assert_eq!(dataset.sales[0].revenue, 3.8);
        assert_eq!(dataset.traffic_zones[0].zone_name, "Entrance");
        assert!(dataset.shelf_space.is_empty());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_dataset("/nonexistent/shelfiq/dataset.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/shelfiq/dataset.json"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"sales\": [").unwrap();
        file.flush().unwrap();

        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse dataset file"));
    }
}
