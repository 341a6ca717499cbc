//! Stock service
//!
//! Stock listing per location, manual movements (in, adjust, remove) and the
//! local guard run before a consumption is sent.

use super::listing::{matches_joined, Listable, SortValue};
use crate::api::{Location, Repository, StockAdjust, StockIn, StockRow};
use crate::config::REMOVE_STOCK_NOTE;
use crate::error::{AppError, Result};
use crate::text::{non_blank, sum_number};
use std::fmt;
use std::str::FromStr;

/// Sortable stock columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSortKey {
    Material,
    Category,
    Location,
    Quantity,
    UnitPrice,
    TotalValue,
}

impl FromStr for StockSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "material" | "material_name" | "name" => Ok(StockSortKey::Material),
            "category" => Ok(StockSortKey::Category),
            "location" | "location_name" => Ok(StockSortKey::Location),
            "qty" | "quantity" => Ok(StockSortKey::Quantity),
            "unit_price" | "price" => Ok(StockSortKey::UnitPrice),
            "total_value" | "value" => Ok(StockSortKey::TotalValue),
            other => Err(format!("Unknown stock column '{}'", other)),
        }
    }
}

impl Listable for StockRow {
    type Key = StockSortKey;

    fn haystack(&self) -> Vec<String> {
        [
            Some(self.material_name.as_str()),
            self.category.as_deref(),
            self.location_name.as_deref(),
            self.location_code.as_deref(),
            self.sku.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
    }

    fn sort_value(&self, key: StockSortKey) -> SortValue {
        match key {
            StockSortKey::Material => SortValue::text(&self.material_name),
            StockSortKey::Category => SortValue::optional_text(self.category.as_deref()),
            StockSortKey::Location => SortValue::text(self.location_label()),
            StockSortKey::Quantity => SortValue::Number(self.qty),
            StockSortKey::UnitPrice => SortValue::Number(self.unit_price),
            StockSortKey::TotalValue => SortValue::Number(self.total_value),
        }
    }

    fn display_name(&self) -> String {
        self.material_name.clone()
    }

    fn matches_query(&self, normalized_query: &str) -> bool {
        matches_joined(self, normalized_query)
    }
}

/// Which locations a stock view shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFilter {
    All,
    Code(String),
}

impl LocationFilter {
    pub fn accepts(&self, row: &StockRow) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Code(code) => row.is_at(code),
        }
    }
}

impl FromStr for LocationFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let code = s.trim();
        if code.is_empty() {
            Err("Location cannot be empty".to_string())
        } else if code.eq_ignore_ascii_case("ALL") {
            Ok(LocationFilter::All)
        } else {
            Ok(LocationFilter::Code(code.to_uppercase()))
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationFilter::All => f.write_str("ALL"),
            LocationFilter::Code(code) => f.write_str(code),
        }
    }
}

/// Sum of quantities of `material_id` at `location_code`.
/// Duplicate rows are added up.
pub fn available_quantity(rows: &[StockRow], material_id: i64, location_code: &str) -> f64 {
    rows.iter()
        .filter(|r| r.material_id == material_id && r.is_at(location_code))
        .map(StockRow::quantity)
        .sum()
}

/// Id of the location with `code`, from the locations list or else from
/// the stock rows themselves
pub fn resolve_location_id(locations: &[Location], rows: &[StockRow], code: &str) -> Option<i64> {
    let code = code.trim();
    locations
        .iter()
        .find(|l| l.code.trim().eq_ignore_ascii_case(code))
        .map(|l| l.id)
        .or_else(|| rows.iter().filter(|r| r.is_at(code)).find_map(|r| r.location_id))
}

/// A consumption that passed the local checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeCheck {
    pub location_id: i64,
    pub available: f64,
}

/// Reject a consumption before it reaches the backend
pub fn check_consumption(
    rows: &[StockRow],
    locations: &[Location],
    material_id: i64,
    location_code: &str,
    qty: f64,
) -> Result<ConsumeCheck> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(AppError::Validation(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let available = available_quantity(rows, material_id, location_code);
    if available <= 0.0 {
        return Err(AppError::Validation(format!(
            "No stock of this material at {}",
            location_code
        )));
    }

    if qty > available {
        return Err(AppError::Validation(format!(
            "Only {} available at {}",
            available, location_code
        )));
    }

    let location_id = resolve_location_id(locations, rows, location_code).ok_or_else(|| {
        AppError::Validation(format!("Unknown location '{}'", location_code))
    })?;

    Ok(ConsumeCheck {
        location_id,
        available,
    })
}

/// Sum of row values; malformed numbers count as zero
pub fn total_value<'a>(rows: impl IntoIterator<Item = &'a StockRow>) -> f64 {
    rows.into_iter().map(StockRow::value).sum()
}

/// Service for stock views and movements
#[derive(Clone)]
pub struct StockService {
    repo: Repository,
}

impl StockService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Stock rows at the chosen location(s)
    pub async fn list(&self, filter: &LocationFilter) -> Result<Vec<StockRow>> {
        let rows = self.repo.list_stock().await?;
        Ok(rows.into_iter().filter(|r| filter.accepts(r)).collect())
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.repo.list_locations().await
    }

    /// Add quantity at a location; a zero price is not sent
    pub async fn stock_in(
        &self,
        material_id: i64,
        location_code: &str,
        qty: f64,
        price: Option<f64>,
        note: Option<&str>,
    ) -> Result<()> {
        if !qty.is_finite() || qty <= 0.0 {
            return Err(AppError::Validation(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        if let Some(price) = price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::Validation("Invalid price".to_string()));
            }
        }
        let location_code = location_code.trim().to_uppercase();
        if location_code.is_empty() {
            return Err(AppError::Validation("Location is required".to_string()));
        }

        tracing::info!(
            "Stock in: material {} +{} at {}",
            material_id,
            qty,
            location_code
        );

        self.repo
            .stock_in(&StockIn {
                material_id,
                location_code,
                qty,
                price: price.filter(|p| *p > 0.0),
                note: note.and_then(non_blank),
            })
            .await
    }

    /// Set the absolute quantity of a stock row
    pub async fn adjust(
        &self,
        material_id: i64,
        location_id: i64,
        qty: f64,
        note: Option<&str>,
    ) -> Result<()> {
        if !qty.is_finite() || qty < 0.0 {
            return Err(AppError::Validation(
                "Quantity must be 0 or more".to_string(),
            ));
        }

        tracing::info!(
            "Stock adjust: material {} at location {} set to {}",
            material_id,
            location_id,
            qty
        );

        self.repo
            .stock_adjust(&StockAdjust {
                material_id,
                location_id,
                qty,
                note: note.and_then(non_blank),
            })
            .await
    }

    /// Empty a stock row
    pub async fn remove(&self, material_id: i64, location_id: i64) -> Result<()> {
        self.adjust(material_id, location_id, 0.0, Some(REMOVE_STOCK_NOTE))
            .await
    }
}

/// Quantity column total, zero for malformed values
pub fn total_quantity<'a>(rows: impl IntoIterator<Item = &'a StockRow>) -> f64 {
    rows.into_iter().map(|r| sum_number(r.qty)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::{filter_sort, SortDirection};
    use serde_json::json;

    fn rows() -> Vec<StockRow> {
        serde_json::from_value(json!([
            {"material_id": 1, "location_id": 10, "location_code": "ZOR", "material_name": "Cot", "qty": 5},
            {"material_id": 1, "location_id": 10, "location_code": "zor", "material_name": "Cot", "qty": "3"},
            {"material_id": 1, "location_id": 11, "location_code": "IRS", "material_name": "Cot", "qty": 9},
            {"material_id": 2, "location_id": 10, "location_code": "ZOR", "material_name": "Freon", "qty": 0}
        ]))
        .unwrap()
    }

    fn locations() -> Vec<Location> {
        serde_json::from_value(json!([
            {"id": 10, "code": "ZOR", "name": "Zorilor"},
            {"id": 11, "code": "IRS", "name": "Iris"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_available_sums_duplicates() {
        assert_eq!(available_quantity(&rows(), 1, "ZOR"), 8.0);
        assert_eq!(available_quantity(&rows(), 1, "irs"), 9.0);
        assert_eq!(available_quantity(&rows(), 3, "ZOR"), 0.0);
    }

    #[test]
    fn test_consumption_rejections_in_order() {
        let rows = rows();
        let locs = locations();

        let err = check_consumption(&rows, &locs, 1, "ZOR", 0.0).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));

        let err = check_consumption(&rows, &locs, 2, "ZOR", 1.0).unwrap_err();
        assert!(err.to_string().contains("No stock"));

        let err = check_consumption(&rows, &locs, 1, "ZOR", 8.5).unwrap_err();
        assert!(err.to_string().contains("Only 8 available"));

        let ok = check_consumption(&rows, &locs, 1, "ZOR", 8.0).unwrap();
        assert_eq!(ok.location_id, 10);
        assert_eq!(ok.available, 8.0);
    }

    #[test]
    fn test_unresolved_location_is_rejected() {
        let rows: Vec<StockRow> = serde_json::from_value(json!([
            {"material_id": 1, "location_code": "DEP", "qty": 4}
        ]))
        .unwrap();
        let err = check_consumption(&rows, &locations(), 1, "DEP", 1.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_location_falls_back_to_stock_rows() {
        assert_eq!(resolve_location_id(&[], &rows(), "irs"), Some(11));
    }

    #[test]
    fn test_location_filter() {
        let all: LocationFilter = "all".parse().unwrap();
        let zor: LocationFilter = "zor".parse().unwrap();
        let rows = rows();
        assert_eq!(rows.iter().filter(|r| all.accepts(r)).count(), 4);
        assert_eq!(rows.iter().filter(|r| zor.accepts(r)).count(), 3);
        assert_eq!(zor.to_string(), "ZOR");
    }

    #[test]
    fn test_filter_spans_columns() {
        let rows = rows();
        let found = filter_sort(&rows, "Cot  zor", StockSortKey::Quantity, SortDirection::Asc);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.material_name == "Cot" && r.location_code.as_deref() != Some("IRS")));

        assert!(filter_sort(&rows, "freon irs", StockSortKey::Material, SortDirection::Asc).is_empty());
    }

    #[test]
    fn test_sort_by_quantity_and_totals() {
        let rows = rows();
        let sorted = filter_sort(&rows, "", StockSortKey::Quantity, SortDirection::Desc);
        assert_eq!(sorted[0].quantity(), 9.0);
        assert_eq!(sorted[3].quantity(), 0.0);
        assert_eq!(total_quantity(sorted.iter().copied()), 17.0);
        assert_eq!(total_value(sorted.iter().copied()), 0.0);
    }
}
