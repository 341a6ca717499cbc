//! Materials service
//!
//! Catalog CRUD, soft deactivation, the material picker and the bulk
//! stock import.

use super::autocomplete::LatestLookup;
use super::listing::{Listable, SortValue};
use crate::api::{ImportRow, ImportSummary, Material, MaterialPayload, Repository, StockImport};
use crate::config::MATERIAL_SUGGESTION_LIMIT;
use crate::error::{AppError, Result};
use crate::text::{non_blank, parse_number};
use std::str::FromStr;

/// Raw material form input
#[derive(Debug, Clone, Default)]
pub struct MaterialForm {
    pub name: String,
    pub unit: String,
    pub sku: String,
    /// As typed; `,` or `.` decimals
    pub price: String,
    pub category: String,
    pub active: Option<bool>,
}

impl MaterialForm {
    pub fn into_payload(self) -> Result<MaterialPayload> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Material name is required".to_string()));
        }

        let price = match non_blank(&self.price) {
            None => None,
            Some(raw) => Some(parse_number(&raw).ok_or_else(|| {
                AppError::Validation(format!("Invalid price '{}'", raw))
            })?),
        };

        Ok(MaterialPayload {
            name,
            unit: non_blank(&self.unit),
            sku: non_blank(&self.sku),
            price,
            category: non_blank(&self.category),
            active: self.active,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSortKey {
    Name,
    Unit,
    Sku,
    Category,
    Price,
}

impl FromStr for MaterialSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(MaterialSortKey::Name),
            "unit" => Ok(MaterialSortKey::Unit),
            "sku" => Ok(MaterialSortKey::Sku),
            "category" => Ok(MaterialSortKey::Category),
            "price" => Ok(MaterialSortKey::Price),
            other => Err(format!("Unknown material column '{}'", other)),
        }
    }
}

impl Listable for Material {
    type Key = MaterialSortKey;

    fn haystack(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.unit.clone().unwrap_or_default(),
            self.sku.clone().unwrap_or_default(),
            self.price.map(|p| p.to_string()).unwrap_or_default(),
            self.category.clone().unwrap_or_default(),
            self.id.to_string(),
        ]
    }

    fn sort_value(&self, key: MaterialSortKey) -> SortValue {
        match key {
            MaterialSortKey::Name => SortValue::text(&self.name),
            MaterialSortKey::Unit => SortValue::optional_text(self.unit.as_deref()),
            MaterialSortKey::Sku => SortValue::optional_text(self.sku.as_deref()),
            MaterialSortKey::Category => SortValue::optional_text(self.category.as_deref()),
            MaterialSortKey::Price => SortValue::Number(self.price),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Service for the materials catalog
#[derive(Clone)]
pub struct MaterialsService {
    repo: Repository,
    picker: LatestLookup,
}

impl MaterialsService {
    pub fn new(repo: Repository, picker: LatestLookup) -> Self {
        Self { repo, picker }
    }

    pub async fn list(&self, q: Option<&str>) -> Result<Vec<Material>> {
        self.repo.list_materials(q).await
    }

    pub async fn create(&self, form: MaterialForm) -> Result<Option<Material>> {
        let payload = form.into_payload()?;
        tracing::info!("Creating material: {}", payload.name);
        self.repo.create_material(&payload).await
    }

    pub async fn update(&self, id: i64, form: MaterialForm) -> Result<Option<Material>> {
        let payload = form.into_payload()?;
        tracing::info!("Updating material: {}", id);
        self.repo.update_material(id, &payload).await
    }

    /// Soft delete; consumption lines keep their recorded prices
    pub async fn deactivate(&self, id: i64) -> Result<()> {
        tracing::info!("Deactivating material: {}", id);
        self.repo.set_material_active(id, false).await
    }

    /// Material picker, debounced. A blank query sends no request and
    /// drops any lookup in flight. `None` when a newer keystroke superseded
    /// this one.
    pub async fn suggestions(&self, query: &str) -> Result<Option<Vec<Material>>> {
        let Some(q) = non_blank(query) else {
            self.picker.cancel();
            return Ok(Some(Vec::new()));
        };
        let found = self
            .picker
            .run(|| self.repo.list_materials(Some(&q)))
            .await
            .transpose()?;
        Ok(found.map(|mut found| {
            found.truncate(MATERIAL_SUGGESTION_LIMIT);
            found
        }))
    }

    /// Send already-normalized rows to the stock import
    pub async fn import(&self, location_code: &str, rows: &[ImportRow]) -> Result<ImportSummary> {
        if rows.is_empty() {
            return Err(AppError::Validation(
                "No valid rows to import; each row needs a name and qty > 0".to_string(),
            ));
        }

        tracing::info!("Importing {} rows into {}", rows.len(), location_code);

        let summary = self
            .repo
            .import_stock(&StockImport {
                location_code,
                rows,
            })
            .await?;

        tracing::info!(
            "Import done: {} created, {} matched, {} movements",
            summary.materials_created.unwrap_or(0),
            summary.materials_matched.unwrap_or(0),
            summary.stock_movements_added.unwrap_or(0)
        );

        Ok(summary)
    }
}
