//! API models
//!
//! Rust structs for the records exchanged with the back-office API.
//! Reads are lenient: optional fields default, numbers and ids may arrive
//! as strings, and list endpoints may wrap their arrays.

use crate::text::{lenient_flag, lenient_number, lenient_string, lenient_text, sum_number};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// List responses come as a bare array or wrapped in `value` / `items`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Value { value: Vec<T> },
    Items { items: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(v) => v,
            ListEnvelope::Value { value } => value,
            ListEnvelope::Items { items } => items,
        }
    }
}

impl ListEnvelope<Value> {
    /// Decode every record on its own. Records that do not fit `T` are
    /// logged and skipped instead of failing the whole list.
    pub fn decode<T: DeserializeOwned>(self) -> Vec<T> {
        let raw = self.into_vec();
        let total = raw.len();
        let records: Vec<T> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping list record {}: {}", index, e);
                    None
                }
            })
            .collect();
        if records.len() < total {
            tracing::warn!("Decoded {} of {} list records", records.len(), total);
        }
        records
    }
}

// ===== Session =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default, alias = "user_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub active: Option<bool>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.is_admin == Some(true)
            || self
                .role
                .as_deref()
                .is_some_and(|r| r.trim().eq_ignore_ascii_case("admin"))
    }

    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

// ===== Clients =====

/// Individual (`PF`) or company (`PJ`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientKind {
    #[serde(rename = "PF")]
    Individual,
    #[serde(rename = "PJ")]
    Company,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Individual => "PF",
            ClientKind::Company => "PJ",
        }
    }
}

impl FromStr for ClientKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PF" => Ok(ClientKind::Individual),
            "PJ" => Ok(ClientKind::Company),
            other => Err(format!("Unknown client type '{}'. Use PF or PJ", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Raw type as stored; see [`Client::kind`]
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub kind_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cnp: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cui: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vat: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "note")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub active: Option<bool>,
}

impl Client {
    /// Anything other than `PJ` is treated as an individual
    pub fn kind(&self) -> ClientKind {
        match self.kind_code.as_deref().map(str::trim) {
            Some(k) if k.eq_ignore_ascii_case("PJ") => ClientKind::Company,
            _ => ClientKind::Individual,
        }
    }

    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Client #{}", self.id)
        } else {
            self.name.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

/// Body for `POST /clients` and `PATCH /clients/:id`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClientKind,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub cui: Option<String>,
    pub cnp: Option<String>,
}

// ===== Projects =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planned,
    InProgress,
    Done,
    Canceled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Planned,
        ProjectStatus::InProgress,
        ProjectStatus::Done,
        ProjectStatus::Canceled,
    ];

    /// Accepts the wire names and the Romanian spellings found in older records
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "planned" | "planuit" | "plănuit" => Some(ProjectStatus::Planned),
            "in_progress" | "in progress" | "in_lucru" | "in lucru" | "în lucru" => {
                Some(ProjectStatus::InProgress)
            }
            "done" | "finalizat" => Some(ProjectStatus::Done),
            "canceled" | "cancelled" | "anulat" => Some(ProjectStatus::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Done => "done",
            ProjectStatus::Canceled => "canceled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "Plănuit",
            ProjectStatus::InProgress => "În lucru",
            ProjectStatus::Done => "Finalizat",
            ProjectStatus::Canceled => "Anulat",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ProjectStatus::parse(s).ok_or_else(|| {
            format!(
                "Unknown status '{}'. Use planned, in_progress, done or canceled",
                s
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(default, alias = "clientId")]
    pub client_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Older records carry `name` instead of `title`
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Raw status as stored; see [`Project::status`]
    #[serde(default, rename = "status", deserialize_with = "lenient_text")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub client_name: Option<String>,
    /// Camel-case spelling some endpoints send, possibly next to `client_name`
    #[serde(default, rename = "clientName", deserialize_with = "lenient_text", skip_serializing)]
    pub client_name_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cui: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cnp: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub materials_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub materials_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost_materials: Option<f64>,
}

impl Project {
    /// Owning client's name under either spelling
    pub fn client_name(&self) -> Option<&str> {
        [&self.client_name, &self.client_name_camel]
            .into_iter()
            .filter_map(|name| name.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    pub fn status(&self) -> Option<ProjectStatus> {
        self.status_code.as_deref().and_then(ProjectStatus::parse)
    }

    /// Human label for the status, falling back to the raw value
    pub fn status_label(&self) -> String {
        match (self.status(), self.status_code.as_deref()) {
            (Some(status), _) => status.label().to_string(),
            (None, Some(raw)) if !raw.trim().is_empty() => raw.to_string(),
            _ => "-".to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(self.title.as_str()).filter(|t| !t.trim().is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Lucrare #{}", self.id))
    }

    /// Best-effort cost embedded on the record by older backends
    pub fn embedded_cost(&self) -> Option<f64> {
        self.materials_cost
            .or(self.total_cost)
            .or(self.materials_total)
            .or(self.cost_materials)
    }
}

/// Body for `POST /clients/:id/projects` and `PATCH /projects/:id`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectPayload {
    pub title: String,
    pub address: Option<String>,
    pub status: ProjectStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusChange {
    pub status: ProjectStatus,
}

/// `GET /projects-materials/:projectId`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMaterials {
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<ProjectMaterialLine>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total: Option<f64>,
}

impl ProjectMaterials {
    /// Authoritative server-side total, zero when absent
    pub fn cost(&self) -> f64 {
        sum_number(self.total_cost.or(self.total))
    }
}

/// One consumption line; the unit price is frozen when consumed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMaterialLine {
    #[serde(default)]
    pub material_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_price_snapshot: Option<f64>,
    /// Cost as reported by the backend
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost: Option<f64>,
}

impl ProjectMaterialLine {
    /// qty x snapshot price, or the reported cost when either is missing
    pub fn line_cost(&self) -> f64 {
        match (self.qty, self.unit_price_snapshot) {
            (Some(qty), Some(price)) => qty * price,
            _ => sum_number(self.cost),
        }
    }
}

// ===== Materials & stock =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub active: Option<bool>,
}

impl Material {
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

/// Body for `POST /materials` and `PATCH /materials/:id`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MaterialPayload {
    pub name: String,
    pub unit: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ActiveFlag {
    pub active: bool,
}

/// Quantity of one material at one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRow {
    #[serde(default)]
    pub material_id: i64,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location_code: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub material_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sku: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_value: Option<f64>,
}

impl StockRow {
    pub fn quantity(&self) -> f64 {
        sum_number(self.qty)
    }

    /// Reported total value, or qty x unit price
    pub fn value(&self) -> f64 {
        self.total_value
            .unwrap_or_else(|| self.quantity() * sum_number(self.unit_price))
    }

    pub fn is_at(&self, location_code: &str) -> bool {
        self.location_code
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(location_code.trim()))
    }

    pub fn location_label(&self) -> String {
        self.location_name
            .clone()
            .or_else(|| self.location_code.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct StockIn {
    pub material_id: i64,
    pub location_code: String,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjust {
    pub material_id: i64,
    pub location_id: i64,
    pub qty: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Consumption {
    pub project_id: i64,
    pub material_id: i64,
    pub from_location_id: i64,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    pub note: Option<String>,
}

/// One spreadsheet row headed for `POST /stock/import`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRow {
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub qty: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StockImport<'a> {
    pub location_code: &'a str,
    pub rows: &'a [ImportRow],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub ok: Option<bool>,
    #[serde(default)]
    pub materials_created: Option<i64>,
    #[serde(default)]
    pub materials_matched: Option<i64>,
    #[serde(default)]
    pub stock_movements_added: Option<i64>,
    #[serde(default)]
    pub location_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub active: Option<bool>,
}

// ===== Workers & users =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub active: Option<bool>,
}

impl Worker {
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

/// A worker as assigned to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWorker {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkerPayload {
    pub name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WorkerAssignment {
    pub worker_ids: Vec<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentNote {
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}
