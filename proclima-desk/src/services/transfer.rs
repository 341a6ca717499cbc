//! Spreadsheet import and stock export
//!
//! Import reads a CSV sheet whose headers may use English or Romanian names
//! and shapes each line into an [`ImportRow`]. Export turns the current stock
//! view into a tab- or comma-separated file with a TOTAL line.

use super::listing::ListState;
use super::stock::{LocationFilter, StockSortKey};
use crate::api::{ImportRow, StockRow};
use crate::config::location_display_name;
use crate::error::{AppError, Result};
use crate::text::{non_blank, parse_number, sum_number};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

// ===== Import =====

const NAME_HEADERS: &[&str] = &["name", "Name", "Nume", "Material"];
const SKU_HEADERS: &[&str] = &["sku", "SKU", "Cod", "Code"];
const UNIT_HEADERS: &[&str] = &["unit", "Unit", "Unitate"];
const PRICE_HEADERS: &[&str] = &["price", "Price", "Pret", "Preț"];
const QTY_HEADERS: &[&str] = &["qty", "Qty", "Cantitate"];
const CATEGORY_HEADERS: &[&str] = &["category", "Category", "Categorie", "Categoria"];

/// First non-blank value under any of `aliases`, in alias order
fn pick<'a>(record: &'a HashMap<String, String>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Shape one sheet line into an import row
pub fn normalize_import_row(record: &HashMap<String, String>) -> ImportRow {
    ImportRow {
        name: pick(record, NAME_HEADERS).unwrap_or_default().to_string(),
        sku: pick(record, SKU_HEADERS).map(str::to_string),
        unit: pick(record, UNIT_HEADERS).map(str::to_string),
        category: pick(record, CATEGORY_HEADERS).map(str::to_string),
        price: pick(record, PRICE_HEADERS).and_then(parse_number),
        qty: pick(record, QTY_HEADERS).and_then(parse_number),
    }
}

/// Rows the import accepts: a name and a positive quantity
pub fn is_importable(row: &ImportRow) -> bool {
    !row.name.is_empty() && row.qty.is_some_and(|q| q > 0.0)
}

/// Field separator guessed from the header line
fn sniff_delimiter(header_line: &str) -> u8 {
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|d| header_line.bytes().filter(|b| b == d).count())
        .unwrap_or(b',')
}

/// Parse CSV text into importable rows; lines that do not qualify are dropped
pub fn parse_import(content: &str) -> Result<Vec<ImportRow>> {
    let content = content.trim_start_matches('\u{feff}');
    let header_line = content.lines().next().unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(header_line))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let fields: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();

        let row = normalize_import_row(&fields);
        if is_importable(&row) {
            rows.push(row);
        } else {
            skipped += 1;
        }
    }

    tracing::debug!("Import sheet: {} rows kept, {} skipped", rows.len(), skipped);
    Ok(rows)
}

/// Read and parse an import sheet from disk.
/// No valid rows is an error.
pub async fn read_import_file(path: &Path) -> Result<Vec<ImportRow>> {
    let bytes = tokio::fs::read(path).await?;
    let content = String::from_utf8(bytes).map_err(|_| {
        AppError::Validation(format!("{} is not UTF-8 text", path.display()))
    })?;

    let rows = parse_import(&content)?;
    if rows.is_empty() {
        return Err(AppError::Validation(
            "The file has no valid rows; each needs at least name and qty > 0".to_string(),
        ));
    }
    Ok(rows)
}

// ===== Export =====

/// One exported stock line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub material: String,
    pub category: String,
    pub qty: f64,
    pub unit: String,
    pub unit_price: Option<f64>,
    pub value: f64,
    pub location: String,
}

impl From<&StockRow> for ExportRow {
    fn from(row: &StockRow) -> Self {
        Self {
            material: row.material_name.clone(),
            category: row.category.clone().unwrap_or_default(),
            qty: row.quantity(),
            unit: row.unit.clone().unwrap_or_default(),
            unit_price: Some(sum_number(row.unit_price)),
            value: row.value(),
            location: row.location_label(),
        }
    }
}

const EXPORT_HEADERS: [&str; 7] = [
    "Material",
    "Categorie",
    "Cantitate",
    "UM",
    "Preț unitar",
    "Valoare",
    "Locație",
];

/// Rows as the stock table shows them (same query and sort), restricted to
/// the export location
pub fn export_rows(
    all: &[StockRow],
    state: &ListState<StockSortKey>,
    location: &LocationFilter,
) -> Vec<ExportRow> {
    let at_location: Vec<StockRow> = all
        .iter()
        .filter(|r| location.accepts(r))
        .cloned()
        .collect();

    state
        .rows(&at_location)
        .into_iter()
        .map(ExportRow::from)
        .collect()
}

/// TOTAL line: summed quantity and value
pub fn total_row(rows: &[ExportRow]) -> ExportRow {
    ExportRow {
        material: "TOTAL".to_string(),
        category: String::new(),
        qty: rows.iter().map(|r| r.qty).sum(),
        unit: String::new(),
        unit_price: None,
        value: rows.iter().map(|r| r.value).sum(),
        location: String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Tsv,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tsv" => Ok(ExportFormat::Tsv),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unknown export format '{}'. Use tsv or csv", other)),
        }
    }
}

/// `stoc_<location|complet>_<date>.<ext>`
pub fn export_filename(location: &LocationFilter, date: NaiveDate, format: ExportFormat) -> String {
    let place = match location {
        LocationFilter::All => "complet".to_string(),
        LocationFilter::Code(code) => location_display_name(code).to_lowercase(),
    };
    format!("stoc_{}_{}.{}", place, date.format("%Y-%m-%d"), format.extension())
}

fn cell(value: &str, format: ExportFormat) -> String {
    match format {
        ExportFormat::Tsv => value.replace('\t', " ").replace("\r\n", " ").replace('\n', " "),
        ExportFormat::Csv => value.to_string(),
    }
}

/// File contents: UTF-8 BOM, header, rows, TOTAL line, CRLF line ends
pub fn render_export(rows: &[ExportRow], format: ExportFormat) -> Result<Vec<u8>> {
    if rows.is_empty() {
        return Err(AppError::Validation("Nothing to export".to_string()));
    }

    let mut builder = csv::WriterBuilder::new();
    builder.terminator(csv::Terminator::CRLF);
    if format == ExportFormat::Tsv {
        builder.delimiter(b'\t').quote_style(csv::QuoteStyle::Never);
    }

    let mut out = "\u{feff}".as_bytes().to_vec();
    {
        let mut writer = builder.from_writer(&mut out);
        writer.write_record(EXPORT_HEADERS)?;

        let total = total_row(rows);
        for row in rows.iter().chain(std::iter::once(&total)) {
            writer.write_record([
                cell(&row.material, format),
                cell(&row.category, format),
                row.qty.to_string(),
                cell(&row.unit, format),
                row.unit_price.map(|p| p.to_string()).unwrap_or_default(),
                row.value.to_string(),
                cell(&row.location, format),
            ])?;
        }
        writer.flush()?;
    }

    Ok(out)
}

/// Render and write the export under `dir`, returning the file path
pub async fn write_export(
    dir: &Path,
    rows: &[ExportRow],
    location: &LocationFilter,
    date: NaiveDate,
    format: ExportFormat,
) -> Result<std::path::PathBuf> {
    let content = render_export(rows, format)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_filename(location, date, format));
    tokio::fs::write(&path, content).await?;

    tracing::info!("Exported {} stock rows to {:?}", rows.len(), path);
    Ok(path)
}

/// One-line preview of an import row
pub fn describe_import_row(row: &ImportRow) -> String {
    format!(
        "{} | {} | {} {}",
        row.name,
        non_blank(row.sku.as_deref().unwrap_or_default()).unwrap_or_else(|| "-".to_string()),
        row.qty.unwrap_or_default(),
        row.unit.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::SortDirection;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_import_aliases_and_filter() {
        let sheet = "\u{feff}Nume;Cod;Unitate;Preț;Cantitate;Categorie\n\
                     Teava cupru;TC14;m;\"12,50\";10;Cupru\n\
                     Fara cantitate;X;buc;1;0;\n\
                     ;Y;buc;1;5;\n\
                     Cot 90;;buc;3.5;\"1.000\";Fitinguri\n";

        let rows = parse_import(sheet).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Teava cupru");
        assert_eq!(rows[0].sku.as_deref(), Some("TC14"));
        assert_eq!(rows[0].price, Some(12.5));
        assert_eq!(rows[0].category.as_deref(), Some("Cupru"));
        assert_eq!(rows[1].sku, None);
        assert_eq!(rows[1].qty, Some(1.0));
    }

    #[test]
    fn test_import_english_headers_with_commas() {
        let rows = parse_import("name,qty,price\nFreon R32,2,\"45,5\"\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, Some(45.5));
    }

    #[tokio::test]
    async fn test_import_file_without_valid_rows() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("gol.csv");
        std::fs::write(&file, "name,qty\nCot,0\n").unwrap();

        let err = read_import_file(&file).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    fn stock() -> Vec<StockRow> {
        serde_json::from_value(json!([
            {"material_id": 1, "material_name": "Cot", "location_code": "ZOR", "location_name": "Zorilor", "qty": 4, "unit_price": 2.5, "unit": "buc"},
            {"material_id": 2, "material_name": "Brida", "location_code": "ZOR", "location_name": "Zorilor", "qty": "2", "unit_price": "10", "total_value": 19},
            {"material_id": 3, "material_name": "Ax", "location_code": "IRS", "location_name": "Iris", "qty": 1, "unit_price": 1}
        ]))
        .unwrap()
    }

    #[test]
    fn test_export_rows_follow_view_state() {
        let mut state = ListState::new(StockSortKey::Material);
        state.set_direction(SortDirection::Asc);

        let rows = export_rows(&stock(), &state, &LocationFilter::Code("ZOR".to_string()));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].material, "Brida");
        assert_eq!(rows[0].value, 19.0);
        assert_eq!(rows[1].value, 10.0);

        let all = export_rows(&stock(), &state, &LocationFilter::All);
        assert_eq!(all.len(), 3);

        let total = total_row(&all);
        assert_eq!(total.qty, 7.0);
        assert_eq!(total.value, 30.0);
    }

    #[test]
    fn test_render_tsv() {
        let state = ListState::new(StockSortKey::Material);
        let rows = export_rows(&stock(), &state, &LocationFilter::Code("ZOR".to_string()));
        let bytes = render_export(&rows, ExportFormat::Tsv).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with('\u{feff}'));
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert_eq!(lines[0], "Material\tCategorie\tCantitate\tUM\tPreț unitar\tValoare\tLocație");
        assert_eq!(lines[1], "Brida\t\t2\t\t10\t19\tZorilor");
        assert_eq!(lines[3], "TOTAL\t\t6\t\t\t29\t");

        assert!(render_export(&[], ExportFormat::Csv).is_err());
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            export_filename(&LocationFilter::Code("ZOR".to_string()), date, ExportFormat::Tsv),
            "stoc_zorilor_2026-03-09.tsv"
        );
        assert_eq!(
            export_filename(&LocationFilter::All, date, ExportFormat::Csv),
            "stoc_complet_2026-03-09.csv"
        );
    }

    #[tokio::test]
    async fn test_write_export() {
        let temp_dir = TempDir::new().unwrap();
        let state = ListState::new(StockSortKey::Quantity);
        let rows = export_rows(&stock(), &state, &LocationFilter::All);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

        let path = write_export(temp_dir.path(), &rows, &LocationFilter::All, date, ExportFormat::Csv)
            .await
            .unwrap();
        assert!(path.ends_with("stoc_complet_2026-01-02.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("TOTAL"));
    }
}
