//! Text helpers shared by search, listing and import
//!
//! - `normalize` for substring matching (case-fold, whitespace collapse)
//! - `compare_ro` for Romanian-aware ordering of display strings
//! - `parse_number` for locale-tolerant numeric input ("1.234,56 RON")
//! - lenient serde adapters for loosely typed backend records

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::cmp::Ordering;

/// Trim, lowercase and collapse internal whitespace runs to a single space
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Base letter and diacritic rank of a lowercase char.
/// Only the Romanian-specific letters carry a rank; everything else is 0.
fn romanian_fold(c: char) -> (char, u8) {
    match c {
        'ă' => ('a', 1),
        'â' => ('a', 2),
        'î' => ('i', 1),
        'ș' | 'ş' => ('s', 1),
        'ț' | 'ţ' => ('t', 1),
        other => (other, 0),
    }
}

fn lowered(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Compare two display strings the way a Romanian collation does.
///
/// Three levels, each consulted only when the previous one ties:
/// 1. letters with diacritics folded to their base, case-insensitive
/// 2. diacritic rank (`a < ă < â`, `i < î`, `s < ș`, `t < ț`)
/// 3. case, lowercase first
///
/// A final raw comparison keeps the order total.
pub fn compare_ro(a: &str, b: &str) -> Ordering {
    lowered(a)
        .map(|c| romanian_fold(c).0)
        .cmp(lowered(b).map(|c| romanian_fold(c).0))
        .then_with(|| {
            lowered(a)
                .map(|c| romanian_fold(c).1)
                .cmp(lowered(b).map(|c| romanian_fold(c).1))
        })
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Parse a human-entered number.
///
/// Accepts both `,` and `.` as decimal separator, strips spaces, currency
/// symbols and thousands separators. When both separators appear the
/// European form is assumed (dot thousands, comma decimals).
/// Returns `None` for anything that does not yield a finite value.
pub fn parse_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if kept.is_empty() {
        return None;
    }

    let has_comma = kept.contains(',');
    let has_dot = kept.contains('.');

    let canonical = if has_comma && has_dot {
        kept.replace('.', "").replacen(',', ".", 1)
    } else if has_comma {
        kept.replacen(',', ".", 1)
    } else {
        kept
    };

    canonical.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Value of a number for sorting: unparseable input sorts lowest
pub fn sort_number(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NEG_INFINITY)
}

/// Value of a number for sums: unparseable input counts as zero
pub fn sum_number(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// Plain money display used in listings
pub fn money(value: f64) -> String {
    format!("{:.2} RON", value)
}

/// Trimmed copy, or `None` when blank
pub fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Deserialize a number that may arrive as a JSON number or a string
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|n| n.is_finite()),
        Some(Value::String(s)) => parse_number(&s),
        _ => None,
    })
}

/// Deserialize free text that the backend sometimes sends as a number
/// (phones, tax ids, SKUs)
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Like [`lenient_text`], with `null` or missing read as an empty string
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Deserialize a flag sent as `true`, `1`, `"1"` or `"true"`
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_i64() == Some(1)),
        Some(Value::String(s)) => Some(s == "1" || s.eq_ignore_ascii_case("true")),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Ion   POPESCU \t SRL "), "ion popescu srl");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("1234,56"), Some(1234.56));
        assert_eq!(parse_number("1234.56"), Some(1234.56));
        assert_eq!(parse_number("1 234,56 RON"), Some(1234.56));
        assert_eq!(parse_number("-12,5"), Some(-12.5));
        assert_eq!(parse_number("42"), Some(42.0));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(sum_number(parse_number("abc")), 0.0);
        assert_eq!(sort_number(parse_number("abc")), f64::NEG_INFINITY);
    }

    #[test]
    fn test_compare_ro_orders_diacritics_after_base() {
        assert_eq!(compare_ro("A", "B"), Ordering::Less);
        assert_eq!(compare_ro("ana", "Ana"), Ordering::Less);
        assert_eq!(compare_ro("tata", "țeavă"), Ordering::Less);
        assert_eq!(compare_ro("sac", "șa"), Ordering::Greater);
        assert_eq!(compare_ro("mar", "măr"), Ordering::Less);
        assert_eq!(compare_ro("măr", "mâr"), Ordering::Less);
        assert_eq!(compare_ro("Țeavă", "zinc"), Ordering::Less);
        assert_eq!(compare_ro("x", "x"), Ordering::Equal);
    }

    #[test]
    fn test_compare_ro_accepts_cedilla_variants() {
        assert_eq!(compare_ro("ştuţ", "ștuz"), Ordering::Less);
        assert_eq!(
            compare_ro("ştuţ", "stut"),
            Ordering::Greater,
            "cedilla letters rank after their base letter"
        );
    }

    #[derive(Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_number")]
        qty: Option<f64>,
        #[serde(default, deserialize_with = "lenient_text")]
        cnp: Option<String>,
        #[serde(default, deserialize_with = "lenient_flag")]
        active: Option<bool>,
    }

    #[test]
    fn test_lenient_adapters() {
        let row: Loose =
            serde_json::from_str(r#"{"qty":"1.234,56","cnp":1234567890123,"active":"1"}"#).unwrap();
        assert_eq!(row.qty, Some(1234.56));
        assert_eq!(row.cnp.as_deref(), Some("1234567890123"));
        assert_eq!(row.active, Some(true));

        let row: Loose = serde_json::from_str(r#"{"qty":"n/a","active":0}"#).unwrap();
        assert_eq!(row.qty, None);
        assert_eq!(row.cnp, None);
        assert_eq!(row.active, Some(false));

        let row: Loose = serde_json::from_str(r#"{"qty":null}"#).unwrap();
        assert_eq!(row.qty, None);
        assert_eq!(row.active, None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  x "), Some("x".to_string()));
        assert_eq!(non_blank("   "), None);
    }
}
