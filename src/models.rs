//! Data models for the process snapshot and its derived views.
//!
//! Records arrive from an external upstream process, so every field other
//! than `processo` is decoded leniently. The derived summaries are what the
//! dashboard and the HTTP API hand back to callers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single administrative process as found in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process identifier, `NNNN.NNNNNN/NNNN-NN`.
    pub processo: String,
    /// Organizational unit currently holding the process.
    #[serde(default, deserialize_with = "lenient_string")]
    pub unidade: String,
    /// Category (table type) label.
    #[serde(default, deserialize_with = "lenient_string")]
    pub tipo_tabela: String,
    /// Days elapsed, kept raw. See [`coerce_days`].
    #[serde(default)]
    pub dias: Value,
    /// Queue position, kept raw.
    #[serde(rename = "posição", default)]
    pub posicao: Value,
    /// Any other upstream fields, returned untouched by lookups.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessRecord {
    /// The record's day count if it is a finite number greater than zero.
    pub fn valid_days(&self) -> Option<f64> {
        valid_days(&self.dias)
    }

    /// Whether the record belongs to the given unit and category.
    pub fn matches(&self, unidade: &str, tipo_tabela: &str) -> bool {
        self.unidade == unidade && self.tipo_tabela == tipo_tabela
    }
}

/// Strings pass through; null and any other JSON type become `""`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Coerce a raw `dias` value into a finite number.
///
/// Numbers are taken as-is; strings are trimmed and parsed as decimals, with a
/// decimal comma accepted. Everything else yields `None`.
pub fn coerce_days(value: &Value) -> Option<f64> {
    let days = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };

    days.is_finite().then_some(days)
}

/// Coerced day count, only when strictly positive.
pub fn valid_days(value: &Value) -> Option<f64> {
    coerce_days(value).filter(|days| *days > 0.0)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Check the `NNNN.NNNNNN/NNNN-NN` shape of a process identifier.
pub fn is_process_number(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 20 {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| match i {
        4 => *b == b'.',
        11 => *b == b'/',
        16 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Per-category summary for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabelaSummary {
    pub tipo_tabela: String,
    /// Number of records with a valid day count.
    pub quantidade: usize,
    /// Mean day count, rounded up.
    pub media_dias: u64,
}

/// Threshold breakdown for a category/unit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabelaDetails {
    pub tipo_tabela: String,
    pub total: usize,
    /// Records with `0 < dias <= threshold`.
    pub dentro_prazo: usize,
    /// `dentro_prazo` as a percentage of `total`, two decimals.
    pub percentual: f64,
}

/// Records without a usable day count for a category/unit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidCount {
    pub tipo_tabela: String,
    pub invalidos: usize,
    pub total: usize,
}
