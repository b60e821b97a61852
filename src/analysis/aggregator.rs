//! Record lookup and per-unit aggregation.
//!
//! Every operation works on an already-loaded slice of records. Day counts
//! are always coerced through [`ProcessRecord::valid_days`], so a record is
//! either valid everywhere or invalid everywhere.

use crate::error::QueryError;
use crate::models::{round2, InvalidCount, ProcessRecord, TabelaDetails, TabelaSummary};
use std::collections::BTreeMap;
use tracing::warn;

/// Find the first record whose `processo` equals `id` exactly.
pub fn find_by_number<'a>(
    records: &'a [ProcessRecord],
    id: &str,
) -> Result<&'a ProcessRecord, QueryError> {
    records
        .iter()
        .find(|r| r.processo == id)
        .ok_or_else(|| QueryError::not_found(format!("Processo {} não encontrado", id)))
}

/// Count and rounded-up mean of valid day counts per category for one unit.
///
/// Categories with no valid records are left out; the result is sorted by
/// category label.
pub fn summarize_by_unit(records: &[ProcessRecord], unidade: &str) -> Vec<TabelaSummary> {
    let mut grouped: BTreeMap<&str, DaysAccumulator> = BTreeMap::new();

    for record in records.iter().filter(|r| r.unidade == unidade) {
        if let Some(days) = record.valid_days() {
            grouped
                .entry(record.tipo_tabela.as_str())
                .or_default()
                .push(days);
        }
    }

    grouped
        .into_iter()
        .map(|(tipo_tabela, acc)| TabelaSummary {
            tipo_tabela: tipo_tabela.to_string(),
            quantidade: acc.count,
            media_dias: ceil_days(tipo_tabela, acc.mean()),
        })
        .collect()
}

/// Count, sum and running mean of day counts.
///
/// The plain sum gives exact means for ordinary data; the running mean stays
/// finite when the sum overflows.
#[derive(Debug, Default)]
struct DaysAccumulator {
    count: usize,
    sum: f64,
    running_mean: f64,
}

impl DaysAccumulator {
    fn push(&mut self, days: f64) {
        self.count += 1;
        self.sum += days;
        self.running_mean += (days - self.running_mean) / self.count as f64;
    }

    fn mean(&self) -> f64 {
        if self.sum.is_finite() {
            self.sum / self.count as f64
        } else {
            self.running_mean
        }
    }
}

/// Round a mean up to whole days, clamping to `u64::MAX`.
fn ceil_days(tipo_tabela: &str, mean: f64) -> u64 {
    let days = mean.ceil();
    if days >= u64::MAX as f64 {
        warn!(
            "Mean days for tipo_tabela {} ({:e}) exceeds u64, clamping",
            tipo_tabela, mean
        );
        return u64::MAX;
    }
    days as u64
}

/// Share of a category's records with `0 < dias <= threshold_days`.
pub fn details_by_unit_and_category(
    records: &[ProcessRecord],
    tipo_tabela: &str,
    unidade: &str,
    threshold_days: f64,
) -> Result<TabelaDetails, QueryError> {
    let matching = matching_records(records, tipo_tabela, unidade)?;
    let total = matching.len();

    let dentro_prazo = matching
        .iter()
        .filter(|r| r.valid_days().is_some_and(|d| d <= threshold_days))
        .count();

    Ok(TabelaDetails {
        tipo_tabela: tipo_tabela.to_string(),
        total,
        dentro_prazo,
        percentual: round2(dentro_prazo as f64 / total as f64 * 100.0),
    })
}

/// Records of a category without a usable day count.
pub fn invalid_count_by_unit_and_category(
    records: &[ProcessRecord],
    tipo_tabela: &str,
    unidade: &str,
) -> Result<InvalidCount, QueryError> {
    let matching = matching_records(records, tipo_tabela, unidade)?;

    Ok(InvalidCount {
        tipo_tabela: tipo_tabela.to_string(),
        invalidos: matching.iter().filter(|r| r.valid_days().is_none()).count(),
        total: matching.len(),
    })
}

/// Categories present for a unit, valid day counts or not.
pub fn categories_for_unit<'a>(records: &'a [ProcessRecord], unidade: &str) -> Vec<&'a str> {
    let mut categories: Vec<&str> = records
        .iter()
        .filter(|r| r.unidade == unidade)
        .map(|r| r.tipo_tabela.as_str())
        .collect();

    categories.sort_unstable();
    categories.dedup();
    categories
}

fn matching_records<'a>(
    records: &'a [ProcessRecord],
    tipo_tabela: &str,
    unidade: &str,
) -> Result<Vec<&'a ProcessRecord>, QueryError> {
    let matching: Vec<&ProcessRecord> = records
        .iter()
        .filter(|r| r.matches(unidade, tipo_tabela))
        .collect();

    if matching.is_empty() {
        return Err(QueryError::not_found(format!(
            "Nenhum processo para tipo_tabela {} na unidade {}",
            tipo_tabela, unidade
        )));
    }

    Ok(matching)
}
