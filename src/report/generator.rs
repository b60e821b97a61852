//! Dashboard generation.
//!
//! This module builds the per-unit dashboard from the aggregations and
//! renders it as Markdown or JSON.

use crate::analysis::{
    categories_for_unit, details_by_unit_and_category, invalid_count_by_unit_and_category,
    summarize_by_unit,
};
use crate::models::{InvalidCount, ProcessRecord, TabelaDetails, TabelaSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    /// Unit the dashboard describes.
    pub unidade: String,
    /// When the dashboard was built.
    pub generated_at: DateTime<Utc>,
    /// Day threshold used for the details columns.
    pub threshold_days: f64,
    /// Records in the whole snapshot.
    pub snapshot_records: usize,
    /// Records belonging to this unit.
    pub unit_records: usize,
}

/// One category of the unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRow {
    /// Absent when the category has no valid day counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TabelaSummary>,
    pub details: TabelaDetails,
    pub invalid: InvalidCount,
}

/// The complete dashboard for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub rows: Vec<DashboardRow>,
}

/// Build the dashboard for `unidade`.
pub fn build_dashboard(records: &[ProcessRecord], unidade: &str, threshold_days: f64) -> Dashboard {
    let summaries = summarize_by_unit(records, unidade);

    let rows: Vec<DashboardRow> = categories_for_unit(records, unidade)
        .into_iter()
        .filter_map(|tipo_tabela| {
            // Every category listed has at least one record, so neither fails.
            let details =
                details_by_unit_and_category(records, tipo_tabela, unidade, threshold_days).ok()?;
            let invalid = invalid_count_by_unit_and_category(records, tipo_tabela, unidade).ok()?;
            let summary = summaries
                .iter()
                .find(|s| s.tipo_tabela == tipo_tabela)
                .cloned();

            Some(DashboardRow {
                summary,
                details,
                invalid,
            })
        })
        .collect();

    Dashboard {
        metadata: DashboardMetadata {
            unidade: unidade.to_string(),
            generated_at: Utc::now(),
            threshold_days,
            snapshot_records: records.len(),
            unit_records: records.iter().filter(|r| r.unidade == unidade).count(),
        },
        rows,
    }
}

/// Generate a complete Markdown dashboard.
pub fn generate_markdown_dashboard(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Painel: {}\n\n", dashboard.metadata.unidade));
    output.push_str(&generate_metadata_section(&dashboard.metadata));

    if dashboard.rows.is_empty() {
        output.push_str("Nenhum processo encontrado para esta unidade.\n");
        return output;
    }

    output.push_str(&generate_summary_section(&dashboard.rows));
    output.push_str(&generate_threshold_section(
        &dashboard.rows,
        dashboard.metadata.threshold_days,
    ));
    output.push_str(&generate_invalid_section(&dashboard.rows));

    output
}

fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Threshold:** {} days\n",
        metadata.threshold_days
    ));
    section.push_str(&format!(
        "- **Records:** {} of {} in snapshot\n",
        metadata.unit_records, metadata.snapshot_records
    ));
    section.push('\n');

    section
}

fn generate_summary_section(rows: &[DashboardRow]) -> String {
    let mut section = String::new();

    section.push_str("## Média de dias por tabela\n\n");
    section.push_str("| Tabela | Processos válidos | Média (dias) |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for row in rows {
        match &row.summary {
            Some(summary) => section.push_str(&format!(
                "| {} | {} | {} |\n",
                summary.tipo_tabela, summary.quantidade, summary.media_dias
            )),
            None => section.push_str(&format!("| {} | 0 | - |\n", row.details.tipo_tabela)),
        }
    }
    section.push('\n');

    section
}

fn generate_threshold_section(rows: &[DashboardRow], threshold_days: f64) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Até {} dias\n\n", threshold_days));
    section.push_str("| Tabela | Total | No prazo | % |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for row in rows {
        let d = &row.details;
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            d.tipo_tabela, d.total, d.dentro_prazo, d.percentual
        ));
    }
    section.push('\n');

    section
}

fn generate_invalid_section(rows: &[DashboardRow]) -> String {
    let flagged: Vec<_> = rows.iter().filter(|r| r.invalid.invalidos > 0).collect();
    if flagged.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Dados inválidos\n\n");
    section.push_str("| Tabela | Sem dias válidos | Total |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for row in flagged {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            row.invalid.tipo_tabela, row.invalid.invalidos, row.invalid.total
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON dashboard.
pub fn generate_json_dashboard(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn create_test_record(id: &str, unidade: &str, tipo_tabela: &str, dias: Value) -> ProcessRecord {
        ProcessRecord {
            processo: id.to_string(),
            unidade: unidade.to_string(),
            tipo_tabela: tipo_tabela.to_string(),
            dias,
            posicao: Value::Null,
            extra: Default::default(),
        }
    }

    fn create_test_records() -> Vec<ProcessRecord> {
        vec![
            create_test_record("1", "SEFAZ", "Licitação", json!(4)),
            create_test_record("2", "SEFAZ", "Licitação", json!(40)),
            create_test_record("3", "SEFAZ", "Diárias", json!(null)),
            create_test_record("4", "SEPLAG", "Licitação", json!(1)),
        ]
    }

    #[test]
    fn test_build_dashboard() {
        let dashboard = build_dashboard(&create_test_records(), "SEFAZ", 30.0);

        assert_eq!(dashboard.metadata.snapshot_records, 4);
        assert_eq!(dashboard.metadata.unit_records, 3);
        assert_eq!(dashboard.rows.len(), 2);

        let diarias = &dashboard.rows[0];
        assert_eq!(diarias.details.tipo_tabela, "Diárias");
        assert!(diarias.summary.is_none());
        assert_eq!(diarias.invalid.invalidos, 1);

        let licitacao = &dashboard.rows[1];
        assert_eq!(licitacao.summary.as_ref().map(|s| s.media_dias), Some(22));
        assert_eq!(licitacao.details.dentro_prazo, 1);
        assert_eq!(licitacao.details.percentual, 50.0);
    }

    #[test]
    fn test_generate_markdown_dashboard() {
        let dashboard = build_dashboard(&create_test_records(), "SEFAZ", 30.0);
        let markdown = generate_markdown_dashboard(&dashboard);

        assert!(markdown.contains("# Painel: SEFAZ"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| Licitação | 2 | 22 |"));
        assert!(markdown.contains("| Diárias | 0 | - |"));
        assert!(markdown.contains("| Licitação | 2 | 1 | 50.00 |"));
        assert!(markdown.contains("## Dados inválidos"));
    }

    #[test]
    fn test_markdown_for_unknown_unit() {
        let dashboard = build_dashboard(&create_test_records(), "NOPE", 30.0);
        let markdown = generate_markdown_dashboard(&dashboard);

        assert!(markdown.contains("Nenhum processo encontrado"));
        assert!(!markdown.contains("## Até"));
    }

    #[test]
    fn test_generate_json_dashboard() {
        let dashboard = build_dashboard(&create_test_records(), "SEFAZ", 30.0);
        let json = generate_json_dashboard(&dashboard).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"rows\""));
        assert!(json.contains("\"dentro_prazo\""));
    }
}
