use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use super::resolve::{resolve, Coordinate};
use super::{ChartData, ChartInputs};
use crate::data::float;
use crate::data::model::Rank;

/// Cell text when a coordinate cannot be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    pub column: String,
    #[serde(serialize_with = "float::serialize_opt")]
    pub value: Option<f64>,
    pub formatted: String,
}

impl TableCell {
    fn new(column: String, value: Option<f64>) -> Self {
        let formatted = match value {
            Some(v) => float::format_fixed4(v),
            None => NOT_AVAILABLE.to_string(),
        };
        TableCell {
            column,
            value,
            formatted,
        }
    }
}

/// Tokenizer × language (or language pair) grid for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixTable {
    pub metric: String,
    pub rank: Rank,
    pub row_header: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[r][c]` belongs to `rows[r]` and `columns[c]`.
    pub cells: Vec<Vec<TableCell>>,
    /// Cells left as not-available.
    pub skipped: usize,
}

impl MatrixTable {
    /// Write the formatted grid as CSV, header row first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let header = std::iter::once(self.row_header.as_str())
            .chain(self.columns.iter().map(String::as_str));
        out.write_record(header).context("writing CSV header")?;
        for (row, cells) in self.rows.iter().zip(&self.cells) {
            let record = std::iter::once(row.as_str())
                .chain(cells.iter().map(|c| c.formatted.as_str()));
            out.write_record(record)
                .with_context(|| format!("writing CSV row {row}"))?;
        }
        out.flush().context("flushing CSV")?;
        Ok(())
    }
}

/// Matrix table: rows are the selected tokenizers, columns the selected
/// languages (2D) or every ordered pair of them (3D), in selection order.
pub fn transform(inputs: &ChartInputs<'_>) -> ChartData {
    if inputs.metrics.len() != 1 {
        return ChartData::unavailable("Metric Table requires exactly 1 metric");
    }
    let arrays = match inputs.arrays() {
        Ok(a) => a,
        Err(reason) => return ChartData::unavailable(reason),
    };
    let (name, array) = arrays[0];
    if array.rank() == Rank::One {
        return ChartData::unavailable(format!(
            "Unsupported array dimensionality: {}. Expected 2D or 3D.",
            array.rank()
        ));
    }
    if let Err(reason) = inputs
        .require_tokenizers()
        .and_then(|_| inputs.require_languages())
    {
        return ChartData::unavailable(reason);
    }

    let pairs: Vec<(&str, Option<&str>)> = match array.rank() {
        Rank::Three => inputs
            .languages
            .iter()
            .flat_map(|a| inputs.languages.iter().map(move |b| (a.as_str(), Some(b.as_str()))))
            .collect(),
        _ => inputs.languages.iter().map(|l| (l.as_str(), None)).collect(),
    };
    let columns: Vec<String> = pairs
        .iter()
        .map(|(a, b)| match b {
            Some(b) => format!("{a}-{b}"),
            None => a.to_string(),
        })
        .collect();

    let mut skipped = 0usize;
    let mut cells = Vec::with_capacity(inputs.tokenizers.len());
    for tokenizer in inputs.tokenizers {
        let row = pairs
            .iter()
            .zip(&columns)
            .map(|(&(first, second), column)| {
                let coord = match second {
                    Some(second) => Coordinate::Pair(tokenizer, first, second),
                    None => Coordinate::Language(tokenizer, first),
                };
                let value = match resolve(inputs.universe, array, &coord) {
                    Ok(v) => Some(v),
                    Err(err) => {
                        log::debug!("table {name}: {tokenizer}/{column}: {err}");
                        skipped += 1;
                        None
                    }
                };
                TableCell::new(column.clone(), value)
            })
            .collect();
        cells.push(row);
    }
    if skipped > 0 {
        log::warn!("table {name}: {skipped} cell(s) not available, label not in metadata");
    }

    ChartData::Table(MatrixTable {
        metric: name.to_string(),
        rank: array.rank(),
        row_header: "Tokenizer".to_string(),
        rows: inputs.tokenizers.to_vec(),
        columns,
        cells,
        skipped,
    })
}
