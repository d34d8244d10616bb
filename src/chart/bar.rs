use serde::Serialize;

use super::resolve::{offset, resolve, Coordinate};
use super::{ChartData, ChartInputs};
use crate::color::ColorMap;
use crate::data::float;
use crate::data::model::{LabelUniverse, LabeledArray, Rank};
use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub metric: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarValue {
    pub metric: String,
    #[serde(serialize_with = "float::serialize_opt")]
    pub value: Option<f64>,
}

/// One bar group: a tokenizer with a value per metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarCategory {
    pub name: String,
    pub values: Vec<BarValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub rank: Rank,
    pub series: Vec<BarSeries>,
    pub categories: Vec<BarCategory>,
    pub skipped: usize,
}

/// Mean of the finite values, `None` if there are none.
fn finite_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn read_cell(
    universe: &LabelUniverse,
    array: &LabeledArray,
    coord: &Coordinate<'_>,
    skipped: &mut usize,
) -> Option<f64> {
    match resolve(universe, array, coord) {
        Ok(v) => Some(v),
        Err(err) => {
            if matches!(err, DataError::LabelNotFound { .. }) {
                *skipped += 1;
            }
            None
        }
    }
}

/// Value of one metric for one tokenizer.
///
/// 1D metrics read the tokenizer's cell directly; 2D and 3D metrics average
/// the finite cells over the selected languages (or language pairs).
/// Unknown languages are left out of the average and counted in `skipped`;
/// an unknown tokenizer is an error.
fn category_value(
    universe: &LabelUniverse,
    array: &LabeledArray,
    tokenizer: &str,
    languages: &[String],
    skipped: &mut usize,
) -> Result<Option<f64>, DataError> {
    offset(universe, &Coordinate::Tokenizer(tokenizer))?;

    match array.rank() {
        Rank::One => Ok(Some(resolve(universe, array, &Coordinate::Tokenizer(tokenizer))?)),
        Rank::Two => {
            let vals: Vec<f64> = languages
                .iter()
                .filter_map(|l| read_cell(universe, array, &Coordinate::Language(tokenizer, l), skipped))
                .collect();
            Ok(finite_mean(vals))
        }
        Rank::Three => {
            let mut vals = Vec::new();
            for a in languages {
                for b in languages {
                    let coord = Coordinate::Pair(tokenizer, a, b);
                    vals.extend(read_cell(universe, array, &coord, skipped));
                }
            }
            Ok(finite_mean(vals))
        }
    }
}

/// Comparative bars: one category per selected tokenizer, one series per
/// metric. All metrics must share a rank.
pub fn transform(inputs: &ChartInputs<'_>) -> ChartData {
    if inputs.metrics.is_empty() {
        return ChartData::unavailable("Bar chart requires at least 1 metric");
    }
    let arrays = match inputs.arrays() {
        Ok(a) => a,
        Err(reason) => return ChartData::unavailable(reason),
    };
    let rank = arrays[0].1.rank();
    if arrays.iter().any(|(_, a)| a.rank() != rank) {
        let ranks: Vec<String> = arrays.iter().map(|(n, a)| format!("{n} ({})", a.rank())).collect();
        return ChartData::unavailable(format!(
            "Bar chart metrics must share one dimensionality, got: {}",
            ranks.join(", ")
        ));
    }
    if let Err(reason) = inputs.require_tokenizers() {
        return ChartData::unavailable(reason);
    }
    if rank != Rank::One {
        if let Err(reason) = inputs.require_languages() {
            return ChartData::unavailable(reason);
        }
    }

    let colors = ColorMap::new(arrays.iter().map(|(n, _)| *n));
    let series = arrays
        .iter()
        .map(|(n, _)| BarSeries {
            metric: n.to_string(),
            color: colors.color_for(n),
        })
        .collect();

    let mut skipped = 0usize;
    let mut categories = Vec::with_capacity(inputs.tokenizers.len());
    'tokenizers: for tokenizer in inputs.tokenizers {
        let mut values = Vec::with_capacity(arrays.len());
        for (name, array) in &arrays {
            match category_value(inputs.universe, array, tokenizer, inputs.languages, &mut skipped) {
                Ok(value) => values.push(BarValue {
                    metric: name.to_string(),
                    value,
                }),
                Err(err) => {
                    log::debug!("bar chart: dropping {tokenizer}: {err}");
                    skipped += 1;
                    continue 'tokenizers;
                }
            }
        }
        categories.push(BarCategory {
            name: tokenizer.clone(),
            values,
        });
    }
    if skipped > 0 {
        log::warn!("bar chart: {skipped} coordinate(s) dropped, label not in metadata");
    }

    ChartData::Bar(BarChart {
        rank,
        series,
        categories,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::MetricRef;
    use crate::data::language::LanguageTable;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn run(metrics: Vec<MetricRef<'_>>, tokenizers: &[String], languages: &[String]) -> ChartData {
        let u = LabelUniverse::new(strings(&["A", "B"]), strings(&["en", "fr", "de"]));
        let table = LanguageTable::default();
        let inputs = ChartInputs {
            universe: &u,
            tokenizers,
            languages,
            metrics,
            languages_info: &table,
        };
        transform(&inputs)
    }

    fn bars(data: ChartData) -> BarChart {
        match data {
            ChartData::Bar(b) => b,
            other => panic!("expected bar chart, got {other:?}"),
        }
    }

    #[test]
    fn rank1_metrics_one_series_each() {
        let vocab = LabeledArray::new(vec![32000.0, 50000.0], vec![2]).unwrap();
        let rank = LabeledArray::new(vec![2.0, 1.0], vec![2]).unwrap();
        let chart = bars(run(
            vec![
                MetricRef { name: "vocab", array: Some(&vocab) },
                MetricRef { name: "rank", array: Some(&rank) },
            ],
            &strings(&["B", "A"]),
            &[],
        ));
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.categories[0].name, "B");
        assert_eq!(chart.categories[0].values[0].value, Some(50000.0));
        assert_eq!(chart.categories[1].values[1].value, Some(2.0));
    }

    #[test]
    fn rank2_averages_finite_language_cells() {
        let a = LabeledArray::new(vec![1.0, 3.0, f64::NAN, 4.0, 4.0, 4.0], vec![2, 3]).unwrap();
        let chart = bars(run(
            vec![MetricRef { name: "m", array: Some(&a) }],
            &strings(&["A", "Z"]),
            &strings(&["en", "fr", "de", "xx"]),
        ));
        assert_eq!(chart.categories.len(), 1);
        assert_eq!(chart.categories[0].values[0].value, Some(2.0));
        // "A/xx" plus the unknown tokenizer
        assert_eq!(chart.skipped, 2);
    }

    #[test]
    fn mixed_ranks_are_unavailable() {
        let one = LabeledArray::new(vec![1.0, 2.0], vec![2]).unwrap();
        let two = LabeledArray::new(vec![1.0; 6], vec![2, 3]).unwrap();
        let out = run(
            vec![
                MetricRef { name: "one", array: Some(&one) },
                MetricRef { name: "two", array: Some(&two) },
            ],
            &strings(&["A"]),
            &strings(&["en"]),
        );
        assert_eq!(
            out.reason(),
            Some("Bar chart metrics must share one dimensionality, got: one (1D), two (2D)")
        );
    }

    #[test]
    fn rank2_needs_languages() {
        let two = LabeledArray::new(vec![1.0; 6], vec![2, 3]).unwrap();
        let out = run(vec![MetricRef { name: "two", array: Some(&two) }], &strings(&["A"]), &[]);
        assert_eq!(out.reason(), Some("No languages selected"));
    }
}
