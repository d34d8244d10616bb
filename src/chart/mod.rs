/// Chart layer: resolve labels to cells and turn metric arrays into
/// renderer-agnostic chart data.
///
/// ```text
///   FigureConfig + Dataset
///          │
///          ▼
///   ┌──────────────┐   violations (advisory)
///   │  validate     │ ─────────────────────▶
///   └──────────────┘
///          │
///          ▼
///   ┌──────────────┐   ┌──────────┐
///   │  scatter      │   │ resolve  │  label → flat offset
///   │  table        │──▶│          │
///   │  bar          │   └──────────┘
///   └──────────────┘
///          │
///          ▼
///      ChartData
/// ```

pub mod bar;
pub mod resolve;
pub mod scatter;
pub mod table;
pub mod trend;
pub mod validate;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::language::LanguageTable;
use crate::data::model::{Dataset, LabelUniverse, LabeledArray, Rank};
use crate::error::DataError;
use crate::figure::FigureConfig;

pub use bar::BarChart;
pub use scatter::ScatterChart;
pub use table::MatrixTable;

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Inclusive count range; `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cardinality {
    pub min: usize,
    pub max: Option<usize>,
}

impl Cardinality {
    pub const fn exactly(n: usize) -> Self {
        Cardinality { min: n, max: Some(n) }
    }

    pub const fn at_least(n: usize) -> Self {
        Cardinality { min: n, max: None }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..={max}", self.min),
            None => write!(f, "{}+", self.min),
        }
    }
}

/// Dimensionality every selected metric must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDimension {
    Any,
    Exactly(Rank),
    /// The given rank or any higher one.
    AtLeast(Rank),
}

impl MetricDimension {
    pub fn admits(self, rank: Rank) -> bool {
        match self {
            MetricDimension::Any => true,
            MetricDimension::Exactly(r) => rank == r,
            MetricDimension::AtLeast(r) => rank >= r,
        }
    }
}

impl fmt::Display for MetricDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricDimension::Any => write!(f, "any"),
            MetricDimension::Exactly(r) => write!(f, "{r}"),
            MetricDimension::AtLeast(r) => {
                let ranks: Vec<String> = [Rank::One, Rank::Two, Rank::Three]
                    .into_iter()
                    .filter(|x| x >= r)
                    .map(|x| x.to_string())
                    .collect();
                match ranks.split_last() {
                    Some((last, rest)) if !rest.is_empty() => {
                        write!(f, "{} or {last}", rest.join(", "))
                    }
                    _ => f.write_str(&ranks.concat()),
                }
            }
        }
    }
}

impl Serialize for MetricDimension {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Constraints {
    pub metrics: Cardinality,
    pub dimension: MetricDimension,
    pub tokenizers: Cardinality,
    pub languages: Cardinality,
}

// ---------------------------------------------------------------------------
// ChartKind – the closed set of chart types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[serde(rename = "metric-pair-correlation")]
    MetricPairCorrelation,
    #[serde(rename = "metric-table")]
    MetricTable,
    #[serde(rename = "bar-ranking-correlation")]
    BarRanking,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::MetricPairCorrelation,
        ChartKind::MetricTable,
        ChartKind::BarRanking,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ChartKind::MetricPairCorrelation => "metric-pair-correlation",
            ChartKind::MetricTable => "metric-table",
            ChartKind::BarRanking => "bar-ranking-correlation",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChartKind::MetricPairCorrelation => "Metric Pair Correlation",
            ChartKind::MetricTable => "Metric Table",
            ChartKind::BarRanking => "Ranking Bar Chart",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChartKind::MetricPairCorrelation => {
                "Scatterplot showing the relationship between two selected metrics. \
                 Choose X and Y axes, tokenizers, and languages."
            }
            ChartKind::MetricTable => {
                "Table displaying a metric matrix with rows as tokenizers and columns as \
                 languages (or language-pairs for 3D metrics)."
            }
            ChartKind::BarRanking => {
                "Bar chart comparing tokenizers across one or more metrics of the same \
                 dimensionality."
            }
        }
    }

    pub fn constraints(self) -> Constraints {
        match self {
            ChartKind::MetricPairCorrelation => Constraints {
                metrics: Cardinality::exactly(2),
                dimension: MetricDimension::AtLeast(Rank::Two),
                tokenizers: Cardinality::at_least(1),
                languages: Cardinality::at_least(1),
            },
            ChartKind::MetricTable => Constraints {
                metrics: Cardinality::exactly(1),
                dimension: MetricDimension::AtLeast(Rank::Two),
                tokenizers: Cardinality::at_least(1),
                languages: Cardinality::at_least(1),
            },
            ChartKind::BarRanking => Constraints {
                metrics: Cardinality::at_least(1),
                dimension: MetricDimension::Any,
                tokenizers: Cardinality::at_least(1),
                languages: Cardinality::at_least(0),
            },
        }
    }

    /// Whether a metric of rank `rank` can feed this chart.
    pub fn accepts_rank(self, rank: Rank) -> bool {
        self.constraints().dimension.admits(rank)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChartKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.id() == s)
            .ok_or_else(|| DataError::UnknownChartKind(s.to_string()))
    }
}

/// Available metrics a chart kind can use, in dataset order.
pub fn metrics_for(kind: ChartKind, dims: &BTreeMap<String, Rank>, order: &[String]) -> Vec<String> {
    order
        .iter()
        .filter(|m| dims.get(*m).is_some_and(|r| kind.accepts_rank(*r)))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Transform inputs and outputs
// ---------------------------------------------------------------------------

/// A selected metric name and its array, if the dataset has one.
#[derive(Debug, Clone, Copy)]
pub struct MetricRef<'a> {
    pub name: &'a str,
    pub array: Option<&'a LabeledArray>,
}

/// Everything a transform reads. Borrowed, never mutated.
#[derive(Debug, Clone)]
pub struct ChartInputs<'a> {
    pub universe: &'a LabelUniverse,
    pub tokenizers: &'a [String],
    pub languages: &'a [String],
    pub metrics: Vec<MetricRef<'a>>,
    pub languages_info: &'a LanguageTable,
}

impl<'a> ChartInputs<'a> {
    pub fn new(dataset: &'a Dataset, figure: &'a FigureConfig) -> Self {
        ChartInputs {
            universe: &dataset.universe,
            tokenizers: &figure.tokenizers,
            languages: &figure.languages,
            metrics: figure
                .metrics
                .iter()
                .map(|m| MetricRef {
                    name: m,
                    array: dataset.metric(m),
                })
                .collect(),
            languages_info: &dataset.languages_info,
        }
    }

    /// Every selected array, checked against the universe.
    ///
    /// The error string is the diagnostic shown in place of the chart.
    pub(crate) fn arrays(&self) -> Result<Vec<(&'a str, &'a LabeledArray)>, String> {
        self.metrics
            .iter()
            .map(|m| {
                let array = m
                    .array
                    .ok_or_else(|| format!("Metric \"{}\" not found in loaded data", m.name))?;
                array
                    .check_universe(self.universe)
                    .map_err(|e| format!("Metric \"{}\": {e}", m.name))?;
                Ok((m.name, array))
            })
            .collect()
    }

    pub(crate) fn require_tokenizers(&self) -> Result<(), String> {
        if self.tokenizers.is_empty() {
            return Err("No tokenizers selected".to_string());
        }
        Ok(())
    }

    pub(crate) fn require_languages(&self) -> Result<(), String> {
        if self.languages.is_empty() {
            return Err("No languages selected".to_string());
        }
        Ok(())
    }
}

/// Output of any transform.
///
/// `Unavailable` replaces the chart when inputs are unusable; callers show
/// its `reason` as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChartData {
    Scatter(ScatterChart),
    Table(MatrixTable),
    Bar(BarChart),
    Unavailable { reason: String },
}

impl ChartData {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::debug!("chart unavailable: {reason}");
        ChartData::Unavailable { reason }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, ChartData::Unavailable { .. })
    }

    /// The diagnostic, when the chart could not be built.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ChartData::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Build the chart for `figure` over `dataset`.
pub fn render(dataset: &Dataset, figure: &FigureConfig) -> ChartData {
    let inputs = ChartInputs::new(dataset, figure);
    match figure.kind {
        ChartKind::MetricPairCorrelation => {
            let options = scatter::ScatterOptions {
                group_by: figure.group_by,
                trendline: figure.trendline(),
            };
            scatter::transform(&inputs, &options)
        }
        ChartKind::MetricTable => table::transform(&inputs),
        ChartKind::BarRanking => bar::transform(&inputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ids_round_trip_through_from_str() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.id().parse::<ChartKind>().unwrap(), kind);
        }
        assert_eq!(
            "heatmap".parse::<ChartKind>(),
            Err(DataError::UnknownChartKind("heatmap".into()))
        );
    }

    #[test]
    fn cardinality_display() {
        assert_eq!(Cardinality::exactly(2).to_string(), "2");
        assert_eq!(Cardinality::at_least(1).to_string(), "1+");
        assert_eq!(Cardinality { min: 1, max: Some(3) }.to_string(), "1..=3");
    }

    #[test]
    fn dimension_display_and_admission() {
        assert_eq!(MetricDimension::AtLeast(Rank::Two).to_string(), "2D or 3D");
        assert_eq!(MetricDimension::AtLeast(Rank::One).to_string(), "1D, 2D or 3D");
        assert_eq!(MetricDimension::AtLeast(Rank::Three).to_string(), "3D");
        assert!(!MetricDimension::AtLeast(Rank::Two).admits(Rank::One));
        assert!(MetricDimension::Exactly(Rank::Three).admits(Rank::Three));
    }

    #[test]
    fn metric_pickers_filter_by_rank() {
        let dims: BTreeMap<String, Rank> = [
            ("vocab".to_string(), Rank::One),
            ("ratio".to_string(), Rank::Two),
            ("jsd".to_string(), Rank::Three),
        ]
        .into_iter()
        .collect();
        let order: Vec<String> = ["vocab", "ratio", "jsd", "gone"].iter().map(|s| s.to_string()).collect();
        assert_eq!(metrics_for(ChartKind::MetricTable, &dims, &order), vec!["ratio", "jsd"]);
        assert_eq!(metrics_for(ChartKind::BarRanking, &dims, &order), vec!["vocab", "ratio", "jsd"]);
    }
}
