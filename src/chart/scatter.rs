use serde::{Serialize, Serializer};

use super::resolve::{resolve, Coordinate};
use super::trend::{self, LinearFit};
use super::{ChartData, ChartInputs};
use crate::color::{ColorMap, NEUTRAL};
use crate::data::float;
use crate::data::language::LanguageTable;
use crate::data::model::{LabelUniverse, LabeledArray, Rank};
use crate::error::DataError;
use crate::figure::{GroupBy, TrendlineMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScatterOptions {
    pub group_by: GroupBy,
    pub trendline: TrendlineMode,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Ordered language pair of a 3D metric, written as `"first-second"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub first: String,
    pub second: String,
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl Serialize for LanguagePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The language side of a point: one language (2D) or a pair (3D).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointLabel {
    Language(String),
    LanguagePair(LanguagePair),
}

impl PointLabel {
    /// Language used for per-language attributes such as family.
    pub fn primary_language(&self) -> &str {
        match self {
            PointLabel::Language(l) => l,
            PointLabel::LanguagePair(p) => &p.first,
        }
    }
}

impl std::fmt::Display for PointLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointLabel::Language(l) => f.write_str(l),
            PointLabel::LanguagePair(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub tokenizer: String,
    #[serde(flatten)]
    pub label: PointLabel,
    #[serde(serialize_with = "float::serialize")]
    pub x: f64,
    #[serde(serialize_with = "float::serialize")]
    pub y: f64,
}

impl ScatterPoint {
    /// Both coordinates finite, so the point can feed a trend fit.
    pub fn is_plottable(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterGroup {
    pub name: String,
    pub color: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendLine {
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub fit: LinearFit,
    pub endpoints: [[f64; 2]; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterChart {
    pub metric_x: String,
    pub metric_y: String,
    pub rank: Rank,
    pub group_by: GroupBy,
    pub groups: Vec<ScatterGroup>,
    pub trend_lines: Vec<TrendLine>,
    /// Coordinates dropped because a label is not in the universe.
    pub skipped: usize,
}

impl ScatterChart {
    pub fn points(&self) -> impl Iterator<Item = &ScatterPoint> {
        self.groups.iter().flat_map(|g| g.points.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Paired-metric scatter: one point per (tokenizer, language) or
/// (tokenizer, language pair) where both metrics resolve.
pub fn transform(inputs: &ChartInputs<'_>, options: &ScatterOptions) -> ChartData {
    if inputs.metrics.len() != 2 {
        return ChartData::unavailable(
            "Metric Pair Correlation requires exactly 2 metrics (X and Y axes)",
        );
    }
    let arrays = match inputs.arrays() {
        Ok(a) => a,
        Err(reason) => return ChartData::unavailable(reason),
    };
    let (name_x, x) = arrays[0];
    let (name_y, y) = arrays[1];
    if x.rank() != y.rank() || x.rank() == Rank::One {
        return ChartData::unavailable(format!(
            "Unsupported metric dimensionality: X is {}, Y is {}. Expected matching 2D or 3D metrics.",
            x.rank(),
            y.rank()
        ));
    }
    if let Err(reason) = inputs
        .require_tokenizers()
        .and_then(|_| inputs.require_languages())
    {
        return ChartData::unavailable(reason);
    }

    let (points, skipped) = collect_points(inputs, x, y);
    if skipped > 0 {
        log::warn!("scatter {name_x} vs {name_y}: {skipped} coordinate(s) dropped, label not in metadata");
    }
    log::debug!("scatter {name_x} vs {name_y}: {} points", points.len());

    let groups = group_points(points, options.group_by, inputs.languages_info);
    let trend_lines = trend_lines(&groups, options.trendline);

    ChartData::Scatter(ScatterChart {
        metric_x: name_x.to_string(),
        metric_y: name_y.to_string(),
        rank: x.rank(),
        group_by: options.group_by,
        groups,
        trend_lines,
        skipped,
    })
}

fn read_pair(
    universe: &LabelUniverse,
    x: &LabeledArray,
    y: &LabeledArray,
    coord: &Coordinate<'_>,
) -> Result<(f64, f64), DataError> {
    Ok((resolve(universe, x, coord)?, resolve(universe, y, coord)?))
}

fn collect_points(
    inputs: &ChartInputs<'_>,
    x: &LabeledArray,
    y: &LabeledArray,
) -> (Vec<ScatterPoint>, usize) {
    let mut points = Vec::new();
    let mut skipped = 0usize;

    for tokenizer in inputs.tokenizers {
        for first in inputs.languages {
            let cells: Vec<(PointLabel, Coordinate<'_>)> = if x.rank() == Rank::Two {
                vec![(
                    PointLabel::Language(first.clone()),
                    Coordinate::Language(tokenizer, first),
                )]
            } else {
                inputs
                    .languages
                    .iter()
                    .map(|second| {
                        let pair = LanguagePair {
                            first: first.clone(),
                            second: second.clone(),
                        };
                        (
                            PointLabel::LanguagePair(pair),
                            Coordinate::Pair(tokenizer, first, second),
                        )
                    })
                    .collect()
            };

            for (label, coord) in cells {
                match read_pair(inputs.universe, x, y, &coord) {
                    Ok((xv, yv)) => points.push(ScatterPoint {
                        tokenizer: tokenizer.clone(),
                        label,
                        x: xv,
                        y: yv,
                    }),
                    Err(err) => {
                        log::debug!("dropping {tokenizer}/{label}: {err}");
                        skipped += 1;
                    }
                }
            }
        }
    }
    (points, skipped)
}

fn group_key(point: &ScatterPoint, group_by: GroupBy, table: &LanguageTable) -> String {
    match group_by {
        GroupBy::Tokenizer => point.tokenizer.clone(),
        GroupBy::Language => point.label.to_string(),
        GroupBy::Family => table.family_of(point.label.primary_language()),
    }
}

/// Partition points by key, groups in first-appearance order.
fn group_points(points: Vec<ScatterPoint>, group_by: GroupBy, table: &LanguageTable) -> Vec<ScatterGroup> {
    let mut names: Vec<String> = Vec::new();
    let mut members: Vec<Vec<ScatterPoint>> = Vec::new();
    for point in points {
        let key = group_key(&point, group_by, table);
        match names.iter().position(|n| *n == key) {
            Some(i) => members[i].push(point),
            None => {
                names.push(key);
                members.push(vec![point]);
            }
        }
    }

    let colors = ColorMap::new(names.iter().cloned());
    names
        .into_iter()
        .zip(members)
        .map(|(name, points)| ScatterGroup {
            color: colors.color_for(&name),
            name,
            points,
        })
        .collect()
}

fn fit_points<'a>(points: impl Iterator<Item = &'a ScatterPoint>) -> Option<LinearFit> {
    trend::fit(points.filter(|p| p.is_plottable()).map(|p| (p.x, p.y)))
}

fn trend_lines(groups: &[ScatterGroup], mode: TrendlineMode) -> Vec<TrendLine> {
    let line = |name: String, color: String, fit: LinearFit| TrendLine {
        name,
        color,
        endpoints: fit.endpoints(),
        fit,
    };
    match mode {
        TrendlineMode::None => Vec::new(),
        TrendlineMode::Global => fit_points(groups.iter().flat_map(|g| g.points.iter()))
            .map(|fit| line("Trend (global)".to_string(), NEUTRAL.to_string(), fit))
            .into_iter()
            .collect(),
        TrendlineMode::Groups => groups
            .iter()
            .filter_map(|g| {
                fit_points(g.points.iter())
                    .map(|fit| line(format!("{} trend", g.name), g.color.clone(), fit))
            })
            .collect(),
    }
}
