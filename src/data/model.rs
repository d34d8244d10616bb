use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::language::LanguageTable;
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Rank – number of axes of a metric array
// ---------------------------------------------------------------------------

/// Axis layout of a metric array.
///
/// * `One`   – `[tokenizer]`
/// * `Two`   – `[tokenizer, language]`
/// * `Three` – `[tokenizer, language, language]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    One,
    Two,
    Three,
}

impl Rank {
    pub fn from_ndim(ndim: usize) -> Option<Self> {
        match ndim {
            1 => Some(Rank::One),
            2 => Some(Rank::Two),
            3 => Some(Rank::Three),
            _ => None,
        }
    }

    pub fn ndim(self) -> usize {
        match self {
            Rank::One => 1,
            Rank::Two => 2,
            Rank::Three => 3,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.ndim())
    }
}

impl Serialize for Rank {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ndim() as u8)
    }
}

// ---------------------------------------------------------------------------
// LabeledArray – one metric's values
// ---------------------------------------------------------------------------

/// Number of cells a shape describes, `None` on overflow.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A flat row-major `f64` buffer plus its declared shape.
///
/// Constructed through [`LabeledArray::new`], which enforces
/// `buffer.len() == product(shape)` and a rank of 1–3. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    buffer: Vec<f64>,
    shape: Vec<usize>,
    rank: Rank,
}

impl LabeledArray {
    pub fn new(buffer: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        let rank = Rank::from_ndim(shape.len()).ok_or_else(|| {
            DataError::ShapeMismatch(format!(
                "expected 1 to 3 axes, got {} ({shape:?})",
                shape.len()
            ))
        })?;
        if shape.contains(&0) {
            return Err(DataError::ShapeMismatch(format!(
                "axis extents must be positive, got {shape:?}"
            )));
        }
        let expected = element_count(&shape).ok_or_else(|| {
            DataError::ShapeMismatch(format!("shape {shape:?} overflows the addressable size"))
        })?;
        if buffer.len() != expected {
            return Err(DataError::ShapeMismatch(format!(
                "buffer holds {} values but shape {shape:?} needs {expected}",
                buffer.len()
            )));
        }
        Ok(LabeledArray {
            buffer,
            shape,
            rank,
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Value at a flat offset; `None` past the end.
    pub fn get(&self, offset: usize) -> Option<f64> {
        self.buffer.get(offset).copied()
    }

    /// Check the declared axis extents against the label universe.
    ///
    /// Axis 0 must match the tokenizer count and every further axis the
    /// language count; otherwise offsets computed from the universe would
    /// address the wrong cells.
    pub fn check_universe(&self, universe: &LabelUniverse) -> Result<()> {
        let n_tok = universe.tokenizers().len();
        let n_lang = universe.languages().len();
        for (axis, &extent) in self.shape.iter().enumerate() {
            let (expected, what) = if axis == 0 {
                (n_tok, "tokenizers")
            } else {
                (n_lang, "languages")
            };
            if extent != expected {
                return Err(DataError::ShapeMismatch(format!(
                    "axis {axis} has extent {extent} but metadata lists {expected} {what}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LabelUniverse – authoritative index space
// ---------------------------------------------------------------------------

/// Full ordered tokenizer and language lists from the metadata.
///
/// Position `i` in either list is index `i` on the matching axis of every
/// array, regardless of what the user has selected.
#[derive(Debug, Clone, Default)]
pub struct LabelUniverse {
    tokenizers: Vec<String>,
    languages: Vec<String>,
    tokenizer_index: HashMap<String, usize>,
    language_index: HashMap<String, usize>,
}

impl LabelUniverse {
    pub fn new(tokenizers: Vec<String>, languages: Vec<String>) -> Self {
        let tokenizer_index = first_positions(&tokenizers);
        let language_index = first_positions(&languages);
        LabelUniverse {
            tokenizers,
            languages,
            tokenizer_index,
            language_index,
        }
    }

    pub fn tokenizers(&self) -> &[String] {
        &self.tokenizers
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn tokenizer_position(&self, name: &str) -> Option<usize> {
        self.tokenizer_index.get(name).copied()
    }

    pub fn language_position(&self, name: &str) -> Option<usize> {
        self.language_index.get(name).copied()
    }
}

/// Duplicate labels resolve to their first occurrence.
fn first_positions(labels: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        index.entry(label.clone()).or_insert(i);
    }
    index
}

// ---------------------------------------------------------------------------
// Metadata – the description half of a result bundle
// ---------------------------------------------------------------------------

/// Parsed metadata JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default = "unknown_name", alias = "datasetName")]
    pub dataset_name: String,
    #[serde(default)]
    pub tokenizers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Optional per-metric shape hints for flat result arrays.
    #[serde(default, alias = "metricShapes")]
    pub metric_shapes: BTreeMap<String, Vec<usize>>,
    #[serde(default, alias = "languagesInfo")]
    pub languages_info: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

// ---------------------------------------------------------------------------
// Dataset – one fully imported bundle
// ---------------------------------------------------------------------------

/// An imported bundle. Immutable once built; a re-import produces a new one.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub universe: LabelUniverse,
    /// Available metric names, metadata order first.
    pub metric_names: Vec<String>,
    pub metrics: BTreeMap<String, LabeledArray>,
    /// Metrics listed in the metadata but absent from the results payload.
    pub missing: Vec<String>,
    /// Arrays dropped at import time, with the reason.
    pub rejected: Vec<(String, String)>,
    pub languages_info: LanguageTable,
}

impl Dataset {
    pub fn metric(&self, name: &str) -> Option<&LabeledArray> {
        self.metrics.get(name)
    }

    /// Metric name → rank, for the available metrics.
    pub fn dimensionality(&self) -> BTreeMap<String, Rank> {
        self.metric_names
            .iter()
            .filter_map(|m| self.metrics.get(m).map(|a| (m.clone(), a.rank())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.metric_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metric_names.is_empty()
    }
}
