use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::ChartKind;
use crate::chart::validate;
use crate::data::filter::LanguageFilter;
use crate::data::model::Rank;

/// Colour grouping for scatter points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Tokenizer,
    Language,
    Family,
}

/// Which trend lines a scatter chart carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendlineMode {
    #[default]
    None,
    Global,
    Groups,
}

/// One user-built figure. Lives only in memory for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureConfig {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "typeId")]
    pub kind: ChartKind,
    #[serde(default)]
    pub tokenizers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: LanguageFilter,
    #[serde(default)]
    pub lock_filters: bool,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trendline_mode: Option<TrendlineMode>,
    /// Older configs only carry this flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_trendline: Option<bool>,
}

impl FigureConfig {
    pub fn new(id: impl Into<String>, kind: ChartKind) -> Self {
        FigureConfig {
            id: id.into(),
            kind,
            tokenizers: Vec::new(),
            languages: Vec::new(),
            metrics: Vec::new(),
            filters: LanguageFilter::default(),
            lock_filters: false,
            group_by: GroupBy::default(),
            trendline_mode: None,
            show_trendline: None,
        }
    }

    /// Effective trend-line mode; the legacy flag maps to `Global`.
    pub fn trendline(&self) -> TrendlineMode {
        match (self.trendline_mode, self.show_trendline) {
            (Some(mode), _) => mode,
            (None, Some(true)) => TrendlineMode::Global,
            _ => TrendlineMode::None,
        }
    }

    /// Constraint violations for this figure's chart kind.
    pub fn violations(&self, dims: &BTreeMap<String, Rank>) -> Vec<String> {
        validate::validate(
            &self.kind.constraints(),
            &self.metrics,
            self.tokenizers.len(),
            self.languages.len(),
            dims,
        )
    }
}
