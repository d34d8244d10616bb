use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chart::{self, ChartData, ChartKind};
use crate::data::archive::Converter;
use crate::data::filter::auto_select;
use crate::data::loader::{import_bundle, BundleSources};
use crate::data::model::Dataset;
use crate::figure::FigureConfig;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything a dashboard session holds, independent of rendering.
#[derive(Default)]
pub struct Session {
    /// Loaded dataset (None until the first successful import). Swapped
    /// whole on re-import so earlier readers keep a consistent view.
    pub dataset: Option<Arc<Dataset>>,

    /// Figures in display order.
    pub figures: Vec<FigureConfig>,

    /// Status / error message of the last import.
    pub status_message: Option<String>,

    next_figure: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a bundle from disk, keeping the current dataset on failure.
    pub fn import(&mut self, sources: &BundleSources, converter: &Converter) -> Result<Arc<Dataset>> {
        match import_bundle(sources, converter) {
            Ok(dataset) => Ok(self.set_dataset(dataset)),
            Err(err) => {
                log::error!("import failed: {err:#}");
                self.status_message = Some(format!("Import failed: {err:#}"));
                Err(err)
            }
        }
    }

    /// Install a freshly built dataset.
    pub fn set_dataset(&mut self, dataset: Dataset) -> Arc<Dataset> {
        let mut message = format!(
            "Loaded {}: {} tokenizers, {} languages, {} metrics",
            dataset.name,
            dataset.universe.tokenizers().len(),
            dataset.universe.languages().len(),
            dataset.len()
        );
        if !dataset.missing.is_empty() {
            message.push_str(&format!(" (missing from results: {})", dataset.missing.join(", ")));
        }
        let dataset = Arc::new(dataset);
        self.dataset = Some(Arc::clone(&dataset));
        self.status_message = Some(message);
        dataset
    }

    /// Snapshot of the current dataset.
    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.dataset.clone()
    }

    /// Add a figure with default selections for `kind` and return its id.
    ///
    /// Defaults: every tokenizer, the first language, and the first metrics
    /// the kind can use.
    pub fn add_figure(&mut self, kind: ChartKind) -> String {
        self.next_figure += 1;
        let id = format!("figure-{}", self.next_figure);
        let mut figure = FigureConfig::new(id.clone(), kind);

        if let Some(ds) = &self.dataset {
            figure.tokenizers = ds.universe.tokenizers().to_vec();
            figure.languages = ds.universe.languages().iter().take(1).cloned().collect();
            let wanted = kind.constraints().metrics.min.max(1);
            figure.metrics = chart::metrics_for(kind, &ds.dimensionality(), &ds.metric_names)
                .into_iter()
                .take(wanted)
                .collect();
        }
        self.figures.push(figure);
        id
    }

    pub fn figure(&self, id: &str) -> Option<&FigureConfig> {
        self.figures.iter().find(|f| f.id == id)
    }

    /// Replace a figure by id. Applies the figure's language filters unless
    /// they are locked.
    pub fn update_figure(&mut self, mut figure: FigureConfig) -> Result<()> {
        if let Some(ds) = &self.dataset {
            if let Some(langs) = auto_select(
                ds.universe.languages(),
                &ds.languages_info,
                &figure.filters,
                figure.lock_filters,
            ) {
                figure.languages = langs;
            }
        }
        let slot = self
            .figures
            .iter_mut()
            .find(|f| f.id == figure.id)
            .with_context(|| format!("no figure with id {}", figure.id))?;
        *slot = figure;
        Ok(())
    }

    pub fn remove_figure(&mut self, id: &str) -> bool {
        let before = self.figures.len();
        self.figures.retain(|f| f.id != id);
        self.figures.len() != before
    }

    /// Chart data for one figure.
    pub fn render(&self, id: &str) -> ChartData {
        let Some(figure) = self.figure(id) else {
            return ChartData::unavailable(format!("Figure {id} not found"));
        };
        match &self.dataset {
            Some(ds) => chart::render(ds, figure),
            None => ChartData::unavailable("No dataset loaded"),
        }
    }

    /// Constraint violations for one figure; empty when valid.
    pub fn validate(&self, id: &str) -> Vec<String> {
        let Some(figure) = self.figure(id) else {
            return vec![format!("Figure {id} not found")];
        };
        let dims = self
            .dataset
            .as_ref()
            .map(|ds| ds.dimensionality())
            .unwrap_or_default();
        figure.violations(&dims)
    }
}
