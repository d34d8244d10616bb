use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value as JsonValue};

use super::archive::Converter;
use super::float::decode_number;
use super::language::LanguageTable;
use super::model::{element_count, Dataset, LabelUniverse, LabeledArray, Metadata};

/// Key the converter uses to report a parse failure instead of data.
pub const ERROR_KEY: &str = "__error__";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// The files making up one import.
#[derive(Debug, Clone)]
pub struct BundleSources {
    pub metadata: PathBuf,
    /// Either converter output (`.json`) or a raw archive handed to the
    /// converter.
    pub results: PathBuf,
    /// Optional standalone language-info table; overrides the metadata's.
    pub languages_info: Option<PathBuf>,
}

/// Import a full bundle from disk.
///
/// Fails on unreadable or malformed files and on converter errors. Individual
/// arrays that break the shape invariant are dropped and listed in
/// [`Dataset::rejected`].
pub fn import_bundle(sources: &BundleSources, converter: &Converter) -> Result<Dataset> {
    let metadata = load_metadata(&sources.metadata)?;

    let results = if has_extension(&sources.results, "json") {
        let text = std::fs::read_to_string(&sources.results)
            .with_context(|| format!("reading results file {}", sources.results.display()))?;
        serde_json::from_str(&text).context("parsing results JSON")?
    } else {
        converter.convert(&sources.results)?
    };

    let languages_info = match &sources.languages_info {
        Some(path) => Some(load_json(path).context("reading language info")?),
        None => None,
    };

    build_dataset(metadata, &results, languages_info.as_ref())
}

/// Parse the metadata JSON file.
pub fn load_metadata(path: &Path) -> Result<Metadata> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading metadata file {}", path.display()))?;
    let metadata: Metadata = serde_json::from_str(&text).context("parsing metadata JSON")?;
    if metadata.tokenizers.is_empty() {
        log::warn!("metadata lists no tokenizers");
    }
    Ok(metadata)
}

fn load_json(path: &Path) -> Result<JsonValue> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

// ---------------------------------------------------------------------------
// Dataset assembly
// ---------------------------------------------------------------------------

/// Combine metadata and a parsed results payload into a [`Dataset`].
pub fn build_dataset(
    metadata: Metadata,
    results: &JsonValue,
    languages_info: Option<&JsonValue>,
) -> Result<Dataset> {
    let universe = LabelUniverse::new(metadata.tokenizers.clone(), metadata.languages.clone());
    let parsed = parse_results(results, &universe, &metadata.metric_shapes)?;

    let mut metrics = BTreeMap::new();
    let mut rejected = parsed.rejected;
    for (name, array) in parsed.arrays {
        match array.check_universe(&universe) {
            Ok(()) => {
                metrics.insert(name, array);
            }
            Err(err) => {
                log::warn!("rejecting metric {name}: {err}");
                rejected.push((name, err.to_string()));
            }
        }
    }

    let (metric_names, missing): (Vec<String>, Vec<String>) = if metadata.metrics.is_empty() {
        (parsed.order.into_iter().filter(|m| metrics.contains_key(m)).collect(), Vec::new())
    } else {
        metadata
            .metrics
            .iter()
            .cloned()
            .partition(|m| metrics.contains_key(m))
    };
    if !missing.is_empty() {
        log::warn!("metrics listed in metadata but missing from results: {missing:?}");
    }

    let languages_info = languages_info
        .or(metadata.languages_info.as_ref())
        .map(LanguageTable::from_json)
        .unwrap_or_default();

    for name in &metric_names {
        if let Some(a) = metrics.get(name) {
            log::debug!("metric {name}: {} shape {:?}", a.rank(), a.shape());
        }
    }
    log::info!(
        "imported dataset {:?}: {} tokenizers, {} languages, {} metrics",
        metadata.dataset_name,
        universe.tokenizers().len(),
        universe.languages().len(),
        metric_names.len()
    );

    Ok(Dataset {
        name: metadata.dataset_name,
        universe,
        metric_names,
        metrics,
        missing,
        rejected,
        languages_info,
    })
}

// ---------------------------------------------------------------------------
// Results payload
// ---------------------------------------------------------------------------

/// Arrays decoded from a results payload.
#[derive(Debug, Default)]
pub struct ParsedResults {
    pub arrays: BTreeMap<String, LabeledArray>,
    /// Key order of the decoded arrays.
    pub order: Vec<String>,
    pub rejected: Vec<(String, String)>,
}

/// Decode the converter's JSON object into labelled arrays.
///
/// Per key the value may be a nested array (shape from nesting), a flat
/// array (shape from `hints` or the universe sizes) or an object
/// `{ data, shape, dtype }`. Other values are ignored. A top-level
/// [`ERROR_KEY`] fails the whole payload.
pub fn parse_results(
    results: &JsonValue,
    universe: &LabelUniverse,
    hints: &BTreeMap<String, Vec<usize>>,
) -> Result<ParsedResults> {
    let obj = results
        .as_object()
        .context("Expected top-level JSON object in results")?;

    if let Some(err) = obj.get(ERROR_KEY) {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        bail!("converter error: {msg}");
    }

    let mut parsed = ParsedResults::default();
    for (name, value) in obj {
        let decoded = match value {
            JsonValue::Array(_) => decode_array(value, universe, hints.get(name)),
            JsonValue::Object(map) if map.contains_key("data") => decode_object(map),
            _ => {
                log::debug!("skipping non-array entry {name}");
                continue;
            }
        };
        match decoded {
            Ok(array) => {
                parsed.order.push(name.clone());
                parsed.arrays.insert(name.clone(), array);
            }
            Err(err) => {
                log::warn!("rejecting metric {name}: {err:#}");
                parsed.rejected.push((name.clone(), format!("{err:#}")));
            }
        }
    }
    Ok(parsed)
}

fn decode_object(map: &Map<String, JsonValue>) -> Result<LabeledArray> {
    let data = map
        .get("data")
        .and_then(|d| d.as_array())
        .context("'data' is not an array")?;
    let shape = match map.get("shape") {
        Some(JsonValue::Array(dims)) => dims
            .iter()
            .map(|d| {
                d.as_u64()
                    .map(|d| d as usize)
                    .with_context(|| format!("shape entry {d} is not a non-negative integer"))
            })
            .collect::<Result<Vec<usize>>>()?,
        Some(_) => bail!("'shape' is not an array"),
        None => vec![data.len()],
    };
    if let Some(dtype) = map.get("dtype").and_then(|d| d.as_str()) {
        log::trace!("decoding {dtype} array with shape {shape:?}");
    }
    let buffer = decode_flat(data)?;
    Ok(LabeledArray::new(buffer, shape)?)
}

fn decode_array(
    value: &JsonValue,
    universe: &LabelUniverse,
    hint: Option<&Vec<usize>>,
) -> Result<LabeledArray> {
    let items = value.as_array().context("expected an array")?;
    let nested = items.first().is_some_and(|v| v.is_array());

    if nested {
        let shape = nested_shape(value);
        let mut buffer = Vec::new();
        flatten_into(value, &shape, &mut buffer)?;
        return Ok(LabeledArray::new(buffer, shape)?);
    }

    let buffer = decode_flat(items)?;
    let shape = match hint {
        Some(h) => h.clone(),
        None => infer_flat_shape(buffer.len(), universe),
    };
    Ok(LabeledArray::new(buffer, shape)?)
}

/// Shape implied by following the first element down each nesting level.
fn nested_shape(value: &JsonValue) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut cur = value;
    while let JsonValue::Array(items) = cur {
        shape.push(items.len());
        match items.first() {
            Some(first) => cur = first,
            None => break,
        }
    }
    shape
}

/// Row-major flatten, checking every sub-array against `shape`.
fn flatten_into(value: &JsonValue, shape: &[usize], out: &mut Vec<f64>) -> Result<()> {
    match (value, shape.split_first()) {
        (JsonValue::Array(items), Some((&extent, rest))) => {
            if items.len() != extent {
                bail!("ragged array: expected {extent} items, found {}", items.len());
            }
            for item in items {
                flatten_into(item, rest, out)?;
            }
            Ok(())
        }
        (JsonValue::Array(_), None) => bail!("ragged array: nesting deeper than {shape:?}"),
        (cell, Some(_)) => bail!("ragged array: found {cell} where a sub-array was expected"),
        (cell, None) => {
            let v = decode_number(cell).with_context(|| format!("{cell} is not a number"))?;
            out.push(v);
            Ok(())
        }
    }
}

fn decode_flat(items: &[JsonValue]) -> Result<Vec<f64>> {
    items
        .iter()
        .enumerate()
        .map(|(j, v)| decode_number(v).with_context(|| format!("[{j}]: {v} is not a number")))
        .collect()
}

/// Guess the shape of a flat array from the universe sizes, lowest rank
/// first. Falls back to a plain 1D array.
fn infer_flat_shape(len: usize, universe: &LabelUniverse) -> Vec<usize> {
    let t = universe.tokenizers().len();
    let l = universe.languages().len();
    if len == t {
        vec![t]
    } else if t > 0 && l > 0 && element_count(&[t, l]) == Some(len) {
        vec![t, l]
    } else if t > 0 && l > 0 && element_count(&[t, l, l]) == Some(len) {
        vec![t, l, l]
    } else {
        vec![len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Rank;
    use serde_json::json;

    fn universe() -> LabelUniverse {
        LabelUniverse::new(
            vec!["A".into(), "B".into()],
            vec!["en".into(), "fr".into(), "de".into()],
        )
    }

    fn metadata(metrics: &[&str]) -> Metadata {
        Metadata {
            dataset_name: "test".into(),
            tokenizers: vec!["A".into(), "B".into()],
            languages: vec!["en".into(), "fr".into(), "de".into()],
            metrics: metrics.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn nested_arrays_infer_shape() {
        let payload = json!({
            "vocab": [100, 200],
            "ratio": [[1, 2, 3], [4, 5, "NaN"]],
        });
        let parsed = parse_results(&payload, &universe(), &BTreeMap::new()).unwrap();
        assert_eq!(parsed.arrays["vocab"].rank(), Rank::One);
        let ratio = &parsed.arrays["ratio"];
        assert_eq!(ratio.shape(), &[2, 3]);
        assert!(ratio.get(5).unwrap().is_nan());
    }

    #[test]
    fn ragged_array_is_rejected_alone() {
        let payload = json!({
            "good": [[1, 2, 3], [4, 5, 6]],
            "bad": [[1, 2, 3], [4, 5]],
        });
        let parsed = parse_results(&payload, &universe(), &BTreeMap::new()).unwrap();
        assert!(parsed.arrays.contains_key("good"));
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].0, "bad");
    }

    #[test]
    fn flat_arrays_use_hints_then_universe() {
        let mut hints = BTreeMap::new();
        hints.insert("hinted".to_string(), vec![3, 2]);
        let payload = json!({
            "hinted": [1, 2, 3, 4, 5, 6],
            "pairs": vec![0.5; 18],
            "odd": [1, 2, 3, 4, 5],
        });
        let parsed = parse_results(&payload, &universe(), &hints).unwrap();
        assert_eq!(parsed.arrays["hinted"].shape(), &[3, 2]);
        assert_eq!(parsed.arrays["pairs"].shape(), &[2, 3, 3]);
        assert_eq!(parsed.arrays["odd"].shape(), &[5]);
    }

    #[test]
    fn object_form_and_scalars() {
        let payload = json!({
            "entropy": {"data": [1, 2, 3, 4, 5, "Infinity"], "shape": [2, 3], "dtype": "float64"},
            "note": "some string",
            "count": 3,
        });
        let parsed = parse_results(&payload, &universe(), &BTreeMap::new()).unwrap();
        assert_eq!(parsed.order, vec!["entropy".to_string()]);
        assert_eq!(parsed.arrays["entropy"].get(5), Some(f64::INFINITY));
    }

    #[test]
    fn converter_error_aborts() {
        let payload = json!({"__error__": "Failed to load NPZ: bad zip"});
        let err = parse_results(&payload, &universe(), &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("bad zip"));
    }

    #[test]
    fn overflowing_shapes_are_rejected_not_fatal() {
        let payload = json!({
            "huge": {"data": [], "shape": [4294967296u64, 4294967296u64, 2]},
            "hinted": [1.0, 2.0],
            "fine": [1, 2],
        });
        let mut hints = BTreeMap::new();
        hints.insert("hinted".to_string(), vec![usize::MAX, 2]);
        let parsed = parse_results(&payload, &universe(), &hints).unwrap();

        assert!(parsed.arrays.contains_key("fine"));
        let mut rejected: Vec<&str> = parsed.rejected.iter().map(|(n, _)| n.as_str()).collect();
        rejected.sort();
        assert_eq!(rejected, vec!["hinted", "huge"]);
        assert!(parsed.rejected.iter().all(|(_, why)| why.contains("overflows")));
    }

    #[test]
    fn dataset_prefers_metadata_order_and_tracks_missing() {
        let payload = json!({
            "b": [[1, 2, 3], [4, 5, 6]],
            "a": [7, 8],
            "wrong_extent": [[1, 2], [3, 4]],
        });
        let ds = build_dataset(metadata(&["a", "b", "c"]), &payload, None).unwrap();
        assert_eq!(ds.metric_names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ds.missing, vec!["c".to_string()]);
        assert_eq!(ds.rejected.len(), 1);
        assert_eq!(ds.dimensionality()["b"], Rank::Two);
    }

    #[test]
    fn dataset_without_metric_list_uses_payload_order() {
        let payload: JsonValue = serde_json::from_str(r#"{"zipf": [1, 2], "avg_len": [3, 4]}"#).unwrap();
        let ds = build_dataset(metadata(&[]), &payload, None).unwrap();
        assert_eq!(ds.metric_names, vec!["zipf".to_string(), "avg_len".to_string()]);
        assert!(ds.missing.is_empty());
    }
}
