use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

/// Family reported when a language has no usable entry.
pub const UNKNOWN_FAMILY: &str = "unknown";

// ---------------------------------------------------------------------------
// LanguageInfo – one language's descriptive attributes
// ---------------------------------------------------------------------------

/// Per-language attributes. Used for filtering and labelling only, never for
/// array indexing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageInfo {
    pub continent: Option<String>,
    pub families: Vec<String>,
    pub fineweb2: Vec<String>,
    pub glottocodes: Vec<String>,
    pub morphology: Vec<String>,
    pub tier: Option<String>,
    pub speakers: Option<f64>,
}

impl LanguageInfo {
    fn from_json(val: &JsonValue) -> Self {
        let speakers = val
            .get("speaker")
            .or_else(|| val.get("speakers"))
            .and_then(parse_speakers);
        LanguageInfo {
            continent: val.get("continent").and_then(scalar_text),
            families: string_list(val.get("families")),
            fineweb2: string_list(val.get("fineweb2")),
            glottocodes: string_list(val.get("glottocodes")),
            morphology: string_list(val.get("morphology")),
            tier: val.get("tier").and_then(scalar_text),
            speakers,
        }
    }

    /// Attribute values by the name used in the metadata.
    pub fn attribute(&self, name: &str) -> Vec<String> {
        match name {
            "continent" => self.continent.iter().cloned().collect(),
            "families" => self.families.clone(),
            "fineweb2" => self.fineweb2.clone(),
            "glottocodes" => self.glottocodes.clone(),
            "morphology" => self.morphology.clone(),
            "tier" => self.tier.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// Attribute values come as a string, an array, or an object whose keys are
/// the values.
fn string_list(val: Option<&JsonValue>) -> Vec<String> {
    match val {
        Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(JsonValue::Object(map)) => map.keys().cloned().collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Speaker counts may be numbers or strings such as `"1,234,000"`.
fn parse_speakers(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| !v.is_nan())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LanguageLabel – parsed compound language code
// ---------------------------------------------------------------------------

/// A label such as `eng_Latn_stan1293`, split into its parts.
///
/// Three or more `_`-separated parts give `base` (everything but the last
/// two), `fineweb_key` (second to last) and `glottocode` (last). Shorter
/// labels are all base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLabel<'a> {
    pub base: String,
    pub fineweb_key: Option<&'a str>,
    pub glottocode: Option<&'a str>,
}

impl<'a> LanguageLabel<'a> {
    pub fn parse(label: &'a str) -> Self {
        let parts: Vec<&'a str> = label.split('_').collect();
        if parts.len() >= 3 {
            let n = parts.len();
            LanguageLabel {
                base: parts[..n - 2].join("_"),
                fineweb_key: Some(parts[n - 2]),
                glottocode: Some(parts[n - 1]),
            }
        } else {
            LanguageLabel {
                base: label.to_string(),
                fineweb_key: None,
                glottocode: None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LanguageTable – lookup over the metadata's language info
// ---------------------------------------------------------------------------

/// The language-info table shipped with a bundle.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    entries: BTreeMap<String, LanguageInfo>,
    categories: BTreeMap<String, Vec<String>>,
}

impl LanguageTable {
    /// Accepts `{ "languages": {...}, "categories": {...} }` or a flat
    /// `{ key: info }` map.
    pub fn from_json(root: &JsonValue) -> Self {
        let (languages, categories) = match root.get("languages") {
            Some(JsonValue::Object(langs)) => (Some(langs), root.get("categories")),
            _ => (root.as_object(), None),
        };

        let entries = languages
            .map(|langs| {
                langs
                    .iter()
                    .filter(|(_, v)| v.is_object())
                    .map(|(k, v)| (k.clone(), LanguageInfo::from_json(v)))
                    .collect()
            })
            .unwrap_or_default();

        let categories = categories
            .and_then(|c| c.as_object())
            .map(|c| {
                c.iter()
                    .map(|(name, vals)| {
                        let set: BTreeSet<String> = string_list(Some(vals)).into_iter().collect();
                        (name.clone(), set.into_iter().collect())
                    })
                    .collect()
            })
            .unwrap_or_default();

        LanguageTable {
            entries,
            categories,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry by exact table key.
    pub fn get(&self, key: &str) -> Option<&LanguageInfo> {
        self.entries.get(key)
    }

    /// Resolve a full language label: direct hit on its base, then the first
    /// entry listing the label's glottocode.
    pub fn lookup(&self, label: &str) -> Option<&LanguageInfo> {
        let parsed = LanguageLabel::parse(label);
        if let Some(info) = self.entries.get(&parsed.base) {
            return Some(info);
        }
        let glottocode = parsed.glottocode?;
        self.entries
            .values()
            .find(|info| info.glottocodes.iter().any(|g| g == glottocode))
    }

    /// First listed family of a language, or [`UNKNOWN_FAMILY`].
    pub fn family_of(&self, label: &str) -> String {
        self.lookup(label)
            .and_then(|info| info.families.first())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_FAMILY.to_string())
    }

    /// Sorted distinct values of one attribute, for filter pickers.
    pub fn category_values(&self, name: &str) -> Vec<String> {
        if let Some(listed) = self.categories.get(name) {
            return listed.clone();
        }
        let set: BTreeSet<String> = self
            .entries
            .values()
            .flat_map(|info| info.attribute(name))
            .collect();
        set.into_iter().collect()
    }

    /// Multi-line summary of a language, one attribute per line.
    pub fn describe(&self, label: &str) -> String {
        let parsed = LanguageLabel::parse(label);
        let mut rows = vec![format!("Language: {}", parsed.base)];
        let Some(info) = self.lookup(label) else {
            return rows.join("\n");
        };
        if let Some(c) = &info.continent {
            rows.push(format!("Continent: {c}"));
        }
        for (title, vals) in [
            ("Families", &info.families),
            ("Fineweb2", &info.fineweb2),
            ("Glottocodes", &info.glottocodes),
            ("Morphology", &info.morphology),
        ] {
            if !vals.is_empty() {
                rows.push(format!("{title}: {}", vals.join(", ")));
            }
        }
        if let Some(t) = &info.tier {
            rows.push(format!("Tier: {t}"));
        }
        if let Some(s) = info.speakers {
            rows.push(format!("Speakers: {s}"));
        }
        rows.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Display labels
// ---------------------------------------------------------------------------

/// Short display label for each full language code.
///
/// `code_script` when that prefix is unique across the list, otherwise
/// `code_script_glottocode`.
pub fn display_labels(languages: &[String]) -> BTreeMap<String, String> {
    let mut by_prefix: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for code in languages.iter().filter(|c| !c.is_empty()) {
        let parts: Vec<&str> = code.split('_').collect();
        let prefix = if parts.len() >= 2 {
            format!("{}_{}", parts[0], parts[1])
        } else {
            code.clone()
        };
        by_prefix.entry(prefix).or_default().push(code);
    }

    let mut map = BTreeMap::new();
    for (prefix, codes) in by_prefix {
        if let [only] = codes.as_slice() {
            map.insert((*only).clone(), prefix);
            continue;
        }
        for code in codes {
            let label = match code.split('_').nth(2) {
                Some(glotto) => format!("{prefix}_{glotto}"),
                None => code.clone(),
            };
            map.insert(code.clone(), label);
        }
    }
    map
}

/// Shorten both halves of an `a-b` pair label.
pub fn display_pair_label(pair: &str, labels: &BTreeMap<String, String>) -> String {
    let short = |code: &str| labels.get(code).cloned().unwrap_or_else(|| code.to_string());
    match pair.split_once('-') {
        Some((left, right)) => format!("{}-{}", short(left), short(right)),
        None => short(pair),
    }
}
