use serde::{Deserialize, Serialize};

use super::language::{LanguageInfo, LanguageLabel, LanguageTable};

// ---------------------------------------------------------------------------
// Filter predicate over language attributes
// ---------------------------------------------------------------------------

/// Comparison applied to a language's speaker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakerOp {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeakerThreshold {
    pub op: SpeakerOp,
    pub value: f64,
}

/// Active language filters. Empty lists and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LanguageFilter {
    pub continent: Option<String>,
    pub families: Vec<String>,
    pub fineweb2: Vec<String>,
    pub glottocodes: Vec<String>,
    pub morphology: Vec<String>,
    pub tier: Option<String>,
    pub speakers: Option<SpeakerThreshold>,
}

impl LanguageFilter {
    pub fn is_active(&self) -> bool {
        self.continent.is_some()
            || !self.families.is_empty()
            || !self.fineweb2.is_empty()
            || !self.glottocodes.is_empty()
            || !self.morphology.is_empty()
            || self.tier.is_some()
            || self.speakers.is_some()
    }
}

fn any_selected(selected: &[String], values: &[String]) -> bool {
    selected.iter().any(|s| values.contains(s))
}

/// Whether a language label passes every active filter.
///
/// The label's own fineweb key and glottocode take precedence over the table
/// values for those two filters. A language without a table entry fails any
/// attribute filter.
pub fn matches_filters(label: &str, table: &LanguageTable, filter: &LanguageFilter) -> bool {
    let parsed = LanguageLabel::parse(label);
    let fallback = LanguageInfo::default();
    let info = table.lookup(label).unwrap_or(&fallback);

    if let Some(continent) = &filter.continent {
        if info.continent.as_ref() != Some(continent) {
            return false;
        }
    }
    if !filter.families.is_empty() && !any_selected(&filter.families, &info.families) {
        return false;
    }
    if !filter.fineweb2.is_empty() {
        let pass = match parsed.fineweb_key {
            Some(key) => filter.fineweb2.iter().any(|k| k == key),
            None => any_selected(&filter.fineweb2, &info.fineweb2),
        };
        if !pass {
            return false;
        }
    }
    if !filter.glottocodes.is_empty() {
        let pass = match parsed.glottocode {
            Some(code) => filter.glottocodes.iter().any(|g| g == code),
            None => any_selected(&filter.glottocodes, &info.glottocodes),
        };
        if !pass {
            return false;
        }
    }
    if !filter.morphology.is_empty() && !any_selected(&filter.morphology, &info.morphology) {
        return false;
    }
    if let Some(tier) = &filter.tier {
        if info.tier.as_ref() != Some(tier) {
            return false;
        }
    }
    if let Some(threshold) = filter.speakers {
        let Some(n) = info.speakers else {
            return false;
        };
        if threshold.value.is_nan() {
            return false;
        }
        let pass = match threshold.op {
            SpeakerOp::AtLeast => n >= threshold.value,
            SpeakerOp::AtMost => n <= threshold.value,
        };
        if !pass {
            return false;
        }
    }
    true
}

/// Recompute the language selection from the filters.
///
/// Returns `None` when the selection should stay as it is: filters locked,
/// or no filter active. Otherwise the matching languages in universe order.
pub fn auto_select(
    languages: &[String],
    table: &LanguageTable,
    filter: &LanguageFilter,
    locked: bool,
) -> Option<Vec<String>> {
    if locked || !filter.is_active() {
        return None;
    }
    let matches: Vec<String> = languages
        .iter()
        .filter(|l| matches_filters(l, table, filter))
        .cloned()
        .collect();
    log::debug!("filters matched {} of {} languages", matches.len(), languages.len());
    Some(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> LanguageTable {
        LanguageTable::from_json(&json!({
            "eng": {"continent": "Europe", "families": ["Indo-European"], "morphology": "fusional", "tier": 5, "speakers": 1.5e9},
            "swh": {"continent": "Africa", "families": ["Niger-Congo"], "morphology": ["agglutinative"], "tier": 2, "speakers": "16,000,000"},
            "fin": {"continent": "Europe", "families": ["Uralic"], "morphology": ["agglutinative"], "tier": 4}
        }))
    }

    fn langs() -> Vec<String> {
        ["eng_Latn_stan1293", "swh_Latn_swah1253", "fin_Latn_finn1318", "xxx_Latn_none0000"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn empty_filter_passes_everything_but_is_inactive() {
        let f = LanguageFilter::default();
        assert!(!f.is_active());
        assert!(langs().iter().all(|l| matches_filters(l, &table(), &f)));
        assert_eq!(auto_select(&langs(), &table(), &f, false), None);
    }

    #[test]
    fn continent_and_morphology_combine() {
        let f = LanguageFilter {
            continent: Some("Europe".into()),
            morphology: vec!["agglutinative".into()],
            ..Default::default()
        };
        let picked = auto_select(&langs(), &table(), &f, false).unwrap();
        assert_eq!(picked, vec!["fin_Latn_finn1318".to_string()]);
    }

    #[test]
    fn label_glottocode_wins_over_table() {
        let f = LanguageFilter {
            glottocodes: vec!["swah1253".into()],
            ..Default::default()
        };
        assert!(matches_filters("swh_Latn_swah1253", &table(), &f));
        assert!(!matches_filters("eng_Latn_stan1293", &table(), &f));
    }

    #[test]
    fn speaker_threshold_requires_known_count() {
        let f = LanguageFilter {
            speakers: Some(SpeakerThreshold { op: SpeakerOp::AtLeast, value: 1e7 }),
            ..Default::default()
        };
        let picked = auto_select(&langs(), &table(), &f, false).unwrap();
        assert_eq!(picked, vec!["eng_Latn_stan1293".to_string(), "swh_Latn_swah1253".to_string()]);

        let f = LanguageFilter {
            speakers: Some(SpeakerThreshold { op: SpeakerOp::AtMost, value: 1e8 }),
            ..Default::default()
        };
        assert!(matches_filters("swh_Latn_swah1253", &table(), &f));
        assert!(!matches_filters("fin_Latn_finn1318", &table(), &f));
    }

    #[test]
    fn tier_compares_as_text() {
        let f = LanguageFilter { tier: Some("2".into()), ..Default::default() };
        assert!(matches_filters("swh_Latn_swah1253", &table(), &f));
        assert!(!matches_filters("eng_Latn_stan1293", &table(), &f));
    }

    #[test]
    fn locked_filters_leave_selection_alone() {
        let f = LanguageFilter { continent: Some("Africa".into()), ..Default::default() };
        assert_eq!(auto_select(&langs(), &table(), &f, true), None);
    }

    #[test]
    fn filter_deserialises_from_camel_case() {
        let f: LanguageFilter =
            serde_json::from_str(r#"{"families": ["Uralic"], "speakers": {"op": ">=", "value": 10}}"#)
                .unwrap();
        assert_eq!(f.families, vec!["Uralic".to_string()]);
        assert_eq!(f.speakers.unwrap().op, SpeakerOp::AtLeast);
    }
}
