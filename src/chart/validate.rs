use std::collections::BTreeMap;

use super::{Cardinality, Constraints, MetricDimension};
use crate::data::model::Rank;

fn check_count(what: &str, count: usize, range: Cardinality, out: &mut Vec<String>) {
    if count < range.min {
        out.push(format!("Minimum {} {what}(s) required, got {count}", range.min));
    }
    if let Some(max) = range.max {
        if count > max {
            out.push(format!("Maximum {max} {what}(s) allowed, got {count}"));
        }
    }
}

/// Check a selection against a chart kind's constraints.
///
/// Returns violations in a fixed order (metric count, metric dimension,
/// tokenizer count, language count); empty means valid. Advisory only.
/// A metric with no entry in `dims` counts as a dimension mismatch.
pub fn validate(
    constraints: &Constraints,
    metrics: &[String],
    n_tokenizers: usize,
    n_languages: usize,
    dims: &BTreeMap<String, Rank>,
) -> Vec<String> {
    let mut violations = Vec::new();

    check_count("metric", metrics.len(), constraints.metrics, &mut violations);

    let required = constraints.dimension;
    if required != MetricDimension::Any {
        let wrong: Vec<&str> = metrics
            .iter()
            .filter(|m| !dims.get(*m).is_some_and(|r| required.admits(*r)))
            .map(String::as_str)
            .collect();
        if !wrong.is_empty() {
            violations.push(format!(
                "This visualization requires {required} metrics, but got: {}",
                wrong.join(", ")
            ));
        }
    }

    // 2D and 3D cells are addressed by language, whatever the kind allows.
    let mut languages = constraints.languages;
    if metrics.iter().any(|m| dims.get(m).is_some_and(|r| *r > Rank::One)) {
        languages.min = languages.min.max(1);
    }

    check_count("tokenizer", n_tokenizers, constraints.tokenizers, &mut violations);
    check_count("language", n_languages, languages, &mut violations);

    if !violations.is_empty() {
        log::debug!("selection has {} violation(s)", violations.len());
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;

    fn dims() -> BTreeMap<String, Rank> {
        [("vocab", Rank::One), ("ratio", Rank::Two), ("fertility", Rank::Two)]
            .into_iter()
            .map(|(k, r)| (k.to_string(), r))
            .collect()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn two_2d_metrics() -> Constraints {
        Constraints {
            metrics: Cardinality::exactly(2),
            dimension: MetricDimension::Exactly(Rank::Two),
            tokenizers: Cardinality::at_least(1),
            languages: Cardinality::at_least(1),
        }
    }

    #[test]
    fn valid_selection_has_no_violations() {
        let v = validate(&two_2d_metrics(), &names(&["ratio", "fertility"]), 2, 3, &dims());
        assert!(v.is_empty());
    }

    #[test]
    fn dimension_mismatch_names_the_metric() {
        let v = validate(&two_2d_metrics(), &names(&["vocab", "ratio"]), 1, 1, &dims());
        assert_eq!(v, vec!["This visualization requires 2D metrics, but got: vocab"]);
    }

    #[test]
    fn count_and_dimension_are_reported_together() {
        let v = validate(
            &two_2d_metrics(),
            &names(&["vocab", "ratio", "fertility"]),
            1,
            1,
            &dims(),
        );
        assert_eq!(
            v,
            vec![
                "Maximum 2 metric(s) allowed, got 3",
                "This visualization requires 2D metrics, but got: vocab",
            ]
        );
    }

    #[test]
    fn unknown_metric_is_a_dimension_mismatch() {
        let v = validate(&two_2d_metrics(), &names(&["ratio", "nope"]), 1, 1, &dims());
        assert_eq!(v, vec!["This visualization requires 2D metrics, but got: nope"]);
    }

    #[test]
    fn counts_checked_independently() {
        let c = ChartKind::MetricTable.constraints();
        let v = validate(&c, &[], 0, 0, &dims());
        assert_eq!(
            v,
            vec![
                "Minimum 1 metric(s) required, got 0",
                "Minimum 1 tokenizer(s) required, got 0",
                "Minimum 1 language(s) required, got 0",
            ]
        );
    }

    #[test]
    fn one_dimensional_metric_fails_table_and_scatter() {
        let v = validate(&ChartKind::MetricTable.constraints(), &names(&["vocab"]), 1, 1, &dims());
        assert_eq!(v, vec!["This visualization requires 2D or 3D metrics, but got: vocab"]);
        let v = validate(
            &ChartKind::MetricPairCorrelation.constraints(),
            &names(&["ratio", "fertility"]),
            1,
            1,
            &dims(),
        );
        assert!(v.is_empty());
    }

    #[test]
    fn bar_needs_languages_only_for_ranked_metrics() {
        let c = ChartKind::BarRanking.constraints();
        assert!(validate(&c, &names(&["vocab"]), 2, 0, &dims()).is_empty());
        assert_eq!(
            validate(&c, &names(&["ratio"]), 2, 0, &dims()),
            vec!["Minimum 1 language(s) required, got 0"]
        );
    }

    #[test]
    fn unbounded_max_never_fires() {
        let c = ChartKind::BarRanking.constraints();
        let many = names(&["vocab"; 40]);
        assert!(validate(&c, &many, 500, 0, &dims()).is_empty());
    }
}
