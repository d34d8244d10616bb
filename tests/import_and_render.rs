//! End-to-end: bundle files on disk → session import → chart data.

use std::path::Path;

use serde_json::json;
use tempfile::tempdir;
use tokviz::chart::{ChartData, ChartKind};
use tokviz::data::archive::Converter;
use tokviz::data::loader::BundleSources;
use tokviz::figure::{FigureConfig, GroupBy, TrendlineMode};
use tokviz::{Rank, Session};

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn write_bundle(dir: &Path) -> BundleSources {
    let metadata = json!({
        "dataset_name": "fixture",
        "tokenizers": ["A", "B"],
        "languages": ["en_Latn_stan1293", "fr_Latn_stan1290", "de_Latn_stan1295"],
        "metrics": ["vocab", "fertility", "compression", "parity", "absent"],
        "metric_shapes": { "parity": [2, 3, 3] },
        "languages_info": {
            "en": { "families": ["Indo-European"], "continent": "Europe" },
            "fr": { "families": ["Indo-European"], "continent": "Europe" }
        }
    });
    let results = json!({
        "vocab": [32000, 50000],
        "fertility": [[1.0, 2.0, 3.0], [4.0, 5.0, "NaN"]],
        "compression": { "data": [1.0, 2.0, 3.0, 4.0, 5.0, "Infinity"], "shape": [2, 3], "dtype": "float64" },
        "parity": (0..18).collect::<Vec<_>>(),
        "broken": { "data": [1.0, 2.0, 3.0], "shape": [2, 3], "dtype": "float64" }
    });
    let metadata_path = dir.join("metadata.json");
    let results_path = dir.join("results.json");
    std::fs::write(&metadata_path, metadata.to_string()).unwrap();
    std::fs::write(&results_path, results.to_string()).unwrap();
    BundleSources {
        metadata: metadata_path,
        results: results_path,
        languages_info: None,
    }
}

fn loaded_session() -> Session {
    let dir = tempdir().unwrap();
    let sources = write_bundle(dir.path());
    let mut session = Session::new();
    session.import(&sources, &Converter::default()).unwrap();
    session
}

fn figure(session: &mut Session, kind: ChartKind, metrics: &[&str], languages: &[&str]) -> String {
    let id = session.add_figure(kind);
    let mut fig = session.figure(&id).unwrap().clone();
    fig.tokenizers = strings(&["A", "B"]);
    fig.metrics = strings(metrics);
    fig.languages = strings(languages);
    session.update_figure(fig).unwrap();
    id
}

#[test]
fn import_reports_ranks_missing_and_rejected() {
    let session = loaded_session();
    let ds = session.current().unwrap();
    assert_eq!(ds.name, "fixture");

    let dims = ds.dimensionality();
    assert_eq!(dims["vocab"], Rank::One);
    assert_eq!(dims["fertility"], Rank::Two);
    assert_eq!(dims["compression"], Rank::Two);
    assert_eq!(dims["parity"], Rank::Three);
    assert_eq!(ds.metric_names, strings(&["vocab", "fertility", "compression", "parity"]));
    assert_eq!(ds.missing, strings(&["absent"]));
    assert_eq!(ds.rejected.len(), 1);
    assert_eq!(ds.rejected[0].0, "broken");

    assert!(ds.metric("fertility").unwrap().values()[5].is_nan());
    assert_eq!(ds.metric("compression").unwrap().values()[5], f64::INFINITY);
    assert!(session.status_message.as_deref().unwrap().contains("absent"));
}

#[test]
fn scatter_drops_unknown_language() {
    let mut session = loaded_session();
    let id = figure(
        &mut session,
        ChartKind::MetricPairCorrelation,
        &["fertility", "compression"],
        &["en_Latn_stan1293", "fr_Latn_stan1290", "xx"],
    );
    let ChartData::Scatter(chart) = session.render(&id) else {
        panic!("expected scatter");
    };
    assert_eq!(chart.len(), 4);
    assert_eq!(chart.skipped, 2);
    assert!(chart.points().all(|p| p.label.to_string() != "xx"));
    // the language list includes an unknown label, which validation does not check
    assert!(session.validate(&id).is_empty());
}

#[test]
fn scatter_family_groups_and_trend() {
    let mut session = loaded_session();
    let id = figure(
        &mut session,
        ChartKind::MetricPairCorrelation,
        &["fertility", "fertility"],
        &["en_Latn_stan1293", "fr_Latn_stan1290", "de_Latn_stan1295"],
    );
    let mut fig = session.figure(&id).unwrap().clone();
    fig.group_by = GroupBy::Family;
    fig.trendline_mode = Some(TrendlineMode::Global);
    session.update_figure(fig).unwrap();

    let ChartData::Scatter(chart) = session.render(&id) else {
        panic!("expected scatter");
    };
    let names: Vec<&str> = chart.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Indo-European", "unknown"]);

    // y = x over the five finite points
    assert_eq!(chart.trend_lines.len(), 1);
    let trend = &chart.trend_lines[0];
    assert_eq!(trend.name, "Trend (global)");
    assert_eq!(trend.fit.n, 5);
    assert!((trend.fit.slope - 1.0).abs() < 1e-9);
    assert!(trend.fit.intercept.abs() < 1e-9);
}

#[test]
fn scatter_rank3_pairs() {
    let mut session = loaded_session();
    let id = figure(
        &mut session,
        ChartKind::MetricPairCorrelation,
        &["parity", "parity"],
        &["fr_Latn_stan1290", "de_Latn_stan1295"],
    );
    let ChartData::Scatter(chart) = session.render(&id) else {
        panic!("expected scatter");
    };
    assert_eq!(chart.rank, Rank::Three);
    assert_eq!(chart.len(), 8);
    let first = chart.points().next().unwrap();
    assert_eq!(first.label.to_string(), "fr_Latn_stan1290-fr_Latn_stan1290");
    assert_eq!(first.x, 4.0);
}

#[test]
fn table_json_and_csv() {
    let mut session = loaded_session();
    let id = figure(
        &mut session,
        ChartKind::MetricTable,
        &["fertility"],
        &["de_Latn_stan1295", "en_Latn_stan1293"],
    );
    let data = session.render(&id);
    let value = serde_json::to_value(&data).unwrap();
    assert_eq!(value["kind"], "table");
    assert_eq!(value["rowHeader"], "Tokenizer");
    assert_eq!(value["cells"][1][0]["value"], "NaN");
    assert_eq!(value["cells"][1][0]["formatted"], "NaN");

    let ChartData::Table(table) = data else {
        panic!("expected table");
    };
    let mut csv = Vec::new();
    table.write_csv(&mut csv).unwrap();
    assert_eq!(
        String::from_utf8(csv).unwrap(),
        "Tokenizer,de_Latn_stan1295,en_Latn_stan1293\nA,3.0000,1.0000\nB,NaN,4.0000\n"
    );
}

#[test]
fn bar_chart_over_one_dimensional_metric() {
    let mut session = loaded_session();
    let id = figure(&mut session, ChartKind::BarRanking, &["vocab"], &[]);
    assert!(session.validate(&id).is_empty());
    let ChartData::Bar(chart) = session.render(&id) else {
        panic!("expected bar chart");
    };
    let values: Vec<Option<f64>> = chart.categories.iter().map(|c| c.values[0].value).collect();
    assert_eq!(values, vec![Some(32000.0), Some(50000.0)]);
}

#[test]
fn validator_flags_one_dimensional_metric_in_table() {
    let mut session = loaded_session();
    let id = figure(&mut session, ChartKind::MetricTable, &["vocab", "fertility"], &["en_Latn_stan1293"]);
    let violations = session.validate(&id);
    assert_eq!(
        violations,
        vec![
            "Maximum 1 metric(s) allowed, got 2".to_string(),
            "This visualization requires 2D or 3D metrics, but got: vocab".to_string(),
        ]
    );
    assert_eq!(
        session.render(&id).reason(),
        Some("Metric Table requires exactly 1 metric")
    );
}

#[test]
fn validation_agrees_with_rendering() {
    let mut session = loaded_session();
    let table = figure(&mut session, ChartKind::MetricTable, &["vocab"], &["en_Latn_stan1293"]);
    assert!(!session.validate(&table).is_empty());
    assert!(!session.render(&table).is_available());

    let bars = figure(&mut session, ChartKind::BarRanking, &["fertility"], &[]);
    assert_eq!(session.validate(&bars), vec!["Minimum 1 language(s) required, got 0".to_string()]);
    assert_eq!(session.render(&bars).reason(), Some("No languages selected"));
}

#[test]
fn failed_reimport_keeps_dataset() {
    let dir = tempdir().unwrap();
    let sources = write_bundle(dir.path());
    let mut session = Session::new();
    session.import(&sources, &Converter::default()).unwrap();
    let before = session.current().unwrap();

    std::fs::write(&sources.results, r#"{"__error__": "bad archive"}"#).unwrap();
    let err = session.import(&sources, &Converter::default()).unwrap_err();
    assert!(format!("{err:#}").contains("bad archive"));
    assert!(std::sync::Arc::ptr_eq(&before, &session.current().unwrap()));
}

#[test]
fn filters_pick_languages_unless_locked() {
    let mut session = loaded_session();
    let id = figure(&mut session, ChartKind::MetricTable, &["fertility"], &["de_Latn_stan1295"]);

    let mut fig: FigureConfig = session.figure(&id).unwrap().clone();
    fig.filters.continent = Some("Europe".into());
    session.update_figure(fig.clone()).unwrap();
    assert_eq!(
        session.figure(&id).unwrap().languages,
        strings(&["en_Latn_stan1293", "fr_Latn_stan1290"])
    );

    fig.languages = strings(&["de_Latn_stan1295"]);
    fig.lock_filters = true;
    session.update_figure(fig).unwrap();
    assert_eq!(session.figure(&id).unwrap().languages, strings(&["de_Latn_stan1295"]));
}

#[cfg(unix)]
#[test]
fn archive_results_go_through_converter() {
    let dir = tempdir().unwrap();
    let mut sources = write_bundle(dir.path());
    let archive = dir.path().join("results.npz");
    std::fs::rename(&sources.results, &archive).unwrap();
    sources.results = archive;

    let mut session = Session::new();
    session.import(&sources, &Converter::new("cat", Vec::new())).unwrap();
    assert_eq!(session.current().unwrap().metric_names.len(), 4);
}
