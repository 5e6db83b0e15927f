// レポート出力（CSV / JSON / Prometheus テキスト）の結合テスト。
use std::fs;

use review_insight::config::Config;
use review_insight::dataset::read_reviews;
use review_insight::pipeline::PipelineOrchestrator;
use review_insight::pipeline::report::write_report;

const DATASET: &str = "\
Review_ID,Rating,Year_Month,Reviewer_Location,Review_Text,Branch
101,5,2019-4,France,\"Magical castle, wonderful parade!\",Disneyland_Paris
102,1,2018-7,Germany,\"Awful queues and terrible food.\",Disneyland_Paris
103,3,missing,Hong Kong,\"Small park, okay rides.\",Disneyland_HongKong
104,4,2017-12,Australia,\"Great fireworks &amp; friendly staff www.example.com\",Disneyland_California
105,2,2016-3,United States,,Disneyland_California
";

#[tokio::test]
async fn report_directory_contains_every_table() {
    let corpus = read_reviews(DATASET.as_bytes()).expect("dataset parses");
    let config = temp_env::with_var("SENTIMENT_SAMPLE_SIZE", Some("4"), Config::from_env)
        .expect("config loads");
    let orchestrator = PipelineOrchestrator::builder(config)
        .build()
        .expect("pipeline builds");
    let outcome = orchestrator.run(corpus).await.expect("run succeeds");

    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("reports");
    let files = write_report(&outcome, &target, Some(orchestrator.metrics().as_ref()))
        .expect("report written");

    assert_eq!(files.directory, target);
    for name in [
        "sentiment_by_visitor.csv",
        "sentiment_by_year.csv",
        "topic_frequency.csv",
        "rating_distribution.csv",
        "annotated_reviews.csv",
        "topics.json",
        "summary.json",
        "metrics.prom",
    ] {
        assert!(target.join(name).is_file(), "{name} missing");
    }

    let visitor = fs::read_to_string(target.join("sentiment_by_visitor.csv")).expect("read csv");
    let mut lines = visitor.lines();
    assert_eq!(
        lines.next(),
        Some(
            "branch,visitor,positive,neutral,negative,total,positive_pct,neutral_pct,negative_pct"
        )
    );
    assert_eq!(lines.count(), 6);

    let annotated = fs::read_to_string(target.join("annotated_reviews.csv")).expect("read csv");
    assert_eq!(annotated.lines().count(), 5);
    assert!(!annotated.contains("www"));

    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(target.join("summary.json")).expect("read summary"))
            .expect("summary is json");
    assert_eq!(summary["load"]["rows_read"], 5);
    assert_eq!(summary["cleaning"]["dropped_null_text"], 1);
    assert_eq!(summary["reviews_after_cleaning"], 4);
    assert_eq!(summary["classifier"], "lexicon");
    assert_eq!(summary["sentiment_policy"], "five_star");

    let metrics = fs::read_to_string(target.join("metrics.prom")).expect("read metrics");
    assert!(metrics.contains("review_rows_loaded_total 5"));
}
