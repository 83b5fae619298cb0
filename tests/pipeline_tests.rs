use filing_delta::{
    core::config::{DateRange, PipelineConfig},
    diff::ComparisonResult,
    edgar::{NoDataReason, ReportType},
    export,
    pipeline::{Pipeline, PipelineOutput, ReportOutcome},
    EntityId,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_filing(root: &Path, ticker: &str, name: &str, paragraphs: &[&str]) {
    let dir = root.join(ticker).join("filings");
    fs::create_dir_all(&dir).unwrap();
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>\n", p))
        .collect();
    let html = format!(
        "<html><head><title>{}</title><style>p {{ margin: 0 }}</style></head>\n<body>\n{}</body></html>",
        name, body
    );
    fs::write(dir.join(name), html).unwrap();
}

fn write_concept(root: &Path, ticker: &str, name: &str, json: &str) {
    let dir = root.join(ticker).join("company_concepts");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), json).unwrap();
}

fn config(root: &Path, tickers: &[&str]) -> PipelineConfig {
    let entities = tickers.iter().map(|t| EntityId::new(*t).unwrap()).collect();
    PipelineConfig::new(entities, root).with_workers(2)
}

async fn run(config: &PipelineConfig) -> PipelineOutput {
    Pipeline::for_data_dir(config).run(config).await.unwrap()
}

const QUARTER: &[&str] = &[
    "FORM 10-Q",
    "Management's discussion and analysis",
    "Liquidity remained stable",
];

#[tokio::test]
async fn test_single_filing_has_no_previous() {
    let dir = tempdir().unwrap();
    write_filing(dir.path(), "ACME", "accession_0001_2024-01-01.htm", QUARTER);

    let output = run(&config(dir.path(), &["ACME"])).await;
    assert_eq!(output.reports.len(), 1);
    assert_eq!(
        output.reports[0].outcome,
        ReportOutcome::Compared(ComparisonResult::NoPreviousFiling)
    );
}

#[tokio::test]
async fn test_identical_filings_have_no_differences() {
    let dir = tempdir().unwrap();
    write_filing(dir.path(), "ACME", "accession_0001_2024-01-01.htm", QUARTER);
    write_filing(dir.path(), "ACME", "accession_0002_2024-04-01.htm", QUARTER);

    let output = run(&config(dir.path(), &["ACME"])).await;
    let report = &output.reports[0];
    assert_eq!(
        report.outcome,
        ReportOutcome::Compared(ComparisonResult::NoDifferences)
    );
    assert_eq!(report.latest_accession.as_deref(), Some("0002"));
    assert_eq!(report.previous_accession.as_deref(), Some("0001"));
}

#[tokio::test]
async fn test_one_added_paragraph_is_one_added_line() {
    let dir = tempdir().unwrap();
    let mut latest = QUARTER.to_vec();
    latest.push("Revenue increased 5%");
    write_filing(dir.path(), "ACME", "accession_0001_2024-01-01.htm", QUARTER);
    write_filing(dir.path(), "ACME", "accession_0002_2024-04-01.htm", &latest);

    // tickers are upper-cased before the directory lookup
    let output = run(&config(dir.path(), &["acme"])).await;
    let comparison = output.reports[0].comparison().unwrap();
    assert!(comparison.removed().is_empty());
    assert_eq!(comparison.added().len(), 1);
    assert_eq!(comparison.added()[0].text, "Revenue increased 5%");
    assert_eq!(comparison.added()[0].line_number, 4);
    assert_eq!(comparison.added()[0].position, 4);
}

#[tokio::test]
async fn test_malformed_markup_still_produces_a_filing() {
    let dir = tempdir().unwrap();
    let filings = dir.path().join("ACME").join("filings");
    fs::create_dir_all(&filings).unwrap();
    fs::write(
        filings.join("accession_0001_2024-01-01.htm"),
        "<html><body><div><p>Unclosed <b>bold text <table><tr><td>cell",
    )
    .unwrap();

    let output = run(&config(dir.path(), &["ACME"])).await;
    assert_eq!(output.stats.loaded, 1);
    assert_eq!(output.stats.extraction_failures, 0);
    assert_eq!(
        output.reports[0].outcome,
        ReportOutcome::Compared(ComparisonResult::NoPreviousFiling)
    );
}

#[tokio::test]
async fn test_entity_without_filings_is_reported_in_order() {
    let dir = tempdir().unwrap();
    write_filing(dir.path(), "BETA", "accession_0001_2024-01-01.htm", QUARTER);

    let output = run(&config(dir.path(), &["NODATA", "BETA"])).await;
    let rows: Vec<_> = output
        .reports
        .iter()
        .map(|r| (r.entity_id.as_str(), r.status()))
        .collect();
    assert_eq!(
        rows,
        vec![("NODATA", "no_data"), ("BETA", "no_previous_filing")]
    );
    assert_eq!(
        output.reports[0].outcome,
        ReportOutcome::NoData(NoDataReason::NoFilingDocuments)
    );
}

#[tokio::test]
async fn test_filters_and_facts_flow_through_to_csv() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("sec_data");
    write_filing(&root, "ACME", "accession_0001_2023-11-01.htm", &["FORM 10-Q", "old"]);
    write_filing(&root, "ACME", "accession_0002_2024-02-01.htm", &["FORM 10-K", "annual"]);
    write_filing(&root, "ACME", "accession_0003_2024-05-01.htm", &["FORM 10-Q", "first"]);
    write_filing(&root, "ACME", "accession_0004_2024-08-01.htm", &["FORM 10-Q", "second"]);
    write_filing(&root, "ACME", "notes.htm", &["not a filing"]);
    write_concept(
        &root,
        "ACME",
        "CIK0000000042.json",
        r#"{
            "cik": 42,
            "taxonomy": "us-gaap",
            "tag": "Revenues",
            "units": {
                "USD": [
                    {"start": "2024-01-01", "end": "2024-03-31", "val": 1000, "accn": "0003", "fy": 2024, "fp": "Q1", "form": "10-Q", "filed": "2024-05-01"},
                    {"start": "2023-07-01", "end": "2023-09-30", "val": 900, "accn": "0001", "fy": 2023, "fp": "Q3", "form": "10-Q", "filed": "2023-11-01"}
                ]
            }
        }"#,
    );

    let config = config(&root, &["ACME"])
        .with_date_range(DateRange::parse("2024-01-01", "2024-12-31").unwrap())
        .with_report_types(vec![ReportType::Form10Q]);
    let output = run(&config).await;

    assert_eq!(output.stats.discovered, 5);
    assert_eq!(output.stats.skipped_names, 1);
    assert_eq!(output.stats.out_of_range, 1);
    assert_eq!(output.stats.filtered_types, 1);
    assert_eq!(output.stats.loaded, 2);

    let report = &output.reports[0];
    assert_eq!(report.latest_accession.as_deref(), Some("0004"));
    assert_eq!(report.previous_accession.as_deref(), Some("0003"));
    let comparison = report.comparison().unwrap();
    assert_eq!(comparison.added()[0].text, "second");
    assert_eq!(comparison.removed()[0].text, "first");

    assert_eq!(output.facts.len(), 1);
    assert_eq!(output.facts[0].value, Some(1000.0));

    let out = dir.path().join("out");
    export::write_reports_csv(&out.join("report.csv"), &output.reports).unwrap();
    let written = export::write_facts_by_unit(&out.join("facts"), &output.facts).unwrap();
    assert_eq!(written, vec![out.join("facts").join("facts_USD.csv")]);

    let mut reader = csv::Reader::from_path(out.join("report.csv")).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "ACME");
    assert_eq!(&rows[0][1], "changes");
}

#[tokio::test]
async fn test_unreadable_fact_document_fails_the_run() {
    let dir = tempdir().unwrap();
    write_filing(dir.path(), "ACME", "accession_0001_2024-01-01.htm", QUARTER);
    write_concept(dir.path(), "ACME", "CIK0000000042.json", "[1, 2");

    let config = config(dir.path(), &["ACME"]);
    let err = Pipeline::for_data_dir(&config).run(&config).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("CIK0000000042.json"));
    assert!(message.contains("ACME"));
}
