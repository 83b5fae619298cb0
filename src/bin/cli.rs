use anyhow::{anyhow, Result};
use chrono::Local;
use colored::*;
use filing_delta::{
    core::{
        config::{parse_date, parse_report_types, DateRange, PipelineConfig, DEFAULT_DATA_DIR},
        types::{parse_entity_list, Cancellation},
    },
    diff::ComparisonResult,
    edgar::LoadStats,
    export,
    pipeline::{DiffReport, Pipeline, PipelineOutput, ReportOutcome},
};
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "filing-delta-cli",
    about = "Compare the two most recent filings of each ticker"
)]
struct Opt {
    /// Tickers to compare; defaults to FILING_DELTA_TICKERS
    tickers: Vec<String>,

    /// Root directory holding one folder per ticker
    #[structopt(long, parse(from_os_str))]
    data_dir: Option<PathBuf>,

    /// Only consider filings on or after this date (YYYY-MM-DD)
    #[structopt(long)]
    start_date: Option<String>,

    /// Only consider filings on or before this date (YYYY-MM-DD)
    #[structopt(long)]
    end_date: Option<String>,

    /// Report type to include (10-K, 10-Q, Other); may be repeated
    #[structopt(long = "form", number_of_values = 1)]
    forms: Vec<String>,

    /// Number of concurrent workers
    #[structopt(long)]
    workers: Option<usize>,

    /// Write the report table to this CSV file
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Write loaded financial facts as one CSV per unit into this directory
    #[structopt(long, parse(from_os_str))]
    facts_dir: Option<PathBuf>,

    /// Hide progress bars
    #[structopt(short, long)]
    quiet: bool,
}

fn build_config(opt: &Opt) -> Result<PipelineConfig> {
    let mut config = if opt.tickers.is_empty() {
        PipelineConfig::from_env()?
    } else {
        let entities = parse_entity_list(&opt.tickers.join(","))?;
        let data_dir = std::env::var("FILING_DELTA_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        PipelineConfig::new(entities, data_dir)
    };

    if let Some(data_dir) = &opt.data_dir {
        config.data_dir = data_dir.clone();
    }

    match (&opt.start_date, &opt.end_date) {
        (Some(start), Some(end)) => {
            config = config.with_date_range(DateRange::parse(start, end)?);
        }
        (Some(start), None) => {
            let today = Local::now().date_naive();
            config = config.with_date_range(DateRange::new(parse_date(start)?, today)?);
        }
        (None, Some(_)) => return Err(anyhow!("--end-date requires --start-date")),
        (None, None) => {}
    }

    if !opt.forms.is_empty() {
        config = config.with_report_types(parse_report_types(&opt.forms.join(","))?);
    }

    if let Some(workers) = opt.workers {
        config = config.with_workers(workers);
    }

    Ok(config)
}

fn print_report(report: &DiffReport) {
    println!("\n{}", format!("=== {} ===", report.entity_id).bold());

    if let (Some(accession), Some(date)) = (&report.latest_accession, report.latest_date) {
        println!("Latest filing:   {} ({})", accession, date);
    }
    if let (Some(accession), Some(date)) = (&report.previous_accession, report.previous_date) {
        println!("Previous filing: {} ({})", accession, date);
    }

    match &report.outcome {
        ReportOutcome::NoData(_) => println!("{}", report.outcome.to_string().yellow()),
        ReportOutcome::Compared(ComparisonResult::Changes { added, removed }) => {
            if !added.is_empty() {
                println!("{}", "Added lines:".green().bold());
                for line in added {
                    println!("{}", format!("  Line {}: {}", line.position, line.text).green());
                }
            }
            if !removed.is_empty() {
                println!("{}", "Removed lines:".red().bold());
                for line in removed {
                    println!("{}", format!("  Line {}: {}", line.position, line.text).red());
                }
            }
        }
        ReportOutcome::Compared(result) => println!("{}", result.to_string().dimmed()),
    }
}

fn print_summary(output: &PipelineOutput) {
    let LoadStats {
        discovered,
        loaded,
        skipped_names,
        invalid_dates,
        out_of_range,
        filtered_types,
        duplicates,
        extraction_failures,
        facts,
    } = &output.stats;

    println!("\n{}", "Summary".bold());
    println!("  Filings loaded:       {} of {}", loaded, discovered);
    println!("  Unrecognised names:   {}", skipped_names);
    println!("  Invalid dates:        {}", invalid_dates);
    println!("  Outside date range:   {}", out_of_range);
    println!("  Other report types:   {}", filtered_types);
    println!("  Duplicate accessions: {}", duplicates);
    println!("  Extraction failures:  {}", extraction_failures);
    println!("  Financial facts:      {}", facts);
}

fn write_outputs(opt: &Opt, output: &PipelineOutput) -> Result<()> {
    if let Some(path) = &opt.output {
        export::write_reports_csv(path, &output.reports)?;
        println!("Report written to {}", path.display().to_string().cyan());
    }
    if let Some(dir) = &opt.facts_dir {
        let written = export::write_facts_by_unit(dir, &output.facts)?;
        println!(
            "{} fact tables written to {}",
            written.len(),
            dir.display().to_string().cyan()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::debug!("Logger initialized");

    let opt = Opt::from_args();
    let config = match build_config(&opt) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Configuration error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    let cancellation = Cancellation::new();
    let handler = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, stopping after the current entity");
        handler.cancel();
    })?;

    let mut pipeline = Pipeline::for_data_dir(&config).with_cancellation(cancellation);
    if !opt.quiet {
        pipeline = pipeline.with_progress(Arc::new(MultiProgress::new()));
    }

    let output = match pipeline.run(&config).await {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    for report in &output.reports {
        print_report(report);
    }
    print_summary(&output);

    if let Err(e) = write_outputs(&opt, &output) {
        eprintln!("{} {:#}", "Export failed:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
