mod fetcher;
mod parser;
mod store;
mod templates;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use fetcher::FetchedPage;
use parser::segment::Segmenter;
use store::Report;
use templates::TemplateConfig;

#[derive(Parser)]
#[command(
    name = "radrap_scraper",
    about = "Radiology report scraper and template extractor for radrap.ch"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch report pages, segment them into clinical sections, save JSON
    Fetch {
        /// File with one report URL per line
        #[arg(short, long)]
        urls: PathBuf,
        /// Output directory for report JSON
        #[arg(short, long, default_value = "knowledge")]
        out: PathBuf,
        /// Max pages to fetch (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Shuffle fetched reports into training and testing sets
    Split {
        /// Directory holding reports.json
        #[arg(long, default_value = "knowledge")]
        dir: PathBuf,
        /// Fraction of reports assigned to the training set
        #[arg(long, default_value_t = 0.7)]
        train_ratio: f64,
    },
    /// Build per-type templates from the training set
    Templates {
        /// Directory holding training_reports.json
        #[arg(long, default_value = "knowledge")]
        dir: PathBuf,
        /// Output directory for template JSON
        #[arg(short, long, default_value = "templates")]
        out: PathBuf,
        /// Minimum fraction of a type group a section must appear in
        #[arg(long, default_value_t = 0.5)]
        min_fraction: f64,
    },
    /// Fetch + split + templates in one pipeline
    Run {
        /// File with one report URL per line
        #[arg(short, long)]
        urls: PathBuf,
        /// Output directory for report JSON
        #[arg(short, long, default_value = "knowledge")]
        out: PathBuf,
        /// Max pages to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Fraction of reports assigned to the training set
        #[arg(long, default_value_t = 0.7)]
        train_ratio: f64,
        /// Minimum fraction of a type group a section must appear in
        #[arg(long, default_value_t = 0.5)]
        min_fraction: f64,
        /// Output directory for template JSON
        #[arg(long, default_value = "templates")]
        templates_out: PathBuf,
    },
    /// Show pipeline statistics
    Stats {
        #[arg(long, default_value = "knowledge")]
        dir: PathBuf,
        #[arg(long, default_value = "templates")]
        templates_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch { urls, out, limit } => {
            let reports = fetch_and_segment(&urls, limit).await?;
            store::write_json(&store::reports_path(&out), &reports)?;
            println!("Saved {} reports to {}", reports.len(), out.display());
            Ok(())
        }
        Commands::Split { dir, train_ratio } => {
            split_and_save(&dir, train_ratio)?;
            Ok(())
        }
        Commands::Templates {
            dir,
            out,
            min_fraction,
        } => {
            build_and_save_templates(&dir, &out, min_fraction)?;
            Ok(())
        }
        Commands::Run {
            urls,
            out,
            limit,
            train_ratio,
            min_fraction,
            templates_out,
        } => {
            // Phase 1: fetch + segment
            let t_fetch = Instant::now();
            let reports = fetch_and_segment(&urls, limit).await?;
            if reports.is_empty() {
                println!("No usable reports fetched, nothing to do.");
                return Ok(());
            }
            store::write_json(&store::reports_path(&out), &reports)?;
            println!(
                "Fetched and segmented {} reports in {:.1}s",
                reports.len(),
                t_fetch.elapsed().as_secs_f64()
            );

            // Phase 2: split
            split_and_save(&out, train_ratio)?;

            // Phase 3: templates
            build_and_save_templates(&out, &templates_out, min_fraction)?;
            Ok(())
        }
        Commands::Stats { dir, templates_dir } => {
            let fetched = store::count_reports(&store::reports_path(&dir))?;
            let training = store::count_reports(&store::training_path(&dir))?;
            let testing = store::count_reports(&store::testing_path(&dir))?;
            let templates = store::count_json_files(&templates_dir)?;
            println!("Fetched:   {}", fetched);
            println!("Training:  {}", training);
            println!("Testing:   {}", testing);
            println!("Templates: {}", templates);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch_and_segment(urls_file: &Path, limit: Option<usize>) -> Result<Vec<Report>> {
    let mut urls = fetcher::read_url_list(urls_file)?;
    if let Some(n) = limit {
        urls.truncate(n);
    }
    println!("Fetching {} pages...", urls.len());
    let (pages, stats) = fetcher::fetch_pages(urls).await?;
    println!(
        "Done: {} fetched ({} ok, {} errors).",
        stats.total, stats.ok, stats.errors
    );
    process_pages(&pages)
}

/// Segment and classify fetched pages in parallel. Pages with no usable
/// section content are skipped with a warning, never an error.
fn process_pages(pages: &[FetchedPage]) -> Result<Vec<Report>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let segmenter = Segmenter::with_defaults()?;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let reports: Vec<Report> = pages
        .par_iter()
        .filter_map(|page| {
            let html = page.html.as_ref()?;
            let report = parser::process_page(&segmenter, &page.url, html);
            if report.is_none() {
                warn!("No section content extracted from {}", page.url);
            }
            pb.inc(1);
            report
        })
        .collect();

    pb.finish_and_clear();
    Ok(reports)
}

fn split_and_save(dir: &Path, train_ratio: f64) -> Result<()> {
    let reports = store::load_reports(&store::reports_path(dir))?;
    let (train, test) = store::split_reports(reports, train_ratio);

    store::write_json(&store::training_path(dir), &train)?;
    store::write_json(&store::testing_path(dir), &test)?;
    store::save_report_files(&dir.join("training"), &train)?;
    store::save_report_files(&dir.join("testing"), &test)?;

    println!(
        "Saved {} training reports and {} testing reports",
        train.len(),
        test.len()
    );
    Ok(())
}

fn build_and_save_templates(dir: &Path, out: &Path, min_fraction: f64) -> Result<()> {
    let reports = store::load_reports(&store::training_path(dir))?;
    let built = templates::build_templates(&reports, &TemplateConfig { min_fraction })?;
    let paths = templates::save_templates(out, &built)?;
    println!("Created {} templates in {}", paths.len(), out.display());
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
