use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use page_extractor::parser::dom;
use page_extractor::{parser, ExtractionResult, ExtractorConfig, Preset};

const CHUNK_SIZE: usize = 200;

#[derive(Parser)]
#[command(
    name = "page_extractor",
    about = "Extract tables, sections, bullet lists and FAQs from saved HTML pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract structured data from HTML files
    Extract {
        /// HTML files to read ("-" reads stdin)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        source: ConfigSource,
        /// Write one <name>.json per page into this directory instead of stdout
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Print the effective extractor configuration as JSON
    Config {
        #[command(flatten)]
        source: ConfigSource,
    },
    /// Show a page's heading outline and what each extractor finds on it
    Outline {
        /// HTML file to inspect ("-" reads stdin)
        file: PathBuf,
        #[command(flatten)]
        source: ConfigSource,
    },
}

#[derive(Args)]
struct ConfigSource {
    /// JSON config file; fields left out fall back to the defaults
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,
    /// Built-in configuration
    #[arg(short, long, value_enum, default_value = "generic")]
    preset: Preset,
}

impl ConfigSource {
    fn resolve(&self) -> Result<ExtractorConfig> {
        match &self.config {
            Some(path) => ExtractorConfig::load(path),
            None => Ok(ExtractorConfig::preset(self.preset)),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            files,
            source,
            out_dir,
            compact,
        } => {
            let config = source.resolve()?;
            let pages = extract_pages(&files, &config)?;
            let stats = ExtractStats::from_pages(&pages);

            match &out_dir {
                Some(dir) => write_pages(dir, &pages, compact)?,
                None => print_pages(&pages, compact)?,
            }

            eprintln!(
                "Done: {} pages ({} ok, {} errors, {} with nothing found).",
                stats.total, stats.ok, stats.errors, stats.empty
            );
            if stats.ok == 0 {
                bail!("No page could be extracted");
            }
            Ok(())
        }
        Commands::Config { source } => {
            let config = source.resolve()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Outline { file, source } => {
            let config = source.resolve()?;
            let html = read_input(&file)?;
            print_outline(&html, &config);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct Page {
    path: PathBuf,
    result: Result<ExtractionResult>,
}

struct ExtractStats {
    total: usize,
    ok: usize,
    errors: usize,
    empty: usize,
}

impl ExtractStats {
    fn from_pages(pages: &[Page]) -> Self {
        let ok: Vec<&ExtractionResult> = pages.iter().filter_map(|p| p.result.as_ref().ok()).collect();
        Self {
            total: pages.len(),
            ok: ok.len(),
            errors: pages.len() - ok.len(),
            empty: ok.iter().filter(|r| r.is_empty()).count(),
        }
    }
}

/// Read and extract every file, chunk by chunk, each chunk in parallel.
/// A file that cannot be read is reported and skipped.
fn extract_pages(files: &[PathBuf], config: &ExtractorConfig) -> Result<Vec<Page>> {
    check_stdin_once(files)?;

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut pages = Vec::with_capacity(files.len());
    for chunk in files.chunks(CHUNK_SIZE) {
        let results: Vec<Page> = chunk
            .par_iter()
            .map(|path| Page {
                path: path.clone(),
                result: read_input(path).map(|html| parser::process_page(&html, config)),
            })
            .collect();

        for page in &results {
            match &page.result {
                Ok(result) if result.is_empty() => {
                    warn!("Nothing extracted from {}", page.path.display())
                }
                Ok(_) => {}
                Err(e) => warn!("Failed on {}: {:#}", page.path.display(), e),
            }
        }
        pages.extend(results);
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!("Extracted {} pages", pages.len());
    Ok(pages)
}

/// Stdin can only be consumed once.
fn check_stdin_once(files: &[PathBuf]) -> Result<()> {
    let stdin_count = files.iter().filter(|p| p.as_path() == Path::new("-")).count();
    if stdin_count > 1 {
        bail!("\"-\" (stdin) given {} times; it can only be read once", stdin_count);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read HTML from stdin")?;
        return Ok(html);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}

/// One page prints its result; several print an object keyed by input path.
fn print_pages(pages: &[Page], compact: bool) -> Result<()> {
    let ok: Vec<(&Page, &ExtractionResult)> = pages
        .iter()
        .filter_map(|p| p.result.as_ref().ok().map(|r| (p, r)))
        .collect();

    match ok.as_slice() {
        [] => {}
        [(_, result)] if pages.len() == 1 => println!("{}", to_json(result, compact)?),
        _ => {
            let by_path: BTreeMap<String, &ExtractionResult> = ok
                .iter()
                .map(|(p, r)| (p.path.display().to_string(), *r))
                .collect();
            println!("{}", to_json(&by_path, compact)?);
        }
    }
    Ok(())
}

fn write_pages(dir: &Path, pages: &[Page], compact: bool) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for page in pages {
        let Ok(result) = &page.result else {
            continue;
        };
        let target = dir.join(format!("{}.json", output_name(&page.path)));
        std::fs::write(&target, to_json(result, compact)?)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!("Wrote {}", target.display());
    }
    Ok(())
}

fn output_name(path: &Path) -> String {
    if path == Path::new("-") {
        return "stdin".to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string())
}

fn print_outline(html: &str, config: &ExtractorConfig) {
    let document = scraper::Html::parse_document(html);
    let root = document.root_element();

    let headings = dom::outline(root);
    if headings.is_empty() {
        println!("No headings found.");
    }
    for h in &headings {
        println!("{}h{} {}", "  ".repeat(h.level.saturating_sub(1) as usize), h.level, h.text);
    }

    let r = parser::aggregate(root, config);
    println!("\n--- Extracted ---");
    println!("General tables: {}", r.general_tables.len());
    println!("Named tables:   {}", join_keys(r.named_tables.keys()));
    println!("Sections:       {}", join_keys(r.sections.keys()));
    println!("Bullet groups:  {}", join_keys(r.bullet_points.keys()));
    println!("FAQ entries:    {}", r.faqs.len());
    println!("Records:        {}", join_keys(r.records.keys()));
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    let keys: Vec<&str> = keys.map(String::as_str).collect();
    if keys.is_empty() {
        "-".to_string()
    } else {
        keys.join(", ")
    }
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

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn repeated_stdin_rejected() {
        let err = check_stdin_once(&paths(&["-", "a.html", "-"])).unwrap_err();
        assert!(err.to_string().contains("2 times"));
    }

    #[test]
    fn single_stdin_accepted() {
        assert!(check_stdin_once(&paths(&["-", "a.html", "b.html"])).is_ok());
        assert!(check_stdin_once(&paths(&["a.html"])).is_ok());
    }

    #[test]
    fn repeated_stdin_fails_before_reading() {
        let err = extract_pages(&paths(&["-", "-"]), &ExtractorConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn stdin_output_name() {
        assert_eq!(output_name(Path::new("-")), "stdin");
        assert_eq!(output_name(Path::new("pages/home.html")), "home");
    }
}
