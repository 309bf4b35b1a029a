use anyhow::{Context, Result};
use chain_rewriter::config::{load_from_path, select, with_builtins, ProfileSet};
use chain_rewriter::driver::{read_file_list, run_batch, DriverError, FileOutcome};
use chain_rewriter::engine::Engine;
use chain_rewriter::report::BatchReport;
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILE_LIST: &str = "files_to_convert.txt";

#[derive(Parser)]
#[command(name = "chain-rewriter")]
#[command(
    about = "Rewrite fluent logging and error-builder call chains in Go sources",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Files to convert (default: the paths listed in the file list)
    paths: Vec<PathBuf>,

    /// Newline-separated list of files, used when no paths are given
    #[arg(long, default_value = DEFAULT_FILE_LIST)]
    file_list: PathBuf,

    /// Profile to run, repeatable (default: every known profile)
    #[arg(short, long = "profile", value_name = "NAME")]
    profiles: Vec<String>,

    /// TOML file with additional profiles
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dry run - show what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Number of files converted in parallel (default: one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log every rewritten and skipped statement
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let extra = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => ProfileSet::default(),
    };
    let set = with_builtins(extra)?;
    let profiles = select(&set, &cli.profiles)?;
    let engine = Engine::new(profiles).context("failed to compile profile patterns")?;

    let paths = if cli.paths.is_empty() {
        read_file_list(&cli.file_list)?
    } else {
        cli.paths.clone()
    };

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = cli.jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool.build().context("failed to start worker pool")?;
    let results = pool.install(|| run_batch(&engine, &paths, cli.dry_run));

    print_results(&results, cli.dry_run, cli.diff);

    if let Some(path) = &cli.report {
        let json = BatchReport::from_results(&results).to_json()?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_results(results: &[(PathBuf, Result<FileOutcome, DriverError>)], dry_run: bool, show_diff: bool) {
    let mut changed = 0;
    let mut failed = 0;

    for (path, result) in results {
        match result {
            Ok(outcome) => {
                match outcome.rewritten() {
                    Some(_) => {
                        changed += 1;
                        let verb = if dry_run { "Would convert" } else { "Converted" };
                        println!(
                            "{} {} {} ({} statement(s))",
                            "✓".green(),
                            verb,
                            path.display(),
                            outcome.output.rewrites.len()
                        );
                    }
                    None if !outcome.output.skipped.is_empty() => {
                        println!(
                            "{} {} ({} statement(s) left unchanged)",
                            "⊘".cyan(),
                            path.display(),
                            outcome.output.skipped.len()
                        );
                    }
                    None => continue,
                }
                for skip in &outcome.output.skipped {
                    println!(
                        "  {} line {}: {}",
                        "⊘".cyan(),
                        skip.line,
                        skip.error.to_string().dimmed()
                    );
                }
                for import in &outcome.missing_imports {
                    println!("  {} needs import \"{}\"", "!".yellow(), import);
                }
                if let (true, Some(rewritten)) = (show_diff, outcome.rewritten()) {
                    display_diff(path, &outcome.original, rewritten);
                }
            }
            Err(err) => {
                failed += 1;
                println!("{} {}", "✗".red(), err);
            }
        }
    }

    println!();
    let noun = if dry_run { "would be converted" } else { "converted" };
    println!("{} file(s) {}", format!("{changed}").green(), noun);
    if failed > 0 {
        println!("{} file(s) failed", format!("{failed}").red());
    }
}

/// Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (converted)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let line = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", line);
            }
        }
    }
}
