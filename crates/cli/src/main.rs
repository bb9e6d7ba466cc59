//! qomify CLI: migrate legacy `DeviceInfo` declarations from the terminal.
//!
//! Thin shell over `qomify-core`: file discovery, stdin/stdout plumbing and exit codes.

use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use qomify_core::{load_qomify_config, migrate, MigrateConfig, MigrateError, Migration};

/// qomify: rewrite DeviceInfo declarations into TypeInfo + class_init pairs.
#[derive(Parser)]
#[command(name = "qomify", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output reports as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: .qomify.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parent type for single-record registrations (overrides the config)
    #[arg(long, global = true)]
    parent: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite legacy declarations (stdin to stdout when no paths are given)
    Rewrite {
        /// Source files or directories to walk for `.c` files
        paths: Vec<PathBuf>,

        /// Write results back to the files instead of stdout
        #[arg(long)]
        in_place: bool,
    },
    /// List migratable declarations without writing anything
    Scan {
        /// Source files or directories (default: stdin)
        paths: Vec<PathBuf>,
    },
}

/// Result of running the engine over one input.
struct Outcome {
    path: String,
    result: Result<Migration, String>,
}

fn fail(message: impl std::fmt::Display, code: i32) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(code);
}

fn resolve_config(cli: &Cli) -> MigrateConfig {
    let mut config = match &cli.config {
        Some(path) => MigrateConfig::from_file(path).unwrap_or_else(|e| fail(e, 2)),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            load_qomify_config(&cwd)
        }
    };
    if let Some(parent) = &cli.parent {
        config.fixed_parent = parent.clone();
    }
    config
}

/// Expand directories into the `.c` files below them; plain files pass through.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkBuilder::new(path).hidden(true).git_ignore(false).build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let is_c = entry.path().extension().and_then(|e| e.to_str()) == Some("c");
            if is_c && entry.file_type().is_some_and(|ft| ft.is_file()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        fail(format!("Could not read stdin: {e}"), 2);
    }
    input
}

fn run_engine(path: String, source: Result<String, std::io::Error>, config: &MigrateConfig) -> Outcome {
    let result = match source {
        Ok(text) => migrate(&text, config).map_err(|e: MigrateError| e.to_string()),
        Err(e) => Err(format!("could not read file: {e}")),
    };
    Outcome { path, result }
}

fn run_files(files: &[PathBuf], config: &MigrateConfig) -> Vec<Outcome> {
    files
        .par_iter()
        .map(|path| run_engine(path.display().to_string(), std::fs::read_to_string(path), config))
        .collect()
}

fn write_stdout(text: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
        fail(format!("Could not write output: {e}"), 2);
    }
}

fn report_json(outcome: &Outcome) -> serde_json::Value {
    match &outcome.result {
        Ok(m) => serde_json::json!({
            "path": outcome.path,
            "blocks": m.report.blocks,
        }),
        Err(e) => serde_json::json!({
            "path": outcome.path,
            "error": e,
        }),
    }
}

fn print_json(outcomes: &[Outcome]) {
    let items: Vec<serde_json::Value> = outcomes.iter().map(report_json).collect();
    match serde_json::to_string_pretty(&items) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(format!("Could not serialize report: {e}"), 2),
    }
}

/// Write every successful migration that changed something back to its file.
/// A failed write turns the outcome into a failure; the remaining files are still written.
fn write_back(outcomes: &mut [Outcome]) -> usize {
    let mut rewritten = 0;
    for outcome in outcomes.iter_mut() {
        let Ok(m) = &outcome.result else { continue };
        if m.report.is_empty() {
            continue;
        }
        let blocks = m.report.blocks.len();
        match std::fs::write(Path::new(&outcome.path), &m.output) {
            Ok(()) => {
                info!(path = outcome.path.as_str(), blocks, "Rewrote file");
                rewritten += 1;
            }
            Err(e) => outcome.result = Err(format!("could not write: {e}")),
        }
    }
    rewritten
}

/// Print failures to stderr and return how many there were.
fn report_failures(outcomes: &[Outcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("{}: {e}", outcome.path);
            failed += 1;
        }
    }
    failed
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("qomify=warn,qomify_core=warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli);

    match &cli.command {
        Commands::Rewrite { paths, in_place } => {
            if paths.is_empty() {
                match migrate(&read_stdin(), &config) {
                    Ok(m) => write_stdout(&m.output),
                    Err(e) => fail(e, 1),
                }
                return;
            }

            let files = collect_files(paths);
            if !in_place {
                let [file] = files.as_slice() else {
                    fail("rewriting more than one file requires --in-place", 2);
                };
                let outcome = run_engine(file.display().to_string(), std::fs::read_to_string(file), &config);
                match outcome.result {
                    Ok(m) => write_stdout(&m.output),
                    Err(e) => fail(format!("{}: {e}", outcome.path), 1),
                }
                return;
            }

            let mut outcomes = run_files(&files, &config);
            let rewritten = write_back(&mut outcomes);

            if cli.json {
                print_json(&outcomes);
            } else {
                for outcome in &outcomes {
                    if let Ok(m) = &outcome.result {
                        for b in &m.report.blocks {
                            println!("{}: {} -> {} ({})", outcome.path, b.name, b.class_init, b.initializer.label());
                        }
                    }
                }
            }
            let failed = report_failures(&outcomes);
            eprintln!("\n{rewritten} files rewritten, {failed} failed, {} scanned", outcomes.len());
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Scan { paths } => {
            let outcomes = if paths.is_empty() {
                vec![run_engine("<stdin>".to_string(), Ok(read_stdin()), &config)]
            } else {
                run_files(&collect_files(paths), &config)
            };

            if cli.json {
                print_json(&outcomes);
            } else {
                let mut blocks = 0;
                for outcome in &outcomes {
                    let Ok(m) = &outcome.result else { continue };
                    for b in &m.report.blocks {
                        println!(
                            "{}:{}-{}  {:<28} {:<8} {:<24} {:<11} {}  props={}",
                            outcome.path,
                            b.start_line,
                            b.end_line,
                            b.name,
                            b.form.label(),
                            b.parent,
                            b.initializer.label(),
                            b.class_init,
                            b.properties
                        );
                        blocks += 1;
                    }
                }
                eprintln!("\n{blocks} blocks in {} files", outcomes.len());
            }
            if report_failures(&outcomes) > 0 {
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "static DeviceInfo a_info = {\n    .name = \"a\",\n    .size = 4,\n};\n    isa_qdev_register(&a_info);\n";

    fn outcome(path: &Path) -> Outcome {
        run_engine(path.display().to_string(), Ok(LEGACY.to_string()), &MigrateConfig::default())
    }

    #[test]
    fn test_write_back_continues_after_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("a.c");
        let present = dir.path().join("b.c");
        std::fs::write(&present, LEGACY).unwrap();

        let mut outcomes = vec![outcome(&missing), outcome(&present)];
        assert_eq!(write_back(&mut outcomes), 1);

        assert!(outcomes[0].result.as_ref().is_err_and(|e| e.starts_with("could not write")));
        assert!(std::fs::read_to_string(&present).unwrap().contains("type_register_static(&a_info);"));
        assert_eq!(report_failures(&outcomes), 1);
    }

    #[test]
    fn test_write_back_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.c");
        std::fs::write(&path, "int x;\n").unwrap();
        let mut outcomes =
            vec![run_engine(path.display().to_string(), Ok("int x;\n".to_string()), &MigrateConfig::default())];
        assert_eq!(write_back(&mut outcomes), 0);
        assert!(outcomes[0].result.is_ok());
    }
}
