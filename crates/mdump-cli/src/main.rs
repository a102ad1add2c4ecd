use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use globset::{GlobBuilder, GlobSetBuilder};
use mdump_config::MdumpConfig;
use mdump_core::{MethodEntry, SearchScope};
use mdump_index::StoreStats;
use mdump_workspace::{
    run_manual_dump, run_startup_dump, DumpRequest, NotificationKind, Notifier, RefreshReport,
    Workspace,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "mdump",
    version,
    about = "Incremental Java method index (index, dump, methods, rebuild, status)"
)]
struct Cli {
    /// Config file to use instead of the one discovered in the project
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the method index up to date with the project
    Index(ProjectArgs),
    /// Index the project and write the method snapshot JSON
    Dump(DumpArgs),
    /// Print indexed methods sorted by name
    Methods(MethodsArgs),
    /// Discard the index and re-extract every file
    Rebuild(ProjectArgs),
    /// Show what the persisted index holds, without refreshing it
    Status(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// Path to a project directory (or a file within it)
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DumpArgs {
    /// Path to a project directory (or a file within it)
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Snapshot destination (defaults to `.mdump/method-dump/methods.json`)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Only dump methods from files matching these globs (project-relative)
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MethodsArgs {
    /// Path to a project directory (or a file within it)
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Only list methods from files matching these globs (project-relative)
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Index(args) => {
            let ws = open_workspace(&args.path, config_path)?;
            let refresh = ws.refresh()?;
            ws.wait_until_indexed();
            if ws.config().dump.on_startup {
                // Silent either way; the outcome is only logged.
                run_startup_dump(ws.scheduler(), ws.service(), &DumpRequest::default());
            }
            let report = IndexReport {
                root: ws.root().to_path_buf(),
                refresh,
                stats: ws.stats(),
            };
            print_index(&report, args.json)?;
            ws.close()?;
            Ok(0)
        }
        Command::Dump(args) => {
            let ws = open_workspace(&args.path, config_path)?;
            ws.refresh()?;
            let request = DumpRequest {
                scope: include_scope(&args.include)?,
                output: args.output,
            };
            let notifier = ConsoleNotifier { quiet: args.json };
            let outcome = run_manual_dump(ws.scheduler(), ws.service(), &request, &notifier);
            if args.json {
                print_json(&outcome)?;
            }
            ws.close()?;
            Ok(if outcome.is_written() { 0 } else { 1 })
        }
        Command::Methods(args) => {
            let ws = open_workspace(&args.path, config_path)?;
            ws.refresh()?;
            ws.wait_until_indexed();
            let methods = ws.service().collect_methods(&include_scope(&args.include)?);
            print_methods(&methods, args.json)?;
            ws.close()?;
            Ok(0)
        }
        Command::Rebuild(args) => {
            let ws = open_workspace(&args.path, config_path)?;
            ws.request_rebuild()?;
            let refresh = ws.refresh()?;
            ws.wait_until_indexed();
            let report = IndexReport {
                root: ws.root().to_path_buf(),
                refresh,
                stats: ws.stats(),
            };
            print_index(&report, args.json)?;
            ws.close()?;
            Ok(0)
        }
        Command::Status(args) => {
            let ws = open_workspace(&args.path, config_path)?;
            let status = StatusReport {
                root: ws.root().to_path_buf(),
                store_dir: ws.store().dir().to_path_buf(),
                needs_full_rebuild: ws.store().needs_full_rebuild(),
                stats: ws.stats(),
            };
            print_status(&status, args.json)?;
            ws.close()?;
            Ok(0)
        }
    }
}

fn open_workspace(path: &Path, config_path: Option<&Path>) -> Result<Workspace> {
    let root = if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    };
    let config = match config_path {
        Some(config_path) => MdumpConfig::load_from_path(config_path)?,
        None => mdump_config::load_for_workspace(root)?.0,
    };
    mdump_config::init_tracing(&config.logging);
    tracing::debug!(target: "mdump.cli", path = %path.display(), "opening workspace");
    Workspace::open(path, &config)
}

fn include_scope(patterns: &[String]) -> Result<SearchScope> {
    if patterns.is_empty() {
        return Ok(SearchScope::Everything);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid --include glob {pattern}"))?;
        builder.add(glob);
    }
    Ok(SearchScope::Globs(builder.build()?))
}

/// Shows manual-dump notifications on the terminal.
struct ConsoleNotifier {
    quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Information if !self.quiet => println!("{message}"),
            NotificationKind::Information => {}
            NotificationKind::Error => eprintln!("{message}"),
        }
    }
}

#[derive(Serialize)]
struct IndexReport {
    root: PathBuf,
    refresh: RefreshReport,
    stats: StoreStats,
}

#[derive(Serialize)]
struct StatusReport {
    root: PathBuf,
    store_dir: PathBuf,
    needs_full_rebuild: bool,
    stats: StoreStats,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_index(report: &IndexReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!("indexed: {}", report.root.display());
    println!("  files_scanned: {}", report.refresh.files_scanned);
    println!("  files_reindexed: {}", report.refresh.files_scheduled);
    println!("  files_removed: {}", report.refresh.files_removed);
    println!("  full_rebuild: {}", report.refresh.full_rebuild);
    println!("  methods: {}", report.stats.entries);
    Ok(())
}

fn print_methods(methods: &[MethodEntry], json: bool) -> Result<()> {
    if json {
        return print_json(&methods);
    }

    for method in methods {
        let first_line = method.body.lines().next().unwrap_or_default();
        println!("{}  {}", method.name, first_line);
    }
    println!("{} methods", methods.len());
    Ok(())
}

fn print_status(status: &StatusReport, json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }

    println!("index:");
    println!("  root: {}", status.root.display());
    println!("  dir: {}", status.store_dir.display());
    println!("  needs_full_rebuild: {}", status.needs_full_rebuild);
    println!("  files: {}", status.stats.files);
    println!("  keys: {}", status.stats.keys);
    println!("  methods: {}", status.stats.entries);
    if status.stats.stale_files > 0 {
        println!("  stale_files: {}", status.stats.stale_files);
    }
    Ok(())
}
