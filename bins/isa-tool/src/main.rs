//! ISA disassembly inspection tool
//!
//! Command-line front end over the correlation library: load disassembly
//! CSV files, follow source lines to instructions and back, overlay
//! live-register reports and drive a whole build session.

mod config;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, LogLevel};
use isalens_correlation::{
    copy_rows_as_text, find_real_start_line, parse_disassembly_csv, parse_live_register_report,
    BuildOutputStore, CorrelationEvent, CorrelationIndex, DisassemblyColumn, DisassemblyView,
    LiveRegisterStatus, SourceLines, SwitchOutcome, VisibleColumns,
};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "isa-tool")]
#[command(version)]
#[command(about = "Inspect GPU ISA disassembly and its correlation with shader source")]
#[command(
    after_help = "SUBCOMMANDS:\n  lines (l)         List every disassembly row with its source line\n  source-line (s)   Disassembly rows generated by a source line\n  isa-line (i)      Source line of a disassembly row\n  vgpr              Live VGPR overlay from a register report\n  entry-start       Where an entry point's body starts\n  session           Drive a build session manifest"
)]
struct Cli {
    /// Configuration file (overrides ~/.isalens/config.toml and ./isalens.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<String>,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (results only, no logs)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// JSON output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every disassembly row with its source line
    #[command(name = "lines", alias = "l")]
    Lines {
        /// Disassembly CSV file
        csv: PathBuf,
    },
    /// Disassembly rows generated by a source line (e.g. kernel.csv 42)
    #[command(name = "source-line", alias = "s")]
    SourceLine {
        /// Disassembly CSV file
        csv: PathBuf,
        /// 1-based source line
        line: u32,
    },
    /// Source line of a disassembly row, with every row it generated
    #[command(name = "isa-line", alias = "i")]
    IsaLine {
        /// Disassembly CSV file
        csv: PathBuf,
        /// 0-based disassembly row
        index: usize,
    },
    /// Overlay a live-register report on the disassembly
    #[command(name = "vgpr")]
    Vgpr {
        /// Disassembly CSV file
        csv: PathBuf,
        /// Live-register analysis report
        report: PathBuf,
    },
    /// Resolve where an entry point's body starts from its declaration line
    #[command(name = "entry-start")]
    EntryStart {
        /// Shader source file
        source: PathBuf,
        /// 1-based declaration line
        hint: u32,
    },
    /// Load a build session manifest and select an entry point
    #[command(name = "session")]
    Session {
        /// JSON manifest: gpu -> input file -> [entry output]
        manifest: PathBuf,
        /// Target GPU (defaults to the newest one built)
        #[arg(long)]
        gpu: Option<String>,
        /// Input file path as recorded in the manifest
        #[arg(long)]
        file: String,
        /// Entry point name
        #[arg(long)]
        entry: String,
        /// Source line to correlate after loading
        #[arg(long)]
        line: Option<u32>,
    },
}

#[derive(Debug, serde::Serialize)]
struct RowInfo {
    index: usize,
    source_line: Option<u32>,
    is_label: bool,
    text: String,
}

#[derive(Debug, serde::Serialize)]
struct LinesResult {
    file: String,
    rows: Vec<RowInfo>,
    correlated_source_lines: usize,
    source_line_bounds: Option<(u32, u32)>,
}

#[derive(Debug, serde::Serialize)]
struct SourceLineResult {
    source_line: u32,
    rows: Vec<RowInfo>,
}

#[derive(Debug, serde::Serialize)]
struct IsaLineResult {
    index: usize,
    source_line: Option<u32>,
    correlated_rows: Vec<usize>,
}

#[derive(Debug, serde::Serialize)]
struct VgprRow {
    index: usize,
    live_vgprs: String,
    tooltip: Option<String>,
    is_max: bool,
}

#[derive(Debug, serde::Serialize)]
struct VgprResult {
    header: String,
    max_vgprs: u32,
    max_lines: Vec<usize>,
    at_register_limit: bool,
    unmatched: usize,
    rows: Vec<VgprRow>,
}

#[derive(Debug, serde::Serialize)]
struct EntryStartResult {
    hint: u32,
    start_line: u32,
}

#[derive(Debug, serde::Serialize)]
struct SessionResult {
    target_gpus: Vec<String>,
    gpu: String,
    file: String,
    entry: String,
    live_registers: String,
    source_line: Option<u32>,
    line_has_disassembly: Option<bool>,
    correlated_rows: Vec<usize>,
    events: Vec<String>,
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let explicit_level = cli
        .log_level
        .as_deref()
        .map(LogLevel::from_str)
        .transpose()?;

    let level = if cli.quiet {
        None
    } else if cli.verbose {
        Some(LogLevel::Debug)
    } else if explicit_level.is_some() {
        explicit_level
    } else if config.general.enable_logging {
        Some(config.general.log_level)
    } else {
        None
    };

    let log_file = match &cli.log_file {
        Some(path) => Some(path.as_str()),
        None if config.general.enable_logging => Some(config.general.log_file.as_str()),
        None => None,
    };

    let console = !cli.quiet && (cli.verbose || explicit_level.is_some());
    logging::initialize_logging(log_file, level, console)
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_with_explicit_path(path),
        None => Config::load(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;
    debug!("Visible columns: {:?}", config.disassembly.visible_columns);

    let columns = &config.disassembly.visible_columns;
    match &cli.command {
        Commands::Lines { csv } => list_lines(csv, columns, &cli),
        Commands::SourceLine { csv, line } => source_line(csv, *line, columns, &cli),
        Commands::IsaLine { csv, index } => isa_line(csv, *index, &cli),
        Commands::Vgpr { csv, report } => vgpr(csv, report, columns, &cli),
        Commands::EntryStart { source, hint } => entry_start(source, *hint, &cli),
        Commands::Session {
            manifest,
            gpu,
            file,
            entry,
            line,
        } => session(manifest, gpu.as_deref(), file, entry, *line, columns, &cli),
    }
}

fn load_index(csv: &Path) -> Result<CorrelationIndex> {
    parse_disassembly_csv(csv)
        .with_context(|| format!("Failed to load disassembly from {}", csv.display()))
}

/// Render rows with the configured columns, one `RowInfo` per row
fn render_rows(index: &CorrelationIndex, rows: &[usize], columns: &VisibleColumns) -> Vec<RowInfo> {
    let text = copy_rows_as_text(index, rows, columns);
    rows.iter()
        .filter(|row| **row < index.len())
        .zip(text.lines())
        .map(|(row, line)| RowInfo {
            index: *row,
            source_line: index.source_line_for_disassembly_line(*row),
            is_label: index.line(*row).is_some_and(|l| l.is_label()),
            text: line.to_string(),
        })
        .collect()
}

fn print_rows(rows: &[RowInfo]) {
    for row in rows {
        let source = row
            .source_line
            .map(|line| line.to_string())
            .unwrap_or_default();
        println!("{:>6}  {:>6}  {}", row.index, source, row.text);
    }
}

fn list_lines(csv: &Path, columns: &VisibleColumns, cli: &Cli) -> Result<()> {
    let index = load_index(csv)?;
    let all_rows: Vec<usize> = (0..index.len()).collect();
    let result = LinesResult {
        file: csv.display().to_string(),
        rows: render_rows(&index, &all_rows, columns),
        correlated_source_lines: index.correlated_source_line_count(),
        source_line_bounds: index.source_line_bounds(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !cli.quiet {
        let bounds = result
            .source_line_bounds
            .map(|(first, last)| format!("{}-{}", first, last))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{}: {} rows, {} source lines (range {})",
            result.file,
            result.rows.len(),
            result.correlated_source_lines,
            bounds
        );
    }
    print_rows(&result.rows);
    Ok(())
}

fn source_line(csv: &Path, line: u32, columns: &VisibleColumns, cli: &Cli) -> Result<()> {
    let mut index = load_index(csv)?;
    index.set_correlated_source_line(line);
    let result = SourceLineResult {
        source_line: line,
        rows: render_rows(&index, &index.correlated_lines(), columns),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.rows.is_empty() {
        if !cli.quiet {
            println!("No disassembly for source line {}", line);
        }
    } else {
        print_rows(&result.rows);
    }
    Ok(())
}

fn isa_line(csv: &Path, row: usize, cli: &Cli) -> Result<()> {
    let mut index = load_index(csv)?;
    if row >= index.len() {
        bail!(
            "Row {} is out of range ({} rows in {})",
            row,
            index.len(),
            csv.display()
        );
    }

    let source_line = index.select_disassembly_lines(&[row]);
    let result = IsaLineResult {
        index: row,
        source_line,
        correlated_rows: index.correlated_lines(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match result.source_line {
        Some(line) => println!(
            "Row {} -> source line {} (rows {:?})",
            row, line, result.correlated_rows
        ),
        None if !cli.quiet => println!("Row {} has no source correlation", row),
        None => {}
    }
    Ok(())
}

fn vgpr(csv: &Path, report: &Path, columns: &VisibleColumns, cli: &Cli) -> Result<()> {
    let mut index = load_index(csv)?;
    let overlay = parse_live_register_report(report, index.lines()).with_context(|| {
        format!("Failed to load live register report {}", report.display())
    })?;
    index.set_live_registers(overlay);

    let Some(overlay) = index.live_registers() else {
        bail!("Live register overlay missing after load");
    };
    let rows = (0..index.len())
        .map(|row| VgprRow {
            index: row,
            live_vgprs: index.live_register_text(row),
            tooltip: overlay.tooltip(row),
            is_max: overlay.max_line_numbers().contains(&row),
        })
        .collect();
    let result = VgprResult {
        header: overlay.header_text(),
        max_vgprs: overlay.max_vgprs(),
        max_lines: overlay.max_line_numbers().to_vec(),
        at_register_limit: overlay.is_at_register_limit(),
        unmatched: overlay.unmatched_count(),
        rows,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !cli.quiet {
        println!("{}", result.header);
        if result.at_register_limit {
            println!("Register limit reached");
        }
        if let Some(note) = overlay.unmatched_note() {
            println!("{}", note);
        }
    }

    let mut with_vgprs: Vec<DisassemblyColumn> = columns.iter().collect();
    with_vgprs.push(DisassemblyColumn::LiveVgprs);
    let all_rows: Vec<usize> = (0..index.len()).collect();
    let text = copy_rows_as_text(&index, &all_rows, &VisibleColumns::new(with_vgprs));
    for (row, line) in result.rows.iter().zip(text.lines()) {
        let marker = if row.is_max { '*' } else { ' ' };
        println!("{} {:>6}  {}", marker, row.index, line);
    }
    Ok(())
}

fn entry_start(source: &Path, hint: u32, cli: &Cli) -> Result<()> {
    let lines = SourceLines::from_file(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let result = EntryStartResult {
        hint,
        start_line: find_real_start_line(hint, &lines),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.start_line);
    }
    Ok(())
}

fn describe_event(event: &CorrelationEvent) -> String {
    match event {
        CorrelationEvent::CorrelatedSourceLineChanged(Some(line)) => {
            format!("correlated source line changed: {}", line)
        }
        CorrelationEvent::CorrelatedSourceLineChanged(None) => {
            "correlated source line cleared".to_string()
        }
        CorrelationEvent::DisassemblyLoadFailed {
            file,
            entry,
            reason,
        } => format!("disassembly load failed for {}:{}: {}", file, entry, reason),
        CorrelationEvent::LiveRegistersUnavailable {
            file,
            entry,
            reason,
        } => format!("live registers unavailable for {}:{}: {}", file, entry, reason),
    }
}

fn describe_live_registers(outcome: &SwitchOutcome) -> String {
    match outcome {
        SwitchOutcome::AlreadyCurrent => "unchanged".to_string(),
        SwitchOutcome::Switched { live_registers } => match live_registers {
            LiveRegisterStatus::NotRequested => "not requested".to_string(),
            LiveRegisterStatus::Loaded => "loaded".to_string(),
            LiveRegisterStatus::Unavailable(reason) => format!("unavailable: {}", reason),
        },
    }
}

fn session(
    manifest: &Path,
    gpu: Option<&str>,
    file: &str,
    entry: &str,
    line: Option<u32>,
    columns: &VisibleColumns,
    cli: &Cli,
) -> Result<()> {
    let content = std::fs::read_to_string(manifest)
        .with_context(|| format!("Failed to read session manifest {}", manifest.display()))?;
    let store: BuildOutputStore = serde_json::from_str(&content)
        .with_context(|| format!("Invalid session manifest {}", manifest.display()))?;

    let (events_tx, mut events_rx) = isalens_correlation::event_channel();
    let mut view = DisassemblyView::new().with_events(events_tx);
    view.populate_build_output(store);

    let gpu = match gpu.or(view.current_gpu()) {
        Some(gpu) => gpu.to_string(),
        None => bail!("Session manifest {} has no disassembly", manifest.display()),
    };

    let outcome = view.handle_selected_entrypoint_changed(&gpu, file, entry);
    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(describe_event(&event));
    }
    let outcome = outcome.with_context(|| format!("Failed to show {} on {}", entry, gpu))?;

    let line_has_disassembly = match line {
        Some(line) => Some(view.handle_source_line_selected(&gpu, file, entry, line)?),
        None => None,
    };
    let correlated_rows = view
        .current_index()
        .map(|index| index.correlated_lines())
        .unwrap_or_default();
    while let Ok(event) = events_rx.try_recv() {
        events.push(describe_event(&event));
    }

    let result = SessionResult {
        target_gpus: view.target_gpus().iter().map(|g| g.to_string()).collect(),
        gpu: gpu.clone(),
        file: file.to_string(),
        entry: entry.to_string(),
        live_registers: describe_live_registers(&outcome),
        source_line: line,
        line_has_disassembly,
        correlated_rows,
        events,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !cli.quiet {
        println!("Target GPUs: {}", result.target_gpus.join(", "));
        println!("Showing {} from {} on {}", entry, file, gpu);
        println!("Live registers: {}", result.live_registers);
        for event in &result.events {
            println!("event: {}", event);
        }
    }
    if let Some(index) = view.current_index() {
        print_rows(&render_rows(index, &result.correlated_rows, columns));
    }
    Ok(())
}
