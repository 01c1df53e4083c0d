use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Settings;
use crate::excel::{CalamineParser, SheetParser};
use crate::models::SheetLayout;
use crate::services::consolidation::{summarize_skipped, ConsolidationRequest, Consolidator};
use crate::services::field_extractor::FieldExtractor;
use crate::types::{ConsolidationOutput, ExtractedData, SourceFile};

/// Skipped files listed in the printed summary before it is cut short.
const SUMMARY_SKIP_LINES: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "soa-consolidator", version, about = "Consolidate statement-of-account workbooks into a template")]
pub struct Cli {
    /// Extra .env file to load before reading settings.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge source workbooks into the template, one row per file ID.
    Consolidate(ConsolidateArgs),
    /// Print the fields extracted from one source workbook as JSON.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
pub struct ConsolidateArgs {
    #[arg(long)]
    pub template: PathBuf,
    /// Output file name; defaults to Consolidated_<timestamp>.xlsx.
    #[arg(long)]
    pub output: Option<String>,
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    #[arg(long)]
    pub division: Option<String>,
    #[arg(long)]
    pub ia: Option<String>,
    #[arg(long)]
    pub layout: Option<PathBuf>,
    /// Write the consolidation report (counts, merged rows, skipped files) as JSON.
    #[arg(long)]
    pub report: Option<PathBuf>,
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(long)]
    pub layout: Option<PathBuf>,
    pub file: PathBuf,
}

/// Where the merged workbook went, plus the engine's report.
#[derive(Debug)]
pub struct ConsolidateSummary {
    pub path: PathBuf,
    pub output: ConsolidationOutput,
}

pub fn run(cli: Cli) -> Result<(), String> {
    let settings = Settings::load(cli.env_file.as_deref());
    match cli.command {
        Command::Consolidate(args) => {
            let summary = consolidate(&args, &settings)?;
            println!("{}", render_summary(&summary));
            Ok(())
        }
        Command::Extract(args) => {
            let data = extract(&args, &settings)?;
            let json = serde_json::to_string_pretty(&data).map_err(|e| e.to_string())?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn load_layout(explicit: Option<&Path>, settings: &Settings) -> Result<SheetLayout, String> {
    match explicit {
        Some(path) => SheetLayout::from_json_file(path),
        None => settings.layout(),
    }
    .map_err(|e| e.to_string())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|o| o.to_str())
        .unwrap_or("")
        .to_string()
}

fn read_source(path: &Path) -> Result<SourceFile, String> {
    let bytes = fs::read(path).map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
    Ok(SourceFile::new(file_name_of(path), bytes))
}

/// First path in `dir` for `name` that does not exist yet (name, name_2, name_3, ...).
fn unique_output_path(dir: &Path, name: &str) -> PathBuf {
    let mut p = dir.join(name);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("consolidated")
        .to_string();
    let mut counter = 2u32;
    while p.exists() {
        p = dir.join(format!("{}_{}.xlsx", stem, counter));
        counter += 1;
    }
    p
}

pub fn consolidate(args: &ConsolidateArgs, settings: &Settings) -> Result<ConsolidateSummary, String> {
    let layout = load_layout(args.layout.as_deref(), settings)?;
    let template = fs::read(&args.template)
        .map_err(|e| format!("Could not read template {}: {}", args.template.display(), e))?;
    let inputs = args
        .inputs
        .iter()
        .map(|p| read_source(p))
        .collect::<Result<Vec<_>, _>>()?;

    let output_name = args.output.clone().unwrap_or_else(|| {
        format!("Consolidated_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
    });
    let default_division = args.division.as_deref().unwrap_or(&settings.default_division);
    let default_ia = args.ia.as_deref().unwrap_or(&settings.default_ia);

    let output = Consolidator::new(&layout)
        .consolidate(ConsolidationRequest {
            template: &template,
            inputs: &inputs,
            output_name: &output_name,
            default_division,
            default_ia,
        })
        .map_err(|e| {
            if e.is_client_error() {
                format!("Nothing to consolidate: {}", e)
            } else {
                e.to_string()
            }
        })?;

    let dir = args.out_dir.clone().unwrap_or_else(|| settings.resolve_output_dir());
    fs::create_dir_all(&dir).map_err(|e| format!("Could not create {}: {}", dir.display(), e))?;
    let path = unique_output_path(&dir, &output.output_name);
    fs::write(&path, &output.output_buffer).map_err(|e| format!("Cannot write to file: {}", e))?;
    info!(path = %path.display(), "wrote consolidated workbook");

    if let Some(report) = &args.report {
        let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        fs::write(report, json).map_err(|e| format!("Could not write report {}: {}", report.display(), e))?;
    }
    Ok(ConsolidateSummary { path, output })
}

pub fn extract(args: &ExtractArgs, settings: &Settings) -> Result<ExtractedData, String> {
    let layout = load_layout(args.layout.as_deref(), settings)?;
    let source = read_source(&args.file)?;
    let sheets = CalamineParser.parse(&source.bytes).map_err(|e| e.to_string())?;
    Ok(FieldExtractor::new(&layout).extract(&source.file_name, &sheets))
}

/// Human-readable result: a partial success always lists what was skipped.
pub fn render_summary(summary: &ConsolidateSummary) -> String {
    let output = &summary.output;
    let mut text = format!(
        "Consolidated {} file(s) into {}",
        output.consolidated_count,
        summary.path.display()
    );
    if !output.skipped_details.is_empty() {
        text.push_str(&format!(
            "\nSkipped {} file(s):\n{}",
            output.skipped_details.len(),
            summarize_skipped(&output.skipped_details, SUMMARY_SKIP_LINES)
        ));
    }
    text
}
