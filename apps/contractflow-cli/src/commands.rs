//! CLI command definitions and handlers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use contractflow_core::{
    render, run, Dataset, FieldMapping, SummaryBlock, SummarySections, Template, Workflow,
    WorkflowError,
};
use contractflow_providers::{DocGenClient, GeminiClient, ProviderConfig};

/// Bulk-generate contracts from a template and a CSV
#[derive(Parser, Debug)]
#[command(name = "contractflow", version)]
#[command(about = "Fill a contract template once per CSV row, summarize, and zip the results")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the fields a template exposes
    Fields {
        /// Template file (DOCX)
        template: PathBuf,
    },

    /// Show the field mapping for a template and dataset
    Map(MapArgs),

    /// Generate, summarize and bundle every row
    Run {
        #[command(flatten)]
        map: MapArgs,

        /// Where to write the zip archive
        #[arg(short, long, default_value = contractflow_core::BUNDLE_FILENAME)]
        out: PathBuf,
    },

    /// Render a saved summary with section headers highlighted
    Preview {
        /// Plain-text summary file
        summary: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Template file (DOCX)
    pub template: PathBuf,

    /// Dataset file (CSV with a header row)
    pub dataset: PathBuf,

    /// Map a field to a column, e.g. --map client_name="Customer"
    #[arg(long = "map", value_name = "FIELD=COLUMN", value_parser = parse_assignment)]
    pub assignments: Vec<(String, String)>,

    /// Leave a field unmapped
    #[arg(long = "unmap", value_name = "FIELD")]
    pub unmap: Vec<String>,
}

/// Parse `field=Column`
fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (field, column) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COLUMN, got '{raw}'"))?;
    let (field, column) = (field.trim(), column.trim());
    if field.is_empty() || column.is_empty() {
        return Err(format!("expected FIELD=COLUMN, got '{raw}'"));
    }
    Ok((field.to_string(), column.to_string()))
}

pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fields { template } => cmd_fields(&template),
        Command::Map(args) => {
            let flow = prepare(&args)?;
            print_mapping(&flow)
        }
        Command::Run { map, out } => cmd_run(&map, &out).await,
        Command::Preview { summary } => cmd_preview(&summary),
    }
}

fn load_template(path: &Path) -> Result<Template> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string());
    Ok(Template::from_bytes(name, bytes)?)
}

fn cmd_fields(path: &Path) -> Result<()> {
    let template = load_template(path)?;
    println!(
        "{} ({} fields, {:?})",
        template.name(),
        template.fields().len(),
        template.field_source()
    );
    for field in template.fields() {
        println!("  {field}");
    }
    Ok(())
}

/// Steps 1 to 3: template, dataset, mapping overrides
fn prepare(args: &MapArgs) -> Result<Workflow> {
    let mut flow = Workflow::new();
    flow.upload_template(load_template(&args.template)?)?;

    let csv = fs::read(&args.dataset)
        .with_context(|| format!("reading {}", args.dataset.display()))?;
    flow.load_dataset(Dataset::parse_csv(&csv)?)?;

    apply_overrides(&mut flow, &args.assignments, &args.unmap)?;
    Ok(flow)
}

fn apply_overrides(
    flow: &mut Workflow,
    assignments: &[(String, String)],
    unmap: &[String],
) -> Result<()> {
    let headers = flow
        .dataset()
        .map(|d| d.headers().to_vec())
        .unwrap_or_default();

    for (field, column) in assignments {
        match flow.assign(field, column) {
            Ok(()) => {}
            Err(err @ WorkflowError::UnknownColumn(_)) => {
                bail!("{}. Available: {}", err, headers.join(", "))
            }
            Err(err) => return Err(err.into()),
        }
    }
    for field in unmap {
        flow.clear(field)?;
    }
    Ok(())
}

fn print_mapping(flow: &Workflow) -> Result<()> {
    let (template, mapping) = flow
        .template()
        .zip(flow.mapping())
        .ok_or_else(|| anyhow!("no mapping at step {}", flow.step()))?;
    print!("{}", mapping_table(template.fields(), mapping));
    Ok(())
}

fn mapping_table(fields: &[String], mapping: &FieldMapping) -> String {
    let width = fields.iter().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for field in fields {
        let column = mapping.column_for(field).unwrap_or("-- unmapped --");
        out.push_str(&format!("  {field:<width$}  ->  {column}\n"));
    }
    out
}

async fn cmd_run(args: &MapArgs, out: &Path) -> Result<()> {
    let mut flow = prepare(args)?;
    print_mapping(&flow)?;

    let config = ProviderConfig::from_env()?;
    let generator = DocGenClient::new(&config.docgen, config.timeout)?;
    let summarizer = GeminiClient::new(&config.gemini, config.timeout)?;

    let request = flow.generation_request()?;
    let outcome = run(&generator, &summarizer, request).await?;

    fs::write(out, &outcome.bundle).with_context(|| format!("writing {}", out.display()))?;
    info!(run_id = %outcome.run_id, path = %out.display(), "Bundle written");

    let summary = outcome.summary.clone();
    flow.complete(outcome)?;
    let confirmation = flow.confirmation()?;

    println!();
    println!("Rows:       {}", confirmation.row_count);
    println!("Template:   {}", confirmation.template_name);
    println!(
        "Generated:  {} ({} failed)",
        confirmation.generated, confirmation.failed
    );
    println!(
        "Analysis:   {}",
        if confirmation.analysis_complete {
            "complete"
        } else {
            "missing"
        }
    );
    println!("Archive:    {}", out.display());
    println!();
    print!("{}", format_blocks(&render(&summary)));
    Ok(())
}

fn cmd_preview(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    print!("{}", format_blocks(&render(&text)));

    let missing = SummarySections::parse(&text).missing();
    if !missing.is_empty() {
        println!();
        println!("Missing sections: {}", missing.join(", "));
    }
    Ok(())
}

/// Headers get a blank line above and an underline
fn format_blocks(blocks: &[SummaryBlock]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        match block {
            SummaryBlock::Header(text) => {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(text);
                out.push('\n');
                out.push_str(&"=".repeat(text.trim().chars().count()));
                out.push('\n');
            }
            SummaryBlock::Paragraph(text) => {
                out.push_str(text);
                out.push('\n');
            }
        }
    }
    out
}
