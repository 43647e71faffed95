use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use sheetflow::catalog::Catalog;
use sheetflow::config::{self, EngineConfig};
use sheetflow::frame;
use sheetflow::pipeline::{Pipeline, PipelineSpec, RunReport};
use sheetflow::table::Table;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "sheetflow",
    version,
    about = "Preview and run tabular transformation pipelines"
)]
pub struct Cli {
    /// Engine configuration file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the parameter schema of every available operation as JSON
    Operations,
    /// Validate a pipeline against the columns of an input file without running it
    Check {
        /// Pipeline spec (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Run a pipeline and print the first rows of the result
    Preview {
        /// Pipeline spec (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Rows to show. Defaults to the configured preview limit.
        #[arg(short, long)]
        rows: Option<usize>,
    },
    /// Run a pipeline and write the result
    Run {
        /// Pipeline spec (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
}

pub fn run_command(command: Commands, config: EngineConfig) -> Result<()> {
    let catalog = Catalog::standard();
    match command {
        Commands::Operations => {
            let json = serde_json::to_string_pretty(&catalog.schemas())
                .context("Failed to serialize operation schemas")?;
            println!("{json}");
            Ok(())
        }
        Commands::Check { pipeline, input } => handle_check(&catalog, &pipeline, &input),
        Commands::Preview {
            pipeline,
            input,
            rows,
        } => handle_preview(&catalog, config, &pipeline, &input, rows),
        Commands::Run {
            pipeline,
            input,
            output,
            report,
        } => handle_run(&catalog, config, &pipeline, &input, &output, report.as_deref()),
    }
}

fn load(catalog: &Catalog, pipeline: &Path, input: &Path) -> Result<(Pipeline, Table)> {
    let spec = PipelineSpec::from_file(pipeline)?;
    let built = catalog
        .build_pipeline(&spec)
        .with_context(|| format!("Invalid pipeline '{}'", spec.name))?;
    let table = frame::read_csv(input)?;
    Ok((built, table))
}

fn handle_check(catalog: &Catalog, pipeline: &Path, input: &Path) -> Result<()> {
    let (built, table) = load(catalog, pipeline, input)?;
    let errors = built.check(&table.schema());
    if errors.is_empty() {
        println!(
            "Pipeline is valid: {} steps against {} columns.",
            built.len(),
            table.column_count()
        );
        return Ok(());
    }
    for error in &errors {
        println!("{error}");
    }
    anyhow::bail!("{} validation errors", errors.len());
}

fn print_report(report: &RunReport) {
    for step in report.steps() {
        println!("{step}");
        for warning in &step.warnings {
            println!("    {warning}");
        }
        if step.warnings_suppressed > 0 {
            println!("    ... {} more warnings", step.warnings_suppressed);
        }
    }
    println!("{}", report.summary());
}

fn handle_preview(
    catalog: &Catalog,
    config: EngineConfig,
    pipeline: &Path,
    input: &Path,
    rows: Option<usize>,
) -> Result<()> {
    let (built, table) = load(catalog, pipeline, input)?;
    let built = built.with_config(config);
    let report = match rows {
        Some(rows) => built.preview(&table, rows),
        None => built.preview_default(&table),
    };
    print_report(&report);

    let df = report.table().to_dataframe()?;
    println!("{df}");
    if report.total_rows() > report.table().row_count() {
        println!(
            "Showing {} of {} rows.",
            report.table().row_count(),
            report.total_rows()
        );
    }
    Ok(())
}

fn handle_run(
    catalog: &Catalog,
    config: EngineConfig,
    pipeline: &Path,
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let (built, table) = load(catalog, pipeline, input)?;
    let report = built.with_config(config).run(&table);
    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    let Some(result) = report.output() else {
        anyhow::bail!("Pipeline failed; nothing was written to {}", output.display());
    };
    frame::write_csv(result, output)?;
    println!("Wrote {} rows to {}", result.row_count(), output.display());
    Ok(())
}
