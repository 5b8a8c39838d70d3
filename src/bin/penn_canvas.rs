use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use penn_canvas::app::{App, RunOptions, RunResult};
use penn_canvas::canvas::CanvasHttpClient;
use penn_canvas::config::ConfigLoader;
use penn_canvas::domain::{Instance, ShoppingAction, Tool, parse_report_date};
use penn_canvas::error::CanvasError;
use penn_canvas::output::{BarOutput, JsonOutput, OutputMode, VerboseOutput, print_summary};
use penn_canvas::pipeline::ProgressSink;
use penn_canvas::store::Store;

#[derive(Parser)]
#[command(name = "penn-canvas")]
#[command(about = "Resumable batch administration commands for Penn's Canvas deployment")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Instance::Prod)]
    instance: Instance,

    #[arg(long, global = true)]
    data_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Activate unconfirmed email channels for active users")]
    Email(RunArgs),
    #[command(about = "Enable or disable course shopping for SRS courses")]
    Shopping(ShoppingArgs),
    #[command(about = "Increase storage quota for courses near their limit")]
    Storage(StorageArgs),
    #[command(about = "Enroll incoming students into orientation groups")]
    Orientation(OrientationArgs),
    #[command(about = "Report which courses use an external tool")]
    Tools(ToolsArgs),
    #[command(about = "Archive course discussions, announcements and assignments")]
    Archive(RunArgs),
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Start over, truncating the existing result file.
    #[arg(long)]
    force: bool,

    /// Print one line per processed row.
    #[arg(long)]
    verbose: bool,

    /// Report date (YYYY-MM-DD); defaults to today.
    #[arg(long, value_parser = parse_report_date)]
    date: Option<NaiveDate>,

    /// Read this report instead of searching the reports directory.
    #[arg(long)]
    input: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ShoppingArgs {
    #[arg(value_enum)]
    action: ShoppingAction,

    /// Only courses in this term.
    #[arg(long)]
    term: Option<String>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct StorageArgs {
    /// Quota increase in MB, overriding the config.
    #[arg(long)]
    increment: Option<u64>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct OrientationArgs {
    /// Graduation year of the incoming class.
    #[arg(long)]
    year: i32,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct ToolsArgs {
    #[arg(value_enum)]
    tool: Tool,

    #[command(flatten)]
    run: RunArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CanvasError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CanvasError) -> u8 {
    match error {
        CanvasError::MissingConfig(_)
        | CanvasError::MissingCredentials(_)
        | CanvasError::ReportNotFound { .. } => 2,
        CanvasError::CanvasHttp(_) | CanvasError::CanvasStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref(), cli.instance)?;
    let store = match cli.data_dir.clone().or_else(|| resolved.data_dir.clone()) {
        Some(root) => Store::new_with_root(root),
        None => Store::new()?,
    };
    let client = CanvasHttpClient::new(&resolved.credentials)?;
    let app = App::new(store, client, resolved);

    let run_args = match &cli.command {
        Commands::Email(args) | Commands::Archive(args) => args,
        Commands::Shopping(args) => &args.run,
        Commands::Storage(args) => &args.run,
        Commands::Orientation(args) => &args.run,
        Commands::Tools(args) => &args.run,
    };
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else if run_args.verbose {
        OutputMode::Verbose
    } else {
        OutputMode::Interactive
    };
    let options = RunOptions {
        force: run_args.force,
        date: run_args.date.unwrap_or_else(|| Local::now().date_naive()),
        input: run_args.input.clone(),
    };
    let sink: Box<dyn ProgressSink> = match output_mode {
        OutputMode::NonInteractive => Box::new(JsonOutput),
        OutputMode::Verbose => Box::new(VerboseOutput),
        OutputMode::Interactive => Box::new(BarOutput::new()),
    };

    let result = match &cli.command {
        Commands::Email(_) => app.email(&options, sink.as_ref())?,
        Commands::Shopping(args) => {
            app.shopping(args.action, args.term.as_deref(), &options, sink.as_ref())?
        }
        Commands::Storage(args) => app.storage(args.increment, &options, sink.as_ref())?,
        Commands::Orientation(args) => app.orientation(args.year, &options, sink.as_ref())?,
        Commands::Tools(args) => app.tools(args.tool, &options, sink.as_ref())?,
        Commands::Archive(_) => app.archive(&options, sink.as_ref())?,
    };

    report(&result, output_mode)
}

fn report(result: &RunResult, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_run(result).into_diagnostic(),
        OutputMode::Interactive | OutputMode::Verbose => {
            print_summary(result);
            Ok(())
        }
    }
}
