use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::LevelFilter;

use tokviz::chart::{self, ChartData, ChartKind};
use tokviz::data::archive::{Converter, DEFAULT_CONVERTER};
use tokviz::data::loader::BundleSources;
use tokviz::figure::FigureConfig;
use tokviz::state::Session;

#[derive(Parser)]
#[command(author, version, about = "Chart data for tokenizer-evaluation result bundles")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the chart kinds and their selection constraints
    Kinds,

    /// Import a bundle and print a summary of its contents
    Inspect(BundleArgs),

    /// Check a figure configuration against its chart kind
    Validate(FigureArgs),

    /// Print the chart data for a figure configuration
    Render {
        #[command(flatten)]
        figure: FigureArgs,

        /// Emit a matrix table as CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Args)]
struct BundleArgs {
    /// Metadata JSON (tokenizers, languages, metrics)
    #[arg(long, value_hint = ValueHint::FilePath)]
    metadata: PathBuf,

    /// Results file: converter JSON output, or an archive for the converter
    #[arg(long, value_hint = ValueHint::FilePath)]
    results: PathBuf,

    /// Standalone language-info JSON, overriding the metadata's table
    #[arg(long, value_hint = ValueHint::FilePath)]
    languages_info: Option<PathBuf>,

    /// Command turning a results archive into JSON on stdout
    #[arg(long, env = "TOKVIZ_CONVERTER", default_value = DEFAULT_CONVERTER)]
    converter: String,
}

#[derive(Args)]
struct FigureArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// Figure configuration JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    figure: PathBuf,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG still wins when set.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_session(args: &BundleArgs) -> Result<Session> {
    let converter = Converter::from_command_line(&args.converter)?;
    let sources = BundleSources {
        metadata: args.metadata.clone(),
        results: args.results.clone(),
        languages_info: args.languages_info.clone(),
    };
    let mut session = Session::new();
    session.import(&sources, &converter)?;
    if let Some(msg) = &session.status_message {
        log::info!("{msg}");
    }
    Ok(session)
}

fn load_figure(session: &mut Session, path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading figure file {}", path.display()))?;
    let mut figure: FigureConfig = serde_json::from_str(&text).context("parsing figure JSON")?;
    let id = session.add_figure(figure.kind);
    figure.id = id.clone();
    session.update_figure(figure)?;
    Ok(id)
}

fn print_kinds(out: &mut impl Write) -> Result<()> {
    for kind in ChartKind::ALL {
        let c = kind.constraints();
        writeln!(out, "{}  ({})", kind.id(), kind.display_name())?;
        writeln!(out, "    {}", kind.description())?;
        writeln!(
            out,
            "    metrics: {} ({}), tokenizers: {}, languages: {}",
            c.metrics, c.dimension, c.tokenizers, c.languages
        )?;
    }
    Ok(())
}

fn print_summary(out: &mut impl Write, session: &Session) -> Result<()> {
    let Some(ds) = session.current() else {
        bail!("no dataset loaded");
    };
    writeln!(out, "dataset:    {}", ds.name)?;
    writeln!(out, "tokenizers: {}", ds.universe.tokenizers().join(", "))?;
    writeln!(out, "languages:  {}", ds.universe.languages().len())?;
    writeln!(out, "metrics:")?;
    for (name, rank) in ds.dimensionality() {
        let shape = ds
            .metric(&name)
            .map(|a| format!("{:?}", a.shape()))
            .unwrap_or_default();
        writeln!(out, "    {name:<24} {rank} {shape}")?;
    }
    if !ds.missing.is_empty() {
        writeln!(out, "missing:    {}", ds.missing.join(", "))?;
    }
    for (name, reason) in &ds.rejected {
        writeln!(out, "rejected:   {name}: {reason}")?;
    }
    if !ds.languages_info.is_empty() {
        writeln!(out, "language info entries: {}", ds.languages_info.len())?;
    }
    for kind in ChartKind::ALL {
        let usable = chart::metrics_for(kind, &ds.dimensionality(), &ds.metric_names);
        writeln!(out, "{:<24} {}", kind.id(), usable.join(", "))?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Kinds => print_kinds(&mut out)?,
        Command::Inspect(bundle) => {
            let session = load_session(&bundle)?;
            print_summary(&mut out, &session)?;
        }
        Command::Validate(args) => {
            let mut session = load_session(&args.bundle)?;
            let id = load_figure(&mut session, &args.figure)?;
            let violations = session.validate(&id);
            if violations.is_empty() {
                writeln!(out, "ok")?;
            } else {
                for v in &violations {
                    writeln!(out, "{v}")?;
                }
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Render { figure, csv } => {
            let mut session = load_session(&figure.bundle)?;
            let id = load_figure(&mut session, &figure.figure)?;
            for v in session.validate(&id) {
                log::warn!("{v}");
            }
            let data = session.render(&id);
            match (&data, csv) {
                (ChartData::Table(table), true) => table.write_csv(&mut out)?,
                (_, true) => bail!("--csv only applies to metric tables"),
                _ => {
                    serde_json::to_writer_pretty(&mut out, &data).context("writing chart JSON")?;
                    writeln!(out)?;
                }
            }
            if !data.is_available() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
