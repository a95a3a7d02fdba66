use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use snafu::ResultExt;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use verinfo_errors::{CliResult, ConfigReadSnafu, OutputSnafu, SummaryExt, VerResult};
use verinfo_rs::{
    BuildSetting, EmbeddedBuildInfo, ModVersion, Reporter, RootConfig, VcsInfo,
    config::TimeZoneChoice,
};

//
// ──────────────────────────────────────────────────────────────────────────────
//  CLI ARGUMENTS
// ──────────────────────────────────────────────────────────────────────────────
//
// Without a subcommand the binary prints its own version report. Template and
// time-zone flags override what verinfo.yaml says.
//

#[derive(Parser, Debug)]
#[command(name = "verinfo", version, about)]
pub struct Cli {
    /// YAML configuration; defaults to ./verinfo.yaml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// File holding the brief template
    #[arg(long, global = true)]
    brief: Option<PathBuf>,

    /// File holding the detail template
    #[arg(long, global = true)]
    detail: Option<PathBuf>,

    /// Print commit times in UTC instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the version report of this binary
    Show,
    /// Classify version identifiers
    Classify {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Normalize VCS build settings given as KEY=VALUE
    Vcs { settings: Vec<BuildSetting> },
}

//
// ──────────────────────────────────────────────────────────────────────────────
//  OUTPUT
// ──────────────────────────────────────────────────────────────────────────────
//

/// One line describing how `identifier` classifies.
pub fn classify_line(identifier: &str) -> String {
    let version = match ModVersion::parse(identifier) {
        Ok(version) => version,
        Err(err) => return format!("{identifier}: malformed ({})", err.reason),
    };

    let mut line = format!("{identifier}: {}", version.classification());
    if let Some(tag) = version.tag() {
        line.push_str(&format!(" tag={tag}"));
    }
    if let Some(commit_id) = version.commit_id() {
        line.push_str(&format!(" commit={commit_id}"));
    }
    if let Some(time) = version.time() {
        line.push_str(&format!(
            " time={}",
            time.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }

    line
}

pub fn vcs_lines(info: &VcsInfo) -> String {
    let last_commit = info
        .last_commit
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "VCS:         {}\nRevision id: {}\nDirty:       {}\nCommit time: {}\n",
        info.vcs, info.revision, info.is_dirty, last_commit
    )
}

fn read_template(path: &Path) -> VerResult<String> {
    fs::read_to_string(path).context(ConfigReadSnafu {
        path: path.display().to_string(),
    })
}

/// Loads the configuration and applies the command-line overrides.
pub fn load_config(cli: &Cli) -> VerResult<RootConfig> {
    let mut config = RootConfig::discover(cli.config.as_deref())?;

    if let Some(path) = &cli.brief {
        config.brief = Some(read_template(path)?);
    }
    if let Some(path) = &cli.detail {
        config.detail = Some(read_template(path)?);
    }
    if cli.utc {
        config.time_zone = TimeZoneChoice::Utc;
    }

    Ok(config)
}

pub fn run<W: Write>(cli: &Cli, w: &mut W) -> VerResult<()> {
    match cli.command.as_ref().unwrap_or(&Command::Show) {
        Command::Show => {
            let config = load_config(cli)?;
            let reporter = Reporter::from_config(EmbeddedBuildInfo, &config)?;
            reporter.write_version(w)
        }
        Command::Classify { identifiers } => {
            for identifier in identifiers {
                writeln!(w, "{}", classify_line(identifier)).context(OutputSnafu)?;
            }
            Ok(())
        }
        Command::Vcs { settings } => {
            debug!(count = settings.len(), "normalizing settings");
            let info = VcsInfo::from_settings(settings);
            w.write_all(vcs_lines(&info).as_bytes()).context(OutputSnafu)
        }
    }
}

//
// ──────────────────────────────────────────────────────────────────────────────
//  MAIN
// ──────────────────────────────────────────────────────────────────────────────
//
// Dual diagnostics:
//   1. Miette: for handled, structured errors.
//   2. Color-Eyre: for unhandled panics.
// Logs go to stderr, filtered by RUST_LOG (off by default).
//

fn main() -> CliResult<()> {
    color_eyre::install().map_err(|err| miette::miette!("{err}"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_filter(filter),
        )
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(err) = run(&cli, &mut out) {
        // Structured record for the log sink before the terminal diagnostic
        err.to_summary();
        return Err(miette::Report::new(err));
    }

    Ok(())
}

#[cfg(test)]
mod common;
