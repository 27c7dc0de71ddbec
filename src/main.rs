mod artifacts;
mod commands;
mod core;
mod credential;
mod github;
mod release;
mod ui;

use clap::{ArgAction, Parser, Subcommand};
use commands::GlobalOptions;
use core::error::{ReleaseError, print_error};
use release::BranchKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Drive PowerStig releases: dev merges, promotion to stable, publishing
#[derive(Parser)]
#[command(name = "stig-release")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Repository to operate on (default: current directory)
  #[arg(long, global = true, value_name = "PATH")]
  repo: Option<PathBuf>,

  /// Configuration file (default: release.toml at the repository root)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Encrypted credential file
  #[arg(long, global = true, value_name = "FILE")]
  credential: Option<PathBuf>,

  /// More log output (-v debug, -vv trace); RUST_LOG overrides
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Merge a feature or hotfix into the development branch
  #[command(subcommand)]
  DevMerge(DevMergeCommands),

  /// Promote the development branch to stable and publish
  #[command(subcommand)]
  Release(ReleaseCommands),

  /// Show versions and CI state
  Status {
    /// Poll until CI on the development branch settles
    #[arg(long)]
    wait: bool,
  },

  /// Manage the API credential
  #[command(subcommand)]
  Credential(CredentialCommands),
}

#[derive(Subcommand)]
enum DevMergeCommands {
  /// Create the branch, stamp the version and open a pull request
  #[command(disable_version_flag = true)]
  Start {
    /// Kind of change
    #[arg(long, value_enum)]
    kind: BranchKind,
    /// Four-part module version, e.g. 4.2.0.1
    #[arg(long)]
    version: String,
  },

  /// Merge the pull request opened by `start`
  Complete {
    /// Pull request number
    #[arg(long)]
    pr: u64,
    /// Log API errors instead of failing
    #[arg(long)]
    suppress_api_errors: bool,
  },
}

#[derive(Subcommand)]
enum ReleaseCommands {
  /// Open the release pull request once CI is green
  Start {
    /// Poll CI instead of failing on a pending status
    #[arg(long)]
    wait: bool,
  },

  /// Merge the release pull request and publish the release
  Complete {
    /// Pull request number
    #[arg(long)]
    pr: u64,
  },
}

#[derive(Subcommand)]
enum CredentialCommands {
  /// Encrypt and store an API token
  Store {
    /// Token to store (read from stdin when omitted)
    #[arg(long, env = "STIG_RELEASE_TOKEN", hide_env_values = true)]
    token: Option<String>,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs go to stderr; stdout carries only the outcome
fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "info",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let options = GlobalOptions {
    repo: cli.repo,
    config: cli.config,
    credential: cli.credential,
    json: cli.json,
  };

  let result = match cli.command {
    Commands::DevMerge(cmd) => match cmd {
      DevMergeCommands::Start { kind, version } => commands::run_dev_merge_start(&options, kind, &version),
      DevMergeCommands::Complete {
        pr,
        suppress_api_errors,
      } => commands::run_dev_merge_complete(&options, pr, suppress_api_errors),
    },
    Commands::Release(cmd) => match cmd {
      ReleaseCommands::Start { wait } => commands::run_release_start(&options, wait),
      ReleaseCommands::Complete { pr } => commands::run_release_complete(&options, pr),
    },
    Commands::Status { wait } => commands::run_status(&options, wait),
    Commands::Credential(cmd) => match cmd {
      CredentialCommands::Store { token } => commands::run_credential_store(&options, token),
    },
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
