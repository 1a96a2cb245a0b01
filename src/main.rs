mod commands;
mod core;
mod github;
mod npm;
mod release;
mod ui;
mod versioning;

#[cfg(test)]
mod testing;

use clap::{ArgAction, Parser, Subcommand};
use core::error::{RailError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Staged, integrity-verified releases of npm packages across release trains
#[derive(Parser)]
#[command(name = "release-train")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// More diagnostic output (-v debug, -vv trace)
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  /// Only print errors
  #[arg(short, long, global = true, conflicts_with = "verbose")]
  quiet: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Interactively select and perform a release action
  Publish,

  /// Show the active release trains and LTS branches
  Trains {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Manage registry dist tags of all release packages
  #[command(subcommand)]
  DistTag(DistTagCommands),

  /// Print the integrity hash of a build output directory
  Hash {
    /// Directory to hash
    dir: PathBuf,
  },
}

#[derive(Subcommand)]
enum DistTagCommands {
  /// Point a dist tag at a version
  Set {
    /// Dist tag name (e.g. `latest`, `v12-lts`)
    tag: String,
    /// Version the tag should point to
    version: String,
    /// Leave experimental packages untouched
    #[arg(long)]
    skip_experimental: bool,
  },

  /// Remove a dist tag
  Delete {
    /// Dist tag name
    tag: String,
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

/// `RELEASE_TRAIN_LOG` wins over the -v/-q flags
fn init_tracing(verbose: u8, quiet: bool) {
  let level = match (quiet, verbose) {
    (true, _) => "error",
    (false, 0) => "warn",
    (false, 1) => "debug",
    (false, _) => "trace",
  };
  let filter = EnvFilter::try_from_env("RELEASE_TRAIN_LOG").unwrap_or_else(|_| EnvFilter::new(level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose, cli.quiet);

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(RailError::from(e)),
  };

  let result = match cli.command {
    Commands::Publish => commands::run_publish(&root),
    Commands::Trains { json } => commands::run_trains(&root, json),
    Commands::DistTag(cmd) => match cmd {
      DistTagCommands::Set {
        tag,
        version,
        skip_experimental,
      } => commands::run_dist_tag_set(&root, &tag, &version, skip_experimental),
      DistTagCommands::Delete { tag } => commands::run_dist_tag_delete(&root, &tag),
    },
    Commands::Hash { dir } => commands::run_hash(&dir),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
