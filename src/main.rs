use clap::error::ErrorKind;
use env_example::{
  cli::{ArgsError, Cli, ParseFailure},
  example::EnvExample,
};
use std::{fmt, process::ExitCode};

const TAG: &str = "[env-example]";

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn fail(err: impl fmt::Display) -> ExitCode {
  eprintln!("{TAG} {err}");
  ExitCode::FAILURE
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse_ordered_from(std::env::args_os()) {
    Ok(cli) => cli,
    Err(ParseFailure::Clap(err)) if err.kind() == ErrorKind::DisplayVersion => {
      println!("{}", env!("CARGO_PKG_VERSION"));
      return ExitCode::SUCCESS;
    }
    Err(ParseFailure::Clap(err)) if err.kind() == ErrorKind::DisplayHelp => err.exit(),
    Err(failure) => return fail(ArgsError::from(failure)),
  };

  setup_tracing(cli.verbose);

  let options = match cli.into_options() {
    Ok(options) => options,
    Err(err) => return fail(err),
  };

  match EnvExample::generate(&options) {
    Ok(report) => {
      if !options.quiet {
        println!("{TAG} {report}");
      }
      ExitCode::SUCCESS
    }
    Err(err) => fail(err),
  }
}
