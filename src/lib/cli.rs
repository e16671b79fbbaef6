use std::{ffi::OsString, path::PathBuf};

use clap::{
  ArgAction, CommandFactory, FromArgMatches, Parser,
  error::{ContextKind, ContextValue, ErrorKind},
};

use crate::example::{DEFAULT_INPUT_FILENAME, DEFAULT_OUTPUT_FILENAME, EnvExampleOptions};

#[derive(Debug, Parser)]
#[command(
  name = "env-example",
  about = "Generate a commit-safe .env.example from your real env files",
  version,
  disable_version_flag = true,
  override_usage = "env-example [OPTIONS]\n       env-example [INPUT=.env] [OUTPUT=.env.example]"
)]
pub struct Cli {
  /// .env file to read (repeat to merge multiple files)
  #[arg(short, long = "input", value_name = "FILE", allow_hyphen_values = true)]
  pub inputs: Vec<String>,

  /// Output file path [default: .env.example]
  #[arg(short, long, value_name = "FILE", allow_hyphen_values = true)]
  pub output: Option<String>,

  /// Placeholder for every variable [default: empty]
  #[arg(short, long, value_name = "VALUE", allow_hyphen_values = true)]
  pub placeholder: Option<String>,

  /// Copy real values instead of blank/placeholder
  #[arg(long)]
  pub keep_values: bool,

  /// Overwrite output if it already exists
  #[arg(long)]
  pub force: bool,

  /// Keep duplicate keys instead of skipping them
  #[arg(long)]
  pub allow_duplicates: bool,

  /// Only print errors
  #[arg(short, long)]
  pub quiet: bool,

  /// Verbose logging (--verbose for debug, twice for trace)
  #[arg(long, action = ArgAction::Count)]
  pub verbose: u8,

  /// Show package version
  #[arg(short = 'v', long, action = ArgAction::Version)]
  version: (),

  /// Input file, then output file
  #[arg(value_name = "PATH")]
  pub paths: Vec<String>,

  /// Command line positions of `inputs`, `output` and `paths`.
  #[arg(skip)]
  positions: Positions,
}

#[derive(Debug, Clone, Default)]
struct Positions {
  inputs: Vec<usize>,
  output: Option<usize>,
  paths: Vec<usize>,
}

enum Slot {
  Input(String),
  Output(String),
  Path(String),
}

impl Cli {
  /// Parses like [`Parser::try_parse_from`], also recording where each input,
  /// output and bare path appeared so they can be resolved in command line order.
  ///
  /// A bare `--` is rejected as an unknown argument.
  pub fn try_parse_ordered_from<I, T>(args: I) -> Result<Self, ParseFailure>
  where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
  {
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let matches = Self::command()
      .try_get_matches_from(args.iter().cloned())
      .map_err(ParseFailure::Clap)?;

    if let Some(escape) = find_escape(&args) {
      return Err(ParseFailure::Args(ArgsError::UnknownArgument(escape)));
    }

    let mut cli = Self::from_arg_matches(&matches).map_err(ParseFailure::Clap)?;
    cli.positions = Positions {
      inputs: matches
        .indices_of("inputs")
        .map(Iterator::collect)
        .unwrap_or_default(),
      output: matches.index_of("output"),
      paths: matches
        .indices_of("paths")
        .map(Iterator::collect)
        .unwrap_or_default(),
    };

    Ok(cli)
  }

  /// Shapes the parsed arguments into run options. Never touches the filesystem.
  ///
  /// Walking the command line in order, a bare path becomes an input when no
  /// input has been given yet, otherwise the output when none has been given yet.
  pub fn into_options(self) -> Result<EnvExampleOptions, ArgsError> {
    let Cli {
      inputs: input_args,
      output: output_arg,
      placeholder,
      keep_values,
      force,
      allow_duplicates,
      quiet,
      paths,
      positions,
      ..
    } = self;

    // Without recorded positions, options sort ahead of bare paths.
    let mut slots: Vec<(usize, Slot)> = Vec::new();
    for (i, input) in input_args.into_iter().enumerate() {
      slots.push((positions.inputs.get(i).copied().unwrap_or(0), Slot::Input(input)));
    }
    if let Some(output) = output_arg {
      slots.push((positions.output.unwrap_or(0), Slot::Output(output)));
    }
    for (i, path) in paths.into_iter().enumerate() {
      slots.push((positions.paths.get(i).copied().unwrap_or(usize::MAX), Slot::Path(path)));
    }
    slots.sort_by_key(|(position, _)| *position);

    let mut inputs = Vec::new();
    let mut output = None;
    for (_, slot) in slots {
      match slot {
        Slot::Input(input) => inputs.push(input),
        Slot::Output(path) => output = Some(path),
        Slot::Path(path) if path.starts_with('-') => {
          return Err(ArgsError::UnknownArgument(path));
        }
        Slot::Path(path) if inputs.is_empty() => inputs.push(path),
        Slot::Path(path) if output.is_none() => output = Some(path),
        Slot::Path(path) => return Err(ArgsError::UnknownArgument(path)),
      }
    }

    let mut inputs: Vec<PathBuf> = inputs
      .into_iter()
      .filter(|input| !input.is_empty())
      .map(PathBuf::from)
      .collect();

    if inputs.is_empty() {
      inputs.push(PathBuf::from(DEFAULT_INPUT_FILENAME));
    }

    Ok(EnvExampleOptions {
      inputs,
      output: PathBuf::from(output.as_deref().unwrap_or(DEFAULT_OUTPUT_FILENAME)),
      placeholder: placeholder.unwrap_or_default(),
      keep_values,
      force,
      allow_duplicates,
      quiet,
    })
  }
}

/// First bare `--` on the command line, skipping values of options that take one.
fn find_escape(args: &[OsString]) -> Option<String> {
  let mut expects_value = false;

  for arg in args.iter().skip(1) {
    let arg = arg.to_string_lossy();
    if expects_value {
      expects_value = false;
      continue;
    }
    if arg == "--" {
      return Some(arg.into_owned());
    }
    expects_value = takes_separate_value(&arg);
  }

  None
}

fn takes_separate_value(arg: &str) -> bool {
  if let Some(long) = arg.strip_prefix("--") {
    return matches!(long, "input" | "output" | "placeholder");
  }

  // Short clusters: flags first, a value-taking option last (`-qi FILE`).
  let Some(short) = arg.strip_prefix('-') else {
    return false;
  };
  let mut chars = short.chars();
  match chars.next_back() {
    Some(last) => "iop".contains(last) && chars.all(|c| "qhv".contains(c)),
    None => false,
  }
}

/// Why the command line could not be turned into a [`Cli`].
#[derive(Debug)]
pub enum ParseFailure {
  /// clap stopped, including for `--help` and `--version`.
  Clap(clap::Error),
  Args(ArgsError),
}

impl From<ParseFailure> for ArgsError {
  fn from(failure: ParseFailure) -> Self {
    match failure {
      ParseFailure::Clap(err) => err.into(),
      ParseFailure::Args(err) => err,
    }
  }
}

/// Errors in the command line itself.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArgsError {
  #[error("Unknown argument: {0}")]
  UnknownArgument(String),
  #[error("Option {0} requires a value.")]
  MissingValue(String),
  #[error("{0}")]
  Other(String),
}

impl From<clap::Error> for ArgsError {
  fn from(err: clap::Error) -> Self {
    let invalid_arg = match err.get(ContextKind::InvalidArg) {
      Some(ContextValue::String(arg)) => Some(arg.clone()),
      _ => None,
    };

    match (err.kind(), invalid_arg) {
      (ErrorKind::UnknownArgument, Some(arg)) => ArgsError::UnknownArgument(arg),
      // clap reports the option as `--output <FILE>`
      (ErrorKind::InvalidValue, Some(arg)) => ArgsError::MissingValue(
        arg.split_whitespace().next().unwrap_or_default().to_string(),
      ),
      _ => {
        let rendered = err.render().to_string();
        let line = rendered.lines().next().unwrap_or_default();
        ArgsError::Other(line.trim_start_matches("error: ").to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options(args: &[&str]) -> Result<EnvExampleOptions, ArgsError> {
    let cli = Cli::try_parse_ordered_from(std::iter::once("env-example").chain(args.iter().copied()))?;
    cli.into_options()
  }

  #[test]
  fn test_defaults() {
    assert_eq!(options(&[]).unwrap(), EnvExampleOptions::default());
  }

  #[test]
  fn test_long_and_short_forms() {
    let parsed = options(&[
      "--input=a.env",
      "-i",
      "b.env",
      "--output",
      "out/.env.example",
      "-p",
      "xxx",
      "--keep-values",
      "--force",
      "--allow-duplicates",
      "-q",
    ])
    .unwrap();

    assert_eq!(
      parsed,
      EnvExampleOptions {
        inputs: vec![PathBuf::from("a.env"), PathBuf::from("b.env")],
        output: PathBuf::from("out/.env.example"),
        placeholder: "xxx".to_string(),
        keep_values: true,
        force: true,
        allow_duplicates: true,
        quiet: true,
      }
    );
  }

  #[test]
  fn test_positionals_fill_input_then_output() {
    let parsed = options(&["local.env", "local.example"]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("local.env")]);
    assert_eq!(parsed.output, PathBuf::from("local.example"));

    let parsed = options(&["-i", "a.env", "out.example"]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("a.env")]);
    assert_eq!(parsed.output, PathBuf::from("out.example"));
  }

  #[test]
  fn test_positional_before_input_option_is_an_input() {
    let parsed = options(&["a.env", "-i", "b.env"]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("a.env"), PathBuf::from("b.env")]);
    assert_eq!(parsed.output, PathBuf::from(DEFAULT_OUTPUT_FILENAME));

    let parsed = options(&["a.env", "b.example", "-i", "c.env"]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("a.env"), PathBuf::from("c.env")]);
    assert_eq!(parsed.output, PathBuf::from("b.example"));
  }

  #[test]
  fn test_later_output_option_overrides_positional() {
    let parsed = options(&["a.env", "b.example", "-o", "c.example"]).unwrap();
    assert_eq!(parsed.output, PathBuf::from("c.example"));

    assert_eq!(
      options(&["-o", "c.example", "a.env", "b.example"]).unwrap_err(),
      ArgsError::UnknownArgument("b.example".to_string())
    );
  }

  #[test]
  fn test_unordered_cli_puts_options_first() {
    let cli = Cli::try_parse_from(["env-example", "a.env", "-i", "b.env"]).unwrap();
    let parsed = cli.into_options().unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("b.env"), PathBuf::from("a.env")]);
  }

  #[test]
  fn test_extra_positional_is_rejected() {
    assert_eq!(
      options(&["a", "b", "c"]).unwrap_err(),
      ArgsError::UnknownArgument("c".to_string())
    );
    assert_eq!(
      options(&["-o", "out", "-i", "in", "extra"]).unwrap_err(),
      ArgsError::UnknownArgument("extra".to_string())
    );
  }

  #[test]
  fn test_empty_inputs_fall_back_to_default() {
    let parsed = options(&["--input=", "-i", ""]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from(DEFAULT_INPUT_FILENAME)]);
  }

  #[test]
  fn test_placeholder_may_start_with_dash() {
    assert_eq!(options(&["-p", "-x-"]).unwrap().placeholder, "-x-");
    assert_eq!(options(&["--placeholder", "--dashed"]).unwrap().placeholder, "--dashed");
  }

  #[test]
  fn test_input_and_output_may_start_with_dash() {
    let parsed = options(&["-i", "--force", "--output", "-out"]).unwrap();
    assert_eq!(parsed.inputs, vec![PathBuf::from("--force")]);
    assert_eq!(parsed.output, PathBuf::from("-out"));
    assert!(!parsed.force);
  }

  #[test]
  fn test_bare_double_dash_is_unknown() {
    assert_eq!(
      options(&["--", "a.env"]).unwrap_err(),
      ArgsError::UnknownArgument("--".to_string())
    );
    assert_eq!(options(&["-qp", "--"]).unwrap().placeholder, "--");
  }

  #[test]
  fn test_unknown_flag() {
    assert_eq!(
      options(&["--bogus"]).unwrap_err(),
      ArgsError::UnknownArgument("--bogus".to_string())
    );
  }

  #[test]
  fn test_missing_value() {
    assert_eq!(
      options(&["--output"]).unwrap_err(),
      ArgsError::MissingValue("--output".to_string())
    );
  }

  #[test]
  fn test_help_and_version_short_circuit() {
    let err = Cli::try_parse_from(["env-example", "--version", "--bogus"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);

    let err = Cli::try_parse_ordered_from(["env-example", "-v", "--"]).unwrap_err();
    assert!(matches!(err, ParseFailure::Clap(ref e) if e.kind() == ErrorKind::DisplayVersion));

    let err = Cli::try_parse_from(["env-example", "-h", "-i"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
  }
}
