//! Example file generation.
//!
//! Reads one or more env files, classifies every line, and rebuilds a template
//! with the secret values blanked or replaced by a placeholder.
//!
//! # Merge Logic
//!
//! Input files are processed in the configured order:
//! 1. Comments and unrecognised lines pass through verbatim
//! 2. Runs of blank lines collapse to a single blank line, across file boundaries too
//! 3. The first definition of a key wins; later definitions are dropped unless
//!    duplicates are allowed
//! 4. Each kept entry is written as `key=value` with its inline comment
//!
//! # Examples
//!
//! ```rust,no_run
//! use env_example::example::{EnvExample, EnvExampleOptions};
//!
//! let options = EnvExampleOptions {
//!     placeholder: "changeme".to_string(),
//!     ..EnvExampleOptions::default()
//! };
//!
//! let report = EnvExample::generate(&options).unwrap();
//! println!("{}", report);
//! ```

use std::{
  borrow::Cow,
  collections::HashSet,
  fmt,
  path::{Component, Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

use crate::parse::{EnvEntry, EnvFile, EnvLine, Quote};

pub const DEFAULT_INPUT_FILENAME: &str = ".env";
pub const DEFAULT_OUTPUT_FILENAME: &str = ".env.example";

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Main generation service for example files.
pub struct EnvExample;

impl EnvExample {
  /// Builds the example document and writes it to the configured output.
  ///
  /// Nothing is written unless every input exists, at least one line was
  /// produced, and the output is either absent or `force` is set.
  pub fn generate(options: &EnvExampleOptions) -> Result<Report, EnvExampleError> {
    #[cfg(feature = "tracing")]
    info!("Starting example generation");

    let rendered = Self::render(options)?;

    if options.output.exists() && !options.force {
      return Err(EnvExampleError::OutputExists(options.output.clone()));
    }

    if let Some(parent) = options.output.parent()
      && !parent.as_os_str().is_empty()
    {
      #[cfg(feature = "tracing")]
      debug!("Ensuring output directory: {:?}", parent);
      std::fs::create_dir_all(parent).map_err(EnvExampleError::CreateDir)?;
    }

    #[cfg(feature = "tracing")]
    debug!("Writing example content to {:?}", options.output);

    std::fs::write(&options.output, &rendered.content).map_err(EnvExampleError::Write)?;

    #[cfg(feature = "tracing")]
    info!(entries = rendered.entries, "Generation completed successfully");

    Ok(Report {
      output: display_path(&options.output),
      entries: rendered.entries,
    })
  }

  /// Reads every input and builds the example document in memory.
  pub fn render(options: &EnvExampleOptions) -> Result<Rendered, EnvExampleError> {
    let mut accumulator = Accumulator::new(options);

    for input in &options.inputs {
      #[cfg(feature = "tracing")]
      debug!(?input, "Reading input file");

      if !input.exists() {
        return Err(EnvExampleError::InputNotFound(input.clone()));
      }

      let content = std::fs::read_to_string(input).map_err(|source| EnvExampleError::InputIo {
        path: input.clone(),
        source,
      })?;

      accumulator.extend(EnvFile::from(content.as_str()));
    }

    accumulator.finish()
  }

  /// Right-hand side to emit for `entry`.
  pub fn transform_value<'a>(entry: &EnvEntry<'a>, options: &EnvExampleOptions) -> Cow<'a, str> {
    if options.keep_values {
      return entry.value.clone();
    }

    if options.placeholder.is_empty() {
      return Cow::Borrowed("");
    }

    match entry.quote {
      Quote::None => Cow::Owned(options.placeholder.clone()),
      quote => Cow::Owned(quote.wrap(&options.placeholder)),
    }
  }
}

/// Folds classified lines from any number of documents into one output.
#[derive(Debug)]
pub struct Accumulator<'o> {
  options: &'o EnvExampleOptions,
  seen_keys: HashSet<String>,
  lines: Vec<String>,
  entries: usize,
}

impl<'o> Accumulator<'o> {
  pub fn new(options: &'o EnvExampleOptions) -> Self {
    Self {
      options,
      seen_keys: HashSet::new(),
      lines: Vec::new(),
      entries: 0,
    }
  }

  pub fn extend(&mut self, file: EnvFile<'_>) {
    for line in file.lines {
      self.push(line);
    }
  }

  pub fn push(&mut self, line: EnvLine<'_>) {
    match line {
      EnvLine::Blank => {
        if self.lines.last().is_none_or(|last| !last.is_empty()) {
          self.lines.push(String::new());
        }
      }
      EnvLine::Comment(raw) | EnvLine::Unknown(raw) => self.lines.push(raw.into_owned()),
      EnvLine::Entry(entry) => {
        if !self.options.allow_duplicates && self.seen_keys.contains(&*entry.key) {
          #[cfg(feature = "tracing")]
          trace!("Dropping duplicate key: {}", entry.key);
          return;
        }

        self.seen_keys.insert(entry.key.to_string());
        let value = EnvExample::transform_value(&entry, self.options);
        self.lines.push(entry.with_value(value).to_string());
        self.entries += 1;
      }
    }
  }

  /// Joins the collected lines into the final document.
  ///
  /// Only blank lines, or none at all, is an error.
  pub fn finish(self) -> Result<Rendered, EnvExampleError> {
    if self.lines.iter().all(String::is_empty) {
      return Err(EnvExampleError::NothingToWrite);
    }

    let joined = self.lines.join("\n");
    let mut content = EXCESS_NEWLINES.replace_all(&joined, "\n\n").into_owned();
    content.truncate(content.trim_end_matches('\n').len());
    content.push('\n');

    #[cfg(feature = "tracing")]
    debug!(
      "Rendered {} lines with {} entries",
      self.lines.len(),
      self.entries
    );

    Ok(Rendered {
      content,
      entries: self.entries,
    })
  }
}

/// The in-memory example document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
  pub content: String,
  pub entries: usize,
}

/// Outcome of a successful [`EnvExample::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  /// Output path relative to the current directory when possible.
  pub output: PathBuf,
  pub entries: usize,
}

impl fmt::Display for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let noun = if self.entries == 1 { "entry" } else { "entries" };
    write!(
      f,
      "Created {} with {} {}.",
      self.output.display(),
      self.entries,
      noun
    )
  }
}

fn display_path(path: &Path) -> PathBuf {
  let Ok(cwd) = std::env::current_dir() else {
    return path.to_path_buf();
  };

  relative_to(&normalize(&cwd.join(path)), &normalize(&cwd))
}

/// Resolves `.` and `..` lexically, without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

/// `path` as seen from `base`, climbing out with `..` where needed.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
  let path: Vec<Component> = path.components().collect();
  let base: Vec<Component> = base.components().collect();
  let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

  let mut relative = PathBuf::new();
  for _ in common..base.len() {
    relative.push(Component::ParentDir.as_os_str());
  }
  for component in &path[common..] {
    relative.push(component.as_os_str());
  }
  relative
}

/// Errors that can occur while generating an example file.
#[derive(Debug, thiserror::Error)]
pub enum EnvExampleError {
  /// An input path does not exist
  #[error("Input file not found: {}", .0.display())]
  InputNotFound(PathBuf),
  /// Error reading an input file
  #[error("Failed to read {}: {source}", .path.display())]
  InputIo {
    path: PathBuf,
    source: std::io::Error,
  },
  /// The inputs produced no lines at all
  #[error("Nothing to write. Make sure the input file contains variables.")]
  NothingToWrite,
  /// The output exists and overwriting was not requested
  #[error("Output file \"{}\" already exists. Use --force to overwrite.", .0.display())]
  OutputExists(PathBuf),
  /// Error creating the output directory
  #[error("Failed to create output directory: {0}")]
  CreateDir(std::io::Error),
  /// Error writing the example content
  #[error("Write error: {0}")]
  Write(std::io::Error),
}

/// Configuration for a single generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvExampleOptions {
  /// Files to merge, in order. Earlier files win on duplicate keys.
  pub inputs: Vec<PathBuf>,
  pub output: PathBuf,
  /// Substituted for every value. Empty means values are blanked.
  pub placeholder: String,
  pub keep_values: bool,
  /// Overwrite `output` if it already exists.
  pub force: bool,
  pub allow_duplicates: bool,
  pub quiet: bool,
}

impl Default for EnvExampleOptions {
  fn default() -> Self {
    Self {
      inputs: vec![PathBuf::from(DEFAULT_INPUT_FILENAME)],
      output: PathBuf::from(DEFAULT_OUTPUT_FILENAME),
      placeholder: String::new(),
      keep_values: false,
      force: false,
      allow_duplicates: false,
      quiet: false,
    }
  }
}
