//! External value sources
//!
//! The [`SourceResolver`] decides whether an environment variable or a file
//! supplies a flag's value. It knows nothing about flag types: it hands back
//! the raw string and where it came from.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Where a flag's effective value came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueSource {
    /// The compile-time default
    #[default]
    Default,
    /// The trimmed contents of a file
    File(PathBuf),
    /// An environment variable
    EnvVar(String),
    /// An occurrence on the command line
    CommandLine,
}

impl ValueSource {
    /// Whether the value overrides the declared default
    pub fn is_external(&self) -> bool {
        !matches!(self, ValueSource::Default)
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Default => write!(f, "default"),
            ValueSource::File(path) => write!(f, "file {}", path.display()),
            ValueSource::EnvVar(name) => write!(f, "environment variable {}", name),
            ValueSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// A raw value found in an external source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The raw string (file contents are already trimmed)
    pub value: String,
    /// The source that supplied it
    pub source: ValueSource,
}

/// Read access to environment variables
pub trait Environment: Send + Sync {
    /// Look up a variable. Set-but-empty variables return `Some("")`.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        // Non-UTF-8 values cannot feed a string-based flag; treat them as unset
        std::env::var_os(name).and_then(|v| v.into_string().ok())
    }
}

/// A fixed set of variables, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: IndexMap<String, String>,
}

impl MapEnvironment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, returning self for chaining
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Read access to files
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Options controlling source resolution
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Treat a configured but unreadable file as an error instead of "not found"
    pub strict_files: bool,
}

/// Finds external values for flags: environment variables first, then files
#[derive(Clone)]
pub struct SourceResolver {
    env: Arc<dyn Environment>,
    files: Arc<dyn FileSystem>,
    options: ResolverOptions,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SourceResolver {
    /// Create a resolver over the process environment and local filesystem
    pub fn new() -> Self {
        Self {
            env: Arc::new(ProcessEnvironment),
            files: Arc::new(LocalFileSystem),
            options: ResolverOptions::default(),
        }
    }

    /// Use a different environment
    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Use a different filesystem
    pub fn with_file_system(mut self, files: impl FileSystem + 'static) -> Self {
        self.files = Arc::new(files);
        self
    }

    /// Set resolution options
    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Find the external value for a flag.
    ///
    /// Environment variables are checked in order and the first one present
    /// wins, even when empty. Otherwise `file_path` is split on `,` and the
    /// first readable file wins with its contents trimmed. Returns `None` when
    /// neither supplies a value.
    ///
    /// `flag` only labels strict-mode errors.
    pub fn resolve(
        &self,
        flag: &str,
        env_vars: &[String],
        file_path: Option<&str>,
    ) -> Result<Option<Resolution>> {
        for name in env_vars {
            log::trace!("flag {}: checking environment variable {}", flag, name);
            if let Some(value) = self.env.lookup(name) {
                return Ok(Some(Resolution {
                    value,
                    source: ValueSource::EnvVar(name.clone()),
                }));
            }
        }

        let Some(file_path) = file_path else {
            return Ok(None);
        };

        for candidate in file_path.split(',').filter(|p| !p.is_empty()) {
            let path = Path::new(candidate);
            log::trace!("flag {}: reading file {}", flag, path.display());
            match self.files.read_to_string(path) {
                Ok(contents) => {
                    return Ok(Some(Resolution {
                        value: contents.trim().to_string(),
                        source: ValueSource::File(path.to_path_buf()),
                    }));
                }
                Err(e) if self.options.strict_files => {
                    return Err(Error::file_read(flag, candidate, e));
                }
                Err(e) => {
                    log::warn!(
                        "flag {}: ignoring unreadable file {}: {}",
                        flag,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(None)
    }
}
