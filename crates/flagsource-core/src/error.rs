//! Error types for flagsource
//!
//! Errors are structured: a kind, the flag they concern, an optional
//! actionable help message, and the underlying cause.

use std::fmt;

/// Result type alias for flagsource operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flagsource operations
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Primary name of the flag the error concerns
    pub flag: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external value could not be coerced to the flag's type
    Parse {
        /// The raw string that failed to parse
        value: String,
        /// Where the raw string came from ("environment variable X", "file P", ...)
        source: String,
        /// Name of the flag kind ("uint", "duration", ...)
        type_name: String,
    },
    /// A file source could not be read (strict file mode only)
    FileRead { path: String },
    /// Two flags tried to register the same name
    DuplicateFlag { name: String },
    /// The command line named a flag that is not registered
    UnknownFlag { name: String },
    /// A command-line argument looks like a flag but is malformed
    BadFlagSyntax { arg: String },
    /// A value-taking flag appeared without its value
    MissingValue { name: String },
    /// Required flags were not supplied by any source
    RequiredFlagsMissing { names: Vec<String> },
    /// A flag manifest could not be loaded or is invalid
    Manifest,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            flag: None,
            help: None,
            cause: None,
        }
    }

    /// Create a parse error for a value that failed coercion
    pub fn parse(
        flag: impl Into<String>,
        type_name: impl Into<String>,
        value: impl Into<String>,
        source: impl fmt::Display,
        cause: impl fmt::Display,
    ) -> Self {
        let source = source.to_string();
        let help = if source.starts_with("environment variable ") {
            format!(
                "Fix or unset the {} so it holds a valid value",
                source
            )
        } else if source.starts_with("file ") {
            format!("Fix the contents of the {}", source)
        } else {
            "Pass a valid value on the command line".to_string()
        };
        Self {
            kind: ErrorKind::Parse {
                value: value.into(),
                source,
                type_name: type_name.into(),
            },
            flag: Some(flag.into()),
            help: Some(help),
            cause: Some(cause.to_string()),
        }
    }

    /// Create a file read error (strict file mode)
    pub fn file_read(
        flag: impl Into<String>,
        path: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        let path = path.into();
        Self {
            help: Some(format!(
                "Check that '{}' exists and is readable, or remove it from the flag's file path",
                path
            )),
            cause: Some(cause.to_string()),
            flag: Some(flag.into()),
            ..Self::new(ErrorKind::FileRead { path })
        }
    }

    /// Create a duplicate flag error
    pub fn duplicate_flag(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            help: Some(format!(
                "Each name and alias may be registered once per flag set; rename one '{}'",
                name
            )),
            flag: Some(name.clone()),
            ..Self::new(ErrorKind::DuplicateFlag { name })
        }
    }

    /// Create an unknown flag error
    pub fn unknown_flag(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            help: Some(format!("Check the spelling of '{}'", name)),
            ..Self::new(ErrorKind::UnknownFlag { name })
        }
    }

    /// Create a bad flag syntax error
    pub fn bad_flag_syntax(arg: impl Into<String>) -> Self {
        Self {
            help: Some("Write flags as -name, --name, -name=value or --name value".into()),
            ..Self::new(ErrorKind::BadFlagSyntax { arg: arg.into() })
        }
    }

    /// Create a missing value error
    pub fn missing_value(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            help: Some(format!("Pass a value: --{} <value>", name)),
            flag: Some(name.clone()),
            ..Self::new(ErrorKind::MissingValue { name })
        }
    }

    /// Create an error listing required flags nobody supplied
    pub fn required_flags_missing(names: Vec<String>) -> Self {
        Self {
            help: Some(
                "Set the flags on the command line or through their environment variables or files"
                    .into(),
            ),
            ..Self::new(ErrorKind::RequiredFlagsMissing { names })
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Manifest)
        }
    }

    /// Add flag context to the error
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse {
                value,
                source,
                type_name,
            } => {
                write!(
                    f,
                    "could not parse {:?} as {} value from {} for flag {}",
                    value,
                    type_name,
                    source,
                    self.flag.as_deref().unwrap_or("<unnamed>")
                )?;
                if let Some(cause) = &self.cause {
                    write!(f, ": {}", cause)?;
                }
            }
            ErrorKind::FileRead { path } => write!(f, "could not read file {}", path)?,
            ErrorKind::DuplicateFlag { name } => write!(f, "flag redefined: {}", name)?,
            ErrorKind::UnknownFlag { name } => {
                write!(f, "flag provided but not defined: -{}", name)?
            }
            ErrorKind::BadFlagSyntax { arg } => write!(f, "bad flag syntax: {}", arg)?,
            ErrorKind::MissingValue { name } => write!(f, "flag needs an argument: -{}", name)?,
            ErrorKind::RequiredFlagsMissing { names } => {
                let quoted: Vec<String> = names.iter().map(|n| format!("{:?}", n)).collect();
                if names.len() == 1 {
                    write!(f, "Required flag {} not set", quoted[0])?
                } else {
                    write!(f, "Required flags {} not set", quoted.join(", "))?
                }
            }
            ErrorKind::Manifest => write!(f, "Invalid flag manifest")?,
        }

        // Parse errors carry the flag and cause inline
        if !matches!(self.kind, ErrorKind::Parse { .. }) {
            if let Some(flag) = &self.flag {
                write!(f, "\n  Flag: {}", flag)?;
            }
            if let Some(cause) = &self.cause {
                write!(f, "\n  {}", cause)?;
            }
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
