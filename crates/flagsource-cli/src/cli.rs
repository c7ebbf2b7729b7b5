//! flagsource CLI - inspect how flags resolve from their sources
//!
//! Usage:
//!   flagsource resolve flags.yaml -- --port 9000
//!   flagsource get flags.yaml port
//!   flagsource check flags.yaml

use clap::{Parser, Subcommand};
use colored::Colorize;
use flagsource_core::{
    apply_flags, check_required_flags, Error, ErrorKind, FlagDefinition, FlagSet, Manifest,
    ResolverOptions, SourceResolver,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// flagsource - Resolve flags from the command line, environment and files
#[derive(Parser)]
#[command(name = "flagsource")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every flag in a manifest and show where each value came from
    Resolve {
        /// Flag manifest (YAML or JSON)
        manifest: PathBuf,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Fail when a flag's file exists in the manifest but cannot be read
        #[arg(long)]
        strict_files: bool,

        /// Include hidden flags
        #[arg(short, long)]
        all: bool,

        /// Command-line arguments to parse after environment and files
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print the effective value of one flag
    Get {
        /// Flag manifest (YAML or JSON)
        manifest: PathBuf,

        /// Flag name or alias
        name: String,

        /// Fail when a flag's file exists in the manifest but cannot be read
        #[arg(long)]
        strict_files: bool,

        /// Command-line arguments to parse after environment and files
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Check that manifests load and their defaults parse
    Check {
        /// Manifest file(s) to check
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            manifest,
            format,
            strict_files,
            all,
            args,
        } => cmd_resolve(&manifest, &format, strict_files, all, &args),

        Commands::Get {
            manifest,
            name,
            strict_files,
            args,
        } => cmd_get(&manifest, &name, strict_files, &args),

        Commands::Check { manifests } => cmd_check(&manifests),
    }
}

/// A manifest's flags after resolution
struct Resolved {
    flags: Vec<Box<dyn FlagDefinition>>,
    set: FlagSet,
}

/// One row of `resolve` output
#[derive(Debug, Clone, PartialEq)]
struct FlagReport {
    name: String,
    aliases: Vec<String>,
    kind: &'static str,
    value: String,
    default: String,
    source: String,
    set: bool,
    required: bool,
}

fn load_manifest(path: &Path) -> Result<Manifest, String> {
    Manifest::from_file(path).map_err(|e| format!("Failed to load {}: {}", path.display(), e))
}

fn resolve(
    manifest: &Manifest,
    resolver: &SourceResolver,
    args: &[String],
) -> Result<Resolved, Error> {
    let mut flags = manifest.build()?;
    let mut set = FlagSet::new("flagsource");
    apply_flags(&mut flags, &mut set, resolver)?;
    set.parse(args.iter().cloned())?;
    Ok(Resolved { flags, set })
}

fn resolver(strict_files: bool) -> SourceResolver {
    SourceResolver::new().with_options(ResolverOptions { strict_files })
}

/// Malformed input exits with 2, resolution failures with 1
fn exit_code_for(err: &Error) -> ExitCode {
    match err.kind {
        ErrorKind::Manifest
        | ErrorKind::DuplicateFlag { .. }
        | ErrorKind::UnknownFlag { .. }
        | ErrorKind::BadFlagSyntax { .. }
        | ErrorKind::MissingValue { .. } => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}

fn report(resolved: &Resolved, include_hidden: bool) -> Vec<FlagReport> {
    resolved
        .flags
        .iter()
        .filter(|flag| include_hidden || !flag.is_hidden())
        .map(|flag| {
            let name = flag.name().to_string();
            FlagReport {
                aliases: flag.names().into_iter().skip(1).collect(),
                kind: flag.type_name(),
                value: resolved.set.raw_string(&name).unwrap_or_default(),
                default: flag.get_default_text(),
                source: resolved
                    .set
                    .source(&name)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                set: flag.is_set(&resolved.set),
                required: flag.is_required(),
                name,
            }
        })
        .collect()
}

fn report_json(rows: &[FlagReport], args: &[String]) -> serde_json::Value {
    let flags: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "name": row.name,
                "aliases": row.aliases,
                "kind": row.kind,
                "value": row.value,
                "default": row.default,
                "source": row.source,
                "set": row.set,
                "required": row.required,
            })
        })
        .collect();
    serde_json::json!({ "flags": flags, "args": args })
}

fn print_table(rows: &[FlagReport]) {
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let kind_width = rows.iter().map(|r| r.kind.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|r| r.value.len()).max().unwrap_or(0);

    for row in rows {
        let source = if row.set {
            row.source.green()
        } else {
            row.source.dimmed()
        };
        println!(
            "{}  {:kind_width$}  {:value_width$}  {}",
            format!("{:name_width$}", row.name).bold(),
            row.kind,
            row.value,
            source,
        );
    }
}

fn cmd_resolve(
    manifest_path: &Path,
    format: &str,
    strict_files: bool,
    all: bool,
    args: &[String],
) -> ExitCode {
    let manifest = match load_manifest(manifest_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let resolved = match resolve(&manifest, &resolver(strict_files), args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} Resolution failed\n", "✗".red());
            eprintln!("{}", e);
            return exit_code_for(&e);
        }
    };

    let rows = report(&resolved, all);
    match format {
        "json" => match serde_json::to_string_pretty(&report_json(&rows, resolved.set.args())) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        },
        _ => print_table(&rows),
    }

    if let Err(e) = check_required_flags(&resolved.flags, &resolved.set) {
        eprintln!("\n{} {}", "✗".red(), e);
        return exit_code_for(&e);
    }

    ExitCode::SUCCESS
}

fn cmd_get(manifest_path: &Path, name: &str, strict_files: bool, args: &[String]) -> ExitCode {
    let manifest = match load_manifest(manifest_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let resolved = match resolve(&manifest, &resolver(strict_files), args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return exit_code_for(&e);
        }
    };

    match resolved.set.raw_string(name) {
        Some(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("{}: Flag '{}' not defined", "Error".red(), name);
            ExitCode::from(1)
        }
    }
}

/// Build and apply a manifest's flags with no environment and no files, so
/// only the manifest itself can fail
fn check_manifest(path: &Path) -> Result<usize, String> {
    let manifest = load_manifest(path)?;
    let isolated = SourceResolver::new()
        .with_environment(flagsource_core::MapEnvironment::new())
        .with_file_system(NoFiles);
    let resolved = resolve(&manifest, &isolated, &[]).map_err(|e| e.to_string())?;
    Ok(resolved.flags.len())
}

/// A filesystem where every file is missing
struct NoFiles;

impl flagsource_core::FileSystem for NoFiles {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not read while checking", path.display()),
        ))
    }
}

fn cmd_check(manifests: &[PathBuf]) -> ExitCode {
    let mut all_valid = true;

    for path in manifests {
        match check_manifest(path) {
            Ok(count) => {
                println!(
                    "{} {}: {} flag{}",
                    "✓".green(),
                    path.display(),
                    count,
                    if count == 1 { "" } else { "s" }
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagsource_core::MapEnvironment;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const MANIFEST: &str = r#"
flags:
  port:
    kind: uint
    aliases: [p]
    env: [CLI_TEST_PORT]
    default: 8080
  verbose:
    kind: bool
  secret:
    kind: string
    hidden: true
"#;

    fn resolved(env: &[(&str, &str)], args: &[&str]) -> Resolved {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let resolver =
            SourceResolver::new().with_environment(env.iter().copied().collect::<MapEnvironment>());
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        match resolve(&manifest, &resolver, &args) {
            Ok(r) => r,
            Err(e) => panic!("resolution failed: {}", e),
        }
    }

    #[test]
    fn test_report_rows() {
        let resolved = resolved(&[("CLI_TEST_PORT", "9000")], &["-verbose", "extra"]);

        let rows = report(&resolved, false);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            FlagReport {
                name: "port".into(),
                aliases: vec!["p".into()],
                kind: "uint",
                value: "9000".into(),
                default: "8080".into(),
                source: "environment variable CLI_TEST_PORT".into(),
                set: true,
                required: false,
            }
        );
        assert_eq!(rows[1].value, "true");
        assert_eq!(rows[1].source, "command line");
        assert_eq!(resolved.set.args(), ["extra"]);
    }

    #[test]
    fn test_report_includes_hidden_on_request() {
        let resolved = resolved(&[], &[]);

        let rows = report(&resolved, true);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].name, "secret");
        assert_eq!(rows[0].source, "default");
        assert!(!rows[0].set);
    }

    #[test]
    fn test_report_json() {
        let resolved = resolved(&[], &["--p", "1"]);
        let rows = report(&resolved, false);

        let json = report_json(&rows, resolved.set.args());

        assert_eq!(json["flags"][0]["name"], "port");
        assert_eq!(json["flags"][0]["value"], "1");
        assert_eq!(json["flags"][0]["source"], "command line");
        assert_eq!(json["args"], serde_json::json!([]));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&Error::unknown_flag("x")), ExitCode::from(2));
        assert_eq!(exit_code_for(&Error::manifest("bad")), ExitCode::from(2));
        assert_eq!(
            exit_code_for(&Error::required_flags_missing(vec!["x".into()])),
            ExitCode::from(1)
        );
        assert_eq!(
            exit_code_for(&Error::parse("x", "uint", "y", "command line", "invalid syntax")),
            ExitCode::from(1)
        );
    }

    #[test]
    fn test_check_manifest_ignores_sources() {
        let path = std::env::temp_dir().join("flagsource_cli_check.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "flags:\n  key:\n    kind: uint\n    file: {}\n",
            path.display()
        )
        .unwrap();

        // The manifest itself is not a valid uint, but files are not read
        assert_eq!(check_manifest(&path), Ok(1));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_check_manifest_reports_duplicate_alias() {
        let path = std::env::temp_dir().join("flagsource_cli_check_dup.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "flags:\n  port:\n    kind: uint\n    aliases: [p]\n  path:\n    kind: path\n    aliases: [p]\n"
        )
        .unwrap();

        let err = check_manifest(&path).unwrap_err();
        assert!(err.starts_with("flag redefined: p"));

        std::fs::remove_file(path).ok();
    }
}
