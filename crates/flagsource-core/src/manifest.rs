//! Flag manifests
//!
//! A manifest declares a set of flags in YAML or JSON, keyed by primary name
//! in declaration order:
//!
//! ```yaml
//! flags:
//!   data-dir:
//!     kind: path
//!     aliases: [d]
//!     env: [APP_DATA_DIR]
//!     file: /etc/app/data_dir
//!     default: /var/lib/app
//!   port:
//!     kind: uint
//!     env: [APP_PORT, PORT]
//!     default: 8080
//!     required: true
//! ```
//!
//! [`Manifest::build`] turns it into boxed [`FlagDefinition`]s ready to be
//! applied.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flag::{Flag, FlagDefinition};
use crate::kind::{
    BoolKind, DurationKind, FlagKind, FloatKind, IntKind, PathKind, StringKind, StringSliceKind,
    UintKind,
};
use crate::value::FlagValue;

/// A declarative set of flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Flags by primary name
    #[serde(default)]
    pub flags: IndexMap<String, FlagSpec>,
}

/// Kind names accepted in manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KindName {
    String,
    Path,
    Bool,
    Int,
    Uint,
    Float,
    Duration,
    StringSlice,
}

/// One flag in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagSpec {
    pub kind: KindName,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Environment variables, highest precedence first
    #[serde(default)]
    pub env: Vec<String>,
    /// File path, or several comma-separated paths
    #[serde(default)]
    pub file: Option<String>,
    /// Declared value; scalars and lists are parsed by the flag's kind
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub default_text: Option<String>,
    /// Numeric base for int and uint flags
    #[serde(default)]
    pub base: Option<u32>,
    /// Element separator for string-slice flags
    #[serde(default)]
    pub separator: Option<char>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub takes_file: bool,
}

impl Manifest {
    /// Parse a manifest from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::manifest(e.to_string()))
    }

    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::manifest(e.to_string()))
    }

    /// Load a manifest, choosing the format from the file extension
    /// (YAML unless it ends in `.json`)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::manifest(format!("could not read {}: {}", path.display(), e))
                .with_help("Check that the manifest path exists and is readable")
        })?;

        log::debug!("loading flag manifest {}", path.display());
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Number of declared flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Build every flag in declaration order
    pub fn build(&self) -> Result<Vec<Box<dyn FlagDefinition>>> {
        self.flags
            .iter()
            .map(|(name, spec)| spec.build(name))
            .collect()
    }
}

impl FlagSpec {
    /// Build the described flag under `name`
    pub fn build(&self, name: &str) -> Result<Box<dyn FlagDefinition>> {
        check_name(name)?;
        for alias in &self.aliases {
            check_name(alias).map_err(|e| e.with_flag(name))?;
        }
        if self.base.is_some() && !matches!(self.kind, KindName::Int | KindName::Uint) {
            return Err(Error::manifest("base only applies to int and uint flags").with_flag(name));
        }
        if self.separator.is_some() && self.kind != KindName::StringSlice {
            return Err(
                Error::manifest("separator only applies to string-slice flags").with_flag(name),
            );
        }

        let base = self.base.unwrap_or(0);
        if base == 1 || base > 36 {
            return Err(Error::manifest(format!("invalid base {}", base))
                .with_flag(name)
                .with_help("Use 0 to detect the base from the prefix, or a base from 2 to 36"));
        }

        match self.kind {
            KindName::String => self.finish(name, Flag::<StringKind>::new(name)),
            KindName::Path => self.finish(name, Flag::<PathKind>::new(name)),
            KindName::Bool => self.finish(name, Flag::<BoolKind>::new(name)),
            KindName::Int => self.finish(name, Flag::with_kind(name, IntKind { base })),
            KindName::Uint => self.finish(name, Flag::with_kind(name, UintKind { base })),
            KindName::Float => self.finish(name, Flag::<FloatKind>::new(name)),
            KindName::Duration => self.finish(name, Flag::<DurationKind>::new(name)),
            KindName::StringSlice => {
                let kind = match self.separator {
                    Some(separator) => StringSliceKind { separator },
                    None => StringSliceKind::default(),
                };
                self.finish(name, Flag::with_kind(name, kind))
            }
        }
    }

    fn finish<K: FlagKind>(&self, name: &str, flag: Flag<K>) -> Result<Box<dyn FlagDefinition>> {
        let mut flag = flag
            .with_usage(self.usage.clone())
            .with_required(self.required)
            .with_hidden(self.hidden)
            .with_takes_file(self.takes_file);
        for alias in &self.aliases {
            flag = flag.with_alias(alias.clone());
        }
        for var in &self.env {
            flag = flag.with_env(var.clone());
        }
        if let Some(file) = &self.file {
            flag = flag.with_file(file.clone());
        }
        if let Some(text) = &self.default_text {
            flag = flag.with_default_text(text.clone());
        }
        if let Some(category) = &self.category {
            flag = flag.with_category(category.clone());
        }

        match &self.default {
            None | Some(serde_json::Value::Null) => {}
            // List elements are taken verbatim, never re-split
            Some(serde_json::Value::Array(items)) => {
                let items = default_list(items).map_err(|e| e.with_flag(name))?;
                let list = FlagValue::StringList(items);
                let value = K::from_value(&list).ok_or_else(|| {
                    Error::manifest(format!(
                        "a list default does not fit a {} flag",
                        flag.kind().type_name()
                    ))
                    .with_flag(name)
                })?;
                flag = flag.with_value(value);
            }
            Some(default) => {
                let raw = default_scalar(default).map_err(|e| e.with_flag(name))?;
                let value = flag.kind().parse(&raw).map_err(|e| {
                    Error::manifest(format!(
                        "default {:?} is not a valid {} value: {}",
                        raw,
                        flag.kind().type_name(),
                        e
                    ))
                    .with_flag(name)
                })?;
                flag = flag.with_value(value);
            }
        }

        Ok(Box::new(flag))
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') || name.contains('=') {
        return Err(Error::manifest(format!("invalid flag name {:?}", name))
            .with_help("Flag names and aliases must be non-empty, must not start with '-' and must not contain '='"));
    }
    Ok(())
}

/// Render a scalar manifest default as the raw string the flag's kind parses
fn default_scalar(value: &serde_json::Value) -> Result<String> {
    use serde_json::Value;

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) => Err(Error::manifest(
            "list defaults may only contain strings, numbers and booleans",
        )),
        Value::Object(_) => Err(Error::manifest("a default cannot be a mapping")),
    }
}

fn default_list(items: &[serde_json::Value]) -> Result<Vec<String>> {
    items.iter().map(default_scalar).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::flag_set::FlagSet;
    use crate::flag::apply_flags;
    use crate::source::{MapEnvironment, SourceResolver};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    const YAML: &str = r#"
flags:
  data-dir:
    kind: path
    aliases: [d]
    env: [APP_DATA_DIR]
    default: /var/lib/app
    usage: where data lives
  port:
    kind: uint
    env: [APP_PORT, PORT]
    default: 8080
    required: true
  mask:
    kind: uint
    base: 16
    default: "ff"
  timeout:
    kind: duration
    default: 1m30s
  tags:
    kind: string-slice
    separator: ";"
    default: [a, b]
  verbose:
    kind: bool
    hidden: true
"#;

    fn apply(manifest: &Manifest, env: &[(&str, &str)]) -> (Vec<Box<dyn FlagDefinition>>, FlagSet) {
        let mut flags = manifest.build().unwrap();
        let mut set = FlagSet::new("app");
        let resolver = SourceResolver::new()
            .with_environment(env.iter().copied().collect::<MapEnvironment>());
        apply_flags(&mut flags, &mut set, &resolver).unwrap();
        (flags, set)
    }

    #[test]
    fn test_yaml_manifest_builds_flags() {
        let manifest = Manifest::from_yaml(YAML).unwrap();
        assert_eq!(manifest.len(), 6);

        let (flags, set) = apply(&manifest, &[("PORT", "9000")]);

        let names: Vec<&str> = flags.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["data-dir", "port", "mask", "timeout", "tags", "verbose"]);
        assert_eq!(flags[0].names(), vec!["data-dir", "d"]);
        assert_eq!(flags[0].usage(), "where data lives");
        assert_eq!(flags[0].get_default_text(), "\"/var/lib/app\"");
        assert_eq!(flags[1].type_name(), "uint");
        assert_eq!(flags[1].get_value(), "9000");
        assert!(flags[1].is_required());
        assert!(flags[5].is_hidden());

        assert_eq!(
            set.value("d"),
            Some(&FlagValue::Path(PathBuf::from("/var/lib/app")))
        );
        assert_eq!(set.value("mask"), Some(&FlagValue::Uint(255)));
        assert_eq!(
            set.value("timeout"),
            Some(&FlagValue::Duration(Duration::from_secs(90)))
        );
        assert_eq!(
            set.value("tags"),
            Some(&FlagValue::StringList(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_json_manifest() {
        let json = r#"{"flags": {"count": {"kind": "int", "default": -3, "env": ["COUNT"]}}}"#;
        let manifest = Manifest::from_json(json).unwrap();

        let (flags, set) = apply(&manifest, &[]);

        assert_eq!(flags[0].get_value(), "-3");
        assert_eq!(set.value("count"), Some(&FlagValue::Int(-3)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Manifest::from_yaml("flags:\n  x:\n    kind: color\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Manifest);
        assert!(err.cause.unwrap().contains("unknown variant"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Manifest::from_yaml("flags:\n  x:\n    kind: path\n    envs: [X]\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Manifest);
    }

    #[test]
    fn test_unparseable_default_rejected() {
        let manifest = Manifest::from_yaml("flags:\n  port:\n    kind: uint\n    default: lots\n").unwrap();

        let err = manifest.build().err().unwrap();

        assert_eq!(err.kind, ErrorKind::Manifest);
        assert_eq!(err.flag.as_deref(), Some("port"));
        assert!(err.to_string().contains("default \"lots\" is not a valid uint value"));
    }

    #[test]
    fn test_misplaced_parameters_rejected() {
        let base_on_path =
            Manifest::from_yaml("flags:\n  data:\n    kind: path\n    base: 8\n").unwrap();
        assert!(base_on_path.build().is_err());

        let bad_base = Manifest::from_yaml("flags:\n  n:\n    kind: uint\n    base: 40\n").unwrap();
        assert!(bad_base.build().is_err());

        let separator_on_uint =
            Manifest::from_yaml("flags:\n  n:\n    kind: uint\n    separator: \";\"\n").unwrap();
        assert!(separator_on_uint.build().is_err());

        let bad_name = Manifest::from_yaml("flags:\n  \"-n\":\n    kind: uint\n").unwrap();
        assert!(bad_name.build().is_err());
    }

    #[test]
    fn test_invalid_aliases_rejected() {
        for alias in ["\"\"", "\"-p\"", "\"p=q\""] {
            let yaml = format!("flags:\n  port:\n    kind: uint\n    aliases: [{}]\n", alias);
            let manifest = Manifest::from_yaml(&yaml).unwrap();

            let err = manifest.build().err().unwrap();

            assert_eq!(err.kind, ErrorKind::Manifest, "alias {}", alias);
            assert_eq!(err.flag.as_deref(), Some("port"));
            assert!(err.to_string().contains("invalid flag name"));
        }
    }

    #[test]
    fn test_list_default_elements_kept_whole() {
        let manifest = Manifest::from_yaml(
            "flags:\n  tags:\n    kind: string-slice\n    default: [\"a,b\", c, 3]\n",
        )
        .unwrap();

        let (flags, set) = apply(&manifest, &[]);

        assert_eq!(
            set.value("tags"),
            Some(&FlagValue::StringList(vec![
                "a,b".into(),
                "c".into(),
                "3".into()
            ]))
        );
        assert_eq!(flags[0].get_default_text(), "\"a,b\", \"c\", \"3\"");
    }

    #[test]
    fn test_list_default_on_scalar_kind_rejected() {
        let manifest =
            Manifest::from_yaml("flags:\n  name:\n    kind: string\n    default: [a, b]\n")
                .unwrap();

        let err = manifest.build().err().unwrap();

        assert_eq!(err.flag.as_deref(), Some("name"));
        assert!(err.to_string().contains("a list default does not fit a string flag"));

        let nested =
            Manifest::from_yaml("flags:\n  tags:\n    kind: string-slice\n    default: [[a]]\n")
                .unwrap();
        assert!(nested.build().is_err());
    }

    #[test]
    fn test_null_default_means_zero_value() {
        let manifest = Manifest::from_yaml("flags:\n  name:\n    kind: string\n    default: ~\n").unwrap();

        let (flags, _) = apply(&manifest, &[]);

        assert_eq!(flags[0].get_value(), "");
        assert_eq!(flags[0].get_default_text(), "");
    }

    #[test]
    fn test_from_file_by_extension() {
        let path = std::env::temp_dir().join("flagsource_manifest_test.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"flags": {{"on": {{"kind": "bool", "default": true}}}}}}"#).unwrap();

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.flags["on"].kind, KindName::Bool);
        assert_eq!(manifest.flags["on"].default, Some(serde_json::json!(true)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_from_missing_file() {
        let err = Manifest::from_file("/nonexistent/flagsource/manifest.yaml").unwrap_err();

        assert_eq!(err.kind, ErrorKind::Manifest);
        assert!(err.help.is_some());
    }
}
