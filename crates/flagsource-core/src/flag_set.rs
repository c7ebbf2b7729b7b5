//! The primitive flag-set
//!
//! A [`FlagSet`] is an arena of typed cells indexed by every name and alias of
//! the flag that owns them. It knows how to read a cell back as a string and
//! how to apply command-line occurrences, nothing more: default capture and
//! environment/file resolution happen in [`crate::flag`].

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::kind::{CoerceError, FlagKind};
use crate::source::ValueSource;
use crate::value::FlagValue;

/// Coerces a raw command-line string into a cell value
pub type ValueParser = Box<dyn Fn(&str) -> std::result::Result<FlagValue, CoerceError>>;

/// Receives every value written to a cell
pub type ValueSink = Box<dyn Fn(&FlagValue)>;

/// Renders a cell value as the raw string its parser reads back
pub type ValueRenderer = Box<dyn Fn(&FlagValue) -> String>;

/// One registered flag's storage
pub struct Cell {
    value: FlagValue,
    default: FlagValue,
    usage: String,
    type_name: &'static str,
    takes_value: bool,
    source: ValueSource,
    parser: ValueParser,
    renderer: ValueRenderer,
    sink: Option<ValueSink>,
}

impl Cell {
    /// Create a cell holding `initial`, which is also its advertised default
    pub fn new(initial: FlagValue, type_name: &'static str, parser: ValueParser) -> Self {
        Self {
            default: initial.clone(),
            value: initial,
            usage: String::new(),
            type_name,
            takes_value: true,
            source: ValueSource::Default,
            parser,
            renderer: Box::new(|value: &FlagValue| value.to_string()),
            sink: None,
        }
    }

    /// Create a cell that parses command-line values with `kind`
    pub fn for_kind<K: FlagKind>(kind: &K, initial: &K::Value) -> Self {
        let parser_kind = kind.clone();
        let parser: ValueParser =
            Box::new(move |raw: &str| parser_kind.parse(raw).map(|v| K::to_value(&v)));
        let render_kind = kind.clone();
        let renderer: ValueRenderer =
            Box::new(move |value: &FlagValue| match K::from_value(value) {
                Some(typed) => render_kind.render(&typed),
                None => value.to_string(),
            });
        let mut cell = Self::new(K::to_value(initial), kind.type_name(), parser);
        cell.takes_value = kind.takes_value();
        cell.renderer = renderer;
        cell
    }

    /// Set the usage text
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Record where the initial value came from
    pub fn with_source(mut self, source: ValueSource) -> Self {
        self.source = source;
        self
    }

    /// Write every value of this cell through to `sink`
    pub fn with_sink(mut self, sink: ValueSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current value
    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    /// Current value as a raw string
    pub fn raw_string(&self) -> String {
        (self.renderer)(&self.value)
    }

    /// Value the cell was registered with
    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    /// Usage text
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Kind name of the owning flag
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the flag consumes an argument on the command line
    pub fn takes_value(&self) -> bool {
        self.takes_value
    }

    /// Where the current value came from
    pub fn source(&self) -> &ValueSource {
        &self.source
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("value", &self.value)
            .field("default", &self.default)
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

/// A string-keyed registry of flag cells
#[derive(Debug, Default)]
pub struct FlagSet {
    name: String,
    cells: Vec<Cell>,
    primary: Vec<String>,
    index: IndexMap<String, usize>,
    args: Vec<String>,
    parsed: bool,
}

impl FlagSet {
    /// Create an empty flag-set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name of this flag-set (usually the command name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a cell under every name in `names`; the first is the primary.
    ///
    /// Fails without registering anything if any name is already taken. A
    /// cell with a sink receives its initial value immediately.
    pub fn register(&mut self, names: &[String], cell: Cell) -> Result<()> {
        let Some(primary) = names.first() else {
            return Ok(());
        };
        for (i, name) in names.iter().enumerate() {
            if self.index.contains_key(name) || names[..i].contains(name) {
                return Err(Error::duplicate_flag(name.clone()));
            }
        }

        if let Some(sink) = &cell.sink {
            sink(&cell.value);
        }

        let slot = self.cells.len();
        self.cells.push(cell);
        self.primary.push(primary.clone());
        for name in names {
            self.index.insert(name.clone(), slot);
        }
        log::trace!("flag set {}: registered {}", self.name, names.join(", "));
        Ok(())
    }

    /// Whether `name` (primary or alias) is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The cell registered under `name`
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.index.get(name).map(|&slot| &self.cells[slot])
    }

    /// The tagged value registered under `name`
    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.cell(name).map(Cell::value)
    }

    /// The string form of the value registered under `name`
    pub fn raw_string(&self, name: &str) -> Option<String> {
        self.cell(name).map(Cell::raw_string)
    }

    /// Where the value registered under `name` came from
    pub fn source(&self, name: &str) -> Option<&ValueSource> {
        self.cell(name).map(Cell::source)
    }

    /// Whether any external source set the flag registered under `name`
    pub fn is_set(&self, name: &str) -> bool {
        self.source(name).is_some_and(ValueSource::is_external)
    }

    /// Primary names of all registered flags, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.primary.iter().map(String::as_str)
    }

    /// Primary name of the flag registered under `name`
    pub fn primary_name(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&slot| self.primary[slot].as_str())
    }

    /// Set a flag from a command-line string
    pub fn set(&mut self, name: &str, raw: &str) -> Result<()> {
        let slot = *self
            .index
            .get(name)
            .ok_or_else(|| Error::unknown_flag(name))?;
        let cell = &mut self.cells[slot];

        let value = (cell.parser)(raw).map_err(|e| {
            Error::parse(
                self.primary[slot].clone(),
                cell.type_name,
                raw,
                ValueSource::CommandLine,
                e,
            )
        })?;

        if let Some(sink) = &cell.sink {
            sink(&value);
        }
        cell.value = value;
        cell.source = ValueSource::CommandLine;
        log::debug!(
            "flag set {}: {} set from command line",
            self.name,
            self.primary[slot]
        );
        Ok(())
    }

    /// Apply command-line arguments.
    ///
    /// Accepts `-name`, `--name`, `-name=value` and `--name value`. Flags
    /// that take no value never consume the next argument but accept
    /// `=value`. Flag parsing stops at `--` or the first non-flag argument;
    /// what follows is available from [`FlagSet::args`].
    pub fn parse<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parsed = true;
        self.args.clear();
        let mut args = args.into_iter().map(Into::<String>::into);

        while let Some(arg) = args.next() {
            if arg == "--" {
                self.args.extend(args);
                return Ok(());
            }
            if arg.len() < 2 || !arg.starts_with('-') {
                self.args.push(arg);
                self.args.extend(args);
                return Ok(());
            }

            let body = arg.strip_prefix("--").unwrap_or(&arg[1..]);
            if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
                return Err(Error::bad_flag_syntax(arg.as_str()));
            }

            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            let slot = *self
                .index
                .get(name)
                .ok_or_else(|| Error::unknown_flag(name))?;

            let raw = match inline {
                Some(value) => value,
                None if !self.cells[slot].takes_value => "true".to_string(),
                None => args.next().ok_or_else(|| Error::missing_value(name))?,
            };
            self.set(name, &raw)?;
        }

        Ok(())
    }

    /// Whether [`FlagSet::parse`] has run
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Arguments left after flag parsing
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::kind::{BoolKind, PathKind, StringSliceKind, UintKind};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_set() -> FlagSet {
        let mut set = FlagSet::new("app");
        set.register(
            &names(&["count", "c"]),
            Cell::for_kind(&UintKind::default(), &3).with_usage("how many"),
        )
        .unwrap();
        set.register(&names(&["verbose", "v"]), Cell::for_kind(&BoolKind, &false))
            .unwrap();
        set.register(
            &names(&["out"]),
            Cell::for_kind(&PathKind, &PathBuf::from("/tmp")),
        )
        .unwrap();
        set
    }

    #[test]
    fn test_register_and_read_back() {
        let set = sample_set();

        assert_eq!(set.raw_string("count").as_deref(), Some("3"));
        assert_eq!(set.raw_string("c").as_deref(), Some("3"));
        assert_eq!(set.raw_string("out").as_deref(), Some("/tmp"));
        assert_eq!(set.raw_string("missing"), None);
        assert_eq!(set.cell("count").unwrap().usage(), "how many");
        assert_eq!(set.primary_name("c"), Some("count"));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["count", "verbose", "out"]);
        assert!(!set.is_set("count"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut set = sample_set();

        let err = set
            .register(&names(&["total", "c"]), Cell::for_kind(&UintKind::default(), &0))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateFlag { name: "c".into() });
        // Nothing was registered
        assert!(!set.contains("total"));

        let err = set
            .register(&names(&["dup", "dup"]), Cell::for_kind(&UintKind::default(), &0))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateFlag { name: "dup".into() });
    }

    #[test]
    fn test_aliases_share_one_cell() {
        let mut set = sample_set();

        set.set("c", "9").unwrap();

        assert_eq!(set.value("count"), Some(&FlagValue::Uint(9)));
        assert_eq!(set.source("count"), Some(&ValueSource::CommandLine));
        assert!(set.is_set("count"));
    }

    #[test]
    fn test_parse_forms() {
        let mut set = sample_set();

        set.parse(["--count", "0x10", "-v", "-out=/var/out", "rest", "--count", "1"])
            .unwrap();

        assert_eq!(set.value("count"), Some(&FlagValue::Uint(16)));
        assert_eq!(set.value("verbose"), Some(&FlagValue::Bool(true)));
        assert_eq!(
            set.value("out"),
            Some(&FlagValue::Path(PathBuf::from("/var/out")))
        );
        assert_eq!(set.args(), ["rest", "--count", "1"]);
        assert!(set.parsed());
    }

    #[test]
    fn test_parse_bool_with_inline_value() {
        let mut set = sample_set();

        set.parse(["--verbose=false", "--", "-v"]).unwrap();

        assert_eq!(set.value("verbose"), Some(&FlagValue::Bool(false)));
        assert!(set.is_set("verbose"));
        assert_eq!(set.args(), ["-v"]);
    }

    #[test]
    fn test_parse_single_dash_is_positional() {
        let mut set = sample_set();

        set.parse(["-", "-v"]).unwrap();

        assert_eq!(set.args(), ["-", "-v"]);
        assert!(!set.is_set("verbose"));
    }

    #[test]
    fn test_parse_errors() {
        let mut set = sample_set();
        let err = set.parse(["--nope"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFlag { name: "nope".into() });

        let mut set = sample_set();
        let err = set.parse(["--count"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue { name: "count".into() });

        let mut set = sample_set();
        let err = set.parse(["---count"]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadFlagSyntax { .. }));

        let mut set = sample_set();
        let err = set.parse(["--count=abc"]).unwrap_err();
        assert_eq!(
            err.to_string().lines().next().unwrap(),
            "could not parse \"abc\" as uint value from command line for flag count: invalid syntax"
        );
    }

    #[test]
    fn test_sink_receives_initial_and_command_line_values() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink_seen = Rc::clone(&seen);
        let mut set = FlagSet::new("app");
        set.register(
            &names(&["count"]),
            Cell::for_kind(&UintKind::default(), &5)
                .with_sink(Box::new(move |v: &FlagValue| sink_seen.borrow_mut().push(v.clone()))),
        )
        .unwrap();

        set.parse(["--count", "6"]).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![FlagValue::Uint(5), FlagValue::Uint(6)]
        );
    }

    #[test]
    fn test_raw_string_uses_list_separator() {
        let mut set = FlagSet::new("app");
        set.register(
            &names(&["tags"]),
            Cell::for_kind(&StringSliceKind { separator: ';' }, &vec![]),
        )
        .unwrap();

        set.parse(["--tags", "x,y;z"]).unwrap();

        assert_eq!(
            set.value("tags"),
            Some(&FlagValue::StringList(vec!["x,y".into(), "z".into()]))
        );
        assert_eq!(set.raw_string("tags").as_deref(), Some("x,y;z"));
    }

    #[test]
    fn test_registered_source_is_kept() {
        let mut set = FlagSet::new("app");
        set.register(
            &names(&["count"]),
            Cell::for_kind(&UintKind::default(), &7)
                .with_source(ValueSource::EnvVar("COUNT".into())),
        )
        .unwrap();

        assert!(set.is_set("count"));
        assert_eq!(set.cell("count").unwrap().default_value(), &FlagValue::Uint(7));
    }
}
