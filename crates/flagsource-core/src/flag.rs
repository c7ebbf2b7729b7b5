//! Typed flag definitions
//!
//! [`Flag`] is one definition shape shared by every kind of flag. Applying a
//! flag captures its declared default, asks the [`SourceResolver`] for an
//! environment or file value, coerces it with the flag's [`FlagKind`], and
//! registers the result into a [`FlagSet`] where the command line can still
//! override it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::flag_set::{Cell, FlagSet};
use crate::kind::{
    BoolKind, DurationKind, FlagKind, FloatKind, IntKind, PathKind, StringKind, StringSliceKind,
    UintKind,
};
use crate::source::{SourceResolver, ValueSource};
use crate::value::FlagValue;

/// Error returned by a flag action, passed back to the caller untouched
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a flag action
pub type ActionResult = std::result::Result<(), ActionError>;

/// Callback invoked with a flag's final value
pub type Action<T> = Box<dyn Fn(&Context<'_>, &T) -> ActionResult>;

/// Caller-owned storage a flag writes its value into.
///
/// The cell is written when the flag is applied and again whenever the
/// command line sets the flag. Clone it to keep a handle.
pub struct Destination<T>(Rc<RefCell<T>>);

impl<T: Clone + Default> Destination<T> {
    /// Create a destination holding `T::default()`
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(T::default())))
    }

    /// Current contents
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }

    fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }
}

impl<T: Clone + Default> Default for Destination<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Destination<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Destination<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Destination").field(&self.0.borrow()).finish()
    }
}

/// A flag whose value type is determined by its kind `K`
pub struct Flag<K: FlagKind> {
    name: String,
    aliases: Vec<String>,
    usage: String,
    env_vars: Vec<String>,
    file_path: Option<String>,
    default_text: Option<String>,
    category: Option<String>,
    hidden: bool,
    required: bool,
    takes_file: bool,
    kind: K,
    value: K::Value,
    default_value: Option<K::Value>,
    has_been_set: bool,
    destination: Option<Destination<K::Value>>,
    action: Option<Action<K::Value>>,
}

/// Path flag
pub type PathFlag = Flag<PathKind>;
/// String flag
pub type StringFlag = Flag<StringKind>;
/// Boolean switch
pub type BoolFlag = Flag<BoolKind>;
/// Signed integer flag
pub type IntFlag = Flag<IntKind>;
/// Unsigned integer flag
pub type UintFlag = Flag<UintKind>;
/// Floating point flag
pub type FloatFlag = Flag<FloatKind>;
/// Duration flag
pub type DurationFlag = Flag<DurationKind>;
/// String list flag
pub type StringSliceFlag = Flag<StringSliceKind>;

impl<K: FlagKind + Default> Flag<K> {
    /// Create a flag with the kind's default parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, K::default())
    }
}

impl<K: FlagKind> Flag<K> {
    /// Create a flag with explicit kind parameters
    pub fn with_kind(name: impl Into<String>, kind: K) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            usage: String::new(),
            env_vars: Vec::new(),
            file_path: None,
            default_text: None,
            category: None,
            hidden: false,
            required: false,
            takes_file: false,
            kind,
            value: K::Value::default(),
            default_value: None,
            has_been_set: false,
            destination: None,
            action: None,
        }
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add an environment variable; earlier ones take precedence
    pub fn with_env(mut self, var: impl Into<String>) -> Self {
        self.env_vars.push(var.into());
        self
    }

    /// Read the value from a file (or comma-separated files) when no
    /// environment variable is set
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the usage text
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Set the declared value (the default until a source overrides it)
    pub fn with_value(mut self, value: K::Value) -> Self {
        self.value = value;
        self
    }

    /// Override how the default is shown in help output
    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = Some(text.into());
        self
    }

    /// Set the help category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Hide the flag from help output
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Require some source to supply the flag
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Mark the value as a file name (a completion hint)
    pub fn with_takes_file(mut self, takes_file: bool) -> Self {
        self.takes_file = takes_file;
        self
    }

    /// Write the resolved value into caller-owned storage
    pub fn with_destination(mut self, destination: Destination<K::Value>) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Run `action` with the final value (see [`Flag::run_action`])
    pub fn with_action(
        mut self,
        action: impl Fn(&Context<'_>, &K::Value) -> ActionResult + 'static,
    ) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Primary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aliases, without the primary name
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Primary name followed by aliases
    pub fn names(&self) -> Vec<String> {
        std::iter::once(&self.name)
            .chain(&self.aliases)
            .cloned()
            .collect()
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn env_vars(&self) -> &[String] {
        &self.env_vars
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn takes_file(&self) -> bool {
        self.takes_file
    }

    /// Kind parameters
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Current value
    pub fn value(&self) -> &K::Value {
        &self.value
    }

    /// Declared value, as captured by the first [`Flag::apply`]
    pub fn default_value(&self) -> &K::Value {
        self.default_value.as_ref().unwrap_or(&self.value)
    }

    /// Whether an environment variable or file overrode the default
    pub fn has_been_set(&self) -> bool {
        self.has_been_set
    }

    /// Resolve the flag against the process environment and local files
    /// and register it into `set`
    pub fn apply(&mut self, set: &mut FlagSet) -> Result<()> {
        self.apply_with(set, &SourceResolver::new())
    }

    /// Resolve the flag with `resolver` and register it into `set`.
    ///
    /// The declared value is captured as the default on the first call only;
    /// every call resolves from that baseline. An empty external value leaves
    /// the default in place.
    pub fn apply_with(&mut self, set: &mut FlagSet, resolver: &SourceResolver) -> Result<()> {
        let baseline = self
            .default_value
            .get_or_insert_with(|| self.value.clone())
            .clone();
        self.value = baseline;
        self.has_been_set = false;

        let mut source = ValueSource::Default;
        if let Some(found) =
            resolver.resolve(&self.name, &self.env_vars, self.file_path.as_deref())?
        {
            if found.value.is_empty() {
                log::trace!("flag {}: empty value from {} ignored", self.name, found.source);
            } else {
                self.value = self.kind.parse(&found.value).map_err(|e| {
                    Error::parse(
                        &self.name,
                        self.kind.type_name(),
                        &found.value,
                        &found.source,
                        e,
                    )
                })?;
                self.has_been_set = true;
                log::debug!("flag {}: resolved from {}", self.name, found.source);
                source = found.source;
            }
        }

        let mut cell = Cell::for_kind(&self.kind, &self.value)
            .with_usage(self.usage.clone())
            .with_source(source);
        if let Some(destination) = &self.destination {
            let destination = destination.clone();
            cell = cell.with_sink(Box::new(move |value: &FlagValue| {
                if let Some(typed) = K::from_value(value) {
                    destination.set(typed);
                }
            }));
        }

        set.register(&self.names(), cell)
    }

    /// Current value rendered for display; value-less kinds give ""
    pub fn get_value(&self) -> String {
        self.kind.format(&self.value)
    }

    /// How the default appears in help output
    pub fn get_default_text(&self) -> String {
        match self.default_text.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => self.kind.default_text(self.default_value()),
        }
    }

    /// The flag's value in `ctx`, or the zero value if it cannot be found
    pub fn get(&self, ctx: &Context<'_>) -> K::Value {
        ctx.lookup_kind(&self.name, &self.kind)
    }

    /// Run the flag's action with its value in `ctx`.
    ///
    /// The action's error is returned as is. Without an action this is a
    /// no-op.
    pub fn run_action(&self, ctx: &Context<'_>) -> ActionResult {
        match &self.action {
            Some(action) => action(ctx, &self.get(ctx)),
            None => Ok(()),
        }
    }

    /// Whether any source (environment, file or command line) set the flag
    pub fn is_set(&self, set: &FlagSet) -> bool {
        self.has_been_set || set.is_set(&self.name)
    }
}

impl Flag<UintKind> {
    /// Numeric base for parsing; 0 detects it from the prefix
    pub fn with_base(mut self, base: u32) -> Self {
        self.kind.base = base;
        self
    }
}

impl Flag<IntKind> {
    /// Numeric base for parsing; 0 detects it from the prefix
    pub fn with_base(mut self, base: u32) -> Self {
        self.kind.base = base;
        self
    }
}

impl Flag<StringSliceKind> {
    /// Separator used to split external values
    pub fn with_separator(mut self, separator: char) -> Self {
        self.kind.separator = separator;
        self
    }
}

impl<K: FlagKind> fmt::Debug for Flag<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("env_vars", &self.env_vars)
            .field("file_path", &self.file_path)
            .field("value", &self.value)
            .field("default_value", &self.default_value)
            .field("has_been_set", &self.has_been_set)
            .finish_non_exhaustive()
    }
}

/// Kind-independent view of a flag, so flags of different kinds can live in
/// one collection
pub trait FlagDefinition {
    /// Primary name
    fn name(&self) -> &str;
    /// Primary name followed by aliases
    fn names(&self) -> Vec<String>;
    /// Kind name ("uint", "path", ...)
    fn type_name(&self) -> &'static str;
    /// Usage text
    fn usage(&self) -> &str;
    /// Environment variables consulted, in order
    fn env_vars(&self) -> &[String];
    /// Resolve and register into `set`
    fn apply_with(&mut self, set: &mut FlagSet, resolver: &SourceResolver) -> Result<()>;
    /// Current value rendered for display
    fn get_value(&self) -> String;
    /// Default value rendered for help output
    fn get_default_text(&self) -> String;
    /// Whether any source set the flag
    fn is_set(&self, set: &FlagSet) -> bool;
    /// Whether the flag must be supplied
    fn is_required(&self) -> bool;
    /// Whether help output should skip the flag
    fn is_hidden(&self) -> bool;
    /// Whether the flag consumes a command-line argument
    fn takes_value(&self) -> bool;
    /// Run the flag's action
    fn run_action(&self, ctx: &Context<'_>) -> ActionResult;
}

impl<K: FlagKind> FlagDefinition for Flag<K> {
    fn name(&self) -> &str {
        Flag::name(self)
    }

    fn names(&self) -> Vec<String> {
        Flag::names(self)
    }

    fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    fn usage(&self) -> &str {
        Flag::usage(self)
    }

    fn env_vars(&self) -> &[String] {
        Flag::env_vars(self)
    }

    fn apply_with(&mut self, set: &mut FlagSet, resolver: &SourceResolver) -> Result<()> {
        Flag::apply_with(self, set, resolver)
    }

    fn get_value(&self) -> String {
        Flag::get_value(self)
    }

    fn get_default_text(&self) -> String {
        Flag::get_default_text(self)
    }

    fn is_set(&self, set: &FlagSet) -> bool {
        Flag::is_set(self, set)
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn takes_value(&self) -> bool {
        self.kind.takes_value()
    }

    fn run_action(&self, ctx: &Context<'_>) -> ActionResult {
        Flag::run_action(self, ctx)
    }
}

/// Apply every flag in declaration order, stopping at the first error
pub fn apply_flags(
    flags: &mut [Box<dyn FlagDefinition>],
    set: &mut FlagSet,
    resolver: &SourceResolver,
) -> Result<()> {
    for flag in flags.iter_mut() {
        flag.apply_with(set, resolver)?;
    }
    Ok(())
}

/// Fail if any required flag was not supplied by some source
pub fn check_required_flags(flags: &[Box<dyn FlagDefinition>], set: &FlagSet) -> Result<()> {
    let missing: Vec<String> = flags
        .iter()
        .filter(|flag| flag.is_required() && !flag.is_set(set))
        .map(|flag| flag.name().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::required_flags_missing(missing))
    }
}

/// Run the actions of every flag that some source set, in declaration order
pub fn run_flag_actions(flags: &[Box<dyn FlagDefinition>], ctx: &Context<'_>) -> ActionResult {
    for flag in flags {
        if ctx.is_set(flag.name()) {
            flag.run_action(ctx)?;
        }
    }
    Ok(())
}
