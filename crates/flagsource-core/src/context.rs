//! Context facade over parsed flag-sets
//!
//! A [`Context`] wraps one [`FlagSet`] and optionally its parent context, so
//! a subcommand can read flags declared on any enclosing command. Lookups
//! search the current flag-set first and then walk outward.
//!
//! The typed accessors never fail: a flag that is missing, or whose value
//! cannot be read as the requested type, yields the type's zero value. Use
//! [`Context::try_lookup`] to tell the two cases apart.

use std::path::PathBuf;
use std::time::Duration;

use crate::flag_set::FlagSet;
use crate::kind::{
    BoolKind, DurationKind, FlagKind, FloatKind, IntKind, PathKind, StringKind, StringSliceKind,
    UintKind,
};

/// Read access to the flags of a command and its ancestors
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    flag_set: &'a FlagSet,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// Create a root context
    pub fn new(flag_set: &'a FlagSet) -> Self {
        Self {
            flag_set,
            parent: None,
        }
    }

    /// Create a context nested under `parent`
    pub fn with_parent(flag_set: &'a FlagSet, parent: &'a Context<'a>) -> Self {
        Self {
            flag_set,
            parent: Some(parent),
        }
    }

    /// The flag-set of this context
    pub fn flag_set(&self) -> &'a FlagSet {
        self.flag_set
    }

    /// The enclosing context, if any
    pub fn parent(&self) -> Option<&'a Context<'a>> {
        self.parent
    }

    /// This context followed by its ancestors, innermost first
    pub fn lineage(&self) -> impl Iterator<Item = &Context<'a>> {
        std::iter::successors(Some(self), |ctx| ctx.parent)
    }

    /// The innermost flag-set that registers `name`
    pub fn lookup_flag_set(&self, name: &str) -> Option<&'a FlagSet> {
        self.lineage()
            .map(|ctx| ctx.flag_set)
            .find(|set| set.contains(name))
    }

    /// Read `name` as kind `K`, or `None` if it is missing or unreadable
    pub fn try_lookup_kind<K: FlagKind>(&self, name: &str, kind: &K) -> Option<K::Value> {
        let set = self.lookup_flag_set(name)?;
        let value = set.value(name)?;
        if let Some(typed) = K::from_value(value) {
            return Some(typed);
        }

        // A cell of another kind: go through its string form
        let raw = set.raw_string(name)?;
        match kind.parse(&raw) {
            Ok(typed) => Some(typed),
            Err(e) => {
                log::trace!(
                    "flag {}: cannot read {:?} as {}: {}",
                    name,
                    raw,
                    kind.type_name(),
                    e
                );
                None
            }
        }
    }

    /// Read `name` as kind `K`, falling back to the zero value
    pub fn lookup_kind<K: FlagKind>(&self, name: &str, kind: &K) -> K::Value {
        self.try_lookup_kind(name, kind).unwrap_or_default()
    }

    /// Read `name` with the default parameters of kind `K`
    pub fn try_lookup<K: FlagKind + Default>(&self, name: &str) -> Option<K::Value> {
        self.try_lookup_kind(name, &K::default())
    }

    /// Read `name` with the default parameters of kind `K`, falling back to
    /// the zero value
    pub fn lookup<K: FlagKind + Default>(&self, name: &str) -> K::Value {
        self.lookup_kind(name, &K::default())
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.lookup::<PathKind>(name)
    }

    pub fn string(&self, name: &str) -> String {
        self.lookup::<StringKind>(name)
    }

    pub fn uint(&self, name: &str) -> u64 {
        self.lookup::<UintKind>(name)
    }

    pub fn int(&self, name: &str) -> i64 {
        self.lookup::<IntKind>(name)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.lookup::<BoolKind>(name)
    }

    pub fn float(&self, name: &str) -> f64 {
        self.lookup::<FloatKind>(name)
    }

    pub fn duration(&self, name: &str) -> Duration {
        self.lookup::<DurationKind>(name)
    }

    pub fn string_slice(&self, name: &str) -> Vec<String> {
        self.lookup::<StringSliceKind>(name)
    }

    /// Whether some source set `name` in the innermost flag-set declaring it
    pub fn is_set(&self, name: &str) -> bool {
        self.lookup_flag_set(name)
            .is_some_and(|set| set.is_set(name))
    }

    /// Primary names visible from this context, innermost first, without
    /// duplicates
    pub fn flag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for ctx in self.lineage() {
            for name in ctx.flag_set.names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Positional arguments left after flag parsing
    pub fn args(&self) -> &'a [String] {
        self.flag_set.args()
    }

    /// Number of positional arguments
    pub fn narg(&self) -> usize {
        self.flag_set.args().len()
    }
}
