//! flagsource-core: typed flags resolved from the command line, environment
//! variables and files
//!
//! Every flag kind shares one resolution contract. A flag's effective value
//! comes from the highest-ranked source that supplies one:
//!
//! 1. the command line
//! 2. the first of its environment variables that is present
//! 3. the first readable file of its file path (contents trimmed)
//! 4. its declared default
//!
//! # Example
//!
//! ```rust
//! use flagsource_core::{Context, FlagSet, MapEnvironment, SourceResolver, UintFlag};
//!
//! let resolver = SourceResolver::new()
//!     .with_environment(MapEnvironment::new().with("APP_PORT", "0x1F90"));
//!
//! let mut port = UintFlag::new("port").with_env("APP_PORT").with_value(80);
//! let mut set = FlagSet::new("app");
//! port.apply_with(&mut set, &resolver).unwrap();
//! set.parse(["--port", "9090"]).unwrap();
//!
//! let ctx = Context::new(&set);
//! assert_eq!(ctx.uint("port"), 9090);
//! assert_eq!(port.get_default_text(), "80");
//! ```

pub mod context;
pub mod error;
pub mod flag;
pub mod flag_set;
pub mod kind;
pub mod manifest;
pub mod source;
pub mod value;

pub use context::Context;
pub use error::{Error, ErrorKind, Result};
pub use flag::{
    apply_flags, check_required_flags, run_flag_actions, Action, ActionError, ActionResult,
    BoolFlag, Destination, DurationFlag, Flag, FlagDefinition, FloatFlag, IntFlag, PathFlag,
    StringFlag, StringSliceFlag, UintFlag,
};
pub use flag_set::{Cell, FlagSet};
pub use kind::{
    BoolKind, CoerceError, DurationKind, FlagKind, FloatKind, IntKind, PathKind, StringKind,
    StringSliceKind, UintKind,
};
pub use manifest::{FlagSpec, KindName, Manifest};
pub use source::{
    Environment, FileSystem, LocalFileSystem, MapEnvironment, ProcessEnvironment, Resolution,
    ResolverOptions, SourceResolver, ValueSource,
};
pub use value::FlagValue;
