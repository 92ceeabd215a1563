//! dothething - move files where your rules say they belong
//!
//! This library provides the rule engine behind the `dtt` command: an ordered
//! rule set loaded from YAML, TOML or JSON, first-match-wins matching of file
//! names against each rule's regular expression, and guarded execution of the
//! matching rule's move through a pluggable filesystem.

pub mod cli;
pub mod config;
pub mod executor;
pub mod filesystem;
pub mod matcher;
pub mod orchestrator;
pub mod output;

pub use config::{Attribute, ConfigError, Rule, RuleError, RuleFormat, RuleSet};
pub use executor::{Execution, Executor, MoveError, Skip};
pub use filesystem::{FileSystem, MemoryFs, OsFs};
pub use matcher::{MatchResult, match_rule};
pub use orchestrator::{Orchestrator, RunReport, RunStatus};
pub use output::Console;

pub use cli::run;
