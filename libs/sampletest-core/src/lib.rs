/// Sample Verification Engine
///
/// **Core Responsibility:**
/// Compile a solution once, run it against every discovered sample, and
/// judge each run's output.
///
/// **Architecture:**
/// - `template`: abstract per-language command recipes and their resolution
///   into concrete argument vectors (with scoped temp files)
/// - `process`: local process execution with stdin redirection, concurrent
///   stdout/stderr capture and exit classification
/// - `compare`: output normalization, exact match and float-tolerance fallback
/// - `samples`: on-disk sample discovery (`<id>.in*` paired with `.ans`/`.out`)
/// - `verify`: the driver composing the above, one sample at a time
///
/// The crate deliberately knows nothing about where samples come from beyond
/// a directory listing, and nothing about submission. That glue lives in the
/// CLI binary.
pub mod compare;
pub mod error;
pub mod process;
pub mod samples;
pub mod template;
pub mod verify;

pub use compare::{compare, normalize, Verdict};
pub use error::CoreError;
pub use process::{execute, Capture, ExitKind, RunResult};
pub use samples::{discover, Sample};
pub use template::{Arg, CommandTemplate, ResolveContext};
pub use verify::{verify, LanguageCommands, SampleReport, VerifyOptions, VerifySummary};
