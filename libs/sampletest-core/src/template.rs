/// Command Templates - Abstract Compile/Run Recipes
///
/// **Core Responsibility:**
/// Describe a command line abstractly, once per language, and expand it into
/// a concrete argument vector for one verification session.
///
/// **Critical Properties:**
/// - A `CommandTemplate` is immutable configuration data; it never refers to
///   a particular solution file.
/// - Resolution is pure: identical (template, context) pairs yield identical
///   vectors, token order preserved.
/// - Temp file identity is context-scoped: every template sharing one
///   `ResolveContext` sees the same path for the same name, so a compile
///   template and a run template agree on e.g. the compiled binary.
///
/// Temp files are created (zero-length) when the context is prepared, not
/// lazily on first use, and removed when the context is torn down. The
/// backing `TempDir` guarantees removal on every exit path.
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::CoreError;

/// One argument token of a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Fixed string, passed through verbatim.
    Lit(String),
    /// Absolute path of the solution under test.
    Source,
    /// Path of a named temp file scoped to the resolution context.
    Temp(String),
    /// Inner token expands only when the context debug flag matches.
    IfDebug(Box<Arg>, bool),
}

impl Arg {
    /// Parse the placeholder syntax used by language config files:
    /// `{source}`, `{tmp:NAME}`, `{debug:TOKEN}`, `{release:TOKEN}`.
    /// Anything else is a literal.
    pub fn parse(token: &str) -> Arg {
        if token == "{source}" {
            return Arg::Source;
        }
        if let Some(name) = strip_placeholder(token, "{tmp:") {
            return Arg::Temp(name.to_string());
        }
        if let Some(inner) = strip_placeholder(token, "{debug:") {
            return Arg::IfDebug(Box::new(Arg::parse(inner)), true);
        }
        if let Some(inner) = strip_placeholder(token, "{release:") {
            return Arg::IfDebug(Box::new(Arg::parse(inner)), false);
        }
        Arg::Lit(token.to_string())
    }

    fn collect_temp_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Arg::Temp(name) => names.push(name),
            // Conditional tokens register their temp names unconditionally:
            // registration must not depend on the debug flag.
            Arg::IfDebug(inner, _) => inner.collect_temp_names(names),
            Arg::Lit(_) | Arg::Source => {}
        }
    }
}

fn strip_placeholder<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    token.strip_prefix(prefix)?.strip_suffix('}')
}

/// An ordered sequence of argument tokens. The first resolved element is the
/// executable name, the remainder its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<Arg>,
}

impl CommandTemplate {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    /// Build a template from placeholder-syntax tokens (see [`Arg::parse`]).
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(tokens.into_iter().map(|t| Arg::parse(t.as_ref())).collect())
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }
}

/// Per-session resolution state: the solution path, the debug flag, and the
/// arena of named temp files.
///
/// Lifecycle: `prepare` scans every template the session will use and
/// allocates all temp files up front; `resolve` may then be called any
/// number of times; `close` (or drop) removes everything.
pub struct ResolveContext {
    source: PathBuf,
    debug: bool,
    temps: HashMap<String, PathBuf>,
    dir: TempDir,
}

impl ResolveContext {
    /// Create a context for one verification session.
    ///
    /// All temp names referenced anywhere in `templates` are registered here,
    /// in a first pass over every token, and a zero-length file is created
    /// for each. Allocating at creation time rather than at first use keeps
    /// resolution order irrelevant.
    pub fn prepare(
        source: &Path,
        debug: bool,
        templates: &[&CommandTemplate],
    ) -> Result<Self, CoreError> {
        let source = source.canonicalize()?;
        let dir = tempfile::tempdir()?;

        let mut names: Vec<&str> = Vec::new();
        for template in templates {
            for arg in template.args() {
                arg.collect_temp_names(&mut names);
            }
        }

        let mut temps = HashMap::new();
        for name in names {
            if temps.contains_key(name) {
                continue;
            }
            let path = dir.path().join(name);
            File::create(&path)?;
            tracing::debug!(name, path = %path.display(), "allocated temp file");
            temps.insert(name.to_string(), path);
        }

        Ok(Self {
            source,
            debug,
            temps,
            dir,
        })
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path allocated for a temp name, if it was registered.
    pub fn temp_path(&self, name: &str) -> Option<&Path> {
        self.temps.get(name).map(PathBuf::as_path)
    }

    /// Expand a template into a concrete argument vector.
    ///
    /// Pure and deterministic. Conditional tokens are expanded or dropped
    /// according to the debug flag; referencing a temp name that was not
    /// part of `prepare`'s template set is a fatal programming error.
    pub fn resolve(&self, template: &CommandTemplate) -> Result<Vec<String>, CoreError> {
        let mut argv = Vec::with_capacity(template.args().len());
        for arg in template.args() {
            if let Some(resolved) = self.resolve_arg(arg)? {
                argv.push(resolved);
            }
        }
        Ok(argv)
    }

    fn resolve_arg(&self, arg: &Arg) -> Result<Option<String>, CoreError> {
        match arg {
            Arg::Lit(s) => Ok(Some(s.clone())),
            Arg::Source => Ok(Some(self.source.to_string_lossy().into_owned())),
            Arg::Temp(name) => {
                let path = self
                    .temps
                    .get(name)
                    .ok_or_else(|| CoreError::UnregisteredTempFile(name.clone()))?;
                Ok(Some(path.to_string_lossy().into_owned()))
            }
            Arg::IfDebug(inner, when) => {
                if self.debug == *when {
                    self.resolve_arg(inner)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Tear the context down, deleting every allocated temp file.
    ///
    /// A file that is already gone is not a failure; a compile step may
    /// legitimately have replaced or removed its output. Dropping the
    /// context without calling `close` still removes the directory.
    pub fn close(self) -> std::io::Result<()> {
        for path in self.temps.values() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        self.dir.close()
    }
}
