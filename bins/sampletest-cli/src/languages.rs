// Language recipe registry: built-in compile/run recipes plus optional
// overrides from config/languages.json.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use sampletest_core::{CommandTemplate, LanguageCommands};

/// One language recipe as written in config, using the placeholder syntax
/// understood by the template parser: `{source}`, `{tmp:NAME}`,
/// `{debug:TOKEN}`, `{release:TOKEN}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSpec {
    pub name: String,
    pub extensions: Vec<String>,
    #[serde(default)]
    pub compile: Option<Vec<String>>,
    pub run: Vec<String>,
}

impl LanguageSpec {
    /// Materialize the recipe into templates for the core driver.
    pub fn to_commands(&self, extra_compile_flags: Vec<String>) -> LanguageCommands {
        LanguageCommands {
            compile: self
                .compile
                .as_ref()
                .map(|tokens| CommandTemplate::from_tokens(tokens)),
            run: CommandTemplate::from_tokens(&self.run),
            extra_compile_flags,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageSpec>,
}

/// Registry of known languages, keyed by name, indexed by file extension.
pub struct LanguageRegistry {
    specs: HashMap<String, LanguageSpec>,
}

impl LanguageRegistry {
    /// Registry with only the built-in recipes.
    pub fn builtin() -> Self {
        let mut specs = HashMap::new();
        for spec in builtin_specs() {
            specs.insert(spec.name.clone(), spec);
        }
        Self { specs }
    }

    /// Built-ins plus overrides from a languages.json file. A config entry
    /// with the same name as a built-in replaces it wholesale.
    pub fn with_config(config_path: &Path) -> Result<Self> {
        let mut registry = Self::builtin();
        if !config_path.exists() {
            return Ok(registry);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let parsed: LanguagesJson = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        for spec in parsed.languages {
            if spec.run.is_empty() {
                bail!("language `{}` has an empty run command", spec.name);
            }
            tracing::debug!(language = %spec.name, "loaded language recipe from config");
            registry.specs.insert(spec.name.clone(), spec);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&LanguageSpec> {
        self.specs.get(name).ok_or_else(|| {
            anyhow!(
                "unknown language `{}` (known: {})",
                name,
                self.names().join(", ")
            )
        })
    }

    /// Detect the language of a solution file from its extension.
    pub fn for_file(&self, path: &Path) -> Result<&LanguageSpec> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            anyhow!(
                "{} has no file extension to detect a language from",
                path.display()
            )
        })?;

        self.specs
            .values()
            .find(|spec| spec.extensions.iter().any(|known| known == ext))
            .ok_or_else(|| {
                anyhow!(
                    "no language registered for `.{}` files (known: {})",
                    ext,
                    self.names().join(", ")
                )
            })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.specs.keys().cloned().collect();
        names.sort();
        names
    }
}

fn builtin_specs() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec {
            name: "python3".to_string(),
            extensions: vec!["py".to_string()],
            compile: None,
            run: to_vec(&["python3", "{source}"]),
        },
        LanguageSpec {
            name: "c".to_string(),
            extensions: vec!["c".to_string()],
            compile: Some(to_vec(&[
                "gcc",
                "-std=gnu11",
                "{release:-O2}",
                "{debug:-g}",
                "{debug:-fsanitize=address,undefined}",
                "-o",
                "{tmp:binary}",
                "{source}",
                "-lm",
            ])),
            run: to_vec(&["{tmp:binary}"]),
        },
        LanguageSpec {
            name: "cpp".to_string(),
            extensions: vec!["cpp".to_string(), "cc".to_string(), "cxx".to_string()],
            compile: Some(to_vec(&[
                "g++",
                "-std=c++20",
                "{release:-O2}",
                "{debug:-g}",
                "{debug:-fsanitize=address,undefined}",
                "-o",
                "{tmp:binary}",
                "{source}",
            ])),
            run: to_vec(&["{tmp:binary}"]),
        },
        LanguageSpec {
            name: "rust".to_string(),
            extensions: vec!["rs".to_string()],
            compile: Some(to_vec(&[
                "rustc",
                "{release:-O}",
                "{debug:-g}",
                "-o",
                "{tmp:binary}",
                "{source}",
            ])),
            run: to_vec(&["{tmp:binary}"]),
        },
        LanguageSpec {
            // Single-file source launcher; no separate compile step.
            name: "java".to_string(),
            extensions: vec!["java".to_string()],
            compile: None,
            run: to_vec(&["java", "{source}"]),
        },
        LanguageSpec {
            name: "sh".to_string(),
            extensions: vec!["sh".to_string()],
            compile: None,
            run: to_vec(&["sh", "{source}"]),
        },
    ]
}

fn to_vec(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_language_by_extension() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.for_file(Path::new("a.py")).unwrap().name, "python3");
        assert_eq!(registry.for_file(Path::new("b.cc")).unwrap().name, "cpp");
        assert_eq!(registry.for_file(Path::new("c.rs")).unwrap().name, "rust");
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let registry = LanguageRegistry::builtin();
        assert!(registry.for_file(Path::new("solution.zig")).is_err());
        assert!(registry.for_file(Path::new("no_extension")).is_err());
    }

    #[test]
    fn compiled_languages_carry_a_compile_template() {
        let registry = LanguageRegistry::builtin();
        let commands = registry.get("cpp").unwrap().to_commands(Vec::new());
        assert!(commands.compile.is_some());

        let commands = registry.get("python3").unwrap().to_commands(Vec::new());
        assert!(commands.compile.is_none());
    }

    #[test]
    fn config_overrides_and_extends_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("languages.json");
        std::fs::write(
            &config,
            r#"{
                "languages": [
                    {
                        "name": "python3",
                        "extensions": ["py"],
                        "run": ["pypy3", "{source}"]
                    },
                    {
                        "name": "haskell",
                        "extensions": ["hs"],
                        "compile": ["ghc", "-O2", "-o", "{tmp:binary}", "{source}"],
                        "run": ["{tmp:binary}"]
                    }
                ]
            }"#,
        )
        .unwrap();

        let registry = LanguageRegistry::with_config(&config).unwrap();
        assert_eq!(registry.get("python3").unwrap().run[0], "pypy3");
        assert_eq!(
            registry.for_file(&PathBuf::from("x.hs")).unwrap().name,
            "haskell"
        );
        // Untouched built-ins survive the merge.
        assert!(registry.get("cpp").is_ok());
    }

    #[test]
    fn missing_config_file_falls_back_to_builtins() {
        let registry = LanguageRegistry::with_config(Path::new("/nonexistent/languages.json"));
        assert!(registry.unwrap().get("python3").is_ok());
    }
}
