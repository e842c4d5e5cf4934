//! Configuration validation engine.
//!
//! Validates config files against the known schema, detects unknown or
//! misspelled fields, and reports settings that would misbehave at runtime.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{env_subst::substitute_env, loader::parse_config_value, schema::PineappleConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "data", "channel"
    pub category: &'static str,
    /// Dotted path, e.g. "data.secret_marker"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys (account IDs) whose values have a known shape.
    Map(Box<KnownKeys>),
    /// Scalar or list value; stop recursion.
    Leaf,
}

/// Field names of a Matrix account entry.
const MATRIX_ACCOUNT_KEYS: &[&str] = &[
    "homeserver",
    "username",
    "password",
    "device_name",
    "store_dir",
    "session_file",
    "sync_timeout_ms",
    "autojoin",
    "room_allowlist",
];

fn leaves(keys: &[&'static str]) -> KnownKeys {
    KnownKeys::Struct(keys.iter().map(|k| (*k, KnownKeys::Leaf)).collect())
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::*;

    Struct(HashMap::from([
        ("data", leaves(&["dir", "secret_marker", "skip_legacy"])),
        (
            "reply",
            leaves(&["policy", "mark_read", "legacy_yield_every"]),
        ),
        (
            "channels",
            Struct(HashMap::from([(
                "matrix",
                Map(Box::new(leaves(MATRIX_ACCOUNT_KEYS))),
            )])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = if let Some(p) = path {
        Some(p.to_path_buf())
    } else {
        crate::loader::find_config_file()
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "syntax",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let ext = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("toml");
            validate_str(&substitute_env(&content), ext)
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path.clone());
    result
}

/// Validate config text in the format named by `ext` (`toml`, `yaml`, `yml`,
/// `json`) without touching the config search path.
#[must_use]
pub fn validate_str(raw: &str, ext: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax
    let value = match parse_config_value(raw, Path::new("pineapple").with_extension(ext).as_path())
    {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    // 3. Type check, then semantic checks on the parsed config
    match serde_json::from_value::<PineappleConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the value tree against the schema tree and flag unknown keys.
///
/// Unknown keys are ignored when loading, so they are reported as warnings.
fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match (value, schema) {
        (serde_json::Value::Object(table), KnownKeys::Struct(fields)) => {
            let mut known_keys: Vec<&str> = fields.keys().copied().collect();
            known_keys.sort_unstable();
            for (key, child_value) in table {
                let path = join(key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                } else {
                    let level = if prefix.is_empty() {
                        "at top level "
                    } else {
                        ""
                    };
                    let msg = match suggest(key, &known_keys, 3) {
                        Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
                        None => format!("unknown field {level}"),
                    };
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "unknown-field",
                        path,
                        message: msg.trim().to_string(),
                    });
                }
            }
        },
        (serde_json::Value::Object(table), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in table {
                check_unknown_fields(child_value, value_schema, &join(key), diagnostics);
            }
        },
        // Leaf or type mismatch: stop recursion (type errors caught later)
        _ => {},
    }
}

fn check_semantics(config: &PineappleConfig, diagnostics: &mut Vec<Diagnostic>) {
    // An empty marker prefixes every line, so every logged line would load
    // as the bot's own.
    if config.data.secret_marker.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "data",
            path: "data.secret_marker".into(),
            message: "secret marker is empty; own messages cannot be told apart in room logs"
                .into(),
        });
    } else if config.data.secret_marker.contains('\n') {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "data",
            path: "data.secret_marker".into(),
            message: "secret marker must not contain a newline".into(),
        });
    }

    if let Some(dir) = &config.data.dir
        && !dir.is_dir()
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "data",
            path: "data.dir".into(),
            message: format!(
                "data directory {} does not exist; it will be created at startup",
                dir.display()
            ),
        });
    }

    if config.reply.legacy_yield_every == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "data",
            path: "reply.legacy_yield_every".into(),
            message: "0 is treated as 1 (yield after every room log)".into(),
        });
    }

    let mut accounts: Vec<_> = config.channels.matrix.iter().collect();
    accounts.sort_by(|a, b| a.0.cmp(b.0));
    for (account_id, account) in accounts {
        let prefix = format!("channels.matrix.{account_id}");
        let Some(fields) = account.as_object() else {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "channel",
                path: prefix,
                message: "account entry must be a table".into(),
            });
            continue;
        };
        for required in ["homeserver", "username"] {
            let present = fields
                .get(required)
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "channel",
                    path: format!("{prefix}.{required}"),
                    message: format!("{required} is required"),
                });
            }
        }
        if !fields.contains_key("password") && !fields.contains_key("session_file") {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "channel",
                path: format!("{prefix}.password"),
                message: "no password or session_file; login only works from a saved session"
                    .into(),
            });
        }
    }

    if config.channels.matrix.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "channel",
            path: "channels.matrix".into(),
            message: "no Matrix accounts configured; `run` will only load room logs".into(),
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
