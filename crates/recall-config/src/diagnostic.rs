// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors and validation failures are turned into miette reports.
//! Unknown keys get a "did you mean" hint (Jaro-Winkler via `strsim`) and,
//! when the offending file is known, a label pointing at the key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this Jaro-Winkler score a key is not offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(recall::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Table holding the key; `None` at the top level.
        section: Option<String>,
        suggestion: Option<String>,
        /// Keys accepted by that table, comma-separated.
        valid_keys: String,
        #[label("not a recall setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(recall::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `retrieval.top_k`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(recall::config::missing_key),
        help("add `{key} = <value>` to recall.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but is out of range or inconsistent.
    #[error("invalid value for `{field}`: {message}")]
    #[diagnostic(
        code(recall::config::validation),
        help("set `{field}` in recall.toml or via RECALL_{}", env_name(field))
    )]
    Validation { field: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(recall::config::other))]
    Other(String),
}

impl ConfigError {
    /// Builds a validation error for the dotted `field`.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn section_label(section: &Option<String>) -> String {
    match section {
        Some(name) => format!("[{name}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// `retrieval.top_k` -> `RETRIEVAL_TOP_K`.
fn env_name(field: &str) -> String {
    field.replace('.', "_").to_ascii_uppercase()
}

/// The TOML files that fed a figment, as `(display path, content)` pairs.
struct Sources<'a>(&'a [(String, String)]);

impl<'a> Sources<'a> {
    /// Picks the file an error came from. Inline strings carry no file
    /// metadata, so a lone source is assumed to be the culprit.
    fn for_error(&self, error: &figment::Error) -> Option<&'a (String, String)> {
        let file = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        match file {
            Some(path) => self.0.iter().find(|(p, _)| *p == path),
            None if self.0.len() == 1 => self.0.first(),
            None => None,
        }
    }

    /// Span of `field` inside `section` of the error's source file.
    fn locate(
        &self,
        error: &figment::Error,
        section: &[String],
        field: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((path, content)) = self.for_error(error) else {
            return (None, None);
        };
        match find_key_offset(content, section, field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Converts a `figment::Error` (which may bundle several failures) into one
/// diagnostic per failure.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let sources = Sources(toml_sources);
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    // figment's path already ends with the unknown field
                    let section = match path.split_last() {
                        Some((last, prefix)) if last == field => prefix,
                        _ => path.as_slice(),
                    };
                    let (span, src) = sources.locate(&error, section, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: (!section.is_empty()).then(|| section.join(".")),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => {
                    let mut key = path.clone();
                    key.push(field.to_string());
                    ConfigError::MissingKey { key: key.join(".") }
                }
                Kind::InvalidType(found, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, section)) => sources.locate(&error, section, field),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: found.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Byte offset of `field` inside the `[section]` table of `content`.
///
/// Lines are scanned in order while tracking the current table header, so a
/// key with the same name in another table (or in a comment) is not matched.
/// An empty `section` means the top level, before any header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = line.trim();
        if let Some(header) = body.strip_prefix('[').and_then(|h| h.split(']').next()) {
            current = header.trim().to_string();
        } else if current == wanted
            && let Some(rest) = body.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Renders every error as a graphical miette report.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            out.push_str(&buf);
        } else {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    out
}

/// Writes [`render_to_string`] to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn suggests_closest_key() {
        let valid = &["decay_rate", "boost_rate", "score_floor"];
        assert_eq!(suggest_key("decay_rtae", valid).as_deref(), Some("decay_rate"));
        assert_eq!(
            suggest_key("topk", &["candidate_window", "blend_alpha", "top_k"]).as_deref(),
            Some("top_k")
        );
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_respects_sections() {
        let content = "[storage]\nwal_mode = true\n\n[writer]\ndecay_rtae = 0.1\n";
        let o = find_key_offset(content, &section("writer"), "decay_rtae").unwrap();
        assert_eq!(&content[o..o + 10], "decay_rtae");
        assert_eq!(find_key_offset(content, &section("storage"), "decay_rtae"), None);
        assert_eq!(find_key_offset(content, &section("retrieval"), "decay_rtae"), None);
    }

    #[test]
    fn key_offset_skips_same_name_in_other_table() {
        let content = "[context]\nbudget_chars = 1\n[retrieval]\n  budget_chars = 2\n";
        let o = find_key_offset(content, &section("retrieval"), "budget_chars").unwrap();
        assert_eq!(&content[o..o + 16], "budget_chars = 2");
    }

    #[test]
    fn key_offset_ignores_prefix_matches_and_comments() {
        let content = "[writer]\n# decay_rate = 1\ndecay_rate_x = 1\ndecay_rate=0.2\n";
        let o = find_key_offset(content, &section("writer"), "decay_rate").unwrap();
        assert_eq!(&content[o..o + 14], "decay_rate=0.2");
    }

    #[test]
    fn key_offset_handles_crlf() {
        let content = "[writer]\r\nboost_rate = 1.0\r\ndecay_rtae = 0.1\r\n";
        let o = find_key_offset(content, &section("writer"), "decay_rtae").unwrap();
        assert_eq!(&content[o..o + 10], "decay_rtae");
    }

    #[test]
    fn validation_error_names_field_and_env_var() {
        let error = ConfigError::invalid("retrieval.top_k", "must be at least 1");
        assert_eq!(
            error.to_string(),
            "invalid value for `retrieval.top_k`: must be at least 1"
        );
        let help = error.help().expect("help").to_string();
        assert!(help.contains("RECALL_RETRIEVAL_TOP_K"), "got: {help}");
    }

    #[test]
    fn unknown_key_message_names_the_table() {
        let error = ConfigError::UnknownKey {
            key: "decay_rtae".into(),
            section: Some("writer".into()),
            suggestion: None,
            valid_keys: "decay_rate".into(),
            span: None,
            src: None,
        };
        assert_eq!(error.to_string(), "unknown key `decay_rtae` in [writer]");
    }

    #[test]
    fn rendering_includes_every_error() {
        let rendered = render_to_string(&[
            ConfigError::invalid("writer.decay_rate", "must be non-negative"),
            ConfigError::MissingKey {
                key: "storage.database_path".into(),
            },
        ]);
        assert!(rendered.contains("writer.decay_rate"));
        assert!(rendered.contains("storage.database_path"));
    }
}
