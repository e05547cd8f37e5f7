// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Load failures come out of figment one problem at a time; each is mapped to
//! a [`ConfigError`] that points into the TOML file it came from when the
//! offending key can be found there. Validation adds its own variants.

#![allow(unused_assignments)] // miette's Diagnostic derive trips this lint on span fields

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a fix.
const SUGGEST_MIN_SCORE: f64 = 0.75;

/// Everything that can be wrong with a Reactiv configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(reactiv::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), known))
    )]
    UnknownKey {
        key: String,
        /// Dotted table the key was found in; empty for the top level.
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys the table accepts.
        known: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` should be {expected}, found {found}")]
    #[diagnostic(code(reactiv::config::invalid_type))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` is required")]
    #[diagnostic(
        code(reactiv::config::missing_key),
        help("set it in reactiv.toml or through the matching REACTIV_ variable")
    )]
    MissingKey { key: String },

    /// Channel or gateway URL that does not parse or is not http(s).
    #[error("`{key}` is not a usable URL: {detail}")]
    #[diagnostic(
        code(reactiv::config::invalid_url),
        help("channel URLs must be absolute http:// or https:// URLs")
    )]
    InvalidUrl { key: String, detail: String },

    #[error("{message}")]
    #[diagnostic(code(reactiv::config::validation))]
    Validation { message: String },

    /// A source that could not be read or parsed at all.
    #[error("could not load configuration from {origin}: {message}")]
    #[diagnostic(code(reactiv::config::unreadable))]
    Unreadable { origin: String, message: String },
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, known: &str) -> String {
    match suggestion {
        Some(key) => format!("did you mean `{key}`? accepted keys: {known}"),
        None => format!("accepted keys: {known}"),
    }
}

/// The TOML files a load read, used to attach source spans.
struct Sources<'a> {
    files: &'a [(String, String)],
}

impl<'a> Sources<'a> {
    /// The file an error came from. Inline sources carry no path, so a
    /// single known source is assumed to be the one.
    fn origin_of(&self, error: &figment::Error) -> Option<&'a (String, String)> {
        let path = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|source| match source {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        match path {
            Some(path) => self.files.iter().find(|(name, _)| *name == path),
            None if self.files.len() == 1 => self.files.first(),
            None => None,
        }
    }

    fn span_for(
        &self,
        error: &figment::Error,
        section: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((name, content)) = self.origin_of(error) else {
            return (None, None);
        };
        match find_key_offset(content, section, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Maps every problem inside a figment error to a diagnostic.
///
/// `toml_sources` holds `(path, content)` for each file that was merged.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let sources = Sources {
        files: toml_sources,
    };
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(key, accepted) => {
                    let (span, src) = sources.span_for(&error, &path, key);
                    ConfigError::UnknownKey {
                        key: key.clone(),
                        section: path.join("."),
                        suggestion: suggest_key(key, accepted),
                        known: accepted.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(key) => ConfigError::MissingKey {
                    key: dotted(&path, key),
                },
                Kind::InvalidType(found, expected) => {
                    let (section, key) = match path.split_last() {
                        Some((key, section)) => (section.to_vec(), key.clone()),
                        None => (Vec::new(), String::new()),
                    };
                    let (span, src) = sources.span_for(&error, &section, &key);
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: found.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Unreadable {
                    origin: error
                        .metadata
                        .as_ref()
                        .map(|m| m.name.to_string())
                        .unwrap_or_else(|| "configuration".to_string()),
                    message: error.kind.to_string(),
                },
            }
        })
        .collect()
}

fn dotted(section: &[String], key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{}.{key}", section.join("."))
    }
}

/// Byte offset of `key` inside the `[section]` table of `content`.
///
/// Walks the file line by line, tracking the current table header, so a key
/// of the same name in a later table is not matched. An empty section means
/// the keys before the first header.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut table = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            table = header.trim().to_string();
        } else if table == wanted
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            let indent = line.len() - line.trim_start().len();
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The accepted key closest to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, accepted: &[&str]) -> Option<String> {
    accepted
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGEST_MIN_SCORE)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints each error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
