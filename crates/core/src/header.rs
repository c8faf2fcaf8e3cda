//! Documentation header parsing for scripts and helper programs.
//!
//! Every script and program carries a comment header describing it. The
//! grammar accepted here is:
//!
//! ```text
//! header        := directive* [filename-echo] comment-line* [separator]
//! directive     := "#!..."   (scripts)   | "//go:..." or "// +build" (programs)
//! filename-echo := first non-rule comment whose text starts with the file name
//! comment-line  := marker [" "] text     marker is "#" or "//"
//! separator     := comment whose text is exactly "---"
//! ```
//!
//! The header ends at the first line that is not a comment, or at the
//! separator. Blank lines are only skipped before the first comment.
//!
//! Inside the header, sections are introduced by a keyword line such as
//! `Usage:` or `Options:`. Keywords may be written in both languages on one
//! line (`Usage / 使い方:`), and a section repeated in the second language is
//! ignored in favour of the first occurrence.

use crate::types::OptionEntry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const SEPARATOR: &str = "---";

const USAGE_KEYWORDS: &[&str] = &["usage", "使い方", "使用方法", "用法"];
const OPTIONS_KEYWORDS: &[&str] = &["options", "オプション"];
const ENVIRONMENT_KEYWORDS: &[&str] = &[
    "environment",
    "requires",
    "requirements",
    "実行環境",
    "動作環境",
];

/// Comment syntax of the file being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `#` comments with an optional `#!` interpreter line (shell scripts)
    Hash,
    /// `//` comments with optional build directives (single-file programs)
    DoubleSlash,
}

impl CommentStyle {
    fn marker(&self) -> &'static str {
        match self {
            CommentStyle::Hash => "#",
            CommentStyle::DoubleSlash => "//",
        }
    }

    fn is_directive(&self, line: &str) -> bool {
        match self {
            CommentStyle::Hash => line.starts_with("#!"),
            CommentStyle::DoubleSlash => {
                line.starts_with("//go:") || line.starts_with("// +build")
            }
        }
    }

    /// Strip the comment marker and one following space.
    fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        let text = line.trim_start().strip_prefix(self.marker())?;
        Some(text.strip_prefix(' ').unwrap_or(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SectionKind {
    Usage,
    Options,
    Environment,
}

/// Sections extracted from a header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSections {
    pub usage: Option<String>,
    pub options: Vec<OptionEntry>,
    pub environment: Vec<String>,
}

/// The comment block at the top of a file, with markers stripped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    lines: Vec<String>,
}

impl Header {
    /// Parse the header of `source`, a file named `file_name`.
    pub fn parse(source: &str, file_name: &str, style: CommentStyle) -> Self {
        let mut lines = Vec::new();
        let mut before_first_comment = true;
        let mut echo_pending = true;

        for raw in source.lines() {
            let line = raw.trim_end();

            if before_first_comment && (style.is_directive(line) || line.trim().is_empty()) {
                continue;
            }

            let Some(text) = style.strip(line) else {
                break;
            };
            before_first_comment = false;

            let trimmed = text.trim();
            if trimmed == SEPARATOR {
                break;
            }

            // The file name echo is the first line with real content,
            // possibly after a decoration rule. A description on the same
            // line (`name.sh - Does things`) is kept.
            if echo_pending && !is_decoration(trimmed) {
                echo_pending = false;
                if let Some(rest) = strip_filename_echo(trimmed, file_name) {
                    if !rest.is_empty() {
                        lines.push(rest.to_string());
                    }
                    continue;
                }
            }

            lines.push(text.to_string());
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First meaningful line of the header, or an empty string.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.trim())
            .find(|line| !is_decoration(line))
            .unwrap_or_default()
            .to_string()
    }

    /// Collect the Usage, Options and Environment sections.
    pub fn sections(&self) -> HeaderSections {
        let mut blocks: HashMap<SectionKind, Vec<String>> = HashMap::new();
        let mut seen = HashSet::new();
        let mut current: Option<SectionKind> = None;

        for line in &self.lines {
            if let Some((kind, rest)) = section_header(line) {
                if seen.insert(kind) {
                    current = Some(kind);
                    if !rest.is_empty() {
                        blocks.entry(kind).or_default().push(rest.to_string());
                    }
                } else {
                    current = None;
                }
                continue;
            }

            if is_decoration(line.trim()) || is_other_section(line) {
                current = None;
                continue;
            }

            if let Some(kind) = current {
                blocks.entry(kind).or_default().push(line.trim_end().to_string());
            }
        }

        let usage = blocks
            .remove(&SectionKind::Usage)
            .map(|lines| lines.join("\n"));
        let options = blocks
            .remove(&SectionKind::Options)
            .map(|lines| parse_options(&lines))
            .unwrap_or_default();
        let environment = blocks
            .remove(&SectionKind::Environment)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| strip_bullet(l.trim()).to_string())
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        HeaderSections {
            usage,
            options,
            environment,
        }
    }
}

/// Text following a leading file name echo, without its separator.
///
/// `None` when `text` does not start with the file name or its stem.
fn strip_filename_echo<'a>(text: &'a str, file_name: &str) -> Option<&'a str> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    [file_name, stem]
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| {
            let rest = text.strip_prefix(candidate)?;
            let echoed = rest.is_empty()
                || rest.starts_with(char::is_whitespace)
                || rest.starts_with(is_colon);
            if !echoed {
                return None;
            }
            let rest = rest.trim_start();
            let rest = rest
                .strip_prefix(is_colon)
                .or_else(|| rest.strip_prefix('-'))
                .unwrap_or(rest);
            Some(rest.trim())
        })
}

/// Empty lines and rules made only of `=`, `-`, `#`, `*` or `~`.
fn is_decoration(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '=' | '-' | '#' | '*' | '~'))
}

fn is_colon(c: char) -> bool {
    c == ':' || c == '：'
}

fn section_header(line: &str) -> Option<(SectionKind, &str)> {
    let (head, rest) = line.trim_start().split_once(is_colon)?;

    let kind = head.split('/').map(str::trim).find_map(|word| {
        let lower = word.to_lowercase();
        if USAGE_KEYWORDS.contains(&lower.as_str()) {
            Some(SectionKind::Usage)
        } else if OPTIONS_KEYWORDS.contains(&lower.as_str()) {
            Some(SectionKind::Options)
        } else if ENVIRONMENT_KEYWORDS.contains(&lower.as_str()) {
            Some(SectionKind::Environment)
        } else {
            None
        }
    })?;

    Some((kind, rest.trim()))
}

/// An unindented `Something:` line that is not one of ours, e.g. `Examples:`.
fn is_other_section(line: &str) -> bool {
    let trimmed = line.trim_end();
    !line.starts_with(char::is_whitespace)
        && !trimmed.starts_with('-')
        && trimmed.ends_with(is_colon)
}

fn strip_bullet(line: &str) -> &str {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim()
}

/// Split `-f, --flag VALUE   description` into flags and description.
fn parse_options(lines: &[String]) -> Vec<OptionEntry> {
    let mut options: Vec<OptionEntry> = Vec::new();

    for line in lines {
        let text = line.trim();
        if text.starts_with('-') {
            let split_at = [text.find("  "), text.find('\t')]
                .into_iter()
                .flatten()
                .min();
            let (flags, description) = match split_at {
                Some(i) => (text[..i].trim(), text[i..].trim()),
                None => (text, ""),
            };
            options.push(OptionEntry {
                flags: flags.to_string(),
                description: description.to_string(),
            });
        } else if let Some(last) = options.last_mut() {
            if !last.description.is_empty() {
                last.description.push(' ');
            }
            last.description.push_str(text);
        }
    }

    options
}
