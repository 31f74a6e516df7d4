//! Structural rewrite rules for flat text.
//!
//! When extraction loses every line break, the result is one long run of
//! words. A [`RuleTable`] is an ordered list of regex rewrites that put
//! paragraph breaks back in front of bullets, numbered items, section
//! headers, and known lead-in phrases.
//!
//! Rules only ever turn the whitespace between two tokens into `"\n\n"`.
//! Patterns match those gaps with `\s`, so a gap that already holds a break
//! matches again and is rewritten to the same thing.
//!
//! The token `{bullet}` in a pattern or replacement is substituted with the
//! canonical bullet before compilation.

use crate::error::ReflowError;
use crate::pipeline::layout::collapse_blank_runs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

const BULLET_TOKEN: &str = "{bullet}";

/// One rewrite rule as written in a rule table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Label used in logs and error messages.
    #[serde(default)]
    pub name: String,
    /// Regex (Rust `regex` syntax).
    pub pattern: String,
    /// Replacement text; `$1`, `${name}` refer to capture groups.
    pub replacement: String,
}

impl RuleSpec {
    pub fn new(name: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }
}

/// On-disk shape of a rule table: `{"rules": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTableFile {
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

/// An ordered, compiled set of rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    specs: Vec<RuleSpec>,
    compiled: Vec<CompiledRule>,
}

impl RuleTable {
    /// Compile `specs` for the given canonical bullet.
    ///
    /// Fails on the first rule whose pattern does not compile, naming it by
    /// position and label.
    pub fn compile(specs: Vec<RuleSpec>, bullet: char) -> Result<Self, ReflowError> {
        let bullet_pattern = regex::escape(&bullet.to_string());
        let bullet_text = bullet.to_string();

        let compiled = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let pattern = spec.pattern.replace(BULLET_TOKEN, &bullet_pattern);
                let replacement = spec.replacement.replace(BULLET_TOKEN, &bullet_text);
                Regex::new(&pattern)
                    .map(|pattern| CompiledRule {
                        name: spec.name.clone(),
                        pattern,
                        replacement,
                    })
                    .map_err(|source| ReflowError::InvalidRule {
                        index,
                        name: spec.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Compiled rule table with {} rules", compiled.len());
        Ok(Self { specs, compiled })
    }

    /// The built-in table for project-proposal study notes.
    pub fn academic(bullet: char) -> Result<Self, ReflowError> {
        Self::compile(academic_rules(), bullet)
    }

    /// The built-in rules that assume nothing about vocabulary.
    pub fn generic(bullet: char) -> Result<Self, ReflowError> {
        Self::compile(generic_rules(), bullet)
    }

    /// A table with no rules; flat text is left as one paragraph.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and compile a JSON rule table (`{"rules": [...]}` or a bare
    /// array).
    pub fn from_json_str(json: &str, bullet: char) -> Result<Self, ReflowError> {
        let specs = parse_specs(json).map_err(|source| ReflowError::RuleTableParse {
            path: "<inline>".into(),
            source,
        })?;
        Self::compile(specs, bullet)
    }

    /// Load and compile a JSON rule table from disk.
    pub fn from_json_file(path: &Path, bullet: char) -> Result<Self, ReflowError> {
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReflowError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ReflowError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ReflowError::Internal(format!("reading {}: {e}", path.display())),
        })?;
        let specs = parse_specs(&json).map_err(|source| ReflowError::RuleTableParse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::compile(specs, bullet)
    }

    /// Apply every rule in order, then collapse blank-line runs.
    pub fn apply(&self, input: &str) -> String {
        let mut text = input.to_string();
        for rule in &self.compiled {
            let rewritten = rule.pattern.replace_all(&text, rule.replacement.as_str());
            if let std::borrow::Cow::Owned(rewritten) = rewritten {
                trace!("Rule '{}' rewrote the text", rule.name);
                text = rewritten;
            }
        }
        collapse_blank_runs(&text)
    }

    /// The rule definitions this table was compiled from.
    pub fn specs(&self) -> &[RuleSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Serialise the definitions back to the JSON file format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&RuleTableFile {
            rules: self.specs.clone(),
        })
    }
}

fn parse_specs(json: &str) -> Result<Vec<RuleSpec>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Wrapped(RuleTableFile),
        Bare(Vec<RuleSpec>),
    }
    Ok(match serde_json::from_str::<Shape>(json)? {
        Shape::Wrapped(file) => file.rules,
        Shape::Bare(rules) => rules,
    })
}

// ── Built-in tables ──────────────────────────────────────────────────────────

/// Rules that assume nothing about the document's vocabulary.
pub fn generic_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new(
            "break-before-bullet",
            r"([.!?:])\s+({bullet})",
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-inline-bullet-item",
            r"(\S)\s+({bullet} ?[A-Z])",
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-numbered-item",
            r"([.!?:])\s+(\d{1,2}\.\s*[A-Z])",
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-colon-lead-in",
            r"([a-z])\. ([A-Z][a-z]+(?: [A-Z][a-z]+)*:)",
            "$1.\n\n$2",
        ),
    ]
}

/// Section headings of the project-proposal notes this tool was built for.
const SECTION_HEADINGS: &str = "Executive Summary|Problem Statement|Proposed Solution|Core Features";

/// Item headings inside those sections.
const ITEM_HEADINGS: &str = "University students|Information Overload|Inefficient Study Methods|\
Poor Content Organization|Limited Self-Assessment|Unknown Learning Patterns|\
Time Management Issues|Intelligent Document Processing|AI Question Generation System|\
Questionnaire-Based Learning Analytics|Visual Learning Path Analytics|\
Performance Correlation Analysis|Enhanced Questionnaire System";

/// Generic rules plus the phrase rules for academic project-proposal notes.
pub fn academic_rules() -> Vec<RuleSpec> {
    let mut rules = vec![
        RuleSpec::new(
            "title-block",
            r"(\w)\s+(Final Year Project Proposal)\s+",
            "$1\n\n$2\n\n",
        ),
        RuleSpec::new(
            "section-heading-own-line",
            &format!(r"({SECTION_HEADINGS})\s+([A-Z])"),
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-section-heading",
            &format!(r"([A-Za-z][.!?:]?)\s+({SECTION_HEADINGS})\b"),
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-item-heading",
            &format!(r"([a-z][.!?:])\s+({ITEM_HEADINGS})\b"),
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-product-intro",
            r"([a-z])\s+(LearnFlow is|The system)\b",
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-list-after-lead-word",
            r"\b(processes:|systems|time|collections|effectively|weaknesses)\s*({bullet})",
            "$1\n\n$2",
        ),
        RuleSpec::new(
            "break-before-face-phrase",
            r"([a-z])\. ([A-Z][a-z]+(?: [A-Z][a-z]+)* face)\b",
            "$1.\n\n$2",
        ),
    ];
    rules.extend(generic_rules());
    rules
}

static ACADEMIC_TABLE: Lazy<Arc<RuleTable>> = Lazy::new(|| {
    Arc::new(
        RuleTable::compile(academic_rules(), crate::config::DEFAULT_BULLET)
            .expect("built-in rule table compiles"),
    )
});

/// The default table, compiled once for the default bullet.
pub fn default_table() -> Arc<RuleTable> {
    Arc::clone(&ACADEMIC_TABLE)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn academic() -> RuleTable {
        RuleTable::compile(academic_rules(), '*').unwrap()
    }

    #[test]
    fn test_builtin_tables_compile_for_every_bullet() {
        for bullet in ['*', '-', '+', '\u{2022}', '\u{25A0}'] {
            RuleTable::compile(academic_rules(), bullet).unwrap();
            RuleTable::compile(generic_rules(), bullet).unwrap();
        }
    }

    #[test]
    fn test_bullet_break() {
        let t = RuleTable::compile(generic_rules(), '*').unwrap();
        assert_eq!(t.apply("Intro text. * first * second"), "Intro text.\n\n* first * second");
    }

    #[test]
    fn test_numbered_break_keeps_decimals() {
        let t = RuleTable::compile(generic_rules(), '*').unwrap();
        assert_eq!(
            t.apply("Steps follow. 1. Open the file. 2. Read it."),
            "Steps follow.\n\n1. Open the file.\n\n2. Read it."
        );
        assert_eq!(t.apply("Version 2.5 is out. It costs 3.50 now."), "Version 2.5 is out. It costs 3.50 now.");
    }

    #[test]
    fn test_colon_lead_in() {
        let t = RuleTable::compile(generic_rules(), '*').unwrap();
        assert_eq!(
            t.apply("the end. Core Features: many"),
            "the end.\n\nCore Features: many"
        );
    }

    #[test]
    fn test_section_heading_gets_own_paragraph() {
        let out = academic().apply("tracking. Problem Statement University students face issues");
        assert_eq!(
            out,
            "tracking.\n\nProblem Statement\n\nUniversity students face issues"
        );
    }

    #[test]
    fn test_title_block() {
        let out = academic().apply("LearnFlow Final Year Project Proposal Executive Summary LearnFlow is an app");
        assert_eq!(
            out,
            "LearnFlow\n\nFinal Year Project Proposal\n\nExecutive Summary\n\nLearnFlow is an app"
        );
    }

    #[test]
    fn test_rules_are_stable_on_their_output() {
        let t = academic();
        let input = "Overview here. Executive Summary LearnFlow is a tool for systems * one * two. \
                     Then: 1. Alpha step. Proposed Solution The system works. Students face limits.";
        let once = t.apply(input);
        assert_eq!(t.apply(&once), once);
    }

    #[test]
    fn test_invalid_rule_names_index() {
        let specs = vec![
            RuleSpec::new("ok", "a", "b"),
            RuleSpec::new("bad", "(open", ""),
        ];
        match RuleTable::compile(specs, '*') {
            Err(ReflowError::InvalidRule { index, name, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(name, "bad");
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn test_json_round_trip_shapes() {
        let wrapped = r#"{"rules":[{"name":"x","pattern":"a","replacement":"b"}]}"#;
        let bare = r#"[{"pattern":"a","replacement":"b"}]"#;
        assert_eq!(RuleTable::from_json_str(wrapped, '*').unwrap().len(), 1);
        let t = RuleTable::from_json_str(bare, '*').unwrap();
        assert_eq!(t.specs()[0].name, "");
        assert_eq!(t.apply("aaa"), "bbb");
    }

    #[test]
    fn test_to_json_reloads_to_same_table() {
        let table = RuleTable::generic('*').unwrap();
        let json = table.to_json().unwrap();
        assert!(json.contains("{bullet}"));

        let reloaded = RuleTable::from_json_str(&json, '*').unwrap();
        assert_eq!(reloaded.specs(), table.specs());
        let text = "Intro text. * first item. 1. Next step";
        assert_eq!(reloaded.apply(text), table.apply(text));
    }

    #[test]
    fn test_from_json_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "not json").unwrap();
        let err = RuleTable::from_json_file(&path, '*').unwrap_err();
        assert!(matches!(err, ReflowError::RuleTableParse { .. }));
    }

    #[test]
    fn test_empty_table_only_collapses() {
        assert_eq!(RuleTable::empty().apply("a\n\n\n\nb"), "a\n\nb");
    }
}
