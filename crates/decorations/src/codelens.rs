//! Method detection for call-statistics lenses.
//!
//! Symbols are found with per-language regular expressions. A method's subject
//! is qualified with the nearest module and class declared before it:
//! `module.` + `class.` + `method(args)`.

use crate::error::Result;
use crate::sparkline::sparkline;
use lmrisk_protocol::CodelensStats;
use regex::Regex;
use serde::Serialize;
use std::fmt::Display;

const JAVA_METHOD: &str = r"(?:public|protected|private|static)\s*[\w<>\[\]]+\s+(\w+\s*(?:\w+)*\([^)]*\))";
const JAVA_CLASS: &str = r"(?:public|protected|private|static)\s*class\s+([\w.<>]+)";
const CSHARP_METHOD: &str = r"(?:public|protected|internal|private)(?:\s+async)?(?:\s+(?:abstract|static|virtual|override|sealed))?\s+[\w+<>\[\]\s]+\s+(\w+\([\w\s<>]*\))";
const CSHARP_CLASS: &str = r"(?:public|private|internal)\s+abstract\s+class\s+([\w<>]+)";
const ELIXIR_METHOD: &str = r"defp?\s+(\w+(?:\(.*\))?)\s*,?\s*do";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LensLanguage {
    Java,
    CSharp,
    Php,
    Elixir,
}

impl LensLanguage {
    /// Language for a file extension (without the dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "java" => Some(Self::Java),
            "cs" => Some(Self::CSharp),
            "php" => Some(Self::Php),
            "ex" | "exs" => Some(Self::Elixir),
            _ => None,
        }
    }

    const fn patterns(self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            Self::Java => (JAVA_METHOD, r"package\s+([\w.]+);", Some(JAVA_CLASS)),
            Self::Php => (JAVA_METHOD, r"namespace\s+([\w.]+);", Some(JAVA_CLASS)),
            Self::CSharp => (CSHARP_METHOD, r"namespace\s+([\w.]+)", Some(CSHARP_CLASS)),
            Self::Elixir => (ELIXIR_METHOD, r"defmodule\s+([\w.]+)\s+do", None),
        }
    }
}

/// A method that gets a lens, located by byte offset and zero-based line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodLens {
    pub line: usize,
    pub offset: usize,
    pub method: String,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct SymbolScanner {
    method: Regex,
    module: Regex,
    class: Option<Regex>,
}

impl SymbolScanner {
    pub fn new(language: LensLanguage) -> Result<Self> {
        let (method, module, class) = language.patterns();
        Ok(Self {
            method: Regex::new(method)?,
            module: Regex::new(module)?,
            class: class.map(Regex::new).transpose()?,
        })
    }

    #[must_use]
    pub fn lenses(&self, text: &str) -> Vec<MethodLens> {
        let modules = declarations(&self.module, text);
        let classes = self
            .class
            .as_ref()
            .map(|class| declarations(class, text))
            .unwrap_or_default();

        self.method
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let method = captures.get(1)?.as_str().to_string();
                let anchor = whole.start() + 1;
                let subject = format!(
                    "{}{}{method}",
                    nearest_before(&modules, anchor),
                    nearest_before(&classes, anchor)
                );
                Some(MethodLens {
                    line: line_of(text, whole.start()),
                    offset: whole.start(),
                    method,
                    subject,
                })
            })
            .collect()
    }
}

fn declarations(regex: &Regex, text: &str) -> Vec<(usize, String)> {
    regex
        .captures_iter(text)
        .filter_map(|captures| {
            let start = captures.get(0)?.start();
            Some((start, captures.get(1)?.as_str().to_string()))
        })
        .collect()
}

/// `name.` of the last declaration starting at or before `offset`.
fn nearest_before(declarations: &[(usize, String)], offset: usize) -> String {
    declarations
        .iter()
        .rev()
        .find(|(start, _)| *start <= offset)
        .map(|(_, name)| format!("{name}."))
        .unwrap_or_default()
}

fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

fn plural(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Lens title for a stats lookup.
#[must_use]
pub fn lens_title(stats: Option<&CodelensStats>, days: u32, sparkline_enabled: bool) -> String {
    match stats {
        None => "There was no response from the server.".to_string(),
        Some(stats) => format!(
            "{} in the last {days} days - {}{}",
            plural(stats.number_of_calls, "call", "calls"),
            plural(stats.number_of_fails, "fail", "fails"),
            sparkline(&stats.history, sparkline_enabled)
        ),
    }
}

#[must_use]
pub fn lens_error_title(error: impl Display) -> String {
    format!("The following error occurred: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JAVA: &str = "package com.shop;\n\npublic class Cart {\n    public int total(int tax) {\n        return 0;\n    }\n\n    private void reset() {}\n}\n";

    #[test]
    fn java_methods_are_fully_qualified() {
        let scanner = SymbolScanner::new(LensLanguage::Java).unwrap();
        let lenses = scanner.lenses(JAVA);
        let subjects: Vec<&str> = lenses.iter().map(|l| l.subject.as_str()).collect();
        assert_eq!(
            subjects,
            vec!["com.shop.Cart.total(int tax)", "com.shop.Cart.reset()"]
        );
        assert_eq!(lenses[0].line, 3);
        assert_eq!(lenses[1].line, 7);
    }

    #[test]
    fn elixir_uses_module_only() {
        let source = "defmodule Shop.Cart do\n  def total(items) do\n    0\n  end\nend\n";
        let scanner = SymbolScanner::new(LensLanguage::Elixir).unwrap();
        let lenses = scanner.lenses(source);
        assert_eq!(lenses.len(), 1);
        assert_eq!(lenses[0].subject, "Shop.Cart.total(items)");
    }

    #[test]
    fn methods_before_any_declaration_stay_unqualified() {
        let scanner = SymbolScanner::new(LensLanguage::Php).unwrap();
        let lenses = scanner.lenses("public function run() {}");
        assert_eq!(lenses[0].subject, "run()");
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(LensLanguage::from_extension("JAVA"), Some(LensLanguage::Java));
        assert_eq!(LensLanguage::from_extension("exs"), Some(LensLanguage::Elixir));
        assert_eq!(LensLanguage::from_extension("rs"), None);
    }

    #[test]
    fn titles_pluralize_counts() {
        let stats = CodelensStats {
            number_of_calls: 1,
            number_of_fails: 2,
            history: vec![0.0, 100.0],
        };
        assert_eq!(
            lens_title(Some(&stats), 30, true),
            "1 call in the last 30 days - 2 fails    ▁█"
        );
        let stats = CodelensStats {
            number_of_calls: 12,
            number_of_fails: 1,
            history: vec![50.0],
        };
        assert_eq!(
            lens_title(Some(&stats), 7, false),
            "12 calls in the last 7 days - 1 fail"
        );
        assert_eq!(
            lens_title(None, 30, true),
            "There was no response from the server."
        );
        assert_eq!(
            lens_error_title("timeout"),
            "The following error occurred: timeout"
        );
    }
}
