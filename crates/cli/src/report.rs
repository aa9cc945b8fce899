use lmrisk_decorations::{FoldingRange, TokenSpan};
use lmrisk_protocol::{AggregationPolicy, CompletionProposal, LineMatch, RiskLevel};
use lmrisk_tree::ScanStats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoringSummary {
    pub scored: usize,
    /// Files answered from the in-memory entropy cache.
    pub cached: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub stale: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub index: usize,
    pub path: String,
    pub lines: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub generation: u64,
    pub policy: AggregationPolicy,
    pub root_risk: RiskLevel,
    pub stats: ScanStats,
    pub scoring: ScoringSummary,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinesReport {
    pub path: PathBuf,
    pub language_id: String,
    pub unsupported: bool,
    pub line_entropy: Vec<f64>,
    /// Gutter icon per line, `0` for no icon.
    pub gutter: Vec<usize>,
    pub minimap: Vec<usize>,
    pub tokens: Vec<TokenSpan>,
    pub folding: Vec<FoldingRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileMatches {
    pub index: usize,
    pub path: String,
    pub matches: BTreeMap<usize, LineMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub files_searched: usize,
    /// Only files with at least one matching line.
    pub files: Vec<FileMatches>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub line: usize,
    pub column: usize,
    pub proposals: Vec<CompletionProposal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LensReport {
    pub line: usize,
    pub subject: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageLine {
    pub line: usize,
    pub covered: bool,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetReport {
    pub dir: PathBuf,
    pub gutter_icons: Vec<PathBuf>,
    pub minimaps: usize,
    pub thumbnails: usize,
}

/// Markdown summary of a scan: totals plus the riskiest files.
pub fn render_scan_report(report: &ScanReport, limit: usize) -> String {
    let mut md = String::new();
    md.push_str("# Risk report\n\n");
    let _ = writeln!(md, "- Workspace: `{}`", report.root.display());
    let _ = writeln!(md, "- Policy: `{}`", report.policy);
    let _ = writeln!(md, "- Root risk: `{}`", format_risk(report.root_risk));
    let _ = writeln!(
        md,
        "- Files: `{}` ({} lines, {} pruned directories)",
        report.stats.files, report.stats.total_lines, report.stats.pruned_directories
    );
    let _ = writeln!(
        md,
        "- Scoring: `{}` scored, `{}` cached, `{}` unsupported, `{}` failed\n",
        report.scoring.scored,
        report.scoring.cached,
        report.scoring.unsupported,
        report.scoring.failed
    );

    let mut files: Vec<&FileReport> = report
        .files
        .iter()
        .filter(|file| file.risk_level.value().is_some())
        .collect();
    files.sort_by(|a, b| {
        let (a_risk, b_risk) = (a.risk_level.as_f64(), b.risk_level.as_f64());
        b_risk.total_cmp(&a_risk).then_with(|| a.path.cmp(&b.path))
    });

    md.push_str("## Riskiest files\n\n");
    md.push_str("| file | lines | risk |\n");
    md.push_str("|---|---:|---:|\n");
    for file in files.into_iter().take(limit) {
        let _ = writeln!(
            md,
            "| `{}` | `{}` | `{}` |",
            escape_cell(&file.path),
            file.lines,
            format_risk(file.risk_level)
        );
    }
    md
}

fn format_risk(risk: RiskLevel) -> String {
    match risk {
        RiskLevel::NotCalculated => "n/a".to_string(),
        RiskLevel::NotSupported => "unsupported".to_string(),
        RiskLevel::Value(value) => format!("{value:.2}"),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('`', "'")
}
