//! Per-file features: line decorations, completion, codelens and coverage.

use crate::config::Settings;
use crate::report::{CompletionReport, CoverageLine, LensReport, LinesReport};
use anyhow::{Context, Result};
use lmrisk_client::{complete_at, fetch_stats, ClientError, ModelService, ScoringContext};
use lmrisk_decorations::{
    coverage_colors, folding_ranges, hover_text, lens_error_title, lens_title, token_spans,
    ColorRanges, LensLanguage, SymbolScanner,
};
use lmrisk_protocol::{CoverageQuery, EntropyResult};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// An open document.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub language_id: String,
    pub modified: Option<SystemTime>,
}

impl SourceFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Invalid file {}", path.display()))?;
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let modified = fs::metadata(&path).await.ok().and_then(|m| m.modified().ok());
        let language_id = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            path,
            content,
            language_id,
            modified,
        })
    }
}

/// Score the file and derive its editor decorations. A 406 answer yields an
/// empty, `unsupported` report.
pub async fn score_lines(
    service: &dyn ModelService,
    settings: &Settings,
    context: &ScoringContext,
    source: &SourceFile,
    cursor: Option<(usize, usize)>,
) -> Result<LinesReport> {
    let request = context.request(
        &source.content,
        &source.language_id,
        &source.path.to_string_lossy(),
        source.modified,
    );
    let ranges = settings.color_ranges()?;
    match service.score(&request).await {
        Ok(result) => Ok(decorate(source, Some(&result), settings, &ranges, cursor)),
        Err(ClientError::Unsupported) => Ok(decorate(source, None, settings, &ranges, cursor)),
        Err(err) => Err(err).with_context(|| format!("Scoring {} failed", source.path.display())),
    }
}

pub fn decorate(
    source: &SourceFile,
    result: Option<&EntropyResult>,
    settings: &Settings,
    ranges: &ColorRanges,
    cursor: Option<(usize, usize)>,
) -> LinesReport {
    let Some(result) = result else {
        return LinesReport {
            path: source.path.clone(),
            language_id: source.language_id.clone(),
            unsupported: true,
            line_entropy: Vec::new(),
            gutter: Vec::new(),
            minimap: Vec::new(),
            tokens: Vec::new(),
            folding: Vec::new(),
            hover: None,
        };
    };

    let line_entropy = result.line_entropies();
    let gutter = line_entropy
        .iter()
        .map(|&risk| ranges.gutter_bucket(risk))
        .collect();
    let minimap = if settings.minimap.enabled {
        line_entropy
            .iter()
            .map(|&risk| ranges.minimap_bucket(risk, settings.minimap.min_risk))
            .collect()
    } else {
        Vec::new()
    };
    let tokens = if settings.highlight.enabled {
        token_spans(result, ranges)
    } else {
        Vec::new()
    };
    let folding = if settings.folding.enabled {
        folding_ranges(&line_entropy, settings.folding.max_risk)
    } else {
        Vec::new()
    };
    let hover = cursor.and_then(|(line, column)| {
        result
            .lines
            .get(line)
            .map(|scored| hover_text(scored, column))
    });

    LinesReport {
        path: source.path.clone(),
        language_id: source.language_id.clone(),
        unsupported: false,
        line_entropy,
        gutter,
        minimap,
        tokens,
        folding,
        hover,
    }
}

pub async fn complete(
    service: &dyn ModelService,
    settings: &Settings,
    source: &SourceFile,
    line: usize,
    column: usize,
) -> Result<CompletionReport> {
    let proposals = complete_at(
        service,
        &source.content,
        &source.language_id,
        &settings.languagemodel.model,
        line,
        column,
        settings.completion_options(),
    )
    .await
    .context("Completion request failed")?;
    Ok(CompletionReport {
        line,
        column,
        proposals,
    })
}

/// One lens per detected method. Lookups that fail turn into error titles.
pub async fn lenses(
    service: &dyn ModelService,
    settings: &Settings,
    source: &SourceFile,
) -> Result<Vec<LensReport>> {
    if !settings.codelens.enabled {
        return Ok(Vec::new());
    }
    let Some(language) = LensLanguage::from_extension(&source.language_id) else {
        log::debug!("No codelens support for .{}", source.language_id);
        return Ok(Vec::new());
    };

    let scanner = SymbolScanner::new(language)?;
    let options = settings.codelens_options();
    let mut reports = Vec::new();
    for lens in scanner.lenses(&source.content) {
        let title = match fetch_stats(service, options, &lens.subject).await {
            Ok(stats) => lens_title(stats.as_ref(), options.days, options.sparkline),
            Err(err) => {
                log::warn!("Codelens lookup for {} failed: {err}", lens.subject);
                lens_error_title(err)
            }
        };
        reports.push(LensReport {
            line: lens.line,
            subject: lens.subject,
            title,
        });
    }
    Ok(reports)
}

pub async fn coverage(
    service: &dyn ModelService,
    settings: &Settings,
    source: &SourceFile,
) -> Result<Vec<CoverageLine>> {
    let file_name = source.path.to_string_lossy().into_owned();
    let query = CoverageQuery {
        subject: file_name.clone(),
        language_id: source.language_id.clone(),
        file_name,
    };
    let covered = service
        .coverage(&query, &source.content)
        .await
        .context("Coverage request failed")?;
    let colors = coverage_colors(
        &covered,
        &settings.highlight.ok_color,
        &settings.highlight.warning_color,
    );
    Ok(covered
        .iter()
        .zip(colors)
        .enumerate()
        .map(|(line, (&covered, color))| CoverageLine {
            line,
            covered,
            color: color.to_string(),
        })
        .collect())
}
