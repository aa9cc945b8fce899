use anyhow::{bail, Context, Result};
use lmrisk_client::{
    CodelensOptions, CompletionOptions, Endpoints, HttpModelService, ModelService, ScoringContext,
    ServiceClient, StubModelService, DEFAULT_TIMEOUT,
};
use lmrisk_decorations::{
    ColorRanges, DEFAULT_COLORS, DEFAULT_FOLDING_MAX_RISK, DEFAULT_OK_COLOR, DEFAULT_RANGES,
    DEFAULT_WARNING_COLOR,
};
use lmrisk_protocol::AggregationPolicy;
use lmrisk_search::{SearchOptions, DEFAULT_THRESHOLD};
use lmrisk_tree::{ScanOptions, DEFAULT_DEBOUNCE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "lmrisk.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    #[default]
    Http,
    /// Deterministic offline scores, no network.
    Stub,
}

impl ScorerKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "stub" => Some(Self::Stub),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeSettings {
    pub directories: Vec<String>,
    pub filetypes: Vec<String>,
}

impl Default for ExcludeSettings {
    fn default() -> Self {
        let options = ScanOptions::default();
        Self {
            directories: options.exclude_directories,
            filetypes: options.exclude_extensions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Upper bounds of the color ranges; the first range starts at 0.
    pub ranges: Vec<f64>,
    pub colors: Vec<String>,
    pub policy: AggregationPolicy,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            ranges: DEFAULT_RANGES.to_vec(),
            colors: DEFAULT_COLORS.iter().map(ToString::to_string).collect(),
            policy: AggregationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageModelSettings {
    pub hostname: String,
    pub model: String,
    pub metrics: String,
    pub token_type: String,
    pub scorer: ScorerKind,
    pub timeout_secs: u64,
}

impl Default for LanguageModelSettings {
    fn default() -> Self {
        let context = ScoringContext::default();
        Self {
            hostname: Endpoints::default().languagemodel,
            model: context.model,
            metrics: context.metrics,
            token_type: context.token_type,
            scorer: ScorerKind::default(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub hostname: String,
    /// Percent.
    pub threshold: f64,
    pub interval: u32,
    pub concurrency: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            hostname: Endpoints::default().search,
            threshold: DEFAULT_THRESHOLD,
            interval: options.interval,
            concurrency: options.concurrency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub hostname: String,
    pub proposals: u32,
    pub context_lines: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        let options = CompletionOptions::default();
        Self {
            hostname: Endpoints::default().completion,
            proposals: options.proposals,
            context_lines: options.context_lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparklineSettings {
    pub enabled: bool,
    pub number_of_bars: u32,
}

impl Default for SparklineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            number_of_bars: CodelensOptions::default().bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodelensSettings {
    pub enabled: bool,
    pub hostname: String,
    pub number_of_days: u32,
    pub sparkline: SparklineSettings,
}

impl Default for CodelensSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hostname: Endpoints::default().codelens,
            number_of_days: CodelensOptions::default().days,
            sparkline: SparklineSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub enabled: bool,
    pub hostname: String,
    pub ok_color: String,
    pub warning_color: String,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hostname: Endpoints::default().highlight,
            ok_color: DEFAULT_OK_COLOR.to_string(),
            warning_color: DEFAULT_WARNING_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapSettings {
    pub enabled: bool,
    pub min_risk: f64,
}

impl Default for MinimapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_risk: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldingSettings {
    pub enabled: bool,
    pub max_risk: f64,
}

impl Default for FoldingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_risk: DEFAULT_FOLDING_MAX_RISK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    pub hostname: String,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            hostname: Endpoints::default().thumbnail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(750),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Relative paths resolve against the workspace root.
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".lmrisk/cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exclude: ExcludeSettings,
    pub general: GeneralSettings,
    pub languagemodel: LanguageModelSettings,
    pub search: SearchSettings,
    pub completion: CompletionSettings,
    pub codelens: CodelensSettings,
    pub highlight: HighlightSettings,
    pub minimap: MinimapSettings,
    pub folding: FoldingSettings,
    pub thumbnail: ThumbnailSettings,
    pub watch: WatchSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// `explicit` must exist when given; otherwise `<workspace>/lmrisk.toml`
    /// is used if present, else the defaults. Environment overrides apply last.
    pub fn load(workspace: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(workspace.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
        };

        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Cannot read config {}", path.display()))?;
                log::debug!("Loaded settings from {}", path.display());
                Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };

        settings.apply_overrides(|key| env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `LMRISK_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LMRISK_LANGUAGEMODEL_URL") {
            self.languagemodel.hostname = url;
        }
        if let Some(url) = lookup("LMRISK_SEARCH_URL") {
            self.search.hostname = url;
        }
        if let Some(url) = lookup("LMRISK_COMPLETION_URL") {
            self.completion.hostname = url;
        }
        if let Some(url) = lookup("LMRISK_CODELENS_URL") {
            self.codelens.hostname = url;
        }
        if let Some(raw) = lookup("LMRISK_SCORER") {
            let Some(kind) = ScorerKind::parse(&raw) else {
                bail!("LMRISK_SCORER must be 'http' or 'stub', got '{raw}'");
            };
            self.languagemodel.scorer = kind;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.color_ranges()?;
        if self.search.threshold.is_nan() || self.search.threshold < 0.0 {
            bail!(
                "search.threshold must be a non-negative percentage, got {}",
                self.search.threshold
            );
        }
        Ok(())
    }

    pub fn color_ranges(&self) -> Result<ColorRanges> {
        Ok(ColorRanges::new(&self.general.ranges, &self.general.colors)?)
    }

    #[must_use]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude_directories: self.exclude.directories.clone(),
            exclude_extensions: self.exclude.filetypes.clone(),
            ..ScanOptions::default()
        }
    }

    #[must_use]
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            threshold: self.search.threshold,
            interval: self.search.interval,
            concurrency: self.search.concurrency,
        }
    }

    #[must_use]
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            proposals: self.completion.proposals,
            context_lines: self.completion.context_lines,
        }
    }

    #[must_use]
    pub fn codelens_options(&self) -> CodelensOptions {
        CodelensOptions {
            days: self.codelens.number_of_days,
            bars: self.codelens.sparkline.number_of_bars,
            sparkline: self.codelens.sparkline.enabled,
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            languagemodel: self.languagemodel.hostname.clone(),
            search: self.search.hostname.clone(),
            completion: self.completion.hostname.clone(),
            codelens: self.codelens.hostname.clone(),
            highlight: self.highlight.hostname.clone(),
            thumbnail: self.thumbnail.hostname.clone(),
        }
    }

    #[must_use]
    pub fn scoring_context(&self, workspace: &Path) -> ScoringContext {
        ScoringContext {
            model: self.languagemodel.model.clone(),
            metrics: self.languagemodel.metrics.clone(),
            token_type: self.languagemodel.token_type.clone(),
            workspace_folder: Some(workspace.to_string_lossy().into_owned()),
        }
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    #[must_use]
    pub fn cache_dir(&self, workspace: &Path) -> PathBuf {
        if self.cache.dir.is_absolute() {
            self.cache.dir.clone()
        } else {
            workspace.join(&self.cache.dir)
        }
    }

    /// Backend selected by `languagemodel.scorer`.
    pub fn model_service(&self) -> Result<Arc<dyn ModelService>> {
        match self.languagemodel.scorer {
            ScorerKind::Stub => Ok(Arc::new(StubModelService::new())),
            ScorerKind::Http => {
                let client = ServiceClient::new(Duration::from_secs(self.languagemodel.timeout_secs))
                    .context("Cannot build HTTP client")?;
                Ok(Arc::new(HttpModelService::new(client, self.endpoints())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.exclude.directories, vec!["node_modules", "out"]);
        assert_eq!(settings.general.ranges, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(settings.search.threshold, 20.0);
        assert_eq!(settings.completion.proposals, 20);
        assert_eq!(settings.codelens.number_of_days, 30);
        assert_eq!(settings.codelens.sparkline.number_of_bars, 15);
        assert_eq!(settings.minimap.min_risk, 75.0);
        assert_eq!(settings.folding.max_risk, 20.0);
        assert_eq!(settings.watch.debounce_ms, 750);
        assert_eq!(settings.languagemodel.scorer, ScorerKind::Http);
        settings.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [search]
            threshold = 35.0

            [codelens.sparkline]
            enabled = false

            [general]
            policy = "Maximum"
            "#,
        )
        .unwrap();
        assert_eq!(settings.search.threshold, 35.0);
        assert_eq!(settings.search.concurrency, 4);
        assert!(!settings.codelens.sparkline.enabled);
        assert_eq!(settings.codelens_options().effective_bars(), 0);
        assert_eq!(settings.general.policy, AggregationPolicy::Maximum);
    }

    #[test]
    fn environment_overrides_urls_and_scorer() {
        let env: HashMap<&str, &str> = [
            ("LMRISK_SEARCH_URL", "http://search.local/api"),
            ("LMRISK_SCORER", "STUB"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();
        assert_eq!(settings.search.hostname, "http://search.local/api");
        assert_eq!(settings.languagemodel.scorer, ScorerKind::Stub);

        let err = settings
            .apply_overrides(|key| (key == "LMRISK_SCORER").then(|| "grpc".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("LMRISK_SCORER"));
    }

    #[test]
    fn validation_rejects_bad_ranges_and_threshold() {
        let mut settings = Settings::default();
        settings.general.colors.pop();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.general.ranges = vec![20.0, 10.0, 60.0, 80.0, 100.0];
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search.threshold = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn relative_cache_dir_resolves_against_workspace() {
        let settings = Settings::default();
        assert_eq!(
            settings.cache_dir(Path::new("/ws")),
            PathBuf::from("/ws/.lmrisk/cache")
        );
    }
}
