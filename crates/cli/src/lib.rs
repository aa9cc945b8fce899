use anyhow::{Context as AnyhowContext, Result};
use cache::AssetCache;
use clap::{Args, Parser, Subcommand};
use config::Settings;
use editor::SourceFile;
use lmrisk_protocol::messages::{PanelMessage, PanelRequest};
use lmrisk_protocol::AggregationPolicy;
use lmrisk_tree::{ScanOutcome, TreeBuilder, WorkspaceWatcher};
use report::{AssetReport, FileMatches, SearchReport};
use serde::Serialize;
use session::RiskSession;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub mod cache;
pub mod config;
pub mod editor;
pub mod report;
pub mod session;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "lmrisk")]
#[command(about = "Language-model risk scores for a workspace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (default: <workspace>/lmrisk.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan and score the workspace, printing the risk tree
    Scan(ScanArgs),

    /// Find lines whose risk moves when the query is applied
    Search(SearchArgs),

    /// Gutter, minimap, folding and token decorations for one file
    Lines(LinesArgs),

    /// Completion proposals at a position
    Complete(CompleteArgs),

    /// Call statistics lenses for the methods of a file
    Codelens(FileArgs),

    /// Per-line coverage colors for a file
    Coverage(FileArgs),

    /// Write gutter icons and minimap assets to the cache directory
    Cache(CacheArgs),

    /// Panel protocol: JSON requests on stdin, JSON messages on stdout
    Session(SessionArgs),

    /// Rescan whenever the workspace changes
    Watch(WatchArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Aggregation policy (Average, Median, Maximum)
    #[arg(long)]
    policy: Option<AggregationPolicy>,

    /// Print a markdown report instead of JSON
    #[arg(long)]
    markdown: bool,

    /// Files listed in the markdown report
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[derive(Args)]
struct SearchArgs {
    query: String,
}

#[derive(Args)]
struct LinesArgs {
    file: PathBuf,

    /// Zero-based line for hover text
    #[arg(long, requires = "column")]
    line: Option<usize>,

    /// Zero-based column for hover text
    #[arg(long, requires = "line")]
    column: Option<usize>,
}

#[derive(Args)]
struct CompleteArgs {
    file: PathBuf,

    /// Zero-based line
    #[arg(long)]
    line: usize,

    /// Zero-based column
    #[arg(long)]
    column: usize,
}

#[derive(Args)]
struct FileArgs {
    file: PathBuf,
}

#[derive(Args)]
struct CacheArgs {
    /// Also fetch rendered thumbnails from the thumbnail service
    #[arg(long)]
    thumbnails: bool,
}

#[derive(Args)]
struct SessionArgs {
    /// Rescan and push updates when files change
    #[arg(long)]
    watch: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Stop after this many rescans
    #[arg(long)]
    max_batches: Option<usize>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let workspace = cli
        .workspace
        .canonicalize()
        .with_context(|| format!("Invalid workspace {}", cli.workspace.display()))?;
    let settings = Settings::load(&workspace, cli.config.as_deref())?;
    let app = App {
        workspace,
        settings,
        pretty: cli.pretty,
    };

    match cli.command {
        Commands::Scan(args) => app.run_scan(args).await?,
        Commands::Search(args) => app.run_search(args).await?,
        Commands::Lines(args) => app.run_lines(args).await?,
        Commands::Complete(args) => app.run_complete(args).await?,
        Commands::Codelens(args) => app.run_codelens(args).await?,
        Commands::Coverage(args) => app.run_coverage(args).await?,
        Commands::Cache(args) => app.run_cache(args).await?,
        Commands::Session(args) => app.run_session(args).await?,
        Commands::Watch(args) => app.run_watch(args).await?,
    }

    Ok(())
}

struct App {
    workspace: PathBuf,
    settings: Settings,
    pretty: bool,
}

impl App {
    async fn open_session(&self) -> Result<RiskSession> {
        RiskSession::open(&self.workspace, self.settings.clone()).await
    }

    async fn run_scan(&self, args: ScanArgs) -> Result<()> {
        let mut session = self.open_session().await?;
        if let Some(policy) = args.policy {
            session.set_policy(policy);
        }
        let report = session.scan_report();
        if args.markdown {
            print_stdout(&report::render_scan_report(&report, args.limit))
        } else {
            print_json(&report, self.pretty)
        }
    }

    async fn run_search(&self, args: SearchArgs) -> Result<()> {
        let mut session = self.open_session().await?;
        let results = session.search(&args.query).await?;
        let index = session.index();
        let files = results
            .into_iter()
            .filter(|payload| !payload.matches.is_empty())
            .map(|payload| FileMatches {
                path: index
                    .entries()
                    .iter()
                    .find(|entry| entry.index == payload.index)
                    .map(|entry| entry.relative_path.clone())
                    .unwrap_or_default(),
                index: payload.index,
                matches: payload.matches,
            })
            .collect();
        print_json(
            &SearchReport {
                query: args.query,
                files_searched: index.len(),
                files,
            },
            self.pretty,
        )
    }

    async fn run_lines(&self, args: LinesArgs) -> Result<()> {
        let source = SourceFile::read(&args.file).await?;
        let service = self.settings.model_service()?;
        let context = self.settings.scoring_context(&self.workspace);
        let cursor = args.line.zip(args.column);
        let report =
            editor::score_lines(service.as_ref(), &self.settings, &context, &source, cursor)
                .await?;
        print_json(&report, self.pretty)
    }

    async fn run_complete(&self, args: CompleteArgs) -> Result<()> {
        let source = SourceFile::read(&args.file).await?;
        let service = self.settings.model_service()?;
        let report =
            editor::complete(service.as_ref(), &self.settings, &source, args.line, args.column)
                .await?;
        print_json(&report, self.pretty)
    }

    async fn run_codelens(&self, args: FileArgs) -> Result<()> {
        let source = SourceFile::read(&args.file).await?;
        let service = self.settings.model_service()?;
        let lenses = editor::lenses(service.as_ref(), &self.settings, &source).await?;
        print_json(&lenses, self.pretty)
    }

    async fn run_coverage(&self, args: FileArgs) -> Result<()> {
        let source = SourceFile::read(&args.file).await?;
        let service = self.settings.model_service()?;
        let lines = editor::coverage(service.as_ref(), &self.settings, &source).await?;
        print_json(&lines, self.pretty)
    }

    async fn run_cache(&self, args: CacheArgs) -> Result<()> {
        let cache = AssetCache::new(self.settings.cache_dir(&self.workspace));
        let ranges = self.settings.color_ranges()?;
        let mut report = AssetReport {
            dir: cache.dir().to_path_buf(),
            gutter_icons: cache.write_gutter_icons(&ranges).await?,
            ..AssetReport::default()
        };

        let ScanOutcome { tree, .. } =
            TreeBuilder::new(&self.workspace, self.settings.scan_options()).build(0)?;
        let service = self.settings.model_service()?;
        for id in tree.files() {
            let node = tree.node(id);
            let content = node.content().unwrap_or_default();
            if self.settings.minimap.enabled {
                cache.ensure_minimap(&node.path, content).await?;
                report.minimaps += 1;
            }
            if args.thumbnails
                && cache
                    .ensure_thumbnail(service.as_ref(), &node.path, content)
                    .await?
                    .is_some()
            {
                report.thumbnails += 1;
            }
        }
        log::info!(
            "Cached {} minimap(s) and {} thumbnail(s) in {}",
            report.minimaps,
            report.thumbnails,
            report.dir.display()
        );
        print_json(&report, self.pretty)
    }

    async fn run_session(&self, args: SessionArgs) -> Result<()> {
        let mut session = self.open_session().await?;
        let mut watcher = if args.watch {
            Some(WorkspaceWatcher::start(
                session.root(),
                self.settings.scan_options(),
                self.settings.debounce(),
            )?)
        } else {
            None
        };

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Cannot read stdin")? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let messages = match serde_json::from_str::<PanelRequest>(&line) {
                        Ok(request) => session.handle(request).await?,
                        Err(err) => vec![PanelMessage::Error {
                            message: format!("Invalid request: {err}"),
                        }],
                    };
                    for message in &messages {
                        print_json(message, false)?;
                    }
                }
                Some(batch) = async {
                    match watcher.as_mut() {
                        Some(watcher) => watcher.next_batch().await,
                        None => std::future::pending().await,
                    }
                } => {
                    let message = rescan_after_change(&mut session, &batch).await?;
                    print_json(&message, false)?;
                }
            }
        }
        Ok(())
    }

    async fn run_watch(&self, args: WatchArgs) -> Result<()> {
        let mut session = self.open_session().await?;
        print_json(&session.scan_report(), self.pretty)?;

        let mut watcher = WorkspaceWatcher::start(
            session.root(),
            self.settings.scan_options(),
            self.settings.debounce(),
        )?;
        let mut batches = 0;
        while let Some(batch) = watcher.next_batch().await {
            rescan_after_change(&mut session, &batch).await?;
            print_json(&session.scan_report(), self.pretty)?;
            batches += 1;
            if args.max_batches.is_some_and(|max| batches >= max) {
                break;
            }
        }
        Ok(())
    }
}

async fn rescan_after_change(session: &mut RiskSession, batch: &[PathBuf]) -> Result<PanelMessage> {
    let message = session.refresh(batch).await?;
    log::info!(
        "{} change(s) rescanned at generation {}",
        batch.len(),
        session.generation()
    );
    Ok(message)
}
