use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use stagefeed::config::{StagefeedConfig, log_path};
use stagefeed::parser::ProjectParser;
use stagefeed::source::{NuGetConfigSettings, SelectedSource, SelectionRequest, SourceSelector};
use stagefeed::version::automatic::AutomaticPackageVersioner;
use stagefeed::version::feed::PackageIdentity;
use stagefeed::version::feeds::{LocalFeed, NuGetFeed, RoutedFeed};
use stagefeed::version::prerelease::{PrereleaseVersioner, PrereleaseVersioningMode, SystemClock};
use stagefeed::version::publish::await_publish;
use stagefeed::version::selector::{PackageVersionSelector, resolve_sources};
use stagefeed::version::semver::require_version;

#[derive(Parser)]
#[command(name = "stagefeed")]
#[command(version, about = "Staged NuGet feed selection and package version negotiation")]
struct Cli {
    /// Write logs to a file (defaults to the data directory when no path is given)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Repository root holding stagefeed.json and NuGet.Config
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the source a stage resolves to
    Source {
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Compute the version to push a package with
    Version {
        /// Package id
        #[arg(long)]
        id: String,
        /// Base version, e.g. 1.2.3
        #[arg(long)]
        version: String,
        #[command(flatten)]
        stage: StageArgs,
        /// Prerelease versioning mode, overrides the configuration
        #[arg(long)]
        mode: Option<String>,
    },
    /// Select newer versions for the package references of a repository
    Update {
        /// Version glob applied to references without their own, e.g. "1.*"
        #[arg(long)]
        pattern: Option<String>,
        /// Only consider package ids matching this glob
        #[arg(long)]
        id: Option<String>,
        /// Source name, URI or "All"
        #[arg(long)]
        source: Option<String>,
        /// Search the feeds of this stage instead of a named source
        #[arg(long, conflicts_with = "source")]
        stage: Option<String>,
        /// Accept prerelease versions
        #[arg(long)]
        prerelease: bool,
    },
    /// Wait until a pushed package can be found on its source
    Await {
        #[arg(long)]
        id: String,
        #[arg(long)]
        version: String,
        /// Source URI or local directory
        #[arg(long)]
        source: String,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Milliseconds between checks
        #[arg(long)]
        poll_interval: Option<u64>,
    },
    /// List the package references found in a repository
    Scan {
        /// Only list package ids matching this glob
        #[arg(long)]
        id: Option<String>,
    },
}

/// Stage selection inputs; each flag overrides stagefeed.json
#[derive(Args)]
struct StageArgs {
    /// Stage name, e.g. a branch or build configuration
    #[arg(long)]
    stage: Option<String>,
    #[arg(long)]
    production: Option<String>,
    #[arg(long)]
    integration: Option<String>,
    #[arg(long)]
    development: Option<String>,
    #[arg(long)]
    local_source: Option<String>,
    #[arg(long)]
    prerelease_prefix: Option<String>,
    #[arg(long)]
    prerelease_postfix: Option<String>,
    #[arg(long)]
    prerelease_format: Option<String>,
    /// Allow pushing to the local source when no stage matches
    #[arg(long)]
    allow_local_source: bool,
    /// Never push, only resolve
    #[arg(long)]
    no_publish: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionOutput<'a> {
    id: &'a str,
    version: String,
    source: &'a SelectedSource,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureOutput<'a> {
    id: &'a str,
    error: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .as_ref()
        .map(|path| path.clone().unwrap_or_else(log_path));
    let _guard = stagefeed::logging::init(log_file.as_deref(), cli.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = StagefeedConfig::load(&cli.root)?;
    let settings = Arc::new(NuGetConfigSettings::new());

    match cli.command {
        Command::Source { stage } => {
            let source = select_source(&settings, &config, &stage, &cli.root)?;
            print_json(&source)
        }
        Command::Version {
            id,
            version,
            stage,
            mode,
        } => {
            let base = require_version(&version)?;
            let source = select_source(&settings, &config, &stage, &cli.root)?;
            let version = if source.is_release {
                let feed = Arc::new(RoutedFeed::default());
                AutomaticPackageVersioner::new(feed.clone(), feed)
                    .resolve(&id, &base, &source.feed)
                    .await?
            } else {
                let mode: PrereleaseVersioningMode = mode
                    .as_deref()
                    .unwrap_or(&config.prerelease.versioning_mode)
                    .parse()?;
                PrereleaseVersioner::new(Arc::new(SystemClock)).format(&base, mode, &source)?
            };

            print_json(&VersionOutput {
                id: &id,
                version: version.to_string(),
                source: &source,
            })
        }
        Command::Update {
            pattern,
            id,
            source,
            stage,
            prerelease,
        } => {
            let sources = match stage {
                Some(stage) => {
                    let args = StageArgs::for_stage(stage);
                    select_source(&settings, &config, &args, &cli.root)?
                        .search_feeds()
                        .map(str::to_string)
                        .collect()
                }
                None => resolve_sources(
                    settings.as_ref(),
                    &cli.root,
                    source.as_deref().unwrap_or(&config.update_source),
                )?,
            };
            info!("Searching {} source(s) for updates", sources.len());

            let suggestions: Vec<_> = project_parser(id.as_deref())?
                .scan(&cli.root)?
                .iter()
                .flat_map(|(_, references)| references.iter())
                .filter_map(|reference| reference.to_suggestion())
                .collect();

            let selector = PackageVersionSelector::new(Arc::new(RoutedFeed::default()), sources);
            let pattern = pattern.or(config.version_pattern);
            let selection = selector
                .select_updates(&suggestions, pattern.as_deref(), prerelease)
                .await;

            print_json(&selection.updates)?;
            if !selection.is_success() {
                let failures: Vec<_> = selection
                    .failures
                    .iter()
                    .map(|failure| FailureOutput {
                        id: &failure.id,
                        error: failure.error.to_string(),
                    })
                    .collect();
                eprintln!("{}", serde_json::to_string_pretty(&failures)?);
                bail!("{} package(s) could not be updated", failures.len());
            }
            Ok(())
        }
        Command::Await {
            id,
            version,
            source,
            timeout,
            poll_interval,
        } => {
            let identity = PackageIdentity::new(&id, require_version(&version)?, &source);
            let timeout = Duration::from_millis(timeout.unwrap_or(config.publish.timeout));
            let poll_interval =
                Duration::from_millis(poll_interval.unwrap_or(config.publish.poll_interval));

            let feed = RoutedFeed::new(Arc::new(LocalFeed::new()), Arc::new(NuGetFeed::new()));
            let found = await_publish(&feed, &identity, timeout, poll_interval).await?;
            print_json(&found)?;
            if !found {
                warn!("{} {} was not found on {}", id, version, source);
                bail!("{} {} did not appear within {:?}", id, version, timeout);
            }
            Ok(())
        }
        Command::Scan { id } => {
            let results = project_parser(id.as_deref())?.scan(&cli.root)?;
            let references: Vec<_> = results
                .iter()
                .flat_map(|(_, references)| references.iter())
                .collect();
            print_json(&references)
        }
    }
}

impl StageArgs {
    fn for_stage(stage: String) -> Self {
        Self {
            stage: Some(stage),
            production: None,
            integration: None,
            development: None,
            local_source: None,
            prerelease_prefix: None,
            prerelease_postfix: None,
            prerelease_format: None,
            allow_local_source: false,
            no_publish: true,
        }
    }
}

fn select_source(
    settings: &Arc<NuGetConfigSettings>,
    config: &StagefeedConfig,
    args: &StageArgs,
    root: &Path,
) -> anyhow::Result<SelectedSource> {
    let sources = &config.sources;
    let prerelease = &config.prerelease;
    let pick = |arg: &Option<String>, configured: &Option<String>| {
        arg.clone().or_else(|| configured.clone())
    };

    let request = SelectionRequest {
        stage: args.stage.clone(),
        production: pick(&args.production, &sources.production),
        integration: pick(&args.integration, &sources.integration),
        development: pick(&args.development, &sources.development),
        local_source: args
            .local_source
            .clone()
            .unwrap_or_else(|| config.local_source()),
        fallback_prerelease_format: pick(&args.prerelease_format, &prerelease.format),
        fallback_api_key: sources.api_key.clone(),
        fallback_symbols_api_key: sources.symbols_api_key.clone(),
        local_stage: prerelease.local_stage.clone(),
        prerelease_prefix: pick(&args.prerelease_prefix, &prerelease.prefix),
        prerelease_postfix: pick(&args.prerelease_postfix, &prerelease.postfix),
        root_directory: root.to_path_buf(),
        allow_local_source: args.allow_local_source || sources.allow_local_source,
        is_publish_enabled: config.publish.enabled && !args.no_publish,
    };

    let selector = SourceSelector::new(settings.clone());
    selector
        .select(&request)
        .with_context(|| format!("Failed to select a source for stage {:?}", args.stage))
}

fn project_parser(id: Option<&str>) -> anyhow::Result<ProjectParser> {
    Ok(match id {
        Some(id) => ProjectParser::with_id_filter(id)?,
        None => ProjectParser::new(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
