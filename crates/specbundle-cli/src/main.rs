//! specbundle CLI entrypoint
//! Parses command-line arguments and dispatches to the core assembler.

// Internal imports (std, crate)
use reqwest::Url;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::{bail, Context};
use clap::Parser;
use specbundle_core::{
    assemble_bundle, rewrite, verify_bundle, wrap, BundlePlan, Config, ReqwestTransport,
    ResolvedPlan, RewriteRule,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specbundle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects a plan and pins its version and revision
#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    /// Built-in API name (see `specbundle plans`)
    #[arg(required_unless_present = "plan_file")]
    api: Option<String>,
    /// Plan file to use instead of a built-in plan
    #[arg(long)]
    plan_file: Option<PathBuf>,
    /// API version label (defaults to the plan's version)
    #[arg(long)]
    api_version: Option<String>,
    /// Upstream revision pin: commit, tag or branch (defaults to the plan's revision)
    #[arg(long)]
    revision: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fetch, reshape and rewrite all fragments of an API into a local bundle
    Assemble {
        #[command(flatten)]
        plan: PlanArgs,
        /// Directory bundle paths are resolved against
        #[arg(long)]
        output_root: Option<PathBuf>,
        /// Environment variable holding the access token (default: GITHUB_PAT)
        #[arg(long)]
        token_env: Option<String>,
        /// Account owning the fragment repositories
        #[arg(long)]
        owner: Option<String>,
        /// Base URL of the contents API
        #[arg(long)]
        api_base: Option<Url>,
        /// Overwrite files in place instead of starting from an empty bundle directory
        #[arg(long)]
        keep_existing: bool,
        /// Check that every $ref resolves inside the bundle afterwards
        #[arg(long)]
        verify: bool,
    },
    /// List the built-in plans
    Plans,
    /// Print the resolved steps of a plan without fetching anything
    Show {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Check that every $ref of an assembled bundle resolves inside it
    Verify {
        #[command(flatten)]
        plan: PlanArgs,
        /// Directory bundle paths are resolved against
        #[arg(long)]
        output_root: Option<PathBuf>,
    },
    /// Apply literal rewrite rules to a file in place, in the given order
    Rewrite {
        /// File to rewrite
        #[arg(long)]
        file: PathBuf,
        /// Search literal (repeat, paired with --replace by position)
        #[arg(long = "search", required = true)]
        searches: Vec<String>,
        /// Replacement literal
        #[arg(long = "replace", required = true)]
        replacements: Vec<String>,
    },
    /// Nest a YAML file under one or more keys, innermost first
    Wrap {
        /// File to wrap
        #[arg(long)]
        file: PathBuf,
        /// Wrapper key (repeat to stack wrappers)
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Assemble {
            plan,
            output_root,
            token_env,
            owner,
            api_base,
            keep_existing,
            verify,
        } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            if let Some(output_root) = output_root {
                config.output_root = output_root.clone();
            }
            if let Some(token_env) = token_env {
                config.token_env = token_env.clone();
            }
            if let Some(owner) = owner {
                config.remote.owner = owner.clone();
            }
            if let Some(api_base) = api_base {
                config.remote.api_base = api_base.clone();
            }
            if *keep_existing {
                config.clean = false;
            }
            tracing::debug!("Using configuration: {:?}", config);

            let resolved = resolve_plan(plan).await?;
            println!(
                "Assembling {} {} (revision {}) into {}",
                resolved.api,
                resolved.version,
                resolved.revision,
                config.output_root.join(&resolved.bundle_dir).display()
            );

            let transport = ReqwestTransport::new().context("Failed to create HTTP client")?;
            let report = assemble_bundle(transport, &config, &resolved, |name| {
                std::env::var(name).ok()
            })
            .await
            .with_context(|| format!("Failed to assemble the {} bundle", resolved.api))?;

            for file in &report.files {
                println!("Wrote {}", file.path.display());
                for rule in &file.unmatched {
                    println!("  rule matched nothing: {:?}", rule.search);
                }
            }
            if report.unmatched_rules() > 0 {
                println!(
                    "{} rewrite rule(s) matched nothing; upstream fragments may have changed shape",
                    report.unmatched_rules()
                );
            }

            if *verify {
                check_references(&report.bundle_dir, &resolved).await?;
            }

            println!(
                "✅ Successfully assembled bundle in: {}",
                report.bundle_dir.display()
            );
        }
        Commands::Plans => {
            for name in BundlePlan::builtin_names() {
                let plan = BundlePlan::builtin(name)?;
                println!(
                    "{:<15} {} @ {} -> {}",
                    plan.api, plan.version, plan.revision, plan.output_dir
                );
            }
        }
        Commands::Show { plan } => {
            let resolved = resolve_plan(plan).await?;
            print_plan(&resolved);
        }
        Commands::Verify { plan, output_root } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            if let Some(output_root) = output_root {
                config.output_root = output_root.clone();
            }
            let resolved = resolve_plan(plan).await?;
            let bundle_dir = config.output_root.join(&resolved.bundle_dir);
            check_references(&bundle_dir, &resolved).await?;
            println!("✅ All references resolve in: {}", bundle_dir.display());
        }
        Commands::Rewrite {
            file,
            searches,
            replacements,
        } => {
            if searches.len() != replacements.len() {
                bail!(
                    "Got {} --search but {} --replace values; they are paired by position",
                    searches.len(),
                    replacements.len()
                );
            }
            let rules: Vec<RewriteRule> = searches
                .iter()
                .zip(replacements)
                .map(|(search, replace)| RewriteRule::new(search.as_str(), replace.as_str()))
                .collect();
            let outcome = rewrite::rewrite_file(file, &rules)
                .await
                .with_context(|| format!("Failed to rewrite {}", file.display()))?;
            for rule in &outcome.unmatched {
                println!("Rule matched nothing: {:?}", rule.search);
            }
            println!("Rewrote {}", file.display());
        }
        Commands::Wrap { file, keys } => {
            wrap::wrap_file(file, keys)
                .await
                .with_context(|| format!("Failed to wrap {}", file.display()))?;
            println!("Wrapped {} under {}", file.display(), keys.join(" > "));
        }
    }
    Ok(())
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

async fn resolve_plan(args: &PlanArgs) -> anyhow::Result<ResolvedPlan> {
    let plan = match (&args.plan_file, &args.api) {
        (Some(path), _) => BundlePlan::from_file(path).await?,
        (None, Some(api)) => BundlePlan::builtin(api)?,
        (None, None) => bail!("Either an API name or --plan-file is required"),
    };
    if let (Some(api), Some(_)) = (&args.api, &args.plan_file) {
        if *api != plan.api {
            bail!("Plan file describes '{}', not '{}'", plan.api, api);
        }
    }
    Ok(plan.resolve(args.api_version.as_deref(), args.revision.as_deref())?)
}

async fn check_references(bundle_dir: &Path, plan: &ResolvedPlan) -> anyhow::Result<()> {
    let unresolved = verify_bundle(bundle_dir, plan.destinations())
        .await
        .with_context(|| format!("Failed to verify {}", bundle_dir.display()))?;
    if unresolved.is_empty() {
        return Ok(());
    }
    for entry in &unresolved {
        println!("Unresolved: {entry}");
    }
    bail!("{} reference(s) do not resolve inside the bundle", unresolved.len())
}

fn print_plan(plan: &ResolvedPlan) {
    println!(
        "{} {} (revision {}) -> {}",
        plan.api,
        plan.version,
        plan.revision,
        plan.bundle_dir.display()
    );
    for (index, step) in plan.steps.iter().enumerate() {
        println!("{}. {}", index + 1, step.description);
        println!(
            "   {}/{}@{} -> {}",
            step.source.repository,
            step.source.path,
            step.source.revision,
            step.destination.display()
        );
        if !step.wrap.is_empty() {
            println!("   wrap: {}", step.wrap.join(" > "));
        }
        for rule in &step.rewrites {
            println!("   rewrite: {:?} -> {:?}", rule.search, rule.replace);
        }
    }
}
