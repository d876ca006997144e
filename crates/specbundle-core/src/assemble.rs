//! Bundle assembly.
//!
//! The [`Assembler`] walks a [`ResolvedPlan`] one step at a time. Each step
//! creates the destination directory, fetches the fragment, wraps it,
//! applies its rewrite rules in declared order and writes the result. The
//! first error aborts the run; files written by earlier steps stay on disk
//! and the failing step's file is never written.

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::credential::Credential;
use crate::fetch::{Fetcher, GitHubFetcher, Transport};
use crate::plan::{ResolvedPlan, ResolvedStep};
use crate::rewrite::{apply_rules, RewriteOutcome, RewriteRule};
use crate::wrap::wrap_text;

// External imports (alphabetized)
use tokio::fs;

/// A file produced by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Rules that matched nothing in this fragment
    pub unmatched: Vec<RewriteRule>,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub api: String,
    pub version: String,
    pub bundle_dir: PathBuf,
    pub files: Vec<WrittenFile>,
}

impl AssemblyReport {
    /// Total number of rules that matched nothing.
    pub fn unmatched_rules(&self) -> usize {
        self.files.iter().map(|f| f.unmatched.len()).sum()
    }
}

/// Runs plans against a [`Fetcher`].
#[derive(Debug)]
pub struct Assembler<F> {
    fetcher: F,
    output_root: PathBuf,
    clean: bool,
}

impl<F: Fetcher> Assembler<F> {
    pub fn new(fetcher: F, output_root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_root: output_root.into(),
            clean: true,
        }
    }

    /// Whether to remove an existing bundle directory before the first step.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Absolute location of the plan's bundle.
    pub fn bundle_dir(&self, plan: &ResolvedPlan) -> PathBuf {
        self.output_root.join(&plan.bundle_dir)
    }

    /// Execute every step of `plan` in order.
    pub async fn run(&self, plan: &ResolvedPlan) -> crate::Result<AssemblyReport> {
        plan.check_paths()?;
        let bundle_dir = self.bundle_dir(plan);
        if self.clean && fs::try_exists(&bundle_dir).await? {
            log::info!("Removing previous bundle at {}", bundle_dir.display());
            fs::remove_dir_all(&bundle_dir).await?;
        }
        fs::create_dir_all(&bundle_dir).await?;

        let mut files = Vec::with_capacity(plan.steps.len());
        for (index, step) in plan.steps.iter().enumerate() {
            log::info!(
                "[{}/{}] {} ({}/{}@{})",
                index + 1,
                plan.steps.len(),
                step.description,
                step.source.repository,
                step.source.path,
                step.source.revision
            );
            files.push(self.run_step(&bundle_dir, step).await?);
        }

        Ok(AssemblyReport {
            api: plan.api.clone(),
            version: plan.version.clone(),
            bundle_dir,
            files,
        })
    }

    async fn run_step(&self, bundle_dir: &Path, step: &ResolvedStep) -> crate::Result<WrittenFile> {
        let path = bundle_dir.join(&step.destination);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let text = self.fetcher.fetch(&step.source).await?;
        let outcome = transform_fragment(step, &text)?;
        for rule in &outcome.unmatched {
            log::debug!(
                "{}: rule {:?} -> {:?} matched nothing",
                step.destination.display(),
                rule.search,
                rule.replace
            );
        }

        fs::write(&path, &outcome.text).await?;
        Ok(WrittenFile {
            path,
            unmatched: outcome.unmatched,
        })
    }
}

/// Wrap then rewrite fetched fragment text, without touching the disk.
pub fn transform_fragment(step: &ResolvedStep, text: &str) -> crate::Result<RewriteOutcome> {
    let name = step.destination.display().to_string();
    let wrapped = wrap_text(&name, text, &step.wrap)?;
    Ok(apply_rules(&wrapped, &step.rewrites))
}

/// Assemble `plan` against the GitHub contents API reached through `transport`.
///
/// The credential is looked up through `lookup` under `config.token_env`
/// before anything else happens, so a missing token never reaches the
/// transport.
pub async fn assemble_bundle<T, L>(
    transport: T,
    config: &Config,
    plan: &ResolvedPlan,
    lookup: L,
) -> crate::Result<AssemblyReport>
where
    T: Transport,
    L: FnOnce(&str) -> Option<String>,
{
    let credential = Credential::from_lookup(&config.token_env, lookup)?;
    let fetcher = GitHubFetcher::new(transport, credential, config.remote.clone());
    Assembler::new(fetcher, &config.output_root)
        .clean(config.clean)
        .run(plan)
        .await
}
