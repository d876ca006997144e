//! Bundle plan file format.
//!
//! A plan declares, for one API, the ordered list of fragments that make up
//! its local bundle and how each fragment is reshaped. The order of `steps`
//! is the order of execution. Later fragments may rely on paths that only
//! exist once earlier ones are written.
//!
//! `{version}` and `{revision}` placeholders are expanded in `path`,
//! `revision` and `destination`. Rewrite rules are literal and never
//! expanded.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::fetch::FragmentSource;
use crate::rewrite::RewriteRule;
use crate::Error;

/// Plans shipped with the library, by API name.
const BUILTIN_PLANS: &[(&str, &str)] = &[
    ("orchestration", include_str!("../plans/orchestration.yaml")),
    ("test", include_str!("../plans/test.yaml")),
    ("workspace", include_str!("../plans/workspace.yaml")),
];

/// The root plan structure for one API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlePlan {
    /// API name, used for lookup and progress output
    pub api: String,

    /// Directory, relative to the output root, holding one bundle per version
    pub output_dir: String,

    /// Default API version label
    pub version: String,

    /// Default revision pin for steps that do not declare their own
    pub revision: String,

    /// Steps in execution order
    pub steps: Vec<PlanStep>,
}

/// Describes a single fragment of the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Human readable label for progress output
    #[serde(default)]
    pub description: String,

    /// Repository holding the fragment
    pub repository: String,

    /// Path of the fragment inside the repository
    pub path: String,

    /// Revision override for this fragment
    #[serde(default)]
    pub revision: Option<String>,

    /// Destination path, relative to the bundle directory
    pub destination: String,

    /// Wrapper keys, innermost first
    #[serde(default)]
    pub wrap: Vec<String>,

    /// Rewrite rules in application order
    #[serde(default)]
    pub rewrites: Vec<RewriteRule>,
}

/// A plan with version and revision fixed and placeholders expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub api: String,
    pub version: String,
    pub revision: String,
    /// Bundle directory, relative to the output root
    pub bundle_dir: PathBuf,
    pub steps: Vec<ResolvedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStep {
    pub description: String,
    pub source: FragmentSource,
    pub wrap: Vec<String>,
    pub rewrites: Vec<RewriteRule>,
    /// Destination, relative to the bundle directory
    pub destination: PathBuf,
}

impl BundlePlan {
    /// Names of the built-in plans.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN_PLANS.iter().map(|(name, _)| *name)
    }

    /// Load one of the built-in plans.
    pub fn builtin(name: &str) -> crate::Result<Self> {
        let (_, content) = BUILTIN_PLANS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .ok_or_else(|| {
                let known: Vec<_> = Self::builtin_names().collect();
                Error::plan(format!(
                    "Unknown API '{name}'. Known APIs: {}",
                    known.join(", ")
                ))
            })?;
        Self::from_yaml(name, content)
    }

    /// Parse and validate a plan from YAML text.
    pub fn from_yaml(origin: &str, content: &str) -> crate::Result<Self> {
        let plan: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::plan(format!("Invalid YAML in plan {origin}: {e}")))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan file from disk.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::plan(format!("Failed to read plan at {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&path.display().to_string(), &content)
    }

    /// Reject plans that could not produce a well-formed bundle.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.trim().is_empty() {
            return Err(Error::plan("Plan has no API name"));
        }
        if self.steps.is_empty() {
            return Err(Error::plan(format!("Plan '{}' has no steps", self.api)));
        }
        check_relative(&self.api, "output_dir", &self.output_dir)?;
        check_version(&self.api, &self.version)?;

        let mut destinations = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let label = format!("{} step {}", self.api, index + 1);
            if step.repository.trim().is_empty() || step.path.trim().is_empty() {
                return Err(Error::plan(format!("{label}: repository and path are required")));
            }
            check_relative(&label, "destination", &step.destination)?;
            if !destinations.insert(step.destination.as_str()) {
                return Err(Error::plan(format!(
                    "{label}: destination {} is written twice",
                    step.destination
                )));
            }
            if let Some(key) = step.wrap.iter().find(|k| k.trim().is_empty()) {
                return Err(Error::plan(format!("{label}: invalid wrap key {key:?}")));
            }
            if step.rewrites.iter().any(|r| r.search.is_empty()) {
                return Err(Error::plan(format!("{label}: rewrite rule with empty search")));
            }
        }
        Ok(())
    }

    /// Fix version and revision, falling back to the plan defaults.
    ///
    /// Fails when the version label or an expanded destination would place
    /// files outside the plan's bundle directory.
    pub fn resolve(
        &self,
        version: Option<&str>,
        revision: Option<&str>,
    ) -> crate::Result<ResolvedPlan> {
        let version = version.unwrap_or(&self.version).to_string();
        let revision = revision.unwrap_or(&self.revision).to_string();
        check_version(&self.api, &version)?;
        let expand = |s: &str| {
            s.replace("{version}", &version)
                .replace("{revision}", &revision)
        };

        let steps = self
            .steps
            .iter()
            .map(|step| ResolvedStep {
                description: if step.description.is_empty() {
                    step.destination.clone()
                } else {
                    step.description.clone()
                },
                source: FragmentSource::new(
                    step.repository.clone(),
                    expand(&step.path),
                    expand(step.revision.as_deref().unwrap_or("{revision}")),
                ),
                wrap: step.wrap.clone(),
                rewrites: step.rewrites.clone(),
                destination: PathBuf::from(expand(&step.destination)),
            })
            .collect();

        let resolved = ResolvedPlan {
            api: self.api.clone(),
            bundle_dir: Path::new(&self.output_dir).join(&version),
            version,
            revision,
            steps,
        };
        resolved.check_paths()?;
        Ok(resolved)
    }
}

impl ResolvedPlan {
    /// Destinations in step order, relative to the bundle directory.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.steps.iter().map(|s| s.destination.as_path())
    }

    /// Ensure the bundle directory and every destination stay relative and
    /// never climb out of their parent.
    pub fn check_paths(&self) -> crate::Result<()> {
        check_relative(
            &self.api,
            "bundle directory",
            &self.bundle_dir.to_string_lossy(),
        )?;
        for (index, step) in self.steps.iter().enumerate() {
            check_relative(
                &format!("{} step {}", self.api, index + 1),
                "destination",
                &step.destination.to_string_lossy(),
            )?;
        }
        Ok(())
    }
}

/// A version label names exactly one directory below `output_dir`.
fn check_version(api: &str, version: &str) -> crate::Result<()> {
    let mut components = Path::new(version).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == version => Ok(()),
        _ => Err(Error::plan(format!(
            "{api}: version must be a single directory name, got {version:?}"
        ))),
    }
}

fn check_relative(label: &str, field: &str, value: &str) -> crate::Result<()> {
    let path = Path::new(value);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if value.trim().is_empty() || escapes {
        return Err(Error::plan(format!(
            "{label}: {field} must be a relative path inside the bundle, got {value:?}"
        )));
    }
    Ok(())
}
