//! specbundle Core Library
//!
//! This library assembles self-contained OpenAPI bundles from fragments hosted
//! in remote repositories: it fetches each fragment at a pinned revision,
//! nests bare definition files under the section a code generator expects,
//! and rewrites cross-file `$ref` pointers to the local layout.

pub mod assemble;
pub mod config;
pub mod credential;
pub mod error;
pub mod fetch;
pub mod plan;
pub mod rewrite;
pub mod verify;
pub mod wrap;

pub use crate::{
    assemble::{assemble_bundle, Assembler, AssemblyReport},
    config::Config,
    credential::Credential,
    error::{Error, Result},
    fetch::{FragmentSource, GitHubFetcher, ReqwestTransport},
    plan::{BundlePlan, ResolvedPlan},
    rewrite::RewriteRule,
    verify::verify_bundle,
};
