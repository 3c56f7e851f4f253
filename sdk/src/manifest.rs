//! JSON build manifests.
//!
//! ```json
//! {
//!   "builds": [
//!     { "builder": "json", "enabled": true, "params": { "pretty": true },
//!       "modules": ["schema/accounts.schema", "schema/blog.schema"] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tessera_compiler::{ast::Module, compile_parsed, parse_module};
use tracing::{debug, info};

use crate::{
    builder::{builder_for, Params},
    error::{ManifestError, Result},
};

/// Default manifest file name, looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub builds: Vec<BuildDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDef {
    pub builder: String,
    #[serde(default)]
    pub params:  Params,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub modules: Vec<PathBuf>,
}

/// The text one build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub builder: String,
    pub output:  String,
}

impl FromStr for Manifest {
    type Err = serde_json::Error;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        serde_json::from_str(text)
    }
}

impl Manifest {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse::<Manifest>().map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn enabled_builds(&self) -> impl Iterator<Item = &BuildDef> {
        self.builds.iter().filter(|build| build.enabled)
    }

    /// Runs every enabled build in order. Module paths are taken relative to
    /// `base_dir`. Each build compiles its own `Schema`; parsed modules are
    /// shared through `cache`.
    pub fn run(&self, base_dir: &Path, cache: &mut ModuleCache) -> Result<Vec<BuildOutput>> {
        let mut outputs = Vec::new();
        for build in self.enabled_builds() {
            let builder = builder_for(&build.builder)
                .ok_or_else(|| ManifestError::UnknownBuilder(build.builder.clone()))?;
            info!(builder = %build.builder, modules = build.modules.len(), "running build");

            let modules = build
                .modules
                .iter()
                .map(|module| cache.load(&base_dir.join(module)))
                .collect::<Result<Vec<_>>>()?;
            let schema = compile_parsed(modules)?;
            outputs.push(BuildOutput {
                builder: build.builder.clone(),
                output:  builder.build(&schema, &build.params)?,
            });
        }
        Ok(outputs)
    }
}

/// Parsed modules keyed by path. Only the unresolved trees are cached; every
/// build resolves a fresh clone.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: HashMap<PathBuf, Module>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Module> {
        if let Some(module) = self.modules.get(path) {
            debug!(path = %path.display(), "module cache hit");
            return Ok(module.clone());
        }
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let module = parse_module(&text)?;
        self.modules.insert(path.to_path_buf(), module.clone());
        Ok(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Loads the manifest at `path` and runs its enabled builds.
pub fn run_manifest(path: impl AsRef<Path>) -> Result<Vec<BuildOutput>> {
    let path = path.as_ref();
    let manifest = Manifest::from_path(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.run(base_dir, &mut ModuleCache::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest: Manifest = r#"{
            "builds": [
                { "builder": "json", "enabled": true, "params": { "pretty": false, "b": 1, "a": 2 },
                  "modules": ["a.schema", "b.schema"] },
                { "builder": "json", "modules": ["c.schema"] }
            ]
        }"#
        .parse()
        .unwrap();
        assert_eq!(manifest.builds.len(), 2);
        assert_eq!(manifest.builds[0].params.keys().collect::<Vec<_>>(), vec!["pretty", "b", "a"]);
        assert!(!manifest.builds[1].enabled);
        assert_eq!(manifest.enabled_builds().count(), 1);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = r#"{ "builds": [ { "builder": "json", "target": "x" } ] }"#.parse::<Manifest>();
        assert!(result.is_err());
    }
}
