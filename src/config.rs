use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use toml_edit::{DocumentMut, value};

use crate::scaffold::{DEFAULT_BASE, DEFAULT_PAGE_FILE, ModuleDescriptor, ScaffoldPlan};
use crate::templates;

/// Manifest document, usually `routescaffold.toml` at the project root.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub base: Option<String>,
    pub page_file: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub path: String,
    pub title: Option<String>,
}

impl Manifest {
    /// Build a plan, resolving a relative base against `cwd`. `base_override`
    /// wins over the manifest's own `base`.
    pub fn into_plan(self, cwd: &Utf8Path, base_override: Option<&Utf8Path>) -> Result<ScaffoldPlan> {
        let base = match base_override {
            Some(base) => base.to_owned(),
            None => Utf8PathBuf::from(self.base.as_deref().unwrap_or(DEFAULT_BASE)),
        };
        let base = if base.is_absolute() { base } else { cwd.join(base) };

        let page_file = self.page_file.unwrap_or_else(|| DEFAULT_PAGE_FILE.to_owned());
        if page_file.is_empty() || page_file.contains('/') || page_file.contains('\\') {
            bail!("page_file `{}` must be a plain file name", page_file);
        }

        if self.modules.is_empty() {
            return Ok(ScaffoldPlan {
                page_file,
                ..ScaffoldPlan::builtin(base)
            });
        }

        let modules = self
            .modules
            .iter()
            .map(|entry| ModuleDescriptor::new(&entry.path, entry.title.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(ScaffoldPlan {
            base,
            page_file,
            modules,
        })
    }
}

/// Load a manifest from disk and deserialize it.
pub fn load_from_path(path: &Utf8Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading manifest {}", path))?;
    toml::from_str(&raw).with_context(|| format!("parsing manifest {}", path))
}

pub fn write_example_manifest(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    templates::write_template(path, templates::EXAMPLE_MANIFEST)
}

/// Set `base` in the manifest at `path`, keeping the rest of the document intact.
pub fn set_base(path: &Utf8Path, base: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }

    let mut doc: DocumentMut = if path.exists() {
        let raw = fs::read_to_string(path).with_context(|| format!("reading manifest {}", path))?;
        raw.parse()
            .with_context(|| format!("parsing manifest {}", path))?
    } else {
        DocumentMut::new()
    };

    doc["base"] = value(base);

    fs::write(path, doc.to_string()).with_context(|| format!("writing manifest {}", path))
}

pub fn format_summary(plan: &ScaffoldPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base path: {}", plan.base);
    let _ = writeln!(out, "Page file: {}", plan.page_file);
    let _ = writeln!(out, "Modules: {}", plan.modules.len());
    let _ = writeln!(out, "Pages: {}", plan.titled_count());
    out
}
