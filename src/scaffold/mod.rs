pub mod descriptor;

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;

pub use descriptor::{DEFAULT_BASE, DEFAULT_PAGE_FILE, ModuleDescriptor};

use crate::templates::{self, PageParams};
use crate::util;

/// Everything a scaffold run needs: where to write and what to write.
#[derive(Clone, Debug)]
pub struct ScaffoldPlan {
    pub base: Utf8PathBuf,
    pub page_file: String,
    pub modules: Vec<ModuleDescriptor>,
}

impl ScaffoldPlan {
    pub fn builtin(base: Utf8PathBuf) -> Self {
        Self {
            base,
            page_file: DEFAULT_PAGE_FILE.to_owned(),
            modules: descriptor::builtin(),
        }
    }

    pub fn titled_count(&self) -> usize {
        self.modules.iter().filter(|m| m.title().is_some()).count()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScaffoldReport {
    pub directories: usize,
    pub created_directories: usize,
    pub pages: usize,
}

/// Create every module directory in `plan` and write pages for titled modules.
///
/// Progress lines go to `out`; the first filesystem error aborts the run and
/// leaves whatever was already written in place.
pub fn build(plan: &ScaffoldPlan, dry_run: bool, out: &mut impl Write) -> Result<ScaffoldReport> {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let mut report = ScaffoldReport::default();

    for module in &plan.modules {
        let dir = module.dir_under(&plan.base);

        if !dry_run {
            let created = util::fs::ensure_dir(dir.as_std_path())
                .with_context(|| format!("creating directory {}", dir))?;
            tracing::debug!(path = %dir, created, "ensured module directory");
            if created {
                report.created_directories += 1;
            }
        }
        report.directories += 1;
        writeln!(out, "{prefix}built directory: {}", dir)?;

        let Some(title) = module.title() else {
            continue;
        };

        let page = dir.join(&plan.page_file);
        let contents = templates::render_page(&PageParams { title })?;
        if !dry_run {
            fs::write(&page, &contents).with_context(|| format!("writing {}", page))?;
            tracing::debug!(path = %page, bytes = contents.len(), "wrote page");
        }
        report.pages += 1;
        writeln!(out, "{prefix}built page: {} - {}", page, title)?;
    }

    writeln!(
        out,
        "{prefix}all modules built: {} directories, {} pages",
        report.directories, report.pages
    )?;
    tracing::info!(
        base = %plan.base,
        directories = report.directories,
        created = report.created_directories,
        pages = report.pages,
        dry_run,
        "scaffold finished"
    );
    Ok(report)
}
