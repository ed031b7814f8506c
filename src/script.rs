use std::fmt::Write as _;

use anyhow::{Result, bail};

use crate::scaffold::ScaffoldPlan;
use crate::templates::{self, PageParams};

const HEREDOC_END: &str = "EOF";

/// Render `plan` as a POSIX shell script that performs the same scaffold.
pub fn render(plan: &ScaffoldPlan) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "#!/bin/sh");
    let _ = writeln!(out, "set -e");

    for module in &plan.modules {
        let dir = module.dir_under(&plan.base);
        let _ = writeln!(out);
        let _ = writeln!(out, "mkdir -p {}", shell_quote(dir.as_str()));

        let Some(title) = module.title() else {
            continue;
        };
        let page = dir.join(&plan.page_file);
        let contents = templates::render_page(&PageParams { title })?;
        if contents.lines().any(|line| line == HEREDOC_END) {
            bail!("page for `{}` contains the heredoc terminator `{HEREDOC_END}`", module.path());
        }

        let _ = writeln!(out, "cat > {} << '{HEREDOC_END}'", shell_quote(page.as_str()));
        out.push_str(&contents);
        if !contents.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "{HEREDOC_END}");
    }

    Ok(out)
}

/// Single-quote `raw` for `sh`, closing and reopening around embedded quotes.
fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}
