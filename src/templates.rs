use std::fs;
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8Path;
use regex::{Captures, Regex};
use rust_embed::RustEmbed;

pub const PAGE_TEMPLATE: &str = "page.tsx";
pub const EXAMPLE_MANIFEST: &str = "scaffold.example.toml";

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

/// Named values a template can reference as `{{name}}`.
pub trait TemplateParams {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Parameters for the placeholder page written into each titled module.
#[derive(Debug, Clone, Copy)]
pub struct PageParams<'a> {
    pub title: &'a str,
}

impl TemplateParams for PageParams<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "title" => Some(escape_jsx_attr(self.title)),
            _ => None,
        }
    }
}

pub fn get_bytes(path: &str) -> Result<Vec<u8>> {
    let file = Templates::get(path).ok_or_else(|| anyhow!("embedded template `{}` missing", path))?;
    Ok(file.data.as_ref().to_vec())
}

pub fn get_string(path: &str) -> Result<String> {
    let bytes = get_bytes(path)?;
    std::str::from_utf8(&bytes)
        .with_context(|| format!("decoding embedded template `{}`", path))
        .map(|value| value.to_owned())
}

pub fn write_template(destination: &Utf8Path, template: &str) -> Result<()> {
    let bytes = get_bytes(template)?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }
    fs::write(destination, bytes).with_context(|| format!("writing {}", destination))
}

/// Substitute every `{{name}}` in `template` with the matching parameter.
pub fn render(template: &str, params: &impl TemplateParams) -> Result<String> {
    let mut missing = Vec::new();
    let rendered = placeholder().replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        params.lookup(name).unwrap_or_else(|| {
            missing.push(name.to_owned());
            String::new()
        })
    });

    if !missing.is_empty() {
        bail!("template references unknown parameter(s): {}", missing.join(", "));
    }
    Ok(rendered.into_owned())
}

/// Render the embedded page template for one title.
pub fn render_page(params: &PageParams<'_>) -> Result<String> {
    let template = get_string(PAGE_TEMPLATE)?;
    render(&template, params).with_context(|| format!("rendering template `{}`", PAGE_TEMPLATE))
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex"))
}

/// The title sits inside a double-quoted JSX attribute.
fn escape_jsx_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}
