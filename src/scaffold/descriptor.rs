use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

pub const DEFAULT_BASE: &str = "src/app/(app)";
pub const DEFAULT_PAGE_FILE: &str = "page.tsx";

/// Compiled-in module list used when no manifest supplies one.
const BUILTIN: &[(&str, Option<&str>)] = &[
    ("invoices", Some("請款單")),
    ("cashflow", Some("出納單")),
    ("suppliers", Some("供應商")),
    ("simcards", Some("網卡管理")),
    ("employees", Some("員工管理")),
    ("quotations", Some("報價單")),
    ("itinerary", Some("行程設計")),
    ("tours", Some("旅遊團")),
    ("contracts", Some("合約")),
    ("confirmations", Some("確認單")),
    ("costs", Some("成本資料")),
    ("admin", None),
    ("admin/users", Some("用戶管理")),
    ("admin/permissions", Some("權限設定")),
    ("admin/settings", Some("系統設定")),
];

/// One scaffold unit: a route directory and, optionally, the title of its page.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ModuleDescriptor {
    segments: Vec<String>,
    title: Option<String>,
}

impl ModuleDescriptor {
    /// Parse a `/`-separated relative path such as `admin/users`.
    pub fn new(path: &str, title: Option<&str>) -> Result<Self> {
        if path.is_empty() {
            bail!("module path must not be empty");
        }

        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" => bail!("module path `{path}` has an empty segment"),
                "." | ".." => bail!("module path `{path}` must not contain `{segment}`"),
                s if s.contains('\\') => bail!("module path `{path}` must use `/` separators"),
                s => segments.push(s.to_owned()),
            }
        }

        Ok(Self {
            segments,
            title: title.filter(|t| !t.is_empty()).map(str::to_owned),
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The path in its `/`-joined form.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Directory for this module under `base`.
    pub fn dir_under(&self, base: &Utf8Path) -> Utf8PathBuf {
        let mut dir = base.to_owned();
        for segment in &self.segments {
            dir.push(segment);
        }
        dir
    }
}

pub fn builtin() -> Vec<ModuleDescriptor> {
    BUILTIN
        .iter()
        .map(|(path, title)| ModuleDescriptor {
            segments: path.split('/').map(str::to_owned).collect(),
            title: title.map(str::to_owned),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_nested_path() {
        let d = ModuleDescriptor::new("admin/users", Some("用戶管理")).unwrap();
        assert_eq!(d.segments, ["admin", "users"]);
        assert_eq!(d.title(), Some("用戶管理"));
        assert_eq!(d.path(), "admin/users");
    }

    #[test]
    fn empty_title_means_untitled() {
        let d = ModuleDescriptor::new("admin", Some("")).unwrap();
        assert_eq!(d.title(), None);
    }

    #[test]
    fn rejects_bad_paths() {
        for bad in ["", "/abs", "trailing/", "a//b", "../up", "a/./b", "a\\b"] {
            assert!(ModuleDescriptor::new(bad, None).is_err(), "accepted `{bad}`");
        }
    }

    #[test]
    fn dir_under_joins_segments() {
        let d = ModuleDescriptor::new("admin/settings", None).unwrap();
        let dir = d.dir_under(Utf8Path::new("/tmp/app"));
        assert_eq!(dir, Utf8PathBuf::from("/tmp/app/admin/settings"));
    }

    #[test]
    fn builtin_entries_are_valid_and_admin_is_untitled() {
        let list = builtin();
        assert_eq!(list.len(), BUILTIN.len());
        for d in &list {
            let reparsed = ModuleDescriptor::new(&d.path(), d.title()).unwrap();
            assert_eq!(&reparsed, d);
        }
        let untitled: Vec<_> = list.iter().filter(|d| d.title().is_none()).collect();
        assert_eq!(untitled.len(), 1);
        assert_eq!(untitled[0].path(), "admin");
    }

    #[test]
    fn builtin_parent_precedes_children() {
        let paths: Vec<_> = builtin().iter().map(ModuleDescriptor::path).collect();
        let admin = paths.iter().position(|p| p == "admin").unwrap();
        let users = paths.iter().position(|p| p == "admin/users").unwrap();
        assert!(admin < users);
    }
}
