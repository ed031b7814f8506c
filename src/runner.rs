use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};

use crate::cli::{Cli, Command, ConfigCommand, ListArgs, ScriptArgs};
use crate::config::{self, Manifest};
use crate::scaffold::{self, ScaffoldPlan};
use crate::script;

pub const MANIFEST_FILENAME: &str = "routescaffold.toml";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ManifestSource {
    Explicit,
    Discovered,
    HomeDefault,
    Builtin,
}

impl ManifestSource {
    fn as_str(&self) -> &'static str {
        match self {
            ManifestSource::Explicit => "explicit",
            ManifestSource::Discovered => "discovered",
            ManifestSource::HomeDefault => "home-default",
            ManifestSource::Builtin => "built-in",
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedManifest {
    /// `None` when no manifest exists and the built-in list applies.
    path: Option<Utf8PathBuf>,
    source: ManifestSource,
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = CliContext::from(&cli);
    ctx.apply_chdir()?;

    match cli.command {
        Some(Command::Config { command }) => handle_config(&ctx, command),
        Some(Command::List(args)) => handle_list(&ctx, args),
        Some(Command::Script(args)) => handle_script(&ctx, args),
        Some(Command::Build) | None => handle_build(&ctx),
    }
}

fn handle_build(ctx: &CliContext) -> Result<()> {
    let (plan, resolved) = ctx.load_plan()?;
    tracing::info!(
        source = resolved.source.as_str(),
        base = %plan.base,
        modules = plan.modules.len(),
        "building modules"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    scaffold::build(&plan, ctx.dry_run, &mut out)?;
    out.flush().context("flushing stdout")
}

fn handle_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let (plan, _) = ctx.load_plan()?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&plan.modules).context("serializing module list")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Modules under {}:", plan.base);
    for module in &plan.modules {
        match module.title() {
            Some(title) => println!("  - {} ({})", module.path(), title),
            None => println!("  - {} (directory only)", module.path()),
        }
    }
    Ok(())
}

fn handle_script(ctx: &CliContext, args: ScriptArgs) -> Result<()> {
    let (plan, _) = ctx.load_plan()?;
    let rendered = script::render(&plan)?;

    let Some(output) = args.output else {
        print!("{}", rendered);
        return Ok(());
    };

    let output = utf8(output, "script output path")?;
    if ctx.dry_run {
        println!("[dry-run] would write script to {}", output);
        return Ok(());
    }
    fs::write(&output, rendered).with_context(|| format!("writing {}", output))?;
    println!("Wrote scaffold script to {}", output);
    Ok(())
}

fn handle_config(ctx: &CliContext, command: Option<ConfigCommand>) -> Result<()> {
    let resolved = ctx.resolve_manifest()?;
    match command {
        Some(ConfigCommand::Path) => {
            match &resolved.path {
                Some(path) => println!("Manifest path: {} ({})", path, resolved.source.as_str()),
                None => {
                    println!("No manifest found; using the built-in module list.");
                    println!("Use `routescaffold config generate` to create {}.", MANIFEST_FILENAME);
                }
            }
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            let (plan, resolved) = ctx.load_plan()?;
            let origin = resolved
                .path
                .as_ref()
                .map_or_else(|| "<none>".to_owned(), |p| p.to_string());
            println!("Manifest: {} ({})", origin, resolved.source.as_str());
            println!("{}", config::format_summary(&plan));
            Ok(())
        }
        Some(ConfigCommand::Generate { path, force }) => {
            let target = match path {
                Some(path) => utf8(path, "manifest path")?,
                None => ctx.manifest_target(&resolved)?,
            };
            if ctx.dry_run {
                println!("[dry-run] would write example manifest to {}", target);
                return Ok(());
            }
            config::write_example_manifest(&target, force)?;
            if force {
                println!("Overwrote manifest at {}", target);
            } else {
                println!("Wrote example manifest to {}", target);
            }
            Ok(())
        }
        Some(ConfigCommand::SetBase { path }) => {
            let target = ctx.manifest_target(&resolved)?;
            if ctx.dry_run {
                println!("[dry-run] would set base = {:?} in {}", path, target);
                return Ok(());
            }
            config::set_base(&target, &path)?;
            println!("Set base = {:?} in {}", path, target);
            Ok(())
        }
    }
}

fn utf8(path: PathBuf, what: &str) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|_| anyhow!("{what} must be valid UTF-8"))
}

fn current_working_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("determining current directory")?;
    utf8(cwd, "current directory")
}

/// Walk up from `start` looking for a manifest, then fall back to `home`.
fn discover_manifest(start: &Utf8Path, home: Option<Utf8PathBuf>) -> ResolvedManifest {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(MANIFEST_FILENAME);
        if candidate.is_file() {
            return ResolvedManifest {
                path: Some(candidate),
                source: ManifestSource::Discovered,
            };
        }
        current = dir.parent();
    }

    match home.filter(|path| path.is_file()) {
        Some(path) => ResolvedManifest {
            path: Some(path),
            source: ManifestSource::HomeDefault,
        },
        None => ResolvedManifest {
            path: None,
            source: ManifestSource::Builtin,
        },
    }
}

fn home_manifest() -> Option<Utf8PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("routescaffold");
    path.push("config.toml");
    Utf8PathBuf::from_path_buf(path).ok()
}

struct CliContext {
    chdir: Option<PathBuf>,
    file: Option<PathBuf>,
    base: Option<PathBuf>,
    dry_run: bool,
}

impl CliContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn resolve_manifest(&self) -> Result<ResolvedManifest> {
        if let Some(path) = &self.file {
            let path = utf8(path.clone(), "manifest path")?;
            return Ok(ResolvedManifest {
                path: Some(path),
                source: ManifestSource::Explicit,
            });
        }

        let cwd = current_working_dir()?;
        Ok(discover_manifest(&cwd, home_manifest()))
    }

    /// Where manifest-writing commands should write.
    fn manifest_target(&self, resolved: &ResolvedManifest) -> Result<Utf8PathBuf> {
        match &resolved.path {
            Some(path) => Ok(path.clone()),
            None => Ok(current_working_dir()?.join(MANIFEST_FILENAME)),
        }
    }

    fn load_plan(&self) -> Result<(ScaffoldPlan, ResolvedManifest)> {
        let resolved = self.resolve_manifest()?;
        let manifest = match &resolved.path {
            Some(path) => {
                if resolved.source == ManifestSource::Explicit && !path.exists() {
                    bail!("manifest {} does not exist", path);
                }
                tracing::debug!(path = %path, source = resolved.source.as_str(), "loading manifest");
                config::load_from_path(path)?
            }
            None => Manifest::default(),
        };

        let cwd = current_working_dir()?;
        let base = match &self.base {
            Some(base) => Some(utf8(base.clone(), "base path")?),
            None => None,
        };
        let plan = manifest.into_plan(&cwd, base.as_deref())?;
        Ok((plan, resolved))
    }
}

impl From<&Cli> for CliContext {
    fn from(cli: &Cli) -> Self {
        Self {
            chdir: cli.chdir.clone(),
            file: cli.file.clone(),
            base: cli.base.clone(),
            dry_run: cli.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static SEQ: AtomicUsize = AtomicUsize::new(0);

    fn unique_temp_dir() -> Utf8PathBuf {
        let mut dir = std::env::temp_dir();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        dir.push(format!("routescaffold-runner-{ts}-{seq}"));
        Utf8PathBuf::from_path_buf(dir).unwrap()
    }

    #[test]
    fn discover_prefers_nearest_manifest() {
        let root = unique_temp_dir();
        let nested = root.join("a").join("b");
        fs::create_dir_all(nested.as_std_path()).unwrap();
        fs::write(root.join(MANIFEST_FILENAME), "base = 'outer'\n").unwrap();
        fs::write(root.join("a").join(MANIFEST_FILENAME), "base = 'inner'\n").unwrap();

        let resolved = discover_manifest(&nested, None);
        assert_eq!(resolved.source, ManifestSource::Discovered);
        assert_eq!(resolved.path, Some(root.join("a").join(MANIFEST_FILENAME)));

        let _ = fs::remove_dir_all(root.as_std_path());
    }

    #[test]
    fn discover_falls_back_to_home_then_builtin() {
        let root = unique_temp_dir();
        let project = root.join("project");
        fs::create_dir_all(project.as_std_path()).unwrap();
        let home = root.join("home-config.toml");

        let resolved = discover_manifest(&project, Some(home.clone()));
        assert_eq!(resolved.source, ManifestSource::Builtin);
        assert!(resolved.path.is_none());

        fs::write(&home, "page_file = 'index.tsx'\n").unwrap();
        let resolved = discover_manifest(&project, Some(home.clone()));
        assert_eq!(resolved.source, ManifestSource::HomeDefault);
        assert_eq!(resolved.path, Some(home));

        let _ = fs::remove_dir_all(root.as_std_path());
    }

    #[test]
    fn explicit_manifest_must_exist() {
        let root = unique_temp_dir();
        let ctx = CliContext {
            chdir: None,
            file: Some(root.join("missing.toml").into_std_path_buf()),
            base: None,
            dry_run: false,
        };
        let err = ctx.load_plan().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn explicit_manifest_and_base_drive_plan() {
        let root = unique_temp_dir();
        fs::create_dir_all(root.as_std_path()).unwrap();
        let manifest = root.join("custom.toml");
        fs::write(
            &manifest,
            "[[modules]]\npath = \"quotations\"\ntitle = \"報價單\"\n",
        )
        .unwrap();

        let ctx = CliContext {
            chdir: None,
            file: Some(manifest.clone().into_std_path_buf()),
            base: Some(root.join("out").into_std_path_buf()),
            dry_run: false,
        };
        let (plan, resolved) = ctx.load_plan().unwrap();
        assert_eq!(resolved.source, ManifestSource::Explicit);
        assert_eq!(plan.base, root.join("out"));
        assert_eq!(plan.modules.len(), 1);

        let mut out = Vec::new();
        scaffold::build(&plan, ctx.dry_run, &mut out).unwrap();
        assert!(root.join("out/quotations/page.tsx").is_file());

        let _ = fs::remove_dir_all(root.as_std_path());
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["routescaffold"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_set_base_writes_resolved_manifest() {
        let root = unique_temp_dir();
        fs::create_dir_all(root.as_std_path()).unwrap();
        let manifest = root.join(MANIFEST_FILENAME);
        fs::write(&manifest, "[[modules]]\npath = \"tours\"\ntitle = \"旅遊團\"\n").unwrap();

        run(parse(&[
            "--base",
            "/ignored",
            "-f",
            manifest.as_str(),
            "config",
            "set-base",
            "apps/web",
        ]))
        .unwrap();

        let loaded = config::load_from_path(&manifest).unwrap();
        assert_eq!(loaded.base.as_deref(), Some("apps/web"));
        assert_eq!(loaded.modules.len(), 1);

        let _ = fs::remove_dir_all(root.as_std_path());
    }

    #[test]
    fn config_generate_writes_example_to_given_path() {
        let root = unique_temp_dir();
        let target = root.join("generated.toml");

        run(parse(&["config", "generate", target.as_str()])).unwrap();
        assert!(config::load_from_path(&target).is_ok());
        assert!(run(parse(&["config", "generate", target.as_str()])).is_err());
        run(parse(&["config", "generate", target.as_str(), "--force"])).unwrap();

        let _ = fs::remove_dir_all(root.as_std_path());
    }

    #[test]
    fn script_and_list_commands_use_manifest() {
        let root = unique_temp_dir();
        fs::create_dir_all(root.as_std_path()).unwrap();
        let manifest = root.join("custom.toml");
        fs::write(&manifest, "[[modules]]\npath = \"admin\"\n").unwrap();
        let script = root.join("scaffold.sh");
        let base = root.join("app");

        run(parse(&[
            "-f",
            manifest.as_str(),
            "--base",
            base.as_str(),
            "script",
            "-o",
            script.as_str(),
        ]))
        .unwrap();
        let rendered = fs::read_to_string(&script).unwrap();
        assert!(rendered.contains(&format!("mkdir -p '{}'", base.join("admin"))));

        run(parse(&["-f", manifest.as_str(), "--base", base.as_str(), "list", "--json"])).unwrap();
        run(parse(&["-f", manifest.as_str(), "--base", base.as_str(), "-n", "build"])).unwrap();
        assert!(!base.exists());

        run(parse(&["-f", manifest.as_str(), "--base", base.as_str()])).unwrap();
        assert!(base.join("admin").is_dir());

        let _ = fs::remove_dir_all(root.as_std_path());
    }
}
