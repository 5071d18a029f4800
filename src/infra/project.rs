//! Disk-backed project mapping.
//!
//! Loads a directory into a `FileMap` (gitignore-aware, UTF-8 text only) and
//! writes back just the entries that changed whenever the mapping is
//! replaced. Keys are root-relative paths with `/` separators.

use std::{
    fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::{
    core::{engine::ProjectFiles, model::FileMap},
    infra::config::ProjectConfig,
};

pub struct DiskProject
{
    root: PathBuf,
    files: FileMap,

    /// Record changes in memory only
    dry_run: bool,

    /// Keys written (or removed) since load, in order
    touched: Vec<String>,
}

impl DiskProject
{
    /// Walk `root` and load every readable text file.
    pub fn load(
        root: &Path,
        cfg: &ProjectConfig,
    ) -> Result<Self>
    {
        let ignores = build_globset(&cfg.ignore_patterns)?;
        let mut files = FileMap::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker
        {
            let entry = match entry
            {
                Ok(e) => e,
                Err(e) =>
                {
                    warn!("walk error: {e}");
                    continue;
                }
            };

            if !entry
                .file_type()
                .is_some_and(|t| t.is_file())
            {
                continue;
            }

            let rel = match entry
                .path()
                .strip_prefix(root)
            {
                Ok(r) => r,
                Err(_) => continue,
            };
            if ignores.is_match(rel)
            {
                continue;
            }

            let len = entry
                .metadata()
                .map(|m| m.len())
                .unwrap_or(0);
            if len > cfg.max_file_bytes
            {
                debug!(path = %rel.display(), len, "skipping large file");
                continue;
            }

            // Binary or non-UTF-8 files are not part of the mapping.
            let Ok(content) = fs::read_to_string(entry.path())
            else
            {
                continue;
            };

            files.insert(to_key(rel), content);
        }

        info!(root = %root.display(), files = files.len(), "loaded project");

        Ok(Self { root: root.to_path_buf(), files, dry_run: false, touched: Vec::new() })
    }

    pub fn with_dry_run(
        mut self,
        enabled: bool,
    ) -> Self
    {
        self.dry_run = enabled;
        self
    }

    pub fn root(&self) -> &Path
    {
        &self.root
    }

    /// Keys changed on disk (or that would be, in dry-run) since load.
    pub fn touched(&self) -> &[String]
    {
        &self.touched
    }

    fn write_entry(
        &self,
        key: &str,
        content: &str,
    ) -> Result<()>
    {
        let rel = validate_rel(Path::new(key))?;
        let path = self
            .root
            .join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent: {}", parent.display()))?;
        }
        write_atomic(&path, content.as_bytes())
    }
}

impl ProjectFiles for DiskProject
{
    fn files(&self) -> &FileMap
    {
        &self.files
    }

    fn set_files(
        &mut self,
        files: FileMap,
    ) -> Result<()>
    {
        let changed: Vec<(&String, &String)> = files
            .iter()
            .filter(|(k, v)| self.files.get(*k) != Some(*v))
            .collect();
        let removed: Vec<&String> = self
            .files
            .keys()
            .filter(|k| !files.contains_key(*k))
            .collect();

        // Validate every key first so a bad path leaves the disk untouched.
        for (key, _) in &changed
        {
            validate_rel(Path::new(key.as_str()))?;
        }

        let mut touched = Vec::new();
        if !self.dry_run
        {
            for (key, content) in &changed
            {
                self.write_entry(key, content)
                    .with_context(|| format!("write {key}"))?;
                debug!(key = %key, "wrote file");
            }
            for key in &removed
            {
                let path = self
                    .root
                    .join(validate_rel(Path::new(key.as_str()))?);
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            }
        }
        touched.extend(
            changed
                .iter()
                .map(|(k, _)| k.to_string()),
        );
        touched.extend(
            removed
                .iter()
                .map(|k| k.to_string()),
        );

        self.touched
            .extend(touched);
        self.files = files;
        Ok(())
    }

    /// Pull in a file the walk left out (hidden, ignored, oversized) so an
    /// overwrite backs up its real content instead of treating it as new.
    fn resolve(
        &mut self,
        filename: &str,
    ) -> Result<()>
    {
        if self
            .files
            .contains_key(filename)
        {
            return Ok(());
        }

        let path = self
            .root
            .join(validate_rel(Path::new(filename))?);
        let meta = match fs::metadata(&path)
        {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
        };
        if !meta.is_file()
        {
            bail!("not a regular file: {filename}");
        }

        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let Ok(content) = String::from_utf8(bytes)
        else
        {
            bail!("refusing to overwrite non-UTF-8 file: {filename}");
        };

        debug!(key = %filename, "loaded file outside the walked set");
        self.files
            .insert(filename.to_string(), content);
        Ok(())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet>
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns
    {
        builder.add(Glob::new(pattern).with_context(|| format!("bad ignore glob: {pattern}"))?);
    }
    Ok(builder.build()?)
}

/// Root-relative path as a `/`-separated key.
fn to_key(rel: &Path) -> String
{
    rel.components()
        .map(|c| {
            c.as_os_str()
                .to_string_lossy()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate that the given path is root-relative and non-escaping.
fn validate_rel(p: &Path) -> Result<PathBuf>
{
    if p.is_absolute()
    {
        bail!("path must be project-relative: {}", p.display());
    }
    let mut out = PathBuf::new();
    for c in p.components()
    {
        match c
        {
            Component::ParentDir => bail!("path escapes project: {}", p.display()),
            Component::CurDir =>
            {}
            Component::Prefix(_) | Component::RootDir =>
            {
                bail!("path must be project-relative: {}", p.display())
            }
            _ => out.push(c.as_os_str()),
        }
    }
    if out
        .as_os_str()
        .is_empty()
    {
        bail!("empty path");
    }
    Ok(out)
}

/// Atomic write: same-dir temp file, fsync, then persist over the target.
fn write_atomic(
    path: &Path,
    data: &[u8],
) -> Result<()>
{
    let dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(data)?;
    tmp.as_file()
        .sync_all()?;

    // Keep the original permissions when overwriting.
    if let Ok(meta) = fs::metadata(path)
    {
        fs::set_permissions(tmp.path(), meta.permissions()).context("set temp permissions")?;
    }

    tmp.persist(path)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir
    {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(
            tmp.path()
                .join("src"),
        )
        .unwrap();
        fs::create_dir_all(
            tmp.path()
                .join("node_modules/pkg"),
        )
        .unwrap();
        fs::write(
            tmp.path()
                .join("src/game.js"),
            "let a = 1;\n",
        )
        .unwrap();
        fs::write(
            tmp.path()
                .join("index.html"),
            "<html></html>",
        )
        .unwrap();
        fs::write(
            tmp.path()
                .join("node_modules/pkg/x.js"),
            "ignored",
        )
        .unwrap();
        fs::write(
            tmp.path()
                .join("blob.bin"),
            [0xff, 0xfe, 0x00],
        )
        .unwrap();
        tmp
    }

    #[test]
    fn load_respects_ignores_and_skips_binary()
    {
        let tmp = fixture();
        let project = DiskProject::load(tmp.path(), &ProjectConfig::default()).unwrap();
        let keys: Vec<&str> = project
            .files()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["index.html", "src/game.js"]);
    }

    #[test]
    fn set_files_writes_only_changes()
    {
        let tmp = fixture();
        let mut project = DiskProject::load(tmp.path(), &ProjectConfig::default()).unwrap();

        let mut next = project
            .files()
            .clone();
        next.insert("src/game.js".into(), "let a = 2;\n".into());
        next.insert("src/new/hud.js".into(), "hud();".into());
        project
            .set_files(next)
            .unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("src/game.js")).unwrap(), "let a = 2;\n");
        assert_eq!(fs::read_to_string(tmp.path().join("src/new/hud.js")).unwrap(), "hud();");
        assert_eq!(project.touched(), ["src/game.js", "src/new/hud.js"]);
    }

    #[test]
    fn dry_run_leaves_disk_alone()
    {
        let tmp = fixture();
        let mut project = DiskProject::load(tmp.path(), &ProjectConfig::default())
            .unwrap()
            .with_dry_run(true);

        let mut next = project
            .files()
            .clone();
        next.insert("src/game.js".into(), "changed".into());
        project
            .set_files(next)
            .unwrap();

        assert_eq!(project.files()["src/game.js"], "changed");
        assert_eq!(fs::read_to_string(tmp.path().join("src/game.js")).unwrap(), "let a = 1;\n");
    }

    #[test]
    fn escaping_paths_are_rejected()
    {
        let tmp = fixture();
        let mut project = DiskProject::load(tmp.path(), &ProjectConfig::default()).unwrap();

        let mut next = project
            .files()
            .clone();
        next.insert("../evil.js".into(), "x".into());
        let err = project
            .set_files(next)
            .unwrap_err();
        assert!(err.to_string().contains("escapes"));
        assert!(!project.files().contains_key("../evil.js"));
    }

    #[test]
    fn resolve_pulls_in_filtered_files()
    {
        let tmp = fixture();
        fs::write(
            tmp.path()
                .join(".eslintrc.js"),
            "module.exports = {};",
        )
        .unwrap();
        let mut project = DiskProject::load(tmp.path(), &ProjectConfig::default()).unwrap();
        assert!(!project.files().contains_key(".eslintrc.js"));

        project
            .resolve(".eslintrc.js")
            .unwrap();
        project
            .resolve("node_modules/pkg/x.js")
            .unwrap();
        project
            .resolve("src/missing.js")
            .unwrap();

        assert_eq!(project.files()[".eslintrc.js"], "module.exports = {};");
        assert_eq!(project.files()["node_modules/pkg/x.js"], "ignored");
        assert!(!project.files().contains_key("src/missing.js"));
        assert!(project.touched().is_empty());
    }

    #[test]
    fn resolve_rejects_binary_and_directories()
    {
        let tmp = fixture();
        let mut project = DiskProject::load(tmp.path(), &ProjectConfig::default()).unwrap();

        let err = project
            .resolve("blob.bin")
            .unwrap_err();
        assert!(err.to_string().contains("non-UTF-8"));
        assert!(project.resolve("src").is_err());
    }
}
