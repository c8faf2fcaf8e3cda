// Script and program catalogs backed by the filesystem.
//
// Nothing is cached: every call re-reads the directory, so files added or
// removed between calls show up on the next listing.

use crate::error::CatalogError;
use crate::header::{CommentStyle, Header};
use crate::policy::HostOnlyPolicy;
use crate::types::{
    Category, CategoryFilter, ProgramInfo, ProgramSummary, ScriptInfo, ScriptSummary,
};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A flat directory of source files sharing one extension and comment style
#[derive(Debug, Clone)]
pub struct SourceDir {
    root: PathBuf,
    extension: String,
    style: CommentStyle,
}

impl SourceDir {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, style: CommentStyle) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            style,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|ext| ext == self.extension.as_str())
            .unwrap_or(false)
    }

    /// File names in the directory, sorted. Hidden files are skipped.
    pub fn file_names(&self) -> Result<Vec<String>, CatalogError> {
        let mut names = Vec::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| CatalogError::io(&self.root, e.into()))?;
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if name.starts_with('.') || !self.has_extension(name) || !entry.path().is_file() {
                continue;
            }
            names.push(name.to_string());
        }

        Ok(names)
    }

    /// Resolve `name` to a file directly inside the directory.
    ///
    /// Rejects anything that is not a single plain path component, and
    /// anything whose canonical path escapes the directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, CatalogError> {
        validate_name(name)?;

        let path = self.root.join(name);
        if !self.has_extension(name) || !path.is_file() {
            return Err(CatalogError::NotFound {
                name: name.to_string(),
                root: self.root.clone(),
            });
        }

        let canonical = path
            .canonicalize()
            .map_err(|e| CatalogError::io(&path, e))?;
        let root = self
            .root
            .canonicalize()
            .map_err(|e| CatalogError::io(&self.root, e))?;
        if !canonical.starts_with(&root) {
            return Err(CatalogError::OutsideRoot(name.to_string()));
        }

        Ok(canonical)
    }

    /// Read and parse the header of `name`.
    pub fn header(&self, name: &str) -> Result<Header, CatalogError> {
        let path = self.resolve(name)?;
        read_header(&path, name, self.style)
    }

    /// Header of a listed entry; anything unreadable or escaping the
    /// directory yields `None`.
    fn listed_header(&self, name: &str) -> Option<Header> {
        let header = self
            .resolve(name)
            .and_then(|path| read_header(&path, name, self.style));
        match header {
            Ok(header) => Some(header),
            Err(e) => {
                tracing::warn!("Skipping {} in listing: {}", name, e);
                None
            }
        }
    }
}

fn read_header(path: &Path, name: &str, style: CommentStyle) -> Result<Header, CatalogError> {
    let bytes = std::fs::read(path).map_err(|e| CatalogError::io(path, e))?;
    let source = String::from_utf8_lossy(&bytes);
    Ok(Header::parse(&source, name, style))
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    let invalid = || CatalogError::InvalidName(name.to_string());

    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(invalid()),
    }
}

/// Shell scripts, classified by category and host-only policy
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    dir: SourceDir,
    policy: HostOnlyPolicy,
}

impl ScriptCatalog {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, policy: HostOnlyPolicy) -> Self {
        Self {
            dir: SourceDir::new(root, extension, CommentStyle::Hash),
            policy,
        }
    }

    pub fn dir(&self) -> &SourceDir {
        &self.dir
    }

    pub fn policy(&self) -> &HostOnlyPolicy {
        &self.policy
    }

    pub fn is_host_only(&self, name: &str) -> bool {
        self.policy.is_host_only(name)
    }

    pub fn list(&self, filter: CategoryFilter) -> Result<Vec<ScriptSummary>, CatalogError> {
        let scripts = self
            .dir
            .file_names()?
            .into_iter()
            .filter_map(|name| {
                let category = Category::from_file_name(&name);
                if !filter.matches(category) {
                    return None;
                }
                let summary = self.dir.listed_header(&name)?.summary();
                Some(ScriptSummary {
                    name,
                    category,
                    summary,
                })
            })
            .collect();

        Ok(scripts)
    }

    pub fn info(&self, name: &str) -> Result<ScriptInfo, CatalogError> {
        let header = self.dir.header(name)?;
        let sections = header.sections();

        Ok(ScriptInfo {
            name: name.to_string(),
            category: Category::from_file_name(name),
            summary: header.summary(),
            usage: sections.usage,
            options: sections.options,
            environment: sections.environment,
            host_only: self.is_host_only(name),
        })
    }
}

/// Single-file helper programs
#[derive(Debug, Clone)]
pub struct ProgramCatalog {
    dir: SourceDir,
}

impl ProgramCatalog {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: SourceDir::new(root, extension, CommentStyle::DoubleSlash),
        }
    }

    pub fn dir(&self) -> &SourceDir {
        &self.dir
    }

    pub fn list(&self) -> Result<Vec<ProgramSummary>, CatalogError> {
        let programs = self
            .dir
            .file_names()?
            .into_iter()
            .filter_map(|name| {
                let summary = self.dir.listed_header(&name)?.summary();
                Some(ProgramSummary { name, summary })
            })
            .collect();

        Ok(programs)
    }

    pub fn info(&self, name: &str) -> Result<ProgramInfo, CatalogError> {
        let header = self.dir.header(name)?;
        let sections = header.sections();

        Ok(ProgramInfo {
            name: name.to_string(),
            summary: header.summary(),
            usage: sections.usage,
            options: sections.options,
            environment: sections.environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn scripts(dir: &TempDir) -> ScriptCatalog {
        ScriptCatalog::new(dir.path(), "sh", HostOnlyPolicy::default())
    }

    #[test]
    fn test_list_scripts_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(&dir, "test-env.sh", "#!/bin/bash\n# test-env.sh\n# Verify the environment\n");
        write(&dir, "backup.sh", "#!/bin/bash\n# backup.sh\n# Back up settings\n");
        write(&dir, "README.md", "# Scripts\n");
        write(&dir, ".hidden.sh", "# hidden\n");

        let catalog = scripts(&dir);
        let all = catalog.list(CategoryFilter::All).unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["backup.sh", "test-env.sh"]);
        assert_eq!(all[0].summary, "Back up settings");
        assert_eq!(all[1].category, Category::Test);

        let tests = catalog.list(CategoryFilter::Test).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "test-env.sh");

        let utilities = catalog.list(CategoryFilter::Utility).unwrap();
        assert_eq!(utilities.len(), 1);
        assert_eq!(utilities[0].name, "backup.sh");
    }

    #[test]
    fn test_listing_reflects_new_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.sh", "# a\n");
        let catalog = scripts(&dir);

        let first = catalog.list(CategoryFilter::All).unwrap();
        assert_eq!(first, catalog.list(CategoryFilter::All).unwrap());

        write(&dir, "b.sh", "# b\n");
        assert_eq!(catalog.list(CategoryFilter::All).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let catalog = ScriptCatalog::new(dir.path().join("nope"), "sh", HostOnlyPolicy::default());
        assert!(matches!(
            catalog.list(CategoryFilter::All),
            Err(CatalogError::Io { .. })
        ));
    }

    #[test]
    fn test_script_info_host_only() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "init-host-env.sh",
            "#!/bin/bash\n# init-host-env.sh\n# Prepare the host\n#\n# Usage: init-host-env.sh\n",
        );

        let info = scripts(&dir).info("init-host-env.sh").unwrap();
        assert!(info.host_only);
        assert_eq!(info.category, Category::Utility);
        assert_eq!(info.summary, "Prepare the host");
        assert_eq!(info.usage.as_deref(), Some("init-host-env.sh"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ok.sh", "# ok\n");
        let catalog = scripts(&dir);

        for bad in ["../ok.sh", "sub/ok.sh", "..", ".", "", ".env.sh", "/etc/passwd"] {
            assert!(
                matches!(catalog.dir().resolve(bad), Err(CatalogError::InvalidName(_))),
                "{bad} should be rejected"
            );
        }
        assert!(catalog.dir().resolve("ok.sh").is_ok());
        assert!(matches!(
            catalog.dir().resolve("missing.sh"),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("evil.sh"), "# evil\n").unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("evil.sh"), dir.path().join("evil.sh")).unwrap();

        assert!(matches!(
            scripts(&dir).dir().resolve("evil.sh"),
            Err(CatalogError::OutsideRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_skips_symlink_escape() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.sh"), "# top secret summary\n").unwrap();
        let dir = TempDir::new().unwrap();
        write(&dir, "ok.sh", "# ok.sh\n# Fine\n");
        std::os::unix::fs::symlink(outside.path().join("secret.sh"), dir.path().join("leak.sh")).unwrap();

        let listed = scripts(&dir).list(CategoryFilter::All).unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ok.sh"]);
        assert!(listed.iter().all(|s| !s.summary.contains("secret")));

        std::os::unix::fs::symlink(outside.path().join("secret.sh"), dir.path().join("leak.go")).unwrap();
        write(&dir, "tool.go", "// tool.go\n// A tool\n");
        let programs = ProgramCatalog::new(dir.path(), "go").list().unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].name, "tool.go");
    }

    #[test]
    fn test_program_catalog() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "merge-settings.go",
            "// merge-settings.go\n// Merge settings files\n//\n// Options:\n//   -o FILE  Output file\npackage main\n",
        );
        write(&dir, "notes.txt", "ignored");

        let catalog = ProgramCatalog::new(dir.path(), "go");
        let list = catalog.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].summary, "Merge settings files");

        let info = catalog.info("merge-settings.go").unwrap();
        assert_eq!(info.options.len(), 1);
        assert_eq!(info.options[0].flags, "-o FILE");
    }
}
