use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use refine_code_chunker::Language;
use refine_protocol::AnalysisConfig;
use std::path::{Path, PathBuf};

/// Finds analyzable units in a project tree (.gitignore aware).
///
/// Include/ignore globs from the configuration are matched against paths
/// relative to the scan root. With no include patterns, any file whose
/// language is recognized qualifies.
pub struct UnitScanner {
    root: PathBuf,
    include: Option<GlobSet>,
    ignore: Option<GlobSet>,
    max_file_bytes: u64,
}

impl UnitScanner {
    pub fn new(root: impl AsRef<Path>, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            include: build_globset(&config.include)?,
            ignore: build_globset(&config.ignore)?,
            max_file_bytes: config.max_file_bytes,
        })
    }

    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);

        for entry in builder.build() {
            match entry {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.max_file_bytes {
                            log::debug!(
                                "skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.max_file_bytes
                            );
                            continue;
                        }
                    }

                    if self.selects(path) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => log::warn!("failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("found {} analyzable units", files.len());
        files
    }

    fn selects(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        if let Some(ignore) = &self.ignore {
            if ignore.is_match(relative) {
                return false;
            }
        }

        match &self.include {
            Some(include) => include.is_match(relative),
            None => Language::from_path(path) != Language::Unknown,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn finds_recognized_languages_only_by_default() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(temp.path().join("app.py"), "pass").unwrap();
        fs::write(temp.path().join("notes.xyz"), "hello").unwrap();

        let scanner = UnitScanner::new(temp.path(), &config()).unwrap();
        let files = scanner.scan();

        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("main.rs")));
        assert!(files.iter().any(|p| p.ends_with("app.py")));
    }

    #[test]
    fn include_patterns_override_language_detection() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(temp.path().join("app.py"), "pass").unwrap();

        let mut config = config();
        config.include = vec!["*.py".to_string()];
        let scanner = UnitScanner::new(temp.path(), &config).unwrap();
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn ignore_patterns_exclude_matches() {
        let temp = tempdir().unwrap();
        let generated = temp.path().join("generated");
        fs::create_dir_all(&generated).unwrap();
        fs::write(generated.join("schema.rs"), "// generated").unwrap();
        fs::write(temp.path().join("main.rs"), "fn main() {}").unwrap();

        let mut config = config();
        config.ignore = vec!["generated/**".to_string()];
        let scanner = UnitScanner::new(temp.path(), &config).unwrap();
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }

    #[test]
    fn oversized_files_are_skipped() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("big.rs"), "x".repeat(4096)).unwrap();
        fs::write(temp.path().join("small.rs"), "fn main() {}").unwrap();

        let mut config = config();
        config.max_file_bytes = 1024;
        let scanner = UnitScanner::new(temp.path(), &config).unwrap();
        let files = scanner.scan();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("small.rs"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let mut config = config();
        config.include = vec!["[".to_string()];
        assert!(UnitScanner::new("/tmp", &config).is_err());
    }
}
