//! Pairing `packages.config` manifests with the project file they belong to.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use pkgmigrate_types::MANIFEST_FILE_NAME;
use tracing::debug;

/// A manifest and the build file in the same directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestPair {
    pub manifest: Utf8PathBuf,
    pub build_file: Utf8PathBuf,
}

/// A manifest that cannot be migrated as selected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{manifest}: {reason}")]
pub struct SelectionError {
    pub manifest: Utf8PathBuf,
    pub reason: String,
}

impl SelectionError {
    fn new(manifest: &Utf8Path, reason: impl Into<String>) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Selection = Vec<Result<ManifestPair, SelectionError>>;

/// Resolve an explicitly named manifest to its pair.
///
/// The file must be named exactly `packages.config` and its directory must hold exactly one
/// project file with one of `extensions` (compared case-insensitively).
pub fn pair_for_manifest(
    manifest: &Utf8Path,
    extensions: &[String],
) -> Result<ManifestPair, SelectionError> {
    if manifest.file_name() != Some(MANIFEST_FILE_NAME) {
        return Err(SelectionError::new(
            manifest,
            format!("not a {MANIFEST_FILE_NAME} file"),
        ));
    }
    if !manifest.is_file() {
        return Err(SelectionError::new(manifest, "no such file"));
    }

    let dir = match manifest.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    let candidates = project_files(dir, extensions)
        .map_err(|err| SelectionError::new(manifest, format!("{err:#}")))?;

    match candidates.as_slice() {
        [one] => Ok(ManifestPair {
            manifest: manifest.to_path_buf(),
            build_file: one.clone(),
        }),
        [] => Err(SelectionError::new(manifest, "no project file next to it")),
        many => Err(SelectionError::new(
            manifest,
            format!(
                "{} project files next to it: {}",
                many.len(),
                many.iter()
                    .filter_map(|p| p.file_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}

fn project_files(dir: &Utf8Path, extensions: &[String]) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    for entry in fs_err::read_dir(dir)? {
        let path = entry?.path();
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        let matches = path
            .extension()
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Find every manifest under `root` and pair it. Sorted by manifest path.
pub fn discover_pairs(root: &Utf8Path, extensions: &[String]) -> anyhow::Result<Selection> {
    let pattern = format!(
        "{}/**/{MANIFEST_FILE_NAME}",
        glob::Pattern::escape(root.as_str())
    );
    let mut manifests = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("glob {pattern}"))? {
        let path = entry.context("walk source tree")?;
        match Utf8PathBuf::from_path_buf(path) {
            Ok(p) => manifests.push(p),
            Err(p) => debug!(path = %p.display(), "skipping non-UTF-8 path"),
        }
    }
    manifests.sort();
    debug!(root = %root, count = manifests.len(), "discovered manifests");
    Ok(select_manifests(&manifests, extensions))
}

/// Pair each of `manifests`, keeping their order.
pub fn select_manifests(manifests: &[Utf8PathBuf], extensions: &[String]) -> Selection {
    manifests
        .iter()
        .map(|m| pair_for_manifest(m, extensions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["csproj".into(), "vbproj".into(), "fsproj".into()]
    }

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for f in files {
            let p = root.join(f);
            fs_err::create_dir_all(p.parent().unwrap()).unwrap();
            fs_err::write(&p, "").unwrap();
        }
        (dir, root)
    }

    #[test]
    fn pairs_single_project_file() {
        let (_dir, root) = tree(&["App/packages.config", "App/App.CSPROJ", "App/Program.cs"]);
        let pair = pair_for_manifest(&root.join("App/packages.config"), &exts()).unwrap();
        assert_eq!(pair.build_file, root.join("App/App.CSPROJ"));
    }

    #[test]
    fn rejects_wrong_name_and_ambiguity() {
        let (_dir, root) = tree(&[
            "A/packages.config",
            "A/One.csproj",
            "A/Two.vbproj",
            "B/packages.config",
            "C/packages.Release.config",
        ]);
        let err = pair_for_manifest(&root.join("A/packages.config"), &exts()).unwrap_err();
        assert!(err.reason.contains("2 project files"));
        let err = pair_for_manifest(&root.join("B/packages.config"), &exts()).unwrap_err();
        assert!(err.reason.contains("no project file"));
        let err = pair_for_manifest(&root.join("C/packages.Release.config"), &exts()).unwrap_err();
        assert!(err.reason.contains("not a packages.config"));
    }

    #[test]
    fn discover_is_sorted_and_keeps_failures() {
        let (_dir, root) = tree(&[
            "src/Zed/packages.config",
            "src/Zed/Zed.fsproj",
            "src/Alpha/packages.config",
            "src/Alpha/Alpha.csproj",
            "src/Orphan/packages.config",
        ]);
        let selection = discover_pairs(&root, &exts()).unwrap();
        assert_eq!(selection.len(), 3);
        assert_eq!(
            selection[0].as_ref().unwrap().build_file,
            root.join("src/Alpha/Alpha.csproj")
        );
        assert!(selection[1].is_err());
        assert_eq!(
            selection[2].as_ref().unwrap().build_file,
            root.join("src/Zed/Zed.fsproj")
        );
    }
}
