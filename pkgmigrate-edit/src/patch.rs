use diffy::PatchFormatter;
use pkgmigrate_types::outcome::FileChange;
use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn file_change(path: &str, before: &str, after: &str) -> FileChange {
    FileChange {
        path: path.to_string(),
        sha256_before: sha256_hex(before.as_bytes()),
        sha256_after: sha256_hex(after.as_bytes()),
        bytes_before: before.len() as u64,
        bytes_after: after.len() as u64,
        backup_path: None,
    }
}

/// Git-style unified diff for one file. Empty when nothing changed.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let formatted = PatchFormatter::new().fmt_patch(&patch).to_string();
    // diffy emits its own original/modified header; keep only the hunks.
    for line in formatted.lines().skip_while(|l| !l.starts_with("@@")) {
        out.push_str(line);
        out.push('\n');
    }
    out
}
