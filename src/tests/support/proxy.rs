// Stand-in proxy binary for supervisor runs.

use std::fs;
use std::path::{Path, PathBuf};

/// Writes an executable script into `dir` that records the bootstrap path it
/// was given (`-c <path>`) in `dir/bootstrap-path`, prints a line on each
/// stream, and then sleeps until signalled.
#[cfg(unix)]
pub fn fake_proxy(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-proxy");
    let marker = dir.join("bootstrap-path");
    let body = format!(
        "#!/bin/sh\necho \"$2\" > '{}'\necho \"fake proxy up\"\necho \"fake proxy warn\" >&2\nexec sleep 30\n",
        marker.display()
    );
    fs::write(&script, body).expect("write fake proxy");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod fake proxy");
    script
}

/// Bootstrap path recorded by [`fake_proxy`], once it ran.
pub fn recorded_bootstrap(dir: &Path) -> Option<PathBuf> {
    let raw = fs::read_to_string(dir.join("bootstrap-path")).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}
