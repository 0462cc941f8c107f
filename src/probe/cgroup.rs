use super::proc;
use super::ResolveError;

use std::path::{Path, PathBuf};

/// Returns the absolute cgroup v2 directory to use as the kernel-side filter
/// target.
///
/// If `explicit` is set it is used directly (after validation). Otherwise the
/// target process is located by comm and its current cgroup is resolved, so
/// the identifier used for filtering matches exactly what the kernel reports
/// for threads executing inside that container, even under nested
/// hierarchies. Resolving by name rather than a fixed pid survives target
/// restarts.
pub fn resolve_target(comm: &str, explicit: Option<&Path>) -> Result<PathBuf, ResolveError> {
    if let Some(path) = explicit {
        return resolve_cgroup_path(path);
    }

    let pid = proc::find_pid_by_comm(comm)?;
    let rel = proc::read_cgroup_v2_path(pid)?;
    let mount = cgroup2_mount()?;

    Ok(mount.join(rel.trim_start_matches('/')))
}

/// Validates that the given path exists and looks like a cgroup v2 directory
/// (contains `cgroup.procs`), returning its canonical absolute form.
pub fn resolve_cgroup_path(path: &Path) -> Result<PathBuf, ResolveError> {
    let abs = std::fs::canonicalize(path).map_err(|source| {
        ResolveError::InvalidCgroupDirectory {
            path: path.to_path_buf(),
            source,
        }
    })?;

    if let Err(source) = std::fs::metadata(abs.join("cgroup.procs")) {
        return Err(ResolveError::InvalidCgroupDirectory { path: abs, source });
    }

    Ok(abs)
}

/// Locates the unified cgroup v2 mount point by scanning the mount table for
/// a `cgroup2` entry that exposes `cgroup.controllers`.
pub fn cgroup2_mount() -> Result<PathBuf, ResolveError> {
    let data = std::fs::read_to_string("/proc/mounts")?;

    for line in data.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() >= 3 && fields[2] == "cgroup2" {
            let mount = Path::new(fields[1]);

            if mount.join("cgroup.controllers").exists() {
                return Ok(mount.to_path_buf());
            }
        }
    }

    Err(ResolveError::MountNotFound)
}

/// Returns the inode number of the cgroup directory, which is what the kernel
/// reports as the cgroup id for member threads.
pub fn cgroup_id(path: &Path) -> std::io::Result<u64> {
    use std::os::unix::fs::MetadataExt;

    Ok(std::fs::metadata(path)?.ino())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_or_skip() -> Option<PathBuf> {
        match cgroup2_mount() {
            Ok(mount) => Some(mount),
            Err(_) => {
                eprintln!("skipping: cgroup2 not available");
                None
            }
        }
    }

    #[test]
    fn test_cgroup2_mount() {
        let Some(mount) = mount_or_skip() else {
            return;
        };

        assert!(mount.join("cgroup.controllers").exists());
    }

    #[test]
    fn test_resolve_cgroup_path_valid() {
        let Some(mount) = mount_or_skip() else {
            return;
        };

        // the mount root itself is a valid cgroup directory and is already
        // canonical, so it must resolve to itself
        let resolved = resolve_cgroup_path(&mount).expect("resolve mount root");
        assert_eq!(resolved, mount);
    }

    #[test]
    fn test_resolve_cgroup_path_missing() {
        let err = resolve_cgroup_path(Path::new("/tmp/__no_such_cgroup_dir__")).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidCgroupDirectory { .. }));
    }

    #[test]
    fn test_resolve_cgroup_path_not_a_cgroup() {
        let dir = tempfile::tempdir().expect("create tempdir");

        let err = resolve_cgroup_path(dir.path()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidCgroupDirectory { .. }));
    }

    #[test]
    fn test_resolve_target_not_found() {
        let err = resolve_target("__no_such_process__", None).unwrap_err();
        assert!(matches!(err, ResolveError::ProcessNotFound { .. }));
    }

    #[test]
    fn test_resolve_target_explicit() {
        let Some(mount) = mount_or_skip() else {
            return;
        };

        let path = resolve_target("__no_such_process__", Some(&mount)).expect("explicit path");
        assert_eq!(path, mount);
    }

    #[test]
    fn test_cgroup_id_matches_stat() {
        let Some(mount) = mount_or_skip() else {
            return;
        };

        let id = cgroup_id(&mount).expect("stat mount");
        assert!(id != 0);

        // cross-check against the inode reported by stat(2) directly
        let path = std::ffi::CString::new(mount.to_str().unwrap()).unwrap();
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::stat(path.as_ptr(), &mut st) };
        assert_eq!(rc, 0);
        assert_eq!(id, st.st_ino);
    }

    #[test]
    fn test_self_cgroup_resolves() {
        let Some(mount) = mount_or_skip() else {
            return;
        };

        let rel = match proc::read_cgroup_v2_path(std::process::id()) {
            Ok(rel) => rel,
            Err(_) => {
                eprintln!("skipping: no unified cgroup hierarchy");
                return;
            }
        };

        let full = mount.join(rel.trim_start_matches('/'));

        if !full.join("cgroup.procs").exists() {
            // the record can name a path outside our namespace's view
            eprintln!("skipping: own cgroup not visible under the mount");
            return;
        }

        assert!(cgroup_id(&full).expect("stat own cgroup") != 0);
    }
}
