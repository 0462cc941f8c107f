use super::ResolveError;

/// Scans `/proc` and returns the first process whose comm matches `name`.
///
/// Enumeration order is whatever the kernel hands back, so callers must not
/// assume the lowest pid wins when names collide. Processes that disappear
/// between listing and reading are skipped.
pub fn find_pid_by_comm(name: &str) -> Result<u32, ResolveError> {
    for entry in std::fs::read_dir("/proc")? {
        let Ok(entry) = entry else {
            continue;
        };

        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };

        // the process may have exited since the directory was listed
        let Ok(comm) = std::fs::read_to_string(format!("/proc/{pid}/comm")) else {
            continue;
        };

        if comm.trim() == name {
            return Ok(pid);
        }
    }

    Err(ResolveError::ProcessNotFound {
        comm: name.to_string(),
    })
}

/// Reads `/proc/<pid>/cgroup` and returns the cgroup v2 relative path: the
/// record with hierarchy id `0`, normalized to have a leading slash. An empty
/// path field means the root cgroup.
pub fn read_cgroup_v2_path(pid: u32) -> Result<String, ResolveError> {
    let data = std::fs::read_to_string(format!("/proc/{pid}/cgroup"))
        .map_err(|source| ResolveError::CgroupUnreadable { pid, source })?;

    for line in data.lines() {
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        // cgroup v2 records look like "0::/path/to/cgroup"
        let mut parts = line.splitn(3, ':');

        if parts.next() != Some("0") {
            continue;
        }

        let _controllers = parts.next();

        let Some(path) = parts.next() else {
            continue;
        };

        if path.is_empty() {
            return Ok("/".to_string());
        }

        if path.starts_with('/') {
            return Ok(path.to_string());
        }

        return Ok(format!("/{path}"));
    }

    Err(ResolveError::CgroupRecordMissing { pid })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_pid_by_comm_self() {
        let comm = std::fs::read_to_string("/proc/self/comm").expect("read own comm");
        let comm = comm.trim();
        assert!(!comm.is_empty());

        let pid = find_pid_by_comm(comm).expect("find own comm");
        assert!(pid > 0);

        // whichever process matched, its comm must round-trip
        let matched =
            std::fs::read_to_string(format!("/proc/{pid}/comm")).expect("read matched comm");
        assert_eq!(matched.trim(), comm);
    }

    #[test]
    fn test_find_pid_by_comm_not_found() {
        let err = find_pid_by_comm("__no_such_process__").unwrap_err();
        assert!(matches!(err, ResolveError::ProcessNotFound { .. }));
    }

    #[test]
    fn test_read_cgroup_v2_path_self() {
        match read_cgroup_v2_path(std::process::id()) {
            Ok(path) => assert!(path.starts_with('/')),
            Err(ResolveError::CgroupRecordMissing { .. }) => {
                eprintln!("skipping: no unified cgroup hierarchy");
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_read_cgroup_v2_path_invalid_pid() {
        assert!(read_cgroup_v2_path(999_999_999).is_err());
    }
}
