use super::cgroup;
use super::stats::{BPF_RUN_COUNT, BPF_RUN_TIME};

use anyhow::{anyhow, Context};
use libbpf_rs::skel::{OpenSkel, Skel, SkelBuilder};
use libbpf_rs::{MapCore, MapFlags, OpenObject, PrintLevel};
use ringlog::*;

use std::mem::MaybeUninit;
use std::os::fd::{AsFd, AsRawFd};
use std::path::Path;
use std::time::{Duration, Instant};

mod bpf {
    include!(concat!(env!("OUT_DIR"), "/readlat.bpf.rs"));
}

use bpf::*;

// the filter occupies the only slot in the config map
const FILTER_KEY: u32 = 0;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mirror of the per-cpu value records in the `read_latency_stats` BPF map.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadLatencyStats {
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

unsafe impl plain::Plain for ReadLatencyStats {}

/// Owns the loaded BPF skeleton with both tracepoints attached.
///
/// The entry and exit programs are attached together and detached together
/// when the skeleton is dropped. Attaching only one half would leave staged
/// timestamps that are never cleared.
pub struct Probe {
    skel: ModSkel<'static>,
}

impl Probe {
    /// Opens, loads, and attaches the BPF programs. Verifier rejection and
    /// attach failures surface here, before any event processing begins.
    pub fn load() -> Result<Self, libbpf_rs::Error> {
        // log all messages from libbpf at debug level
        fn libbpf_print_fn(_level: PrintLevel, msg: String) {
            debug!("libbpf: {}", msg.trim_end());
        }
        libbpf_rs::set_print(Some((PrintLevel::Debug, libbpf_print_fn)));

        // storage for the BPF object file
        let open_object: &'static mut MaybeUninit<OpenObject> =
            Box::leak(Box::new(MaybeUninit::uninit()));

        let open_skel = ModSkelBuilder::default().open(open_object)?;

        let mut skel = open_skel.load()?;

        debug!(
            "sys_enter_read() BPF instruction count: {}",
            skel.progs.sys_enter_read.insn_cnt()
        );
        debug!(
            "sys_exit_read() BPF instruction count: {}",
            skel.progs.sys_exit_read.insn_cnt()
        );

        skel.attach()?;

        Ok(Self { skel })
    }

    /// Points the kernel-side filter at the given cgroup directory and
    /// returns the cgroup id that was written. This is a single atomic slot
    /// update, so the probe can be retargeted without reattaching.
    pub fn set_filter_target(&self, path: &Path) -> anyhow::Result<u64> {
        let id = cgroup::cgroup_id(path)
            .with_context(|| format!("failed to stat cgroup directory: {}", path.display()))?;

        self.skel
            .maps
            .config_map
            .update(&FILTER_KEY.to_ne_bytes(), &id.to_ne_bytes(), MapFlags::ANY)
            .context("failed to update cgroup filter")?;

        Ok(id)
    }

    /// Returns the total number of matched read calls for the given process.
    /// A process that has made no matched calls yet reads back as zero.
    pub fn read_latency_count(&self, pid: u32) -> anyhow::Result<u64> {
        Ok(self
            .read_latency_stats(pid)?
            .map(|stats| stats.count)
            .unwrap_or(0))
    }

    /// Merges the per-cpu shards for the given process. Concurrent updates on
    /// other cpus make this a point-in-time approximation, not an atomic
    /// snapshot.
    pub fn read_latency_stats(&self, pid: u32) -> anyhow::Result<Option<ReadLatencyStats>> {
        let Some(shards) = self
            .skel
            .maps
            .read_latency_stats
            .lookup_percpu(&pid.to_ne_bytes(), MapFlags::ANY)
            .context("failed to lookup read latency stats")?
        else {
            return Ok(None);
        };

        let mut merged: Option<ReadLatencyStats> = None;

        for shard in &shards {
            let mut stats = ReadLatencyStats::default();
            plain::copy_from_bytes(&mut stats, shard)
                .map_err(|_| anyhow!("short read of latency stats value"))?;

            if stats.count == 0 {
                continue;
            }

            merged = Some(match merged {
                None => stats,
                Some(m) => ReadLatencyStats {
                    count: m.count + stats.count,
                    total_ns: m.total_ns + stats.total_ns,
                    min_ns: m.min_ns.min(stats.min_ns),
                    max_ns: m.max_ns.max(stats.max_ns),
                },
            });
        }

        Ok(merged)
    }

    /// Polls the read count for the given process at a short fixed interval
    /// until it reaches `min` or the deadline expires, returning the last
    /// observed value either way.
    pub fn wait_for_read_count(
        &self,
        pid: u32,
        min: u64,
        timeout: Duration,
    ) -> anyhow::Result<u64> {
        let deadline = Instant::now() + timeout;

        loop {
            let count = self.read_latency_count(pid)?;

            if count >= min || Instant::now() >= deadline {
                return Ok(count);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Refreshes the BPF program runtime counters. The kernel only populates
    /// these when `kernel.bpf_stats_enabled` is set.
    pub fn refresh_prog_stats(&self) {
        let mut run_time: u64 = 0;
        let mut run_count: u64 = 0;

        for prog in self.skel.object().progs() {
            let mut info = libbpf_sys::bpf_prog_info::default();
            let mut len = std::mem::size_of::<libbpf_sys::bpf_prog_info>() as u32;

            let fd = prog.as_fd().as_raw_fd();

            let result = unsafe { libbpf_sys::bpf_prog_get_info_by_fd(fd, &mut info, &mut len) };

            if result == 0 {
                run_time = run_time.wrapping_add(info.run_time_ns);
                run_count = run_count.wrapping_add(info.run_cnt);
            }
        }

        if run_time > 0 {
            BPF_RUN_TIME.set(run_time);
        }

        if run_count > 0 {
            BPF_RUN_COUNT.set(run_count);
        }
    }
}
