use backtrace::Backtrace;
use clap::{Arg, Command};
use ringlog::*;

mod config;
mod probe;

use config::Config;

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    // parse command line options
    let matches = Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "readlat measures the latency of read syscalls for a single workload, \
            scoped to the cgroup that workload is running in.",
        )
        .arg(
            Arg::new("CONFIG")
                .help("Probe configuration file")
                .action(clap::ArgAction::Set)
                .required(true)
                .index(1),
        )
        .get_matches();

    // load config from file
    let config = {
        let file = matches.get_one::<String>("CONFIG").unwrap();
        match Config::load(file) {
            Ok(c) => c,
            Err(error) => {
                eprintln!("error loading config file: {file}\n{error}");
                std::process::exit(1);
            }
        }
    };

    // configure debug log
    let debug_output: Box<dyn Output> = Box::new(Stderr::new());

    let level = config.log().level();

    let debug_log = if level <= Level::Info {
        LogBuilder::new().format(ringlog::default_format)
    } else {
        LogBuilder::new()
    }
    .output(debug_output)
    .build()
    .expect("failed to initialize debug log");

    let mut log = MultiLogBuilder::new()
        .level_filter(level.to_level_filter())
        .default(debug_log)
        .build()
        .start();

    debug!("report interval: {:?}", config.general().interval());

    // resolve the filter target before any tracing begins
    let target = config.general().target();

    let cgroup = match probe::cgroup::resolve_target(target, config.general().cgroup()) {
        Ok(path) => path,
        Err(error) => {
            error!("failed to resolve target cgroup: {error}");
            let _ = log.flush();
            std::process::exit(1);
        }
    };

    info!("target cgroup: {}", cgroup.display());

    #[cfg(all(target_os = "linux", feature = "bpf"))]
    {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        let running = Arc::new(AtomicBool::new(true));

        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::Relaxed);
        })
        .expect("failed to set signal handler");

        let probe = match probe::Probe::load() {
            Ok(probe) => probe,
            Err(error) => {
                error!("failed to load BPF probe: {error}");
                let _ = log.flush();
                std::process::exit(1);
            }
        };

        let id = match probe.set_filter_target(&cgroup) {
            Ok(id) => id,
            Err(error) => {
                error!("failed to configure cgroup filter: {error}");
                let _ = log.flush();
                std::process::exit(1);
            }
        };

        info!("tracing read syscalls for cgroup id {id}");

        // kernel-side aggregation is not synchronously observable, so give the
        // workload a bounded window to produce its first matched call
        if !target.is_empty() {
            if let Ok(pid) = probe::proc::find_pid_by_comm(target) {
                match probe.wait_for_read_count(pid, 1, Duration::from_secs(2)) {
                    Ok(0) => info!("no reads observed for pid {pid} yet"),
                    Ok(count) => info!("observed {count} reads for pid {pid}"),
                    Err(error) => error!("failed to read latency stats: {error}"),
                }
            }
        }

        let interval = config.general().interval();

        while running.load(Ordering::Relaxed) {
            std::thread::sleep(interval);

            probe::SAMPLES.increment();

            // the target may have restarted since the last interval, so the
            // pid is resolved fresh each time
            if !target.is_empty() {
                match probe::proc::find_pid_by_comm(target) {
                    Ok(pid) => match probe.read_latency_stats(pid) {
                        Ok(Some(stats)) => {
                            info!(
                                "pid {}: count={} avg_ns={} min_ns={} max_ns={}",
                                pid,
                                stats.count,
                                stats.total_ns / stats.count,
                                stats.min_ns,
                                stats.max_ns
                            );
                        }
                        Ok(None) => info!("pid {pid}: no matched reads yet"),
                        Err(error) => error!("failed to read latency stats: {error}"),
                    },
                    Err(error) => debug!("target not running: {error}"),
                }
            }

            probe.refresh_prog_stats();

            let _ = log.flush();
        }

        info!("shutting down");
        let _ = log.flush();
    }

    #[cfg(not(all(target_os = "linux", feature = "bpf")))]
    {
        match probe::cgroup::cgroup_id(&cgroup) {
            Ok(id) => info!("resolved cgroup id: {id}"),
            Err(error) => error!("failed to stat target cgroup: {error}"),
        }

        info!("readlat was built without BPF support, nothing to trace");
        let _ = log.flush();
    }
}
