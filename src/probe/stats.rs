use metriken::{Counter, Lazy};

#[metriken::metric(
    name = "readlat_samples",
    description = "The number of reporting intervals the probe has completed"
)]
pub static SAMPLES: Lazy<Counter> = Lazy::new(|| Counter::new());

#[metriken::metric(
    name = "readlat_bpf_run_count",
    description = "The number of times the probe's BPF programs have been run"
)]
pub static BPF_RUN_COUNT: Lazy<Counter> = Lazy::new(|| Counter::new());

#[metriken::metric(
    name = "readlat_bpf_run_time",
    description = "The amount of time the probe's BPF programs have been executing, in nanoseconds"
)]
pub static BPF_RUN_TIME: Lazy<Counter> = Lazy::new(|| Counter::new());
