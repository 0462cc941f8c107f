use super::*;

#[derive(Deserialize)]
pub struct General {
    // comm name of the workload whose reads should be traced
    #[serde(default)]
    target: String,

    // explicit cgroup directory, overrides resolution via the target comm
    #[serde(default)]
    cgroup: Option<String>,

    // how often aggregated latency stats are reported
    #[serde(default = "interval")]
    interval: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            target: String::new(),
            cgroup: None,
            interval: interval(),
        }
    }
}

impl General {
    pub fn check(&self) {
        if self.target.is_empty() && self.cgroup.is_none() {
            eprintln!("either a target comm or an explicit cgroup must be configured");
            std::process::exit(1);
        }

        if let Err(e) = self.interval.parse::<humantime::Duration>() {
            eprintln!("interval couldn't be parsed: {e}");
            std::process::exit(1);
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn cgroup(&self) -> Option<&Path> {
        self.cgroup.as_deref().map(Path::new)
    }

    pub fn interval(&self) -> std::time::Duration {
        *self.interval.parse::<humantime::Duration>().unwrap()
    }
}
