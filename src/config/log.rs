use super::*;

#[derive(Deserialize)]
pub struct Log {
    #[serde(default = "level")]
    level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self { level: level() }
    }
}

impl Log {
    pub fn check(&self) {
        if self.level.parse::<Level>().is_err() {
            eprintln!("log level not recognized: {}", self.level);
            std::process::exit(1);
        }
    }

    pub fn level(&self) -> Level {
        self.level.parse().unwrap()
    }
}
