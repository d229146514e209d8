use clap::Args;

pub const DEFAULT_BATCH_THRESHOLD: usize = 50;

/// Connection and tuning settings; every flag can also come from the
/// environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[arg(long, env = "MENTOR_PLACEMENT_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Roster size above which risk distribution preloads all records
    #[arg(
        long,
        env = "MENTOR_PLACEMENT_BATCH_THRESHOLD",
        default_value_t = DEFAULT_BATCH_THRESHOLD
    )]
    pub batch_threshold: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "MENTOR_PLACEMENT_LOG", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    pub fn risk(&self) -> RiskSettings {
        RiskSettings {
            batch_threshold: self.batch_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskSettings {
    pub batch_threshold: usize,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn flags_override_defaults() {
        let harness = Harness::parse_from([
            "test",
            "--database-url",
            "postgres://localhost/mentoring",
            "--batch-threshold",
            "10",
        ]);
        assert_eq!(harness.settings.max_connections, 5);
        assert_eq!(harness.settings.risk().batch_threshold, 10);
        assert_eq!(RiskSettings::default().batch_threshold, 50);
    }
}
