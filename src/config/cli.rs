use crate::domain::model::DayPeriod;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "attendance-notify")]
#[command(about = "Fetch the attendance percentage from the portal and send it over WhatsApp")]
pub struct CliConfig {
    /// TOML configuration file; secrets can come from the environment instead
    #[arg(long, short = 'c', env = "ATTENDANCE_NOTIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Label of this run; derived from the configured time zone when omitted
    #[arg(long, value_parser = parse_period)]
    pub period: Option<DayPeriod>,

    /// Fetch and render the message without sending it
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,
}

fn parse_period(value: &str) -> Result<DayPeriod, String> {
    value.parse::<DayPeriod>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_flags() {
        let cli = CliConfig::try_parse_from([
            "attendance-notify",
            "--config",
            "notify.toml",
            "--period",
            "evening",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("notify.toml")));
        assert_eq!(cli.period, Some(DayPeriod::Evening));
        assert!(cli.dry_run);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_rejects_unknown_period() {
        assert!(CliConfig::try_parse_from(["attendance-notify", "--period", "noon"]).is_err());
    }
}
