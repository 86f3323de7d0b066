//! Configuration types.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate};
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default date of the draw.
pub const DEFAULT_DRAW_DATE: &str = "2025-12-25";

/// Daily at 10:00:00 (cron with seconds field).
pub const DEFAULT_DRAW_SCHEDULE: &str = "0 0 10 * * *";

/// Default UTC offset for the schedule, in hours (Moscow time).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

/// When and how the scheduled draw fires.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// First calendar day on which the scheduled draw may run.
    pub draw_date: NaiveDate,
    /// Cron expression (seconds first) for the daily check.
    pub schedule: cron::Schedule,
    /// Offset in which both the cron expression and "today" are evaluated.
    pub offset: FixedOffset,
}

impl ScheduleConfig {
    pub fn new(draw_date: NaiveDate, schedule: &str, offset_hours: i32) -> Result<Self, ConfigError> {
        let schedule = cron::Schedule::from_str(schedule).map_err(|e| ConfigError::InvalidValue {
            key: "SANTA_DRAW_SCHEDULE".into(),
            message: e.to_string(),
        })?;
        let offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "SANTA_UTC_OFFSET_HOURS".into(),
                message: format!("{offset_hours} is out of range"),
            }
        })?;
        Ok(Self {
            draw_date,
            schedule,
            offset,
        })
    }
}

/// Text that appears in every assignment notification.
#[derive(Debug, Clone)]
pub struct GiftRules {
    pub budget: String,
    pub deadline: String,
}

impl Default for GiftRules {
    fn default() -> Self {
        Self {
            budget: "500-1000 RUB".to_string(),
            deadline: "December 25".to_string(),
        }
    }
}

/// Which transport the bot talks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Cli,
}

impl ChannelKind {
    /// Pick the channel from `SANTA_CHANNEL`, falling back to Telegram when a
    /// token is present and the CLI otherwise.
    pub fn resolve(requested: Option<&str>, has_token: bool) -> Result<Self, ConfigError> {
        match requested.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") => Ok(if has_token { Self::Telegram } else { Self::Cli }),
            Some("telegram") if has_token => Ok(Self::Telegram),
            Some("telegram") => Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into())),
            Some("cli") => Ok(Self::Cli),
            Some(other) => Err(ConfigError::InvalidValue {
                key: "SANTA_CHANNEL".into(),
                message: format!("unknown channel {other:?} (expected telegram or cli)"),
            }),
        }
    }
}

/// Bot configuration, read from the environment at startup.
#[derive(Debug)]
pub struct BotConfig {
    pub channel: ChannelKind,
    /// Telegram bot token; the CLI channel is used when absent.
    pub telegram_token: Option<SecretString>,
    /// Path of the combined event document.
    pub data_path: PathBuf,
    /// Directory holding `users_data.json` / `assignments.json` to import once.
    pub legacy_dir: Option<PathBuf>,
    pub schedule: ScheduleConfig,
    /// Identities allowed to run admin commands.
    pub admins: BTreeSet<String>,
    pub gift_rules: GiftRules,
    /// Directory for daily-rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let channel = ChannelKind::resolve(
            std::env::var("SANTA_CHANNEL").ok().as_deref(),
            telegram_token.is_some(),
        )?;

        let data_path = std::env::var("SANTA_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/secret-santa.json"));

        let legacy_dir = std::env::var("SANTA_LEGACY_DIR").ok().map(PathBuf::from);

        let draw_date_raw =
            std::env::var("SANTA_DRAW_DATE").unwrap_or_else(|_| DEFAULT_DRAW_DATE.to_string());
        let draw_date = NaiveDate::parse_from_str(draw_date_raw.trim(), "%Y-%m-%d").map_err(|e| {
            ConfigError::InvalidValue {
                key: "SANTA_DRAW_DATE".into(),
                message: format!("{draw_date_raw:?}: {e}"),
            }
        })?;

        let schedule_raw = std::env::var("SANTA_DRAW_SCHEDULE")
            .unwrap_or_else(|_| DEFAULT_DRAW_SCHEDULE.to_string());

        let offset_hours = match std::env::var("SANTA_UTC_OFFSET_HOURS") {
            Ok(raw) => raw.trim().parse::<i32>().map_err(|e| ConfigError::InvalidValue {
                key: "SANTA_UTC_OFFSET_HOURS".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            Err(_) => DEFAULT_UTC_OFFSET_HOURS,
        };

        let schedule = ScheduleConfig::new(draw_date, &schedule_raw, offset_hours)?;

        let admins = parse_admins(&std::env::var("SANTA_ADMINS").unwrap_or_default());

        let defaults = GiftRules::default();
        let gift_rules = GiftRules {
            budget: std::env::var("SANTA_GIFT_BUDGET").unwrap_or(defaults.budget),
            deadline: std::env::var("SANTA_GIFT_DEADLINE").unwrap_or(defaults.deadline),
        };

        let log_dir = std::env::var("SANTA_LOG_DIR").ok().map(PathBuf::from);

        Ok(Self {
            channel,
            telegram_token,
            data_path,
            legacy_dir,
            schedule,
            admins,
            gift_rules,
            log_dir,
        })
    }
}

/// Split a comma-separated identity list, dropping blanks.
pub fn parse_admins(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
