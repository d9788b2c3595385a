//! Allowed trading hours and weekdays, evaluated in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::json;

use crate::rules::{Rule, RuleConfig, RuleKind, TimeWindowConfig};
use crate::types::{PolicyContext, PolicyResult};

pub struct TimeWindowRule;

const NAME: &str = "Time Window";

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// The instant the window is judged against: the time signal when present,
/// otherwise the evaluation timestamp.
fn effective_now(ctx: &PolicyContext) -> DateTime<Utc> {
    ctx.signals
        .time()
        .map(|t| t.now)
        .unwrap_or(ctx.timestamp)
}

impl Rule for TimeWindowRule {
    fn kind(&self) -> RuleKind {
        RuleKind::TimeWindow
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Only allow transactions during specific hours"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::TimeWindow(TimeWindowConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::TimeWindow(cfg) => cfg.clone(),
            _ => TimeWindowConfig::default(),
        };

        let now = effective_now(ctx);
        let hour = now.hour() as u8;
        let day = now.weekday().num_days_from_sunday() as u8;
        let day_name = DAY_NAMES[day as usize];

        if !cfg.days.contains(&day) {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!("Not a valid day: {} not in allowed days", day_name),
            )
            .with_metadata(json!({
                "currentDay": day,
                "currentDayName": day_name,
                "allowedDays": cfg.days,
            }));
        }

        // [start, end); a window with start > end wraps past midnight.
        let in_window = if cfg.start_hour <= cfg.end_hour {
            hour >= cfg.start_hour && hour < cfg.end_hour
        } else {
            hour >= cfg.start_hour || hour < cfg.end_hour
        };

        if !in_window {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!(
                    "Outside time window: {}:00 UTC not in {}:00-{}:00",
                    hour, cfg.start_hour, cfg.end_hour
                ),
            )
            .with_metadata(json!({
                "currentHour": hour,
                "startHour": cfg.start_hour,
                "endHour": cfg.end_hour,
            }));
        }

        PolicyResult::allow(
            self.kind(),
            NAME,
            format!("Within time window: {}:00 UTC", hour),
        )
        .with_metadata(json!({
            "currentHour": hour,
            "startHour": cfg.start_hour,
            "endHour": cfg.end_hour,
        }))
    }
}
