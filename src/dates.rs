//! Date expressions accepted by `--from` / `--to`.
//!
//! A base (`now`, `today`, `sod`, `eod`, `yesterday`, `tomorrow`, a weekday
//! name, or an ISO date with optional time) followed by any number of
//! signed offsets: `today+9hr`, `tomorrow-3days`, `2019-10-12T09:00+1week`.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

use crate::{tlog_debug, Error, Result};

/// Base followed by zero or more signed offsets.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<base>[a-z]+|\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}(?::\d{2})?)?)(?P<offsets>(?:[+-]\d+[a-z]+)*)$")
        .expect("valid regex")
});

static OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([+-])(\d+)([a-z]+)").expect("valid regex"));

/// Resolve `expr` relative to `now`.
pub fn parse(expr: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let invalid = || Error::InvalidDateExpression(expr.to_string());

    let trimmed = expr.trim();
    let caps = EXPRESSION.captures(trimmed).ok_or_else(invalid)?;
    let base = caps.name("base").map(|m| m.as_str()).ok_or_else(invalid)?;
    let mut resolved = resolve_base(base, now).ok_or_else(invalid)?;

    if let Some(offsets) = caps.name("offsets") {
        for step in OFFSET.captures_iter(offsets.as_str()) {
            let amount: i64 = step[2].parse().map_err(|_| invalid())?;
            let unit = unit_duration(&step[3].to_ascii_lowercase()).ok_or_else(invalid)?;
            let delta = i32::try_from(amount)
                .ok()
                .and_then(|n| unit.checked_mul(n))
                .ok_or_else(invalid)?;
            resolved = if &step[1] == "-" {
                resolved.checked_sub_signed(delta)
            } else {
                resolved.checked_add_signed(delta)
            }
            .ok_or_else(invalid)?;
        }
    }

    tlog_debug!("dates::parse {:?} -> {}", expr, resolved);
    Ok(resolved)
}

fn resolve_base(base: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date();
    let midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN);

    match base.to_ascii_lowercase().as_str() {
        "now" => Some(now),
        "today" | "sod" => Some(midnight(today)),
        "eod" => today.and_hms_opt(23, 59, 59),
        "yesterday" => today.pred_opt().map(midnight),
        "tomorrow" => today.succ_opt().map(midnight),
        word if word.chars().all(|c| c.is_ascii_alphabetic()) => {
            let weekday = parse_weekday(word)?;
            let ahead = (7 + weekday.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64)
                % 7;
            let ahead = if ahead == 0 { 7 } else { ahead };
            Some(midnight(today + Duration::days(ahead)))
        }
        iso => parse_iso(iso),
    }
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    let upper = raw.to_ascii_uppercase();
    NaiveDateTime::parse_from_str(&upper, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&upper, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&upper, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn unit_duration(unit: &str) -> Option<Duration> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(Duration::seconds(1)),
        "min" | "mins" | "minute" | "minutes" => Some(Duration::minutes(1)),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(Duration::hours(1)),
        "d" | "day" | "days" => Some(Duration::days(1)),
        "w" | "wk" | "wks" | "week" | "weeks" => Some(Duration::weeks(1)),
        _ => None,
    }
}
