use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;

/// Parses a user-entered date argument against an explicit `now`.
///
/// Accepted forms: `YYYY-MM-DD`, `today`, `tomorrow`, `+Nd` (N days from
/// now). Bare dates resolve to the end of that day so "due 2026-03-05"
/// stays due for the whole of the 5th.
pub fn parse_date_arg(raw: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("date argument cannot be empty"));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return Ok(end_of_day(now.date_naive())),
        "tomorrow" => {
            let tomorrow = now
                .date_naive()
                .succ_opt()
                .ok_or_else(|| anyhow!("date out of range"))?;
            return Ok(end_of_day(tomorrow));
        }
        _ => {}
    }

    let relative = Regex::new(r"^\+(\d{1,4})d$").context("invalid relative date pattern")?;
    if let Some(caps) = relative.captures(trimmed) {
        let days: i64 = caps[1].parse().context("relative day count out of range")?;
        return Ok(now + Duration::days(days));
    }

    let date = parse_ymd(trimmed)?;
    Ok(end_of_day(date))
}

/// Strict `YYYY-MM-DD`, the shape the conversion collaborator promises.
pub fn parse_ymd(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {raw}"))
}

pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let eod = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    date.and_time(eod).and_utc()
}
