//! Heuristic normalization of the note's display date.
//!
//! Xiaohongshu shows dates as "3分钟前", "昨天 14:30", "06-01 广东",
//! "编辑于 2023-11-02" and so on. [`RULES`] is an ordered table of
//! `(pattern, resolver)` pairs evaluated top to bottom; the first resolver
//! that produces an instant wins and is rendered as `YYYY-MM-DD HH:MM:SS`.
//! Text no rule understands falls through to its first whitespace token.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use regex::{Captures, Regex};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static EDIT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)编辑于|\bedited(?:\s+on)?\b").unwrap());

/// Resolves a matched rule against the current instant. `None` falls through
/// to the next rule.
type Resolver = fn(&Captures<'_>, NaiveDateTime) -> Option<NaiveDateTime>;

pub(crate) struct Rule {
    pub name: &'static str,
    pattern: Regex,
    /// The rule is skipped when this also matches the cleaned text.
    unless: Option<Regex>,
    resolve: Resolver,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, resolve: Resolver) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            unless: None,
            resolve,
        }
    }

    fn unless(mut self, pattern: &str) -> Self {
        self.unless = Some(Regex::new(pattern).unwrap());
        self
    }

    fn apply(&self, text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.unless.as_ref().is_some_and(|re| re.is_match(text)) {
            return None;
        }
        let caps = self.pattern.captures(text)?;
        (self.resolve)(&caps, now)
    }
}

pub(crate) static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "minutes_ago",
            r"(?i)(\d+)\s*(?:分钟前|min(?:ute)?s?\s+ago)",
            minutes_ago,
        ),
        Rule::new(
            "hours_ago",
            r"(?i)(\d+)\s*(?:小时前|h(?:ou)?rs?\s+ago)",
            hours_ago,
        ),
        Rule::new(
            "yesterday",
            r"(?i)(\d{1,2}):(\d{1,2}).*?(?:昨天|yesterday)|(?:昨天|yesterday)(?:.*?(\d{1,2}):(\d{1,2}))?",
            yesterday,
        ),
        Rule::new("days_ago", r"(?i)(\d+)\s*(?:天前|days?\s+ago)", days_ago),
        Rule::new("month_day", r"(\d{1,2})-(\d{1,2})", month_day)
            .unless(r"\d{4}-\d{1,2}-\d{1,2}"),
        Rule::new("full_date", r"(\d{4})-(\d{1,2})-(\d{1,2})", full_date),
    ]
});

fn number<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn minutes_ago(caps: &Captures<'_>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    now.checked_sub_signed(TimeDelta::try_minutes(number(caps, 1)?)?)
}

fn hours_ago(caps: &Captures<'_>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    now.checked_sub_signed(TimeDelta::try_hours(number(caps, 1)?)?)
}

/// With an explicit `H:M` on either side of the marker, yesterday at that
/// time. Without one, the current time of day is carried over rather than
/// zeroed.
fn yesterday(caps: &Captures<'_>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let past = now.checked_sub_signed(TimeDelta::try_days(1)?)?;
    let clock = |h, m| Some((number::<i64>(caps, h)?, number::<i64>(caps, m)?));
    match clock(1, 2).or_else(|| clock(3, 4)) {
        // Out-of-range values roll over (25:00 is the next day at 01:00).
        Some((hour, minute)) => past
            .date()
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(TimeDelta::try_hours(hour)?)?
            .checked_add_signed(TimeDelta::try_minutes(minute)?),
        _ => Some(past),
    }
}

fn days_ago(caps: &Captures<'_>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    now.checked_sub_signed(TimeDelta::try_days(number(caps, 1)?)?)
}

fn month_day(caps: &Captures<'_>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(now.year(), number(caps, 1)?, number(caps, 2)?)?.and_hms_opt(0, 0, 0)
}

fn full_date(caps: &Captures<'_>, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(number(caps, 1)?, number(caps, 2)?, number(caps, 3)?)?
        .and_hms_opt(0, 0, 0)
}

/// Strip the "edited at" marker and surrounding whitespace.
fn clean(raw: &str) -> String {
    EDIT_MARKER.replace(raw, "").trim().to_string()
}

pub fn format_instant(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Resolve display text to an absolute instant, if any rule understands it.
pub fn resolve(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    resolve_cleaned(&clean(raw), now)
}

fn resolve_cleaned(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    RULES.iter().find_map(|rule| {
        let instant = rule.apply(text, now)?;
        tracing::trace!(rule = rule.name, text, "Resolved display date");
        Some(instant)
    })
}

/// Normalize a display date to `YYYY-MM-DD HH:MM:SS`.
///
/// Empty input yields an empty string. Text no rule resolves is returned as
/// its first whitespace-delimited token, unmodified.
pub fn normalize_timestamp(raw: &str, now: NaiveDateTime) -> String {
    let text = clean(raw);
    if text.is_empty() {
        return String::new();
    }
    match resolve_cleaned(&text, now) {
        Some(instant) => format_instant(instant),
        None => text.split_whitespace().next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn now() -> NaiveDateTime {
        at("2024-06-10 12:00:00")
    }

    fn rule_for(text: &str) -> Option<&'static str> {
        RULES
            .iter()
            .find(|rule| rule.apply(text, now()).is_some())
            .map(|rule| rule.name)
    }

    #[test]
    fn rules_are_ordered_by_priority() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["minutes_ago", "hours_ago", "yesterday", "days_ago", "month_day", "full_date"]
        );
    }

    #[test]
    fn relative_units_subtract_exactly() {
        for n in [0i64, 1, 5, 59, 120] {
            assert_eq!(
                normalize_timestamp(&format!("{n}分钟前"), now()),
                format_instant(now() - TimeDelta::minutes(n))
            );
            assert_eq!(
                normalize_timestamp(&format!("{n} minutes ago"), now()),
                format_instant(now() - TimeDelta::minutes(n))
            );
            assert_eq!(
                normalize_timestamp(&format!("{n}小时前"), now()),
                format_instant(now() - TimeDelta::hours(n))
            );
            assert_eq!(
                normalize_timestamp(&format!("{n} hours ago"), now()),
                format_instant(now() - TimeDelta::hours(n))
            );
            assert_eq!(
                normalize_timestamp(&format!("{n}天前"), now()),
                format_instant(now() - TimeDelta::days(n))
            );
            assert_eq!(
                normalize_timestamp(&format!("{n} days ago"), now()),
                format_instant(now() - TimeDelta::days(n))
            );
        }
    }

    #[test]
    fn days_with_space_before_unit() {
        assert_eq!(normalize_timestamp("3 天前", now()), "2024-06-07 12:00:00");
    }

    #[test]
    fn days_cross_month_boundary() {
        assert_eq!(normalize_timestamp("12天前", now()), "2024-05-29 12:00:00");
    }

    #[test]
    fn month_day_uses_current_year_at_midnight() {
        assert_eq!(normalize_timestamp("06-01", now()), "2024-06-01 00:00:00");
        assert_eq!(normalize_timestamp("6-1 广东", now()), "2024-06-01 00:00:00");
    }

    #[test]
    fn full_date_is_zero_padded_at_midnight() {
        assert_eq!(normalize_timestamp("2023-11-02", now()), "2023-11-02 00:00:00");
        assert_eq!(normalize_timestamp("发布于 2023-1-2 北京", now()), "2023-01-02 00:00:00");
    }

    #[test]
    fn full_date_is_not_mistaken_for_month_day() {
        assert_eq!(rule_for("2023-11-02"), Some("full_date"));
        assert_eq!(rule_for("11-02"), Some("month_day"));
    }

    #[test]
    fn edited_marker_is_stripped() {
        assert_eq!(normalize_timestamp("编辑于 2天前", now()), "2024-06-08 12:00:00");
        assert_eq!(normalize_timestamp("Edited 05-20", now()), "2024-05-20 00:00:00");
        assert_eq!(normalize_timestamp("编辑于 重庆", now()), "重庆");
    }

    #[test]
    fn yesterday_with_time() {
        assert_eq!(normalize_timestamp("昨天 09:05", now()), "2024-06-09 09:05:00");
        assert_eq!(normalize_timestamp("Yesterday 23:59", now()), "2024-06-09 23:59:00");
    }

    #[test]
    fn yesterday_time_may_precede_the_marker() {
        let now = at("2024-06-10 15:42:17");
        assert_eq!(normalize_timestamp("14:30 昨天", now), "2024-06-09 14:30:00");
        assert_eq!(normalize_timestamp("08:05 yesterday", now), "2024-06-09 08:05:00");
    }

    #[test]
    fn yesterday_without_time_keeps_current_time_of_day() {
        let now = at("2024-06-10 15:42:17");
        assert_eq!(normalize_timestamp("昨天", now), "2024-06-09 15:42:17");
        assert_eq!(normalize_timestamp("yesterday 上海", now), "2024-06-09 15:42:17");
    }

    #[test]
    fn yesterday_across_year_boundary() {
        let now = at("2024-01-01 08:00:00");
        assert_eq!(normalize_timestamp("昨天 20:00", now), "2023-12-31 20:00:00");
    }

    #[test]
    fn minutes_take_priority_over_everything_else() {
        assert_eq!(rule_for("昨天 5分钟前"), Some("minutes_ago"));
    }

    #[test]
    fn unknown_text_returns_first_token() {
        assert_eq!(normalize_timestamp("刚刚 广东", now()), "刚刚");
        assert_eq!(normalize_timestamp("  just now  ", now()), "just");
    }

    #[test]
    fn impossible_calendar_dates_fall_through() {
        assert_eq!(normalize_timestamp("13-45", now()), "13-45");
        assert_eq!(normalize_timestamp("2023-02-30", now()), "2023-02-30");
    }

    #[test]
    fn absurd_magnitudes_do_not_panic() {
        let out = normalize_timestamp("99999999999999999999天前", now());
        assert_eq!(out, "99999999999999999999天前");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_timestamp("", now()), "");
        assert_eq!(normalize_timestamp("   ", now()), "");
        assert_eq!(normalize_timestamp("编辑于", now()), "");
    }
}
