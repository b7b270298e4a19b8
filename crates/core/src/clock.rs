use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Wall-clock dependency injected into the expression evaluator so
/// `TODAY()`/`NOW()`/`DAY()`/`MONTH()`/`YEAR()` are deterministic under test
/// (§4.2.4/§4.2.5/§9: "treat clock as an injected dependency in tests").
pub trait Clock: std::fmt::Debug {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_today(dt: &NaiveDateTime) -> String {
    format!("{:04}/{:02}/{:02}", dt.year(), dt.month(), dt.day())
}

pub fn format_day(dt: &NaiveDateTime) -> String {
    format!("{:02}", dt.day())
}

pub fn format_month(dt: &NaiveDateTime) -> String {
    format!("{:02}", dt.month())
}

pub fn format_year(dt: &NaiveDateTime) -> String {
    format!("{:04}", dt.year())
}

pub fn format_now(dt: &NaiveDateTime) -> String {
    format!("{:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_formats() {
        let dt = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 5, 3).unwrap();
        let clock = FixedClock(dt);
        assert_eq!(format_today(&clock.now()), "2026/07/27");
        assert_eq!(format_now(&clock.now()), "09:05:03");
        assert_eq!(format_day(&clock.now()), "27");
        assert_eq!(format_month(&clock.now()), "07");
        assert_eq!(format_year(&clock.now()), "2026");
    }
}
