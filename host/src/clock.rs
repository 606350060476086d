//! ==============================================================================
//! clock.rs - analog and digital clock face
//! ==============================================================================
//!
//! geometry (100x100 svg viewbox, centre 50,50):
//!     hour hand   = (h mod 12) * 30 + m * 0.5 degrees
//!     minute hand = m * 6 degrees
//!     second hand = s * 6 degrees
//!     twelve hour markers on a circle of radius 38, 0 degrees at twelve o'clock
//!
//! ==============================================================================

use chrono::{DateTime, Datelike, TimeZone, Timelike};

const WEEKDAYS: [&str; 7] = ["星期日", "星期一", "星期二", "星期三", "星期四", "星期五", "星期六"];
const MARKER_RADIUS: f64 = 38.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ClockFace {
    pub hour_deg: f64,
    pub minute_deg: f64,
    pub second_deg: f64,
    /// e.g. "星期五"
    pub weekday: &'static str,
    /// e.g. "2026/10/16"
    pub date: String,
    /// 24-hour, e.g. "08:05:09"
    pub time: String,
}

impl ClockFace {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let (h, m, s) = (now.hour(), now.minute(), now.second());

        Self {
            hour_deg: f64::from(h % 12) * 30.0 + f64::from(m) * 0.5,
            minute_deg: f64::from(m) * 6.0,
            second_deg: f64::from(s) * 6.0,
            weekday: WEEKDAYS[now.weekday().num_days_from_sunday() as usize],
            date: format!("{}/{}/{}", now.year(), now.month(), now.day()),
            time: format!("{:02}:{:02}:{:02}", h, m, s),
        }
    }
}

/// (x, y) centres of the twelve hour markers
pub fn hour_markers() -> impl Iterator<Item = (f64, f64)> {
    (0..12).map(|i| {
        let rad = (f64::from(i * 30) - 90.0).to_radians();
        (50.0 + MARKER_RADIUS * rad.cos(), 50.0 + MARKER_RADIUS * rad.sin())
    })
}
