//! Spreadsheet date handling
//!
//! Spreadsheets store dates as serial day numbers counted from 1899-12-30 with a display
//! format code such as `mm/dd/yyyy`. This module converts between serials and
//! [`NaiveDateTime`], renders a date through such a format code for text output, and
//! recognises format codes that denote dates when reading.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

const MS_PER_DAY: f64 = 86_400_000.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
}

fn leap_bug_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or_default()
}

/// Convert a date-time into a spreadsheet serial number
///
/// Dates before 1900-03-01 are shifted by one day to match the phantom 1900-02-29
/// that spreadsheet applications keep for compatibility.
pub fn to_serial(dt: &NaiveDateTime) -> f64 {
    let delta = *dt - epoch();
    let mut serial = delta.num_milliseconds() as f64 / MS_PER_DAY;
    if dt.date() < leap_bug_cutoff() {
        serial -= 1.0;
    }
    serial
}

/// Convert a spreadsheet serial number back into a date-time (millisecond precision)
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let serial = if serial < 61.0 { serial + 1.0 } else { serial };
    let ms = (serial * MS_PER_DAY).round() as i64;
    epoch().checked_add_signed(Duration::milliseconds(ms))
}

/// Built-in number format ids that display dates or times
pub fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Check whether a custom number format code displays a date or time
pub fn is_date_format_code(code: &str) -> bool {
    tokenize(code).iter().any(|t| {
        matches!(
            t,
            Token::Year(_)
                | Token::Month(_)
                | Token::Minute(_)
                | Token::Day(_)
                | Token::Hour(_)
                | Token::Second(_)
        )
    })
}

/// Render a date-time through a spreadsheet-style format code
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use sheetcodec::dates::format_date;
///
/// let dt = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// assert_eq!(format_date(&dt, "mm/dd/yyyy"), "01/15/2024");
/// ```
pub fn format_date(dt: &NaiveDateTime, format: &str) -> String {
    let tokens = tokenize(format);
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm(_)));
    let mut out = String::with_capacity(format.len() + 4);

    for token in &tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Year(n) => {
                if *n <= 2 {
                    out.push_str(&format!("{:02}", dt.year().rem_euclid(100)));
                } else {
                    out.push_str(&format!("{:04}", dt.year()));
                }
            }
            Token::Month(n) => {
                let name = MONTH_NAMES[dt.month0() as usize];
                match n {
                    1 => out.push_str(&dt.month().to_string()),
                    2 => out.push_str(&format!("{:02}", dt.month())),
                    3 => out.push_str(&name[..3]),
                    5 => out.push_str(&name[..1]),
                    _ => out.push_str(name),
                }
            }
            Token::Day(n) => match n {
                1 => out.push_str(&dt.day().to_string()),
                2 => out.push_str(&format!("{:02}", dt.day())),
                3 => out.push_str(&dt.weekday().to_string()),
                _ => out.push_str(weekday_name(dt.weekday())),
            },
            Token::Hour(n) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                push_padded(&mut out, hour, *n);
            }
            Token::Minute(n) => push_padded(&mut out, dt.minute(), *n),
            Token::Second(n) => push_padded(&mut out, dt.second(), *n),
            Token::AmPm(short) => {
                let pm = dt.hour() >= 12;
                out.push_str(match (short, pm) {
                    (false, false) => "AM",
                    (false, true) => "PM",
                    (true, false) => "A",
                    (true, true) => "P",
                });
            }
        }
    }

    out
}

fn push_padded(out: &mut String, value: u32, width: usize) {
    if width >= 2 {
        out.push_str(&format!("{:02}", value));
    } else {
        out.push_str(&value.to_string());
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    /// true for the single-letter `A/P` form
    AmPm(bool),
}

fn tokenize(format: &str) -> Vec<Token> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let ahead5: String = chars[i..].iter().take(5).collect();
        let ahead3: String = chars[i..].iter().take(3).collect();

        if ahead5.eq_ignore_ascii_case("am/pm") {
            tokens.push(Token::AmPm(false));
            i += 5;
            continue;
        }
        if ahead3.eq_ignore_ascii_case("a/p") {
            tokens.push(Token::AmPm(true));
            i += 3;
            continue;
        }

        match ch {
            '"' => {
                let mut literal = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    literal.push(chars[i]);
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Literal(literal));
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                i += 2;
            }
            '[' => {
                // Color and locale sections carry no output
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                i += 1;
            }
            c if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') => {
                let lower = c.to_ascii_lowercase();
                let start = i;
                while i < chars.len() && chars[i].to_ascii_lowercase() == lower {
                    i += 1;
                }
                let n = i - start;
                tokens.push(match lower {
                    'y' => Token::Year(n),
                    'm' => Token::Month(n),
                    'd' => Token::Day(n),
                    'h' => Token::Hour(n),
                    _ => Token::Second(n),
                });
            }
            c => {
                match tokens.last_mut() {
                    Some(Token::Literal(s)) => s.push(c),
                    _ => tokens.push(Token::Literal(c.to_string())),
                }
                i += 1;
            }
        }
    }

    resolve_minutes(&mut tokens);
    tokens
}

/// `m`/`mm` next to an hour or second token means minutes, not months
fn resolve_minutes(tokens: &mut [Token]) {
    for idx in 0..tokens.len() {
        let n = match tokens[idx] {
            Token::Month(n) if n <= 2 => n,
            _ => continue,
        };
        let prev = tokens[..idx]
            .iter()
            .rev()
            .find(|t| !matches!(t, Token::Literal(_)));
        let next = tokens[idx + 1..]
            .iter()
            .find(|t| !matches!(t, Token::Literal(_)));
        if matches!(prev, Some(Token::Hour(_))) || matches!(next, Some(Token::Second(_))) {
            tokens[idx] = Token::Minute(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_serial_known_values() {
        assert_eq!(to_serial(&dt(1900, 1, 1, 0, 0, 0)), 1.0);
        assert_eq!(to_serial(&dt(1900, 3, 1, 0, 0, 0)), 61.0);
        assert_eq!(to_serial(&dt(2024, 1, 15, 0, 0, 0)), 45306.0);
        assert_eq!(to_serial(&dt(2024, 1, 15, 12, 0, 0)), 45306.5);
    }

    #[test]
    fn test_serial_back_to_date() {
        for value in [
            dt(1900, 1, 1, 0, 0, 0),
            dt(1999, 12, 31, 23, 59, 59),
            dt(2024, 2, 29, 10, 30, 5),
        ] {
            assert_eq!(from_serial(to_serial(&value)), Some(value));
        }
        assert_eq!(from_serial(-1.0), None);
        assert_eq!(from_serial(f64::NAN), None);
    }

    #[test]
    fn test_format_common_patterns() {
        let d = dt(2024, 1, 15, 14, 5, 9);
        assert_eq!(format_date(&d, "mm/dd/yyyy"), "01/15/2024");
        assert_eq!(format_date(&d, "yyyy-mm-dd"), "2024-01-15");
        assert_eq!(format_date(&d, "d-mmm-yy"), "15-Jan-24");
        assert_eq!(format_date(&d, "dddd, mmmm d"), "Monday, January 15");
        assert_eq!(format_date(&d, "hh:mm:ss"), "14:05:09");
        assert_eq!(format_date(&d, "h:mm AM/PM"), "2:05 PM");
        assert_eq!(format_date(&d, "yyyy\"年\"m\"月\""), "2024年1月");
    }

    #[test]
    fn test_date_format_detection() {
        assert!(is_date_format_code("mm/dd/yyyy"));
        assert!(is_date_format_code("[$-409]d-mmm-yy;@"));
        assert!(is_date_format_code("h:mm"));
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("0.00%"));
        assert!(!is_date_format_code("\"days\" 0"));
        assert!(is_builtin_date_format(14));
        assert!(!is_builtin_date_format(2));
    }
}
