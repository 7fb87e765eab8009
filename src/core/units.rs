//! Duration units: formatting, axis ticks and free-text parsing
//!
//! Everything is driven by one ladder of (unit seconds, multiple) steps so the
//! labels on the y-axis, the slider and the popups agree with each other.

use thiserror::Error;

pub const DAY_SECONDS: f64 = 60.0 * 60.0 * 24.0;

struct Step {
    unit: f64,
    multiple: f64,
    long: &'static str,
    short: &'static str,
    priority: u8,
}

impl Step {
    const fn new(unit: f64, multiple: f64, long: &'static str, short: &'static str, priority: u8) -> Self {
        Self { unit, multiple, long, short, priority }
    }

    fn size(&self) -> f64 {
        self.unit * self.multiple
    }
}

const YEAR: f64 = 3.077914e7;

const LADDER: &[Step] = &[
    Step::new(1.0, 1.0, "second", "s", 3),
    Step::new(1.0, 5.0, "second", "s", 1),
    Step::new(1.0, 15.0, "second", "s", 2),
    Step::new(60.0, 1.0, "minute", "min", 3),
    Step::new(60.0, 5.0, "minute", "min", 1),
    Step::new(60.0, 15.0, "minute", "min", 2),
    Step::new(3_600.0, 1.0, "hour", "h", 3),
    Step::new(3_600.0, 4.0, "hour", "h", 1),
    Step::new(3_600.0, 12.0, "hour", "h", 2),
    Step::new(86_400.0, 1.0, "day", "d", 1),
    Step::new(604_800.0, 1.0, "week", "wk", 1),
    Step::new(2.629728e6, 1.0, "month", "mo", 1),
    Step::new(YEAR, 1.0, "year", "a", 3),
    Step::new(YEAR, 5.0, "year", "a", 2),
    Step::new(YEAR, 10.0, "year", "a", 1),
    Step::new(YEAR, 50.0, "year", "a", 1),
    Step::new(YEAR, 100.0, "year", "a", 1),
    Step::new(YEAR, 500.0, "year", "a", 1),
    Step::new(YEAR, 1000.0, "year", "a", 1),
];

/// Highest ladder step that still fits into `value`
fn step_for(value: f64) -> usize {
    let mut i = LADDER.len() - 1;
    while i > 0 && value / LADDER[i].size() < 1.0 {
        i -= 1;
    }
    i
}

/// Fixed-point formatting with trailing zeros removed ("1.50" -> "1.5", "2.0" -> "2")
pub fn format_trimmed(value: f64, precision: usize) -> String {
    let mut text = format!("{value:.precision$}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Format a duration in seconds with the largest fitting unit,
/// e.g. `"1.5d"` or `"1.5 days"` in long form
pub fn format_duration(seconds: f64, precision: usize, long: bool) -> String {
    let step = &LADDER[step_for(seconds)];
    let number = format_trimmed(seconds / step.unit, precision);
    if long {
        let plural = if number == "1" { "" } else { "s" };
        format!("{number} {}{plural}", step.long)
    } else {
        format!("{number}{}", step.short)
    }
}

/// A tick position and its label priority (higher survives label culling)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub priority: u8,
}

/// Ticks for a logarithmic period axis. Each ladder step contributes its
/// multiples between the next smaller step and the next larger one; the first
/// multiple of a step gets a raised priority and the domain ends get the
/// highest priority.
pub fn ticks(domain: [f64; 2]) -> Vec<Tick> {
    let [start, end] = domain;
    let mut result: Vec<Tick> = Vec::new();
    let mut end_value = end;

    let mut i = step_for(end) as isize;
    while i >= 0 && start / LADDER[i as usize].size() <= 1.0 {
        let step = &LADDER[i as usize];
        let size = step.size();
        let limit = end_value - size / 2.0;

        let mut entries = Vec::new();
        let mut k = 1.0;
        while k * size < limit {
            let value = k * size;
            if value > start {
                let priority = if k == 1.0 { step.priority + 3 } else { step.priority };
                entries.push(Tick { value, priority });
            }
            k += 1.0;
        }
        result.splice(0..0, entries);

        end_value = size;
        i -= 1;
    }

    match result.first_mut() {
        Some(first) if (start / first.value - 1.0).abs() <= 0.3 => first.priority = 7,
        _ => result.insert(0, Tick { value: start, priority: 7 }),
    }
    if let Some(last) = result.last() {
        if (end / last.value - 1.0).abs() > 0.3 {
            result.push(Tick { value: end, priority: 7 });
        }
    }
    result
}

/// Evenly spaced ticks on ladder multiples for a linear time axis,
/// with the domain ends always included
pub fn linear_ticks(domain: [f64; 2], count: usize) -> Vec<f64> {
    let [start, end] = domain;
    let delta = (end - start) / count.max(1) as f64;

    let mut i = step_for(delta);
    if i < LADDER.len() - 1 {
        i += 1;
    }
    let size = LADDER[i].size();

    let first = (start / size).ceil() as i64;
    let last = (end / size).floor() as i64;
    let mut result: Vec<f64> = (first..=last).map(|k| k as f64 * size).collect();

    if result.first().map_or(true, |&t| start < t) {
        result.insert(0, start);
    }
    if result.last().map_or(true, |&t| end > t) {
        result.push(end);
    }
    result
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DurationError {
    #[error("unparsable duration: {0:?}")]
    Unparsable(String),

    #[error("unknown unit: {0:?}")]
    UnknownUnit(String),
}

/// Parse free text such as `"3d"`, `"12 hours"` or `"1.5 wk"` into seconds.
/// Accepts each unit's long name, its plural and its short name.
pub fn parse_duration(text: &str) -> Result<f64, DurationError> {
    let unparsable = || DurationError::Unparsable(text.to_string());
    let trimmed = text.trim();

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(unparsable)?;
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim_start();

    let valid_number = match number.split_once('.') {
        Some((int, frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => !number.is_empty(),
    };
    if !valid_number || unit.is_empty() || !unit.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(unparsable());
    }
    let amount: f64 = number.parse().map_err(|_| unparsable())?;

    LADDER
        .iter()
        .filter(|step| step.multiple == 1.0)
        .find(|step| unit == step.long || unit == step.short || unit.strip_suffix('s') == Some(step.long))
        .map(|step| amount * step.unit)
        .ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))
}

/// Clamp `value` to `[min, max]`. When `min > max` the lower bound wins.
pub fn clamp(min: f64, value: f64, max: f64) -> f64 {
    if min > max {
        return min;
    }
    value.max(min).min(max)
}
