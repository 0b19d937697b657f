//! src/util/humanize.rs
//! ============================================================================
//! Display formatting for field values.

use std::time::{Duration, SystemTime};

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use compact_str::{CompactString, format_compact};

/// Byte count with SI units, e.g. `2.3 MB`.
#[must_use]
pub fn human_readable_size(size: u64) -> CompactString {
    format_compact!("{}", ByteSize::b(size).display().si())
}

/// `1 item`, `7 items`.
#[must_use]
pub fn item_count(count: usize) -> CompactString {
    if count == 1 {
        CompactString::const_new("1 item")
    } else {
        format_compact!("{count} items")
    }
}

/// Whole hertz below 1 kHz, otherwise kilohertz with one decimal.
#[must_use]
pub fn sample_rate(hertz: f64) -> CompactString {
    if hertz < 1000.0 {
        format_compact!("{hertz:.0} Hz")
    } else {
        format_compact!("{:.1} kHz", hertz / 1000.0)
    }
}

/// Decimal bit rate with at most two fraction digits.
#[must_use]
pub fn bitrate(bits_per_second: f64) -> CompactString {
    let (value, unit) = if bits_per_second < 1e3 {
        (bits_per_second, "bps")
    } else if bits_per_second < 1e6 {
        (bits_per_second / 1e3, "kbps")
    } else if bits_per_second < 1e9 {
        (bits_per_second / 1e6, "Mbps")
    } else {
        (bits_per_second / 1e9, "Gbps")
    };

    format_compact!("{} {unit}", trim_fraction(value))
}

/// `m:ss`, or `h:mm:ss` past the hour mark.
#[must_use]
pub fn duration(length: Duration) -> CompactString {
    let secs = length.as_secs_f64();
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "non-negative, rounded")]
    let total = secs.round() as u64;

    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);

    if secs > 3599.0 {
        format_compact!("{h}:{m:02}:{s:02}")
    } else {
        format_compact!("{}:{s:02}", total / 60)
    }
}

/// `1920 × 1080`.
#[must_use]
pub fn dimensions(width: u32, height: u32) -> CompactString {
    format_compact!("{width} × {height}")
}

/// Medium date, short time, local zone; today and yesterday are named.
#[must_use]
pub fn date(time: SystemTime) -> CompactString {
    format_date_relative(DateTime::<Local>::from(time), Local::now())
}

fn format_date_relative(dt: DateTime<Local>, now: DateTime<Local>) -> CompactString {
    let time = dt.format("%-I:%M %p");
    let day = dt.date_naive();
    let today = now.date_naive();

    if day == today {
        format_compact!("Today at {time}")
    } else if today.pred_opt() == Some(day) {
        format_compact!("Yesterday at {time}")
    } else {
        format_compact!("{} at {time}", dt.format("%b %-d, %Y"))
    }
}

/// Exposure time as a fraction, e.g. `0.004` → `1/250`.
#[must_use]
pub fn shutter_speed(seconds: f64) -> CompactString {
    let (num, den) = approximate_fraction(seconds, 1.0e-6, 100_000);
    format_compact!("{num}/{den}")
}

/// Continued-fraction approximation of `x` within `tolerance`.
fn approximate_fraction(x: f64, tolerance: f64, max_denominator: u64) -> (u64, u64) {
    if !x.is_finite() || x <= 0.0 {
        return (0, 1);
    }

    let (mut h_prev, mut h) = (0u64, 1u64);
    let (mut k_prev, mut k) = (1u64, 0u64);
    let mut rest = x;

    loop {
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "positive")]
        let a = rest.floor() as u64;

        let h_next = a.saturating_mul(h).saturating_add(h_prev);
        let k_next = a.saturating_mul(k).saturating_add(k_prev);
        if k_next > max_denominator {
            break;
        }
        (h_prev, h) = (h, h_next);
        (k_prev, k) = (k, k_next);

        #[expect(clippy::cast_precision_loss, reason = "small values")]
        let approx = h as f64 / k as f64;
        let frac = rest - rest.floor();
        if (x - approx).abs() < tolerance * x || frac < f64::EPSILON {
            break;
        }
        rest = 1.0 / frac;
    }

    if k == 0 { (h_prev.max(1), 1) } else { (h, k) }
}

fn trim_fraction(value: f64) -> CompactString {
    let text = format_compact!("{value:.2}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    CompactString::new(trimmed)
}
