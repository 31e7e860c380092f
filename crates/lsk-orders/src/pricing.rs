//! Integer-cents pricing math.
//!
//! # Design invariant
//!
//! All amounts on internal surfaces are `i64` integer cents. The only place
//! a decimal representation exists is the provider wire boundary
//! ([`format_cents`] / [`parse_cents`]); no `f64` appears anywhere. Rounding
//! of the pro-rata minute tier is half-up, matching the settlement ledger.

use chrono::{DateTime, Duration, Utc};
use lsk_directory::PricingTiers;

use crate::error::MarketError;
use crate::types::{DurationUnit, LeaseTerm};

/// Longest lease a single term may request, in days. Catches fat-fingered
/// durations before the multiply can overflow anything downstream.
const MAX_TERM_DAYS: i64 = 90;

/// Round-half-up integer division for non-negative operands.
fn div_round_half_up(num: i64, den: i64) -> i64 {
    (2 * num + den) / (2 * den)
}

/// A priced lease window: when it ends and what the rent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub end_time: DateTime<Utc>,
    pub rent_cents: i64,
}

/// Price a term starting (or extending) at `from`.
///
/// - `minute`: pro-rata on the 30-minute tier, rounded half-up.
/// - `hour`: whole-hour tier times the hour count.
/// - `overnight`: flat tier; the window ends 08:00 the day after `from`.
///
/// # Errors
/// [`MarketError::InvalidDuration`] for non-positive or absurd durations.
pub fn quote(
    pricing: &PricingTiers,
    term: &LeaseTerm,
    from: DateTime<Utc>,
) -> Result<Quote, MarketError> {
    match term.unit {
        DurationUnit::Minute => {
            check_duration(term.duration, MAX_TERM_DAYS * 24 * 60)?;
            let rent = pricing
                .per_half_hour_cents
                .checked_mul(term.duration)
                .map(|n| div_round_half_up(n, 30))
                .ok_or_else(|| MarketError::InvalidDuration("rent overflows".to_string()))?;
            Ok(Quote {
                end_time: from + Duration::minutes(term.duration),
                rent_cents: rent,
            })
        }
        DurationUnit::Hour => {
            check_duration(term.duration, MAX_TERM_DAYS * 24)?;
            let rent = pricing
                .per_hour_cents
                .checked_mul(term.duration)
                .ok_or_else(|| MarketError::InvalidDuration("rent overflows".to_string()))?;
            Ok(Quote {
                end_time: from + Duration::hours(term.duration),
                rent_cents: rent,
            })
        }
        DurationUnit::Overnight => {
            let next_morning = (from + Duration::days(1))
                .date_naive()
                .and_hms_opt(8, 0, 0)
                .ok_or_else(|| MarketError::InvalidDuration("overnight end time".to_string()))?
                .and_utc();
            Ok(Quote {
                end_time: next_morning,
                rent_cents: pricing.overnight_cents,
            })
        }
    }
}

fn check_duration(duration: i64, max: i64) -> Result<(), MarketError> {
    if duration <= 0 {
        return Err(MarketError::InvalidDuration(
            "duration must be positive".to_string(),
        ));
    }
    if duration > max {
        return Err(MarketError::InvalidDuration(format!(
            "duration {duration} exceeds the {MAX_TERM_DAYS}-day cap"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wire-boundary conversion
// ---------------------------------------------------------------------------

/// Render cents as the provider's decimal-string amount ("20.50").
/// Only call when building a gateway request.
pub fn format_cents(cents: i64) -> String {
    debug_assert!(cents >= 0, "charge amounts are non-negative");
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Parse a provider decimal-string amount into cents.
/// Only call when ingesting callback / query payloads.
///
/// # Errors
/// [`MarketError::Validation`] for malformed input or more than two
/// fractional digits.
pub fn parse_cents(s: &str) -> Result<i64, MarketError> {
    let bad = || MarketError::Validation(format!("malformed amount: {s}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let whole: i64 = whole.parse().map_err(|_| bad())?;
    if whole < 0 {
        return Err(bad());
    }
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| bad())? * 10,
        _ => frac.parse::<i64>().map_err(|_| bad())?,
    };
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or_else(bad)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
