//! Number formatting for the legacy text formats.
//!
//! Two styles are needed:
//! - `general`: C's `%g` (what a default C++ stream prints), used for
//!   intrinsics and prior focal lengths
//! - `full`: the shortest decimal that round-trips the `f64` exactly, used
//!   for poses, points and observations
//!
//! Both print negative zero as `0`.

use std::fmt;

/// Significant digits of a default-configured C++ output stream.
pub const DEFAULT_PRECISION: usize = 6;

/// Format like C's `%.{precision}g`.
pub fn general(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value).to_string();
    }
    let value = value + 0.0;
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// `%g` with the default stream precision.
pub fn default_precision(value: f64) -> String {
    general(value, DEFAULT_PRECISION)
}

/// Display adapter printing an `f64` at full precision.
#[derive(Clone, Copy, Debug)]
pub struct Full(pub f64);

impl fmt::Display for Full {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_finite() {
            return f.write_str(non_finite(self.0));
        }
        // -0.0 + 0.0 == +0.0
        write!(f, "{}", self.0 + 0.0)
    }
}

/// Space-separated full-precision values, no column padding.
pub struct Row<'a>(pub &'a [f64]);

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", Full(*value))?;
        }
        Ok(())
    }
}

fn non_finite(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
