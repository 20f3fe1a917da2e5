//! Kubernetes resource quantity parsing.
//!
//! Only what is needed to compare requests against limits: a quantity is
//! reduced to an `f64` in base units (cores or bytes).

use crate::error::ManifestError;

/// Parse a quantity such as `100m`, `0.5`, `128Mi` or `1e3` into base units.
pub fn parse_quantity(value: &str) -> Result<f64, ManifestError> {
    parse(value).ok_or_else(|| ManifestError::InvalidQuantity {
        field: "quantity",
        value: value.to_string(),
    })
}

pub(crate) fn parse(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);

    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(split);

    if number.is_empty() || number == "." || number.matches('.').count() > 1 {
        return None;
    }
    let base: f64 = number.parse().ok()?;

    let multiplier = match suffix {
        "" => 1.0,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        exp if exp.starts_with(['e', 'E']) => {
            let exponent: i32 = exp[1..].parse().ok()?;
            10f64.powi(exponent)
        }
        _ => return None,
    };

    Some(base * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("100m", 0.1)]
    #[case("200m", 0.2)]
    #[case("1", 1.0)]
    #[case("0.5", 0.5)]
    #[case("128Mi", 134_217_728.0)]
    #[case("1Gi", 1_073_741_824.0)]
    #[case("2k", 2000.0)]
    #[case("1e3", 1000.0)]
    #[case("+3", 3.0)]
    fn parses_valid_quantities(#[case] input: &str, #[case] expected: f64) {
        let parsed = parse_quantity(input).unwrap();
        assert!((parsed - expected).abs() < 1e-9, "{input} -> {parsed}");
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("10Xi")]
    #[case("1.2.3")]
    #[case("-1")]
    #[case("m")]
    fn rejects_invalid_quantities(#[case] input: &str) {
        assert!(parse_quantity(input).is_err());
    }
}
