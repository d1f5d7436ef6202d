//! Storage quantity parsing
//!
//! Converts human-written storage sizes ("10Gi", "500M", "1.5Ti") into
//! byte counts, validates volume claim requests, and renders aggregated
//! totals back into canonical quantity strings.

use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::VolumeResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Resource name of the storage request within a claim
pub const STORAGE_RESOURCE: &str = "storage";

const BINARY_SUFFIXES: &[(&str, u128)] = &[
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

const DECIMAL_SUFFIXES: &[(&str, u128)] = &[
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// Parse a quantity expression into bytes.
///
/// Supports plain integers, an optional decimal mantissa, and the
/// Kubernetes binary (Ki..Ei) and decimal (k..E) suffixes. Fractional
/// byte results round up, matching platform canonicalization.
pub fn parse_quantity(value: &str) -> Result<u128> {
    let parse_err = || Error::CapacityParse {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(parse_err());
    }

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (mantissa, suffix) = trimmed.split_at(digits_end);
    if mantissa.is_empty() {
        return Err(parse_err());
    }

    let multiplier = if suffix.is_empty() {
        1
    } else {
        BINARY_SUFFIXES
            .iter()
            .chain(DECIMAL_SUFFIXES)
            .find(|(s, _)| *s == suffix)
            .map(|(_, m)| *m)
            .ok_or_else(parse_err)?
    };

    let (integer, fraction) = match mantissa.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (mantissa, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(parse_err());
    }

    let whole: u128 = if integer.is_empty() {
        0
    } else {
        integer.parse().map_err(|_| parse_err())?
    };
    let mut bytes = whole.checked_mul(multiplier).ok_or_else(parse_err)?;

    if !fraction.is_empty() {
        if fraction.contains('.') || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err());
        }
        let numerator: u128 = fraction.parse().map_err(|_| parse_err())?;
        let denominator = 10u128
            .checked_pow(fraction.len() as u32)
            .ok_or_else(parse_err)?;
        let scaled = numerator.checked_mul(multiplier).ok_or_else(parse_err)?;
        // round fractional bytes up
        bytes = bytes
            .checked_add(scaled.div_ceil(denominator))
            .ok_or_else(parse_err)?;
    }

    Ok(bytes)
}

/// Render a byte count as a canonical quantity string, preferring the
/// largest binary suffix that divides it evenly.
pub fn format_quantity(bytes: u128) -> String {
    for (suffix, multiplier) in BINARY_SUFFIXES.iter().rev() {
        if bytes >= *multiplier && bytes % multiplier == 0 {
            return format!("{}{}", bytes / multiplier, suffix);
        }
    }
    bytes.to_string()
}

/// Validate the storage request of a volume claim, returning requirements
/// holding only the validated storage request.
pub fn parse_storage_request(
    resources: &VolumeResourceRequirements,
) -> Result<VolumeResourceRequirements> {
    let quantity = resources
        .requests
        .as_ref()
        .and_then(|requests| requests.get(STORAGE_RESOURCE))
        .ok_or_else(|| Error::CapacityParse {
            value: "<missing storage request>".to_string(),
        })?;
    parse_quantity(&quantity.0)?;

    let mut requests = BTreeMap::new();
    requests.insert(STORAGE_RESOURCE.to_string(), quantity.clone());
    Ok(VolumeResourceRequirements {
        requests: Some(requests),
        limits: None,
    })
}

/// Build volume requirements requesting `bytes` of storage
pub fn storage_requirements(bytes: u128) -> VolumeResourceRequirements {
    let mut requests = BTreeMap::new();
    requests.insert(
        STORAGE_RESOURCE.to_string(),
        Quantity(format_quantity(bytes)),
    );
    VolumeResourceRequirements {
        requests: Some(requests),
        limits: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_quantity_suffixes() {
        assert_eq!(parse_quantity("10Gi").unwrap(), 10 * (1 << 30));
        assert_eq!(parse_quantity("512Mi").unwrap(), 512 * (1 << 20));
        assert_eq!(parse_quantity("2T").unwrap(), 2_000_000_000_000);
        assert_eq!(parse_quantity("100").unwrap(), 100);
        assert_eq!(parse_quantity("1.5Ki").unwrap(), 1536);
    }

    #[test]
    fn test_parse_quantity_rounds_fractional_bytes_up() {
        // 0.5 bytes rounds to 1
        assert_eq!(parse_quantity("0.5").unwrap(), 1);
        assert_eq!(parse_quantity("2.5").unwrap(), 3);
    }

    #[test]
    fn test_parse_quantity_rejects_malformed() {
        for value in ["", "  ", "Gi", "10Gx", "10GiB", "-5Gi", "1..5Gi", "1.2.3"] {
            assert_matches!(
                parse_quantity(value),
                Err(Error::CapacityParse { .. }),
                "expected {value:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_format_quantity_prefers_binary_suffix() {
        assert_eq!(format_quantity(20 * (1 << 30)), "20Gi");
        assert_eq!(format_quantity(1536), "1536");
        assert_eq!(format_quantity(1 << 40), "1Ti");
        assert_eq!(format_quantity(0), "0");
    }

    #[test]
    fn test_parse_storage_request() {
        let mut requests = BTreeMap::new();
        requests.insert(STORAGE_RESOURCE.to_string(), Quantity("10Gi".to_string()));
        let resources = VolumeResourceRequirements {
            requests: Some(requests),
            limits: None,
        };

        let parsed = parse_storage_request(&resources).unwrap();
        let storage = &parsed.requests.unwrap()[STORAGE_RESOURCE];
        assert_eq!(storage.0, "10Gi");
    }

    #[test]
    fn test_parse_storage_request_missing() {
        let resources = VolumeResourceRequirements::default();
        assert_matches!(
            parse_storage_request(&resources),
            Err(Error::CapacityParse { .. })
        );
    }
}
