// Validation utilities module
// Provides custom validation functions for domain-specific rules

use validator::ValidationError;

/// Validates a vehicle identification number
///
/// Accepts the modern 17-character format and pre-1981 VINs of 11 to 16
/// characters. The letters I, O, and Q are never used in a VIN.
pub fn validate_vin(vin: &str) -> Result<(), ValidationError> {
    let len = vin.len();
    if !(11..=17).contains(&len) {
        return Err(ValidationError::new("invalid_vin_length"));
    }
    if !vin
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, 'I' | 'O' | 'Q' | 'i' | 'o' | 'q'))
    {
        return Err(ValidationError::new("invalid_vin_characters"));
    }
    Ok(())
}

/// Validates that a service interval profile is one of the accepted values
/// Valid values: "standard", "extended", "severe" (case-insensitive)
pub fn validate_service_interval(interval: &str) -> Result<(), ValidationError> {
    let valid_profiles = ["standard", "extended", "severe"];
    if valid_profiles.contains(&interval.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_service_interval"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_vins() {
        assert!(validate_vin("1HGCM82633A004352").is_ok());
        assert!(validate_vin("JH4TB2H26CC000000").is_ok());
        // Short pre-1981 VIN
        assert!(validate_vin("CC55F101001").is_ok());
    }

    #[test]
    fn test_invalid_vins() {
        assert!(validate_vin("").is_err());
        assert!(validate_vin("SHORT").is_err());
        assert!(validate_vin("1HGCM82633A0043521234").is_err());
        // I, O, Q are not legal VIN characters
        assert!(validate_vin("1HGCM82633A00435O").is_err());
        assert!(validate_vin("1HGCM8-633A004352").is_err());
    }

    #[test]
    fn test_service_interval_vocabulary() {
        assert!(validate_service_interval("standard").is_ok());
        assert!(validate_service_interval("EXTENDED").is_ok());
        assert!(validate_service_interval("weekly").is_err());
    }
}
