use crate::error::{
    FIRST_NAME_LENGTH, LAST_NAME_LENGTH, MISSING_FIELDS, PHONE_FORMAT, RegistrationError,
    SEATS_NOT_INTEGER, SEATS_NOT_POSITIVE,
};
use crate::model::RegistrationRequest;
use serde_json::Value;
use std::ops::RangeInclusive;

const NAME_LENGTH: RangeInclusive<usize> = 2..=50;
const PHONE_DIGITS: usize = 10;

/// A registration request that passed every field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl NewRegistration {
    /// Applies the field rules in order; the first failure wins.
    ///
    /// # Errors
    /// [`RegistrationError::Validation`] carrying the message of the failed rule.
    pub fn parse(request: RegistrationRequest) -> Result<Self, RegistrationError> {
        let (Some(first_name), Some(last_name), Some(phone_number)) = (
            request.first_name.filter(|s| !s.is_empty()),
            request.last_name.filter(|s| !s.is_empty()),
            request.phone_number.filter(|s| !s.is_empty()),
        ) else {
            return Err(RegistrationError::validation(MISSING_FIELDS));
        };

        if phone_number.len() != PHONE_DIGITS || !phone_number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RegistrationError::validation(PHONE_FORMAT));
        }
        if !NAME_LENGTH.contains(&first_name.chars().count()) {
            return Err(RegistrationError::validation(FIRST_NAME_LENGTH));
        }
        if !NAME_LENGTH.contains(&last_name.chars().count()) {
            return Err(RegistrationError::validation(LAST_NAME_LENGTH));
        }

        Ok(Self { first_name, last_name, phone_number })
    }
}

/// A positive whole seat limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalSeats(u32);

impl TotalSeats {
    /// Checks positivity before integrality, so `-2.5` reports the sign.
    ///
    /// # Errors
    /// [`RegistrationError::InvalidValue`] for non-numbers, non-positive, fractional or
    /// out-of-range values.
    pub fn parse(value: &Value) -> Result<Self, RegistrationError> {
        let Some(number) = value.as_number() else {
            return Err(RegistrationError::invalid_value(SEATS_NOT_INTEGER));
        };

        if let Some(n) = number.as_i64() {
            if n <= 0 {
                return Err(RegistrationError::invalid_value(SEATS_NOT_POSITIVE));
            }
            return u32::try_from(n).map(Self).map_err(|_| out_of_range());
        }
        if number.is_u64() {
            return Err(out_of_range());
        }

        let n = number.as_f64().unwrap_or(f64::NAN);
        if n <= 0.0 {
            return Err(RegistrationError::invalid_value(SEATS_NOT_POSITIVE));
        }
        if n.fract() != 0.0 {
            return Err(RegistrationError::invalid_value(SEATS_NOT_INTEGER));
        }
        if n > f64::from(u32::MAX) {
            return Err(out_of_range());
        }
        // Whole and within u32 range, checked above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seats = n as u32;
        Ok(Self(seats))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

fn out_of_range() -> RegistrationError {
    RegistrationError::invalid_value(format!("Total seats must not exceed {}", u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn request(first: &str, last: &str, phone: &str) -> RegistrationRequest {
        RegistrationRequest::new(first, last, phone)
    }

    fn message(err: RegistrationError) -> String {
        assert!(matches!(err, RegistrationError::Validation { .. }), "{err:?}");
        err.to_string()
    }

    #[test]
    fn accepts_a_well_formed_request() {
        let parsed = NewRegistration::parse(request("Ada", "Lovelace", "1234567890")).expect("valid");
        assert_eq!(parsed.phone_number, "1234567890");
    }

    #[test]
    fn missing_or_empty_fields_come_first() {
        let err = NewRegistration::parse(RegistrationRequest {
            first_name: Some("A".to_owned()),
            last_name: None,
            phone_number: Some("12345".to_owned()),
        })
        .unwrap_err();
        assert_eq!(message(err), MISSING_FIELDS);

        let err = NewRegistration::parse(request("", "Lovelace", "1234567890")).unwrap_err();
        assert_eq!(message(err), MISSING_FIELDS);
    }

    #[test]
    fn phone_is_checked_before_names() {
        let err = NewRegistration::parse(request("A", "B", "12345")).unwrap_err();
        assert_eq!(message(err), PHONE_FORMAT);
    }

    #[test]
    fn phone_must_be_ten_ascii_digits() {
        for phone in ["12345", "12345678901", "123456789a", "123 456 78", "١٢٣٤٥٦٧٨٩٠"] {
            let err = NewRegistration::parse(request("Ada", "Lovelace", phone)).unwrap_err();
            assert_eq!(message(err), PHONE_FORMAT, "{phone}");
        }
    }

    #[test]
    fn name_bounds() {
        let err = NewRegistration::parse(request("A", "Lovelace", "1234567890")).unwrap_err();
        assert_eq!(message(err), FIRST_NAME_LENGTH);

        let long = "x".repeat(51);
        let err = NewRegistration::parse(request("Ada", &long, "1234567890")).unwrap_err();
        assert_eq!(message(err), LAST_NAME_LENGTH);

        let fifty = "é".repeat(50);
        assert!(NewRegistration::parse(request(&fifty, "Li", "1234567890")).is_ok());
    }

    #[test]
    fn seat_limits() {
        assert_eq!(TotalSeats::parse(&json!(150)).expect("valid").get(), 150);
        assert_eq!(TotalSeats::parse(&json!(7.0)).expect("valid").get(), 7);

        for (value, expected) in [
            (json!(0), SEATS_NOT_POSITIVE),
            (json!(-5), SEATS_NOT_POSITIVE),
            (json!(-2.5), SEATS_NOT_POSITIVE),
            (json!(3.5), SEATS_NOT_INTEGER),
            (json!("12"), SEATS_NOT_INTEGER),
            (json!(null), SEATS_NOT_INTEGER),
        ] {
            let err = TotalSeats::parse(&value).unwrap_err();
            assert!(matches!(err, RegistrationError::InvalidValue { .. }), "{value}");
            assert_eq!(err.to_string(), expected, "{value}");
        }

        assert!(TotalSeats::parse(&json!(5_000_000_000_u64)).is_err());
    }

    proptest! {
        #[test]
        fn valid_requests_always_parse(
            first in "[A-Za-z]{2,50}",
            last in "\\PC{2,50}",
            phone in "[0-9]{10}",
        ) {
            let parsed = NewRegistration::parse(request(&first, &last, &phone));
            prop_assert!(parsed.is_ok());
        }

        #[test]
        fn short_phone_numbers_never_parse(phone in "[0-9]{1,9}") {
            let err = NewRegistration::parse(request("Ada", "Lovelace", &phone)).unwrap_err();
            prop_assert_eq!(err.to_string(), PHONE_FORMAT);
        }

        #[test]
        fn positive_integers_are_accepted(n in 1u32..) {
            prop_assert_eq!(TotalSeats::parse(&json!(n)).map(TotalSeats::get).ok(), Some(n));
        }
    }
}
