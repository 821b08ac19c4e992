//! Validation traits shared by the model constructors.

use crate::ValidationError;

/// Non-empty check for strings and sequences.
pub trait ValidateNonEmpty {
    /// # Errors
    /// Returns `ValidationError::Empty` if the value has no elements.
    fn validate_non_empty(&self, field: &'static str) -> Result<(), ValidationError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field: &'static str) -> Result<(), ValidationError> {
        self.as_str().validate_non_empty(field)
    }
}

impl<T> ValidateNonEmpty for [T] {
    fn validate_non_empty(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        Ok(())
    }
}

impl<T> ValidateNonEmpty for Vec<T> {
    fn validate_non_empty(&self, field: &'static str) -> Result<(), ValidationError> {
        self.as_slice().validate_non_empty(field)
    }
}

/// Inclusive range checks.
pub trait ValidateRange: Sized {
    fn validate_range(&self, field: &'static str, min: Self, max: Self)
        -> Result<(), ValidationError>;

    fn validate_non_negative(&self, field: &'static str) -> Result<(), ValidationError>;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_range(
                    &self,
                    field: &'static str,
                    min: Self,
                    max: Self,
                ) -> Result<(), ValidationError> {
                    if *self < min || *self > max {
                        return Err(ValidationError::OutOfRange {
                            field,
                            value: self.to_string(),
                            min: min.to_string(),
                            max: max.to_string(),
                        });
                    }
                    Ok(())
                }

                fn validate_non_negative(&self, field: &'static str) -> Result<(), ValidationError> {
                    self.validate_range(field, 0 as $t, <$t>::MAX)
                }
            }
        )*
    };
}

impl_validate_range!(i32, i64);

impl ValidateRange for f64 {
    fn validate_range(&self, field: &'static str, min: Self, max: Self) -> Result<(), ValidationError> {
        // NaN fails `contains`.
        if !(min..=max).contains(self) {
            return Err(ValidationError::OutOfRange {
                field,
                value: self.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    fn validate_non_negative(&self, field: &'static str) -> Result<(), ValidationError> {
        self.validate_range(field, 0.0, f64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty_str() {
        assert!("hello".validate_non_empty("message").is_ok());
        assert!(" ".validate_non_empty("message").is_ok());
        assert_eq!(
            "".validate_non_empty("message"),
            Err(ValidationError::Empty { field: "message" })
        );
    }

    #[test]
    fn test_validate_non_empty_vec() {
        assert!(vec!["frame"].validate_non_empty("trace").is_ok());
        assert!(Vec::<String>::new().validate_non_empty("trace").is_err());
    }

    #[test]
    fn test_validate_range_integers() {
        assert!(1000i32.validate_range("code", 1000, 6999).is_ok());
        assert!(6999i32.validate_range("code", 1000, 6999).is_ok());
        assert!(999i32.validate_range("code", 1000, 6999).is_err());
        assert!(7000i32.validate_range("code", 1000, 6999).is_err());
        assert!(0i64.validate_non_negative("current").is_ok());
        assert!((-1i64).validate_non_negative("current").is_err());
    }

    #[test]
    fn test_validate_range_float_rejects_nan() {
        assert!(0.0f64.validate_range("percentage", 0.0, 100.0).is_ok());
        assert!(100.0f64.validate_range("percentage", 0.0, 100.0).is_ok());
        assert!(100.1f64.validate_range("percentage", 0.0, 100.0).is_err());
        assert!((-0.1f64).validate_range("percentage", 0.0, 100.0).is_err());
        assert!(f64::NAN.validate_range("percentage", 0.0, 100.0).is_err());
    }
}
