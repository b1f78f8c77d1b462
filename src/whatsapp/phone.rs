//! Phone number acceptance policy for pairing-code authentication.

use std::fmt::Debug;

use crate::config::types::PhoneConfig;

/// Decides whether an operator-supplied number is acceptable.
pub trait PhonePolicy: Send + Sync + Debug {
    /// Normalize a number to bare digits, or `None` if it is rejected.
    fn normalize(&self, input: &str) -> Option<String>;
}

/// Accepts numbers whose digit count falls within a range.
///
/// Every non-digit character is stripped first. Numbers of exactly
/// `min_digits` digits get `default_country_code` prepended when one is set.
#[derive(Debug, Clone)]
pub struct DigitRangePolicy {
    min_digits: usize,
    max_digits: usize,
    default_country_code: Option<String>,
}

impl DigitRangePolicy {
    pub fn new(min_digits: usize, max_digits: usize, default_country_code: Option<String>) -> Self {
        Self {
            min_digits,
            max_digits,
            default_country_code: default_country_code
                .map(|code| code.chars().filter(char::is_ascii_digit).collect::<String>())
                .filter(|code| !code.is_empty()),
        }
    }

    pub fn from_config(config: &PhoneConfig) -> Self {
        Self::new(
            config.min_digits,
            config.max_digits,
            config.default_country_code.clone(),
        )
    }
}

impl Default for DigitRangePolicy {
    fn default() -> Self {
        Self::from_config(&PhoneConfig::default())
    }
}

impl PhonePolicy for DigitRangePolicy {
    fn normalize(&self, input: &str) -> Option<String> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();

        if digits.len() < self.min_digits || digits.len() > self.max_digits {
            return None;
        }

        match &self.default_country_code {
            Some(code) if digits.len() == self.min_digits => Some(format!("{}{}", code, digits)),
            _ => Some(digits),
        }
    }
}
