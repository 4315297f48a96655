// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning user-supplied targets into transport addresses.

use walink_core::SendError;

pub const USER_SUFFIX: &str = "@s.whatsapp.net";

const MIN_DIGITS: usize = 5;
const MAX_DIGITS: usize = 20;

/// Normalize a phone number or JID.
///
/// Anything containing `@` is taken as an address already and passed through
/// when both sides are non-empty. Otherwise common phone punctuation is
/// stripped and the rest must be 5-20 ASCII digits.
pub fn normalize_target(target: &str) -> Result<String, SendError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(SendError::InvalidTarget("target is empty".to_string()));
    }

    if let Some((user, server)) = trimmed.split_once('@') {
        if user.is_empty() || server.is_empty() {
            return Err(SendError::InvalidTarget(format!(
                "malformed address '{trimmed}'"
            )));
        }
        return Ok(trimmed.to_string());
    }

    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SendError::InvalidTarget(format!(
            "'{trimmed}' is not a phone number"
        )));
    }
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return Err(SendError::InvalidTarget(format!(
            "'{trimmed}' must have {MIN_DIGITS}-{MAX_DIGITS} digits"
        )));
    }
    Ok(format!("{digits}{USER_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formatted_number_is_normalized() {
        assert_eq!(
            normalize_target(" +55 (11) 98888-7777 ").unwrap(),
            "5511988887777@s.whatsapp.net"
        );
        assert_eq!(
            normalize_target("55.11.98888.7777").unwrap(),
            "5511988887777@s.whatsapp.net"
        );
    }

    #[test]
    fn jids_pass_through() {
        assert_eq!(
            normalize_target("120363025246125486@g.us").unwrap(),
            "120363025246125486@g.us"
        );
        assert_eq!(
            normalize_target("5511988887777@s.whatsapp.net").unwrap(),
            "5511988887777@s.whatsapp.net"
        );
    }

    #[test]
    fn rejects_bad_targets() {
        for bad in ["", "   ", "@s.whatsapp.net", "5511@", "call-me", "1234", "123456789012345678901"] {
            assert!(
                matches!(normalize_target(bad), Err(SendError::InvalidTarget(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    proptest! {
        #[test]
        fn valid_digit_strings_always_normalize(digits in "[0-9]{5,20}") {
            let jid = normalize_target(&digits).unwrap();
            prop_assert_eq!(jid, format!("{digits}{USER_SUFFIX}"));
        }
    }
}
