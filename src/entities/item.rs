// 💵 Item Identity - Composite natural key of a physical bill
//
// serial number + value + series, canonicalized before it ever becomes a key.
// The same bill typed as "AB 1234 5678" or "AB12345678" must land on the
// same aggregate.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator between key fields. Never allowed inside a field.
pub const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemIdentity {
    pub serial_number: String,
    pub value: String,
    pub series: String,
}

impl ItemIdentity {
    /// Build a canonical identity, rejecting anything that cannot be keyed
    pub fn new(
        serial_number: impl Into<String>,
        value: impl Into<String>,
        series: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        ItemIdentity {
            serial_number: serial_number.into(),
            value: value.into(),
            series: series.into(),
        }
        .canonicalize()
    }

    /// Strip whitespace from the serial, trim the rest, then validate.
    pub fn canonicalize(&self) -> Result<Self, ValidationError> {
        let canonical = ItemIdentity {
            serial_number: self
                .serial_number
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
            value: self.value.trim().to_string(),
            series: self.series.trim().to_string(),
        };

        check_field("serialNumber", &canonical.serial_number)?;
        check_field("value", &canonical.value)?;
        check_field("series", &canonical.series)?;

        Ok(canonical)
    }

    /// Store key of the review aggregate for this item
    pub fn review_key(&self) -> Result<String, ValidationError> {
        let canonical = self.canonicalize()?;
        Ok(join_key(&[
            &canonical.serial_number,
            &canonical.value,
            &canonical.series,
        ]))
    }

    /// Store key of one submitter's detail ledger for this item
    pub fn ledger_key(&self, submitter_id: &str) -> Result<String, ValidationError> {
        check_submitter(submitter_id)?;
        let canonical = self.canonicalize()?;
        Ok(join_key(&[
            submitter_id,
            &canonical.serial_number,
            &canonical.value,
            &canonical.series,
        ]))
    }
}

impl std::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ${} ({})", self.serial_number, self.value, self.series)
    }
}

fn check_field(field: &'static str, text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::MalformedIdentity {
            field,
            reason: "is empty".to_string(),
        });
    }
    if text.contains(KEY_SEPARATOR) {
        return Err(ValidationError::MalformedIdentity {
            field,
            reason: format!("contains reserved character {:?}", KEY_SEPARATOR),
        });
    }
    Ok(())
}

pub(crate) fn check_submitter(submitter_id: &str) -> Result<(), ValidationError> {
    if submitter_id.trim().is_empty() {
        return Err(ValidationError::InvalidSubmitter("empty".to_string()));
    }
    if submitter_id.contains(KEY_SEPARATOR) {
        return Err(ValidationError::InvalidSubmitter(format!(
            "contains reserved character {:?}",
            KEY_SEPARATOR
        )));
    }
    Ok(())
}

fn join_key(parts: &[&str]) -> String {
    let mut sep = [0u8; 4];
    parts.join(KEY_SEPARATOR.encode_utf8(&mut sep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_whitespace_stripped() {
        let spaced = ItemIdentity::new("AB 1234 5678", " 20 ", "2013").unwrap();
        let packed = ItemIdentity::new("AB12345678", "20", "2013").unwrap();

        assert_eq!(spaced, packed);
        assert_eq!(spaced.serial_number, "AB12345678");
        assert_eq!(spaced.value, "20");
    }

    #[test]
    fn test_review_key_is_deterministic() {
        let id = ItemIdentity::new("AB 12", "20", "2013").unwrap();
        assert_eq!(id.review_key().unwrap(), "AB12|20|2013");
        assert_eq!(id.review_key().unwrap(), id.review_key().unwrap());
    }

    #[test]
    fn test_ledger_key_prefixes_submitter() {
        let id = ItemIdentity::new("AB12", "20", "2013").unwrap();
        assert_eq!(id.ledger_key("user-1").unwrap(), "user-1|AB12|20|2013");
    }

    #[test]
    fn test_ledger_key_rejects_bad_submitter() {
        let id = ItemIdentity::new("AB12", "20", "2013").unwrap();
        assert!(matches!(
            id.ledger_key(""),
            Err(ValidationError::InvalidSubmitter(_))
        ));
        assert!(matches!(
            id.ledger_key("a|b"),
            Err(ValidationError::InvalidSubmitter(_))
        ));
    }

    #[test]
    fn test_empty_field_is_malformed() {
        let err = ItemIdentity::new("   ", "20", "2013").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedIdentity {
                field: "serialNumber",
                reason: "is empty".to_string(),
            }
        );
    }

    #[test]
    fn test_separator_inside_field_is_malformed() {
        let err = ItemIdentity::new("AB12", "20|50", "2013").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedIdentity { field: "value", .. }
        ));
    }

    #[test]
    fn test_uncanonical_identity_still_keys_canonically() {
        // Deserialized identities skip `new`, keys must canonicalize anyway
        let raw = ItemIdentity {
            serial_number: "AB 12".to_string(),
            value: "20".to_string(),
            series: " 2013".to_string(),
        };
        assert_eq!(raw.review_key().unwrap(), "AB12|20|2013");
    }
}
