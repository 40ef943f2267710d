use crate::error::{Result, ShareError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Expiration instant of a QR session as reported by the backend.
///
/// The backend may send either an RFC 3339 timestamp or an offset-less
/// local date-time (`2024-05-15T14:30:00`). The latter is read in the
/// client's local offset, the same way a browser reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiresAt(pub OffsetDateTime);

impl ExpiresAt {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    pub fn inner(&self) -> &OffsetDateTime {
        &self.0
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Parse with an explicit offset for offset-less input.
    pub fn parse_with_offset(s: &str, local: UtcOffset) -> Result<Self> {
        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(Self(dt));
        }
        let naive = PrimitiveDateTime::parse(
            s,
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )
        .map_err(|e| ShareError::invalid_response(format!("Invalid expiresAt '{s}': {e}")))?;
        Ok(Self(naive.assume_offset(local)))
    }

    /// Format as a local date/time for display.
    pub fn display_local(&self) -> String {
        self.display_in(local_offset())
    }

    pub fn display_in(&self, offset: UtcOffset) -> String {
        self.0
            .to_offset(offset)
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .unwrap_or_else(|_| self.to_string())
    }

    /// Display-only check; nothing polls or enforces expiry client-side.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.0
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// Local UTC offset, falling back to UTC when the platform cannot tell.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

impl fmt::Display for ExpiresAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for ExpiresAt {
    type Err = ShareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_offset(s, local_offset())
    }
}

impl Serialize for ExpiresAt {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for ExpiresAt {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ExpiresAt::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn test_parse_rfc3339() {
        let parsed = ExpiresAt::parse_with_offset("2024-05-15T14:30:00Z", offset!(+2)).unwrap();
        assert_eq!(parsed.inner(), &datetime!(2024-05-15 14:30:00 UTC));
    }

    #[test]
    fn test_parse_offsetless_uses_local_offset() {
        let parsed = ExpiresAt::parse_with_offset("2024-05-15T14:30:00", offset!(+2)).unwrap();
        assert_eq!(parsed.inner(), &datetime!(2024-05-15 14:30:00 +2));
    }

    #[test]
    fn test_parse_offsetless_with_fraction() {
        let parsed =
            ExpiresAt::parse_with_offset("2024-05-15T14:30:00.123456", UtcOffset::UTC).unwrap();
        assert_eq!(parsed.inner().second(), 0);
        assert_eq!(parsed.inner().millisecond(), 123);
    }

    #[test]
    fn test_parse_invalid() {
        let err = ExpiresAt::parse_with_offset("next tuesday", UtcOffset::UTC).unwrap_err();
        assert!(matches!(err, ShareError::InvalidResponse(_)));
    }

    #[test]
    fn test_display_in_offset() {
        let expires = ExpiresAt::new(datetime!(2024-05-15 14:30:00 UTC));
        assert_eq!(expires.display_in(UtcOffset::UTC), "2024-05-15 14:30:00");
        assert_eq!(expires.display_in(offset!(-5)), "2024-05-15 09:30:00");
    }

    #[test]
    fn test_is_expired_at() {
        let expires = ExpiresAt::new(datetime!(2024-05-15 14:30:00 UTC));
        assert!(!expires.is_expired_at(datetime!(2024-05-15 14:29:59 UTC)));
        assert!(expires.is_expired_at(datetime!(2024-05-15 14:30:00 UTC)));
    }

    #[test]
    fn test_serde_roundtrip_is_rfc3339() {
        let expires = ExpiresAt::new(datetime!(2024-05-15 14:30:00 UTC));
        let json = serde_json::to_string(&expires).unwrap();
        assert_eq!(json, "\"2024-05-15T14:30:00Z\"");
        let back: ExpiresAt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expires);
    }
}
