//! Session identifiers.
//!
//! Only the hyphenated 8-4-4-4-12 form is accepted. `uuid` itself also
//! parses the simple, braced and URN forms, so the shape is checked first.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::SessionError;

/// Length of the hyphenated UUID form.
const HYPHENATED_LEN: usize = 36;

/// Byte offsets of the hyphens in the hyphenated form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// A validated session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a new random (v4) session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        if !is_hyphenated_uuid(raw) {
            return Err(SessionError::InvalidSessionId(raw.to_string()));
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| SessionError::InvalidSessionId(raw.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

fn is_hyphenated_uuid(raw: &str) -> bool {
    raw.len() == HYPHENATED_LEN
        && raw.bytes().enumerate().all(|(i, b)| {
            if HYPHEN_POSITIONS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_v4_and_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(&id.to_string()), Ok(id));
    }

    #[test]
    fn accepts_either_case() {
        let lower = SessionId::parse("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        let upper = SessionId::parse("0F8FAD5B-D9CB-469F-A165-70867728950E").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_string(), "0f8fad5b-d9cb-469f-a165-70867728950e");
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in [
            "",
            "not-a-uuid",
            "0f8fad5bd9cb469fa16570867728950e",
            "{0f8fad5b-d9cb-469f-a165-70867728950e}",
            "urn:uuid:0f8fad5b-d9cb-469f-a165-70867728950e",
            "0f8fad5b-d9cb-469f-a165-70867728950",
            "0f8fad5b-d9cb-469f-a165-70867728950e0",
            "0f8fad5b_d9cb_469f_a165_70867728950e",
            "gf8fad5b-d9cb-469f-a165-70867728950e",
            " 0f8fad5b-d9cb-469f-a165-70867728950e",
        ] {
            assert_eq!(
                SessionId::parse(raw),
                Err(SessionError::InvalidSessionId(raw.to_string())),
                "accepted {raw:?}"
            );
        }
    }
}
