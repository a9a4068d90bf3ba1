//! QR token protocol
//!
//! Tokens are flat strings made of a typed prefix and a colon-delimited id:
//! `USER_ID:<id>` or `PROJECT_ID:<id>`. Decoding the camera frame into this
//! text happens outside the service.

use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::error::TrackingError;

const USER_PREFIX: &str = "USER_ID:";
const PROJECT_PREFIX: &str = "PROJECT_ID:";

/// Decoded QR token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrToken {
    User(Uuid),
    Project(Uuid),
}

impl FromStr for QrToken {
    type Err = TrackingError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let payload = payload.trim();

        // A well-formed prefix with an id that cannot exist behaves like a
        // lookup miss for that entity.
        if let Some(id) = payload.strip_prefix(USER_PREFIX) {
            return Uuid::parse_str(id.trim())
                .map(QrToken::User)
                .map_err(|_| TrackingError::UnknownOrBlockedUser);
        }

        if let Some(id) = payload.strip_prefix(PROJECT_PREFIX) {
            return Uuid::parse_str(id.trim())
                .map(QrToken::Project)
                .map_err(|_| TrackingError::UnknownProject);
        }

        Err(TrackingError::UnrecognizedQrFormat)
    }
}

impl fmt::Display for QrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrToken::User(id) => write!(f, "{}{}", USER_PREFIX, id),
            QrToken::Project(id) => write!(f, "{}{}", PROJECT_PREFIX, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_and_project_tokens() {
        let id = Uuid::new_v4();

        assert_eq!(
            format!("USER_ID:{}", id).parse::<QrToken>().unwrap(),
            QrToken::User(id)
        );
        assert_eq!(
            format!("  PROJECT_ID:{}\n", id).parse::<QrToken>().unwrap(),
            QrToken::Project(id)
        );
    }

    #[test]
    fn test_display_produces_parseable_payload() {
        let token = QrToken::Project(Uuid::new_v4());
        assert_eq!(token.to_string().parse::<QrToken>().unwrap(), token);
    }

    #[test]
    fn test_unknown_prefix_is_rejected() {
        for payload in ["", "hello", "user_id:abc", "TASK_ID:1", "USER_ID"] {
            assert!(matches!(
                payload.parse::<QrToken>(),
                Err(TrackingError::UnrecognizedQrFormat)
            ));
        }
    }

    #[test]
    fn test_malformed_ids_map_to_lookup_errors() {
        assert!(matches!(
            "USER_ID:42".parse::<QrToken>(),
            Err(TrackingError::UnknownOrBlockedUser)
        ));
        assert!(matches!(
            "PROJECT_ID:".parse::<QrToken>(),
            Err(TrackingError::UnknownProject)
        ));
    }
}
