//! Validation helpers for realtime-channel DTOs.

use validator::ValidationError;

/// Upper bound on room codes accepted from the wire. Codes that merely fail
/// to match the current room still pass here: mismatches get a reply carrying
/// the current code, so only absurd input is rejected outright.
const ROOM_CODE_MAX_LEN: usize = 64;
/// Upper bound on client-supplied player identifiers.
const PLAYER_ID_MAX_LEN: usize = 16;

/// Validates that a room code is within the accepted length bound.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() > ROOM_CODE_MAX_LEN {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be at most {ROOM_CODE_MAX_LEN} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates a client-supplied player identifier: 1 to 16 ASCII alphanumeric
/// characters.
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > PLAYER_ID_MAX_LEN {
        let mut err = ValidationError::new("player_id_length");
        err.message = Some(
            format!(
                "Player ID must be 1 to {PLAYER_ID_MAX_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("player_id_format");
        err.message = Some("Player ID must contain only ASCII alphanumeric characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_up_to_the_bound_pass() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code("").is_ok());
        assert!(validate_room_code(&"X".repeat(64)).is_ok());
        assert!(validate_room_code(&"X".repeat(65)).is_err());
    }

    #[test]
    fn player_ids_must_be_short_alphanumerics() {
        assert!(validate_player_id("AB12CD").is_ok());
        assert!(validate_player_id("a1").is_ok());
        assert!(validate_player_id("").is_err());
        assert!(validate_player_id(&"A".repeat(17)).is_err());
        assert!(validate_player_id("AB 12").is_err());
        assert!(validate_player_id("AB-12").is_err());
    }
}
