//! Request/event payload validation. Accumulates every violation rather
//! than aborting on the first, in the style of
//! `protocol::validation` (`validate_game_name_with_config` et al. collect
//! into a `Vec` rather than short-circuiting).

use super::types::Codec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub fn is_hex64(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

pub struct CreateRoomInput<'a> {
    pub file_hash: &'a str,
    pub duration_ms: i64,
    pub file_size: i64,
    pub codec: &'a Codec,
    pub expires_in_days: i64,
    pub passcode: Option<&'a str>,
}

pub fn validate_create_room(input: &CreateRoomInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !is_hex64(input.file_hash) {
        errors.push(ValidationError::new(
            "file_hash",
            "must be exactly 64 hexadecimal characters",
        ));
    }
    if input.duration_ms <= 0 {
        errors.push(ValidationError::new(
            "duration_ms",
            "must be a positive integer",
        ));
    }
    if input.file_size <= 0 {
        errors.push(ValidationError::new(
            "file_size",
            "must be a positive integer",
        ));
    }
    if input.codec.video.is_empty() || input.codec.audio.is_empty() {
        errors.push(ValidationError::new(
            "codec",
            "video and audio codec names are required",
        ));
    }
    if !(1..=30).contains(&input.expires_in_days) {
        errors.push(ValidationError::new(
            "expires_in_days",
            "must be between 1 and 30",
        ));
    }
    if let Some(passcode) = input.passcode {
        let len = passcode.chars().count();
        if !(4..=20).contains(&len) {
            errors.push(ValidationError::new(
                "passcode",
                "must be between 4 and 20 characters",
            ));
        }
    }

    errors
}

pub fn validate_join_room(room_id: &str, file_hash: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let len = room_id.chars().count();
    if !(6..=8).contains(&len) {
        errors.push(ValidationError::new("room_id", "must be 6-8 characters"));
    }
    if !is_hex64(file_hash) {
        errors.push(ValidationError::new(
            "file_hash",
            "must be exactly 64 hexadecimal characters",
        ));
    }
    errors
}

pub fn validate_host_timing(position_sec: f64, host_timestamp_ms: i64) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if position_sec < 0.0 {
        errors.push(ValidationError::new(
            "position_sec",
            "must be greater than or equal to zero",
        ));
    }
    if host_timestamp_ms <= 0 {
        errors.push(ValidationError::new(
            "host_timestamp_ms",
            "must be a positive integer",
        ));
    }
    errors
}

pub fn validate_playback_rate(rate: f64) -> Vec<ValidationError> {
    if (0.25..=2.0).contains(&rate) {
        Vec::new()
    } else {
        vec![ValidationError::new(
            "playback_rate",
            "must be between 0.25 and 2.0",
        )]
    }
}

pub fn validate_chat_message(text: &str) -> Vec<ValidationError> {
    let len = text.chars().count();
    if (1..=500).contains(&len) {
        Vec::new()
    } else {
        vec![ValidationError::new(
            "text",
            "must be between 1 and 500 characters",
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_codec() -> Codec {
        Codec {
            video: "h264".to_string(),
            audio: "aac".to_string(),
            resolution: None,
        }
    }

    #[test]
    fn valid_create_room_input_has_no_errors() {
        let input = CreateRoomInput {
            file_hash: &"a".repeat(64),
            duration_ms: 120_000,
            file_size: 1_000_000,
            codec: &valid_codec(),
            expires_in_days: 7,
            passcode: None,
        };
        assert!(validate_create_room(&input).is_empty());
    }

    #[test]
    fn expires_in_days_boundary_zero_and_thirty_one_rejected() {
        for days in [0, 31] {
            let input = CreateRoomInput {
                file_hash: &"a".repeat(64),
                duration_ms: 1,
                file_size: 1,
                codec: &valid_codec(),
                expires_in_days: days,
                passcode: None,
            };
            let errors = validate_create_room(&input);
            assert!(errors.iter().any(|e| e.field == "expires_in_days"));
        }
    }

    #[test]
    fn file_hash_length_boundary_63_and_65_rejected() {
        for len in [63, 65] {
            let hash = "a".repeat(len);
            let input = CreateRoomInput {
                file_hash: &hash,
                duration_ms: 1,
                file_size: 1,
                codec: &valid_codec(),
                expires_in_days: 7,
                passcode: None,
            };
            let errors = validate_create_room(&input);
            assert!(errors.iter().any(|e| e.field == "file_hash"));
        }
    }

    #[test]
    fn non_hex_file_hash_rejected() {
        let hash = "g".repeat(64);
        assert!(!is_hex64(&hash));
    }

    #[test]
    fn passcode_length_boundary_3_and_21_rejected() {
        for len in [3, 21] {
            let passcode = "x".repeat(len);
            let input = CreateRoomInput {
                file_hash: &"a".repeat(64),
                duration_ms: 1,
                file_size: 1,
                codec: &valid_codec(),
                expires_in_days: 7,
                passcode: Some(&passcode),
            };
            let errors = validate_create_room(&input);
            assert!(errors.iter().any(|e| e.field == "passcode"));
        }
    }

    #[test]
    fn negative_position_sec_rejected() {
        let errors = validate_host_timing(-1.0, 1000);
        assert!(errors.iter().any(|e| e.field == "position_sec"));
    }

    #[test]
    fn errors_accumulate_rather_than_short_circuit() {
        let input = CreateRoomInput {
            file_hash: "not-hex",
            duration_ms: -1,
            file_size: -1,
            codec: &Codec {
                video: String::new(),
                audio: String::new(),
                resolution: None,
            },
            expires_in_days: 99,
            passcode: Some("x"),
        };
        let errors = validate_create_room(&input);
        assert_eq!(errors.len(), 6);
    }
}
