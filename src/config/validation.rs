//! Eager startup validation, following the style of the
//! `config::validate_config_security` / `--validate-config` flow.

use super::defaults::{MAX_ROOM_ID_LENGTH, MIN_ROOM_ID_LENGTH};
use super::types::RoomSyncConfig;

pub fn validate(config: &RoomSyncConfig) -> anyhow::Result<()> {
    if config.room_id_length < MIN_ROOM_ID_LENGTH || config.room_id_length > MAX_ROOM_ID_LENGTH {
        anyhow::bail!(
            "ROOM_ID_LENGTH must be between {MIN_ROOM_ID_LENGTH} and {MAX_ROOM_ID_LENGTH}, got {}",
            config.room_id_length
        );
    }

    if config.room_expiry_days_default < 1 || config.room_expiry_days_default > 30 {
        anyhow::bail!(
            "ROOM_EXPIRY_DAYS must be between 1 and 30, got {}",
            config.room_expiry_days_default
        );
    }

    if config.host_reconnect_grace.is_zero() {
        anyhow::bail!("HOST_RECONNECT_GRACE_MS must be greater than zero");
    }

    if config.port == 0 {
        anyhow::bail!("PORT must be a valid nonzero port number");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&RoomSyncConfig::default()).is_ok());
    }

    #[test]
    fn out_of_range_room_id_length_rejected() {
        let mut config = RoomSyncConfig::default();
        config.room_id_length = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn out_of_range_expiry_rejected() {
        let mut config = RoomSyncConfig::default();
        config.room_expiry_days_default = 31;
        assert!(validate(&config).is_err());
    }
}
