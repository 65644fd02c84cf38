//! Room id generation. The alphabet excludes the visually ambiguous
//! glyphs `0`, `O`, `I`, `1`.

use crate::config::ROOM_ID_ALPHABET;
use rand::Rng;

/// Generate one candidate room id of `length` characters drawn from
/// [`ROOM_ID_ALPHABET`] using `rng`. Collision handling (retry budget,
/// `RoomIdExhausted`) is the caller's responsibility (see
/// `server::admission::allocate_room_id`) since only the caller knows which
/// ids are already taken. Generic over the RNG so tests can force
/// collisions with a deterministic source instead of the process-global one.
pub fn generate_candidate_with<R: Rng + ?Sized>(length: u8, rng: &mut R) -> String {
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_ID_ALPHABET.len());
            ROOM_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// [`generate_candidate_with`] seeded from the process's default RNG.
pub fn generate_candidate(length: u8) -> String {
    generate_candidate_with(length, &mut rand::rng())
}

pub fn is_valid_room_id(id: &str) -> bool {
    let len = id.chars().count();
    if !(6..=8).contains(&len) {
        return false;
    }
    id.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_only_the_restricted_alphabet() {
        for _ in 0..200 {
            let id = generate_candidate(6);
            assert_eq!(id.len(), 6);
            assert!(is_valid_room_id(&id), "invalid id generated: {id}");
            for ch in id.chars() {
                assert!(!"IO10".contains(ch), "ambiguous glyph in id: {id}");
            }
        }
    }

    #[test]
    fn length_is_configurable_between_six_and_eight() {
        assert_eq!(generate_candidate(8).len(), 8);
    }

    #[test]
    fn rejects_ids_outside_length_bounds() {
        assert!(!is_valid_room_id("ABCDE"));
        assert!(!is_valid_room_id("ABCDEFGHJ"));
    }

    #[test]
    fn rejects_ids_containing_excluded_glyphs() {
        assert!(!is_valid_room_id("ABCDEI"));
        assert!(!is_valid_room_id("ABCDE0"));
    }

    /// Always reports zero entropy, so `generate_candidate_with` returns the
    /// same id on every call — the deterministic source the collision-retry
    /// budget in `server::admission::allocate_room_id` is tested against.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn a_zero_entropy_rng_always_yields_the_same_candidate() {
        let mut rng = ZeroRng;
        let first = generate_candidate_with(6, &mut rng);
        let second = generate_candidate_with(6, &mut rng);
        assert_eq!(first, second);
    }
}
