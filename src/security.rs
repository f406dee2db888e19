//! Pairing helpers (room secrets, pairing codes, name sanitizing, constant-time compare)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use subtle::ConstantTimeEq;

pub const SECRET_LEN: usize = 8;
pub const ROOM_CODE_LEN: usize = 6;

/// Name used for owners whose name has nothing printable left after sanitizing
pub const PLACEHOLDER_NAME: &str = "Player";

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Freshly drawn room secret, kept alongside its base64 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSecret {
    pub plain: String,
    pub encoded: String,
}

/// Draw an 8-letter secret. Not a credential, so `rand`'s default RNG is enough.
pub fn generate_secret() -> RoomSecret {
    let mut rng = rand::rng();

    let plain: String = (0..SECRET_LEN)
        .map(|_| {
            let idx = rng.random_range(0..LETTERS.len());
            LETTERS[idx] as char
        })
        .collect();
    let encoded = STANDARD.encode(plain.as_bytes());

    RoomSecret { plain, encoded }
}

/// Code a client decodes to find the pairing server and the room secret.
/// Format: base64("{server_url}${secret}")
pub fn pairing_code(server_url: &str, secret_plain: &str) -> String {
    STANDARD.encode(format!("{}${}", server_url, secret_plain))
}

/// A room code is exactly six ASCII letters.
pub fn is_valid_room_code(candidate: &str) -> bool {
    candidate.len() == ROOM_CODE_LEN && candidate.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Keep ASCII letters, digits and spaces.
pub fn sanitize_display_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();

    if name.trim().is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        name
    }
}

/// Constant-time equality for secrets.
pub fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_eight_letters() {
        for _ in 0..50 {
            let secret = generate_secret();
            assert_eq!(secret.plain.len(), SECRET_LEN);
            assert!(secret.plain.bytes().all(|b| b.is_ascii_alphabetic()));

            let decoded = STANDARD.decode(&secret.encoded).unwrap();
            assert_eq!(decoded, secret.plain.as_bytes());
        }
    }

    #[test]
    fn test_pairing_code_decodes_to_url_and_secret() {
        let code = pairing_code("https://bot.example:8080", "AbCdEfGh");
        let decoded = String::from_utf8(STANDARD.decode(code).unwrap()).unwrap();
        assert_eq!(decoded, "https://bot.example:8080$AbCdEfGh");
    }

    #[test]
    fn test_room_code_validation() {
        assert!(is_valid_room_code("ABCDEF"));
        assert!(is_valid_room_code("abcXYZ"));
        assert!(!is_valid_room_code("ABC12F"));
        assert!(!is_valid_room_code("ABCDE"));
        assert!(!is_valid_room_code("ABCDEFG"));
        assert!(!is_valid_room_code("ABCDÉ"));
        assert!(!is_valid_room_code(""));
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("abc!!!123 xyz"), "abc123 xyz");
        assert_eq!(sanitize_display_name("###"), PLACEHOLDER_NAME);
        assert_eq!(sanitize_display_name("  !! "), PLACEHOLDER_NAME);
        assert_eq!(sanitize_display_name("Zoë"), "Zo");
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq("AbCdEfGh", "AbCdEfGh"));
        assert!(!ct_eq("AbCdEfGh", "AbCdEfGx"));
        assert!(!ct_eq("AbCdEfGh", "AbCd"));
    }
}
