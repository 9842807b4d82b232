const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const BASE32_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// Stable 8-character scope hash for a source document.
///
/// FNV-1a over the exact source bytes, rendered base-32 with an uppercase
/// alphanumeric alphabet and zero-padded to 8 characters. The hash is a pure
/// function of the source text and is used both to suffix CSS selectors
/// (`.astro-<scope>`) and to tag scoped elements.
pub fn hash_from_source(source: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in source.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    encode_base32(hash)
}

fn encode_base32(mut value: u32) -> String {
    let mut buf = [b'0'; 8];
    let mut i = buf.len();
    while value > 0 {
        i -= 1;
        buf[i] = BASE32_ALPHABET[(value & 0x1f) as usize];
        value >>= 5;
    }
    // buf is pre-filled with the zero digit, so leading positions pad to 8
    String::from_utf8(buf.to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_from_source("<div>hello</div>");
        let b = hash_from_source("<div>hello</div>");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_varies_with_source() {
        let a = hash_from_source("<div>hello</div>");
        let b = hash_from_source("<div>goodbye</div>");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_shape() {
        let hash = hash_from_source("---\nconst a = 1;\n---\n<p>{a}</p>");
        assert_eq!(hash.len(), 8);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_of_empty_source() {
        // FNV offset basis, never an empty string
        let hash = hash_from_source("");
        assert_eq!(hash.len(), 8);
    }
}
