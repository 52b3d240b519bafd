//! Line fingerprints.

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a hash of a single line, one round per `char`.
#[inline]
#[must_use]
pub fn hash_line(line: &str) -> u32 {
    line.chars().fold(FNV_OFFSET_BASIS, |hash, c| {
        (hash ^ c as u32).wrapping_mul(FNV_PRIME)
    })
}

/// A line paired with its fingerprint.
///
/// Equality compares the hash first and only then the text, so two lines
/// with colliding hashes are still treated as different lines.
#[derive(Debug, Clone, Copy)]
pub struct HashedLine<'a> {
    pub hash: u32,
    pub text: &'a str,
}

impl<'a> HashedLine<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            hash: hash_line(text),
            text,
        }
    }
}

impl PartialEq for HashedLine<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for HashedLine<'_> {}

/// Hash every line of a buffer.
pub fn hash_lines<'a, S: AsRef<str>>(lines: &'a [S]) -> Vec<HashedLine<'a>> {
    lines.iter().map(|l| HashedLine::new(l.as_ref())).collect()
}

/// Whole-buffer hash used by clients to check whether two buffers agree.
///
/// Java-style `h * 31 + c` over UTF-16 code units, truncated to a signed
/// 32-bit integer and rendered in base 36 (with a leading `-` when negative).
#[must_use]
pub fn content_hash(code: &str) -> String {
    let hash = code
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32));
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let negative = value < 0;
    let mut n = i64::from(value).unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
