//! Text decoding for the fixed-width string fields found in headers.
//!
//! All decoders stop at the first NUL and never fail: bytes that have no
//! mapping come out as U+FFFD.

use encoding_rs::{SHIFT_JIS, WINDOWS_1252};

use crate::utils::until_nul;

const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// ISO-8859-1.
pub fn latin1(field: &[u8]) -> String {
    until_nul(field).iter().map(|&b| b as char).collect()
}

/// Windows code page 1252.
pub fn cp1252(field: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(until_nul(field));
    text.into_owned()
}

/// Shift-JIS (Windows code page 932).
pub fn shift_jis(field: &[u8]) -> String {
    let (text, _) = SHIFT_JIS.decode_without_bom_handling(until_nul(field));
    text.into_owned()
}

/// IBM PC code page 437.
pub fn cp437(field: &[u8]) -> String {
    until_nul(field)
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// UTF-16LE, lossy. Stops at the first NUL code unit.
pub fn utf16le(field: &[u8]) -> String {
    let units: Vec<u16> = field
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Convert CRLF line endings to LF.
pub fn dos2unix(s: &str) -> String {
    s.replace("\r\n", "\n")
}

/// Trim trailing spaces and NULs, as padded title fields carry both.
pub fn trim_padding(s: &str) -> &str {
    s.trim_end_matches([' ', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_pages() {
        assert_eq!(latin1(b"Caf\xE9\0junk"), "Café");
        assert_eq!(cp437(b"Gl\x81cksrad"), "Glücksrad");
        assert_eq!(cp1252(b"\x93Quoted\x94 \x80 5"), "\u{201C}Quoted\u{201D} \u{20AC} 5");
    }

    #[test]
    fn test_utf16le() {
        let raw = [b'H', 0, b'i', 0, 0, 0, b'X', 0];
        assert_eq!(utf16le(&raw), "Hi");
        // odd trailing byte is dropped
        assert_eq!(utf16le(&[b'A', 0, b'B']), "A");
    }

    #[test]
    fn test_shift_jis() {
        // "セーブ" then NUL padding
        assert_eq!(shift_jis(b"\x83\x5A\x81\x5B\x83\x75\0\0"), "セーブ");
        assert_eq!(shift_jis(b"SONIC ADV"), "SONIC ADV");
        // lone lead byte at the end
        assert_eq!(shift_jis(b"A\x83"), "A\u{FFFD}");
    }

    #[test]
    fn test_line_endings_and_padding() {
        assert_eq!(dos2unix("a\r\nb\r\n"), "a\nb\n");
        assert_eq!(trim_padding("TITLE   \0\0"), "TITLE");
    }
}
