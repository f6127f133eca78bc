/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 07/10/2026
Last Modified: 15/10/2026
License: MIT

Notes: dBase language driver ids and the text encodings used for attribute
values. The registry is a read-only static table.
*/
use std::fmt;
use tracing::warn;

pub const CODE_PAGE_UTF8: u16 = 65001;
pub const CODE_PAGE_LATIN1: u16 = 28591;
pub const CODE_PAGE_WINDOWS_1252: u16 = 1252;
pub const CODE_PAGE_CP437: u16 = 437;

/// A dBase language driver id and the code page it stands for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LanguageDriver {
    pub id: u8,
    pub code_page: u16,
    pub name: &'static str,
}

const fn ld(id: u8, code_page: u16, name: &'static str) -> LanguageDriver {
    LanguageDriver {
        id,
        code_page,
        name,
    }
}

static LANGUAGE_DRIVERS: [LanguageDriver; 36] = [
    ld(0x01, 437, "US MS-DOS"),
    ld(0x02, 850, "International MS-DOS"),
    ld(0x03, 1252, "Windows ANSI"),
    ld(0x04, 10000, "Standard Macintosh"),
    ld(0x08, 865, "Danish OEM"),
    ld(0x09, 437, "Dutch OEM"),
    ld(0x0A, 850, "Dutch OEM*"),
    ld(0x0B, 437, "Finnish OEM"),
    ld(0x0D, 437, "French OEM"),
    ld(0x0E, 850, "French OEM*"),
    ld(0x0F, 437, "German OEM"),
    ld(0x10, 850, "German OEM*"),
    ld(0x11, 437, "Italian OEM"),
    ld(0x12, 850, "Italian OEM*"),
    ld(0x13, 932, "Japanese Shift-JIS"),
    ld(0x14, 850, "Spanish OEM*"),
    ld(0x15, 437, "Swedish OEM"),
    ld(0x16, 850, "Swedish OEM*"),
    ld(0x17, 865, "Norwegian OEM"),
    ld(0x18, 437, "Spanish OEM"),
    ld(0x19, 437, "English OEM (Britain)"),
    ld(0x1A, 850, "English OEM (Britain)*"),
    ld(0x1B, 437, "English OEM (US)"),
    ld(0x26, 866, "Russian OEM"),
    ld(0x4D, 936, "Chinese GBK (PRC)"),
    ld(0x4E, 949, "Korean (ANSI/OEM)"),
    ld(0x4F, 950, "Chinese Big5 (Taiwan)"),
    ld(0x50, 874, "Thai (ANSI/OEM)"),
    ld(0x57, 1252, "ANSI"),
    ld(0x58, 1252, "Western European ANSI"),
    ld(0x59, 1252, "Spanish ANSI"),
    ld(0x64, 852, "Eastern European MS-DOS"),
    ld(0x65, 866, "Russian MS-DOS"),
    ld(0xC8, 1250, "Eastern European Windows"),
    ld(0xC9, 1251, "Russian Windows"),
    ld(0xCA, 1254, "Turkish Windows"),
];

/// Looks up a language driver id. Zero means "not specified".
pub fn language_driver(id: u8) -> Option<&'static LanguageDriver> {
    LANGUAGE_DRIVERS.iter().find(|d| d.id == id)
}

/// The language driver id written for a code page; 0 when dBase has none
/// (UTF-8 is declared through a .cpg file instead).
pub fn language_driver_for_code_page(code_page: u16) -> u8 {
    LANGUAGE_DRIVERS
        .iter()
        .find(|d| d.code_page == code_page)
        .map(|d| d.id)
        .unwrap_or(0)
}

/// Parses the contents of a .cpg file into a code page.
pub fn parse_cpg(contents: &str) -> Option<u16> {
    let name = contents.trim().to_uppercase();
    match name.as_str() {
        "" => None,
        "UTF-8" | "UTF8" | "65001" => Some(CODE_PAGE_UTF8),
        "ISO-8859-1" | "ISO8859-1" | "8859-1" | "88591" | "LATIN1" | "28591" => {
            Some(CODE_PAGE_LATIN1)
        }
        "WINDOWS-1252" | "CP1252" | "ANSI 1252" => Some(CODE_PAGE_WINDOWS_1252),
        "CP437" | "IBM437" | "OEM 437" => Some(CODE_PAGE_CP437),
        other => {
            let digits: String = other.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u16>().ok()
        }
    }
}

/// The text the .cpg side-car should hold for a code page.
pub fn cpg_name(code_page: u16) -> String {
    match code_page {
        CODE_PAGE_UTF8 => "UTF-8".to_string(),
        CODE_PAGE_LATIN1 => "ISO-8859-1".to_string(),
        cp => cp.to_string(),
    }
}

/// Windows-1252 characters for bytes 0x80 to 0x9F; the rest match Latin-1.
const WINDOWS_1252_HIGH: &str = "\u{20ac}\u{81}\u{201a}\u{192}\u{201e}\u{2026}\u{2020}\u{2021}\
\u{2c6}\u{2030}\u{160}\u{2039}\u{152}\u{8d}\u{17d}\u{8f}\
\u{90}\u{2018}\u{2019}\u{201c}\u{201d}\u{2022}\u{2013}\u{2014}\
\u{2dc}\u{2122}\u{161}\u{203a}\u{153}\u{9d}\u{17e}\u{178}";

/// Code page 437 characters for bytes 0x80 to 0xFF.
const CP437_HIGH: &str = "ÇüéâäàåçêëèïîìÄÅÉæÆôöòûùÿÖÜ¢£¥₧ƒáíóúñÑªº¿⌐¬½¼¡«»\
░▒▓│┤╡╢╖╕╣║╗╝╜╛┐└┴┬├─┼╞╟╚╔╩╦╠═╬╧╨╤╥╙╘╒╓╫╪┘┌█▄▌▐▀\
αßΓπΣσµτΦΘΩδ∞φε∩≡±≥≤⌠⌡÷≈°∙·√ⁿ²■\u{a0}";

/// A single-byte or UTF-8 text encoding for attribute values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
    Cp437,
    /// A code page without a decoder; treated as lossy UTF-8.
    Unsupported(u16),
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Windows1252 => write!(f, "Windows-1252"),
            TextEncoding::Latin1 => write!(f, "ISO-8859-1"),
            TextEncoding::Cp437 => write!(f, "CP437"),
            TextEncoding::Unsupported(cp) => write!(f, "code page {} (read as UTF-8)", cp),
        }
    }
}

impl TextEncoding {
    pub fn from_code_page(code_page: u16) -> TextEncoding {
        match code_page {
            CODE_PAGE_UTF8 => TextEncoding::Utf8,
            CODE_PAGE_WINDOWS_1252 => TextEncoding::Windows1252,
            CODE_PAGE_LATIN1 => TextEncoding::Latin1,
            CODE_PAGE_CP437 => TextEncoding::Cp437,
            cp => TextEncoding::Unsupported(cp),
        }
    }

    pub fn code_page(&self) -> u16 {
        match self {
            TextEncoding::Utf8 => CODE_PAGE_UTF8,
            TextEncoding::Windows1252 => CODE_PAGE_WINDOWS_1252,
            TextEncoding::Latin1 => CODE_PAGE_LATIN1,
            TextEncoding::Cp437 => CODE_PAGE_CP437,
            TextEncoding::Unsupported(cp) => *cp,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 | TextEncoding::Unsupported(_) => {
                String::from_utf8_lossy(bytes).into_owned()
            }
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => high_char(WINDOWS_1252_HIGH, b - 0x80),
                    _ => b as char,
                })
                .collect(),
            TextEncoding::Cp437 => bytes
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        b as char
                    } else {
                        high_char(CP437_HIGH, b - 0x80)
                    }
                })
                .collect(),
        }
    }

    /// Encodes `text`; characters the code page cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 | TextEncoding::Unsupported(_) => text.as_bytes().to_vec(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| if (c as u32) < 0x100 { c as u32 as u8 } else { b'?' })
                .collect(),
            TextEncoding::Windows1252 => text
                .chars()
                .map(|c| match c as u32 {
                    0..=0x7F | 0xA0..=0xFF => c as u32 as u8,
                    _ => high_byte(WINDOWS_1252_HIGH, c),
                })
                .collect(),
            TextEncoding::Cp437 => text
                .chars()
                .map(|c| {
                    if (c as u32) < 0x80 {
                        c as u32 as u8
                    } else {
                        high_byte(CP437_HIGH, c)
                    }
                })
                .collect(),
        }
    }
}

fn high_char(table: &str, index: u8) -> char {
    table.chars().nth(index as usize).unwrap_or('\u{fffd}')
}

fn high_byte(table: &str, c: char) -> u8 {
    match table.chars().position(|t| t == c) {
        Some(i) => 0x80 + i as u8,
        None => b'?',
    }
}

/// Picks the attribute encoding: a .cpg code page wins over the dBase
/// language driver, which wins over `default_code_page`.
pub fn resolve_encoding(cpg: Option<u16>, language_driver_id: u8, default_code_page: u16) -> TextEncoding {
    let code_page = match (cpg, language_driver(language_driver_id)) {
        (Some(cp), _) => cp,
        (None, Some(driver)) => driver.code_page,
        (None, None) => default_code_page,
    };
    let encoding = TextEncoding::from_code_page(code_page);
    if let TextEncoding::Unsupported(cp) = encoding {
        warn!(
            "No decoder for code page {}; attribute text will be read as UTF-8",
            cp
        );
    }
    encoding
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tables_are_complete() {
        assert_eq!(WINDOWS_1252_HIGH.chars().count(), 32);
        assert_eq!(CP437_HIGH.chars().count(), 128);
    }

    #[test]
    fn test_language_driver_lookup() {
        assert_eq!(language_driver(0x57).map(|d| d.code_page), Some(1252));
        assert_eq!(language_driver(0x01).map(|d| d.code_page), Some(437));
        assert!(language_driver(0x00).is_none());
        assert_eq!(language_driver_for_code_page(1252), 0x03);
        assert_eq!(language_driver_for_code_page(CODE_PAGE_UTF8), 0);
    }

    #[test]
    fn test_cpg_parsing() {
        assert_eq!(parse_cpg("UTF-8\r\n"), Some(65001));
        assert_eq!(parse_cpg("1252"), Some(1252));
        assert_eq!(parse_cpg("ANSI 1251"), Some(1251));
        assert_eq!(parse_cpg("iso-8859-1"), Some(28591));
        assert_eq!(parse_cpg("  "), None);
        assert_eq!(parse_cpg(&cpg_name(65001)), Some(65001));
    }

    #[test]
    fn test_resolution_order() {
        assert_eq!(resolve_encoding(Some(65001), 0x57, 437), TextEncoding::Utf8);
        assert_eq!(resolve_encoding(None, 0x57, 65001), TextEncoding::Windows1252);
        assert_eq!(resolve_encoding(None, 0, 437), TextEncoding::Cp437);
        assert_eq!(resolve_encoding(None, 0xC9, 65001), TextEncoding::Unsupported(1251));
    }

    #[test]
    fn test_single_byte_text() {
        let text = "Caf\u{e9} \u{20ac}5";
        let bytes = TextEncoding::Windows1252.encode(text);
        assert_eq!(bytes, vec![b'C', b'a', b'f', 0xE9, b' ', 0x80, b'5']);
        assert_eq!(TextEncoding::Windows1252.decode(&bytes), text);

        assert_eq!(TextEncoding::Latin1.encode("\u{20ac}"), vec![b'?']);
        assert_eq!(TextEncoding::Cp437.decode(&[0x82, 0xE1]), "\u{e9}\u{df}");
        assert_eq!(TextEncoding::Cp437.encode("\u{e9}"), vec![0x82]);
    }
}
