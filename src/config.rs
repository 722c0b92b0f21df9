//! Runtime settings handed to every handler.
//!
//! There is no global state: the [`Detector`](crate::Detector) owns a
//! [`Settings`] value and passes it to each handler it constructs.

use std::env;

/// Pack an ASCII language tag into a language code: `lang_code(b"en")`
/// is `0x656E`. At most four bytes are used.
pub const fn lang_code(tag: &[u8]) -> u32 {
    let mut code = 0u32;
    let mut i = 0;
    while i < tag.len() && i < 4 {
        code = (code << 8) | tag[i] as u32;
        i += 1;
    }
    code
}

/// Unpack a language code into its ASCII tag.
pub fn lang_tag(code: u32) -> String {
    code.to_be_bytes()
        .iter()
        .skip_while(|&&b| b == 0)
        .map(|&b| b as char)
        .collect()
}

pub const LC_EN: u32 = lang_code(b"en");
pub const LC_JA: u32 = lang_code(b"ja");
pub const LC_DE: u32 = lang_code(b"de");
pub const LC_FR: u32 = lang_code(b"fr");
pub const LC_ES: u32 = lang_code(b"es");
pub const LC_IT: u32 = lang_code(b"it");
pub const LC_NL: u32 = lang_code(b"nl");
pub const LC_PT: u32 = lang_code(b"pt");
pub const LC_RU: u32 = lang_code(b"ru");
pub const LC_KO: u32 = lang_code(b"ko");
pub const LC_PL: u32 = lang_code(b"pl");
pub const LC_ZH: u32 = lang_code(b"zh");
pub const LC_HANS: u32 = lang_code(b"hans");
pub const LC_HANT: u32 = lang_code(b"hant");

/// Localization hook for user-visible field names: `(context, key) -> text`.
pub type TranslateFn = fn(&str, &str) -> String;

fn identity(_ctx: &str, key: &str) -> String {
    key.to_owned()
}

/// Handler-facing settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Preferred display language.
    pub language: u32,
    /// Field-name translator.
    pub translate: TranslateFn,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: LC_EN,
            translate: identity,
        }
    }
}

impl Settings {
    /// Creates settings with English and no translation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred display language.
    pub fn language(mut self, lc: u32) -> Self {
        self.language = lc;
        self
    }

    /// Sets the field-name translator.
    pub fn translator(mut self, f: TranslateFn) -> Self {
        self.translate = f;
        self
    }

    /// Settings with the language taken from the POSIX locale variables.
    pub fn from_env() -> Self {
        let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|v| env::var(v).ok())
            .find(|v| !v.is_empty());
        let lc = locale.as_deref().map(parse_locale).unwrap_or(LC_EN);
        Self::default().language(lc)
    }

    /// Localize a field name.
    #[inline]
    pub fn tr(&self, ctx: &str, key: &str) -> String {
        (self.translate)(ctx, key)
    }
}

/// Language code of a POSIX locale string such as `de_DE.UTF-8`.
///
/// `C`, `POSIX` and anything unparseable fall back to English.
pub fn parse_locale(locale: &str) -> u32 {
    let lang = locale
        .split(['_', '.', '@', '-'])
        .next()
        .unwrap_or_default();
    if lang.eq_ignore_ascii_case("C") || lang.eq_ignore_ascii_case("POSIX") {
        return LC_EN;
    }
    if !(2..=3).contains(&lang.len()) || !lang.bytes().all(|b| b.is_ascii_alphabetic()) {
        return LC_EN;
    }
    lang_code(lang.to_ascii_lowercase().as_bytes())
}
