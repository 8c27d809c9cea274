use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Caption track metadata is inconsistent about language codes: the same
/// track may be tagged `en`, `eng`, or `en-US` depending on which page
/// surface exposed it. This module normalizes ISO 639-1 (2-letter) and
/// ISO 639-2 (3-letter) codes so the track resolver can compare them.
/// Normalize a language code to its ISO 639-1 form where one exists,
/// falling back to ISO 639-3. Region suffixes (`en-US`) are stripped
/// before lookup.
pub fn normalize_code(code: &str) -> Result<String> {
    let base = base_code(code);

    let language = match base.len() {
        2 => Language::from_639_1(&base),
        3 => Language::from_639_3(&base),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;

    Ok(language
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| language.to_639_3().to_string()))
}

/// Whether two language codes refer to the same language, tolerating
/// 2-letter vs 3-letter forms and region suffixes
pub fn language_codes_match(a: &str, b: &str) -> bool {
    match (normalize_code(a), normalize_code(b)) {
        (Ok(na), Ok(nb)) => na == nb,
        // Unknown codes only match byte-for-byte
        _ => base_code(a) == base_code(b),
    }
}

/// Whether a track's code carries a region variant of the given base
/// language (`en-GB` is a variant of `en`; `en` itself is not)
pub fn is_regional_variant(code: &str, base: &str) -> bool {
    let lowered = code.trim().to_lowercase();
    match lowered.split_once(['-', '_']) {
        Some((prefix, region)) => !region.is_empty() && language_codes_match(prefix, base),
        None => false,
    }
}

/// English display name for a language code, when resolvable
pub fn get_language_name(code: &str) -> Result<String> {
    let base = base_code(code);
    let language = match base.len() {
        2 => Language::from_639_1(&base),
        3 => Language::from_639_3(&base),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;

    Ok(language.to_name().to_string())
}

fn base_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}
