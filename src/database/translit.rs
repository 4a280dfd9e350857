/*
Ingredient search normalization.

Queries typed on a Latin keyboard layout that was never switched to
Cyrillic arrive as gibberish ("vjkjrj" for "молоко"). Every character is
remapped through the fixed layout table below before matching. Queries
that arrive percent-escaped are unescaped instead. The table must stay
byte-for-byte in sync with the layouts, it is load-bearing for clients.
*/

const LATIN_LAYOUT: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,./";
const CYRILLIC_LAYOUT: &str = "йцукенгшщзхъфывапролджэячсмитьбю.";

/// Remaps Latin-layout keystrokes to the Cyrillic characters on the same
/// physical keys. Characters outside the table pass through unchanged.
pub fn map_keyboard_layout(input: &str) -> String {
    let cyrillic: Vec<char> = CYRILLIC_LAYOUT.chars().collect();

    input
        .chars()
        .map(|c| match LATIN_LAYOUT.find(c) {
            // the Latin layout is ASCII, byte offset equals key position
            Some(index) => cyrillic[index],
            None => c,
        })
        .collect()
}

/// Decodes %XX escapes. Malformed escapes are kept as literal text and
/// invalid UTF-8 is replaced, matching the lenient decoding clients rely
/// on. `+` is not treated as a space.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let value = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());

            if let Some(byte) = value {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }

        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

/// Normalizes a raw ingredient search term: percent-escaped input is
/// unescaped, anything else goes through the keyboard layout table, and
/// the result is lowercased.
pub fn normalize_search_term(raw: &str) -> String {
    let term = if raw.starts_with('%') {
        percent_decode(raw)
    } else {
        map_keyboard_layout(raw)
    };

    term.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_table_round_trips_milk() {
        assert_eq!(map_keyboard_layout("vjkjrj"), "молоко");
    }

    #[test]
    fn layout_table_covers_every_key() {
        assert_eq!(map_keyboard_layout(LATIN_LAYOUT), CYRILLIC_LAYOUT);
    }

    #[test]
    fn layout_leaves_unmapped_characters_alone() {
        assert_eq!(map_keyboard_layout("сахар 5"), "сахар 5");
    }

    #[test]
    fn percent_escapes_are_unescaped() {
        assert_eq!(percent_decode("%D0%BC%D0%BE%D0%BB"), "мол");
    }

    #[test]
    fn malformed_escapes_stay_literal() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%ZZok"), "%ZZok");
    }

    #[test]
    fn plus_is_not_a_space() {
        assert_eq!(percent_decode("a+b"), "a+b");
    }

    #[test]
    fn normalization_unescapes_percent_input() {
        assert_eq!(normalize_search_term("%D0%9C%D0%BE%D0%BB"), "мол");
    }

    #[test]
    fn normalization_remaps_and_lowercases() {
        assert_eq!(normalize_search_term("vjkjrj"), "молоко");
        // uppercase keys are not in the table, they only get lowercased
        assert_eq!(normalize_search_term("Vjkjrj"), "vолоко");
    }
}
