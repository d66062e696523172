use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics and everything that is not an ASCII letter or
/// whitespace, collapse whitespace runs to a single space and trim.
pub fn normalize_text(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_lowercase() || *c == ' ')
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Letters only, used where word boundaries do not matter (blocking keys, phonetic codes).
pub fn normalize_letters(input: &str) -> String {
    normalize_text(input).chars().filter(|c| *c != ' ').collect()
}

pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// American Soundex over the ASCII letters of `input` (`h`/`w` do not separate
/// equal codes, vowels do). Empty input yields an empty code.
pub fn soundex(input: &str) -> String {
    let letters = normalize_letters(input);
    let mut chars = letters.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return String::new(),
    };
    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut last = soundex_digit(first);
    for c in chars {
        if code.len() == 4 {
            break;
        }
        match soundex_digit(c) {
            Some(d) => {
                if last != Some(d) {
                    code.push(d);
                }
                last = Some(d);
            }
            None if c == 'h' || c == 'w' => {}
            None => last = None,
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_diacritics() {
        assert_eq!(normalize_text("Álvaro"), "alvaro");
        assert_eq!(normalize_text("ÉÉ"), "ee");
        assert_eq!(normalize_text("  José  "), "jose");
        assert_eq!(normalize_text("O'Brien-Smith\tJr."), "obriensmith jr");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in ["  Mary   Ann ", "Łukasz", "Zoë  d'Arc", "", "123"] {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn letters_drop_spaces() {
        assert_eq!(normalize_letters("De La Cruz"), "delacruz");
    }

    #[test]
    fn soundex_known_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Ashcraft"), "A261");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
        assert_eq!(soundex("Lee"), "L000");
        assert_eq!(soundex(""), "");
    }
}
