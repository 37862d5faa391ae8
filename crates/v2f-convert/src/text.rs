#![deny(unsafe_code)]

//! Heuristic free-text parsers for bare-string names, addresses, and
//! phone numbers. Best effort only; composite input never comes here.

/// A person name split from free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub family: Option<String>,
    pub given: Vec<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

const NAME_PREFIXES: [&str; 7] = ["DR", "MR", "MRS", "MS", "PROF", "REV", "SIR"];
const NAME_SUFFIXES: [&str; 11] = [
    "JR", "SR", "II", "III", "IV", "MD", "PHD", "DO", "RN", "DDS", "ESQ",
];

fn strip_dots(token: &str) -> String {
    token.trim_matches([',', '.']).to_uppercase()
}

/// Split a free-text person name.
///
/// `Last, First Middle` is comma-first; otherwise the last token is the
/// family name. Honorific prefixes and professional suffixes are peeled
/// off either way.
pub fn parse_person_name(raw: &str) -> ParsedName {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedName::default();
    }

    let mut parsed = ParsedName::default();
    let (family_part, given_part) = match trimmed.split_once(',') {
        Some((family, given)) => (Some(family.trim().to_string()), given.trim().to_string()),
        None => (None, trimmed.to_string()),
    };

    let mut tokens: Vec<String> = given_part
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if let Some(first) = tokens.first() {
        if NAME_PREFIXES.contains(&strip_dots(first).as_str()) {
            parsed.prefix = Some(tokens.remove(0));
        }
    }
    if let Some(last) = tokens.last() {
        if NAME_SUFFIXES.contains(&strip_dots(last).as_str()) {
            parsed.suffix = tokens.pop();
        }
    }

    match family_part {
        Some(family) => {
            parsed.family = Some(family);
            parsed.given = tokens;
        }
        None => {
            parsed.family = tokens.pop();
            parsed.given = tokens;
        }
    }
    parsed
}

/// An address split from free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
    pub lines: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Split `street, city, ST zip` free text. Everything before the last two
/// comma-separated parts stays as address lines.
pub fn parse_address(raw: &str) -> ParsedAddress {
    let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    let mut parsed = ParsedAddress::default();
    match parts.as_slice() {
        [] => {}
        [only] => parsed.lines.push((*only).to_string()),
        [lines @ .., city, region] => {
            parsed.lines = lines.iter().map(|l| (*l).to_string()).collect();
            parsed.city = Some((*city).to_string());
            let mut region_tokens: Vec<&str> = region.split_whitespace().collect();
            if let Some(last) = region_tokens.last() {
                if last.chars().any(|c| c.is_ascii_digit()) {
                    parsed.postal_code = region_tokens.pop().map(str::to_string);
                }
            }
            if !region_tokens.is_empty() {
                parsed.state = Some(region_tokens.join(" "));
            }
        }
    }
    parsed
}

/// Telecom kind guessed from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelecomKind {
    Phone,
    Email,
    Url,
}

pub fn classify_telecom(raw: &str) -> Option<TelecomKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('@') {
        return Some(TelecomKind::Email);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(TelecomKind::Url);
    }
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= 7 {
        return Some(TelecomKind::Phone);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_first_name() {
        let parsed = parse_person_name("Doe, Jane Marie");
        assert_eq!(parsed.family.as_deref(), Some("Doe"));
        assert_eq!(parsed.given, vec!["Jane", "Marie"]);
    }

    #[test]
    fn natural_order_name_with_prefix_and_suffix() {
        let parsed = parse_person_name("Dr. Jane Doe Jr");
        assert_eq!(parsed.prefix.as_deref(), Some("Dr."));
        assert_eq!(parsed.family.as_deref(), Some("Doe"));
        assert_eq!(parsed.given, vec!["Jane"]);
        assert_eq!(parsed.suffix.as_deref(), Some("Jr"));
    }

    #[test]
    fn single_token_is_family() {
        let parsed = parse_person_name("Doe");
        assert_eq!(parsed.family.as_deref(), Some("Doe"));
        assert!(parsed.given.is_empty());
    }

    #[test]
    fn address_with_state_and_zip() {
        let parsed = parse_address("123 Main St, Springfield, IL 62704");
        assert_eq!(parsed.lines, vec!["123 Main St"]);
        assert_eq!(parsed.city.as_deref(), Some("Springfield"));
        assert_eq!(parsed.state.as_deref(), Some("IL"));
        assert_eq!(parsed.postal_code.as_deref(), Some("62704"));
    }

    #[test]
    fn bare_address_is_one_line() {
        let parsed = parse_address("123 Main St");
        assert_eq!(parsed.lines, vec!["123 Main St"]);
        assert!(parsed.city.is_none());
    }

    #[test]
    fn telecom_classification() {
        assert_eq!(classify_telecom("jane@example.org"), Some(TelecomKind::Email));
        assert_eq!(classify_telecom("(555) 867-5309"), Some(TelecomKind::Phone));
        assert_eq!(classify_telecom("https://example.org"), Some(TelecomKind::Url));
        assert_eq!(classify_telecom("x"), None);
    }
}
