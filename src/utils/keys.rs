use thiserror::Error;

/// Error produced while parsing a key sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    /// A `<...>` token did not name a known key.
    #[error("unrecognized key token <{0}>")]
    UnknownToken(String),
}

/// A named (non-character) key usable inside a `send_keys` sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NamedKey {
    Enter,
    Tab,
    Esc,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Space,
}

impl NamedKey {
    /// Look up a token name (the part between `<` and `>`).
    pub fn from_token(name: &str) -> Option<Self> {
        match name {
            "ENTER" => Some(Self::Enter),
            "TAB" => Some(Self::Tab),
            "ESC" => Some(Self::Esc),
            "BACKSPACE" => Some(Self::Backspace),
            "DELETE" => Some(Self::Delete),
            "HOME" => Some(Self::Home),
            "END" => Some(Self::End),
            "PAGE_UP" => Some(Self::PageUp),
            "PAGE_DOWN" => Some(Self::PageDown),
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "SPACE" => Some(Self::Space),
            _ => None,
        }
    }
}

/// One unit of a parsed key sequence: either a named key or a literal character.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyToken {
    Named(NamedKey),
    Literal(char),
}

/// Parse a `send_keys` sequence left to right.
///
/// Grammar:
/// - `<NAME>` is a named-key token (see [`NamedKey::from_token`]); an unknown
///   name is an error naming the token.
/// - Every other character denotes itself and is sent literally, in order —
///   spaces included.
/// - A `<` with no closing `>` is not a token; it and the characters after it
///   are treated as literals.
pub fn parse_sequence(sequence: &str) -> Result<Vec<KeyToken>, KeyParseError> {
    let mut out = Vec::new();
    let chars: Vec<char> = sequence.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '<' {
            if let Some(rel_end) = chars[i + 1..].iter().position(|&c| c == '>') {
                let name: String = chars[i + 1..i + 1 + rel_end].iter().collect();
                match NamedKey::from_token(&name) {
                    Some(key) => out.push(KeyToken::Named(key)),
                    None => return Err(KeyParseError::UnknownToken(name)),
                }
                i += rel_end + 2;
                continue;
            }
            // Unterminated tag: fall through and emit the '<' literally.
        }
        out.push(KeyToken::Literal(chars[i]));
        i += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_named_token() {
        assert_eq!(
            parse_sequence("<ENTER>").unwrap(),
            vec![KeyToken::Named(NamedKey::Enter)]
        );
    }

    #[test]
    fn literals_then_named() {
        assert_eq!(
            parse_sequence("hi<ENTER>").unwrap(),
            vec![
                KeyToken::Literal('h'),
                KeyToken::Literal('i'),
                KeyToken::Named(NamedKey::Enter),
            ]
        );
    }

    #[test]
    fn spaces_are_literal() {
        assert_eq!(
            parse_sequence("a b").unwrap(),
            vec![
                KeyToken::Literal('a'),
                KeyToken::Literal(' '),
                KeyToken::Literal('b'),
            ]
        );
    }

    #[test]
    fn unknown_token_names_the_token() {
        assert_eq!(
            parse_sequence("x<NOPE>y"),
            Err(KeyParseError::UnknownToken("NOPE".into()))
        );
    }

    #[test]
    fn unterminated_tag_is_literal() {
        assert_eq!(
            parse_sequence("<ab").unwrap(),
            vec![
                KeyToken::Literal('<'),
                KeyToken::Literal('a'),
                KeyToken::Literal('b'),
            ]
        );
    }

    #[test]
    fn empty_sequence_is_empty() {
        assert!(parse_sequence("").unwrap().is_empty());
    }

    #[test]
    fn all_named_tokens_resolve() {
        for name in [
            "ENTER",
            "TAB",
            "ESC",
            "BACKSPACE",
            "DELETE",
            "HOME",
            "END",
            "PAGE_UP",
            "PAGE_DOWN",
            "UP",
            "DOWN",
            "LEFT",
            "RIGHT",
            "SPACE",
        ] {
            assert!(NamedKey::from_token(name).is_some(), "missing {name}");
        }
        // Lookups are case-sensitive, matching the persisted form.
        assert!(NamedKey::from_token("enter").is_none());
    }
}
