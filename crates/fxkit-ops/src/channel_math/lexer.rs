//! Tokenizer for channel expressions.

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
}

/// Splits `src` into tokens.
///
/// Errors carry the byte offset of the offending character.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text = &src[start..i];
            let value = text
                .parse::<f64>()
                .map_err(|_| format!("bad number '{text}' at {start}"))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(src[start..i].to_string()));
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let (token, len) = match (c, next) {
            (b'<', Some(b'=')) => (Token::LessEq, 2),
            (b'>', Some(b'=')) => (Token::GreaterEq, 2),
            (b'=', Some(b'=')) => (Token::EqEq, 2),
            (b'!', Some(b'=')) => (Token::NotEq, 2),
            (b'&', Some(b'&')) => (Token::AndAnd, 2),
            (b'|', Some(b'|')) => (Token::OrOr, 2),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'^', _) => (Token::Caret, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b',', _) => (Token::Comma, 1),
            (b'?', _) => (Token::Question, 1),
            (b':', _) => (Token::Colon, 1),
            (b'<', _) => (Token::Less, 1),
            (b'>', _) => (Token::Greater, 1),
            (b'!', _) => (Token::Bang, 1),
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(format!("unexpected character '{ch}' at {i}"));
            }
        };
        tokens.push(token);
        i += len;
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("1 2.5 .5 1e3 2E-2").unwrap(),
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(0.02),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("a<=b&&!c||d!=e").unwrap(),
            vec![
                Token::Ident("a".into()),
                Token::LessEq,
                Token::Ident("b".into()),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("c".into()),
                Token::OrOr,
                Token::Ident("d".into()),
                Token::NotEq,
                Token::Ident("e".into()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("r # g").unwrap_err();
        assert!(err.contains("'#'"));
        assert!(tokenize("r & g").is_err());
    }
}
