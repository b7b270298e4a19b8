use tabdb_core::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Real(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Question,
    Colon,
    OrOr,
    AndAnd,
    Bang,
    Eq,
    Ne,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Eof,
}

/// Hand-rolled tokenizer for the §4.2.1 lexical classes. Produces the whole
/// token stream up front since expressions are parsed once and reused
/// across every row of a batch command (§4.2.5).
pub fn lex(source: &str) -> Result<Vec<Token>, EngineError> {
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            '[' => { tokens.push(Token::LBracket); i += 1; }
            ']' => { tokens.push(Token::RBracket); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            '?' => { tokens.push(Token::Question); i += 1; }
            ':' => { tokens.push(Token::Colon); i += 1; }
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(EngineError::expression(format!("unexpected character '|' at position {i}")));
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(EngineError::expression(format!("unexpected character '&' at position {i}")));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '=' => { tokens.push(Token::Eq); i += 1; }
            '<' => { tokens.push(Token::Lt); i += 1; }
            '>' => { tokens.push(Token::Gt); i += 1; }
            '\'' => {
                let start = i;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(EngineError::expression(format!(
                                "unterminated string literal starting at position {start}"
                            )));
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some('\n') | Some('\r') => {
                            return Err(EngineError::expression(format!(
                                "newline in string literal starting at position {start}"
                            )));
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    tokens.push(Token::Real(text.parse().unwrap()));
                } else {
                    let text: String = chars[start..i].iter().collect();
                    tokens.push(Token::Int(text.parse().unwrap()));
                }
            }
            c if c == '_' || c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i] == '_' || chars[i].is_alphanumeric()) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            other => {
                return Err(EngineError::expression(format!("unexpected character '{other}' at position {i}")));
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_real_vs_int() {
        let toks = lex("12 12.5").unwrap();
        assert_eq!(toks[0], Token::Int(12));
        assert_eq!(toks[1], Token::Real(12.5));
    }

    #[test]
    fn lexes_string_literal() {
        let toks = lex("'hello world'").unwrap();
        assert_eq!(toks[0], Token::Str("hello world".into()));
    }

    #[test]
    fn bang_equals_is_ne_not_bang_then_eq() {
        let toks = lex("a != b").unwrap();
        assert_eq!(toks[1], Token::Ne);
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(lex("'abc").is_err());
    }

    #[test]
    fn indexed_ref_tokens() {
        let toks = lex("col[-1]").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("col".into()),
                Token::LBracket,
                Token::Minus,
                Token::Int(1),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }
}
