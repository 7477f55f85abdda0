//! Lexer module for FEEL - tokenizes source text before parsing
//!
//! This module provides the first half of a two-phase front end:
//! 1. Lexer: Source text → Token stream (with byte spans)
//! 2. Parser: Token stream → syntax tree
//!
//! Multi-word names (`date and time`, `Full Name`) are not recognized here;
//! the token parser reassembles them from the source text.

use crate::error::SyntaxError;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "lexer.pest"]
struct LexerParser;

/// Byte span of a token in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A token with its kind and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    True,
    False,
    Null,
    And,
    Or,
    If,
    Then,
    Else,
    For,
    In,
    Return,
    Some,
    Every,
    Satisfies,
    Function,
    Between,
    Instance,
    Of,

    // Literals
    Name(String),
    Number(f64),
    String(String),

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    StarStar,     // **
    Slash,        // /
    Equal,        // =
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    DotDot,       // ..
    Dot,          // .
    Question,     // ?
    At,           // @

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Colon,        // :

    // Special
    Unknown(String),
    Eof,
}

impl TokenKind {
    /// Whether this token is a reserved word
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Return
                | TokenKind::Some
                | TokenKind::Every
                | TokenKind::Satisfies
                | TokenKind::Function
                | TokenKind::Between
                | TokenKind::Instance
                | TokenKind::Of
        )
    }
}

/// Lexer that converts source text to tokens
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the source text
    ///
    /// Characters the grammar does not recognize become `Unknown` tokens;
    /// adjacent unknown characters are merged into a single token so the
    /// parser can report the whole offending run.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let pairs = LexerParser::parse(Rule::tokens, self.source).map_err(|e| {
            let offset = match e.location {
                pest::error::InputLocation::Pos(p) => p,
                pest::error::InputLocation::Span((s, _)) => s,
            };
            SyntaxError::unrecognized(&self.source[offset..], offset, self.source.len())
        })?;

        for pair in pairs {
            if pair.as_rule() != Rule::tokens {
                continue;
            }
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::token {
                    if let Some(token) = self.process_token(inner) {
                        self.push(token);
                    }
                }
            }
        }

        let end = self.source.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span {
                start: end,
                end,
                text: String::new(),
            },
        });

        Ok(std::mem::take(&mut self.tokens))
    }

    fn push(&mut self, token: Token) {
        if let TokenKind::Unknown(text) = &token.kind {
            if let Some(last) = self.tokens.last_mut() {
                if let TokenKind::Unknown(prev) = &mut last.kind {
                    if last.span.end == token.span.start {
                        prev.push_str(text);
                        last.span.end = token.span.end;
                        last.span.text.push_str(text);
                        return;
                    }
                }
            }
        }
        self.tokens.push(token);
    }

    fn process_token(&self, pair: pest::iterators::Pair<Rule>) -> Option<Token> {
        let inner = pair.into_inner().next()?;
        let span = Span {
            start: inner.as_span().start(),
            end: inner.as_span().end(),
            text: inner.as_str().to_string(),
        };
        let text = inner.as_str();

        let kind = match inner.as_rule() {
            Rule::number => match text.parse::<f64>() {
                Ok(n) => TokenKind::Number(n),
                Err(_) => TokenKind::Unknown(text.to_string()),
            },
            Rule::string => TokenKind::String(decode_string_literal(&text[1..text.len() - 1])),
            Rule::name => keyword_or_name(text),
            Rule::operator => match text {
                "**" => TokenKind::StarStar,
                ".." => TokenKind::DotDot,
                "<=" => TokenKind::LessEqual,
                ">=" => TokenKind::GreaterEqual,
                "!=" => TokenKind::NotEqual,
                "+" => TokenKind::Plus,
                "-" => TokenKind::Minus,
                "*" => TokenKind::Star,
                "/" => TokenKind::Slash,
                "=" => TokenKind::Equal,
                "<" => TokenKind::Less,
                ">" => TokenKind::Greater,
                "(" => TokenKind::LeftParen,
                ")" => TokenKind::RightParen,
                "[" => TokenKind::LeftBracket,
                "]" => TokenKind::RightBracket,
                "{" => TokenKind::LeftBrace,
                "}" => TokenKind::RightBrace,
                "," => TokenKind::Comma,
                "." => TokenKind::Dot,
                ":" => TokenKind::Colon,
                "?" => TokenKind::Question,
                "@" => TokenKind::At,
                other => TokenKind::Unknown(other.to_string()),
            },
            _ => TokenKind::Unknown(text.to_string()),
        };

        Some(Token { kind, span })
    }
}

fn keyword_or_name(text: &str) -> TokenKind {
    match text {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "return" => TokenKind::Return,
        "some" => TokenKind::Some,
        "every" => TokenKind::Every,
        "satisfies" => TokenKind::Satisfies,
        "function" => TokenKind::Function,
        "between" => TokenKind::Between,
        "instance" => TokenKind::Instance,
        "of" => TokenKind::Of,
        _ => TokenKind::Name(text.to_string()),
    }
}

/// Decode the body of a string literal (without the surrounding quotes)
///
/// Supports `\"`, `\\`, `\n`, `\r`, `\t`, short `\uXXXX` and long `\UXXXXXX`
/// escapes. Adjacent short escapes forming a UTF-16 surrogate pair are
/// combined into one scalar value; unpaired surrogates decode to U+FFFD.
/// Unknown escapes are kept verbatim.
pub fn decode_string_literal(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }

        match chars[i + 1] {
            '"' => {
                out.push('"');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                i += 2;
            }
            'n' => {
                out.push('\n');
                i += 2;
            }
            'r' => {
                out.push('\r');
                i += 2;
            }
            't' => {
                out.push('\t');
                i += 2;
            }
            '\'' => {
                out.push('\'');
                i += 2;
            }
            'u' => match hex_at(&chars, i + 2, 4) {
                Some(high) if (0xD800..0xDC00).contains(&high) => {
                    let low = if chars.get(i + 6) == Some(&'\\') && chars.get(i + 7) == Some(&'u') {
                        hex_at(&chars, i + 8, 4).filter(|l| (0xDC00..0xE000).contains(l))
                    } else {
                        None
                    };
                    match low {
                        Some(low) => {
                            let scalar = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(scalar).unwrap_or('\u{FFFD}'));
                            i += 12;
                        }
                        None => {
                            out.push('\u{FFFD}');
                            i += 6;
                        }
                    }
                }
                Some(code) => {
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    i += 6;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            'U' => match hex_at(&chars, i + 2, 6) {
                Some(code) => {
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    i += 8;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            _ => {
                out.push('\\');
                i += 1;
            }
        }
    }

    out
}

fn hex_at(chars: &[char], start: usize, len: usize) -> Option<u32> {
    if start + len > chars.len() {
        return None;
    }
    let digits: String = chars[start..start + len].iter().collect();
    u32::from_str_radix(&digits, 16).ok()
}

/// Convenience function to tokenize source text
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("if true then null else false"),
            vec![
                TokenKind::If,
                TokenKind::True,
                TokenKind::Then,
                TokenKind::Null,
                TokenKind::Else,
                TokenKind::False,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_range_numbers() {
        assert_eq!(
            kinds("1..4"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::DotDot,
                TokenKind::Number(4.0),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5), TokenKind::Eof]);
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("a ** 2 <= b != c"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::StarStar,
                TokenKind::Number(2.0),
                TokenKind::LessEqual,
                TokenKind::Name("b".into()),
                TokenKind::NotEqual,
                TokenKind::Name("c".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // one\n + /* two */ 2"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Plus,
                TokenKind::Number(2.0),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unknown_tokens_merge() {
        let tokens = tokenize("1 ~~ 2").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Unknown("~~".into()));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (2, 4));
    }

    #[test]
    fn test_position_tracking() {
        let tokens = tokenize("foo + bar").unwrap();
        assert_eq!((tokens[2].span.start, tokens[2].span.end), (6, 9));
        assert_eq!(tokens[2].span.text, "bar");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(decode_string_literal(r#"a\"b\\c\n"#), "a\"b\\c\n");
        assert_eq!(decode_string_literal(r"\u0041"), "A");
        assert_eq!(decode_string_literal(r"\U01F40E"), "🐎");
        assert_eq!(decode_string_literal(r"\uD83D\uDC0E"), "🐎");
        assert_eq!(decode_string_literal(r"\x"), "\\x");
    }
}
