//! Tokenizer for the Starlark subset used by build manifests
//!
//! Tokens are produced lazily so that a malformed literal late in a file does not
//! prevent earlier rules from being parsed.

use crate::error::ParseError;
use crate::fragment::Span;

/// Leading byte order mark, skipped like whitespace
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Token categories the parser distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Str,
    Number,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Equals,
    Dot,
    /// Operators and anything else the parser only needs to skip over
    Other,
}

impl TokenKind {
    /// Closing delimiter for an opening bracket
    pub(crate) const fn closer(self) -> Option<char> {
        match self {
            Self::LParen => Some(')'),
            Self::LBracket => Some(']'),
            Self::LBrace => Some('}'),
            _ => None,
        }
    }

    /// Character of a closing bracket token
    pub(crate) const fn closing_char(self) -> Option<char> {
        match self {
            Self::RParen => Some(')'),
            Self::RBracket => Some(']'),
            Self::RBrace => Some('}'),
            _ => None,
        }
    }
}

/// Token with its source position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// Full token extent (for strings: prefix and quotes included)
    pub(crate) span: Span,
    /// For strings: the content between the delimiters; otherwise equal to `span`
    pub(crate) content: Span,
    /// First token on its physical line
    pub(crate) line_start: bool,
}

impl Token {
    /// Source text of the token
    pub(crate) fn text<'a>(&self, input: &'a str) -> &'a str {
        self.span.slice(input).unwrap_or_default()
    }
}

/// Lazy tokenizer over manifest text
pub(crate) struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub(crate) const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            at_line_start: true,
        }
    }

    /// Produce the next token, `Ok(None)` at end of input
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia();

        let bytes = self.input.as_bytes();
        let Some(&ch) = bytes.get(self.offset) else {
            return Ok(None);
        };
        let start = self.offset;

        let kind = match ch {
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b':' => self.single(TokenKind::Colon),
            b'.' if !bytes.get(start + 1).is_some_and(u8::is_ascii_digit) => {
                self.single(TokenKind::Dot)
            }
            b'=' => {
                if bytes.get(start + 1) == Some(&b'=') {
                    self.offset += 2;
                    TokenKind::Other
                } else {
                    self.single(TokenKind::Equals)
                }
            }
            b'"' | b'\'' => return self.string(start, start).map(Some),
            b'0'..=b'9' | b'.' => {
                self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_');
                TokenKind::Number
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_');
                let word = &self.input[start..self.offset];
                if is_string_prefix(word) && matches!(bytes.get(self.offset), Some(b'"' | b'\'')) {
                    let quote_at = self.offset;
                    return self.string(start, quote_at).map(Some);
                }
                TokenKind::Ident
            }
            _ => {
                // Multi-byte characters must be consumed whole to keep spans on
                // char boundaries.
                let width = self.input[start..].chars().next().map_or(1, char::len_utf8);
                self.offset += width;
                TokenKind::Other
            }
        };

        let span = Span::new(start, self.offset);
        Ok(Some(self.finish(kind, span, span)))
    }

    fn finish(&mut self, kind: TokenKind, span: Span, content: Span) -> Token {
        let line_start = self.at_line_start;
        self.at_line_start = false;
        Token {
            kind,
            span,
            content,
            line_start,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.offset += 1;
        kind
    }

    /// Lex a string literal whose prefix starts at `start` and quote at `quote_at`
    fn string(&mut self, start: usize, quote_at: usize) -> Result<Token, ParseError> {
        let bytes = self.input.as_bytes();
        let quote = bytes[quote_at];
        let triple = bytes.get(quote_at + 1) == Some(&quote) && bytes.get(quote_at + 2) == Some(&quote);
        let delimiter = if triple { 3 } else { 1 };
        let content_start = quote_at + delimiter;
        let mut pos = content_start;

        loop {
            let Some(&b) = bytes.get(pos) else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            match b {
                b'\\' => pos += 2,
                b'\n' if !triple => return Err(ParseError::UnterminatedString { offset: start }),
                _ if b == quote => {
                    if !triple {
                        break;
                    }
                    if bytes.get(pos + 1) == Some(&quote) && bytes.get(pos + 2) == Some(&quote) {
                        break;
                    }
                    pos += 1;
                }
                _ => pos += 1,
            }
        }

        self.offset = pos + delimiter;
        let span = Span::new(start, self.offset);
        let content = Span::new(content_start, pos);
        Ok(self.finish(TokenKind::Str, span, content))
    }

    /// Skip whitespace, comments and line continuations, tracking line starts
    fn skip_trivia(&mut self) {
        if self.offset == 0 && self.input.starts_with(BYTE_ORDER_MARK) {
            self.offset = BYTE_ORDER_MARK.len_utf8();
        }
        let bytes = self.input.as_bytes();
        while let Some(&b) = bytes.get(self.offset) {
            match b {
                b'\n' => {
                    self.at_line_start = true;
                    self.offset += 1;
                }
                b' ' | b'\t' | b'\r' | b'\x0c' => self.offset += 1,
                b'#' => self.consume_while(|b| b != b'\n'),
                b'\\' if bytes.get(self.offset + 1) == Some(&b'\n') => self.offset += 2,
                b'\\' if bytes.get(self.offset + 1) == Some(&b'\r')
                    && bytes.get(self.offset + 2) == Some(&b'\n') =>
                {
                    self.offset += 3;
                }
                _ => break,
            }
        }
    }

    fn consume_while<F>(&mut self, condition: F)
    where
        F: Fn(u8) -> bool,
    {
        let bytes = self.input.as_bytes();
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "b" | "rb" | "br"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn lexes_call_with_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"http_archive(name = "x", urls = ['a',],)"#),
            vec![
                Ident, LParen, Ident, Equals, Str, Comma, Ident, Equals, LBracket, Str, Comma,
                RBracket, Comma, RParen
            ]
        );
    }

    #[test]
    fn string_content_span_excludes_quotes() {
        let input = r#"x = "hello""#;
        let mut lexer = Lexer::new(input);
        let tokens: Vec<_> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        let s = tokens[2];
        assert_eq!(s.kind, TokenKind::Str);
        assert_eq!(s.content.slice(input), Some("hello"));
        assert_eq!(s.text(input), "\"hello\"");
    }

    #[test]
    fn raw_and_triple_quoted_strings() {
        let input = "a = r'x\\y'\nb = \"\"\"multi\nline\"\"\"";
        let mut lexer = Lexer::new(input);
        let tokens: Vec<_> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        assert_eq!(tokens[2].content.slice(input), Some("x\\y"));
        assert_eq!(tokens[5].content.slice(input), Some("multi\nline"));
    }

    #[test]
    fn escaped_quote_does_not_close() {
        let input = r#""a\"b""#;
        let mut lexer = Lexer::new(input);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.content.slice(input), Some(r#"a\"b"#));
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("# only a comment\nfoo() # trailing"), vec![Ident, LParen, RParen]);
    }

    #[test]
    fn tracks_line_starts() {
        let input = "foo(\n  a = 1,\n)\n  bar()";
        let mut lexer = Lexer::new(input);
        let tokens: Vec<_> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        let starts: Vec<_> = tokens
            .iter()
            .filter(|t| t.line_start)
            .map(|t| t.text(input))
            .collect();
        assert_eq!(starts, vec!["foo", "a", ")", "bar"]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("x = \"open\ny = 1");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(
            lexer.next_token(),
            Err(ParseError::UnterminatedString { offset: 4 })
        );
    }

    #[test]
    fn double_equals_is_not_assignment() {
        use TokenKind::*;
        assert_eq!(kinds("a == b"), vec![Ident, Other, Ident]);
    }

    #[test]
    fn non_ascii_is_consumed_whole() {
        let input = "é(x)";
        let mut lexer = Lexer::new(input);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.kind, TokenKind::Other);
        assert_eq!(tok.text(input), "é");
    }
}
