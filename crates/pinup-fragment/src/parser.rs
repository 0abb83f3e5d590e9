//! Recursive-descent parser producing rule invocations
//!
//! Only the shapes needed to address pinned dependencies are modelled: calls with
//! keyword arguments, and string, list and dict literals inside them. Everything
//! else is scanned for bracket balance and skipped.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::error::ParseError;
use crate::fragment::{ArrayFragment, Fragment, RecordFragment, Span, StringFragment};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::rule::RuleInvocation;

/// Calls that forward to the rule named by their first positional argument
const WRAPPERS: &[&str] = &["maybe"];

/// Line-leading words that never start an invocation
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else",
    "except", "for", "from", "global", "if", "import", "in", "is", "lambda", "not", "or",
    "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Result of scanning one expression
enum Expr {
    /// Pure literal that can be indexed
    Literal(Fragment),
    /// Bare identifier
    Ident(String),
    /// No tokens before the terminator
    Empty,
    /// Anything else
    Other,
}

pub(crate) struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub(crate) const fn new(input: &'a str) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
            peeked: None,
        }
    }

    /// Parse every top-level invocation, stopping at the first malformed construct
    ///
    /// Rules completed before the error are returned along with it.
    pub(crate) fn parse_document(mut self) -> (Vec<RuleInvocation>, Option<ParseError>) {
        let mut rules = Vec::new();
        match self.parse_rules(&mut rules) {
            Ok(()) => (rules, None),
            Err(err) => {
                tracing::debug!(
                    offset = err.offset(),
                    parsed = rules.len(),
                    error = %err,
                    "manifest parsing stopped early"
                );
                (rules, Some(err))
            }
        }
    }

    fn parse_rules(&mut self, rules: &mut Vec<RuleInvocation>) -> Result<(), ParseError> {
        while let Some(tok) = self.bump()? {
            match tok.kind {
                TokenKind::Ident if tok.line_start && !KEYWORDS.contains(&tok.text(self.input)) => {
                    if let Some(rule) = self.parse_invocation(tok, rules.len())? {
                        rules.push(rule);
                    }
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.skip_group(tok)?;
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    return Err(ParseError::unexpected(
                        format!("'{}'", tok.text(self.input)),
                        tok.span.start,
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse `name(.name)*(...)` starting at a line-leading identifier
    ///
    /// Returns `None` when the line turns out not to be a call.
    fn parse_invocation(
        &mut self,
        first: Token,
        index: usize,
    ) -> Result<Option<RuleInvocation>, ParseError> {
        let mut callee = first.text(self.input).to_string();

        while self.peek_kind()? == Some(TokenKind::Dot) {
            self.bump()?;
            match self.bump()? {
                Some(tok) if tok.kind == TokenKind::Ident => {
                    callee.push('.');
                    callee.push_str(tok.text(self.input));
                }
                Some(tok) => return self.not_a_call(tok).map(|()| None),
                None => return Ok(None),
            }
        }

        if self.peek_kind()? != Some(TokenKind::LParen) {
            return Ok(None);
        }
        self.bump()?;

        let (children, wrapped, close) = self.parse_arguments()?;
        let span = Span::new(first.span.start, close.span.end);

        let (rule, wrapper) = match wrapped {
            Some(inner) if WRAPPERS.contains(&callee.as_str()) => (inner, Some(callee.clone())),
            _ => (callee.clone(), None),
        };

        Ok(Some(RuleInvocation {
            index,
            callee,
            rule,
            wrapper,
            record: RecordFragment::new(children, span),
        }))
    }

    /// Hand an unexpected token back to the top-level scan
    fn not_a_call(&mut self, tok: Token) -> Result<(), ParseError> {
        if tok.kind.closer().is_some() {
            self.skip_group(tok)?;
        } else if tok.kind.closing_char().is_some() {
            return Err(ParseError::unexpected(
                format!("'{}'", tok.text(self.input)),
                tok.span.start,
            ));
        }
        Ok(())
    }

    /// Parse call arguments after `(`
    ///
    /// Returns literal keyword arguments, the first positional argument when it is
    /// a bare identifier, and the closing `)`.
    fn parse_arguments(
        &mut self,
    ) -> Result<(IndexMap<String, Fragment>, Option<String>, Token), ParseError> {
        let mut children = IndexMap::new();
        let mut seen_keys = HashSet::new();
        let mut first_positional = None;
        let mut position = 0usize;

        loop {
            let tok = self.expect_token()?;
            if tok.kind == TokenKind::RParen {
                return Ok((children, first_positional, tok));
            }

            let terminator = if tok.kind == TokenKind::Ident
                && self.peek_kind()? == Some(TokenKind::Equals)
            {
                self.bump()?;
                let key = tok.text(self.input).to_string();
                let value_tok = self.expect_token()?;
                let (value, terminator) = self.parse_expr(value_tok, false)?;
                // the first occurrence claims the key even when it is not a literal
                if seen_keys.insert(key.clone()) {
                    if let Expr::Literal(fragment) = value {
                        children.insert(key, fragment);
                    }
                }
                terminator
            } else {
                let (expr, terminator) = self.parse_expr(tok, false)?;
                if let (0, Expr::Ident(name)) = (position, expr) {
                    first_positional = Some(name);
                }
                position += 1;
                terminator
            };

            match terminator.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => return Ok((children, first_positional, terminator)),
                _ => return Err(self.mismatch(')', terminator)),
            }
        }
    }

    /// Scan one expression starting with `first`
    ///
    /// Consumes tokens up to and including the terminator at bracket depth zero:
    /// a comma, a closing bracket, or a colon when `stop_on_colon` is set.
    fn parse_expr(&mut self, first: Token, stop_on_colon: bool) -> Result<(Expr, Token), ParseError> {
        if is_terminator(first.kind, stop_on_colon) {
            return Ok((Expr::Empty, first));
        }

        let mut expr = match first.kind {
            TokenKind::Str => Expr::Literal(Fragment::String(StringFragment::new(
                first.content.slice(self.input).unwrap_or_default(),
                first.content,
            ))),
            TokenKind::LBracket => self.parse_list(first)?,
            TokenKind::LBrace => self.parse_dict(first)?,
            TokenKind::LParen => {
                self.skip_group(first)?;
                Expr::Other
            }
            TokenKind::Ident => Expr::Ident(first.text(self.input).to_string()),
            _ => Expr::Other,
        };

        loop {
            let tok = self.expect_token()?;
            if is_terminator(tok.kind, stop_on_colon) {
                return Ok((expr, tok));
            }
            if tok.kind.closer().is_some() {
                self.skip_group(tok)?;
            }
            expr = Expr::Other;
        }
    }

    /// Parse a list literal after `[`
    ///
    /// The list is indexed only if every element is a literal.
    fn parse_list(&mut self, open: Token) -> Result<Expr, ParseError> {
        let mut children = Vec::new();
        let mut literal = true;

        let close = loop {
            let tok = self.expect_token()?;
            if tok.kind == TokenKind::RBracket {
                break tok;
            }
            let (expr, terminator) = self.parse_expr(tok, false)?;
            match expr {
                Expr::Literal(fragment) => children.push(fragment),
                Expr::Empty => {}
                Expr::Ident(_) | Expr::Other => literal = false,
            }
            match terminator.kind {
                TokenKind::Comma => {}
                TokenKind::RBracket => break terminator,
                _ => return Err(self.mismatch(']', terminator)),
            }
        };

        if !literal {
            return Ok(Expr::Other);
        }
        let span = Span::new(open.span.start, close.span.end);
        Ok(Expr::Literal(Fragment::Array(ArrayFragment::new(children, span))))
    }

    /// Parse a dict literal after `{`
    ///
    /// Entries with a string key and a literal value are indexed, first key wins.
    /// Set literals are not indexed.
    fn parse_dict(&mut self, open: Token) -> Result<Expr, ParseError> {
        let mut children = IndexMap::new();
        let mut seen_keys = HashSet::new();
        let mut is_set = false;

        let close = loop {
            let tok = self.expect_token()?;
            if tok.kind == TokenKind::RBrace {
                break tok;
            }
            let (key, terminator) = self.parse_expr(tok, true)?;
            let terminator = match terminator.kind {
                TokenKind::Colon => {
                    let value_tok = self.expect_token()?;
                    let (value, terminator) = self.parse_expr(value_tok, false)?;
                    if let Expr::Literal(Fragment::String(key)) = key {
                        let key = key.value().to_string();
                        if seen_keys.insert(key.clone()) {
                            if let Expr::Literal(value) = value {
                                children.insert(key, value);
                            }
                        }
                    }
                    terminator
                }
                _ => {
                    is_set = true;
                    terminator
                }
            };
            match terminator.kind {
                TokenKind::Comma => {}
                TokenKind::RBrace => break terminator,
                _ => return Err(self.mismatch('}', terminator)),
            }
        };

        if is_set {
            return Ok(Expr::Other);
        }
        let span = Span::new(open.span.start, close.span.end);
        Ok(Expr::Literal(Fragment::Record(RecordFragment::new(children, span))))
    }

    /// Skip a bracketed group whose opening token was just consumed
    fn skip_group(&mut self, open: Token) -> Result<(), ParseError> {
        let Some(closer) = open.kind.closer() else {
            return Ok(());
        };
        let mut stack = vec![closer];

        while let Some(&expected) = stack.last() {
            let tok = self.expect_token()?;
            if let Some(nested) = tok.kind.closer() {
                stack.push(nested);
            } else if let Some(found) = tok.kind.closing_char() {
                if found != expected {
                    return Err(ParseError::MismatchedBracket {
                        expected,
                        found,
                        offset: tok.span.start,
                    });
                }
                stack.pop();
            }
        }
        Ok(())
    }

    fn mismatch(&self, expected: char, tok: Token) -> ParseError {
        match tok.kind.closing_char() {
            Some(found) => ParseError::MismatchedBracket {
                expected,
                found,
                offset: tok.span.start,
            },
            None => ParseError::unexpected(format!("'{}'", tok.text(self.input)), tok.span.start),
        }
    }

    fn bump(&mut self) -> Result<Option<Token>, ParseError> {
        match self.peeked.take() {
            Some(tok) => Ok(Some(tok)),
            None => self.lexer.next_token(),
        }
    }

    fn expect_token(&mut self) -> Result<Token, ParseError> {
        self.bump()?.ok_or(ParseError::UnexpectedEof {
            offset: self.input.len(),
        })
    }

    fn peek_kind(&mut self) -> Result<Option<TokenKind>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.map(|t| t.kind))
    }
}

fn is_terminator(kind: TokenKind, stop_on_colon: bool) -> bool {
    match kind {
        TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => true,
        TokenKind::Colon => stop_on_colon,
        _ => false,
    }
}
