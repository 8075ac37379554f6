use lox_base::{Diagnostic, Position, Span};

use crate::token::{Token, TokenKind, keyword};

/// Scans `source` into tokens. Lexical errors are reported and skipped, and the token stream
/// always ends with [`TokenKind::Eof`].
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    start: usize,
    start_at: Position,
    last_at: Position,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            start: 0,
            start_at: Position::new(1, 1),
            last_at: Position::new(1, 1),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        while !self.at_end() {
            self.start = self.pos;
            self.start_at = Position::new(self.line, self.column);
            self.scan_token();
        }
        let eof = Span::point(self.line, self.column);
        self.tokens.push(Token::new(TokenKind::Eof, "", eof));
    }

    fn scan_token(&mut self) {
        let Some(ch) = self.advance() else {
            return;
        };
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Star,
            '!' => self.pick('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.pick('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.pick('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.pick('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '/' if self.matches('/') => {
                while self.peek().is_some_and(|next| next != '\n') {
                    self.advance();
                }
                return;
            }
            '/' => TokenKind::Slash,
            ' ' | '\r' | '\t' | '\n' => return,
            '"' => {
                if !self.string() {
                    return;
                }
                TokenKind::String
            }
            digit if digit.is_ascii_digit() => {
                self.number();
                TokenKind::Number
            }
            alpha if is_identifier_start(alpha) => {
                while self.peek().is_some_and(is_identifier_char) {
                    self.advance();
                }
                keyword(&self.lexeme()).unwrap_or(TokenKind::Identifier)
            }
            other => {
                self.diagnostics.push(Diagnostic::error(
                    "E1001",
                    format!("unexpected character `{other}`"),
                    self.span(),
                ));
                return;
            }
        };
        let token = Token::new(kind, self.lexeme(), self.span());
        self.tokens.push(token);
    }

    fn string(&mut self) -> bool {
        while self.peek().is_some_and(|next| next != '"') {
            self.advance();
        }
        if self.at_end() {
            self.diagnostics.push(Diagnostic::error(
                "E1002",
                "unterminated string",
                Span::new(self.start_at, self.start_at),
            ));
            return false;
        }
        self.advance();
        true
    }

    fn number(&mut self) {
        while self.peek().is_some_and(|next| next.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|next| next.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|next| next.is_ascii_digit()) {
                self.advance();
            }
        }
    }

    fn pick(&mut self, expected: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.matches(expected) {
            matched
        } else {
            otherwise
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.pos)?;
        self.last_at = Position::new(self.line, self.column);
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.pos].iter().collect()
    }

    fn span(&self) -> Span {
        Span::new(self.start_at, self.last_at)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = lex(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn scans_operators_with_one_character_lookahead() {
        assert_eq!(
            kinds("! != = == < <= > >= / *"),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(
            kinds("var breaker = break;"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Break,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // two\n3"),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn number_needs_a_digit_after_the_dot() {
        let (tokens, _) = lex("12.5 7.");
        let lexemes: Vec<&str> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["12.5", "7", ".", ""]);
    }

    #[test]
    fn spans_are_one_based_and_inclusive() {
        let (tokens, _) = lex("var name\n  \"ab\nc\"");
        assert_eq!(tokens[1].span, Span::new(Position::new(1, 5), Position::new(1, 8)));
        assert_eq!(tokens[2].span, Span::new(Position::new(2, 3), Position::new(3, 2)));
        assert_eq!(tokens[2].lexeme, "\"ab\nc\"");
    }

    #[test]
    fn reports_every_bad_character_and_keeps_scanning() {
        let (tokens, diagnostics) = lex("@ 1 # \"open");
        let codes: Vec<&str> = diagnostics.iter().map(|diag| diag.code.as_str()).collect();
        assert_eq!(codes, vec!["E1001", "E1001", "E1002"]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }
}
