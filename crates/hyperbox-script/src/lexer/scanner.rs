// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes script source code.
#[derive(Clone)]
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            let mut token = Token::new(TokenKind::Eof, Span::new(start, start));
            token.newline_before = newline_before;
            return token;
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,

            // Multi-character tokens
            '.' => self.scan_dot(),
            '+' => self.scan_compound('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => self.scan_compound(
                '-',
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEqual,
            ),
            '*' => self.scan_assign_op(TokenKind::Star, TokenKind::StarEqual),
            '/' => self.scan_assign_op(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_assign_op(TokenKind::Percent, TokenKind::PercentEqual),
            '<' => self.scan_assign_op(TokenKind::LessThan, TokenKind::LessThanEqual),
            '>' => self.scan_assign_op(TokenKind::GreaterThan, TokenKind::GreaterThanEqual),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_double('&', TokenKind::AmpersandAmpersand),
            '|' => self.scan_double('|', TokenKind::PipePipe),
            '?' => {
                if self.peek() == Some('?') {
                    self.advance();
                    TokenKind::QuestionQuestion
                } else {
                    TokenKind::Question
                }
            }

            // String literals
            '"' | '\'' => self.scan_string(ch),

            // Numbers
            '0'..='9' => self.scan_number(ch),

            // Identifiers and keywords
            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid,
        };

        let mut token = Token::new(kind, Span::new(start, self.current_pos));
        token.newline_before = newline_before;
        token
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    /// Skips whitespace and comments, returning whether a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some((_, ch)) = self.advance() {
                            if ch == '\n' {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        newline
    }

    fn scan_dot(&mut self) -> TokenKind {
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() => self.scan_number('.'),
            _ => TokenKind::Dot,
        }
    }

    /// Scans `x`, `xx` or `x=` (for `+` and `-`).
    fn scan_compound(
        &mut self,
        ch: char,
        single: TokenKind,
        double: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        match self.peek() {
            Some(next) if next == ch => {
                self.advance();
                double
            }
            Some('=') => {
                self.advance();
                assign
            }
            _ => single,
        }
    }

    fn scan_assign_op(&mut self, single: TokenKind, assign: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            assign
        } else {
            single
        }
    }

    fn scan_double(&mut self, ch: char, double: TokenKind) -> TokenKind {
        if self.peek() == Some(ch) {
            self.advance();
            double
        } else {
            TokenKind::Invalid
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::StrictEqual
                } else {
                    TokenKind::EqualEqual
                }
            }
            Some('>') => {
                self.advance();
                TokenKind::Arrow
            }
            _ => TokenKind::Equal,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::StrictNotEqual
                } else {
                    TokenKind::NotEqual
                }
            }
            _ => TokenKind::Bang,
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some((_, '\n')) => return TokenKind::Invalid,
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => {
                    let Some((_, escaped)) = self.advance() else {
                        return TokenKind::Invalid;
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        'x' => match self.scan_hex_escape(2) {
                            Some(c) => value.push(c),
                            None => return TokenKind::Invalid,
                        },
                        'u' => match self.scan_hex_escape(4) {
                            Some(c) => value.push(c),
                            None => return TokenKind::Invalid,
                        },
                        // Line continuation
                        '\n' => {}
                        _ => value.push(escaped),
                    }
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, ch) = self.advance()?;
            code = code * 16 + ch.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let mut digits = String::new();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_hexdigit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return match u64::from_str_radix(&digits, 16) {
                Ok(n) => TokenKind::Number(n as f64),
                Err(_) => TokenKind::Invalid,
            };
        }

        let mut value = String::from(first);
        let mut seen_dot = first == '.';
        let mut seen_exp = false;

        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => value.push(ch),
                '_' => {}
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    value.push(ch);
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    value.push(ch);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        value.push(sign);
                        self.advance();
                    }
                    continue;
                }
                _ => break,
            }
            self.advance();
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "break" => TokenKind::Break,
            "catch" => TokenKind::Catch,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "delete" => TokenKind::Delete,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::Instanceof,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::Typeof,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier(name),
        }
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("{ } ( ) ;"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_module_exports_assignment() {
        assert_eq!(
            kinds("module.exports = 12;"),
            vec![
                TokenKind::Identifier("module".into()),
                TokenKind::Dot,
                TokenKind::Identifier("exports".into()),
                TokenKind::Equal,
                TokenKind::Number(12.0),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("=== !== == != => += ++ -- && || ??"),
            vec![
                TokenKind::StrictEqual,
                TokenKind::StrictNotEqual,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::Arrow,
                TokenKind::PlusEqual,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::QuestionQuestion,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 .5 1e3 0xff 1_000"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(255.0),
                TokenKind::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'a\nb' "q\"" '\x41B'"#),
            vec![
                TokenKind::String("a\nb".into()),
                TokenKind::String("q\"".into()),
                TokenKind::String("AB".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        assert_eq!(kinds("'abc"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut scanner = Scanner::new("a // comment\n/* block\n */ b");
        let a = scanner.next_token();
        assert!(!a.newline_before);
        let b = scanner.next_token();
        assert_eq!(b.kind, TokenKind::Identifier("b".into()));
        assert!(b.newline_before);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("var let const function return typeof"),
            vec![
                TokenKind::Var,
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Function,
                TokenKind::Return,
                TokenKind::Typeof,
            ]
        );
    }
}
