use crate::token::{Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

/// Splits `source` into tokens, always terminated by an EOF token.
///
/// Scanning keeps going after an error so that every bad character in the
/// input is reported at once.
pub fn scan_tokens(source: &str) -> Result<Vec<Token>, Vec<ScanError>> {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<ScanError> = Vec::new();

    while let Some((idx, _)) = scanner.iter.peek() {
        scanner.start = *idx;
        match scanner.scan_token() {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => (),
            Err(e) => errors.push(e),
        }
    }
    tokens.push(Token {
        tokentype: TokenType::EOF,
        lexeme: String::new(),
        line: scanner.line,
    });
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, ScanError> {
        match self.advance()?.1 {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            '[' => Ok(Some(self.token(TokenType::LeftBracket))),
            ']' => Ok(Some(self.token(TokenType::RightBracket))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            '.' => Ok(Some(self.token(TokenType::Dot))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            ';' => Ok(Some(self.token(TokenType::Semicolon))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '!' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::BangEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Bang)))
                }
            }
            '=' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::EqualEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Equal)))
                }
            }
            '<' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::LessEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Less)))
                }
            }
            '>' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::GreaterEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Greater)))
                }
            }
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    Ok(None)
                } else {
                    Ok(Some(self.token(TokenType::Slash)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' => Ok(Some(self.string()?)),
            '0'..='9' => Ok(Some(self.number()?)),
            'a'..='z' | 'A'..='Z' | '_' => Ok(Some(self.identifier())),
            _ => Err(self.error("Unexpected character.")),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token {
        let current = self.current();
        Token {
            tokentype: token_type,
            lexeme: self.source[self.start..current].to_string(),
            line: self.line,
        }
    }
    fn error(&self, message: &str) -> ScanError {
        ScanError {
            line: self.line,
            message: message.to_string(),
        }
    }
    fn next_if(&mut self, expected: char) -> bool {
        match self.iter.peek() {
            Some((_, c)) if *c == expected => {
                self.iter.next();
                true
            }
            _ => false,
        }
    }
    fn advance(&mut self) -> Result<(usize, char), ScanError> {
        let line = self.line;
        self.iter.next().ok_or_else(|| ScanError {
            line,
            message: "Failed to advance".to_string(),
        })
    }
    fn advance_digits(&mut self) {
        while let Some((_, c)) = self.iter.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.iter.next();
        }
    }
    fn string(&mut self) -> Result<Token, ScanError> {
        // Strings may span lines; errors are reported where the string started.
        let start_line = self.line;
        loop {
            match self.iter.next() {
                None => {
                    return Err(ScanError {
                        line: start_line,
                        message: "Unterminated string.".to_string(),
                    })
                }
                Some((_, '"')) => break,
                Some((_, '\n')) => self.line += 1,
                Some(_) => (),
            }
        }
        let current = self.current();
        let contents = self.source[self.start + 1..current - 1].to_string();
        Ok(self.token(TokenType::String(contents)))
    }
    fn number(&mut self) -> Result<Token, ScanError> {
        self.advance_digits();

        if let Some((_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if let Some((_, c)) = lookahead.peek() {
                if c.is_ascii_digit() {
                    self.iter.next();
                    self.advance_digits();
                }
            }
        }

        let current = self.current();
        let value: f64 = self.source[self.start..current]
            .parse()
            .map_err(|_| self.error("Invalid number literal."))?;
        Ok(self.token(TokenType::Number(value)))
    }
    fn identifier(&mut self) -> Token {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.iter.next();
                }
                _ => break,
            }
        }
        let current = self.current();
        let text = &self.source[self.start..current];
        match KEYWORDS.get(text) {
            None => self.token(TokenType::Identifier(text.to_string())),
            Some(x) => self.token(x.clone()),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "foreach" => TokenType::Foreach,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[cfg(test)]
mod scanner_tests {
    use crate::scanner;
    use crate::token::TokenType;
    use pretty_assertions::assert_eq;

    fn types(source: &str) -> Vec<TokenType> {
        scanner::scan_tokens(source)
            .unwrap()
            .into_iter()
            .map(|t| t.tokentype)
            .collect()
    }

    #[test]
    fn basic_scanner_test() {
        assert_eq!(
            types("x = 2"),
            vec![
                TokenType::Identifier("x".to_string()),
                TokenType::Equal,
                TokenType::Number(2.0),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn number_parsing() {
        assert_eq!(
            types("1+2.5"),
            vec![
                TokenType::Number(1.0),
                TokenType::Plus,
                TokenType::Number(2.5),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn trailing_dot_is_not_a_fraction() {
        assert_eq!(
            types("3.foo"),
            vec![
                TokenType::Number(3.0),
                TokenType::Dot,
                TokenType::Identifier("foo".to_string()),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn list_and_foreach_tokens() {
        assert_eq!(
            types("foreach (x; [1, 2]) {}"),
            vec![
                TokenType::Foreach,
                TokenType::LeftParen,
                TokenType::Identifier("x".to_string()),
                TokenType::Semicolon,
                TokenType::LeftBracket,
                TokenType::Number(1.0),
                TokenType::Comma,
                TokenType::Number(2.0),
                TokenType::RightBracket,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn comments_and_lines() {
        let tokens = scanner::scan_tokens("// nothing here\nprint \"a\nb\";\nx").unwrap();
        assert_eq!(tokens[0].tokentype, TokenType::Print);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].tokentype, TokenType::String("a\nb".to_string()));
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn reports_every_error() {
        let errors = scanner::scan_tokens("@ ok\n# \"open").unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error: Unexpected character.",
                "[line 2] Error: Unexpected character.",
                "[line 2] Error: Unterminated string."
            ]
        );
    }
}
