#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen, RightParen, LeftBrace, RightBrace, LeftBracket, RightBracket,
    Comma, Dot, Minus, Plus, Semicolon, Slash, Star,

    // One or two character tokens.
    Bang, BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,

    // Literals.
    Identifier(String), String(String), Number(f64),

    // Keywords.
    And, Class, Else, False, Foreach, Fun, For, If, Nil, Or,
    Print, Return, Super, This, True, Var, While,

    EOF
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tokentype: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    /// A token that never came from source text, used for names the
    /// interpreter looks up on its own behalf (`iterate`, `this`, ...).
    pub fn synthetic(lexeme: &str, line: usize) -> Token {
        Token {
            tokentype: TokenType::Identifier(lexeme.to_string()),
            lexeme: lexeme.to_string(),
            line,
        }
    }
}
