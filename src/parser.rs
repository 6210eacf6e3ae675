use crate::ast::{ExprId, Expression, FunctionDecl, Literal, Statement};
use crate::token::{Token, TokenType};
use std::rc::Rc;
use thiserror::Error;

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub location: String,
    pub message: String,
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    next_id: usize,
    errors: Vec<ParseError>,
}

/// Parses a whole program with expression ids starting at zero.
pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, Vec<ParseError>> {
    Parser::new(tokens).parse()
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser::with_first_id(tokens, 0)
    }
    /// Expression ids handed out by this parser start at `first_id`, so that
    /// programs parsed one after another in a session never share an id.
    pub fn with_first_id(tokens: &'a [Token], first_id: usize) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            next_id: first_id,
            errors: Vec::new(),
        }
    }
    pub fn next_id(&self) -> usize {
        self.next_id
    }
    pub fn parse(&mut self) -> Result<Vec<Statement>, Vec<ParseError>> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
    fn declaration(&mut self) -> ParseResult<Statement> {
        match self.peek().tokentype {
            TokenType::Class => {
                self.advance();
                self.class_declaration()
            }
            TokenType::Fun => {
                self.advance();
                Ok(Statement::Function(self.function("function")?))
            }
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        }
    }
    fn class_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume_identifier("Expect class name.")?;
        let superclass = match self.peek().tokentype {
            TokenType::Less => {
                self.advance();
                let superclass_name = self.consume_identifier("Expect superclass name.")?;
                Some(Expression::Variable {
                    id: self.new_id(),
                    name: superclass_name,
                })
            }
            _ => None,
        };
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;
        Ok(Statement::Class {
            name,
            superclass,
            methods,
        })
    }
    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        let name = self.consume_identifier(&format!("Expect {} name.", kind))?;
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let err = self.error_at_current("Cannot have more than 255 parameters.");
                    self.errors.push(err);
                }
                params.push(self.consume_identifier("Expect parameter name.")?);
                if !self.matches(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }
    fn var_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume_identifier("Expect variable name.")?;
        let initializer = if self.matches(&TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }
    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::Return => {
                self.advance();
                self.return_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            TokenType::Foreach => {
                self.advance();
                self.foreach_statement()
            }
            _ => self.expression_statement(),
        }
    }
    fn for_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Literal(Literal::Boolean(true)),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn foreach_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        self.consume(TokenType::LeftParen, "Expect '(' after 'foreach'.")?;
        self.matches(&TokenType::Var);
        let name = self.consume_identifier("Expect loop variable name.")?;
        self.consume(TokenType::Semicolon, "Expect ';' after loop variable.")?;
        let iterable = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after foreach clauses.")?;
        let body = self.statement()?;
        Ok(Statement::Foreach {
            keyword,
            name,
            iterable,
            body: Box::new(body),
        })
    }
    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn if_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = match self.peek().tokentype {
            TokenType::Else => {
                self.advance();
                Some(Box::new(self.statement()?))
            }
            _ => None,
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn return_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let value = match self.peek().tokentype {
            TokenType::Semicolon => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }
    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print { keyword, value })
    }
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<Expression> {
        self.assignment()
    }
    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.or()?;
        match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                let equals = self.previous();
                let value = Box::new(self.assignment()?);
                match expr {
                    Expression::Variable { name, .. } => Ok(Expression::Assign {
                        id: self.new_id(),
                        name,
                        value,
                    }),
                    Expression::Get { object, name } => Ok(Expression::Set {
                        object,
                        name,
                        value,
                    }),
                    _ => {
                        // Reported, but the parser is not confused: no need to synchronize.
                        let err = self.error_at(equals, "Invalid assignment target.");
                        self.errors.push(err);
                        Ok(*value)
                    }
                }
            }
            _ => Ok(expr),
        }
    }
    fn or(&mut self) -> ParseResult<Expression> {
        let mut expr = self.and()?;
        while let TokenType::Or = self.peek().tokentype {
            self.advance();
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<Expression> {
        let mut expr = self.equality()?;
        while let TokenType::And = self.peek().tokentype {
            self.advance();
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> ParseResult<Expression> {
        let mut expr = self.comparison()?;
        loop {
            match self.peek().tokentype {
                TokenType::BangEqual | TokenType::EqualEqual => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.comparison()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> ParseResult<Expression> {
        let mut expr = self.addition()?;
        loop {
            match self.peek().tokentype {
                TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.addition()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn addition(&mut self) -> ParseResult<Expression> {
        let mut expr = self.multiplication()?;
        loop {
            match self.peek().tokentype {
                TokenType::Minus | TokenType::Plus => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.multiplication()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn multiplication(&mut self) -> ParseResult<Expression> {
        let mut expr = self.unary()?;
        loop {
            match self.peek().tokentype {
                TokenType::Slash | TokenType::Star => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.unary()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn unary(&mut self) -> ParseResult<Expression> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                self.advance();
                let operator = self.previous().clone();
                let right = self.unary()?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.call(),
        }
    }
    fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().tokentype {
                TokenType::LeftParen => {
                    self.advance();
                    expr = self.finish_call(expr)?;
                }
                TokenType::Dot => {
                    self.advance();
                    let name = self.consume_identifier("Expect property name after '.'.")?;
                    expr = Expression::Get {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn finish_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let arguments = self.arguments(&TokenType::RightParen, Some(MAX_ARGUMENTS))?;
        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();
        Ok(Expression::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }
    /// Comma-separated expressions up to `closing`. Only calls pass a `limit`;
    /// list literals may be any length.
    fn arguments(
        &mut self,
        closing: &TokenType,
        limit: Option<usize>,
    ) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if !self.check(closing) {
            loop {
                if limit.map_or(false, |limit| arguments.len() >= limit) {
                    let err = self.error_at_current("Cannot have more than 255 arguments.");
                    self.errors.push(err);
                }
                arguments.push(self.expression()?);
                if !self.matches(&TokenType::Comma) {
                    break;
                }
            }
        }
        Ok(arguments)
    }
    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek();
        let expr = match &token.tokentype {
            TokenType::False => Expression::Literal(Literal::Boolean(false)),
            TokenType::True => Expression::Literal(Literal::Boolean(true)),
            TokenType::Nil => Expression::Literal(Literal::Nil),
            TokenType::Number(x) => Expression::Literal(Literal::Number(*x)),
            TokenType::String(x) => Expression::Literal(Literal::String(x.clone())),
            TokenType::Identifier(_) => Expression::Variable {
                id: self.new_id(),
                name: token.clone(),
            },
            TokenType::This => Expression::This {
                id: self.new_id(),
                keyword: token.clone(),
            },
            TokenType::Super => {
                self.advance();
                self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
                let method = self.consume_identifier("Expect superclass method name.")?;
                return Ok(Expression::Super {
                    id: self.new_id(),
                    keyword: token.clone(),
                    method,
                });
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                return Ok(Expression::Grouping(Box::new(expr)));
            }
            TokenType::LeftBracket => {
                self.advance();
                let elements = self.arguments(&TokenType::RightBracket, None)?;
                self.consume(TokenType::RightBracket, "Expect ']' after list elements.")?;
                return Ok(Expression::List {
                    bracket: token.clone(),
                    elements,
                });
            }
            _ => return Err(self.error_at_current("Expect expression.")),
        };
        self.advance();
        Ok(expr)
    }
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::Foreach
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
    }
    fn new_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }
    fn check(&self, tokentype: &TokenType) -> bool {
        &self.peek().tokentype == tokentype
    }
    fn matches(&mut self, tokentype: &TokenType) -> bool {
        if self.check(tokentype) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn consume(&mut self, tokentype: TokenType, message: &str) -> ParseResult<&'a Token> {
        if self.check(&tokentype) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }
    fn consume_identifier(&mut self, message: &str) -> ParseResult<Token> {
        match self.peek().tokentype {
            TokenType::Identifier(_) => Ok(self.advance().clone()),
            _ => Err(self.error_at_current(message)),
        }
    }
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        matches!(self.peek().tokentype, TokenType::EOF)
    }
    fn peek(&self) -> &'a Token {
        // The scanner always terminates the stream with EOF, and `advance`
        // never moves past it.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    fn error_at_current(&self, message: &str) -> ParseError {
        self.error_at(self.peek(), message)
    }
    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        let location = match token.tokentype {
            TokenType::EOF => " at end".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };
        ParseError {
            line: token.line,
            location,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, Expression, Statement};
    use crate::parser::{parse, Parser};
    use crate::scanner::scan_tokens;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> Vec<Statement> {
        let tokens = scan_tokens(source).unwrap();
        parse(&tokens).unwrap()
    }

    fn print_expression(source: &str) -> String {
        match &parse_source(source)[0] {
            Statement::Expression(expr) => expr.accept(&mut AstPrinter {}),
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    fn errors(source: &str) -> Vec<String> {
        let tokens = scan_tokens(source).unwrap();
        parse(&tokens)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn precedence() {
        assert_eq!(print_expression("1 + 2 * -3 == 4;"), "(== (+ 1 (* 2 (- 3))) 4)");
        assert_eq!(print_expression("a or b and !c;"), "(or a (and b (! c)))");
    }

    #[test]
    fn calls_properties_and_lists() {
        assert_eq!(
            print_expression("a.b(1, [2, \"x\"]).c = nil;"),
            "(set (call (get a b) 1 (list 2 \"x\")) c nil)"
        );
        assert_eq!(print_expression("super.go(this);"), "(call (super go) this)");
    }

    #[test]
    fn for_loop_is_desugared_to_while() {
        let statements = parse_source("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            Statement::Block(inner) => {
                assert!(matches!(inner[0], Statement::Var { .. }));
                match &inner[1] {
                    Statement::While { body, .. } => match body.as_ref() {
                        Statement::Block(parts) => {
                            assert!(matches!(parts[0], Statement::Print { .. }));
                            assert!(matches!(
                                parts[1],
                                Statement::Expression(Expression::Assign { .. })
                            ));
                        }
                        other => panic!("unexpected loop body {:?}", other),
                    },
                    other => panic!("expected while, got {:?}", other),
                }
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn foreach_statement() {
        let statements = parse_source("foreach (var x; List()) print x;");
        match &statements[0] {
            Statement::Foreach { name, .. } => assert_eq!(name.lexeme, "x"),
            other => panic!("expected foreach, got {:?}", other),
        }
    }

    #[test]
    fn ids_are_unique_and_seeded() {
        let tokens = scan_tokens("a = b; this;").unwrap();
        let mut parser = Parser::with_first_id(&tokens, 10);
        let statements = parser.parse().unwrap();
        // `a` (discarded in favour of the assignment), `b`, the assignment, `this`.
        assert_eq!(parser.next_id(), 14);
        match &statements[1] {
            Statement::Expression(Expression::This { id, .. }) => assert_eq!(id.0, 13),
            other => panic!("expected this, got {:?}", other),
        }
    }

    #[test]
    fn reports_errors_and_recovers() {
        assert_eq!(
            errors("var = 1;\nprint 2\nvar ok = 3;\n1 + 2 = 3;"),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at 'var': Expect ';' after value.",
                "[line 4] Error at '=': Invalid assignment target.",
            ]
        );
    }

    fn numbers(count: usize) -> String {
        (0..count)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[test]
    fn call_arguments_are_capped() {
        assert_eq!(
            errors(&format!("f({});", numbers(256))),
            vec!["[line 1] Error at '255': Cannot have more than 255 arguments."]
        );
    }

    #[test]
    fn list_literals_are_not_capped() {
        let statements = parse_source(&format!("[{}];", numbers(300)));
        match &statements[0] {
            Statement::Expression(Expression::List { elements, .. }) => {
                assert_eq!(elements.len(), 300)
            }
            other => panic!("expected a list literal, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_block() {
        assert_eq!(
            errors("{ print 1;"),
            vec!["[line 1] Error at end: Expect '}' after block."]
        );
    }
}
