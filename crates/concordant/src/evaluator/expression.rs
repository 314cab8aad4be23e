//! Tokenizer and recursive-descent parser for the expression language.
//!
//! ```text
//! statement := '#' ident '=' expr | expr
//! expr      := primary ( '.' ident | '[' expr ']' )*
//! primary   := '#' ident | ident [ '(' args ')' ] | string | number
//!            | 'true' | 'false' | 'null'
//! args      := [ expr ( ',' expr )* ]
//! ```

use crate::value::Value;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Value),
    /// `#name`
    Variable(String),
    /// Bare fixture property
    Property(String),
    /// Fixture method call
    Call {
        /// Method name
        method: String,
        /// Argument expressions
        args: Vec<Expr>,
    },
    /// `target.field`
    Field {
        /// Object being accessed
        target: Box<Expr>,
        /// Field name
        field: String,
    },
    /// `target[index]`
    Index {
        /// Array or object being indexed
        target: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
}

/// A parsed top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `#variable = value`
    Assign {
        /// Variable name without `#`
        variable: String,
        /// Assigned expression
        value: Expr,
    },
    /// Plain expression
    Eval(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Variable(String),
    Ident(String),
    Str(String),
    Number(Value),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Equals,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' | ')' | '[' | ']' | '.' | ',' | '=' => {
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    _ => Token::Equals,
                });
                i += 1;
            }
            '#' => {
                let (name, next) = read_ident(&chars, i + 1);
                if name.is_empty() {
                    return Err(format!("expected a variable name after '#' at {i}"));
                }
                tokens.push(Token::Variable(name));
                i = next;
            }
            '\'' | '"' => {
                let (text, next) = read_string(&chars, i)?;
                tokens.push(Token::Str(text));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let (number, next) = read_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let (name, next) = read_ident(&chars, i);
                tokens.push(Token::Ident(name));
                i = next;
            }
            other => return Err(format!("unexpected character '{other}' at {i}")),
        }
    }
    Ok(tokens)
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(format!("unterminated string starting at {start}"))
}

fn read_number(chars: &[char], start: usize) -> Result<(Value, usize), String> {
    let mut end = start + 1;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    let mut is_float = false;
    if end + 1 < chars.len() && chars[end] == '.' && chars[end + 1].is_ascii_digit() {
        is_float = true;
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    let text: String = chars[start..end].iter().collect();
    let value = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };
    value
        .map(|v| (v, end))
        .ok_or_else(|| format!("invalid number '{text}'"))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            Some(t) => Err(format!("expected {expected:?}, found {t:?}")),
            None => Err(format!("expected {expected:?}, found end of expression")),
        }
    }

    fn statement(&mut self) -> Result<Statement, String> {
        if let (Some(Token::Variable(name)), Some(Token::Equals)) =
            (self.tokens.first(), self.tokens.get(1))
        {
            let variable = name.clone();
            self.pos = 2;
            let value = self.expr()?;
            return Ok(Statement::Assign { variable, value });
        }
        Ok(Statement::Eval(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(field)) => {
                            expr = Expr::Field {
                                target: Box::new(expr),
                                field,
                            };
                        }
                        _ => return Err("expected a field name after '.'".to_string()),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ if self.peek() == Some(&Token::LParen) => {
                    self.pos += 1;
                    let args = self.args()?;
                    Ok(Expr::Call { method: name, args })
                }
                _ => Ok(Expr::Property(name)),
            },
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("empty expression".to_string()),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(args),
                _ => return Err("expected ',' or ')' in argument list".to_string()),
            }
        }
    }
}

/// Parse an expression into a [`Statement`]. Errors carry a parser message.
pub fn parse(input: &str) -> Result<Statement, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.statement()?;
    match parser.peek() {
        None => Ok(statement),
        Some(t) => Err(format!("unexpected trailing {t:?}")),
    }
}
