//! Arithmetic expression evaluation.
//!
//! A restricted recursive-descent evaluator over a fixed grammar:
//! `+ - * / ^`, parentheses, unary minus, numeric literals, the
//! constants `pi` and `e`, and the functions `sqrt sin cos tan log ln
//! abs` (trigonometry in radians, `log` is base 10). Nothing here
//! builds or evaluates code from the input string.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Supports basic arithmetic, \
         powers, sqrt, trigonometric functions (radians), and logarithms. \
         Example: \"2 + 3 * 4\", \"sqrt(16)\", \"sin(pi / 2)\"."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [(
                "expression",
                SchemaNode::string("The expression to evaluate, e.g. \"2 + 3 * 4\""),
            )],
            &["expression"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let expression = args["expression"].as_str().unwrap_or_default();
        let result = evaluate(expression)?;
        if !result.is_finite() {
            bail!("expression produced a non-finite result");
        }
        Ok(json!({
            "success": true,
            "expression": expression,
            "result": result,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid number literal '{literal}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => bail!("unexpected character '{other}' in expression"),
        }
    }
    Ok(tokens)
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
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => bail!("expected {expected:?}, found {t:?}"),
            None => bail!("unexpected end of expression"),
        }
    }

    // expr := term (('+'|'-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.next();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*'|'/') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.next();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        bail!("division by zero");
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := '-' unary | power
    fn unary(&mut self) -> Result<f64> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.next();
            return Ok(-self.unary()?);
        }
        self.power()
    }

    // power := atom ('^' unary)?   -- right associative
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.next();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.next();
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    apply_function(&name, arg)
                } else {
                    match name.as_str() {
                        "pi" => Ok(std::f64::consts::PI),
                        "e" => Ok(std::f64::consts::E),
                        other => bail!("unknown constant '{other}'"),
                    }
                }
            }
            Some(t) => bail!("unexpected token {t:?}"),
            None => bail!("unexpected end of expression"),
        }
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64> {
    match name {
        "sqrt" => {
            if arg < 0.0 {
                bail!("sqrt of a negative number");
            }
            Ok(arg.sqrt())
        }
        "sin" => Ok(arg.sin()),
        "cos" => Ok(arg.cos()),
        "tan" => Ok(arg.tan()),
        "log" => Ok(arg.log10()),
        "ln" => Ok(arg.ln()),
        "abs" => Ok(arg.abs()),
        other => bail!("unknown function '{other}'"),
    }
}

/// Evaluate an expression string.
pub fn evaluate(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        bail!("empty expression");
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        bail!("unexpected trailing input in expression");
    }
    Ok(value)
}
