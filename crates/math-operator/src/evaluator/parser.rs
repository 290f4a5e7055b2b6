//! Recursive-descent parser, one function per precedence level, loosest first:
//!
//! ```text
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := relational ( ("==" | "!=") relational )*
//! relational := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/" | "%") unary )*
//! unary      := ("-" | "!") unary | power
//! power      := primary ( "**" unary )?
//! primary    := number | "true" | "false" | ident | "(" or ")"
//! ```
//!
//! `**` is right-associative and binds tighter than a leading minus, so `-2 ** 2` is
//! `-4` and `2 ** -1` is `0.5`.
//!
//! Every `(`, unary operator and binary operator deepens the tree by one level, and
//! the parser refuses to go past [`MAX_DEPTH`]. Parsing, evaluation and dropping the
//! tree all recurse over it, so the limit keeps user input from exhausting the stack.

use super::error::EvaluationError;
use super::lexer::{Spanned, Token, Tokenizer};
use std::collections::BTreeSet;

/// Deepest expression tree the parser will build.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Pow => "**",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Every variable the expression references, in name order.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Number(_) | Self::Bool(_) => {}
            Self::Variable(name) => {
                names.insert(name.as_str());
            }
            Self::Unary(_, operand) => operand.collect_variables(names),
            Self::Binary(_, left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }
}

/// Parses a complete expression.
pub fn parse(input: &str) -> Result<Expr, EvaluationError> {
    let tokens = Tokenizer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        position: 0,
        end: input.len(),
        depth: 0,
    };

    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(EvaluationError::syntax(
            spanned.offset,
            format!("unexpected {}", describe(&spanned.token)),
        )),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.position).cloned();
        if spanned.is_some() {
            self.position += 1;
        }
        spanned
    }

    /// Consumes the next token if `select` maps it to an operator, returning the
    /// operator and its offset.
    fn operator<T>(&mut self, select: impl Fn(&Token) -> Option<T>) -> Option<(T, usize)> {
        let (op, offset) = self
            .peek()
            .and_then(|spanned| Some((select(&spanned.token)?, spanned.offset)))?;
        self.position += 1;
        Some((op, offset))
    }

    fn descend(&mut self, offset: usize) -> Result<(), EvaluationError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvaluationError::syntax(offset, "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn left_assoc(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, EvaluationError>,
        select: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, EvaluationError> {
        let mut left = operand(self)?;
        let mut chained = 0;
        while let Some((op, offset)) = self.operator(select) {
            // A chain of n operators is a left-leaning tree n levels deep.
            self.descend(offset)?;
            chained += 1;
            let right = operand(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::and, |t| (*t == Token::OrOr).then_some(BinaryOp::Or))
    }

    fn and(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::equality, |t| {
            (*t == Token::AndAnd).then_some(BinaryOp::And)
        })
    }

    fn equality(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::relational, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::additive, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::term, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Expr, EvaluationError> {
        self.left_assoc(Self::unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        let op = self.operator(|t| match t {
            Token::Minus => Some(UnaryOp::Neg),
            Token::Bang => Some(UnaryOp::Not),
            _ => None,
        });
        let Some((op, offset)) = op else {
            return self.power();
        };
        self.descend(offset)?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, EvaluationError> {
        let base = self.primary()?;
        if let Some(((), offset)) = self.operator(|t| (*t == Token::StarStar).then_some(())) {
            self.descend(offset)?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        let Some(Spanned { token, offset }) = self.advance() else {
            return Err(EvaluationError::syntax(self.end, "unexpected end of expression"));
        };

        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Ident(name) => Ok(Expr::Variable(name)),
            Token::LParen => {
                self.descend(offset)?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(EvaluationError::syntax(
                        other.offset,
                        format!("expected ')', found {}", describe(&other.token)),
                    )),
                    None => Err(EvaluationError::syntax(self.end, "unclosed '('")),
                }
            }
            other => Err(EvaluationError::syntax(
                offset,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {n}"),
        Token::Ident(name) => format!("identifier '{name}'"),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::StarStar => "'**'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Le => "'<='".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::Ge => "'>='".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::NotEq => "'!='".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::OrOr => "'||'".to_string(),
    }
}
