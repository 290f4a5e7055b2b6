use super::error::EvaluationError;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    True,
    False,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, EvaluationError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, EvaluationError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((offset, c)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '*' => self.pair('*', Token::StarStar, Token::Star),
            '<' => self.pair('=', Token::Le, Token::Lt),
            '>' => self.pair('=', Token::Ge, Token::Gt),
            '!' => self.pair('=', Token::NotEq, Token::Bang),
            '=' => self.required('=', Token::EqEq, offset, "expected '=='")?,
            '&' => self.required('&', Token::AndAnd, offset, "expected '&&'")?,
            '|' => self.required('|', Token::OrOr, offset, "expected '||'")?,
            c if c.is_ascii_digit() || c == '.' => self.number(offset)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.word(offset),
            other => {
                return Err(EvaluationError::syntax(
                    offset,
                    format!("unexpected character '{other}'"),
                ))
            }
        };

        Ok(Some(Spanned { token, offset }))
    }

    fn pair(&mut self, second: char, matched: Token, single: Token) -> Token {
        if self.chars.next_if(|(_, c)| *c == second).is_some() {
            matched
        } else {
            single
        }
    }

    fn required(
        &mut self,
        second: char,
        token: Token,
        offset: usize,
        message: &str,
    ) -> Result<Token, EvaluationError> {
        self.chars
            .next_if(|(_, c)| *c == second)
            .map(|_| token)
            .ok_or_else(|| EvaluationError::syntax(offset, message))
    }

    /// Index one past the last consumed character.
    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |(i, _)| *i)
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {
            count += 1;
        }
        count
    }

    fn number(&mut self, start: usize) -> Result<Token, EvaluationError> {
        // The first character (a digit or '.') is already consumed.
        let digits = if self.input[start..].starts_with('.') {
            self.digits()
        } else {
            let integral = 1 + self.digits();
            if self.chars.next_if(|(_, c)| *c == '.').is_some() {
                integral + self.digits()
            } else {
                integral
            }
        };
        if digits == 0 {
            return Err(EvaluationError::syntax(start, "expected digits"));
        }

        if self.chars.next_if(|(_, c)| *c == 'e' || *c == 'E').is_some() {
            self.chars.next_if(|(_, c)| *c == '+' || *c == '-');
            if self.digits() == 0 {
                return Err(EvaluationError::syntax(start, "malformed exponent"));
            }
        }

        let end = self.position();
        let literal = &self.input[start..end];
        literal
            .parse()
            .map(Token::Number)
            .map_err(|_| EvaluationError::syntax(start, format!("invalid number '{literal}'")))
    }

    fn word(&mut self, start: usize) -> Token {
        while self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .is_some()
        {}
        let end = self.position();
        match &self.input[start..end] {
            "true" => Token::True,
            "false" => Token::False,
            word => Token::Ident(word.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_numbers_and_operators() {
        assert_eq!(
            tokens("3 * x_1 + .5e1 ** 2"),
            vec![
                Token::Number(3.0),
                Token::Star,
                Token::Ident("x_1".into()),
                Token::Plus,
                Token::Number(5.0),
                Token::StarStar,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_eq!(
            tokens("a<=b != !c && true||false"),
            vec![
                Token::Ident("a".into()),
                Token::Le,
                Token::Ident("b".into()),
                Token::NotEq,
                Token::Bang,
                Token::Ident("c".into()),
                Token::AndAnd,
                Token::True,
                Token::OrOr,
                Token::False,
            ]
        );
    }

    #[test]
    fn test_offsets_point_at_the_problem() {
        let err = Tokenizer::new("1 + $").tokenize().unwrap_err();
        assert_eq!(
            err,
            EvaluationError::syntax(4, "unexpected character '$'")
        );
        assert!(matches!(
            Tokenizer::new("a = b").tokenize(),
            Err(EvaluationError::Syntax { offset: 2, .. })
        ));
        assert!(matches!(
            Tokenizer::new("1e+").tokenize(),
            Err(EvaluationError::Syntax { offset: 0, .. })
        ));
        assert!(matches!(
            Tokenizer::new(".").tokenize(),
            Err(EvaluationError::Syntax { offset: 0, .. })
        ));
    }
}
