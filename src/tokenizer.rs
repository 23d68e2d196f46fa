use std::fmt::Display;

use crate::span::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Identifier,
    String,
    Number,

    // Grouping
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // Keyword symbols
    MatchAll,
    MatchFirst,
    Repeat,
    Assign,
    Function,
    Concat,
    Not,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    PlusPlus,
    MinusMinus,

    // Comparison and logic
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    AndAnd,
    OrOr,

    Illegal,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::MatchAll => "@",
            TokenKind::MatchFirst => "|",
            TokenKind::Repeat => "^",
            TokenKind::Assign => ":",
            TokenKind::Function => "~",
            TokenKind::Concat => ".",
            TokenKind::Not => "!",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::SlashEqual => "/=",
            TokenKind::PercentEqual => "%=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Illegal => "illegal",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. String literals store their contents without quotes.
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenizeError {
    #[error("Illegal token \"{lexeme}\" at {position}")]
    Illegal { lexeme: String, position: Position },
}

/// Tokenizes the whole source, stopping at the first illegal token.
/// The returned list always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = tokenizer.token();
        match token.kind {
            TokenKind::Illegal => {
                return Err(TokenizeError::Illegal {
                    lexeme: token.lexeme,
                    position: token.position,
                })
            }
            TokenKind::Eof => {
                tokens.push(token);
                break;
            }
            _ => tokens.push(token),
        }
    }

    Ok(tokens)
}

pub struct Tokenizer<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: Position::new(1, 1),
        }
    }

    /// Scans the next token. Illegal input is returned as an `Illegal` token
    /// rather than dropped, so callers decide how to surface it.
    pub fn token(&mut self) -> Token {
        while let Some(((), rest)) = whitespace(self.source) {
            self.advance(rest);
        }

        let position = self.position;
        if self.source.is_empty() {
            return Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                position,
            };
        }

        let (kind, rest) = maximal(
            &[
                left_paren,
                right_paren,
                left_brace,
                right_brace,
                match_all,
                match_first,
                repeat,
                assign,
                function,
                concat,
                not,
                plus,
                minus,
                star,
                slash,
                percent,
                plus_equal,
                minus_equal,
                star_equal,
                slash_equal,
                percent_equal,
                plus_plus,
                minus_minus,
                less,
                less_equal,
                greater,
                greater_equal,
                equal_equal,
                bang_equal,
                and_and,
                or_or,
                identifier,
                string,
                number,
            ],
            self.source,
        )
        .unwrap_or_else(|| illegal(self.source));

        let consumed = &self.source[..self.source.len() - rest.len()];
        let lexeme = match kind {
            TokenKind::String => consumed[1..consumed.len() - 1].to_string(),
            _ => consumed.to_string(),
        };
        self.advance(rest);

        Token {
            kind,
            lexeme,
            position,
        }
    }

    fn advance(&mut self, rest: &'a str) {
        let consumed = &self.source[..self.source.len() - rest.len()];
        for c in consumed.chars() {
            if c == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
        self.source = rest;
    }
}

fn maximal<'a, T: std::fmt::Debug>(
    parsers: &[fn(&str) -> Option<(T, &str)>],
    source: &'a str,
) -> Option<(T, &'a str)> {
    let mut min_left = source.len() + 1;
    let mut max_match = None;

    let matching_parsers = parsers.iter().filter_map(|parser| parser(source));
    for (m, rest) in matching_parsers {
        let left = rest.len();
        if left < min_left {
            min_left = left;
            max_match = Some((m, rest));
        }
    }

    max_match
}

fn whitespace(source: &str) -> Option<((), &str)> {
    let len = source
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if len > 0 {
        Some(((), &source[len..]))
    } else {
        None
    }
}

fn illegal(source: &str) -> (TokenKind, &str) {
    let len = source.chars().next().map_or(0, char::len_utf8);
    (TokenKind::Illegal, &source[len..])
}

macro_rules! match_literal {
    ($name:ident, $word:literal, $kind:expr) => {
        fn $name(source: &str) -> Option<(TokenKind, &str)> {
            source.strip_prefix($word).map(|rest| ($kind, rest))
        }
    };
}

match_literal! { left_paren, "(", TokenKind::LeftParen }
match_literal! { right_paren, ")", TokenKind::RightParen }
match_literal! { left_brace, "{", TokenKind::LeftBrace }
match_literal! { right_brace, "}", TokenKind::RightBrace }
match_literal! { match_all, "@", TokenKind::MatchAll }
match_literal! { match_first, "|", TokenKind::MatchFirst }
match_literal! { repeat, "^", TokenKind::Repeat }
match_literal! { assign, ":", TokenKind::Assign }
match_literal! { function, "~", TokenKind::Function }
match_literal! { concat, ".", TokenKind::Concat }
match_literal! { not, "!", TokenKind::Not }
match_literal! { plus, "+", TokenKind::Plus }
match_literal! { minus, "-", TokenKind::Minus }
match_literal! { star, "*", TokenKind::Star }
match_literal! { slash, "/", TokenKind::Slash }
match_literal! { percent, "%", TokenKind::Percent }
match_literal! { plus_equal, "+=", TokenKind::PlusEqual }
match_literal! { minus_equal, "-=", TokenKind::MinusEqual }
match_literal! { star_equal, "*=", TokenKind::StarEqual }
match_literal! { slash_equal, "/=", TokenKind::SlashEqual }
match_literal! { percent_equal, "%=", TokenKind::PercentEqual }
match_literal! { plus_plus, "++", TokenKind::PlusPlus }
match_literal! { minus_minus, "--", TokenKind::MinusMinus }
match_literal! { less, "<", TokenKind::Less }
match_literal! { less_equal, "<=", TokenKind::LessEqual }
match_literal! { greater, ">", TokenKind::Greater }
match_literal! { greater_equal, ">=", TokenKind::GreaterEqual }
match_literal! { equal_equal, "==", TokenKind::EqualEqual }
match_literal! { bang_equal, "!=", TokenKind::BangEqual }
match_literal! { and_and, "&&", TokenKind::AndAnd }
match_literal! { or_or, "||", TokenKind::OrOr }

fn identifier(source: &str) -> Option<(TokenKind, &str)> {
    let mut chars = source.chars();

    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    let len = first.len_utf8()
        + chars
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum::<usize>();

    Some((TokenKind::Identifier, &source[len..]))
}

fn string(source: &str) -> Option<(TokenKind, &str)> {
    let body = source.strip_prefix('\'')?;
    match body.find('\'') {
        Some(end) => Some((TokenKind::String, &body[end + 1..])),
        // Unterminated: swallow the rest so the error points at the opening quote.
        None => Some((TokenKind::Illegal, "")),
    }
}

fn number(source: &str) -> Option<(TokenKind, &str)> {
    let integral = digits(source);
    if integral == 0 {
        return None;
    }

    let rest = &source[integral..];
    match rest.strip_prefix('.') {
        Some(fraction) => match digits(fraction) {
            0 => Some((TokenKind::Illegal, fraction)),
            len => Some((TokenKind::Number, &fraction[len..])),
        },
        None => Some((TokenKind::Number, rest)),
    }
}

fn digits(source: &str) -> usize {
    source.bytes().take_while(u8::is_ascii_digit).count()
}
