use std::cell::RefCell;

use crate::{
    ast::{BinaryOperator, Expression, Function, Literal, MatchMode, Program},
    span::Position,
    tokenizer::{Token, TokenKind},
};

/// Outcome of a grammar rule that did not fail.
///
/// `NoMatch` carries no tokens: the caller keeps the slice it passed in, so a
/// rule that does not apply never consumes input. A rule that matched its
/// distinguishing prefix and then found malformed input returns `Err` instead,
/// and no sibling alternative is tried.
#[derive(Debug, PartialEq)]
pub enum Parsed<'a, T> {
    Matched(T, &'a [Token]),
    NoMatch,
}

pub type ParseResult<'a, T> = Result<Parsed<'a, T>, SyntaxError>;

type Rule = for<'a> fn(&ParseContext, &'a [Token]) -> ParseResult<'a, Expression>;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub error: ParseError,
    context: Vec<&'static str>,
    pub token: Option<Token>,
}

impl SyntaxError {
    pub fn position(&self) -> Option<Position> {
        self.token.as_ref().map(|token| token.position)
    }
}

impl std::error::Error for SyntaxError {}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(token) = &self.token {
            write!(f, " at {} but found ", token.position)?;
            match token.lexeme.as_str() {
                "" => write!(f, "{}", token.kind)?,
                lexeme => write!(f, "\"{}\"", lexeme)?,
            }
        }
        write!(f, " (while parsing {})", self.context.join(" > "))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Premature end.")]
    PrematureEnd,
    #[error("Expected \"{0}\"")]
    Expected(TokenKind),
    #[error("{0}")]
    ExpectedIdentifier(&'static str),
    #[error("{0}")]
    ExpectedExpression(&'static str),
    #[error("Number of assignments ({values}) must equal number of variables ({names}) in let")]
    LetArity { names: usize, values: usize },
    #[error("Match requires at least one condition and branch")]
    EmptyMatch,
    #[error("Match expression missing branch")]
    MissingBranch,
    #[error("Invalid numeric literal \"{0}\"")]
    InvalidNumber(String),
    #[error("Unexpected input after program expression")]
    TrailingInput,
}

#[derive(Debug)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn error(&self, error: ParseError, tokens: &[Token]) -> SyntaxError {
        SyntaxError {
            error,
            context: self.stack.borrow().clone(),
            token: tokens.first().cloned(),
        }
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

pub fn program(tokens: &[Token]) -> Result<Program, SyntaxError> {
    let context = ParseContext::new();
    let _guard = context.push("program");
    let mut functions = Vec::new();
    let mut tokens = tokens;

    while let Parsed::Matched(declaration, rest) = function(&context, tokens)? {
        functions.push(declaration);
        tokens = rest;
    }

    let (body, tokens) = required(
        &context,
        expression(&context, tokens)?,
        tokens,
        "Program must contain an executable expression",
    )?;

    match tokens.first().map(Token::kind) {
        None | Some(TokenKind::Eof) => Ok(Program { functions, body }),
        Some(_) => Err(context.error(ParseError::TrailingInput, tokens)),
    }
}

fn function<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Function> {
    let _guard = context.push("function");
    if lookahead(context, tokens)?.kind != TokenKind::Function {
        return Ok(Parsed::NoMatch);
    }

    let (name, tokens) = match_identifier(context, &tokens[1..], "Function name must follow ~")?;
    let tokens = consume(context, tokens, TokenKind::LeftParen)?;
    let (params, tokens) = identifier_list(context, tokens)?;
    let tokens = consume(context, tokens, TokenKind::LeftParen)?;
    let (body, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Function body must be an executable expression",
    )?;
    let (body, tokens) = close_group(context, body, tokens)?;

    Ok(Parsed::Matched(Function { name, params, body }, tokens))
}

fn expression<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("expression");
    if lookahead(context, tokens)?.kind != TokenKind::LeftParen {
        return ordered_choice(context, tokens, &[let_expr, unary, binary, data]);
    }

    match ordered_choice(context, &tokens[1..], &[let_expr, unary, binary, data, group])? {
        Parsed::Matched(node, rest) => {
            let (node, rest) = close_group(context, node, rest)?;
            Ok(Parsed::Matched(node, rest))
        }
        Parsed::NoMatch => Ok(Parsed::NoMatch),
    }
}

fn ordered_choice<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    rules: &[Rule],
) -> ParseResult<'a, Expression> {
    for rule in rules {
        if let Parsed::Matched(node, rest) = rule(context, tokens)? {
            return Ok(Parsed::Matched(node, rest));
        }
    }
    Ok(Parsed::NoMatch)
}

/// Finishes a parenthesised group: an optional infix tail, then `)`.
fn close_group<'a>(
    context: &ParseContext,
    mut node: Expression,
    mut tokens: &'a [Token],
) -> Result<(Expression, &'a [Token]), SyntaxError> {
    while let Some(op) = tokens.first().and_then(|token| binary_operator(token.kind)) {
        let (right, rest) = required(
            context,
            expression(context, &tokens[1..])?,
            &tokens[1..],
            "Infix operator needs a right operand",
        )?;
        node = Expression::binary(node, op, right);
        tokens = rest;
    }

    let tokens = consume(context, tokens, TokenKind::RightParen)?;
    Ok((node, tokens))
}

fn group<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    match lookahead(context, tokens)?.kind {
        TokenKind::LeftParen => expression(context, tokens),
        _ => Ok(Parsed::NoMatch),
    }
}

fn let_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("let");
    if lookahead(context, tokens)?.kind != TokenKind::Assign {
        return Ok(Parsed::NoMatch);
    }
    let tokens = &tokens[1..];
    // Without the bracket this is a plain assignment.
    if lookahead(context, tokens)?.kind != TokenKind::LeftParen {
        return Ok(Parsed::NoMatch);
    }

    let (names, tokens) = identifier_list(context, &tokens[1..])?;
    let tokens = consume(context, tokens, TokenKind::LeftParen)?;
    let (values, tokens) = expression_list(context, tokens)?;
    if names.len() != values.len() {
        return Err(context.error(
            ParseError::LetArity {
                names: names.len(),
                values: values.len(),
            },
            tokens,
        ));
    }
    let tokens = consume(context, tokens, TokenKind::RightParen)?;
    let (body, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Missing let statement body",
    )?;

    Ok(Parsed::Matched(
        Expression::Let {
            names,
            values,
            body: Box::new(body),
        },
        tokens,
    ))
}

fn unary<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("unary");
    ordered_choice(
        context,
        tokens,
        &[match_expr, concat_expr, call_expr, not_expr, increment],
    )
}

fn match_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("match");
    let mode = match lookahead(context, tokens)?.kind {
        TokenKind::MatchAll => MatchMode::All,
        TokenKind::MatchFirst => MatchMode::First,
        _ => return Ok(Parsed::NoMatch),
    };

    let mut tokens = consume(context, &tokens[1..], TokenKind::LeftParen)?;
    let mut conditions = Vec::new();
    let mut branches = Vec::new();
    while let Parsed::Matched(condition, rest) = expression(context, tokens)? {
        match expression(context, rest)? {
            Parsed::Matched(branch, rest) => {
                conditions.push(condition);
                branches.push(branch);
                tokens = rest;
            }
            Parsed::NoMatch => return Err(context.error(ParseError::MissingBranch, rest)),
        }
    }

    if conditions.is_empty() {
        return Err(context.error(ParseError::EmptyMatch, tokens));
    }
    let tokens = consume(context, tokens, TokenKind::RightParen)?;

    Ok(Parsed::Matched(
        Expression::Match {
            conditions,
            branches,
            mode,
        },
        tokens,
    ))
}

fn concat_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("concat");
    if lookahead(context, tokens)?.kind != TokenKind::Concat {
        return Ok(Parsed::NoMatch);
    }

    let tokens = consume(context, &tokens[1..], TokenKind::LeftParen)?;
    let (parts, tokens) = expression_list(context, tokens)?;
    let tokens = consume(context, tokens, TokenKind::RightParen)?;
    Ok(Parsed::Matched(Expression::Concat(parts), tokens))
}

fn call_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("call");
    let name = lookahead(context, tokens)?;
    if name.kind != TokenKind::Identifier {
        return Ok(Parsed::NoMatch);
    }
    // An identifier without `{` is a variable reference, handled by `data`.
    if tokens.get(1).map(Token::kind) != Some(TokenKind::LeftBrace) {
        return Ok(Parsed::NoMatch);
    }

    let (args, tokens) = expression_list(context, &tokens[2..])?;
    let tokens = consume(context, tokens, TokenKind::RightBrace)?;
    Ok(Parsed::Matched(
        Expression::Call {
            name: name.lexeme.clone(),
            args,
        },
        tokens,
    ))
}

fn not_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("not");
    if lookahead(context, tokens)?.kind != TokenKind::Not {
        return Ok(Parsed::NoMatch);
    }

    let tokens = &tokens[1..];
    let (expr, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Not operator must precede expression",
    )?;
    Ok(Parsed::Matched(Expression::Not(Box::new(expr)), tokens))
}

/// `++x` and `--x` are sugar for `x += 1` and `x -= 1`.
fn increment<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("increment");
    let op = match lookahead(context, tokens)?.kind {
        TokenKind::PlusPlus => BinaryOperator::AddAssign,
        TokenKind::MinusMinus => BinaryOperator::SubtractAssign,
        _ => return Ok(Parsed::NoMatch),
    };

    let (name, tokens) = match_identifier(
        context,
        &tokens[1..],
        "Inc/Dec operator must precede an identifier",
    )?;
    Ok(Parsed::Matched(
        Expression::binary(Expression::Variable(name), op, Expression::number(1.0)),
        tokens,
    ))
}

fn binary<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("binary");
    ordered_choice(context, tokens, &[assign_expr, repeat_expr, prefix_operator])
}

fn assign_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("assign");
    if lookahead(context, tokens)?.kind != TokenKind::Assign {
        return Ok(Parsed::NoMatch);
    }

    let (name, tokens) = match_identifier(
        context,
        &tokens[1..],
        "Assignment operator must precede an identifier.",
    )?;
    let (value, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Assignment operator must have valid assignment expression.",
    )?;
    Ok(Parsed::Matched(
        Expression::Assign {
            name,
            value: Box::new(value),
        },
        tokens,
    ))
}

fn repeat_expr<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("repeat");
    if lookahead(context, tokens)?.kind != TokenKind::Repeat {
        return Ok(Parsed::NoMatch);
    }

    let tokens = &tokens[1..];
    let (condition, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Repeat op must have condition",
    )?;
    let (body, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Repeat op must have body",
    )?;
    Ok(Parsed::Matched(
        Expression::Repeat {
            condition: Box::new(condition),
            body: Box::new(body),
        },
        tokens,
    ))
}

/// Prefix form: exactly one operator token followed by both operands.
fn prefix_operator<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let Some(op) = binary_operator(lookahead(context, tokens)?.kind) else {
        return Ok(Parsed::NoMatch);
    };

    let tokens = &tokens[1..];
    let (left, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Binary operation needs 2 expressions.",
    )?;
    let (right, tokens) = required(
        context,
        expression(context, tokens)?,
        tokens,
        "Binary op needs another expression.",
    )?;
    Ok(Parsed::Matched(Expression::binary(left, op, right), tokens))
}

fn data<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let token = lookahead(context, tokens)?;
    let expr = match token.kind {
        TokenKind::String => Expression::Data(Literal::String(token.lexeme.clone())),
        TokenKind::Number => match token.lexeme.parse::<f64>() {
            Ok(n) if n.is_finite() => Expression::Data(Literal::Number(n)),
            _ => {
                return Err(
                    context.error(ParseError::InvalidNumber(token.lexeme.clone()), tokens)
                )
            }
        },
        TokenKind::Identifier => {
            if tokens.get(1).map(Token::kind) == Some(TokenKind::LeftBrace) {
                return Ok(Parsed::NoMatch);
            }
            Expression::Variable(token.lexeme.clone())
        }
        _ => return Ok(Parsed::NoMatch),
    };
    Ok(Parsed::Matched(expr, &tokens[1..]))
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        TokenKind::Star => Some(BinaryOperator::Multiply),
        TokenKind::Slash => Some(BinaryOperator::Divide),
        TokenKind::Percent => Some(BinaryOperator::Modulo),
        TokenKind::PlusEqual => Some(BinaryOperator::AddAssign),
        TokenKind::MinusEqual => Some(BinaryOperator::SubtractAssign),
        TokenKind::StarEqual => Some(BinaryOperator::MultiplyAssign),
        TokenKind::SlashEqual => Some(BinaryOperator::DivideAssign),
        TokenKind::PercentEqual => Some(BinaryOperator::ModuloAssign),
        TokenKind::Less => Some(BinaryOperator::Less),
        TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
        TokenKind::Greater => Some(BinaryOperator::Greater),
        TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        TokenKind::EqualEqual => Some(BinaryOperator::Equal),
        TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
        TokenKind::AndAnd => Some(BinaryOperator::And),
        TokenKind::OrOr => Some(BinaryOperator::Or),
        _ => None,
    }
}

fn expression_list<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
) -> Result<(Vec<Expression>, &'a [Token]), SyntaxError> {
    let mut items = Vec::new();
    let mut tokens = tokens;
    while let Parsed::Matched(item, rest) = expression(context, tokens)? {
        items.push(item);
        tokens = rest;
    }
    Ok((items, tokens))
}

/// Reads identifiers up to and including the closing `)`.
fn identifier_list<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
) -> Result<(Vec<String>, &'a [Token]), SyntaxError> {
    let mut names = Vec::new();
    let mut tokens = tokens;
    loop {
        let token = lookahead(context, tokens)?;
        match token.kind {
            TokenKind::Identifier => names.push(token.lexeme.clone()),
            TokenKind::RightParen => return Ok((names, &tokens[1..])),
            _ => {
                return Err(context.error(
                    ParseError::ExpectedIdentifier("Looking for parameter identifiers"),
                    tokens,
                ))
            }
        }
        tokens = &tokens[1..];
    }
}

fn required<'a, T>(
    context: &ParseContext,
    parsed: Parsed<'a, T>,
    tokens: &'a [Token],
    message: &'static str,
) -> Result<(T, &'a [Token]), SyntaxError> {
    match parsed {
        Parsed::Matched(node, rest) => Ok((node, rest)),
        Parsed::NoMatch => Err(context.error(ParseError::ExpectedExpression(message), tokens)),
    }
}

/// The next token, or `PrematureEnd` when the input is exhausted.
fn lookahead<'a>(context: &ParseContext, tokens: &'a [Token]) -> Result<&'a Token, SyntaxError> {
    match tokens.first() {
        Some(token) if token.kind != TokenKind::Eof => Ok(token),
        _ => Err(context.error(ParseError::PrematureEnd, tokens)),
    }
}

fn consume<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    kind: TokenKind,
) -> Result<&'a [Token], SyntaxError> {
    if lookahead(context, tokens)?.kind == kind {
        Ok(&tokens[1..])
    } else {
        Err(context.error(ParseError::Expected(kind), tokens))
    }
}

fn match_identifier<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    message: &'static str,
) -> Result<(String, &'a [Token]), SyntaxError> {
    let token = lookahead(context, tokens)?;
    match token.kind {
        TokenKind::Identifier => Ok((token.lexeme.clone(), &tokens[1..])),
        _ => Err(context.error(ParseError::ExpectedIdentifier(message), tokens)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(source: &str) -> Result<Program, SyntaxError> {
        program(&tokenize(source).unwrap())
    }

    fn parse_error(source: &str) -> ParseError {
        parse(source).unwrap_err().error
    }

    #[test]
    fn test_function_with_infix_body() {
        let program = parse("~add(x y)(x + y) add{3 4}").unwrap();
        assert_eq!(
            program.functions,
            vec![Function {
                name: "add".to_string(),
                params: vec!["x".to_string(), "y".to_string()],
                body: Expression::binary(
                    Expression::variable("x"),
                    BinaryOperator::Add,
                    Expression::variable("y"),
                ),
            }]
        );
        assert_eq!(
            program.body,
            Expression::Call {
                name: "add".to_string(),
                args: vec![Expression::number(3.0), Expression::number(4.0)],
            }
        );
    }

    #[test]
    fn test_prefix_binary() {
        let program = parse("* 2 - 5 3").unwrap();
        assert_eq!(
            program.body,
            Expression::binary(
                Expression::number(2.0),
                BinaryOperator::Multiply,
                Expression::binary(
                    Expression::number(5.0),
                    BinaryOperator::Subtract,
                    Expression::number(3.0),
                ),
            )
        );
    }

    #[test]
    fn test_infix_chain_is_left_associative() {
        let program = parse("(1 - 2 - 3)").unwrap();
        assert_eq!(program.body.to_string(), "(- (- 1 2) 3)");
    }

    #[test]
    fn test_let_arity() {
        assert!(parse(":(a b)(1 2) a").is_ok());
        assert_eq!(
            parse_error(":(a b)(1 2 3) a"),
            ParseError::LetArity {
                names: 2,
                values: 3
            }
        );
    }

    #[test]
    fn test_let_is_tried_before_assign() {
        let program = parse(":(a)(1) (: a 2)").unwrap();
        assert_eq!(
            program.body,
            Expression::Let {
                names: vec!["a".to_string()],
                values: vec![Expression::number(1.0)],
                body: Box::new(Expression::Assign {
                    name: "a".to_string(),
                    value: Box::new(Expression::number(2.0)),
                }),
            }
        );
    }

    #[test]
    fn test_no_match_leaves_tokens_untouched() {
        let context = ParseContext::new();
        let tokens = tokenize(": x 5").unwrap();

        assert_eq!(let_expr(&context, &tokens).unwrap(), Parsed::NoMatch);
        assert_eq!(call_expr(&context, &tokens).unwrap(), Parsed::NoMatch);

        match assign_expr(&context, &tokens).unwrap() {
            Parsed::Matched(expr, rest) => {
                assert_eq!(expr.to_string(), "(: x 5)");
                assert_eq!(rest.len(), 1);
                assert_eq!(rest[0].kind, TokenKind::Eof);
            }
            Parsed::NoMatch => panic!("assignment should match"),
        }
        assert!(context.stack.borrow().is_empty());
    }

    #[test]
    fn test_unmatched_group_rolls_back_paren() {
        let context = ParseContext::new();
        let tokens = tokenize("() 1").unwrap();
        assert_eq!(expression(&context, &tokens).unwrap(), Parsed::NoMatch);
    }

    #[test]
    fn test_committed_prefix_is_an_error() {
        let err = parse("~f(x)(x) (^ 1)").unwrap_err();
        assert_eq!(
            err.error,
            ParseError::ExpectedExpression("Repeat op must have body")
        );
        assert_eq!(err.token.map(|token| token.kind), Some(TokenKind::RightParen));
        assert_eq!(parse_error("^ 1"), ParseError::PrematureEnd);
    }

    #[test]
    fn test_match_requires_pairs() {
        assert!(parse("@(1 'a' 0 'b')").is_ok());
        assert_eq!(parse_error("|()"), ParseError::EmptyMatch);
        assert_eq!(parse_error("@(1 'a' 0)"), ParseError::MissingBranch);
    }

    #[test]
    fn test_identifier_before_brace_is_a_call() {
        let program = parse("f{x g{}}").unwrap();
        assert_eq!(
            program.body,
            Expression::Call {
                name: "f".to_string(),
                args: vec![
                    Expression::variable("x"),
                    Expression::Call {
                        name: "g".to_string(),
                        args: vec![],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_increment_desugars() {
        let program = parse("--n").unwrap();
        assert_eq!(
            program.body,
            Expression::binary(
                Expression::variable("n"),
                BinaryOperator::SubtractAssign,
                Expression::number(1.0),
            )
        );
        assert_eq!(
            parse_error("++ 3"),
            ParseError::ExpectedIdentifier("Inc/Dec operator must precede an identifier")
        );
    }

    #[test]
    fn test_missing_closing_paren() {
        let err = parse("(x y)").unwrap_err();
        assert_eq!(err.error, ParseError::Expected(TokenKind::RightParen));
        assert_eq!(err.position(), Some(Position::new(1, 4)));
    }

    #[test]
    fn test_number_too_large_is_rejected() {
        let digits = format!("1{}", "0".repeat(400));
        assert_eq!(parse_error(&digits), ParseError::InvalidNumber(digits));
        assert!(parse(&format!("1{}", "0".repeat(300))).is_ok());
    }

    #[test]
    fn test_trailing_input() {
        assert_eq!(parse_error("1 2"), ParseError::TrailingInput);
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse_error(""), ParseError::PrematureEnd);
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        let source = r#"
            ~count(n)(:(i)(0) (^ (< i n) ++i))
            :(s)('') @((== 1 1) .(s 'x' count{3}) !0 (: s 'y'))
        "#;
        let first = parse(source).unwrap();
        let second = parse(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }
}
