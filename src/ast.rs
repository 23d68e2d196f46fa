use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `names` and `values` always have the same length.
    Let {
        names: Vec<String>,
        values: Vec<Expression>,
        body: Box<Expression>,
    },
    Repeat {
        condition: Box<Expression>,
        body: Box<Expression>,
    },
    Assign {
        name: String,
        value: Box<Expression>,
    },
    /// `conditions` and `branches` always have the same, non-zero length.
    Match {
        conditions: Vec<Expression>,
        branches: Vec<Expression>,
        mode: MatchMode,
    },
    Variable(String),
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Data(Literal),
    Not(Box<Expression>),
    Concat(Vec<Expression>),
    Binary(Box<Expression>, BinaryOperator, Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOperator {
    /// The plain operator a compound assignment applies before storing back.
    pub fn compound_base(&self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::AddAssign => Some(BinaryOperator::Add),
            BinaryOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            BinaryOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
            BinaryOperator::DivideAssign => Some(BinaryOperator::Divide),
            BinaryOperator::ModuloAssign => Some(BinaryOperator::Modulo),
            _ => None,
        }
    }
}

impl Expression {
    pub fn number(n: f64) -> Self {
        Expression::Data(Literal::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::Data(Literal::String(s.into()))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::Binary(Box::new(left), op, Box::new(right))
    }
}

fn write_list<T: Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        write!(f, "{}", item)?;
        if i != items.len() - 1 {
            write!(f, " ")?;
        }
    }
    Ok(())
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for function in &self.functions {
            writeln!(f, "{}", function)?;
        }
        write!(f, "{}", self.body)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "~{}(", self.name)?;
        write_list(f, &self.params)?;
        write!(f, ")({})", self.body)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Let {
                names,
                values,
                body,
            } => {
                write!(f, "(:(")?;
                write_list(f, names)?;
                write!(f, ")(")?;
                write_list(f, values)?;
                write!(f, ") {})", body)
            }
            Expression::Repeat { condition, body } => write!(f, "(^ {} {})", condition, body),
            Expression::Assign { name, value } => write!(f, "(: {} {})", name, value),
            Expression::Match {
                conditions,
                branches,
                mode,
            } => {
                write!(f, "{}(", mode)?;
                for (i, (condition, branch)) in conditions.iter().zip(branches).enumerate() {
                    write!(f, "{} {}", condition, branch)?;
                    if i != conditions.len() - 1 {
                        write!(f, " ")?;
                    }
                }
                write!(f, ")")
            }
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Call { name, args } => {
                write!(f, "{}{{", name)?;
                write_list(f, args)?;
                write!(f, "}}")
            }
            Expression::Data(literal) => write!(f, "{}", literal),
            Expression::Not(expr) => write!(f, "!{}", expr),
            Expression::Concat(parts) => {
                write!(f, ".(")?;
                write_list(f, parts)?;
                write!(f, ")")
            }
            Expression::Binary(left, op, right) => write!(f, "({} {} {})", op, left, right),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::All => write!(f, "@"),
            MatchMode::First => write!(f, "|"),
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::AddAssign => write!(f, "+="),
            BinaryOperator::SubtractAssign => write!(f, "-="),
            BinaryOperator::MultiplyAssign => write!(f, "*="),
            BinaryOperator::DivideAssign => write!(f, "/="),
            BinaryOperator::ModuloAssign => write!(f, "%="),
            BinaryOperator::Less => write!(f, "<"),
            BinaryOperator::LessEqual => write!(f, "<="),
            BinaryOperator::Greater => write!(f, ">"),
            BinaryOperator::GreaterEqual => write!(f, ">="),
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::And => write!(f, "&&"),
            BinaryOperator::Or => write!(f, "||"),
        }
    }
}
