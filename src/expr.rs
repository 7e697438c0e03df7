//! WHERE-rule expressions: AST, nom parser, and evaluator.
//!
//! The grammar covers the subset exercised by entity invariants: numeric
//! arithmetic (`+ - * / **`), comparisons (`= <> < <= > >=`), boolean
//! connectives (`AND OR XOR NOT`), literals, attribute references (bare
//! identifiers resolved against the instance), and `EXISTS(attr)`.
//!
//! Evaluation is pure over an instance's bound values. Arithmetic and
//! comparison on an unset value is an evaluation error (rules must guard
//! optional attributes with `EXISTS`), while `EXISTS` itself is total.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, not, opt, recognize, verify},
    error::{convert_error, ErrorKind, ParseError as NomParseError, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use once_cell::sync::Lazy;

use crate::instance::EntityInstance;
use crate::value::Value;

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Literal {
    fn to_value(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Real(r) => Value::Real(*r),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

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
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
        }
    }
}

/// A parsed WHERE-rule expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Bare identifier, resolved against the instance at evaluation time.
    Attribute(String),
    /// `EXISTS(attr)`: true iff the attribute has a non-unset value.
    Exists(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Bool(b)) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Literal(Literal::Integer(i)) => write!(f, "{i}"),
            Expr::Literal(Literal::Real(r)) => write!(f, "{r}"),
            Expr::Literal(Literal::Text(s)) => write!(f, "'{s}'"),
            Expr::Attribute(name) => write!(f, "{name}"),
            Expr::Exists(name) => write!(f, "EXISTS({name})"),
            Expr::Unary { op: UnaryOp::Neg, operand } => write!(f, "-{operand}"),
            Expr::Unary { op: UnaryOp::Not, operand } => write!(f, "NOT {operand}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Words that cannot be attribute names.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["exists", "and", "or", "xor", "not", "true", "false"]
        .into_iter()
        .collect()
});

/// Parse a complete WHERE-rule expression from source text.
pub fn parse_rule_expr(input: &str) -> Result<Expr, String> {
    match all_consuming(delimited(multispace0, or_expr, multispace0))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err("incomplete input".to_string()),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Case-insensitive keyword that must not run into a following identifier.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag_no_case(kw), not(alt((alphanumeric1, tag("_")))))
}

fn bare_identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    verify(bare_identifier, |s: &str| {
        !RESERVED.contains(s.to_ascii_lowercase().as_str())
    })(input)
}

fn number(input: &str) -> PResult<'_, Expr> {
    let (rest, text) = recognize(tuple((
        digit1,
        opt(preceded(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let lit = if text.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(r) => Literal::Real(r),
            Err(_) => {
                return Err(nom::Err::Error(VerboseError::from_error_kind(
                    input,
                    ErrorKind::Float,
                )))
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Literal::Integer(i),
            // Out of i64 range: fall back to real.
            Err(_) => match text.parse::<f64>() {
                Ok(r) => Literal::Real(r),
                Err(_) => {
                    return Err(nom::Err::Error(VerboseError::from_error_kind(
                        input,
                        ErrorKind::Digit,
                    )))
                }
            },
        }
    };
    Ok((rest, Expr::Literal(lit)))
}

fn string_lit(input: &str) -> PResult<'_, Expr> {
    // Single-quoted, as in schema source. Quote doubling is not needed by
    // the rule subset.
    map(
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        |s: &str| Expr::Literal(Literal::Text(s.to_string())),
    )(input)
}

fn bool_lit(input: &str) -> PResult<'_, Expr> {
    alt((
        map(keyword("true"), |_| Expr::Literal(Literal::Bool(true))),
        map(keyword("false"), |_| Expr::Literal(Literal::Bool(false))),
    ))(input)
}

fn exists_expr(input: &str) -> PResult<'_, Expr> {
    let (input, _) = keyword("exists")(input)?;
    let (input, name) = preceded(
        ws(char('(')),
        terminated(identifier, preceded(multispace0, char(')'))),
    )(input)?;
    Ok((input, Expr::Exists(name.to_string())))
}

fn paren(input: &str) -> PResult<'_, Expr> {
    preceded(
        char('('),
        terminated(or_expr, preceded(multispace0, char(')'))),
    )(input)
}

fn primary(input: &str) -> PResult<'_, Expr> {
    alt((
        number,
        string_lit,
        bool_lit,
        exists_expr,
        map(identifier, |s| Expr::Attribute(s.to_string())),
        paren,
    ))(input)
}

fn unary(input: &str) -> PResult<'_, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        map(preceded(pair(char('-'), multispace0), unary), |e| {
            Expr::unary(UnaryOp::Neg, e)
        }),
        primary,
    ))(input)
}

// `**` binds tighter than `*`/`/` and associates to the right.
fn power(input: &str) -> PResult<'_, Expr> {
    let (input, base) = unary(input)?;
    let (input, exp) = opt(preceded(ws(tag("**")), power))(input)?;
    Ok((input, match exp {
        Some(e) => Expr::binary(BinaryOp::Pow, base, e),
        None => base,
    }))
}

fn term(input: &str) -> PResult<'_, Expr> {
    let (input, first) = power(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), power))(input)?;
    Ok((input, rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '*' { BinaryOp::Mul } else { BinaryOp::Div };
        Expr::binary(op, acc, rhs)
    })))
}

fn additive(input: &str) -> PResult<'_, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term))(input)?;
    Ok((input, rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
        Expr::binary(op, acc, rhs)
    })))
}

fn comp_op(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        map(tag("<>"), |_| BinaryOp::Ne),
        map(tag("<="), |_| BinaryOp::Le),
        map(tag(">="), |_| BinaryOp::Ge),
        map(tag("="), |_| BinaryOp::Eq),
        map(tag("<"), |_| BinaryOp::Lt),
        map(tag(">"), |_| BinaryOp::Gt),
    ))(input)
}

fn comparison(input: &str) -> PResult<'_, Expr> {
    let (input, lhs) = additive(input)?;
    let (input, tail) = opt(pair(ws(comp_op), additive))(input)?;
    Ok((input, match tail {
        Some((op, rhs)) => Expr::binary(op, lhs, rhs),
        None => lhs,
    }))
}

fn not_expr(input: &str) -> PResult<'_, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        map(preceded(keyword("not"), not_expr), |e| {
            Expr::unary(UnaryOp::Not, e)
        }),
        comparison,
    ))(input)
}

fn and_expr(input: &str) -> PResult<'_, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("and")), not_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, |acc, rhs| {
        Expr::binary(BinaryOp::And, acc, rhs)
    })))
}

fn xor_expr(input: &str) -> PResult<'_, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("xor")), and_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, |acc, rhs| {
        Expr::binary(BinaryOp::Xor, acc, rhs)
    })))
}

fn or_expr(input: &str) -> PResult<'_, Expr> {
    let (input, first) = xor_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("or")), xor_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, |acc, rhs| {
        Expr::binary(BinaryOp::Or, acc, rhs)
    })))
}

// ============================================================================
// Evaluation
// ============================================================================

impl Expr {
    /// Evaluate against an instance's current bound values.
    pub fn evaluate(&self, instance: &EntityInstance) -> Result<Value, String> {
        match self {
            Expr::Literal(lit) => Ok(lit.to_value()),
            Expr::Attribute(name) => instance.get(name).cloned().map_err(|e| e.to_string()),
            Expr::Exists(name) => instance
                .get(name)
                .map(|v| Value::Bool(v.exists()))
                .map_err(|e| e.to_string()),
            Expr::Unary { op, operand } => {
                let v = operand.evaluate(instance)?;
                match op {
                    UnaryOp::Neg => match v.base() {
                        // i64::MIN has no integer negation; widen to real.
                        Value::Integer(i) => Ok(match i.checked_neg() {
                            Some(n) => Value::Integer(n),
                            None => Value::Real(-(*i as f64)),
                        }),
                        _ => Ok(Value::Real(-numeric(&v)?)),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!boolean(&v)?)),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(instance)?;
                let b = rhs.evaluate(instance)?;
                apply_binary(*op, &a, &b)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add => Ok(Value::Real(numeric(a)? + numeric(b)?)),
        BinaryOp::Sub => Ok(Value::Real(numeric(a)? - numeric(b)?)),
        BinaryOp::Mul => Ok(Value::Real(numeric(a)? * numeric(b)?)),
        BinaryOp::Div => {
            let y = numeric(b)?;
            if y == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Real(numeric(a)? / y))
        }
        BinaryOp::Pow => Ok(Value::Real(numeric(a)?.powf(numeric(b)?))),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(a, b)?)),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(a, b)?)),
        BinaryOp::Lt => Ok(Value::Bool(compare(a, b)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare(a, b)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(a, b)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(a, b)? != Ordering::Less)),
        BinaryOp::And => Ok(Value::Bool(boolean(a)? && boolean(b)?)),
        BinaryOp::Or => Ok(Value::Bool(boolean(a)? || boolean(b)?)),
        BinaryOp::Xor => Ok(Value::Bool(boolean(a)? ^ boolean(b)?)),
    }
}

fn ensure_set(v: &Value) -> Result<(), String> {
    if v.exists() {
        Ok(())
    } else {
        Err("operand is unset; guard optional attributes with EXISTS".to_string())
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(r) => Some(*r),
        _ => None,
    }
}

fn numeric(v: &Value) -> Result<f64, String> {
    ensure_set(v)?;
    as_number(v.base())
        .ok_or_else(|| format!("expected a numeric operand, got {}", v.kind_name()))
}

fn boolean(v: &Value) -> Result<bool, String> {
    ensure_set(v)?;
    match v.base() {
        Value::Bool(b) => Ok(*b),
        other => Err(format!("expected a boolean operand, got {}", other.kind_name())),
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, String> {
    ensure_set(a)?;
    ensure_set(b)?;
    Ok(match (a.base(), b.base()) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x == y,
        (
            Value::Enumeration { type_name: ta, member: ma },
            Value::Enumeration { type_name: tb, member: mb },
        ) => ta == tb && ma == mb,
        // Integers and reals compare numerically across kinds.
        (x, y) => match (as_number(x), as_number(y)) {
            (Some(nx), Some(ny)) => nx == ny,
            _ => false,
        },
    })
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, String> {
    ensure_set(a)?;
    ensure_set(b)?;
    match (a.base(), b.base()) {
        (Value::Text(x), Value::Text(y)) => Ok(x.cmp(y)),
        (x, y) => {
            let nx = as_number(x)
                .ok_or_else(|| format!("cannot order {}", x.kind_name()))?;
            let ny = as_number(y)
                .ok_or_else(|| format!("cannot order {}", y.kind_name()))?;
            nx.partial_cmp(&ny).ok_or_else(|| "cannot order NaN".to_string())
        }
    }
}
