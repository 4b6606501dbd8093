//! Constrained Expression Evaluator
//!
//! Evaluates small arithmetic expressions from untrusted input without
//! ever touching a dynamic evaluator. Input is lexed, parsed into an AST
//! by recursive descent, and every identifier in the tree is checked
//! against a fixed allow-list before evaluation starts.
//!
//! Semantics follow the usual numeric model: `/` always produces a float,
//! `%` takes the sign of the divisor, `divmod` floor-divides, and `round`
//! rounds ties to even.

use thiserror::Error;

/// Function names permitted inside expressions. Fixed for the process
/// lifetime; anything else is rejected before evaluation.
pub const ALLOWED_FUNCTIONS: &[&str] = &["abs", "round", "min", "max", "sum", "pow", "divmod"];

/// Evaluation error. Always a reported value, never a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Input could not be tokenized or parsed
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Identifier outside the allow-list was referenced
    #[error("use of '{0}' is not allowed")]
    DisallowedName(String),

    /// Runtime failure (division by zero, overflow, bad arity, ...)
    #[error("{0}")]
    Eval(String),
}

/// Result of a successful evaluation
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Quotient/remainder pair produced by `divmod`
    Pair(Box<Value>, Box<Value>),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Pair(..) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // {:?} keeps the trailing ".0" on whole floats
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Pair(q, r) => write!(f, "({}, {})", q, r),
        }
    }
}

/// Evaluate an expression string against the fixed allow-list.
///
/// Pure function of its input: parse, validate names, then evaluate.
pub fn evaluate(input: &str) -> Result<Value, ExprError> {
    let tokens = lex(input)?;
    let ast = Parser::new(tokens).parse()?;
    check_names(&ast)?;
    eval(&ast)
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
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
                if chars.peek().map(|&(_, c)| c) == Some('*') {
                    chars.next();
                    tokens.push(Token::Power);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '^' => {
                chars.next();
                tokens.push(Token::Power);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '0'..='9' | '.' => {
                let mut end = start;
                let mut has_dot = false;
                let mut has_exp = false;
                while let Some(&(i, c)) = chars.peek() {
                    match c {
                        '0'..='9' => {}
                        '.' if !has_dot && !has_exp => has_dot = true,
                        'e' | 'E' if !has_exp => {
                            has_exp = true;
                            // Optional sign directly after the exponent marker
                            let mut ahead = chars.clone();
                            ahead.next();
                            if let Some(&(_, sign)) = ahead.peek() {
                                if sign == '+' || sign == '-' {
                                    chars.next();
                                    end = i + 1;
                                    chars.next();
                                    continue;
                                }
                            }
                        }
                        _ => break,
                    }
                    end = i;
                    chars.next();
                }
                let text = &input[start..=end];
                if has_dot || has_exp {
                    let f: f64 = text
                        .parse()
                        .map_err(|_| ExprError::Syntax(format!("invalid number '{}'", text)))?;
                    tokens.push(Token::Float(f));
                } else if let Ok(i) = text.parse::<i64>() {
                    tokens.push(Token::Int(i));
                } else {
                    // Too large for i64: keep it as a float like a host
                    // numeric model would after promotion
                    let f: f64 = text
                        .parse()
                        .map_err(|_| ExprError::Syntax(format!("invalid number '{}'", text)))?;
                    tokens.push(Token::Float(f));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..=end].to_string()));
            }
            other => {
                return Err(ExprError::Syntax(format!(
                    "unexpected character '{}'",
                    other
                )));
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Int(i64),
    Float(f64),
    /// Bare identifier; survives parsing so the allow-list check sees it
    Name(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::Syntax("empty expression".into()));
        }
        let expr = self.expression()?;
        if let Some(tok) = self.peek() {
            return Err(ExprError::Syntax(format!(
                "unexpected trailing input near {:?}",
                tok
            )));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// unary := ('-' | '+') unary | power
    ///
    /// Power binds tighter than unary minus, so `-2 ** 2` is `-(2 ** 2)`.
    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    /// power := atom (('**' | '^') unary)?
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.eat(&Token::Power) {
            // Right-associative; the exponent may itself be signed
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    /// atom := NUMBER | IDENT '(' args ')' | IDENT | '(' expression ')'
    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(ExprError::Syntax("expected ')'".into()));
                }
                Ok(inner)
            }
            Some(tok) => Err(ExprError::Syntax(format!("unexpected token {:?}", tok))),
            None => Err(ExprError::Syntax("unexpected end of expression".into())),
        }
    }

    /// args := expression (',' expression)*
    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            return Err(ExprError::Syntax("expected ',' or ')' in call".into()));
        }
    }
}

// ============================================================================
// Allow-list validation
// ============================================================================

/// Reject the first identifier anywhere in the tree that is not in the
/// allow-list. Runs to completion before any evaluation happens.
fn check_names(expr: &Expr) -> Result<(), ExprError> {
    match expr {
        Expr::Int(_) | Expr::Float(_) => Ok(()),
        Expr::Name(name) => {
            if ALLOWED_FUNCTIONS.contains(&name.as_str()) {
                Ok(())
            } else {
                Err(ExprError::DisallowedName(name.clone()))
            }
        }
        Expr::Neg(inner) => check_names(inner),
        Expr::Binary { lhs, rhs, .. } => {
            check_names(lhs)?;
            check_names(rhs)
        }
        Expr::Call { name, args } => {
            if !ALLOWED_FUNCTIONS.contains(&name.as_str()) {
                return Err(ExprError::DisallowedName(name.clone()));
            }
            for arg in args {
                check_names(arg)?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn eval(expr: &Expr) -> Result<Value, ExprError> {
    match expr {
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Name(name) => Err(ExprError::Eval(format!(
            "'{}' must be called with arguments",
            name
        ))),
        Expr::Neg(inner) => match eval(inner)? {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExprError::Eval("integer overflow".into())),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Pair(..) => Err(ExprError::Eval("cannot negate a divmod result".into())),
        },
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(lhs)?;
            let b = eval(rhs)?;
            binary_op(*op, &a, &b)
        }
        Expr::Call { name, args } => {
            let values = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            call_function(name, &values)
        }
    }
}

fn numeric(v: &Value, context: &str) -> Result<(), ExprError> {
    if matches!(v, Value::Pair(..)) {
        return Err(ExprError::Eval(format!(
            "{} does not accept a divmod result",
            context
        )));
    }
    Ok(())
}

fn binary_op(op: BinOp, a: &Value, b: &Value) -> Result<Value, ExprError> {
    numeric(a, "operator")?;
    numeric(b, "operator")?;

    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul => {
            if let (Value::Int(x), Value::Int(y)) = (a, b) {
                let result = match op {
                    BinOp::Add => x.checked_add(*y),
                    BinOp::Sub => x.checked_sub(*y),
                    _ => x.checked_mul(*y),
                };
                return result
                    .map(Value::Int)
                    .ok_or_else(|| ExprError::Eval("integer overflow".into()));
            }
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            Ok(Value::Float(match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                _ => x * y,
            }))
        }
        BinOp::Div => {
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            if y == 0.0 {
                return Err(ExprError::Eval("division by zero".into()));
            }
            Ok(Value::Float(x / y))
        }
        BinOp::Mod => modulo(a, b),
        BinOp::Pow => power(a, b),
    }
}

/// Remainder with the sign of the divisor
fn modulo(a: &Value, b: &Value) -> Result<Value, ExprError> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        if *y == 0 {
            return Err(ExprError::Eval("modulo by zero".into()));
        }
        let r = x
            .checked_rem(*y)
            .ok_or_else(|| ExprError::Eval("integer overflow".into()))?;
        let r = if r != 0 && (r < 0) != (*y < 0) { r + y } else { r };
        return Ok(Value::Int(r));
    }
    let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
    if y == 0.0 {
        return Err(ExprError::Eval("modulo by zero".into()));
    }
    Ok(Value::Float(x - y * (x / y).floor()))
}

fn power(a: &Value, b: &Value) -> Result<Value, ExprError> {
    if let (Value::Int(base), Value::Int(exp)) = (a, b) {
        if *exp >= 0 {
            let exp = u32::try_from(*exp)
                .map_err(|_| ExprError::Eval("exponent too large".into()))?;
            return base
                .checked_pow(exp)
                .map(Value::Int)
                .ok_or_else(|| ExprError::Eval("integer overflow".into()));
        }
        // Negative integer exponent promotes to float
        return Ok(Value::Float((*base as f64).powf(*exp as f64)));
    }
    let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
    Ok(Value::Float(x.powf(y)))
}

/// Floor division quotient and matching remainder
fn floor_divmod(a: &Value, b: &Value) -> Result<(Value, Value), ExprError> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        if *y == 0 {
            return Err(ExprError::Eval("division by zero".into()));
        }
        let Value::Int(r) = modulo(a, b)? else {
            unreachable!("integer modulo yields an integer");
        };
        let q = x
            .checked_sub(r)
            .and_then(|n| n.checked_div(*y))
            .ok_or_else(|| ExprError::Eval("integer overflow".into()))?;
        return Ok((Value::Int(q), Value::Int(r)));
    }
    let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
    if y == 0.0 {
        return Err(ExprError::Eval("division by zero".into()));
    }
    let q = (x / y).floor();
    Ok((Value::Float(q), Value::Float(x - y * q)))
}

fn expect_arity(name: &str, args: &[Value], expected: &str, ok: bool) -> Result<(), ExprError> {
    if ok {
        Ok(())
    } else {
        Err(ExprError::Eval(format!(
            "{}() takes {} arguments, got {}",
            name,
            expected,
            args.len()
        )))
    }
}

fn call_function(name: &str, args: &[Value]) -> Result<Value, ExprError> {
    for arg in args {
        numeric(arg, name)?;
    }

    match name {
        "abs" => {
            expect_arity(name, args, "exactly 1", args.len() == 1)?;
            match &args[0] {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| ExprError::Eval("integer overflow".into())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                Value::Pair(..) => unreachable!("pairs rejected above"),
            }
        }
        "round" => {
            expect_arity(name, args, "1 or 2", args.len() == 1 || args.len() == 2)?;
            round_value(args)
        }
        "min" | "max" => {
            expect_arity(name, args, "at least 1", !args.is_empty())?;
            let mut best = args[0].clone();
            for candidate in &args[1..] {
                let (c, b) = (
                    candidate.as_f64().unwrap_or(0.0),
                    best.as_f64().unwrap_or(0.0),
                );
                let better = if name == "min" { c < b } else { c > b };
                if better {
                    best = candidate.clone();
                }
            }
            Ok(best)
        }
        "sum" => {
            expect_arity(name, args, "at least 1", !args.is_empty())?;
            let mut total = args[0].clone();
            for arg in &args[1..] {
                total = binary_op(BinOp::Add, &total, arg)?;
            }
            Ok(total)
        }
        "pow" => {
            expect_arity(name, args, "2 or 3", args.len() == 2 || args.len() == 3)?;
            if args.len() == 2 {
                return power(&args[0], &args[1]);
            }
            modular_pow(&args[0], &args[1], &args[2])
        }
        "divmod" => {
            expect_arity(name, args, "exactly 2", args.len() == 2)?;
            let (q, r) = floor_divmod(&args[0], &args[1])?;
            Ok(Value::Pair(Box::new(q), Box::new(r)))
        }
        _ => Err(ExprError::DisallowedName(name.to_string())),
    }
}

fn round_value(args: &[Value]) -> Result<Value, ExprError> {
    let float_to_int = |f: f64| -> Result<i64, ExprError> {
        let rounded = f.round_ties_even();
        if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
            return Err(ExprError::Eval(format!("cannot round {:?}", f)));
        }
        Ok(rounded as i64)
    };

    if args.len() == 1 {
        return match &args[0] {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(f) => float_to_int(*f).map(Value::Int),
            Value::Pair(..) => unreachable!("pairs rejected above"),
        };
    }

    let Value::Int(ndigits) = args[1] else {
        return Err(ExprError::Eval(
            "round() second argument must be an integer".into(),
        ));
    };
    let scale = 10f64.powi(ndigits as i32);
    match &args[0] {
        Value::Int(i) if ndigits >= 0 => Ok(Value::Int(*i)),
        Value::Int(i) => float_to_int((*i as f64 * scale).round_ties_even() / scale)
            .map(Value::Int),
        Value::Float(f) => {
            let scaled = (f * scale).round_ties_even() / scale;
            if !scaled.is_finite() {
                return Err(ExprError::Eval(format!("cannot round {:?}", f)));
            }
            Ok(Value::Float(scaled))
        }
        Value::Pair(..) => unreachable!("pairs rejected above"),
    }
}

/// Three-argument pow: (base ** exp) mod modulus over integers
fn modular_pow(base: &Value, exp: &Value, modulus: &Value) -> Result<Value, ExprError> {
    let (Value::Int(base), Value::Int(exp), Value::Int(modulus)) = (base, exp, modulus) else {
        return Err(ExprError::Eval(
            "pow() with 3 arguments requires integers".into(),
        ));
    };
    if *modulus == 0 {
        return Err(ExprError::Eval("pow() modulus cannot be zero".into()));
    }
    if *exp < 0 {
        return Err(ExprError::Eval(
            "pow() with 3 arguments requires a non-negative exponent".into(),
        ));
    }

    let m = i128::from(*modulus);
    let mut result: i128 = 1 % m;
    let mut b = i128::from(*base) % m;
    let mut e = *exp as u64;
    while e > 0 {
        if e & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        e >>= 1;
    }
    // Remainder takes the sign of the modulus
    if result != 0 && (result < 0) != (m < 0) {
        result += m;
    }
    Ok(Value::Int(result as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_ok(input: &str) -> Value {
        evaluate(input).unwrap_or_else(|e| panic!("'{}' failed: {}", input, e))
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval_ok("2 + 2"), Value::Int(4));
        assert_eq!(eval_ok("10 - 3 - 2"), Value::Int(5));
        assert_eq!(eval_ok("6 * 7"), Value::Int(42));
        assert_eq!(eval_ok("7 / 2"), Value::Float(3.5));
    }

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(eval_ok("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval_ok("(2 + 3) * 4"), Value::Int(20));
        assert_eq!(eval_ok("2 ** 3 ** 2"), Value::Int(512));
        assert_eq!(eval_ok("2 ^ 8"), Value::Int(256));
        assert_eq!(eval_ok("-2 ** 2"), Value::Int(-4));
        assert_eq!(eval_ok("(-2) ** 2"), Value::Int(4));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(eval_ok("1 + 0.5"), Value::Float(1.5));
        assert_eq!(eval_ok("4 / 2"), Value::Float(2.0));
        assert_eq!(eval_ok("1e2 + 1"), Value::Float(101.0));
    }

    #[test]
    fn test_modulo_sign_of_divisor() {
        assert_eq!(eval_ok("7 % 3"), Value::Int(1));
        assert_eq!(eval_ok("-7 % 3"), Value::Int(2));
        assert_eq!(eval_ok("7 % -3"), Value::Int(-2));
    }

    #[test]
    fn test_allowed_functions() {
        assert_eq!(eval_ok("abs(-5)"), Value::Int(5));
        assert_eq!(eval_ok("round(2.5)"), Value::Int(2));
        assert_eq!(eval_ok("round(3.5)"), Value::Int(4));
        assert_eq!(eval_ok("round(2.675, 2)"), Value::Float(2.67));
        assert_eq!(eval_ok("min(3, 1, 2)"), Value::Int(1));
        assert_eq!(eval_ok("max(3, 1, 2)"), Value::Int(3));
        assert_eq!(eval_ok("sum(1, 2, 3, 4)"), Value::Int(10));
        assert_eq!(eval_ok("pow(2, 10)"), Value::Int(1024));
        assert_eq!(eval_ok("pow(2, 10, 1000)"), Value::Int(24));
    }

    #[test]
    fn test_divmod() {
        assert_eq!(
            eval_ok("divmod(7, 2)"),
            Value::Pair(Box::new(Value::Int(3)), Box::new(Value::Int(1)))
        );
        assert_eq!(eval_ok("divmod(7, 2)").to_string(), "(3, 1)");
        assert_eq!(eval_ok("divmod(-7, 2)").to_string(), "(-4, 1)");
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        assert!(matches!(evaluate("1/0"), Err(ExprError::Eval(_))));
        assert!(matches!(evaluate("5 % 0"), Err(ExprError::Eval(_))));
        assert!(matches!(evaluate("divmod(1, 0)"), Err(ExprError::Eval(_))));
    }

    #[test]
    fn test_disallowed_names() {
        assert_eq!(
            evaluate("__import__(1)"),
            Err(ExprError::DisallowedName("__import__".into()))
        );
        assert_eq!(
            evaluate("pi"),
            Err(ExprError::DisallowedName("pi".into()))
        );
        // Structural check: nested inside an allowed call's argument
        assert_eq!(
            evaluate("abs(sqrt(4))"),
            Err(ExprError::DisallowedName("sqrt".into()))
        );
        assert_eq!(
            evaluate("min(1, max(2, evil(3)))"),
            Err(ExprError::DisallowedName("evil".into()))
        );
    }

    #[test]
    fn test_injection_attempt_is_rejected() {
        assert!(evaluate("__import__('os').system('x')").is_err());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(evaluate(""), Err(ExprError::Syntax(_))));
        assert!(matches!(evaluate("   "), Err(ExprError::Syntax(_))));
        assert!(matches!(evaluate("2 +"), Err(ExprError::Syntax(_))));
        assert!(matches!(evaluate("(1 + 2"), Err(ExprError::Syntax(_))));
        assert!(matches!(evaluate("1 2"), Err(ExprError::Syntax(_))));
        assert!(matches!(evaluate("min(1,)"), Err(ExprError::Syntax(_))));
    }

    #[test]
    fn test_overflow_is_reported() {
        assert!(matches!(
            evaluate("9223372036854775807 + 1"),
            Err(ExprError::Eval(_))
        ));
        assert!(matches!(evaluate("2 ** 63"), Err(ExprError::Eval(_))));
    }

    #[test]
    fn test_bare_allowed_name_is_not_a_value() {
        assert!(matches!(evaluate("abs"), Err(ExprError::Eval(_))));
        assert!(matches!(evaluate("abs + 1"), Err(ExprError::Eval(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(eval_ok("2 + 2").to_string(), "4");
        assert_eq!(eval_ok("1 / 4").to_string(), "0.25");
        assert_eq!(eval_ok("4 / 2").to_string(), "2.0");
    }
}
