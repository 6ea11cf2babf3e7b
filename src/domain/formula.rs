//! %MAC formula parsing, evaluation and inversion.
//!
//! A formula is an arithmetic expression in one variable, `CG` (any case), over
//! decimal literals, `+ - * /` and parentheses. Anything else is rejected while
//! tokenizing, so user input is never handed to a general evaluator.

use std::fmt;

use thiserror::Error;

/// CG (inches) used to sanity-check a formula when it is accepted.
pub const FORMULA_TEST_CG: f64 = 240.0;

/// Search window, in inches aft of datum, for formulas that are not linear in CG.
const INVERSION_BRACKET: (f64, f64) = (0.0, 10_000.0);
const INVERSION_SAMPLES: usize = 400;
const INVERSION_TOLERANCE: f64 = 1e-9;
const INVERSION_MAX_ITERATIONS: usize = 200;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("formula contains invalid character {0:?}")]
    InvalidCharacters(char),
    #[error("mathematical error in formula: {0}")]
    MathError(String),
    #[error("formula produces a non-finite result ({0})")]
    NonFinite(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Num(f64),
    Cg,
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Cg,
    Op(BinOp),
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '+' => tokens.push(Token::Op(BinOp::Add)),
            '-' => tokens.push(Token::Op(BinOp::Sub)),
            '*' => tokens.push(Token::Op(BinOp::Mul)),
            '/' => tokens.push(Token::Op(BinOp::Div)),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            'c' | 'C' => match chars.peek() {
                Some((_, 'g' | 'G')) => {
                    chars.next();
                    tokens.push(Token::Cg);
                }
                _ => return Err(FormulaError::InvalidCharacters(ch)),
            },
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(pos, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = pos + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[start..end];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::MathError(format!("bad number {literal:?}")))?;
                tokens.push(Token::Num(value));
            }
            other => return Err(FormulaError::InvalidCharacters(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (BinOp::Add | BinOp::Sub))) = self.peek() {
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ (BinOp::Mul | BinOp::Div))) = self.peek() {
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Op(BinOp::Sub)) => {
                self.bump();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op(BinOp::Add)) => {
                self.bump();
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.bump() {
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::Cg) => Ok(Expr::Cg),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.bump() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(FormulaError::MathError("unbalanced parentheses".to_string())),
                }
            }
            Some(token) => Err(FormulaError::MathError(format!("unexpected {token:?}"))),
            None => Err(FormulaError::MathError("unexpected end of formula".to_string())),
        }
    }
}

impl Expr {
    fn eval(&self, cg: f64) -> Result<f64, FormulaError> {
        Ok(match self {
            Expr::Num(value) => *value,
            Expr::Cg => cg,
            Expr::Neg(inner) => -inner.eval(cg)?,
            Expr::Bin(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(cg)?, rhs.eval(cg)?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            return Err(FormulaError::MathError("division by zero".to_string()));
                        }
                        a / b
                    }
                }
            }
        })
    }

    /// Reduces the tree to `slope * CG + intercept` when it is affine in CG.
    fn affine(&self) -> Option<(f64, f64)> {
        match self {
            Expr::Num(value) => Some((0.0, *value)),
            Expr::Cg => Some((1.0, 0.0)),
            Expr::Neg(inner) => inner.affine().map(|(a, b)| (-a, -b)),
            Expr::Bin(op, lhs, rhs) => {
                let (a1, b1) = lhs.affine()?;
                let (a2, b2) = rhs.affine()?;
                match op {
                    BinOp::Add => Some((a1 + a2, b1 + b2)),
                    BinOp::Sub => Some((a1 - a2, b1 - b2)),
                    BinOp::Mul if a1 == 0.0 => Some((b1 * a2, b1 * b2)),
                    BinOp::Mul if a2 == 0.0 => Some((a1 * b2, b1 * b2)),
                    BinOp::Div if a2 == 0.0 && b2 != 0.0 => Some((a1 / b2, b1 / b2)),
                    _ => None,
                }
            }
        }
    }
}

/// A parsed %MAC formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parses without the test-point check; see [`validate`] for the input gate.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let source = text.trim();
        if source.is_empty() {
            return Err(FormulaError::Empty);
        }
        let mut parser = Parser {
            tokens: tokenize(source)?,
            pos: 0,
        };
        let expr = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::MathError(format!("unexpected {token:?}")));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// %MAC for a CG in inches.
    pub fn evaluate(&self, cg: f64) -> Result<f64, FormulaError> {
        let value = self.expr.eval(cg)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite(value))
        }
    }

    /// CG (inches) at which the formula yields `mac_percent`, if one can be found.
    ///
    /// Affine formulas are solved exactly. Anything else falls back to bisection on
    /// the first sign change inside [`INVERSION_BRACKET`].
    pub fn invert(&self, mac_percent: f64) -> Option<f64> {
        if !mac_percent.is_finite() {
            return None;
        }
        match self.expr.affine() {
            Some((slope, intercept)) => {
                if slope == 0.0 || !slope.is_finite() {
                    return None;
                }
                let cg = (mac_percent - intercept) / slope;
                cg.is_finite().then_some(cg)
            }
            None => self.bisect(mac_percent),
        }
    }

    fn bisect(&self, target: f64) -> Option<f64> {
        let residual = |cg: f64| self.evaluate(cg).ok().map(|mac| mac - target);
        let (lo, hi) = INVERSION_BRACKET;
        let step = (hi - lo) / INVERSION_SAMPLES as f64;

        let mut prev = (lo, residual(lo));
        for i in 1..=INVERSION_SAMPLES {
            let x = lo + step * i as f64;
            let current = (x, residual(x));
            match (prev.1, current.1) {
                (Some(r), _) if r == 0.0 => return Some(prev.0),
                (Some(r1), Some(r2)) if r1.signum() != r2.signum() => {
                    return self.refine(prev.0, x, target);
                }
                _ => {}
            }
            prev = current;
        }
        match prev.1 {
            Some(r) if r == 0.0 => Some(prev.0),
            _ => None,
        }
    }

    fn refine(&self, mut lo: f64, mut hi: f64, target: f64) -> Option<f64> {
        let mut r_lo = self.evaluate(lo).ok()? - target;
        for _ in 0..INVERSION_MAX_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            let r_mid = self.evaluate(mid).ok()? - target;
            if r_mid == 0.0 || (hi - lo) < INVERSION_TOLERANCE {
                return Some(mid);
            }
            if r_mid.signum() == r_lo.signum() {
                lo = mid;
                r_lo = r_mid;
            } else {
                hi = mid;
            }
        }
        Some(0.5 * (lo + hi))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The input gate for user formulas: parses, then evaluates once at [`FORMULA_TEST_CG`].
pub fn validate(text: &str) -> Result<Formula, FormulaError> {
    let formula = Formula::parse(text)?;
    formula.evaluate(FORMULA_TEST_CG)?;
    Ok(formula)
}

/// One-shot evaluation of formula text.
pub fn evaluate(text: &str, cg: f64) -> Result<f64, FormulaError> {
    Formula::parse(text)?.evaluate(cg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const A319: &str = "20 + ((CG - 232.28) / 86.22) * 100";

    #[test]
    fn default_formula_scenarios() {
        let formula = validate(A319).unwrap();
        assert_abs_diff_eq!(formula.evaluate(232.28).unwrap(), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(formula.evaluate(318.5).unwrap(), 120.0, epsilon = 1e-9);
    }

    #[test]
    fn cg_token_is_case_insensitive() {
        assert_relative_eq!(evaluate("cg * 2", 3.0).unwrap(), 6.0);
        assert_relative_eq!(evaluate("Cg + cG", 3.0).unwrap(), 6.0);
    }

    #[test]
    fn precedence_and_unary_minus() {
        assert_relative_eq!(evaluate("1 + 2 * 3", 0.0).unwrap(), 7.0);
        assert_relative_eq!(evaluate("(1 + 2) * 3", 0.0).unwrap(), 9.0);
        assert_relative_eq!(evaluate("-CG - -2", 5.0).unwrap(), -3.0);
        assert_relative_eq!(evaluate("8 / 4 / 2", 0.0).unwrap(), 1.0);
        assert_relative_eq!(evaluate("2 * -CG", -4.0).unwrap(), 8.0);
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert_eq!(validate("CG * ; 2"), Err(FormulaError::InvalidCharacters(';')));
        assert_eq!(validate("Math.max(CG, 1)"), Err(FormulaError::InvalidCharacters('M')));
        assert_eq!(validate("C + 1"), Err(FormulaError::InvalidCharacters('C')));
        assert!(matches!(validate("CG ** 2"), Err(FormulaError::MathError(_))));
    }

    #[test]
    fn malformed_expressions_are_math_errors() {
        for text in ["(CG + 1", "CG +", "1.2.3 + CG", "CG CG", "()"] {
            assert!(
                matches!(validate(text), Err(FormulaError::MathError(_))),
                "{text} should be a math error"
            );
        }
        assert_eq!(validate("   "), Err(FormulaError::Empty));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let formula = Formula::parse("100 / (CG - 240)").unwrap();
        assert!(matches!(formula.evaluate(240.0), Err(FormulaError::MathError(_))));
        assert!(validate("100 / (CG - 240)").is_err());
        assert_relative_eq!(formula.evaluate(250.0).unwrap(), 10.0);
    }

    #[test]
    fn inverts_the_legacy_linear_shape() {
        let formula = Formula::parse(A319).unwrap();
        for x in [-50.0, 0.0, 232.28, 240.0, 318.5, 1234.5] {
            let mac = formula.evaluate(x).unwrap();
            let back = formula.invert(mac).unwrap();
            assert_relative_eq!(back, x, epsilon = 1e-9, max_relative = 1e-12);
        }
        let forward_limit = 232.28 - 4.0 * 86.22 / 100.0;
        assert_relative_eq!(formula.invert(16.0).unwrap(), forward_limit, epsilon = 1e-9);
    }

    #[test]
    fn legacy_shape_round_trips_for_any_constants() {
        let constants: [(f64, f64, f64, f64); 6] = [
            (20.0, 232.28, 86.22, 100.0),
            (0.0, 35.0, 14.9, 100.0),
            (-12.5, 0.0, 3.5, 1.0),
            (25.0, 410.0, -120.0, 100.0),
            (10.0, 18.2, 2.4, -100.0),
            (-3.0, -50.0, -7.25, -42.0),
        ];
        for (a, b, c, d) in constants {
            let formula = Formula::parse(&format!("{a} + ((CG - {b}) / {c}) * {d}")).unwrap();
            for x in [-100.0, 0.0, b, 240.0, 5_000.0] {
                let mac = formula.evaluate(x).unwrap();
                assert_relative_eq!(a + (x - b) / c * d, mac, epsilon = 1e-9, max_relative = 1e-12);
                let back = formula.invert(mac).unwrap();
                assert_relative_eq!(back, x, epsilon = 1e-7, max_relative = 1e-10);
            }
            for mac in [-20.0, 0.0, 16.0, 30.0] {
                let cg = formula.invert(mac).unwrap();
                assert_relative_eq!(formula.evaluate(cg).unwrap(), mac, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn inverts_other_linear_shapes() {
        let cessna = Formula::parse("((CG - 35.0) / 14.9) * 100").unwrap();
        assert_relative_eq!(cessna.invert(100.0).unwrap(), 49.9, epsilon = 1e-9);

        let flipped = Formula::parse("100 - CG / 2").unwrap();
        assert_relative_eq!(flipped.invert(90.0).unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_formula_has_no_inverse() {
        let formula = Formula::parse("25").unwrap();
        assert_eq!(formula.invert(25.0), None);
        let zero_slope = Formula::parse("CG * 0 + 4").unwrap();
        assert_eq!(zero_slope.invert(4.0), None);
    }

    #[test]
    fn nonlinear_formula_falls_back_to_bisection() {
        let formula = Formula::parse("CG * CG / 100").unwrap();
        assert_abs_diff_eq!(formula.invert(25.0).unwrap(), 50.0, epsilon = 1e-6);
        assert_eq!(formula.invert(-1.0), None);
    }

    #[test]
    fn display_keeps_trimmed_source() {
        let formula = Formula::parse("  CG / 2 ").unwrap();
        assert_eq!(formula.to_string(), "CG / 2");
        assert_eq!(formula.source(), "CG / 2");
    }
}
