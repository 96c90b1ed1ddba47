use crate::common::{Result, SpindleError};
use crate::record::{Schema, StrBytes, Value};

use super::{BinaryOp, Expr};

/// Compiles a WHERE predicate against a table schema.
///
/// Spaces are stripped first; the splitter then looks for the leftmost
/// top-level occurrence of each operator in [`BinaryOp::ALL`] order, so the
/// first operator found becomes the root of the tree.
pub fn parse(text: &str, schema: &Schema) -> Result<Expr> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return Err(SpindleError::Parse("empty expression".to_string()));
    }
    build(&stripped, schema)
}

fn build(expr: &str, schema: &Schema) -> Result<Expr> {
    let expr = strip_wrapping_parens(expr);
    if expr.is_empty() {
        return Err(SpindleError::Parse("empty operand".to_string()));
    }

    match find_split(expr) {
        Some((pos, op)) => {
            let lhs = build(&expr[..pos], schema)?;
            let rhs = build(&expr[pos + op.glyph().len()..], schema)?;
            Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        }
        None => atom(expr, schema),
    }
}

/// Peels parentheses that wrap the whole expression, layer by layer.
fn strip_wrapping_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') {
        if !fully_wrapped(expr) {
            break;
        }
        expr = &expr[1..expr.len() - 1];
    }
    expr
}

/// The outermost parens match each other iff no proper prefix of the
/// expression closes back to depth zero.
fn fully_wrapped(expr: &str) -> bool {
    let mut depth = 0i32;
    for &byte in &expr.as_bytes()[..expr.len() - 1] {
        match byte {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            return false;
        }
    }
    true
}

/// Finds the split point: the leftmost depth-zero occurrence of the first
/// operator (in scan order) present in the expression.
fn find_split(expr: &str) -> Option<(usize, BinaryOp)> {
    let bytes = expr.as_bytes();
    for op in BinaryOp::ALL {
        let glyph = op.glyph().as_bytes();
        let mut depth = 0i32;
        for pos in 0..bytes.len() {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if depth == 0 && bytes[pos..].starts_with(glyph) => {
                    // a minus is binary only after an identifier or digit
                    if op == BinaryOp::Sub && !preceded_by_alnum(bytes, pos) {
                        continue;
                    }
                    return Some((pos, op));
                }
                _ => {}
            }
        }
    }
    None
}

fn preceded_by_alnum(bytes: &[u8], pos: usize) -> bool {
    pos > 0 && bytes[pos - 1].is_ascii_alphanumeric()
}

/// Resolves an operator-free expression: column reference, boolean, float,
/// string or integer literal, in that order.
fn atom(expr: &str, schema: &Schema) -> Result<Expr> {
    if let Some(index) = schema.column_index(expr) {
        return Ok(Expr::Column(index));
    }
    if expr == "true" {
        return Ok(Expr::Literal(Value::Bool(true)));
    }
    if expr == "false" {
        return Ok(Expr::Literal(Value::Bool(false)));
    }
    if expr.contains('.') {
        return expr
            .parse::<f64>()
            .map(|v| Expr::Literal(Value::Float(v)))
            .map_err(|_| SpindleError::Parse(format!("malformed float literal `{expr}`")));
    }
    if let Some(rest) = expr.strip_prefix('"') {
        let inner = rest
            .strip_suffix('"')
            .ok_or_else(|| SpindleError::Parse(format!("unterminated string literal `{expr}`")))?;
        return Ok(Expr::Literal(Value::Str(StrBytes::from_str(inner))));
    }
    expr.parse::<i64>()
        .map(|v| Expr::Literal(Value::Int(v)))
        .map_err(|_| SpindleError::Parse(format!("cannot resolve atom `{expr}`")))
}
