use crate::common::{Result, SpindleError};
use crate::record::{Schema, Value};

/// Binary operators, listed in the order the parser scans them. The scan is
/// lowest-precedence-first, so this order *is* the precedence table:
/// logical, then comparison, then arithmetic. Comparisons binding looser
/// than arithmetic is deliberate and load-bearing for existing predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// All operators in parser scan order.
    pub const ALL: [BinaryOp; 13] = [
        BinaryOp::Or,
        BinaryOp::And,
        BinaryOp::Ge,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Lt,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
    ];

    /// Textual form of the operator in predicate source.
    pub fn glyph(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// A compiled WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal from the predicate text.
    Literal(Value),
    /// A record field, identified by its column index.
    Column(usize),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluates the expression against one record image.
    pub fn evaluate(&self, record: &[u8], schema: &Schema) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Column(index) => {
                let data_type = match schema.column(*index) {
                    Some(column) => column.data_type(),
                    None => return Err(SpindleError::Parse(format!("no column {index}"))),
                };
                Ok(Value::decode(&record[schema.field_range(*index)], data_type))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(record, schema)?;
                let rhs = rhs.evaluate(record, schema)?;
                apply(*op, lhs, rhs)
            }
        }
    }

    /// Evaluates and requires a boolean result, the WHERE contract.
    pub fn matches(&self, record: &[u8], schema: &Schema) -> Result<bool> {
        match self.evaluate(record, schema)? {
            Value::Bool(selected) => Ok(selected),
            _ => Err(SpindleError::NotABoolean),
        }
    }
}

/// Dispatches an operator over the dynamic types of its operands. Any pair
/// without a definition below is a `BadOperands` error; there is no numeric
/// coercion.
fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    use Value::*;

    let bad = |lhs: &Value, rhs: &Value| SpindleError::BadOperands {
        op: op.glyph(),
        lhs: lhs.data_type().name(),
        rhs: rhs.data_type().name(),
    };

    match op {
        Or | And => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Ok(Bool(if op == Or { a || b } else { a && b })),
            (l, r) => Err(bad(&l, &r)),
        },

        Add | Sub | Mul => match (lhs, rhs) {
            (Int(a), Int(b)) => Ok(Int(match op {
                Add => a + b,
                Sub => a - b,
                _ => a * b,
            })),
            (Float(a), Float(b)) => Ok(Float(match op {
                Add => a + b,
                Sub => a - b,
                _ => a * b,
            })),
            (l, r) => Err(bad(&l, &r)),
        },

        Div => match (lhs, rhs) {
            (Int(_), Int(0)) => Err(SpindleError::DivisionByZero),
            (Int(a), Int(b)) => Ok(Int(a / b)),
            (Float(a), Float(b)) => Ok(Float(a / b)),
            (l, r) => Err(bad(&l, &r)),
        },

        Rem => match (lhs, rhs) {
            (Int(_), Int(0)) => Err(SpindleError::DivisionByZero),
            (Int(a), Int(b)) => Ok(Int(a % b)),
            (l, r) => Err(bad(&l, &r)),
        },

        Eq | Ne => {
            let equal = match (lhs, rhs) {
                (Int(a), Int(b)) => a == b,
                (Float(a), Float(b)) => a == b,
                (Bool(a), Bool(b)) => a == b,
                (Str(a), Str(b)) => a == b,
                // a bare 0/1 literal still compares against a BOOL field
                (Bool(a), Int(b)) => a as i64 == b,
                (Int(a), Bool(b)) => a == b as i64,
                (l, r) => return Err(bad(&l, &r)),
            };
            Ok(Bool(if op == Eq { equal } else { !equal }))
        }

        Ge | Le | Gt | Lt => {
            let holds = match (lhs, rhs) {
                (Int(a), Int(b)) => ordered(op, a, b),
                (Float(a), Float(b)) => match op {
                    Ge => a >= b,
                    Le => a <= b,
                    Gt => a > b,
                    _ => a < b,
                },
                (Str(a), Str(b)) => ordered(op, a, b),
                (l, r) => return Err(bad(&l, &r)),
            };
            Ok(Bool(holds))
        }
    }
}

fn ordered<T: Ord>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Ge => a >= b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a < b,
    }
}
