use spindle::expr::{parse, BinaryOp, Expr};
use spindle::record::{Column, DataType, Schema, StrBytes, Value};
use spindle::SpindleError;

fn schema() -> Schema {
    Schema::new(vec![
        Column::new("name", DataType::Str),
        Column::new("age", DataType::Int),
        Column::new("score", DataType::Float),
        Column::new("alive", DataType::Bool),
    ])
}

/// A record image for ("Ann", 30, 1.5, true).
fn record() -> Vec<u8> {
    let schema = schema();
    let mut image = vec![0u8; schema.record_size()];
    Value::Str(StrBytes::from_str("Ann")).encode(&mut image[schema.field_range(0)]);
    Value::Int(30).encode(&mut image[schema.field_range(1)]);
    Value::Float(1.5).encode(&mut image[schema.field_range(2)]);
    Value::Bool(true).encode(&mut image[schema.field_range(3)]);
    image
}

fn eval(text: &str) -> Value {
    parse(text, &schema())
        .unwrap()
        .evaluate(&record(), &schema())
        .unwrap()
}

fn matches(text: &str) -> bool {
    parse(text, &schema())
        .unwrap()
        .matches(&record(), &schema())
        .unwrap()
}

#[test]
fn test_variables_read_record_fields() {
    assert_eq!(eval("age"), Value::Int(30));
    assert_eq!(eval("score"), Value::Float(1.5));
    assert_eq!(eval("alive"), Value::Bool(true));
    assert_eq!(eval("name"), Value::Str(StrBytes::from_str("Ann")));
}

#[test]
fn test_arithmetic_over_fields() {
    assert_eq!(eval("age+5"), Value::Int(35));
    assert_eq!(eval("age*2-10"), Value::Int(50));
    assert_eq!(eval("age%7"), Value::Int(2));
    assert_eq!(eval("score*2.0"), Value::Float(3.0));
}

#[test]
fn test_comparisons() {
    assert!(matches("age > 29"));
    assert!(!matches("age > 30"));
    assert!(matches("age >= 30"));
    assert!(matches("score <= 1.5"));
    assert!(matches("name == \"Ann\""));
    assert!(matches("name < \"Bob\""));
    assert!(matches("name != \"Bob\""));
}

#[test]
fn test_comparison_binds_below_arithmetic() {
    // with comparisons looser than arithmetic both sides fold first
    assert!(matches("age+1 > age"));
    assert!(matches("age > 20+5"));
}

#[test]
fn test_logical_connectives() {
    assert!(matches("age > 20 && age < 40"));
    assert!(matches("age > 100 || alive"));
    assert!(!matches("age > 100 && alive"));
    assert!(matches("alive == true"));
    assert!(!matches("alive == false"));
}

#[test]
fn test_bool_field_against_int_literal() {
    assert!(matches("alive == 1"));
    assert!(!matches("alive == 0"));
    assert!(matches("alive != 0"));
}

#[test]
fn test_parenthesized_grouping() {
    assert!(matches("(age > 100 || alive) && age == 30"));
    assert_eq!(eval("(age+2)*2"), Value::Int(64));
}

#[test]
fn test_type_errors_are_reported() {
    for text in ["age + score", "name > 3", "alive && 1", "age && alive"] {
        let expr = parse(text, &schema()).unwrap();
        assert!(
            matches!(
                expr.evaluate(&record(), &schema()),
                Err(SpindleError::BadOperands { .. })
            ),
            "`{text}` must be a type error"
        );
    }
}

#[test]
fn test_division_by_zero_is_reported() {
    let expr = parse("age / 0", &schema()).unwrap();
    assert!(matches!(
        expr.evaluate(&record(), &schema()),
        Err(SpindleError::DivisionByZero)
    ));
}

#[test]
fn test_non_boolean_root_is_rejected_by_matches() {
    let expr = parse("age + 1", &schema()).unwrap();
    assert!(matches!(
        expr.matches(&record(), &schema()),
        Err(SpindleError::NotABoolean)
    ));
}

#[test]
fn test_string_literal_is_nul_padded() {
    let parsed = parse("\"Ann\"", &schema()).unwrap();
    match parsed {
        Expr::Literal(Value::Str(bytes)) => {
            assert_eq!(&bytes.as_bytes()[..4], b"Ann\0");
            assert_eq!(bytes.as_bytes().len(), 64);
        }
        other => panic!("expected a string literal, got {other:?}"),
    }
}

#[test]
fn test_grouping_properties() {
    let schema = schema();
    let a_plus = parse("age+1*2", &schema).unwrap();
    match a_plus {
        Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
            assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("expected `+` at the root, got {other:?}"),
    }

    let grouped = parse("(age+1)*2", &schema).unwrap();
    match grouped {
        Expr::Binary { op: BinaryOp::Mul, lhs, .. } => {
            assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Add, .. }));
        }
        other => panic!("expected `*` at the root, got {other:?}"),
    }
}
