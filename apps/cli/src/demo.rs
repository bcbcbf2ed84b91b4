//! Demo capabilities shipped with the CLI.

use autoclass_capabilities::{
    required_arg, required_str, Args, InvokeError, InvokeResult, MethodTable,
};
use serde_json::{json, Value};

const ADD_DOC: &str = "
    - Description: This method adds two numbers.
    - List of parameters:
        - param a: First number :type: int or float
        - param b: Second number :type: int or float
    :return: Sum of a and b :rtype: int or float
";

const SUBTRACT_DOC: &str = "
    - Description: This method subtracts two numbers.
    - List of parameters:
        - param a: First number :type: int or float
        - param b: Second number :type: int or float
    :return: Difference of a and b :rtype: int or float
";

const MULTIPLY_DOC: &str = "
    - Description: This method multiplies two numbers.
    - List of parameters:
        - param a: First number :type: int or float
        - param b: Second number :type: int or float
    :return: Product of a and b :rtype: int or float
";

const DIVIDE_DOC: &str = "
    - Description: This method divides two numbers.
    - List of parameters:
        - param a: First number :type: int or float
        - param b: Second number :type: int or float
    :return: Quotient of a and b :rtype: float
";

const TO_UPPER_DOC: &str = "
    - Description: Converts the input string to uppercase.
    - List of parameters:
        - param text: Input string :type: str
    :return: Uppercase version of the input string :rtype: str
";

const TO_LOWER_DOC: &str = "
    - Description: Converts the input string to lowercase.
    - List of parameters:
        - param text: Input string :type: str
    :return: Lowercase version of the input string :rtype: str
";

const COUNT_WORDS_DOC: &str = "
    - Description: Counts the number of words in the input string.
    - List of parameters:
        - param text: Input string :type: str
    :return: Total number of words in the input string :rtype: int
";

const REVERSE_DOC: &str = "
    - Description: Reverses the characters in the input string.
    - List of parameters:
        - param text: Input string :type: str
    :return: Reversed string :rtype: str
";

const CONTAINS_DOC: &str = "
    - Description: Checks whether the input string contains the specified substring.
    - List of parameters:
        - param text: Input string :type: str
        - param substring: Substring to check :type: str
    :return: True if the substring is found in the text, else False :rtype: bool
";

/// Integers stay integers while the result fits; anything else is float.
enum Operands {
    Int(i64, i64),
    Float(f64, f64),
}

fn operands(args: &Args) -> InvokeResult<Operands> {
    let a = required_arg(args, "a")?;
    let b = required_arg(args, "b")?;
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Ok(Operands::Int(a, b));
    }
    let a = a
        .as_f64()
        .ok_or_else(|| InvokeError::invalid("a", "expected a number"))?;
    let b = b
        .as_f64()
        .ok_or_else(|| InvokeError::invalid("b", "expected a number"))?;
    Ok(Operands::Float(a, b))
}

fn arith(
    args: &Args,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> InvokeResult<Value> {
    match operands(args)? {
        Operands::Int(a, b) => Ok(match int_op(a, b) {
            Some(v) => json!(v),
            None => json!(float_op(a as f64, b as f64)),
        }),
        Operands::Float(a, b) => Ok(json!(float_op(a, b))),
    }
}

fn divide(args: &Args) -> InvokeResult<Value> {
    let (a, b) = match operands(args)? {
        Operands::Int(a, b) => (a as f64, b as f64),
        Operands::Float(a, b) => (a, b),
    };
    if b == 0.0 {
        return Err(InvokeError::failed("Cannot divide by zero"));
    }
    Ok(json!(a / b))
}

pub fn arithmetic() -> MethodTable {
    MethodTable::new("Arithmetic")
        .with_description(
            "This class contains a set of methods designed to perform basic arithmetic operations.",
        )
        .method("add", ADD_DOC, |args| arith(args, i64::checked_add, |a, b| a + b))
        .method("subtract", SUBTRACT_DOC, |args| {
            arith(args, i64::checked_sub, |a, b| a - b)
        })
        .method("multiply", MULTIPLY_DOC, |args| {
            arith(args, i64::checked_mul, |a, b| a * b)
        })
        .method("divide", DIVIDE_DOC, divide)
}

pub fn string_utils() -> MethodTable {
    MethodTable::new("StringUtils")
        .with_description(
            "This class provides a set of methods for common string manipulation operations \
             such as formatting, case conversion, and analysis.",
        )
        .method("to_upper", TO_UPPER_DOC, |args| {
            Ok(json!(required_str(args, "text")?.to_uppercase()))
        })
        .method("to_lower", TO_LOWER_DOC, |args| {
            Ok(json!(required_str(args, "text")?.to_lowercase()))
        })
        .method("count_words", COUNT_WORDS_DOC, |args| {
            Ok(json!(required_str(args, "text")?.split_whitespace().count()))
        })
        .method("reverse_string", REVERSE_DOC, |args| {
            Ok(json!(required_str(args, "text")?.chars().rev().collect::<String>()))
        })
        .method("contains_substring", CONTAINS_DOC, |args| {
            let text = required_str(args, "text")?;
            let substring = required_str(args, "substring")?;
            Ok(json!(text.contains(substring)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclass_capabilities::Capability;

    fn args(value: Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_integer_arithmetic_stays_integer() {
        let table = arithmetic();
        let sum = table.invoke("add", &args(json!({"a": 2, "b": 3}))).await.unwrap();
        assert_eq!(sum, json!(5));
        assert!(sum.is_i64());

        let mixed = table
            .invoke("multiply", &args(json!({"a": 2, "b": 1.5})))
            .await
            .unwrap();
        assert_eq!(mixed, json!(3.0));
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let err = arithmetic()
            .invoke("divide", &args(json!({"a": 1, "b": 0})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot divide by zero"));
    }

    #[tokio::test]
    async fn test_overflow_falls_back_to_float() {
        let value = arithmetic()
            .invoke("add", &args(json!({"a": i64::MAX, "b": 1})))
            .await
            .unwrap();
        assert!(value.is_f64());
    }

    #[tokio::test]
    async fn test_string_utils() {
        let table = string_utils();
        assert_eq!(
            table
                .invoke("reverse_string", &args(json!({"text": "abc"})))
                .await
                .unwrap(),
            json!("cba")
        );
        assert_eq!(
            table
                .invoke("count_words", &args(json!({"text": "one two  three"})))
                .await
                .unwrap(),
            json!(3)
        );
        assert_eq!(
            table
                .invoke(
                    "contains_substring",
                    &args(json!({"text": "hello world", "substring": "lo w"}))
                )
                .await
                .unwrap(),
            json!(true)
        );
    }
}
