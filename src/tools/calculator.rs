use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid, numeric, ToolOutput, ToolSpec};
use crate::error::Result;

pub const NAME: &str = "calculator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Operation::Add),
            "subtract" => Some(Operation::Subtract),
            "multiply" => Some(Operation::Multiply),
            "divide" => Some(Operation::Divide),
            _ => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "×",
            Operation::Divide => "÷",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CalculatorArgs {
    pub operation: Option<String>,
    pub a: Option<Value>,
    pub b: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calculation {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

impl CalculatorArgs {
    pub fn validate(self) -> Result<Calculation> {
        let operation = self
            .operation
            .ok_or_else(|| invalid("You must specify an operation: add, subtract, multiply, or divide."))?;
        let operation = Operation::from_name(&operation)
            .ok_or_else(|| invalid("Operation must be one of: add, subtract, multiply, or divide."))?;
        let a = operand(self.a, "first number (a)")?;
        let b = operand(self.b, "second number (b)")?;
        Ok(Calculation { operation, a, b })
    }
}

fn operand(value: Option<Value>, label: &str) -> Result<f64> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| invalid(format!("You must provide the {label}.")))?;
    numeric(&value).ok_or_else(|| invalid(format!("The {label} must be numeric.")))
}

pub fn run(calc: Calculation) -> Result<ToolOutput> {
    let Calculation { operation, a, b } = calc;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide if b == 0.0 => {
            return Ok(ToolOutput::error("Division by zero is not allowed."))
        }
        Operation::Divide => a / b,
    };
    Ok(ToolOutput::text(format!(
        "Result: {a} {} {b} = {result}",
        operation.symbol()
    )))
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Performs basic mathematical operations including addition, subtraction, multiplication, and division.",
        input_schema: json!({
            "type": "object",
            "required": ["operation", "a", "b"],
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The mathematical operation to perform."
                },
                "a": { "type": "number", "description": "The first number." },
                "b": { "type": "number", "description": "The second number." }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(op: &str, a: Value, b: Value) -> Result<ToolOutput> {
        CalculatorArgs {
            operation: Some(op.into()),
            a: Some(a),
            b: Some(b),
        }
        .validate()
        .and_then(run)
    }

    #[test]
    fn formats_each_operation() {
        assert_eq!(calc("add", json!(5), json!(3)).unwrap().content, vec!["Result: 5 + 3 = 8"]);
        assert_eq!(
            calc("multiply", json!(2.5), json!(4)).unwrap().content,
            vec!["Result: 2.5 × 4 = 10"]
        );
        assert_eq!(
            calc("divide", json!("9"), json!(2)).unwrap().content,
            vec!["Result: 9 ÷ 2 = 4.5"]
        );
        assert_eq!(
            calc("subtract", json!(1), json!(3)).unwrap().content,
            vec!["Result: 1 - 3 = -2"]
        );
    }

    #[test]
    fn division_by_zero_is_a_tool_error() {
        let out = calc("divide", json!(1), json!(0)).unwrap();
        assert!(out.is_error);
        assert_eq!(out.content, vec!["Division by zero is not allowed."]);
    }

    #[test]
    fn validation_messages() {
        let err = calc("power", json!(1), json!(2)).unwrap_err();
        assert_eq!(err.to_string(), "Operation must be one of: add, subtract, multiply, or divide.");

        let err = calc("add", json!("x"), json!(2)).unwrap_err();
        assert_eq!(err.to_string(), "The first number (a) must be numeric.");

        let err = CalculatorArgs {
            operation: Some("add".into()),
            a: Some(json!(1)),
            b: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "You must provide the second number (b).");
    }
}
