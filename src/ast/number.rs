use pest::iterators::Pair;

use super::{pos, Position, Rule, TransformError, TransformResult};

/// Numeric literal. The sign is part of the token, so `-1` arrives here
/// as a single literal and never as a unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub value: NumberValue,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn from_pair(pair: Pair<Rule>, file: &str) -> TransformResult<Number> {
        let position = pos(&pair, file);
        let text = pair.as_str();

        let value = if let Ok(int) = text.parse::<i64>() {
            NumberValue::Integer(int)
        } else {
            match text.parse::<f64>() {
                Ok(float) => NumberValue::Float(float),
                Err(_) => {
                    return Err(TransformError::new(
                        format!("invalid number literal '{text}'"),
                        position,
                    ))
                }
            }
        };

        Ok(Number { value, position })
    }

    pub fn is_negative(&self) -> bool {
        match self.value {
            NumberValue::Integer(value) => value < 0,
            NumberValue::Float(value) => value < 0.0,
        }
    }
}
