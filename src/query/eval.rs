use std::cmp::Ordering;
use std::path::Path;

use crate::config::Settings;

use super::expr::{BinaryOp, Expr, UnaryOp};
use super::{Page, PageIndex, Value};

/// Failure while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot negate {0}")]
    InvalidNegation(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot read field '{field}' of {target}")]
    NoFields { field: String, target: &'static str },
    #[error("cannot index {target} with {index}")]
    InvalidIndex {
        target: &'static str,
        index: &'static str,
    },
}

struct Context<'a> {
    file_path: &'a Path,
    index: &'a dyn PageIndex,
    settings: &'a Settings,
}

/// Evaluate an expression in the context of the page at `file_path`.
///
/// Bare identifiers and `this.<key>` resolve against the current page's
/// fields; unknown fields evaluate to null.
///
/// # Errors
/// Returns an [`EvalError`] on type errors, division by zero or calls to
/// unknown functions.
pub fn execute_inline(
    expr: &Expr,
    file_path: &Path,
    index: &dyn PageIndex,
    settings: &Settings,
) -> Result<Value, EvalError> {
    let cx = Context {
        file_path,
        index,
        settings,
    };
    cx.eval(expr)
}

impl Context<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => Ok(self.resolve(name)),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Unary(op, inner) => {
                let value = self.eval(inner)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(EvalError::InvalidNegation(other.type_name())),
                    },
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(Value::Bool(self.eval(right)?.is_truthy()))
                } else {
                    Ok(Value::Bool(false))
                }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(self.eval(right)?.is_truthy()))
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Member(target, field) => member(self.eval(target)?, field),
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                index_value(target, &index)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, args)
            }
        }
    }

    fn resolve(&self, name: &str) -> Value {
        let page = self.index.page(self.file_path);
        match name {
            "this" => page.map_or_else(|| Page::new(self.file_path).to_value(), Page::to_value),
            "file" => page.map_or_else(
                || Page::new(self.file_path).file_value(),
                Page::file_value,
            ),
            _ => page
                .and_then(|p| p.field(name))
                .cloned()
                .unwrap_or(Value::Null),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(EvalError::Arity {
                    name: name.to_string(),
                    expected,
                    found: args.len(),
                })
            }
        };
        match name.to_ascii_lowercase().as_str() {
            "length" => {
                arity(1)?;
                let len = match &args[0] {
                    Value::Null => 0,
                    Value::String(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Object(map) => map.len(),
                    _ => 1,
                };
                #[allow(clippy::cast_precision_loss)]
                let len = len as f64;
                Ok(Value::Number(len))
            }
            "lower" => {
                arity(1)?;
                Ok(map_string(&args[0], str::to_lowercase))
            }
            "upper" => {
                arity(1)?;
                Ok(map_string(&args[0], str::to_uppercase))
            }
            "round" => {
                if args.is_empty() || args.len() > 2 {
                    arity(1)?;
                }
                let digits = args.get(1).and_then(Value::as_number).unwrap_or(0.0);
                match &args[0] {
                    Value::Number(n) => {
                        let scale = 10f64.powf(digits.trunc());
                        Ok(Value::Number((n * scale).round() / scale))
                    }
                    other => Ok(other.clone()),
                }
            }
            "default" => {
                arity(2)?;
                let mut args = args.into_iter();
                let value = args.next().unwrap_or_default();
                let fallback = args.next().unwrap_or_default();
                Ok(if value.is_null() { fallback } else { value })
            }
            "string" => {
                arity(1)?;
                Ok(Value::String(match &args[0] {
                    Value::Null => self.settings.render_null_as.clone(),
                    other => other.to_string(),
                }))
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

fn map_string(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let mismatch = |left: &Value, right: &Value| EvalError::TypeMismatch {
        op: op.to_string(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::Ne => return Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Value::Bool(result));
        }
        _ => {}
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (BinaryOp::Add, Value::String(a), b) => Ok(Value::String(format!("{a}{b}"))),
        (BinaryOp::Add, a @ (Value::Number(_) | Value::Bool(_)), Value::String(b)) => {
            Ok(Value::String(format!("{a}{b}")))
        }
        (BinaryOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (BinaryOp::Div | BinaryOp::Rem, Value::Number(_), Value::Number(b)) if b == 0.0 => {
            Err(EvalError::DivisionByZero)
        }
        (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (BinaryOp::Rem, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
        (_, left, right) => Err(mismatch(&left, &right)),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn member(target: Value, field: &str) -> Result<Value, EvalError> {
    match target {
        Value::Object(map) => Ok(map
            .get(field)
            .or_else(|| {
                let wanted = crate::fields::canonicalize_key(field);
                map.iter()
                    .find(|(k, _)| crate::fields::canonicalize_key(k) == wanted)
                    .map(|(_, v)| v)
            })
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::NoFields {
            field: field.to_string(),
            target: other.type_name(),
        }),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_value(target: Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::List(items), Value::Number(n)) if *n >= 0.0 => {
            Ok(items.get(*n as usize).cloned().unwrap_or(Value::Null))
        }
        (Value::List(_), Value::Number(_)) | (Value::Null, _) => Ok(Value::Null),
        (target @ Value::Object(_), Value::String(key)) => member(target, key),
        (target, index) => Err(EvalError::InvalidIndex {
            target: target.type_name(),
            index: index.type_name(),
        }),
    }
}
