//! Normalization of whatever a handler returns.

use crate::error::HandlerError;
use serde::Serialize;
use serde_json::Value;

/// Resolved outcome of a handler: a value to auto-serialize, nothing, or an error.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// Wrapper that auto-serializes any `Serialize` value as the JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Types a handler may resolve to.
///
/// `()` and `None` mean "no value": the dispatcher leaves the response alone.
pub trait HandlerOutput {
    fn into_result(self) -> HandlerResult;
}

impl HandlerOutput for () {
    fn into_result(self) -> HandlerResult {
        Ok(None)
    }
}

impl HandlerOutput for Value {
    fn into_result(self) -> HandlerResult {
        Ok(Some(self))
    }
}

impl<T: Serialize> HandlerOutput for Json<T> {
    fn into_result(self) -> HandlerResult {
        Ok(Some(serde_json::to_value(self.0)?))
    }
}

impl<T: HandlerOutput> HandlerOutput for Option<T> {
    fn into_result(self) -> HandlerResult {
        self.map_or(Ok(None), HandlerOutput::into_result)
    }
}

impl<T, E> HandlerOutput for Result<T, E>
where
    T: HandlerOutput,
    E: Into<HandlerError>,
{
    fn into_result(self) -> HandlerResult {
        self.map_err(Into::into)?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Greeting {
        message: &'static str,
    }

    #[test]
    fn test_unit_is_no_value() {
        assert_eq!(().into_result(), Ok(None));
        assert_eq!(None::<Value>.into_result(), Ok(None));
    }

    #[test]
    fn test_json_wrapper() {
        let out = Json(Greeting { message: "hi" }).into_result().unwrap();
        assert_eq!(out, Some(json!({"message": "hi"})));
    }

    #[test]
    fn test_null_is_a_value() {
        assert_eq!(Value::Null.into_result(), Ok(Some(Value::Null)));
    }

    #[test]
    fn test_result_error() {
        let out: Result<Value, &str> = Err("nope");
        assert_eq!(out.into_result(), Err(HandlerError::new("nope")));
    }
}
