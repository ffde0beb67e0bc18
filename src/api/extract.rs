use axum::Json;
use axum::extract::{FromRequest, Request, rejection::JsonRejection};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;
use crate::validation::{ValidationCode, ValidationError, from_validation_errors};

/// `Json` that also runs the body's field rules. Malformed bodies and rule
/// failures both surface as [`AppError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(vec![body_error(&rejection)]))?;

        value
            .validate()
            .map_err(|errors| AppError::Validation(from_validation_errors(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

fn body_error(rejection: &JsonRejection) -> ValidationError {
    let text = rejection.body_text();

    if let Some(field) = text
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
    {
        return ValidationError::new(field, ValidationCode::Required, format!("{field} is required"));
    }

    match rejection {
        JsonRejection::MissingJsonContentType(_) => ValidationError::new(
            "body",
            ValidationCode::InvalidBody,
            "Missing 'Content-Type: application/json' header",
        ),
        JsonRejection::JsonDataError(_) => {
            let field = data_error_field(&text);
            let message = format!("{field} has an invalid type or value");
            ValidationError::new(field, ValidationCode::InvalidBody, message)
        }
        _ => ValidationError::new("body", ValidationCode::InvalidBody, "request body is not valid JSON"),
    }
}

/// Data errors read "...target type: <path>: invalid type: ..." when the
/// failure sits below the root.
fn data_error_field(text: &str) -> String {
    text.split_once("target type: ")
        .and_then(|(_, rest)| rest.split_once(": "))
        .map(|(path, _)| path)
        .filter(|path| !path.contains(' '))
        .unwrap_or("body")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_names_the_nested_path() {
        let text = "Failed to deserialize the JSON body into the target type: startTime: invalid type: integer `9`, expected a string at line 1 column 20";
        assert_eq!(data_error_field(text), "startTime");
        let root = "Failed to deserialize the JSON body into the target type: invalid type: integer `1`, expected struct";
        assert_eq!(data_error_field(root), "body");
    }
}
