use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Missing required field {0:?}")]
    MissingField(String),

    #[error("Invalid value for field {0:?}")]
    InvalidField(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("No record with id {0:?}")]
    NotFound(String),

    #[error("No thread with id {0:?}")]
    UnknownThread(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::InvalidField(_) => StatusCode::BAD_REQUEST,
            Error::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnknownThread(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::MissingField(f) => json!({
                "message": "a required field is missing",
                "type": "missing-field",
                "field": f,
            }),
            Error::InvalidField(f) => json!({
                "message": "a field has an invalid value",
                "type": "invalid-field",
                "field": f,
            }),
            Error::InvalidBody(msg) => json!({
                "message": msg,
                "type": "invalid-body",
            }),
            Error::NotFound(id) => json!({
                "message": "record not found",
                "type": "not-found",
                "id": id,
            }),
            Error::UnknownThread(id) => json!({
                "message": "could not locate parent thread",
                "type": "unknown-thread",
                "id": id,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let string_field = |name: &str| -> anyhow::Result<String> {
            data.get(name)
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error contents lack a {name:?} string"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(string_field("message").unwrap_or_default()),
                "missing-field" => Error::MissingField(string_field("field")?),
                "invalid-field" => Error::InvalidField(string_field("field")?),
                "invalid-body" => Error::InvalidBody(string_field("message").unwrap_or_default()),
                "not-found" => Error::NotFound(string_field("id")?),
                "unknown-thread" => Error::UnknownThread(string_field("id")?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_requests() {
        for err in [
            Error::MissingField(String::from("title")),
            Error::InvalidField(String::from("startTime")),
            Error::InvalidBody(String::from("expected value")),
            Error::UnknownThread(String::from("abcdef")),
        ] {
            assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST, "{err}");
        }
        assert_eq!(
            Error::NotFound(String::from("abcdef")).status_code(),
            http::StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn contents_parse_back() {
        let err = Error::MissingField(String::from("semanticLocation"));
        assert_eq!(Error::parse(&err.contents()).unwrap(), err);

        let err = Error::UnknownThread(String::from("zzzzzz"));
        assert_eq!(Error::parse(&err.contents()).unwrap(), err);
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!(Error::parse(br#"{"type": "teapot"}"#).is_err());
        assert!(Error::parse(b"not json").is_err());
    }
}
