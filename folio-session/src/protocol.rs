use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, SessionError};
use crate::paths::socket_path;

/// One line sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionRequest {
    pub fn command(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            ..Self::default()
        }
    }
}

/// One line sent back by the session; `data` on success, `error` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Send one request line to the session of `site` and read back one response line.
pub fn send_request(site: &Path, request: &SessionRequest) -> Result<SessionResponse, SessionError> {
    let socket = socket_path(site);

    let mut stream = match UnixStream::connect(&socket) {
        Ok(stream) => stream,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
            ) =>
        {
            return Err(SessionError::SessionNotRunning { socket })
        }
        Err(err) => return Err(io_err(&socket, err)),
    };

    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    stream.write_all(&line).map_err(|e| io_err(&socket, e))?;

    let mut reply = String::new();
    BufReader::new(stream)
        .read_line(&mut reply)
        .map_err(|e| io_err(&socket, e))?;
    if reply.is_empty() {
        return Err(SessionError::Protocol(
            "session closed the connection without answering".to_string(),
        ));
    }
    Ok(serde_json::from_str(reply.trim_end())?)
}

/// `status`, retried briefly so it also works right after `serve` was launched.
pub fn request_status(site: &Path) -> Result<Value, SessionError> {
    const ATTEMPTS: u32 = 5;
    let request = SessionRequest::command("status");

    let mut attempt = 1;
    loop {
        match send_request(site, &request) {
            Err(SessionError::SessionNotRunning { .. }) if attempt < ATTEMPTS => {
                attempt += 1;
                sleep(Duration::from_millis(100));
            }
            result => return response_into_data(result?),
        }
    }
}

pub fn request_edit(site: &Path, document: &str, value: Value) -> Result<Value, SessionError> {
    let request = SessionRequest {
        document: Some(document.to_string()),
        value: Some(value),
        ..SessionRequest::command("edit")
    };
    response_into_data(send_request(site, &request)?)
}

pub fn request_save(site: &Path) -> Result<Value, SessionError> {
    response_into_data(send_request(site, &SessionRequest::command("save"))?)
}

pub fn request_publish(site: &Path, message: Option<String>) -> Result<Value, SessionError> {
    let request = SessionRequest {
        message,
        ..SessionRequest::command("publish")
    };
    response_into_data(send_request(site, &request)?)
}

pub fn request_cancel(site: &Path) -> Result<Value, SessionError> {
    response_into_data(send_request(site, &SessionRequest::command("cancel"))?)
}

pub fn request_stop(site: &Path) -> Result<(), SessionError> {
    response_into_data(send_request(site, &SessionRequest::command("stop"))?)?;
    Ok(())
}

fn response_into_data(response: SessionResponse) -> Result<Value, SessionError> {
    match response {
        SessionResponse { ok: true, data, .. } => Ok(data.unwrap_or_default()),
        SessionResponse { error, .. } => Err(SessionError::Protocol(
            error.unwrap_or_else(|| "unknown session error".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn request_omits_absent_fields() {
        let encoded = serde_json::to_value(SessionRequest::command("save")).unwrap();
        assert_eq!(encoded, json!({ "cmd": "save" }));

        let decoded: SessionRequest =
            serde_json::from_str(r#"{"cmd":"edit","document":"profile","value":{"a":1}}"#)
                .unwrap();
        assert_eq!(decoded.document.as_deref(), Some("profile"));
        assert_eq!(decoded.value, Some(json!({ "a": 1 })));
        assert!(decoded.message.is_none());
    }

    #[test]
    fn missing_socket_means_not_running() {
        let site = TempDir::new().unwrap();
        let err = send_request(site.path(), &SessionRequest::command("status")).unwrap_err();
        assert!(matches!(err, SessionError::SessionNotRunning { .. }));
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let err = response_into_data(SessionResponse::error("a publish is already in flight"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "session protocol error: a publish is already in flight"
        );
        assert_eq!(
            response_into_data(SessionResponse::ok(json!({ "x": 1 }))).unwrap(),
            json!({ "x": 1 })
        );
    }
}
