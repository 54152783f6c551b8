//! HTTP Control Server Module
//!
//! This module defines the control server using the `picoserve` framework.
//! It serves the control page, turns `/control` queries into steering
//! commands on the shared [`MotionSystem`], and reports the safety window on
//! `/status`.

extern crate alloc;

use alloc::string::String;

use embassy_net::Stack;
use embassy_time::Duration;
use embedded_io_async::Read;
use picoserve::{
    extract::FromRequest,
    request::{RequestBody, RequestParts},
    response::{File, Response, StatusCode},
    url_encoded::{deserialize_form, UrlEncodedString},
    Router,
};
use serde::Deserialize;

use crate::utils::{
    controllers::{Clock, CommandError, DutyOutput, MotionSystem},
    frontend::INDEX_HTML,
};

/// HTTP status used to report a failed control request.
pub fn status_for(error: CommandError) -> StatusCode {
    match error {
        CommandError::MalformedRequest | CommandError::UnrecognizedCommand => {
            StatusCode::BAD_REQUEST
        }
        CommandError::PeripheralFault => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body of `/status`.
pub const fn status_phrase(within_window: bool) -> &'static str {
    if within_window {
        "ok"
    } else {
        "timeout"
    }
}

/// Creates the control server and serves until the device resets.
pub async fn run<P, C>(
    id: usize,
    port: u16,
    stack: Stack<'static>,
    motion: &'static MotionSystem<P, C>,
    config: Option<&'static picoserve::Config<Duration>>,
) -> !
where
    P: DutyOutput + 'static,
    C: Clock + 'static,
{
    let default_config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        persistent_start_read_request: None,
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(5)),
    });

    let config = config.unwrap_or(&default_config);

    let router = Router::new()
        .route("/", picoserve::routing::get_service(File::html(INDEX_HTML)))
        .route(
            "/control",
            picoserve::routing::get(move |params: ControlParams| async move {
                let result = match params.query {
                    Ok(query) => {
                        motion
                            .control(query.cmd.as_deref(), query.speed.as_deref())
                            .await
                    }
                    Err(error) => Err(error),
                };

                let (status, body) = match result {
                    Ok(action) => (StatusCode::OK, action),
                    Err(error) => {
                        tracing::warn!(%error, "control request rejected");
                        (status_for(error), error.message())
                    }
                };
                Response::new(status, body)
            }),
        )
        .route(
            "/status",
            picoserve::routing::get(move || async move {
                status_phrase(motion.is_within_safety_window().await)
            }),
        );

    if let Some(ip_cfg) = stack.config_v4() {
        tracing::info!("Starting server at {}:{}", ip_cfg.address, port);
    } else {
        tracing::warn!(
            "Starting control server on port {port}, but no IPv4 address is assigned yet!"
        );
    }

    let (mut rx_buffer, mut tx_buffer, mut http_buffer) = ([0; 1024], [0; 1024], [0; 2048]);

    picoserve::listen_and_serve_with_state(
        id,
        &router,
        config,
        stack,
        port,
        &mut rx_buffer,
        &mut tx_buffer,
        &mut http_buffer,
        &(),
    )
    .await
}

/// Query string of `/control`, e.g. `?cmd=forward&speed=180`.
///
/// Both fields are kept as text; validation belongs to the interpreter.
#[derive(Debug, Default, Deserialize)]
pub struct ControlQuery {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
}

/// Decode a `/control` query string.
///
/// A missing or undecodable query, or one without a non-empty `cmd`, is a
/// [`CommandError::MalformedRequest`].
pub fn parse_query(query: Option<UrlEncodedString<'_>>) -> Result<ControlQuery, CommandError> {
    let query = query.ok_or(CommandError::MalformedRequest)?;
    let query = deserialize_form::<ControlQuery>(query).map_err(|_| {
        tracing::warn!(?query, "undecodable control query");
        CommandError::MalformedRequest
    })?;

    match query.cmd.as_deref() {
        Some(cmd) if !cmd.is_empty() => Ok(query),
        _ => Err(CommandError::MalformedRequest),
    }
}

/// Extracted `/control` parameters.
///
/// Extraction never rejects the request: a bad query is carried as
/// [`CommandError::MalformedRequest`] so the handler can answer with its own
/// status and phrase.
pub struct ControlParams {
    pub query: Result<ControlQuery, CommandError>,
}

impl<'r, S> FromRequest<'r, S> for ControlParams {
    type Rejection = core::convert::Infallible;

    async fn from_request<R: Read>(
        _state: &'r S,
        parts: RequestParts<'r>,
        _body: RequestBody<'r, R>,
    ) -> Result<Self, Self::Rejection> {
        Ok(ControlParams {
            query: parse_query(parts.query()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_phrases() {
        assert_eq!(status_phrase(true), "ok");
        assert_eq!(status_phrase(false), "timeout");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(status_for(CommandError::MalformedRequest).as_u16(), 400);
        assert_eq!(status_for(CommandError::UnrecognizedCommand).as_u16(), 400);
        assert_eq!(status_for(CommandError::PeripheralFault).as_u16(), 500);
    }

    #[test]
    fn test_query_decoding() {
        let query = parse_query(Some(UrlEncodedString("cmd=forward&speed=180"))).unwrap();
        assert_eq!(query.cmd.as_deref(), Some("forward"));
        assert_eq!(query.speed.as_deref(), Some("180"));

        let query = parse_query(Some(UrlEncodedString("cmd=stop"))).unwrap();
        assert_eq!(query.cmd.as_deref(), Some("stop"));
        assert_eq!(query.speed, None);
    }

    #[test]
    fn test_empty_speed_is_kept_as_text() {
        let query = parse_query(Some(UrlEncodedString("cmd=forward&speed="))).unwrap();
        assert_eq!(query.speed.as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_queries() {
        assert!(matches!(parse_query(None), Err(CommandError::MalformedRequest)));
        for raw in ["speed=3", "cmd=&speed=3", "cmd", ""] {
            assert!(
                matches!(
                    parse_query(Some(UrlEncodedString(raw))),
                    Err(CommandError::MalformedRequest)
                ),
                "query={raw:?}"
            );
        }
    }
}
