//! HTTP API for location ingestion and queries
//!
//! Routes:
//! - `GET /health`
//! - `POST /location`
//! - `GET /status/{vehicleId}`
//! - `GET /events?vehicleId=&limit=`
//! - `GET /zones`
//! - `GET /metrics` (Prometheus)
//!
//! Uses hyper for the HTTP server. Request bodies are capped at
//! `MAX_BODY_BYTES` and parsed into typed structs here; the service never
//! sees raw JSON.

use crate::domain::error::GeofenceError;
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::geofence::GeofenceService;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Upper bound on a buffered request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Offset-less forms, read as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Shared state handed to every connection
pub struct AppState {
    pub service: GeofenceService,
    pub site_id: String,
}

/// Body of `POST /location`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 8601, offset optional (naive values are UTC); server time when omitted
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{raw}', expected ISO 8601"))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

/// Parsed `GET /events` query string
#[derive(Debug, Default, PartialEq)]
struct EventsQuery {
    vehicle_id: Option<String>,
    limit: Option<usize>,
}

fn parse_events_query(query: Option<&str>) -> Result<EventsQuery, String> {
    let mut parsed = EventsQuery::default();
    let Some(query) = query else {
        return Ok(parsed);
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            // Empty vehicleId means no filter
            "vehicleId" if !value.is_empty() => parsed.vehicle_id = Some(value.into_owned()),
            "limit" => {
                let limit = value
                    .parse::<usize>()
                    .map_err(|_| format!("limit must be a non-negative integer, got '{value}'"))?;
                parsed.limit = Some(limit);
            }
            _ => {}
        }
    }

    Ok(parsed)
}

fn response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(body))
        .expect("static response should not fail")
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => response(status, "application/json", Bytes::from(body)),
        Err(e) => {
            error!(error = %e, "http_response_serialize_failed");
            response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", Bytes::from("Internal Error"))
        }
    }
}

fn error_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { detail })
}

fn geofence_error_response(err: &GeofenceError) -> Response<Full<Bytes>> {
    let status = match err {
        GeofenceError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
        GeofenceError::UnknownVehicle(_) => StatusCode::NOT_FOUND,
        GeofenceError::InvalidZoneDefinition(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn handle_location(body: &[u8], state: &AppState) -> Response<Full<Bytes>> {
    let request: LocationRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "location_body_invalid");
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid request body: {e}"));
        }
    };

    debug!(
        vehicle_id = %request.vehicle_id,
        lat = %request.latitude,
        lng = %request.longitude,
        ts = ?request.timestamp,
        "location_received"
    );

    match state.service.apply_location_update(
        &request.vehicle_id,
        request.latitude,
        request.longitude,
        request.timestamp,
    ) {
        Ok(outcome) => json_response(StatusCode::OK, &outcome),
        Err(e) => geofence_error_response(&e),
    }
}

fn handle_status(raw_vehicle_id: &str, state: &AppState) -> Response<Full<Bytes>> {
    let vehicle_id = percent_decode_str(raw_vehicle_id).decode_utf8_lossy();
    match state.service.get_status(&vehicle_id) {
        Ok(status) => json_response(StatusCode::OK, &status),
        Err(e) => geofence_error_response(&e),
    }
}

fn handle_events(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    match parse_events_query(query) {
        Ok(q) => {
            let events = state.service.list_events(q.vehicle_id.as_deref(), q.limit);
            json_response(StatusCode::OK, &events)
        }
        Err(detail) => error_response(StatusCode::BAD_REQUEST, &detail),
    }
}

/// Dispatch a request that has already been read into memory
pub fn route(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
    state: &AppState,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            &serde_json::json!({ "status": "ok", "timestamp": Utc::now() }),
        ),
        (&Method::POST, "/location") => handle_location(body, state),
        (&Method::GET, "/events") => handle_events(query, state),
        (&Method::GET, "/zones") => json_response(StatusCode::OK, &state.service.list_zones()),
        (&Method::GET, "/metrics") => {
            let summary = state.service.metrics().snapshot(state.service.gauges());
            response(
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                Bytes::from(format_prometheus_metrics(&summary, &state.site_id)),
            )
        }
        (&Method::GET, p) if p.starts_with("/status/") => {
            match p.trim_start_matches("/status/") {
                "" => error_response(StatusCode::NOT_FOUND, "Not Found"),
                id if id.contains('/') => error_response(StatusCode::NOT_FOUND, "Not Found"),
                id => handle_status(id, state),
            }
        }
        // CORS preflight
        (&Method::OPTIONS, _) => Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "*")
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail"),
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Handle HTTP requests
async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(path = %parts.uri.path(), limit = MAX_BODY_BYTES, "http_body_too_large");
            return Ok(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!("request body exceeds {MAX_BODY_BYTES} bytes"),
            ));
        }
        Err(e) => {
            warn!(error = %e, "http_body_read_failed");
            return Ok(error_response(StatusCode::BAD_REQUEST, "failed to read request body"));
        }
    };

    Ok(route(&parts.method, parts.uri.path(), parts.uri.query(), &body, &state))
}

/// Serve connections from an already bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind and start the HTTP server
pub async fn start_http_server(
    bind_address: &str,
    port: u16,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind((bind_address, port)).await?;

    info!(
        addr = %listener.local_addr()?,
        site = %state.site_id,
        "http_server_started"
    );

    serve(listener, state, shutdown).await
}
