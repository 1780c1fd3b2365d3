//! Headless window manager speaking line-delimited JSON.
//!
//! Each stdin line is one call:
//! `{"id": 1, "app_id": "nav", "verb": "activatewindow", "args": {...}}`.
//! Replies carry the same `id`; events for subscribed sessions are written
//! as `{"app_id": ..., "event": {...}}`. The verb `disconnect` ends a
//! session. Surfaces are created as soon as they are requested, standing in
//! for a client that maps its window right away.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, warn};

use ivi_wm_core::{init_logging_to, init_minimal_logging, ConfigLoader, LogTarget};
use ivi_wm_domain::{
    DefaultWindowManager, Dispatcher, DisplayInfo, HeadlessDriver, Session, SurfaceId, WindowManagerService, WmEvent,
};

/// `WIDTHxHEIGHT` of the simulated output in pixels.
const OUTPUT_ENV: &str = "IVI_WM_HEADLESS_OUTPUT";
const EVENT_POLL: Duration = Duration::from_millis(20);

const DEFAULT_OUTPUT: DisplayInfo = DisplayInfo {
    width_px: 1080,
    height_px: 1920,
    width_mm: 320,
    height_mm: 520,
};

#[derive(Debug, Deserialize)]
struct Call {
    #[serde(default)]
    id: Value,
    app_id: String,
    verb: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct Failure {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outgoing {
    Reply { id: Value, result: Value },
    Failure { id: Value, error: Failure },
    Event { app_id: String, event: WmEvent },
}

fn output_from_env() -> Option<DisplayInfo> {
    let value = env::var(OUTPUT_ENV).ok()?;
    let output = parse_output(&value);
    if output.is_none() {
        warn!(value = %value, "Ignoring malformed {}", OUTPUT_ENV);
    }
    output
}

fn parse_output(value: &str) -> Option<DisplayInfo> {
    let (w, h) = value.trim().split_once('x')?;
    Some(DisplayInfo {
        width_px: w.parse().ok()?,
        height_px: h.parse().ok()?,
        ..DEFAULT_OUTPUT
    })
}

async fn handle_line(
    dispatcher: &Dispatcher<DefaultWindowManager>,
    sessions: &mut HashMap<String, Session>,
    line: &str,
) -> Outgoing {
    let call: Call = match serde_json::from_str(line) {
        Ok(call) => call,
        Err(e) => {
            warn!(error = %e, "Malformed call");
            return Outgoing::Failure {
                id: Value::Null,
                error: Failure { code: "PARSE_ERROR", message: e.to_string() },
            };
        }
    };

    if call.verb == "disconnect" {
        if let Some(session) = sessions.remove(&call.app_id) {
            dispatcher.close(session).await;
        }
        return Outgoing::Reply { id: call.id, result: Value::Null };
    }

    let session = sessions
        .entry(call.app_id.clone())
        .or_insert_with(|| Session::new(call.app_id.clone()));
    match dispatcher.dispatch(session, &call.verb, call.args).await {
        Ok(result) => {
            if call.verb == "requestsurface" {
                if let Some(surface) = result.as_u64().and_then(|id| SurfaceId::try_from(id).ok()) {
                    if let Err(e) = dispatcher.service().surface_created(surface).await {
                        warn!(surface, error = %e, "Could not attach surface");
                    }
                }
            }
            Outgoing::Reply { id: call.id, result }
        }
        Err(e) => Outgoing::Failure {
            id: call.id,
            error: Failure { code: e.code(), message: e.to_string() },
        },
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, message: &Outgoing) -> std::io::Result<()> {
    let mut text = serde_json::to_string(message)?;
    text.push('\n');
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

async fn flush_events<W: AsyncWrite + Unpin>(sessions: &mut HashMap<String, Session>, out: &mut W) -> std::io::Result<()> {
    for (app_id, session) in sessions.iter_mut() {
        let Some(events) = session.events() else {
            continue;
        };
        loop {
            match events.try_recv() {
                Ok(event) => {
                    let message = Outgoing::Event { app_id: app_id.clone(), event };
                    write_line(out, &message).await?;
                }
                Err(TryRecvError::Lagged(missed)) => warn!(app_id = %app_id, missed, "Event stream lagged"),
                Err(_) => break,
            }
        }
    }
    Ok(())
}

async fn serve(dispatcher: &Dispatcher<DefaultWindowManager>) -> std::io::Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    let mut out = stdout();
    let mut sessions: HashMap<String, Session> = HashMap::new();
    let mut ticker = tokio::time::interval(EVENT_POLL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("EOF on stdin");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let reply = handle_line(dispatcher, &mut sessions, line).await;
                write_line(&mut out, &reply).await?;
            }
            _ = ticker.tick() => {}
        }
        flush_events(&mut sessions, &mut out).await?;
    }

    for (_, session) in sessions.drain() {
        dispatcher.close(session).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            init_minimal_logging();
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    // stdout carries the replies
    if let Err(e) = init_logging_to(&config.logging, false, LogTarget::Stderr) {
        eprintln!("[ERROR] Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let output = output_from_env().unwrap_or(DEFAULT_OUTPUT);
    info!(width = output.width_px, height = output.height_px, "Starting headless window manager");

    let wm = match DefaultWindowManager::start(&config, Box::new(HeadlessDriver::new(output))).await {
        Ok(wm) => wm,
        Err(e) => {
            error!(error = %e, "Window manager failed to start");
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = Dispatcher::new(Arc::new(wm));

    if let Err(e) = serve(&dispatcher).await {
        error!(error = %e, "I/O error, shutting down");
        return ExitCode::FAILURE;
    }
    info!("Window manager stopped");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivi_wm_core::ServiceConfig;
    use ivi_wm_domain::EventKind;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const LAYERS: &str = r#"{
        "mappings": [
            { "role": "homescreen", "name": "home", "layer_id": 1000 },
            { "role": "map|music", "name": "apps", "layer_id": 1001 }
        ]
    }"#;

    const AREAS: &str = r#"{
        "areas": [
            { "name": "fullscreen", "rect": { "x": 0, "y": 0, "w": 1080, "h": 1920 } },
            { "name": "normal.full", "rect": { "x": 0, "y": 218, "w": 1080, "h": 1488 } }
        ]
    }"#;

    async fn dispatcher() -> (Dispatcher<DefaultWindowManager>, TempDir) {
        let dir = TempDir::new().unwrap();
        let layers = dir.path().join("layers.json");
        let areas = dir.path().join("areas.db");
        fs::write(&layers, LAYERS).unwrap();
        fs::write(&areas, AREAS).unwrap();
        let mut config = ServiceConfig::default();
        config.paths.layers = Some(layers);
        config.paths.areas = Some(areas);
        let wm = DefaultWindowManager::start(&config, Box::new(HeadlessDriver::new(DEFAULT_OUTPUT)))
            .await
            .unwrap();
        (Dispatcher::new(Arc::new(wm)), dir)
    }

    fn to_json(message: &Outgoing) -> Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn output_size_is_parsed_from_width_by_height() {
        let output = parse_output(" 1920x720 ").unwrap();
        assert_eq!((output.width_px, output.height_px), (1920, 720));
        assert_eq!(output.width_mm, DEFAULT_OUTPUT.width_mm);
        assert!(parse_output("1920").is_none());
        assert!(parse_output("wide x 720").is_none());
    }

    #[tokio::test]
    async fn replies_echo_the_call_id() {
        let (d, _dir) = dispatcher().await;
        let mut sessions = HashMap::new();

        let reply = handle_line(&d, &mut sessions, r#"{"id": 7, "app_id": "nav", "verb": "ping"}"#).await;
        assert_eq!(to_json(&reply), json!({ "id": 7, "result": { "status": "pong" } }));

        let reply = handle_line(&d, &mut sessions, "not json").await;
        assert_eq!(to_json(&reply)["error"]["code"], "PARSE_ERROR");

        let reply = handle_line(&d, &mut sessions, r#"{"id": "x", "app_id": "nav", "verb": "resize"}"#).await;
        assert_eq!(to_json(&reply)["id"], "x");
        assert_eq!(to_json(&reply)["error"]["code"], "FAIL");
    }

    #[tokio::test]
    async fn requested_surfaces_are_mapped_and_activatable() {
        let (d, _dir) = dispatcher().await;
        let mut sessions = HashMap::new();

        let reply = handle_line(
            &d,
            &mut sessions,
            r#"{"id": 1, "app_id": "nav", "verb": "requestsurface", "args": {"drawing_name": "map"}}"#,
        )
        .await;
        assert_eq!(to_json(&reply)["result"], 1);

        handle_line(&d, &mut sessions, r#"{"app_id": "nav", "verb": "wm_subscribe", "args": {"event": "syncDraw"}}"#)
            .await;
        let reply = handle_line(
            &d,
            &mut sessions,
            r#"{"id": 2, "app_id": "nav", "verb": "activatewindow", "args": {"drawing_name": "map", "drawing_area": "normal.full"}}"#,
        )
        .await;
        assert_eq!(to_json(&reply)["result"]["queued_behind"], 0);

        let event = sessions.get_mut("nav").unwrap().events().unwrap().try_recv().unwrap();
        assert_eq!(event.kind(), EventKind::SyncDraw);

        handle_line(&d, &mut sessions, r#"{"app_id": "nav", "verb": "disconnect"}"#).await;
        assert!(sessions.is_empty());
        assert!(d.service().drawing_names().await.is_empty());
    }

    #[tokio::test]
    async fn events_are_written_per_session() {
        let (d, _dir) = dispatcher().await;
        let mut sessions = HashMap::new();
        handle_line(&d, &mut sessions, r#"{"app_id": "nav", "verb": "requestsurface", "args": {"drawing_name": "map"}}"#)
            .await;
        handle_line(&d, &mut sessions, r#"{"app_id": "nav", "verb": "wm_subscribe", "args": {"event": "syncDraw"}}"#)
            .await;
        handle_line(
            &d,
            &mut sessions,
            r#"{"app_id": "nav", "verb": "activatewindow", "args": {"drawing_name": "map", "drawing_area": "normal.full"}}"#,
        )
        .await;

        let mut out: Vec<u8> = Vec::new();
        flush_events(&mut sessions, &mut out).await.unwrap();
        let line: Value = serde_json::from_slice(out.strip_suffix(b"\n").unwrap()).unwrap();
        assert_eq!(line["app_id"], "nav");
        assert_eq!(line["event"]["event"], "syncDraw");
        assert_eq!(line["event"]["drawing_name"], "map");
    }
}
