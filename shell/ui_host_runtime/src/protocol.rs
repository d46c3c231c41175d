use crate::descriptor::Params;
use crate::events::{ExitReason, Severity};
use crate::load::FetchResult;
use crate::session::RenderedScreen;
use crate::trust::TrustLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::sync::mpsc::Receiver;
use tracing::warn;

pub const SHELL_TO_HOST_CAP: usize = 1_048_576;
pub const HOST_TO_SHELL_CAP: usize = 4_194_304;

/// Error code sent in place of an envelope that does not fit in a frame.
pub const FRAME_TOO_LARGE: &str = "frame_too_large";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t")]
pub enum ShellEnvelope {
    #[serde(rename = "ready")]
    Ready { sid: String, capabilities: Value },

    #[serde(rename = "render")]
    Render {
        sid: String,
        rev: u64,
        screen: RenderedScreen,
    },

    #[serde(rename = "toast")]
    Toast {
        sid: String,
        message: String,
        severity: Severity,
    },

    #[serde(rename = "action")]
    Action {
        sid: String,
        id: u64,
        name: String,
        params: Params,
    },

    #[serde(rename = "submit")]
    Submit { sid: String, id: u64, params: Params },

    #[serde(rename = "exit")]
    Exit { sid: String, reason: ExitReason },

    #[serde(rename = "error")]
    Error {
        sid: String,
        code: String,
        message: String,
    },
}

impl ShellEnvelope {
    /// Host actions may be dropped under backpressure; everything else must
    /// reach the host.
    pub fn is_droppable(&self) -> bool {
        matches!(self, ShellEnvelope::Action { .. })
    }

    pub fn sid(&self) -> &str {
        match self {
            ShellEnvelope::Ready { sid, .. }
            | ShellEnvelope::Render { sid, .. }
            | ShellEnvelope::Toast { sid, .. }
            | ShellEnvelope::Action { sid, .. }
            | ShellEnvelope::Submit { sid, .. }
            | ShellEnvelope::Exit { sid, .. }
            | ShellEnvelope::Error { sid, .. } => sid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ShellEnvelope::Ready { .. } => "ready",
            ShellEnvelope::Render { .. } => "render",
            ShellEnvelope::Toast { .. } => "toast",
            ShellEnvelope::Action { .. } => "action",
            ShellEnvelope::Submit { .. } => "submit",
            ShellEnvelope::Exit { .. } => "exit",
            ShellEnvelope::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t")]
pub enum HostEnvelope {
    #[serde(rename = "load")]
    Load { sid: String, result: FetchResult },

    #[serde(rename = "intent")]
    Intent {
        sid: String,
        name: String,
        #[serde(default)]
        params: Params,
    },

    #[serde(rename = "trust")]
    Trust { sid: String, level: TrustLevel },

    #[serde(rename = "close")]
    Close { sid: String },
}

impl HostEnvelope {
    pub fn sid(&self) -> &str {
        match self {
            HostEnvelope::Load { sid, .. }
            | HostEnvelope::Intent { sid, .. }
            | HostEnvelope::Trust { sid, .. }
            | HostEnvelope::Close { sid } => sid,
        }
    }
}

pub fn ready_envelope(sid: String) -> ShellEnvelope {
    ShellEnvelope::Ready {
        sid,
        capabilities: serde_json::json!({
            "sdui": true,
            "miniapps": true,
            "transport": "stdio-packet-4"
        }),
    }
}

pub fn error_envelope(
    sid: String,
    code: impl Into<String>,
    message: impl Into<String>,
) -> ShellEnvelope {
    ShellEnvelope::Error {
        sid,
        code: code.into(),
        message: message.into(),
    }
}

pub fn encoded_len(envelope: &ShellEnvelope) -> io::Result<usize> {
    encode_shell_envelope(envelope).map(|payload| payload.len())
}

/// Encodes `envelope`, or an error envelope naming it when the encoding does
/// not fit in `max_payload` bytes.
pub fn encode_within_cap(envelope: &ShellEnvelope, max_payload: usize) -> io::Result<Vec<u8>> {
    let payload = encode_shell_envelope(envelope)?;
    if payload.len() <= max_payload {
        return Ok(payload);
    }

    warn!(
        envelope = envelope.kind(),
        size = payload.len(),
        cap = max_payload,
        "outbound envelope exceeds frame cap; reporting error instead"
    );
    encode_shell_envelope(&error_envelope(
        envelope.sid().to_string(),
        FRAME_TOO_LARGE,
        format!(
            "{} envelope of {} bytes exceeds {} byte frame cap",
            envelope.kind(),
            payload.len(),
            max_payload
        ),
    ))
}

pub fn writer_loop(mut writer: impl Write, rx: Receiver<ShellEnvelope>) -> io::Result<()> {
    for envelope in rx {
        let payload = encode_within_cap(&envelope, SHELL_TO_HOST_CAP)?;
        write_frame(&mut writer, &payload, SHELL_TO_HOST_CAP)?;
        writer.flush()?;
    }

    Ok(())
}

/// Reads frames until EOF. Frames that are not a known envelope are logged
/// and skipped; framing errors end the loop.
pub fn reader_loop<F>(mut reader: impl Read, mut on_envelope: F) -> io::Result<()>
where
    F: FnMut(HostEnvelope),
{
    loop {
        match read_frame(&mut reader, HOST_TO_SHELL_CAP) {
            Ok(payload) => match decode_host_envelope(&payload) {
                Ok(envelope) => on_envelope(envelope),
                Err(err) => warn!(error = %err, "skipping undecodable host envelope"),
            },
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn encode_shell_envelope(envelope: &ShellEnvelope) -> io::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(json_error)
}

fn decode_host_envelope(payload: &[u8]) -> io::Result<HostEnvelope> {
    serde_json::from_slice(payload).map_err(json_error)
}

fn read_frame(reader: &mut impl Read, max_payload: usize) -> io::Result<Vec<u8>> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} > {max_payload}"),
        ));
    }

    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_frame(writer: &mut impl Write, payload: &[u8], max_payload: usize) -> io::Result<()> {
    if payload.len() > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} > {}", payload.len(), max_payload),
        ));
    }

    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds u32"))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

fn json_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
