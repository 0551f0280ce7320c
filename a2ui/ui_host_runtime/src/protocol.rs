use crate::action::UserAction;
use crate::resolver::ResolvedNode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::sync::mpsc::Receiver;

pub const DEFAULT_INBOUND_FRAME_CAP: usize = 1_048_576;
pub const OUTBOUND_FRAME_CAP: usize = 4 * 1_048_576;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t", rename_all_fields = "camelCase")]
pub enum HostEnvelope {
    #[serde(rename = "messages")]
    Messages { messages: Vec<Value> },

    #[serde(rename = "set_data")]
    SetData {
        #[serde(default)]
        surface_id: Option<String>,
        #[serde(default)]
        context_path: Option<String>,
        path: String,
        value: Value,
    },

    #[serde(rename = "action")]
    Action {
        #[serde(default)]
        surface_id: Option<String>,
        component_id: String,
        #[serde(default)]
        context_path: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all_fields = "camelCase")]
pub enum UiEnvelope {
    #[serde(rename = "ready")]
    Ready { capabilities: Value },

    #[serde(rename = "render")]
    Render {
        surface_id: String,
        version: u64,
        tree: ResolvedNode,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        diagnostics: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        outline: Option<String>,
    },

    #[serde(rename = "deleted")]
    Deleted { surface_id: String },

    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        surface_id: Option<String>,
        code: String,
        message: String,
    },

    #[serde(rename = "user_action")]
    UserAction { action: UserAction },
}

pub fn ready_envelope() -> UiEnvelope {
    UiEnvelope::Ready {
        capabilities: serde_json::json!({
            "messages": ["beginRendering", "surfaceUpdate", "dataModelUpdate", "deleteSurface"],
            "transport": "stdio-packet-4"
        }),
    }
}

pub fn error_envelope(
    surface_id: Option<&str>,
    code: impl Into<String>,
    message: impl Into<String>,
) -> UiEnvelope {
    UiEnvelope::Error {
        surface_id: surface_id.map(str::to_string),
        code: code.into(),
        message: message.into(),
    }
}

pub fn writer_loop(writer: &mut impl Write, rx: Receiver<UiEnvelope>) -> io::Result<()> {
    for envelope in rx {
        write_frame(writer, &encode(&envelope)?, OUTBOUND_FRAME_CAP)?;
        writer.flush()?;
    }

    Ok(())
}

/// Reads frames until EOF. Frames that fail to decode are handed to the
/// callback as errors; framing errors end the loop.
pub fn reader_loop<F>(reader: &mut impl Read, max_payload: usize, mut on_envelope: F) -> io::Result<()>
where
    F: FnMut(io::Result<HostEnvelope>),
{
    loop {
        match read_frame(reader, max_payload) {
            Ok(payload) => on_envelope(decode(&payload)),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

pub fn encode<T: Serialize>(envelope: &T) -> io::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> io::Result<T> {
    serde_json::from_slice(payload).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn read_frame(reader: &mut impl Read, max_payload: usize) -> io::Result<Vec<u8>> {
    let mut header = [0_u8; 4];
    reader.read_exact(&mut header)?;

    let len = frame_len(u32::from_be_bytes(header) as usize, max_payload)?;
    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

pub fn write_frame(writer: &mut impl Write, payload: &[u8], max_payload: usize) -> io::Result<()> {
    let len = frame_len(payload.len(), max_payload)?;
    let header = u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds u32"))?
        .to_be_bytes();

    writer.write_all(&header)?;
    writer.write_all(payload)
}

fn frame_len(len: usize, max_payload: usize) -> io::Result<usize> {
    if len > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds cap of {max_payload}"),
        ));
    }
    Ok(len)
}
