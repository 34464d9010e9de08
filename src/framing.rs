//! Line-prefixed token framing for the analysis response stream.
//!
//! Every fragment travels as one line `<code>:<json>\n`. Code `0` carries a
//! text fragment (a JSON string), code `3` an error message. Clients strip the
//! prefix, JSON-decode the rest, and concatenate text fragments in order.

use serde_json::Value;

pub const TEXT_CODE: &str = "0";
pub const ERROR_CODE: &str = "3";

pub fn encode_text(fragment: &str) -> String {
    encode(TEXT_CODE, fragment)
}

pub fn encode_error(message: &str) -> String {
    encode(ERROR_CODE, message)
}

fn encode(code: &str, value: &str) -> String {
    // Serializing a &str can't fail.
    let json = serde_json::to_string(value).unwrap_or_default();
    format!("{code}:{json}\n")
}

/// Splits a byte stream into complete lines, holding back the trailing
/// partial line until more bytes (or the end of the stream) arrive.
///
/// Works on bytes so a multi-byte character split across chunks is only
/// decoded once its line is complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Error(String),
}

/// Client-side decoder for the framed response body.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
}

impl FrameDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| decode_line(line))
            .collect()
    }

    pub fn finish(&mut self) -> Vec<Frame> {
        self.lines
            .finish()
            .and_then(|line| decode_line(&line))
            .into_iter()
            .collect()
    }
}

/// Decode one frame line. Unknown codes and malformed JSON are skipped.
pub fn decode_line(line: &str) -> Option<Frame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (code, json) = line.split_once(':')?;
    let value: Value = serde_json::from_str(json.trim()).ok()?;

    match code {
        TEXT_CODE => {
            let text = fragment_text(&value)?;
            (!text.is_empty()).then_some(Frame::Text(text))
        }
        ERROR_CODE => Some(Frame::Error(fragment_text(&value).unwrap_or_default())),
        _ => None,
    }
}

/// Text parts arrive as bare strings; some producers wrap them in an object.
fn fragment_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["textDelta", "text", "content"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        _ => None,
    }
}
