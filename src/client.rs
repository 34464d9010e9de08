use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::json;

use crate::analysis::{LiveAnalysis, Mode};
use crate::framing::{Frame, FrameDecoder};
use crate::image::{mime_for_path, DataUri};
use crate::report;

/// Where to send the analysis and who to send it as.
pub struct RemoteTarget {
    pub server: String,
    pub user_header: String,
    pub user: Option<String>,
}

/// Error body returned by the server before streaming starts.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Read an image file as a data URI, guessing the type from its extension.
pub fn read_image(path: &Path) -> Result<DataUri> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    DataUri::from_bytes(&bytes, mime_for_path(path))
        .with_context(|| format!("Unusable image: {}", path.display()))
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => {
            let mut text = format!("{} ({status})", err.error);
            if let Some(message) = err.message.filter(|m| !m.is_empty()) {
                text.push_str(&format!(": {message}"));
            }
            if let Some(details) = err.details {
                text.push_str(&format!(" [{details}]"));
            }
            text
        }
        Err(_) => format!("server returned {status}: {}", body.trim()),
    }
}

/// Feed decoded frames into the live analysis. Returns the first error
/// frame's message, if any; frames after it are ignored.
pub fn apply_frames(live: &mut LiveAnalysis, frames: Vec<Frame>) -> Option<String> {
    for frame in frames {
        match frame {
            Frame::Text(text) => live.push_str(&text),
            Frame::Error(message) => return Some(message),
        }
    }
    None
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("  {spinner:.green} {msg} {elapsed:.dim}") {
        pb.set_style(template);
    }
    pb.set_message("Waiting for the model...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Post one or two images to a running server and render the streamed
/// analysis. On a mid-stream failure the partial text is still shown.
pub async fn analyze_remote(
    first: &Path,
    second: Option<&Path>,
    target: &RemoteTarget,
) -> Result<()> {
    let image = read_image(first)?;
    let image2 = second.map(read_image).transpose()?;
    let mode = Mode::for_second_image(image2.is_some());

    let body = json!({
        "image": image.to_string(),
        "image2": image2.map(|i| i.to_string()),
    });

    let url = format!("{}/analyze", target.server.trim_end_matches('/'));
    let mut request = reqwest::Client::new().post(&url).json(&body);
    if let Some(user) = &target.user {
        request = request.header(target.user_header.as_str(), user.as_str());
    }

    let pb = spinner();
    let mut response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e).with_context(|| format!("Failed to reach {url}"));
        }
    };

    let status = response.status();
    if !status.is_success() {
        pb.finish_and_clear();
        let text = response.text().await.unwrap_or_default();
        bail!("{}", describe_error(status.as_u16(), &text));
    }

    let mut live = LiveAnalysis::new(mode.schema());
    let mut decoder = FrameDecoder::default();
    let mut failure = None;

    while failure.is_none() {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                failure = apply_frames(&mut live, decoder.push(&chunk));
                if let Some(header) = live.current_header() {
                    let done = live.sections().len();
                    pb.set_message(format!("Writing {}... ({done} sections)", header.title));
                }
            }
            Ok(None) => {
                failure = apply_frames(&mut live, decoder.finish());
                break;
            }
            Err(e) => failure = Some(format!("connection lost: {e}")),
        }
    }
    pb.finish_and_clear();

    print!("{}", report::render_analysis(live.text(), &mode.schema()));

    if let Some(message) = failure {
        eprintln!(
            "  {} Analysis was cut short: {message}",
            style("ERROR").red().bold()
        );
        bail!("analysis stream failed");
    }
    if target.user.is_none() {
        println!("{}", style("Not signed in; this scan was not saved.").dim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::encode_text;

    #[test]
    fn read_image_uses_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("label.png");
        std::fs::write(&path, b"fake png").unwrap();

        let image = read_image(&path).unwrap();
        assert_eq!(image.mime, "image/png");

        let other = tmp.path().join("photo.bin");
        std::fs::write(&other, b"bytes").unwrap();
        assert_eq!(read_image(&other).unwrap().mime, "image/jpeg");
    }

    #[test]
    fn read_image_rejects_empty_and_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let empty = tmp.path().join("empty.jpg");
        std::fs::write(&empty, b"").unwrap();
        assert!(read_image(&empty).is_err());
        assert!(read_image(&tmp.path().join("absent.jpg")).is_err());
    }

    #[test]
    fn describes_server_errors() {
        let body = r#"{"error":"Bad Request","message":"No image provided"}"#;
        assert_eq!(describe_error(400, body), "Bad Request (400): No image provided");

        let body = r#"{"error":"Failed to analyze image","message":"quota","details":"last model tried: x"}"#;
        assert_eq!(
            describe_error(502, body),
            "Failed to analyze image (502): quota [last model tried: x]"
        );

        assert_eq!(describe_error(500, "oops\n"), "server returned 500: oops");
    }

    #[test]
    fn frames_split_across_chunks_build_sections() {
        let wire = format!(
            "{}{}",
            encode_text("HEADLINE: Rice Cakes\nHEALTH"),
            encode_text(" SCORE: A - Plain\n")
        );
        let (a, b) = wire.as_bytes().split_at(7);

        let mut live = LiveAnalysis::new(Mode::Single.schema());
        let mut decoder = FrameDecoder::default();
        assert!(apply_frames(&mut live, decoder.push(a)).is_none());
        assert!(apply_frames(&mut live, decoder.push(b)).is_none());
        assert!(apply_frames(&mut live, decoder.finish()).is_none());

        assert_eq!(live.text(), "HEADLINE: Rice Cakes\nHEALTH SCORE: A - Plain\n");
        assert_eq!(live.sections().len(), 2);
    }

    #[test]
    fn error_frame_stops_the_stream() {
        let mut live = LiveAnalysis::new(Mode::Single.schema());
        let frames = vec![
            Frame::Text("HEADLINE: Part".into()),
            Frame::Error("upstream reset".into()),
            Frame::Text("ignored".into()),
        ];
        assert_eq!(apply_frames(&mut live, frames).as_deref(), Some("upstream reset"));
        assert_eq!(live.text(), "HEADLINE: Part");
    }
}
