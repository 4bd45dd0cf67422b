//! Subtitle Conversion
//!
//! Turns an uploaded subtitle file into a WebVTT blob the `<track>`
//! element can load. SubRip is rewritten cue by cue; WebVTT input is
//! validated and passed through.

use std::sync::Arc;

use fos_media::{parse_webvtt, Blob, File, VttError};

/// Conversion error
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Subtitle file {0} is empty")]
    Empty(String),

    #[error("Subtitle file {0} is not valid UTF-8")]
    Encoding(String),

    #[error("Malformed subtitle at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Invalid WebVTT: {0}")]
    Vtt(#[from] VttError),

    #[error("No cues found in {0}")]
    NoCues(String),
}

/// Subtitle converter
pub trait SubtitleConverter: Send + Sync {
    fn convert(&self, file: &File) -> Result<Blob, ConversionError>;
}

/// SubRip (.srt) to WebVTT converter
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtToWebVtt;

impl SubtitleConverter for SrtToWebVtt {
    fn convert(&self, file: &File) -> Result<Blob, ConversionError> {
        let bytes = file.as_blob().as_bytes();
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ConversionError::Encoding(file.name().to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(ConversionError::Empty(file.name().to_string()));
        }

        let vtt = if text.starts_with("WEBVTT") {
            let cues = parse_webvtt(text)?;
            if cues.is_empty() {
                return Err(ConversionError::NoCues(file.name().to_string()));
            }
            text.to_string()
        } else {
            srt_to_vtt(text, file.name())?
        };

        Ok(Blob::from_text(&vtt, "text/vtt"))
    }
}

/// Rewrite a SubRip document as WebVTT
pub fn srt_to_vtt(srt: &str, name: &str) -> Result<String, ConversionError> {
    let normalized = srt.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.lines().collect();

    let mut out = String::from("WEBVTT\n\n");
    let mut cues = 0;
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        // Optional numeric counter
        if !lines[i].contains("-->") {
            if lines[i].trim().parse::<u64>().is_err() {
                return Err(ConversionError::Malformed {
                    line: i + 1,
                    reason: format!("expected cue number or timing, found '{}'", lines[i].trim()),
                });
            }
            i += 1;
        }

        let Some(timing) = lines.get(i) else {
            return Err(ConversionError::Malformed {
                line: i + 1,
                reason: "missing timing line".into(),
            });
        };
        let (start, end) = parse_srt_timing(timing).ok_or_else(|| ConversionError::Malformed {
            line: i + 1,
            reason: format!("invalid timing '{}'", timing.trim()),
        })?;
        i += 1;

        out.push_str(&format_timestamp(start));
        out.push_str(" --> ");
        out.push_str(&format_timestamp(end));
        out.push('\n');
        while i < lines.len() && !lines[i].trim().is_empty() {
            out.push_str(lines[i]);
            out.push('\n');
            i += 1;
        }
        out.push('\n');
        cues += 1;
    }

    if cues == 0 {
        return Err(ConversionError::NoCues(name.to_string()));
    }
    Ok(out)
}

/// `00:00:01,000 --> 00:00:04,000` with optional trailing coordinates
fn parse_srt_timing(line: &str) -> Option<(u64, u64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    let start = parse_srt_timestamp(start.trim())?;
    let end = parse_srt_timestamp(end)?;
    (end >= start).then_some((start, end))
}

/// `h:mm:ss,mmm` in milliseconds; `.` accepted as the separator
fn parse_srt_timestamp(ts: &str) -> Option<u64> {
    let (clock, millis) = ts.split_once([',', '.'])?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes > 59 || seconds > 59 {
        return None;
    }
    if millis.is_empty() || millis.len() > 3 {
        return None;
    }
    // "5" means 500 ms
    let millis: u64 = format!("{:0<3}", millis).parse().ok()?;
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Async front for a [`SubtitleConverter`]; conversion runs on the
/// blocking pool so the page loop stays responsive.
#[derive(Clone)]
pub struct ConverterAdapter {
    inner: Arc<dyn SubtitleConverter>,
}

impl ConverterAdapter {
    pub fn new(inner: Arc<dyn SubtitleConverter>) -> Self {
        Self { inner }
    }

    pub async fn convert(&self, file: File) -> Result<Blob, ConversionError> {
        let inner = Arc::clone(&self.inner);
        smol::unblock(move || inner.convert(&file)).await
    }
}

impl Default for ConverterAdapter {
    fn default() -> Self {
        Self::new(Arc::new(SrtToWebVtt))
    }
}

impl std::fmt::Debug for ConverterAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterAdapter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\r\n00:00:01,000 --> 00:00:04,250\r\nHello\r\nworld\r\n\r\n2\r\n00:01:02,5 --> 00:01:03,000 X1:10 X2:20\r\n<i>Bye</i>\r\n";

    #[test]
    fn test_srt_to_vtt() {
        let vtt = srt_to_vtt(SRT, "movie.srt").unwrap();
        assert_eq!(
            vtt,
            "WEBVTT\n\n00:00:01.000 --> 00:00:04.250\nHello\nworld\n\n00:01:02.500 --> 00:01:03.000\n<i>Bye</i>\n\n"
        );

        let cues = parse_webvtt(&vtt).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello\nworld");
    }

    #[test]
    fn test_converter_produces_vtt_blob() {
        let blob = SrtToWebVtt.convert(&File::text_file("movie.srt", SRT)).unwrap();
        assert_eq!(blob.mime_type(), "text/vtt");
        assert!(blob.text().starts_with("WEBVTT"));
    }

    #[test]
    fn test_webvtt_passthrough() {
        let source = "WEBVTT\n\n00:00.000 --> 00:02.000\nhi\n";
        let blob = SrtToWebVtt.convert(&File::text_file("a.vtt", source)).unwrap();
        assert_eq!(blob.text(), source);
    }

    #[test]
    fn test_malformed_srt() {
        let err = SrtToWebVtt
            .convert(&File::text_file("bad.srt", "1\nnot a timing\nhello\n"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { line: 2, .. }));

        let err = SrtToWebVtt
            .convert(&File::text_file("junk.srt", "this is not subtitles"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_empty_and_binary() {
        assert!(matches!(
            SrtToWebVtt.convert(&File::text_file("e.srt", "  \n")),
            Err(ConversionError::Empty(_))
        ));
        let binary = File::new(Blob::new(vec![0xff, 0xfe, 0x00], ""), "x.srt");
        assert!(matches!(SrtToWebVtt.convert(&binary), Err(ConversionError::Encoding(_))));
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(parse_srt_timestamp("01:02:03,004"), Some(3_723_004));
        assert_eq!(parse_srt_timestamp("0:00:01.5"), Some(1500));
        assert_eq!(parse_srt_timestamp("00:61:00,000"), None);
        assert_eq!(format_timestamp(3_723_004), "01:02:03.004");
        assert_eq!(parse_srt_timing("00:00:05,000 --> 00:00:01,000"), None);
    }

    #[test]
    fn test_adapter_is_async() {
        let adapter = ConverterAdapter::default();
        let blob = smol::block_on(adapter.convert(File::text_file("movie.srt", SRT))).unwrap();
        assert!(blob.text().contains("00:00:01.000 --> 00:00:04.250"));
    }
}
