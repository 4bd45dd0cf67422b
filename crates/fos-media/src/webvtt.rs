//! WebVTT
//!
//! Cue file parsing for `<track>` sources and cue payload markup.

use crate::tracks::TextTrackCue;

/// WebVTT parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VttError {
    #[error("Missing WEBVTT signature")]
    MissingSignature,

    #[error("Invalid timestamp '{0}' on line {1}")]
    InvalidTimestamp(String, usize),

    #[error("Invalid cue timing line {0}")]
    InvalidTiming(usize),
}

/// Node in a parsed cue payload
#[derive(Debug, Clone, PartialEq)]
pub enum CueNode {
    Text(String),
    /// `<b>`, `<i>`, `<u>`, `<c.class>`, `<v Speaker>`, `<lang en>`, `<ruby>`...
    Element {
        tag: String,
        annotation: Option<String>,
        children: Vec<CueNode>,
    },
    Timestamp(f64),
}

/// Parsed cue payload (the `getCueAsHTML()` document fragment)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueFragment {
    pub nodes: Vec<CueNode>,
}

impl CueFragment {
    /// Concatenated text of every text node, markup dropped
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn collect_text(nodes: &[CueNode], out: &mut String) {
    for node in nodes {
        match node {
            CueNode::Text(text) => out.push_str(text),
            CueNode::Element { children, .. } => collect_text(children, out),
            CueNode::Timestamp(_) => {}
        }
    }
}

/// Parse a cue payload into a fragment tree.
///
/// Unbalanced end tags are ignored and unclosed elements are closed at
/// the end of the payload, the same recovery the HTML cue parser does.
pub fn parse_cue_text(payload: &str) -> CueFragment {
    // Stack of open elements; index 0 is the root.
    let mut stack: Vec<(String, Option<String>, Vec<CueNode>)> =
        vec![(String::new(), None, Vec::new())];
    let mut rest = payload;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                let Some(end) = rest.find('>') else {
                    push_text(&mut stack, rest);
                    break;
                };
                let tag = &rest[1..end];
                rest = &rest[end + 1..];
                handle_tag(&mut stack, tag);
            }
            Some(pos) => {
                push_text(&mut stack, &rest[..pos]);
                rest = &rest[pos..];
            }
            None => {
                push_text(&mut stack, rest);
                break;
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    let (_, _, nodes) = stack.pop().unwrap_or_default();
    CueFragment { nodes }
}

fn push_text(stack: &mut [(String, Option<String>, Vec<CueNode>)], text: &str) {
    if text.is_empty() {
        return;
    }
    let text = decode_entities(text);
    if let Some((_, _, children)) = stack.last_mut() {
        if let Some(CueNode::Text(prev)) = children.last_mut() {
            prev.push_str(&text);
        } else {
            children.push(CueNode::Text(text));
        }
    }
}

fn handle_tag(stack: &mut Vec<(String, Option<String>, Vec<CueNode>)>, tag: &str) {
    if let Some(name) = tag.strip_prefix('/') {
        let name = name.trim();
        if let Some(pos) = stack.iter().rposition(|(open, _, _)| open == name) {
            if pos > 0 {
                while stack.len() > pos {
                    close_top(stack);
                }
            }
        }
        return;
    }

    if let Some(ts) = parse_timestamp(tag.trim()) {
        if let Some((_, _, children)) = stack.last_mut() {
            children.push(CueNode::Timestamp(ts));
        }
        return;
    }

    let (head, annotation) = match tag.split_once(char::is_whitespace) {
        Some((head, annotation)) => (head, Some(annotation.trim().to_string())),
        None => (tag, None),
    };
    let name = head.split('.').next().unwrap_or_default().to_string();
    if name.is_empty() {
        return;
    }
    stack.push((name, annotation, Vec::new()));
}

fn close_top(stack: &mut Vec<(String, Option<String>, Vec<CueNode>)>) {
    if let Some((tag, annotation, children)) = stack.pop() {
        if let Some((_, _, parent)) = stack.last_mut() {
            parent.push(CueNode::Element { tag, annotation, children });
        }
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&lrm;", "\u{200e}")
        .replace("&rlm;", "\u{200f}")
        .replace("&amp;", "&")
}

/// Parse `hh:mm:ss.ttt` or `mm:ss.ttt` into seconds
pub fn parse_timestamp(ts: &str) -> Option<f64> {
    let (clock, millis) = ts.split_once('.')?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return None,
    };
    if minutes.len() != 2 || seconds.len() != 2 {
        return None;
    }
    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;
    if minutes > 59 || seconds > 59 {
        return None;
    }
    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Parse a WebVTT file into cues.
///
/// Cue blocks with broken timing lines are skipped, as browsers do;
/// only a missing signature fails the whole file.
pub fn parse_webvtt(content: &str) -> Result<Vec<TextTrackCue>, VttError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = content.lines().enumerate().peekable();

    let (_, signature) = lines.next().ok_or(VttError::MissingSignature)?;
    let valid_signature = signature == "WEBVTT"
        || signature.starts_with("WEBVTT ")
        || signature.starts_with("WEBVTT\t");
    if !valid_signature {
        return Err(VttError::MissingSignature);
    }

    // Header block
    while let Some((_, line)) = lines.peek() {
        if line.trim().is_empty() {
            break;
        }
        lines.next();
    }

    let mut cues = Vec::new();
    loop {
        while matches!(lines.peek(), Some((_, line)) if line.trim().is_empty()) {
            lines.next();
        }
        let Some((line_no, first)) = lines.next() else {
            break;
        };

        if first.starts_with("NOTE") || first == "STYLE" || first == "REGION" {
            skip_block(&mut lines);
            continue;
        }

        let (id, timing_line, timing_no) = if first.contains("-->") {
            (String::new(), first, line_no)
        } else {
            match lines.next() {
                Some((n, line)) if line.contains("-->") => (first.trim().to_string(), line, n),
                _ => {
                    tracing::debug!(line = line_no + 1, "skipping WebVTT block without timing");
                    skip_block(&mut lines);
                    continue;
                }
            }
        };

        let (start, end) = match parse_timing(timing_line, timing_no + 1) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!(error = %e, "skipping WebVTT cue");
                skip_block(&mut lines);
                continue;
            }
        };

        let mut payload = Vec::new();
        while let Some((_, line)) = lines.peek() {
            if line.trim().is_empty() {
                break;
            }
            payload.push(*line);
            lines.next();
        }
        let text = payload.join("\n");

        let mut cue = TextTrackCue::new(start, end, &text).with_fragment(parse_cue_text(&text));
        cue.id = id;
        cues.push(cue);
    }

    Ok(cues)
}

fn parse_timing(line: &str, line_no: usize) -> Result<(f64, f64), VttError> {
    let (start, rest) = line.split_once("-->").ok_or(VttError::InvalidTiming(line_no))?;
    let start = start.trim();
    let end = rest.split_whitespace().next().ok_or(VttError::InvalidTiming(line_no))?;
    let start_secs = parse_timestamp(start)
        .ok_or_else(|| VttError::InvalidTimestamp(start.to_string(), line_no))?;
    let end_secs = parse_timestamp(end)
        .ok_or_else(|| VttError::InvalidTimestamp(end.to_string(), line_no))?;
    Ok((start_secs, end_secs))
}

fn skip_block<'a, I>(lines: &mut std::iter::Peekable<I>)
where
    I: Iterator<Item = (usize, &'a str)>,
{
    while let Some((_, line)) = lines.peek() {
        if line.trim().is_empty() {
            break;
        }
        lines.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nHello <b>there</b>\n\nNOTE a comment\nspanning lines\n\n00:01:00.500 --> 00:01:02.000 align:start\n<v Bob>Hi</v>\nsecond line\n";

    #[test]
    fn test_parse_webvtt() {
        let cues = parse_webvtt(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);

        assert_eq!(cues[0].id, "1");
        assert_eq!(cues[0].start_time, 1.0);
        assert_eq!(cues[0].end_time, 4.0);
        assert_eq!(cues[0].text, "Hello <b>there</b>");

        assert_eq!(cues[1].start_time, 60.5);
        assert_eq!(cues[1].fragment.as_ref().unwrap().text_content(), "Hi\nsecond line");
    }

    #[test]
    fn test_missing_signature() {
        assert_eq!(parse_webvtt("1\n00:00:01,000 --> 00:00:02,000\nx"), Err(VttError::MissingSignature));
        assert_eq!(parse_webvtt(""), Err(VttError::MissingSignature));
    }

    #[test]
    fn test_bad_timing_skips_cue() {
        let cues = parse_webvtt("WEBVTT\n\n00:00:xx --> 00:00:02.000\nbad\n\n00:00:03.000 --> 00:00:04.000\ngood\n").unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "good");
    }

    #[test]
    fn test_bom_and_crlf() {
        let cues = parse_webvtt("\u{feff}WEBVTT\r\n\r\n00:00.000 --> 00:01.000\r\nx\r\n").unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].end_time, 1.0);
    }

    #[test]
    fn test_cue_text_markup() {
        let fragment = parse_cue_text("<c.yellow.big>a</c> &amp; <i>b<u>c</i> d");
        assert_eq!(fragment.text_content(), "a & bc d");
        match &fragment.nodes[0] {
            CueNode::Element { tag, .. } => assert_eq!(tag, "c"),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_cue_text_inline_timestamp() {
        let fragment = parse_cue_text("one <00:00:01.500>two");
        assert_eq!(fragment.text_content(), "one two");
        assert!(fragment.nodes.contains(&CueNode::Timestamp(1.5)));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("01:02:03.500"), Some(3723.5));
        assert_eq!(parse_timestamp("02:03.500"), Some(123.5));
        assert_eq!(parse_timestamp("02:03,500"), None);
        assert_eq!(parse_timestamp("2:03.500"), None);
    }
}
