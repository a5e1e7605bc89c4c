// Tool call detection for streamed model output
//
// Recognizes a `{"tool": ..., "arguments": {...}}` object either inside a
// json fenced block (```json, ```JSON, ``` json) or as a bare JSON object
// starting a line, and decides
// how much of the stream is safe to show while a call may still be forming.

use crate::tools::types::ToolCall;
use serde_json::Value;
use tracing::debug;

const FENCE: &str = "```";
const FENCE_TAG: &str = "json";

/// Find the first tool call in `text`
///
/// Fenced blocks are tried first, in order, then bare `{` lines. Malformed
/// candidates are skipped, never reported as errors.
pub fn detect_tool_call(text: &str) -> Option<ToolCall> {
    fenced_tool_call(text).or_else(|| bare_tool_call(text))
}

fn fenced_tool_call(text: &str) -> Option<ToolCall> {
    let mut rest = text;
    while let Some((_, body_start)) = find_fence_open(rest) {
        let body_len = rest[body_start..].find(FENCE)?;

        if let Some(call) = parse_call(rest[body_start..body_start + body_len].trim()) {
            return Some(call);
        }
        rest = &rest[body_start + body_len + FENCE.len()..];
    }
    None
}

/// First json fence opener in `text`, as (start, body start)
///
/// The tag is case-insensitive and may be separated from the backticks by
/// spaces or tabs.
fn find_fence_open(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(i) = text[from..].find(FENCE) {
        let start = from + i;
        let after = start + FENCE.len();
        let tag = text[after..].trim_start_matches([' ', '\t']);
        if tag
            .get(..FENCE_TAG.len())
            .is_some_and(|t| t.eq_ignore_ascii_case(FENCE_TAG))
        {
            let tag_start = text.len() - tag.len();
            return Some((start, tag_start + FENCE_TAG.len()));
        }
        from = after;
    }
    None
}

fn bare_tool_call(text: &str) -> Option<ToolCall> {
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('{') {
            let open = line_start + (line.len() - trimmed.len());
            if let Some(close) = balanced_end(text, open) {
                let candidate = &text[open..=close];
                if candidate.contains("\"tool\"") {
                    if let Some(call) = parse_call(candidate) {
                        return Some(call);
                    }
                }
            }
        }
        line_start += line.len();
    }
    None
}

fn parse_call(candidate: &str) -> Option<ToolCall> {
    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring malformed tool call candidate: {}", e);
            return None;
        }
    };

    let tool = value.get("tool")?.as_str()?.trim();
    if tool.is_empty() {
        return None;
    }
    let arguments = value.get("arguments")?.as_object()?.clone();

    Some(ToolCall {
        tool: tool.to_string(),
        arguments,
    })
}

/// Byte index of the `}` closing the object opened at `open`
///
/// Braces inside JSON strings are ignored.
fn balanced_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Length of the longest tail of `line` that could grow into a json fence opener
fn partial_fence_suffix(line: &str) -> usize {
    line.match_indices('`')
        .map(|(i, _)| &line[i..])
        .find(|tail| could_open_fence(tail))
        .map_or(0, str::len)
}

fn could_open_fence(tail: &str) -> bool {
    match tail.strip_prefix(FENCE) {
        Some(rest) => {
            let tag = rest.trim_start_matches([' ', '\t']);
            tag.len() < FENCE_TAG.len()
                && FENCE_TAG
                    .get(..tag.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tag))
        }
        None => tail.chars().all(|c| c == '`'),
    }
}

/// First byte index at or after `start` that could still belong to a tool call
///
/// Assumes `text` holds no complete call. Everything before the returned
/// index is plain text: an open json fence, a partial fence marker, an
/// unbalanced `{` line or a blank partial line is held until it resolves.
fn release_boundary(text: &str, start: usize) -> usize {
    let mut pos = start;

    while pos < text.len() {
        let at_line_start = pos == 0 || text.as_bytes()[pos - 1] == b'\n';
        let line_end = text[pos..].find('\n').map(|i| pos + i + 1);
        let line = &text[pos..line_end.unwrap_or(text.len())];

        let trimmed = line.trim_start();
        if at_line_start && trimmed.starts_with('{') {
            let open = pos + (line.len() - trimmed.len());
            match balanced_end(text, open) {
                Some(close) => {
                    pos = close + 1;
                    continue;
                }
                None => return pos,
            }
        }

        if let Some((offset, body_offset)) = find_fence_open(line) {
            let body_start = pos + body_offset;
            match text[body_start..].find(FENCE) {
                Some(len) => {
                    pos = body_start + len + FENCE.len();
                    continue;
                }
                None => return pos + offset,
            }
        }

        match line_end {
            Some(end) => pos = end,
            None => {
                if at_line_start && line.trim().is_empty() {
                    return pos;
                }
                return pos + line.len() - partial_fence_suffix(line);
            }
        }
    }
    pos
}

/// Per-turn incremental detector
///
/// Accumulates the turn's text, flags the first tool call and releases only
/// text that cannot be part of one. Once flagged, nothing more is released.
#[derive(Debug, Default)]
pub struct StreamingToolCallDetector {
    buffer: String,
    forwarded: usize,
    detected: Option<ToolCall>,
}

impl StreamingToolCallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns the text now safe to forward to a live consumer
    pub fn push(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        if self.detected.is_some() {
            return String::new();
        }

        if let Some(call) = detect_tool_call(&self.buffer) {
            debug!(tool = %call.tool, "Tool call detected in stream");
            self.detected = Some(call);
            return String::new();
        }

        let boundary = release_boundary(&self.buffer, self.forwarded);
        let released = self.buffer[self.forwarded..boundary].to_string();
        self.forwarded = boundary;
        released
    }

    /// End of stream: release whatever is still held, unless a call was flagged
    pub fn finish(&mut self) -> String {
        if self.detected.is_some() {
            return String::new();
        }
        let released = self.buffer[self.forwarded..].to_string();
        self.forwarded = self.buffer.len();
        released
    }

    pub fn is_flagged(&self) -> bool {
        self.detected.is_some()
    }

    /// Everything received this turn, forwarded or not
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Text released to the consumer so far
    pub fn forwarded_text(&self) -> &str {
        &self.buffer[..self.forwarded]
    }

    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.detected.as_ref()
    }

    pub fn into_tool_call(self) -> Option<ToolCall> {
        self.detected
    }
}
