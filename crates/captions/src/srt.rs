//! SRT caption parsing and formatting.

use serde::{Deserialize, Serialize};

/// One timed caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionCue {
    /// 1-based position in the parsed track.
    pub index: usize,
    pub start_seconds: f64,
    /// Always `>= start_seconds`.
    pub end_seconds: f64,
    /// Cue text; multi-line cues keep their line breaks.
    pub text: String,
}

impl CaptionCue {
    /// Whether the cue is on screen at `secs` (start inclusive, end exclusive).
    pub fn is_active(&self, secs: f64) -> bool {
        secs >= self.start_seconds && secs < self.end_seconds
    }
}

/// Parse an SRT document into cues ordered by start time.
///
/// Accepts a leading BOM, CRLF line endings, and `.` as the millisecond
/// separator. Blocks with a missing or malformed timing line, or whose end
/// precedes their start, are skipped and parsing continues with the next
/// block.
pub fn parse_srt(input: &str) -> Vec<CaptionCue> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut cues = Vec::new();
    for (block_no, block) in split_blocks(&normalized).iter().enumerate() {
        match parse_block(block) {
            Ok(cue) => cues.push(cue),
            Err(reason) => {
                tracing::debug!(block = block_no + 1, reason, "Skipping malformed caption cue");
            }
        }
    }

    cues.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }
    cues
}

/// Serialize cues as SRT, renumbering them from 1.
pub fn format_srt(cues: &[CaptionCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start_seconds),
            format_timestamp(cue.end_seconds),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// The cue on screen at `secs`, if any. Earlier cues win on overlap.
pub fn cue_at(cues: &[CaptionCue], secs: f64) -> Option<&CaptionCue> {
    cues.iter().find(|cue| cue.is_active(secs))
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(lines: &[&str]) -> Result<CaptionCue, &'static str> {
    // The timing line is either first or follows the numeric index.
    let timing_at = lines
        .iter()
        .take(2)
        .position(|line| line.contains("-->"))
        .ok_or("missing timing line")?;

    let (start, end) = lines[timing_at]
        .split_once("-->")
        .ok_or("missing timing line")?;
    let start_seconds = parse_timestamp(start).ok_or("malformed start timestamp")?;
    // Positional settings may follow the end timestamp.
    let end_token = end.split_whitespace().next().unwrap_or("");
    let end_seconds = parse_timestamp(end_token).ok_or("malformed end timestamp")?;

    if end_seconds < start_seconds {
        return Err("cue ends before it starts");
    }

    Ok(CaptionCue {
        index: 0,
        start_seconds,
        end_seconds,
        text: lines[timing_at + 1..].join("\n"),
    })
}

/// `HH:MM:SS,mmm` (or `MM:SS,mmm`) to seconds.
fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (clock, fraction) = match raw.find(|c: char| c == ',' || c == '.') {
        Some(pos) => (&raw[..pos], &raw[pos + 1..]),
        None => (raw, ""),
    };

    let parts = clock
        .split(':')
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                p.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<_>>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let millis = if fraction.is_empty() {
        0
    } else {
        if fraction.len() > 3 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u64 = fraction.parse().ok()?;
        value * 10u64.pow(3 - fraction.len() as u32)
    };

    let total_secs = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    let total_ms = total_secs.checked_mul(1000)?.checked_add(millis)?;
    Some(total_ms as f64 / 1000.0)
}

/// Seconds as `HH:MM:SS,mmm`.
fn format_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
