use unicode_width::UnicodeWidthStr;

use crate::chunk::Chunk;
use crate::segment::{Segment, SegmentPolicy};

/// Format duration in seconds to human-readable string.
pub fn format_duration(seconds: u32) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Pad to a display width; CJK speaker labels are two columns per char.
fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - w))
    }
}

/// Segment preview for `tsd segments`.
pub fn print_segments(segments: &[Segment], policy: SegmentPolicy, interval_minutes: u32) {
    if segments.is_empty() {
        println!("No segments.");
        return;
    }

    println!(
        "{} segment{} ({}, {} min):\n",
        segments.len(),
        if segments.len() == 1 { "" } else { "s" },
        policy.as_str(),
        interval_minutes
    );

    println!(
        "  {:<4} {} {:<8} {:<8} {}",
        "#",
        pad("RANGE", 18),
        "SPAN",
        "ENTRIES",
        "SPEAKERS"
    );
    println!("  {}", "-".repeat(76));

    for (i, s) in segments.iter().enumerate() {
        let range = match policy {
            SegmentPolicy::FixedOrigin => s.dated_range(),
            SegmentPolicy::ElapsedGap => s.clock_range(),
        };
        let speakers: Vec<&str> = s.speakers.iter().map(String::as_str).collect();
        println!(
            "  {:<4} {} {:<8} {:<8} {}",
            i + 1,
            pad(&range, 18),
            format_duration(s.end_time.saturating_sub(s.start_time)),
            s.entries.len(),
            truncate(&speakers.join(", "), 34),
        );
        if let Some(first) = s.entries.first() {
            println!("       {}", truncate(&first.text.replace('\n', " "), 70));
        }
    }
    println!();
}

/// Chunk preview for `tsd chunks`.
pub fn print_chunks(chunks: &[Chunk]) {
    println!(
        "{} chunk{}:\n",
        chunks.len(),
        if chunks.len() == 1 { "" } else { "s" }
    );

    for c in chunks {
        let first = c
            .lines
            .iter()
            .find(|l| !l.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("");
        println!(
            "  [{:>3}] {:>4} lines  {}",
            c.index + 1,
            c.lines.len(),
            truncate(first, 56)
        );
    }
}
