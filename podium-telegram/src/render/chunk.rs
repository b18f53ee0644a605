//! Splitting of long replies for Telegram's 4096-character message limit.
//!
//! Report lists and digests grow with the schedule, so a large conference
//! does not fit into one message. Text is split at line boundaries where
//! possible and never inside a UTF-8 character.

/// Telegram maximum message length.
pub const TELEGRAM_MSG_LIMIT: usize = 4096;

/// Split `text` into chunks of at most [`TELEGRAM_MSG_LIMIT`] bytes.
///
/// Always returns at least one chunk.
pub fn chunk_text(text: &str) -> Vec<String> {
    chunk_with_limit(text, TELEGRAM_MSG_LIMIT)
}

fn chunk_with_limit(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while remaining.len() > limit {
        let slice_len = floor_char_boundary(remaining, limit).max(first_char_len(remaining));
        let split_at = find_split_point(&remaining[..slice_len]);
        let chunk = remaining[..split_at].trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = remaining[split_at..].trim_start_matches('\n');
    }
    if !remaining.trim().is_empty() {
        chunks.push(remaining.to_string());
    }
    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}

/// Round `idx` down to the nearest valid UTF-8 character boundary in `s`.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn first_char_len(s: &str) -> usize {
    s.chars().next().map_or(0, char::len_utf8)
}

/// Best byte offset to split `slice` at.
///
/// Priority: `\n\n` > `\n` > ` ` > hard split.
fn find_split_point(slice: &str) -> usize {
    if let Some(pos) = slice.rfind("\n\n").filter(|p| *p > 0) {
        return pos + 2;
    }
    if let Some(pos) = slice.rfind('\n').filter(|p| *p > 0) {
        return pos + 1;
    }
    if let Some(pos) = slice.rfind(' ').filter(|p| *p > 0) {
        return pos + 1;
    }
    slice.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Reports"), vec!["Reports".to_string()]);
        assert_eq!(chunk_text(""), vec![String::new()]);
    }

    #[test]
    fn test_long_list_splits_between_lines() {
        let lines: Vec<String> = (1..=400)
            .map(|i| format!("{i}. 01.06 10:00 (30 min) Talk number {i}"))
            .collect();
        let text = lines.join("\n");
        assert!(text.len() > TELEGRAM_MSG_LIMIT);

        let chunks = chunk_text(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= TELEGRAM_MSG_LIMIT);
            assert!(chunk.lines().all(|line| lines.iter().any(|l| l == line)));
        }
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_prefers_paragraph_then_space() {
        assert_eq!(
            chunk_with_limit("aaaa\n\nbb\ncc", 9),
            vec!["aaaa".to_string(), "bb\ncc".to_string()]
        );
        assert_eq!(
            chunk_with_limit("aaa bbb ccc", 8),
            vec!["aaa bbb".to_string(), "ccc".to_string()]
        );
    }

    #[test]
    fn test_hard_split_respects_char_boundaries() {
        let text = "доклад".repeat(10);
        let chunks = chunk_with_limit(&text, 7);
        for chunk in &chunks {
            assert!(chunk.len() <= 7);
        }
        assert_eq!(chunks.concat(), text);
    }
}
