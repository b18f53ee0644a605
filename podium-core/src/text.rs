//! Text helpers shared by the wizard codec and the chat front ends.

/// Separator between fields of an encoded wizard state.
pub const FIELD_SEPARATOR: char = ';';

const ESCAPE: char = '\\';

/// Truncate a string to a maximum number of Unicode characters.
///
/// Longer strings keep their first `max_chars - 3` characters followed by
/// `...`. With `max_chars <= 3` the result is only dots.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let head: String = s.chars().take(max_chars - 3).collect();
    format!("{head}...")
}

/// Join fields with [`FIELD_SEPARATOR`], escaping separators and backslashes
/// inside each field so that [`split_fields`] recovers them exactly.
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        for c in field.as_ref().chars() {
            if c == FIELD_SEPARATOR || c == ESCAPE {
                out.push(ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [`join_fields`].
///
/// Returns `None` when the input ends with a dangling escape.
pub fn split_fields(s: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => current.push(chars.next()?),
            FIELD_SEPARATOR => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_longer_string_adds_ellipsis() {
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 2), "..");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("доклад про Rust", 9), "доклад...");
    }

    #[test]
    fn test_split_plain_fields() {
        assert_eq!(
            split_fields("evaluateReport;https://conf/a;Ann - Intro").unwrap(),
            vec!["evaluateReport", "https://conf/a", "Ann - Intro"]
        );
        assert_eq!(split_fields("menu").unwrap(), vec!["menu"]);
    }

    #[test]
    fn test_separator_inside_field_survives() {
        let fields = ["evaluateReport", "https://conf/a?x=1;y=2", r"C:\talks; part 2"];
        let joined = join_fields(fields);
        assert_eq!(joined, r"evaluateReport;https://conf/a?x=1\;y=2;C:\\talks\; part 2");
        assert_eq!(split_fields(&joined).unwrap(), fields);
    }

    #[test]
    fn test_dangling_escape_is_rejected() {
        assert!(split_fields(r"menu\").is_none());
    }

    #[test]
    fn test_empty_trailing_field_kept() {
        assert_eq!(split_fields("a;").unwrap(), vec!["a", ""]);
    }
}
