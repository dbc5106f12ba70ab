//! Incremental extraction of top-level JSON objects from an undelimited byte
//! stream.
//!
//! The N8N webhook writes objects back to back (`{..}{..}{..}`) with no
//! framing, so the only way to find object boundaries is to track brace depth
//! while skipping over string literals.

/// Remove and return the next complete top-level `{...}` object in `buffer`.
///
/// Text before the first `{` is discarded together with the object; text after
/// the closing `}` stays in the buffer for the next call. Returns `None` and
/// leaves `buffer` untouched when there is no `{` or the object is still
/// incomplete.
pub fn extract_next_object(buffer: &mut String) -> Option<String> {
    let start = buffer.find('{')?;
    let end = find_object_end(&buffer[start..])? + start;

    let object = buffer[start..=end].to_string();
    buffer.replace_range(..=end, "");
    Some(object)
}

/// Byte index of the `}` closing the object that opens at `text[0]`.
fn find_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Structural characters are all ASCII, so scanning bytes is safe for UTF-8.
    for (idx, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

/// Accumulates decoded text and hands out complete objects as they appear.
#[derive(Debug, Default)]
pub struct ObjectExtractor {
    buffer: String,
}

impl ObjectExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn next_object(&mut self) -> Option<String> {
        extract_next_object(&mut self.buffer)
    }

    /// Text that has not yet formed a complete object.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_object_leaves_partial_tail() {
        let mut buf = r#"{"type":"item","content":"A"}{"type":"it"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"type":"item","content":"A"}"#)
        );
        assert_eq!(buf, r#"{"type":"it"#);
        assert!(extract_next_object(&mut buf).is_none());
        assert_eq!(buf, r#"{"type":"it"#);
    }

    #[test]
    fn concatenated_objects_come_out_in_order() {
        let mut buf =
            r#"{"type":"item","content":"A"}{"type":"item","content":"B"}{"type":"end"}"#
                .to_string();
        let mut seen = Vec::new();
        while let Some(obj) = extract_next_object(&mut buf) {
            seen.push(obj);
        }
        assert_eq!(
            seen,
            vec![
                r#"{"type":"item","content":"A"}"#,
                r#"{"type":"item","content":"B"}"#,
                r#"{"type":"end"}"#,
            ]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let mut buf = r#"{"content":"a{b}c"} trailing"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"content":"a{b}c"}"#)
        );
        assert_eq!(buf, " trailing");

        let mut buf = r#"{"content":"}}}"}"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"content":"}}}"}"#)
        );
    }

    #[test]
    fn escaped_quote_keeps_string_mode() {
        let mut buf = r#"{"content":"say \"hi\" {"}"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"content":"say \"hi\" {"}"#)
        );

        let mut buf = r#"{"content":"path\\"}"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"content":"path\\"}"#)
        );
    }

    #[test]
    fn nested_objects_are_one_unit() {
        let mut buf = r#"{"a":{"b":{"c":1}}}{"d":2}"#.to_string();
        assert_eq!(
            extract_next_object(&mut buf).as_deref(),
            Some(r#"{"a":{"b":{"c":1}}}"#)
        );
        assert_eq!(extract_next_object(&mut buf).as_deref(), Some(r#"{"d":2}"#));
    }

    #[test]
    fn leading_noise_is_discarded() {
        let mut buf = "\n  garbage {\"x\":1}".to_string();
        assert_eq!(extract_next_object(&mut buf).as_deref(), Some(r#"{"x":1}"#));
        assert!(buf.is_empty());
    }

    #[test]
    fn no_brace_means_nothing_available() {
        let mut buf = "   \n".to_string();
        assert!(extract_next_object(&mut buf).is_none());
        assert_eq!(buf, "   \n");
    }

    #[test]
    fn split_reads_produce_same_objects() {
        let stream = r#"{"type":"item","content":"héllo {x}"}{"type":"item","content":"\"q\""}{"type":"end"}"#;
        let chars: Vec<char> = stream.chars().collect();

        for split in 1..chars.len() {
            let mut extractor = ObjectExtractor::new();
            let mut seen = Vec::new();
            for piece in chars.chunks(split) {
                extractor.push(&piece.iter().collect::<String>());
                while let Some(obj) = extractor.next_object() {
                    seen.push(obj);
                }
            }
            assert_eq!(seen.len(), 3, "split size {split}");
            assert_eq!(seen[2], r#"{"type":"end"}"#);
            assert!(extractor.pending().is_empty());
        }
    }
}
