//! Cleanup of raw model output before JSON parsing.
//!
//! Models are asked not to wrap their answer in Markdown code fences but do it
//! anyway. [`strip_code_fences`] removes exactly:
//!
//! - surrounding whitespace,
//! - a leading "```" together with its language tag: the rest of that line
//!   (`json`, `json-ld`, `json:concepts`) when the line holds no JSON, or
//!   else the ASCII alphanumerics right after the fence (`` ```json{...}``` ``),
//! - a trailing "```",
//!
//! repeating until none of them is left. The result is a fixed point, so the
//! function is idempotent. Fences in the middle of the text are left alone.

const FENCE: &str = "```";

pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    loop {
        let before = text.len();

        if let Some(rest) = text.strip_prefix(FENCE) {
            text = match rest.split_once('\n') {
                Some((tag, body)) if is_tag_line(tag) => body,
                _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
            }
            .trim_start();
        }
        if let Some(rest) = text.strip_suffix(FENCE) {
            text = rest.trim_end();
        }

        if text.len() == before {
            return text;
        }
    }
}

fn is_tag_line(line: &str) -> bool {
    !line.contains(['{', '[', '"'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"A\": \"def1\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"A\": \"def1\"}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let raw = "  \n```\n{\"A\": \"def1\"}\n```\n\n";
        assert_eq!(strip_code_fences(raw), "{\"A\": \"def1\"}");
    }

    #[test]
    fn strips_single_line_fence() {
        assert_eq!(strip_code_fences("```json{\"A\": \"x\"}```"), "{\"A\": \"x\"}");
    }

    #[test]
    fn strips_tags_with_punctuation() {
        for tag in ["json-ld", "json:concepts", "JSON (concepts)", "json "] {
            let raw = format!("```{tag}\n{{\"A\": \"x\"}}\n```");
            let stripped = strip_code_fences(&raw);
            assert_eq!(stripped, "{\"A\": \"x\"}", "tag: {tag:?}");
            assert!(crate::parse::parse_concepts(stripped).is_ok());
        }
    }

    #[test]
    fn json_on_the_fence_line_is_kept() {
        let raw = "```json{\"A\": \"x\",\n\"B\": \"y\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"A\": \"x\",\n\"B\": \"y\"}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences(" {\"A\": \"x\"} \n"), "{\"A\": \"x\"}");
    }

    #[test]
    fn inner_fences_survive() {
        let raw = "{\"Markdown\": \"use ``` to open a block\"}";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn stripping_is_idempotent() {
        let inputs = [
            "```json\n{\"A\": \"def1\"}\n```",
            "```json-ld\n{\"A\": \"def1\"}\n```",
            "{\"A\": \"def1\"}",
            "``````json\n\n{}\n``````",
            "```",
            "",
            "not json at all",
        ];
        for raw in inputs {
            let once = strip_code_fences(raw);
            assert_eq!(strip_code_fences(once), once, "input: {raw:?}");
        }
    }
}
