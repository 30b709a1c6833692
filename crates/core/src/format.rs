use crate::{extract::Extraction, types::ChunkMetadata};

/// Format seconds as MM:SS, or H:MM:SS for anything an hour or longer
pub fn format_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// Format extracted concepts as human-readable markdown
pub fn format_concepts_readable(extraction: &Extraction, metadata: Option<&ChunkMetadata>) -> String {
    let mut output = String::new();

    if let Some(meta) = metadata {
        output.push_str(&format!("# {}\n\n", meta.title));
        output.push_str(&format!(
            "**Author:** {} | **Length:** {}\n\n",
            meta.author,
            format_timestamp(meta.length)
        ));
    }

    output.push_str("## Key Concepts\n\n");
    if extraction.concepts.is_empty() {
        output.push_str("_No concepts extracted._\n");
    }
    for entry in &extraction.concepts {
        output.push_str(&format!("**{}**: {}\n\n", entry.concept, entry.definition));
    }

    let failed: Vec<String> = extraction
        .failed_groups()
        .map(|o| (o.index + 1).to_string())
        .collect();
    if !failed.is_empty() {
        output.push_str(&format!(
            "\n> {} of {} groups returned unusable output (groups {}).\n",
            failed.len(),
            extraction.outcomes.len(),
            failed.join(", ")
        ));
    }

    output.push_str(&format!(
        "\n**Estimated cost:** ${:.6} ({} input chars, {} output chars)\n",
        extraction.cost.total(),
        extraction.cost.input_chars,
        extraction.cost.output_chars
    ));

    output
}
