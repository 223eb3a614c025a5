//! System prompts for query analysis, plus list-output parsing.

/// Rewrites a noisy user query into one clean retrieval query.
pub const REWRITE_SYSTEM_PROMPT: &str = "You clean up search queries. Rewrite the user's query \
into a single clear, self-contained question. Fix spelling, expand ambiguous pronouns, and keep \
every constraint the user stated. Reply with the rewritten query only, no preamble.";

/// Produces a hypothetical answer passage whose embedding is used as an
/// additional dense probe (HyDE).
pub const HYDE_SYSTEM_PROMPT: &str = "Write a short factual passage (3-5 sentences) that would \
plausibly appear in a document answering the user's question. Do not address the user, do not \
hedge, and do not mention that the passage is hypothetical. Reply with the passage only.";

/// Produces recall-expanding paraphrases, one per line.
pub const REFORMULATE_SYSTEM_PROMPT: &str = "Paraphrase the user's search query to improve \
retrieval recall. Use different vocabulary while preserving the exact information need. Reply \
with one paraphrase per line and nothing else.";

/// Splits a compound question into atomic sub-questions, one per line.
pub const DECOMPOSE_SYSTEM_PROMPT: &str = "If the user's question contains several distinct \
information needs, split it into minimal self-contained sub-questions, one per line. If it is \
already atomic, reply with the question unchanged. Reply with the questions only.";

/// Parses a line-per-item LLM reply into at most `max_items` entries.
///
/// Tolerates the usual list decoration (bullets, `1.`/`1)` numbering) and
/// drops blank lines.
pub fn parse_list_output(output: &str, max_items: usize) -> Vec<String> {
    output
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(max_items)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." / "12)" style numbering
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim();
        }
    }
    line
}
