//! Cheap lexical checks deciding whether a query earns an LLM rewrite.

/// Pronouns that leave a query ambiguous without conversational context.
const AMBIGUOUS_PRONOUNS: &[&str] = &[
    "it", "this", "that", "these", "those", "they", "them", "he", "she",
];

/// Returns `true` when the query looks noisy enough that a cleaned-up
/// rewrite is worth an LLM call: very short, pronoun-anchored, or visibly
/// mistyped.
pub fn needs_rewrite(query: &str) -> bool {
    let trimmed = query.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();

    if words.len() < 4 {
        return true;
    }

    let has_ambiguous_pronoun = words.iter().any(|w| {
        let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        AMBIGUOUS_PRONOUNS.contains(&w.as_str())
    });
    if has_ambiguous_pronoun {
        return true;
    }

    has_typo_noise(trimmed)
}

/// Three identical letters in a row, or a high non-alphanumeric density,
/// both read as keyboard noise.
fn has_typo_noise(text: &str) -> bool {
    let mut run_char = ' ';
    let mut run_len = 0;
    for c in text.chars() {
        if c.is_alphabetic() && c == run_char {
            run_len += 1;
            if run_len >= 3 {
                return true;
            }
        } else {
            run_char = c;
            run_len = 1;
        }
    }

    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return false;
    }
    let junk = text
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_alphanumeric() && !matches!(c, '?' | '\'' | '-'))
        .count();
    junk * 4 > total
}
