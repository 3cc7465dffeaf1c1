//! Reference tokenizer.
//!
//! Type signatures arrive as free text (`Map<String, List<Item>>`,
//! `*[]Widget`, `h: ErrorHandler`). A declared type counts as referenced only
//! when it appears as a whole identifier token, so `ErrorHandler` never drags
//! in `Error`.

use std::collections::BTreeSet;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Maximal runs of letters, digits and underscores in `text`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    tokenize_into(text, &mut tokens);
    tokens
}

/// Like [`tokenize`], accumulating into an existing set.
pub fn tokenize_into(text: &str, tokens: &mut BTreeSet<String>) {
    for token in text.split(|c: char| !is_ident_char(c)) {
        if !token.is_empty() {
            tokens.insert(token.to_string());
        }
    }
}

/// Tokens of `text` that are also in `known`.
pub fn referenced_names<'a, I>(text: &str, known: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let tokens = tokenize(text);
    known
        .into_iter()
        .filter(|name| tokens.contains(*name))
        .map(str::to_string)
        .collect()
}

/// Strip generic parameters and surrounding decoration from a type name:
/// `Pager[T]` -> `Pager`, `List<String>` -> `List`, `*Client` -> `Client`.
pub fn strip_generics(name: &str) -> &str {
    let name = name.trim().trim_start_matches(['*', '&']).trim_start();
    let end = name.find(['<', '[', '(']).unwrap_or(name.len());
    name[..end].trim()
}
