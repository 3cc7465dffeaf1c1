//! Helpers shared by adapters when normalizing loosely-typed payloads.

/// Split on `sep` at bracket depth zero: `"A, B[K, V]"` -> `["A", "B[K, V]"]`.
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' | ']' | ')' | '}' => depth -= 1,
            _ => {}
        }
        if ch == sep && depth <= 0 {
            let part = current.trim();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }
    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// Drop pointer/slice decoration: `*[]Foo` -> `Foo`.
pub fn strip_decoration(s: &str) -> &str {
    let mut s = s.trim();
    loop {
        let next = s
            .strip_prefix('*')
            .or_else(|| s.strip_prefix("[]"))
            .or_else(|| s.strip_prefix('&'))
            .unwrap_or(s);
        if next.len() == s.len() {
            return s;
        }
        s = next.trim_start();
    }
}

/// Last dotted segment: `typing.Protocol` -> `Protocol`.
pub fn simple_name(s: &str) -> &str {
    s.rsplit('.').next().unwrap_or(s)
}

/// Empty strings become `None`.
pub fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Deprecation marker from a flag plus optional message.
pub fn deprecation(flag: bool, message: Option<String>) -> Option<String> {
    match (flag, non_empty(message)) {
        (_, Some(msg)) => Some(msg),
        (true, None) => Some(String::new()),
        (false, None) => None,
    }
}

/// Tools only emit entry-point flags when they know the package's public
/// entry points. A package without a single flag falls back to inference.
pub fn entry_flag(flag: bool, package_has_flags: bool) -> Option<bool> {
    package_has_flags.then_some(flag)
}
