//! Metric path sanitization for line-oriented wire protocols.
//!
//! Both functions are idempotent: applying them to already-clean input is a
//! no-op, so paths can be sanitized again at the sink boundary without
//! drifting.

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`, collapses
/// runs of dots into one, and trims leading/trailing dots.
///
/// Empty segments never survive, so the result is a valid dotted path
/// whenever the input contained at least one legal character.
pub fn sanitize_path(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dot = true; // suppress leading dots
    for c in input.chars() {
        if c == '.' {
            if !last_was_dot {
                out.push('.');
                last_was_dot = true;
            }
            continue;
        }
        let mapped = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        out.push(mapped);
        last_was_dot = false;
    }
    while out.ends_with('.') {
        out.pop();
    }
    out
}

/// Rewrites characters that are legal in a path but conventionally
/// substituted on Graphite wires.
pub fn substitute_characters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '%' => out.push_str("Pct"),
            ' ' | '\t' => out.push('_'),
            ',' => out.push('.'),
            '"' | '\'' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Rewrites a peer address (`host.name:port`) into a path-safe segment:
/// dots become dashes, colons become underscores.
pub fn sanitize_peer_name(name: &str) -> String {
    name.replace('.', "-").replace(':', "_")
}
