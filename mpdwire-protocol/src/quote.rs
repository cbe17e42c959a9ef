//! Argument quoting.
//!
//! Every argument is sent double-quoted. Inside the quotes a backslash,
//! a double quote and a single quote are each preceded by a backslash.
//! Single quotes do not strictly need escaping in double-quoted mode, but
//! they are escaped anyway and command construction relies on it.

use crate::error::ProtocolError;

/// Quotes a single argument.
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '\\' | '"' | '\'') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Quotes each argument and joins them with single spaces.
pub fn quote_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| quote(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reverses [`quote`].
pub fn unquote(quoted: &str) -> Result<String, ProtocolError> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| ProtocolError::UnterminatedQuote(quoted.to_string()))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(ProtocolError::UnterminatedQuote(quoted.to_string())),
            },
            // An unescaped quote would have closed the string early.
            '"' => return Err(ProtocolError::UnterminatedQuote(quoted.to_string())),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Splits a command line into words, honoring double-quoted arguments.
///
/// Bare words end at whitespace; quoted words may contain anything and use
/// the same escapes as [`quote`].
pub fn split_args(line: &str) -> Result<Vec<String>, ProtocolError> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(&first) = chars.peek() else {
            break;
        };

        let mut word = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => word.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    c => word.push(c),
                }
            }
            if !closed {
                return Err(ProtocolError::UnterminatedQuote(line.to_string()));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                word.push(c);
            }
        }
        words.push(word);
    }

    Ok(words)
}
