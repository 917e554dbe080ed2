//! String-aware scanning over query text.
//!
//! Quotes (`"` and `'`) open string literals; backslash escapes the next
//! character inside them. Brackets and commas inside strings are ignored.

/// Iterator over `(byte_index, char)` pairs that lie outside string
/// literals. Quote delimiters themselves are not yielded.
pub(crate) struct Unquoted<'a> {
    chars: std::str::CharIndices<'a>,
    quote: Option<char>,
}

impl<'a> Unquoted<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            quote: None,
        }
    }
}

impl Iterator for Unquoted<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, c) = self.chars.next()?;
            match self.quote {
                Some(q) => {
                    if c == '\\' {
                        self.chars.next();
                    } else if c == q {
                        self.quote = None;
                    }
                }
                None if c == '"' || c == '\'' => self.quote = Some(c),
                None => return Some((i, c)),
            }
        }
    }
}

/// Index of the `)` that closes a call whose arguments start at `start`.
///
/// Returns `None` when the text ends first.
pub(crate) fn closing_paren(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in Unquoted::new(&text[start..]) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(start + i),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Arguments of a call starting at `start`, and the index just past the
/// closing paren (or the end of the text).
pub(crate) fn call_args(text: &str, start: usize) -> (&str, usize) {
    match closing_paren(text, start) {
        Some(end) => (&text[start..end], end + 1),
        None => (&text[start..], text.len()),
    }
}

/// Split an argument list at its first top-level comma.
pub(crate) fn split_first_arg(args: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in Unquoted::new(args) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return (&args[..i], Some(&args[i + 1..])),
            _ => {}
        }
    }
    (args, None)
}

/// Locate `.name(` outside string literals and return its arguments.
pub(crate) fn find_call<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(".{}", name);
    for (i, c) in Unquoted::new(text) {
        if c != '.' || !text[i..].starts_with(&needle) {
            continue;
        }
        let rest = text[i + needle.len()..].trim_start();
        if let Some(args) = rest.strip_prefix('(') {
            let start = text.len() - args.len();
            return Some(call_args(text, start).0);
        }
    }
    None
}

/// Number of `{` left open outside string literals.
pub(crate) fn missing_braces(text: &str) -> usize {
    let (open, close) = Unquoted::new(text).fold((0usize, 0usize), |(o, c), (_, ch)| match ch {
        '{' => (o + 1, c),
        '}' => (o, c + 1),
        _ => (o, c),
    });
    open.saturating_sub(close)
}
