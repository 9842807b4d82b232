//! CSS rewriter for scoped styles.
//!
//! Rewrites a stylesheet so every compound selector is suffixed with the
//! document's scope class (`.astro-<scope>`), with the standard carve-outs:
//! `html`, `:root` and `:global(…)` contents are never scoped, `@keyframes`
//! names and keyframe selectors are left alone, and `@media`/`@supports`
//! preludes are preserved while their inner rules are scoped recursively.
//! Comments are stripped and whitespace is minified on the way through.
//!
//! This is a pragmatic tokenizer, not a full CSS grammar; behavior at exotic
//! at-rules is covered by the example scenarios only.

/// Selectors that are never suffixed with the scope class.
const NEVER_SCOPED_SELECTORS: &[&str] = &["html", ":root"];

pub fn scope_css(css: &str, scope: &str) -> String {
    let mut rewriter = Rewriter {
        src: css,
        b: css.as_bytes(),
        i: 0,
    };
    let mut out = String::with_capacity(css.len() + 64);
    rewriter.rules(&mut out, scope);
    out
}

struct Rewriter<'a> {
    src: &'a str,
    b: &'a [u8],
    i: usize,
}

impl<'a> Rewriter<'a> {
    fn rules(&mut self, out: &mut String, scope: &str) {
        loop {
            self.skip_ws_and_comments();
            if self.i >= self.b.len() || self.b[self.i] == b'}' {
                return;
            }
            let prelude = self.read_prelude();
            match self.b.get(self.i) {
                Some(&b';') => {
                    self.i += 1;
                    let text = normalize_ws(&prelude);
                    if !text.is_empty() {
                        out.push_str(&text);
                        out.push(';');
                    }
                }
                Some(&b'{') => {
                    self.i += 1;
                    let trimmed = prelude.trim();
                    if let Some(at_rule) = trimmed.strip_prefix('@') {
                        let name = at_rule
                            .split(|c: char| c.is_whitespace() || c == '(')
                            .next()
                            .unwrap_or("");
                        match name {
                            "media" | "supports" => {
                                out.push_str(&normalize_ws(trimmed));
                                out.push('{');
                                self.rules(out, scope);
                                self.expect_close();
                                out.push('}');
                            }
                            "keyframes" | "-webkit-keyframes" | "-moz-keyframes" => {
                                out.push_str(&normalize_ws(trimmed));
                                out.push('{');
                                self.keyframe_blocks(out);
                                self.expect_close();
                                out.push('}');
                            }
                            _ => {
                                out.push_str(&normalize_ws(trimmed));
                                out.push('{');
                                let body = self.read_block_body();
                                out.push_str(&minify_declarations(&body));
                                out.push('}');
                            }
                        }
                    } else {
                        out.push_str(&scope_selector_list(trimmed, scope));
                        out.push('{');
                        let body = self.read_block_body();
                        out.push_str(&minify_declarations(&body));
                        out.push('}');
                    }
                }
                _ => {
                    // trailing garbage without a block
                    let text = normalize_ws(&prelude);
                    if !text.is_empty() {
                        out.push_str(&text);
                    }
                    return;
                }
            }
        }
    }

    fn keyframe_blocks(&mut self, out: &mut String) {
        loop {
            self.skip_ws_and_comments();
            if self.i >= self.b.len() || self.b[self.i] == b'}' {
                return;
            }
            let prelude = self.read_prelude();
            if self.b.get(self.i) == Some(&b'{') {
                self.i += 1;
                out.push_str(&normalize_ws(&prelude));
                out.push('{');
                let body = self.read_block_body();
                out.push_str(&minify_declarations(&body));
                out.push('}');
            } else {
                return;
            }
        }
    }

    /// Everything up to a top-level `{`, `;` or `}` with comments stripped.
    fn read_prelude(&mut self) -> String {
        let mut prelude = String::new();
        let mut depth = 0usize;
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'{' | b';' if depth == 0 => break,
                b'}' => break,
                b'(' | b'[' => {
                    depth += 1;
                    prelude.push(self.b[self.i] as char);
                    self.i += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    prelude.push(self.b[self.i] as char);
                    self.i += 1;
                }
                b'/' if self.b.get(self.i + 1) == Some(&b'*') => {
                    self.skip_comment();
                }
                b'\'' | b'"' => {
                    let end = skip_css_string(self.b, self.i);
                    prelude.push_str(&self.src[self.i..end]);
                    self.i = end;
                }
                _ => {
                    let ch_start = self.i;
                    self.i += utf8_len(self.b[self.i]);
                    prelude.push_str(&self.src[ch_start..self.i]);
                }
            }
        }
        prelude
    }

    /// Body of a declaration block; consumes the closing `}`.
    fn read_block_body(&mut self) -> String {
        let mut body = String::new();
        let mut depth = 0usize;
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'{' => {
                    depth += 1;
                    body.push('{');
                    self.i += 1;
                }
                b'}' => {
                    if depth == 0 {
                        self.i += 1;
                        return body;
                    }
                    depth -= 1;
                    body.push('}');
                    self.i += 1;
                }
                b'/' if self.b.get(self.i + 1) == Some(&b'*') => {
                    self.skip_comment();
                }
                b'\'' | b'"' => {
                    let end = skip_css_string(self.b, self.i);
                    body.push_str(&self.src[self.i..end]);
                    self.i = end;
                }
                _ => {
                    let ch_start = self.i;
                    self.i += utf8_len(self.b[self.i]);
                    body.push_str(&self.src[ch_start..self.i]);
                }
            }
        }
        body
    }

    fn expect_close(&mut self) {
        self.skip_ws_and_comments();
        if self.b.get(self.i) == Some(&b'}') {
            self.i += 1;
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while self.i < self.b.len() && self.b[self.i].is_ascii_whitespace() {
                self.i += 1;
            }
            if self.i < self.b.len()
                && self.b[self.i] == b'/'
                && self.b.get(self.i + 1) == Some(&b'*')
            {
                self.skip_comment();
            } else {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        self.i += 2;
        while self.i + 1 < self.b.len() {
            if self.b[self.i] == b'*' && self.b[self.i + 1] == b'/' {
                self.i += 2;
                return;
            }
            self.i += 1;
        }
        self.i = self.b.len();
    }
}

fn skip_css_string(b: &[u8], start: usize) -> usize {
    let quote = b[start];
    let mut i = start + 1;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    b.len()
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

/// Collapse whitespace runs to a single space.
fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Minify `prop: value` declarations: comments and the trailing `;` are
/// dropped, whitespace collapses, spaces vanish after `,` and inside parens.
fn minify_declarations(body: &str) -> String {
    let mut decls: Vec<String> = Vec::new();
    for raw in split_top_level(body, ';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match raw.find(':') {
            Some(colon) => {
                let prop = raw[..colon].trim();
                let value = minify_value(raw[colon + 1..].trim());
                decls.push(format!("{}:{}", prop, value));
            }
            None => decls.push(normalize_ws(raw)),
        }
    }
    decls.join(";")
}

fn minify_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let after_opener = matches!(out.chars().last(), Some('(') | Some(','));
            let before_closer = matches!(c, ')' | ',');
            if !out.is_empty() && !after_opener && !before_closer {
                out.push(' ');
            }
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            out.push(c);
            for sc in chars.by_ref() {
                out.push(sc);
                if sc == c {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string: Option<char> = None;
    for (idx, c) in s.char_indices() {
        match in_string {
            Some(q) => {
                if c == q {
                    in_string = None;
                }
            }
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                c2 if c2 == sep && depth == 0 => {
                    parts.push(&s[start..idx]);
                    start = idx + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Scope every compound selector in a selector list.
fn scope_selector_list(selectors: &str, scope: &str) -> String {
    split_top_level(selectors, ',')
        .into_iter()
        .map(|sel| scope_complex_selector(sel.trim(), scope))
        .filter(|s| !s.is_empty())
        .collect::<Vec<String>>()
        .join(",")
}

fn scope_complex_selector(selector: &str, scope: &str) -> String {
    let mut out = String::new();
    let mut compound = String::new();
    let mut depth = 0usize;
    let mut pending_combinator: Option<char> = None;

    let flush = |out: &mut String, compound: &mut String, comb: &mut Option<char>| {
        if compound.is_empty() {
            return;
        }
        if !out.is_empty() {
            out.push(comb.unwrap_or(' '));
        }
        out.push_str(&scope_compound_selector(compound, scope));
        compound.clear();
        *comb = None;
    };

    for c in selector.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                compound.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                compound.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                flush(&mut out, &mut compound, &mut pending_combinator);
            }
            '>' | '+' | '~' if depth == 0 => {
                flush(&mut out, &mut compound, &mut pending_combinator);
                pending_combinator = Some(c);
            }
            _ => compound.push(c),
        }
    }
    flush(&mut out, &mut compound, &mut pending_combinator);
    out
}

fn scope_compound_selector(compound: &str, scope: &str) -> String {
    if NEVER_SCOPED_SELECTORS.contains(&compound) {
        return compound.to_string();
    }
    // :global(…) unwraps and opts out of scoping
    if let Some(inner) = compound
        .strip_prefix(":global(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return inner.trim().to_string();
    }

    let class = format!(".astro-{}", scope);

    // insert before the first pseudo so `.a:hover` scopes the subject
    let mut depth = 0usize;
    for (idx, c) in compound.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && idx > 0 => {
                return format!("{}{}{}", &compound[..idx], class, &compound[idx..]);
            }
            _ => {}
        }
    }
    format!("{}{}", compound, class)
}
