//! Lightweight scanner for the frontmatter script block.
//!
//! This is not a JavaScript parser. It recognizes exactly the top-level
//! constructs the pipeline needs: static `import` statements (with their
//! bindings and optional `assert` clause) and the hoisted `getStaticPaths`
//! export. Strings, template literals, comments, and nesting are tracked so
//! keywords inside them never match.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub enum ImportBinding {
    Default(String),
    Named { imported: String, local: String },
    Namespace(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    /// Range of the statement itself within the frontmatter text
    pub span: Range<usize>,
    /// Statement plus immediately-preceding comment lines
    pub full_span: Range<usize>,
    pub specifier: String,
    /// Raw text of the `assert { … }` clause, braces included
    pub assertion: Option<String>,
    pub bindings: Vec<ImportBinding>,
}

impl ImportStatement {
    /// Local binding that resolves `root` (the identifier before any `.`),
    /// together with the export name it maps to.
    pub fn resolve(&self, root: &str, member: Option<&str>) -> Option<String> {
        for binding in &self.bindings {
            match binding {
                ImportBinding::Default(local) if local == root => {
                    return Some("default".to_string());
                }
                ImportBinding::Named { imported, local } if local == root => {
                    return Some(imported.clone());
                }
                ImportBinding::Namespace(local) if local == root => {
                    return Some(member.unwrap_or("default").to_string());
                }
                _ => {}
            }
        }
        None
    }
}

/// Scan all top-level static imports.
pub fn scan_imports(src: &str) -> Vec<ImportStatement> {
    let mut imports = Vec::new();
    let mut walker = Walker::new(src);
    while let Some(at) = walker.next_keyword(&["import"]) {
        if let Some(stmt) = parse_import(src, at) {
            walker.jump_to(stmt.span.end);
            imports.push(stmt);
        }
    }
    imports
}

/// Locate a top-level `export const getStaticPaths = …` or
/// `export async function getStaticPaths …` and return its range.
pub fn find_get_static_paths(src: &str) -> Option<Range<usize>> {
    let mut walker = Walker::new(src);
    while let Some(at) = walker.next_keyword(&["export"]) {
        if let Some(range) = parse_get_static_paths(src, at) {
            return Some(range);
        }
    }
    None
}

// -------------------------------------------------------------------------
// keyword walking

struct Walker<'a> {
    src: &'a str,
    b: &'a [u8],
    i: usize,
    depth: usize,
}

impl<'a> Walker<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            b: src.as_bytes(),
            i: 0,
            depth: 0,
        }
    }

    fn jump_to(&mut self, at: usize) {
        self.i = at;
    }

    /// Advance to the next top-level occurrence of one of the keywords, at a
    /// word boundary and not preceded by `.`.
    fn next_keyword(&mut self, keywords: &[&str]) -> Option<usize> {
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'/' if self.b.get(self.i + 1) == Some(&b'/') => {
                    self.i = skip_line_comment(self.b, self.i);
                }
                b'/' if self.b.get(self.i + 1) == Some(&b'*') => {
                    self.i = skip_block_comment(self.b, self.i);
                }
                b'\'' | b'"' => {
                    self.i = skip_string(self.b, self.i);
                }
                b'`' => {
                    self.i = skip_template(self.b, self.i);
                }
                b'{' | b'(' | b'[' => {
                    self.depth += 1;
                    self.i += 1;
                }
                b'}' | b')' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.i += 1;
                }
                c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                    let start = self.i;
                    let end = scan_ident(self.b, self.i);
                    self.i = end;
                    if self.depth == 0 {
                        let word = &self.src[start..end];
                        let preceded_by_dot = start > 0 && {
                            let mut k = start - 1;
                            while k > 0 && self.b[k].is_ascii_whitespace() {
                                k -= 1;
                            }
                            self.b[k] == b'.'
                        };
                        if !preceded_by_dot && keywords.contains(&word) {
                            return Some(start);
                        }
                    }
                }
                _ => self.i += 1,
            }
        }
        None
    }
}

fn scan_ident(b: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < b.len() && (b[i].is_ascii_alphanumeric() || b[i] == b'_' || b[i] == b'$') {
        i += 1;
    }
    i
}

fn skip_ws(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn skip_line_comment(b: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < b.len() && b[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(b: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < b.len() {
        if b[i] == b'*' && b[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    b.len()
}

fn skip_string(b: &[u8], start: usize) -> usize {
    let quote = b[start];
    let mut i = start + 1;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    b.len()
}

fn skip_template(b: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut hole_depth = 0usize;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            b'$' if b.get(i + 1) == Some(&b'{') => {
                hole_depth += 1;
                i += 2;
            }
            b'}' if hole_depth > 0 => {
                hole_depth -= 1;
                i += 1;
            }
            b'`' if hole_depth == 0 => return i + 1,
            _ => i += 1,
        }
    }
    b.len()
}

// -------------------------------------------------------------------------
// imports

fn parse_import(src: &str, start: usize) -> Option<ImportStatement> {
    let b = src.as_bytes();
    let mut i = skip_ws(b, start + "import".len());
    if i >= b.len() {
        return None;
    }
    // `import(…)` and `import.meta` are expressions, not statements
    if b[i] == b'(' || b[i] == b'.' {
        return None;
    }

    let mut bindings = Vec::new();
    if b[i] != b'\'' && b[i] != b'"' {
        loop {
            i = skip_ws(b, i);
            match b.get(i)? {
                b'*' => {
                    i = skip_ws(b, i + 1);
                    let kw_end = scan_ident(b, i);
                    if &src[i..kw_end] != "as" {
                        return None;
                    }
                    i = skip_ws(b, kw_end);
                    let end = scan_ident(b, i);
                    bindings.push(ImportBinding::Namespace(src[i..end].to_string()));
                    i = end;
                }
                b'{' => {
                    i += 1;
                    loop {
                        i = skip_ws(b, i);
                        match b.get(i)? {
                            b'}' => {
                                i += 1;
                                break;
                            }
                            b',' => i += 1,
                            _ => {
                                let end = scan_ident(b, i);
                                if end == i {
                                    return None;
                                }
                                let imported = src[i..end].to_string();
                                i = skip_ws(b, end);
                                let mut local = imported.clone();
                                let kw_end = scan_ident(b, i);
                                if &src[i..kw_end] == "as" {
                                    i = skip_ws(b, kw_end);
                                    let local_end = scan_ident(b, i);
                                    local = src[i..local_end].to_string();
                                    i = local_end;
                                }
                                bindings.push(ImportBinding::Named { imported, local });
                            }
                        }
                    }
                }
                c if c.is_ascii_alphabetic() || *c == b'_' || *c == b'$' => {
                    let end = scan_ident(b, i);
                    bindings.push(ImportBinding::Default(src[i..end].to_string()));
                    i = end;
                }
                _ => return None,
            }
            i = skip_ws(b, i);
            if b.get(i) == Some(&b',') {
                i += 1;
                continue;
            }
            break;
        }
        let kw_end = scan_ident(b, i);
        if &src[i..kw_end] != "from" {
            return None;
        }
        i = skip_ws(b, kw_end);
    }

    // specifier
    if i >= b.len() || (b[i] != b'\'' && b[i] != b'"') {
        return None;
    }
    let spec_end = skip_string(b, i);
    if spec_end <= i + 1 {
        return None;
    }
    let specifier = src[i + 1..spec_end - 1].to_string();
    i = spec_end;

    // optional `assert { … }`
    let mut assertion = None;
    let after_spec = skip_ws(b, i);
    let kw_end = scan_ident(b, after_spec);
    if &src[after_spec..kw_end] == "assert" {
        let brace = skip_ws(b, kw_end);
        if b.get(brace) == Some(&b'{') {
            let mut depth = 0usize;
            let mut j = brace;
            while j < b.len() {
                match b[j] {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    b'\'' | b'"' => {
                        j = skip_string(b, j) - 1;
                    }
                    _ => {}
                }
                j += 1;
            }
            if j < b.len() {
                assertion = Some(src[brace..=j].to_string());
                i = j + 1;
            }
        }
    }

    let after = skip_ws_same_line(b, i);
    if b.get(after) == Some(&b';') {
        i = after + 1;
    }

    let full_start = attach_leading_comments(src, start);
    Some(ImportStatement {
        span: start..i,
        full_span: full_start..i,
        specifier,
        assertion,
        bindings,
    })
}

fn skip_ws_same_line(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && b[i].is_ascii_whitespace() && b[i] != b'\n' {
        i += 1;
    }
    i
}

/// Walk back over contiguous comment lines directly above a statement so they
/// travel with it when the statement is re-homed.
fn attach_leading_comments(src: &str, start: usize) -> usize {
    let mut attach = start;
    let mut line_start = src[..start].rfind('\n').map(|n| n + 1).unwrap_or(0);
    // only whitespace may sit between the line start and the statement
    if !src[line_start..start].trim().is_empty() {
        return start;
    }
    loop {
        if line_start == 0 {
            break;
        }
        let prev_line_start = src[..line_start - 1].rfind('\n').map(|n| n + 1).unwrap_or(0);
        let prev_line = src[prev_line_start..line_start - 1].trim();
        if prev_line.starts_with("//") || (prev_line.starts_with("/*") && prev_line.ends_with("*/"))
        {
            attach = prev_line_start;
            line_start = prev_line_start;
        } else {
            break;
        }
    }
    attach
}

// -------------------------------------------------------------------------
// getStaticPaths

fn parse_get_static_paths(src: &str, export_at: usize) -> Option<Range<usize>> {
    let b = src.as_bytes();
    let mut i = skip_ws(b, export_at + "export".len());

    let mut kw_end = scan_ident(b, i);
    if &src[i..kw_end] == "async" {
        i = skip_ws(b, kw_end);
        kw_end = scan_ident(b, i);
    }

    match &src[i..kw_end] {
        "function" => {
            i = skip_ws(b, kw_end);
            let name_end = scan_ident(b, i);
            if &src[i..name_end] != "getStaticPaths" {
                return None;
            }
            // skip the parameter list so destructured params cannot be
            // mistaken for the body
            let params_end = skip_parens(b, name_end)?;
            let body_end = skip_to_matching_brace(b, params_end)?;
            let after = skip_ws_same_line(b, body_end);
            let end = if b.get(after) == Some(&b';') {
                after + 1
            } else {
                body_end
            };
            Some(export_at..end)
        }
        "const" => {
            i = skip_ws(b, kw_end);
            let name_end = scan_ident(b, i);
            if &src[i..name_end] != "getStaticPaths" {
                return None;
            }
            i = skip_ws(b, name_end);
            if b.get(i) != Some(&b'=') {
                return None;
            }
            let end = scan_initializer(b, i + 1)?;
            Some(export_at..end)
        }
        _ => None,
    }
}

/// Skip past a `( … )` group at or after `from`.
fn skip_parens(b: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < b.len() && b[i] != b'(' {
        i += 1;
    }
    let mut depth = 0usize;
    while i < b.len() {
        match b[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'\'' | b'"' => {
                i = skip_string(b, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Find the end of the first `{ … }` block at or after `from`; returns the
/// index just past the closing brace.
fn skip_to_matching_brace(b: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < b.len() && b[i] != b'{' {
        i += 1;
    }
    if i >= b.len() {
        return None;
    }
    balanced_end(b, i)
}

/// End of an `= …` initializer: a depth-0 `;` (consumed), or a newline once
/// the last significant token closed a bracket group.
fn scan_initializer(b: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    let mut depth = 0usize;
    let mut closed_group = false;
    while i < b.len() {
        match b[i] {
            b'{' | b'(' | b'[' => {
                depth += 1;
                closed_group = false;
                i += 1;
            }
            b'}' | b')' | b']' => {
                depth = depth.saturating_sub(1);
                closed_group = depth == 0;
                i += 1;
            }
            b';' if depth == 0 => return Some(i + 1),
            b'\n' if depth == 0 && closed_group => return Some(i),
            b'\'' | b'"' => i = skip_string(b, i),
            b'`' => i = skip_template(b, i),
            b'/' if b.get(i + 1) == Some(&b'/') => i = skip_line_comment(b, i),
            b'/' if b.get(i + 1) == Some(&b'*') => i = skip_block_comment(b, i),
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                closed_group = false;
                i += 1;
            }
        }
    }
    Some(b.len())
}

fn balanced_end(b: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < b.len() {
        match b[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'\'' | b'"' => {
                i = skip_string(b, i);
                continue;
            }
            b'`' => {
                i = skip_template(b, i);
                continue;
            }
            b'/' if b.get(i + 1) == Some(&b'/') => {
                i = skip_line_comment(b, i);
                continue;
            }
            b'/' if b.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(b, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}
