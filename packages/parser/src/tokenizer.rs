use crate::ast::{
    is_raw_text_element, is_rcdata_element, is_void_element, Attribute, AttributeKind, Span,
};
use crate::error::{ParseError, ParseResult};

/// Tokens for the component-file language.
///
/// Every token carries the byte range of source it covers, and the ranges of
/// a full token stream tile the source exactly: concatenating the covered
/// slices reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// `<!DOCTYPE html>`; `name` is lowercased, `known` is false for
    /// unrecognized declarations
    Doctype {
        name: String,
        known: bool,
        span: Span,
    },
    /// `<!-- text -->` with the body preserved verbatim
    Comment { text: &'src str, span: Span },
    Text { text: &'src str, span: Span },
    StartTag {
        name: &'src str,
        attributes: Vec<Attribute>,
        self_closing: bool,
        span: Span,
    },
    EndTag { name: &'src str, span: Span },
    /// Opening `---` fence
    FrontmatterStart { span: Span },
    /// Closing `---` fence
    FrontmatterEnd { span: Span },
    /// Opening `{` of an embedded expression
    ExpressionStart { span: Span },
    /// Matching `}` of an embedded expression
    ExpressionEnd { span: Span },
}

impl<'src> Token<'src> {
    pub fn span(&self) -> Span {
        match self {
            Token::Doctype { span, .. }
            | Token::Comment { span, .. }
            | Token::Text { span, .. }
            | Token::StartTag { span, .. }
            | Token::EndTag { span, .. }
            | Token::FrontmatterStart { span }
            | Token::FrontmatterEnd { span }
            | Token::ExpressionStart { span }
            | Token::ExpressionEnd { span } => *span,
        }
    }
}

enum ExprAction {
    /// Emit the JS text scanned so far, ending at this offset
    EmitText(usize),
    /// The matching `}` sits at this offset
    Close(usize),
    /// An embedded tag starts at the current position
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Delim {
    /// An open `{` awaiting its `}`
    Brace,
    /// An open template literal awaiting its backtick
    Template,
}

#[derive(Debug)]
enum Ctx {
    /// Inside a raw-text element; exits only on the exact matching end tag.
    /// `rcdata` elements (`title`, `textarea`) still recognize `{`.
    Raw { tag: String, rcdata: bool },
    /// Inside a brace expression. `stack` is the persistent JS delimiter
    /// context (brace depth, template literals); `elements` tracks HTML
    /// elements opened inside the expression so JS scanning resumes when the
    /// subtree closes.
    Expr {
        open: usize,
        stack: Vec<Delim>,
        elements: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrontmatterState {
    /// Nothing but whitespace seen so far; an opening fence is still possible
    Eligible,
    /// Between the fences
    Open { fence: usize },
    Done,
}

/// Pull-driven tokenizer over a UTF-8 source buffer.
///
/// `next_token` returns `Ok(None)` at end of input (the success signal) and
/// a fatal [`ParseError`] for unterminated constructs. The tokenizer never
/// copies text out of the buffer; tokens borrow slices addressed by byte
/// offset.
pub struct Tokenizer<'src> {
    source: &'src str,
    pos: usize,
    ctx: Vec<Ctx>,
    frontmatter: FrontmatterState,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            ctx: Vec::new(),
            frontmatter: FrontmatterState::Eligible,
        }
    }

    pub fn next_token(&mut self) -> ParseResult<Option<Token<'src>>> {
        if self.pos >= self.source.len() {
            return self.finish();
        }
        match self.ctx.last() {
            Some(Ctx::Raw { .. }) => self.scan_raw(),
            Some(Ctx::Expr { elements, .. }) if elements.is_empty() => self.scan_expression(),
            _ => {
                if let FrontmatterState::Open { .. } = self.frontmatter {
                    self.scan_frontmatter_body()
                } else {
                    self.scan_data()
                }
            }
        }
    }

    fn finish(&mut self) -> ParseResult<Option<Token<'src>>> {
        // Raw-text elements left open at EOF are tolerated; the tree builder
        // closes them. Unbalanced expressions are fatal.
        while matches!(self.ctx.last(), Some(Ctx::Raw { .. })) {
            self.ctx.pop();
        }
        if let FrontmatterState::Open { fence } = self.frontmatter {
            return Err(ParseError::UnterminatedFrontmatter {
                span: Span::new(fence, fence + 3),
            });
        }
        if let Some(Ctx::Expr { open, .. }) = self.ctx.last() {
            return Err(ParseError::UnbalancedBraces {
                span: Span::new(*open, *open + 1),
            });
        }
        Ok(None)
    }

    fn bytes(&self) -> &'src [u8] {
        self.source.as_bytes()
    }

    fn text_token(&mut self, start: usize, end: usize) -> ParseResult<Option<Token<'src>>> {
        self.pos = end;
        Ok(Some(Token::Text {
            text: &self.source[start..end],
            span: Span::new(start, end),
        }))
    }

    // ---------------------------------------------------------------------
    // Data state

    fn scan_data(&mut self) -> ParseResult<Option<Token<'src>>> {
        if self.ctx.is_empty() {
            if let Some(token) = self.check_frontmatter_open()? {
                return Ok(Some(token));
            }
        }

        let b = self.bytes();
        let c = b[self.pos];
        if c == b'<' && self.tag_ahead(self.pos) {
            return self.scan_tag();
        }
        if c == b'{' {
            return self.open_expression();
        }

        let start = self.pos;
        let mut i = self.pos + 1;
        while i < b.len() {
            let c = b[i];
            if c == b'{' || (c == b'<' && self.tag_ahead(i)) {
                break;
            }
            i += 1;
        }
        self.text_token(start, i)
    }

    /// In data position, `<` opens a tag only when what follows could be one.
    fn tag_ahead(&self, at: usize) -> bool {
        match self.bytes().get(at + 1) {
            Some(c) => c.is_ascii_alphabetic() || *c == b'!' || *c == b'/' || *c == b'>',
            None => false,
        }
    }

    fn open_expression(&mut self) -> ParseResult<Option<Token<'src>>> {
        let at = self.pos;
        self.ctx.push(Ctx::Expr {
            open: at,
            stack: vec![Delim::Brace],
            elements: Vec::new(),
        });
        self.pos = at + 1;
        Ok(Some(Token::ExpressionStart {
            span: Span::new(at, at + 1),
        }))
    }

    // ---------------------------------------------------------------------
    // Frontmatter

    fn check_frontmatter_open(&mut self) -> ParseResult<Option<Token<'src>>> {
        if self.frontmatter != FrontmatterState::Eligible {
            return Ok(None);
        }
        let b = self.bytes();
        let mut ws_end = self.pos;
        while ws_end < b.len() && b[ws_end].is_ascii_whitespace() {
            ws_end += 1;
        }
        let at_line_start = ws_end == 0 || b[ws_end - 1] == b'\n';
        if at_line_start && self.source[ws_end..].starts_with("---") {
            if ws_end > self.pos {
                // leading whitespace stays its own token; eligibility survives
                return self.text_token(self.pos, ws_end);
            }
            let fence = self.pos;
            self.frontmatter = FrontmatterState::Open { fence };
            self.pos = fence + 3;
            return Ok(Some(Token::FrontmatterStart {
                span: Span::new(fence, fence + 3),
            }));
        }
        self.frontmatter = FrontmatterState::Done;
        Ok(None)
    }

    /// Scan the opaque frontmatter body. Template literals, quoted strings
    /// and comments are tracked so a `---` inside them does not close the
    /// fence; the closing fence must sit at the start of a line.
    fn scan_frontmatter_body(&mut self) -> ParseResult<Option<Token<'src>>> {
        let fence = match self.frontmatter {
            FrontmatterState::Open { fence } => fence,
            _ => unreachable!("frontmatter body scanned outside the fences"),
        };
        let b = self.bytes();

        if self.at_frontmatter_close(self.pos) {
            let at = self.pos;
            self.frontmatter = FrontmatterState::Done;
            self.pos = at + 3;
            return Ok(Some(Token::FrontmatterEnd {
                span: Span::new(at, at + 3),
            }));
        }

        let start = self.pos;
        let mut i = self.pos;
        while i < b.len() {
            match b[i] {
                b'/' if b.get(i + 1) == Some(&b'/') => {
                    i = skip_line_comment(b, i);
                }
                b'/' if b.get(i + 1) == Some(&b'*') => {
                    i = skip_block_comment(b, i);
                }
                b'\'' | b'"' => {
                    i = skip_quoted_single_line(b, i);
                }
                b'`' => {
                    i = skip_template_opaque(b, i);
                }
                b'\n' if self.at_frontmatter_close(i + 1) => {
                    return self.text_token(start, i + 1);
                }
                _ => i += 1,
            }
        }
        Err(ParseError::UnterminatedFrontmatter {
            span: Span::new(fence, fence + 3),
        })
    }

    fn at_frontmatter_close(&self, at: usize) -> bool {
        (at == 0 || self.bytes()[at - 1] == b'\n') && self.source[at..].starts_with("---")
    }

    // ---------------------------------------------------------------------
    // Raw text (`script`, `style`, `is:raw`) and RCDATA (`title`, `textarea`)

    fn scan_raw(&mut self) -> ParseResult<Option<Token<'src>>> {
        let (tag, rcdata) = match self.ctx.last() {
            Some(Ctx::Raw { tag, rcdata }) => (tag.clone(), *rcdata),
            _ => unreachable!("raw scan outside a raw context"),
        };
        let b = self.bytes();
        let start = self.pos;
        let mut i = self.pos;
        while i < b.len() {
            let c = b[i];
            if c == b'<' && self.raw_close_ahead(i, &tag) {
                if i > start {
                    return self.text_token(start, i);
                }
                return self.scan_tag();
            }
            if rcdata && c == b'{' {
                if i > start {
                    return self.text_token(start, i);
                }
                return self.open_expression();
            }
            i += 1;
        }
        // EOF inside raw text: emit the tail, let the builder auto-close
        self.ctx.pop();
        if i > start {
            return self.text_token(start, i);
        }
        self.next_token()
    }

    fn raw_close_ahead(&self, at: usize, tag: &str) -> bool {
        let b = self.bytes();
        if b.get(at + 1) != Some(&b'/') {
            return false;
        }
        let name_start = at + 2;
        let rest = &b[name_start.min(b.len())..];
        if !starts_with_ignore_case(rest, tag.as_bytes()) {
            return false;
        }
        match b.get(name_start + tag.len()) {
            None => true,
            Some(c) => c.is_ascii_whitespace() || *c == b'>' || *c == b'/',
        }
    }

    // ---------------------------------------------------------------------
    // Expression state (JS scanning)

    /// In expression position, `</` never opens a tag: there is no element
    /// to close, so it reads as division/comparison.
    fn expr_tag_ahead(&self, at: usize) -> bool {
        match self.bytes().get(at + 1) {
            Some(c) => c.is_ascii_alphabetic() || *c == b'!' || *c == b'>',
            None => false,
        }
    }

    fn scan_expression(&mut self) -> ParseResult<Option<Token<'src>>> {
        // Take the frame's delimiter stack so the scan below can call back
        // into `self`; it is restored whenever the frame stays open.
        let (open, mut stack) = match self.ctx.last_mut() {
            Some(Ctx::Expr { open, stack, .. }) => (*open, std::mem::take(stack)),
            _ => unreachable!("expression scan outside an expression context"),
        };
        let b = self.bytes();
        let len = b.len();
        let start = self.pos;
        let mut i = self.pos;
        let mut action = None;

        while i < len {
            match stack.last() {
                Some(Delim::Template) => match b[i] {
                    b'\\' => i += 2,
                    b'`' => {
                        stack.pop();
                        i += 1;
                    }
                    b'$' if b.get(i + 1) == Some(&b'{') => {
                        stack.push(Delim::Brace);
                        i += 2;
                    }
                    _ => i += 1,
                },
                _ => match b[i] {
                    b'}' => {
                        if stack.len() == 1 {
                            action = Some(if i > start {
                                ExprAction::EmitText(i)
                            } else {
                                ExprAction::Close(i)
                            });
                            break;
                        }
                        stack.pop();
                        i += 1;
                    }
                    b'{' => {
                        stack.push(Delim::Brace);
                        i += 1;
                    }
                    b'`' => {
                        stack.push(Delim::Template);
                        i += 1;
                    }
                    b'\'' | b'"' => {
                        i = skip_quoted_single_line(b, i);
                    }
                    b'/' if b.get(i + 1) == Some(&b'/') => {
                        i = skip_line_comment(b, i);
                    }
                    b'/' if b.get(i + 1) == Some(&b'*') => {
                        i = skip_block_comment(b, i);
                    }
                    b'<' if self.expr_tag_ahead(i) => {
                        action = Some(if i > start {
                            ExprAction::EmitText(i)
                        } else {
                            ExprAction::Tag
                        });
                        break;
                    }
                    _ => i += 1,
                },
            }
        }

        match action {
            None => Err(ParseError::UnbalancedBraces {
                span: Span::new(open, open + 1),
            }),
            Some(ExprAction::Close(i)) => {
                self.ctx.pop();
                self.pos = i + 1;
                Ok(Some(Token::ExpressionEnd {
                    span: Span::new(i, i + 1),
                }))
            }
            Some(action) => {
                if let Some(Ctx::Expr { stack: frame, .. }) = self.ctx.last_mut() {
                    *frame = stack;
                }
                match action {
                    ExprAction::EmitText(i) => self.text_token(start, i),
                    ExprAction::Tag => self.scan_tag(),
                    ExprAction::Close(_) => unreachable!(),
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Tags

    fn scan_tag(&mut self) -> ParseResult<Option<Token<'src>>> {
        let start = self.pos;
        let b = self.bytes();

        if self.source[start..].starts_with("<!--") {
            return self.scan_comment(start);
        }
        if b.get(start + 1) == Some(&b'!') {
            return self.scan_doctype(start);
        }
        if b.get(start + 1) == Some(&b'/') {
            return self.scan_end_tag(start);
        }

        // fragment shorthand `<>`
        if b.get(start + 1) == Some(&b'>') {
            self.pos = start + 2;
            let token = Token::StartTag {
                name: "",
                attributes: Vec::new(),
                self_closing: false,
                span: Span::new(start, start + 2),
            };
            self.after_start_tag("", &[], false);
            return Ok(Some(token));
        }

        let name_start = start + 1;
        let name_end = scan_name(b, name_start);
        let name = &self.source[name_start..name_end];
        let (attributes, self_closing, end) = self.scan_attribute_list(start, name_end)?;
        self.pos = end;
        self.after_start_tag(name, &attributes, self_closing);
        Ok(Some(Token::StartTag {
            name,
            attributes,
            self_closing,
            span: Span::new(start, end),
        }))
    }

    fn after_start_tag(&mut self, name: &str, attributes: &[Attribute], self_closing: bool) {
        let lower = name.to_ascii_lowercase();
        if self_closing || is_void_element(&lower) {
            return;
        }
        let is_raw_attr = attributes.iter().any(|a| a.name == "is:raw");
        if is_raw_text_element(&lower) || is_raw_attr {
            self.ctx.push(Ctx::Raw {
                tag: name.to_string(),
                rcdata: false,
            });
        } else if is_rcdata_element(&lower) {
            self.ctx.push(Ctx::Raw {
                tag: name.to_string(),
                rcdata: true,
            });
        } else if let Some(Ctx::Expr { elements, .. }) = self.ctx.last_mut() {
            elements.push(normalize_fragment_name(name).to_string());
        }
    }

    fn scan_comment(&mut self, start: usize) -> ParseResult<Option<Token<'src>>> {
        match self.source[start + 4..].find("-->") {
            Some(rel) => {
                let text_end = start + 4 + rel;
                let end = text_end + 3;
                self.pos = end;
                Ok(Some(Token::Comment {
                    text: &self.source[start + 4..text_end],
                    span: Span::new(start, end),
                }))
            }
            None => Err(ParseError::UnterminatedComment {
                span: Span::new(start, start + 4),
            }),
        }
    }

    fn scan_doctype(&mut self, start: usize) -> ParseResult<Option<Token<'src>>> {
        let rel = self.source[start..]
            .find('>')
            .ok_or(ParseError::UnterminatedTag {
                span: Span::new(start, start + 1),
            })?;
        let end = start + rel + 1;
        let content = self.source[start + 2..end - 1].trim();
        let (name, known) = if starts_with_ignore_case(content.as_bytes(), b"doctype") {
            let name = content[7..].trim().trim_end_matches('/').trim();
            (name.to_ascii_lowercase(), true)
        } else {
            (content.to_ascii_lowercase(), false)
        };
        self.pos = end;
        Ok(Some(Token::Doctype {
            name,
            known,
            span: Span::new(start, end),
        }))
    }

    fn scan_end_tag(&mut self, start: usize) -> ParseResult<Option<Token<'src>>> {
        let b = self.bytes();
        let mut i = start + 2;
        while i < b.len() && b[i].is_ascii_whitespace() {
            i += 1;
        }
        let name_start = i;
        let name_end = scan_name(b, name_start);
        let name = &self.source[name_start..name_end];
        i = name_end;
        while i < b.len() && b[i] != b'>' {
            i += 1;
        }
        if i >= b.len() {
            return Err(ParseError::UnterminatedTag {
                span: Span::new(start, start + 2),
            });
        }
        let end = i + 1;
        self.pos = end;
        self.after_end_tag(name);
        Ok(Some(Token::EndTag {
            name,
            span: Span::new(start, end),
        }))
    }

    fn after_end_tag(&mut self, name: &str) {
        match self.ctx.last_mut() {
            Some(Ctx::Raw { tag, .. }) if tag.eq_ignore_ascii_case(name) => {
                self.ctx.pop();
            }
            Some(Ctx::Expr { elements, .. }) => {
                let normalized = normalize_fragment_name(name);
                if let Some(idx) = elements.iter().rposition(|e| e == normalized) {
                    elements.truncate(idx);
                }
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Attributes

    fn scan_attribute_list(
        &self,
        tag_start: usize,
        mut i: usize,
    ) -> ParseResult<(Vec<Attribute>, bool, usize)> {
        let b = self.bytes();
        let len = b.len();
        let mut attributes = Vec::new();
        let unterminated = || ParseError::UnterminatedTag {
            span: Span::new(tag_start, tag_start + 1),
        };

        loop {
            while i < len && b[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= len {
                return Err(unterminated());
            }
            match b[i] {
                b'>' => return Ok((attributes, false, i + 1)),
                b'/' if b.get(i + 1) == Some(&b'>') => return Ok((attributes, true, i + 2)),
                b'/' => {
                    // stray solidus, skipped
                    i += 1;
                }
                b'{' => {
                    let close = scan_balanced(self.source, i + 1, Delim::Brace, i)?;
                    let inner = &self.source[i + 1..close];
                    let trimmed = inner.trim();
                    if let Some(spread) = trimmed.strip_prefix("...") {
                        attributes.push(Attribute {
                            name: String::new(),
                            value: spread.trim().to_string(),
                            kind: AttributeKind::Spread,
                            name_span: Span::empty(i),
                            value_span: Span::new(i + 1, close),
                        });
                    } else if !is_only_js_comments(trimmed) {
                        attributes.push(Attribute {
                            name: trimmed.to_string(),
                            value: trimmed.to_string(),
                            kind: AttributeKind::Shorthand,
                            name_span: Span::new(i + 1, close),
                            value_span: Span::new(i + 1, close),
                        });
                    }
                    i = close + 1;
                }
                _ => {
                    let name_start = i;
                    while i < len {
                        let c = b[i];
                        if c.is_ascii_whitespace() || c == b'=' || c == b'>' {
                            break;
                        }
                        if c == b'/' && b.get(i + 1) == Some(&b'>') {
                            break;
                        }
                        i += 1;
                    }
                    if i >= len {
                        return Err(unterminated());
                    }
                    let name_span = Span::new(name_start, i);
                    let name = &self.source[name_start..i];

                    let mut j = i;
                    while j < len && b[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if b.get(j) != Some(&b'=') {
                        attributes.push(Attribute {
                            name: name.to_string(),
                            value: String::new(),
                            kind: AttributeKind::Empty,
                            name_span,
                            value_span: Span::empty(name_span.end),
                        });
                        continue;
                    }
                    j += 1;
                    while j < len && b[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if j >= len {
                        return Err(unterminated());
                    }
                    match b[j] {
                        quote @ (b'"' | b'\'') => {
                            let value_start = j + 1;
                            let mut k = value_start;
                            while k < len && b[k] != quote {
                                k += 1;
                            }
                            if k >= len {
                                return Err(unterminated());
                            }
                            attributes.push(Attribute {
                                name: name.to_string(),
                                value: decode_entities(&self.source[value_start..k]),
                                kind: AttributeKind::Quoted,
                                name_span,
                                value_span: Span::new(value_start, k),
                            });
                            i = k + 1;
                        }
                        b'{' => {
                            let close = scan_balanced(self.source, j + 1, Delim::Brace, j)?;
                            attributes.push(Attribute {
                                name: name.to_string(),
                                value: self.source[j + 1..close].to_string(),
                                kind: AttributeKind::Expression,
                                name_span,
                                value_span: Span::new(j + 1, close),
                            });
                            i = close + 1;
                        }
                        b'`' => {
                            let close = scan_balanced(self.source, j + 1, Delim::Template, j)?;
                            attributes.push(Attribute {
                                name: name.to_string(),
                                value: self.source[j + 1..close].to_string(),
                                kind: AttributeKind::TemplateLiteral,
                                name_span,
                                value_span: Span::new(j + 1, close),
                            });
                            i = close + 1;
                        }
                        _ => {
                            let value_start = j;
                            let mut k = j;
                            while k < len {
                                let c = b[k];
                                if c.is_ascii_whitespace() || c == b'>' {
                                    break;
                                }
                                if c == b'/' && b.get(k + 1) == Some(&b'>') {
                                    break;
                                }
                                k += 1;
                            }
                            attributes.push(Attribute {
                                name: name.to_string(),
                                value: decode_entities(&self.source[value_start..k]),
                                kind: AttributeKind::Quoted,
                                name_span,
                                value_span: Span::new(value_start, k),
                            });
                            i = k;
                        }
                    }
                }
            }
        }
    }
}

/// Tokenize an entire source string.
pub fn tokenize(source: &str) -> ParseResult<Vec<Token<'_>>> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len()
        && haystack
            .iter()
            .zip(prefix)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn normalize_fragment_name(name: &str) -> &str {
    if name.is_empty() {
        "Fragment"
    } else {
        name
    }
}

fn scan_name(b: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < b.len() {
        let c = b[i];
        if c.is_ascii_whitespace() || c == b'/' || c == b'>' || c == b'=' {
            break;
        }
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

/// Skip a `'` or `"` string. JS strings cannot span lines, so an unescaped
/// newline also terminates the scan.
fn skip_quoted_single_line(b: &[u8], start: usize) -> usize {
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

/// Skip a template literal without interpreting `${…}` holes (frontmatter is
/// opaque; only the closing backtick matters there).
fn skip_template_opaque(b: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            _ => i += 1,
        }
    }
    b.len()
}

/// Scan balanced JS starting just after an opening delimiter; returns the
/// index of the matching close. Tracks nested braces, template literals with
/// `${…}` holes, quoted strings, and comments.
fn scan_balanced(source: &str, start: usize, first: Delim, open_at: usize) -> ParseResult<usize> {
    let b = source.as_bytes();
    let len = b.len();
    let mut stack = vec![first];
    let mut i = start;
    while i < len {
        match stack.last() {
            Some(Delim::Template) => match b[i] {
                b'\\' => i += 2,
                b'`' => {
                    stack.pop();
                    if stack.is_empty() {
                        return Ok(i);
                    }
                    i += 1;
                }
                b'$' if b.get(i + 1) == Some(&b'{') => {
                    stack.push(Delim::Brace);
                    i += 2;
                }
                _ => i += 1,
            },
            _ => match b[i] {
                b'}' => {
                    stack.pop();
                    if stack.is_empty() {
                        return Ok(i);
                    }
                    i += 1;
                }
                b'{' => {
                    stack.push(Delim::Brace);
                    i += 1;
                }
                b'`' => {
                    stack.push(Delim::Template);
                    i += 1;
                }
                b'\'' | b'"' => {
                    i = skip_quoted_single_line(b, i);
                }
                b'/' if b.get(i + 1) == Some(&b'/') => {
                    i = skip_line_comment(b, i);
                }
                b'/' if b.get(i + 1) == Some(&b'*') => {
                    i = skip_block_comment(b, i);
                }
                _ => i += 1,
            },
        }
    }
    match first {
        Delim::Brace => Err(ParseError::UnbalancedBraces {
            span: Span::new(open_at, open_at + 1),
        }),
        Delim::Template => Err(ParseError::UnterminatedString {
            span: Span::new(open_at, open_at + 1),
        }),
    }
}

/// True when an attribute-position brace group holds nothing but JS comments,
/// which the tokenizer discards.
fn is_only_js_comments(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        if b[i].is_ascii_whitespace() {
            i += 1;
        } else if b[i] == b'/' && b.get(i + 1) == Some(&b'/') {
            i = skip_line_comment(b, i);
        } else if b[i] == b'/' && b.get(i + 1) == Some(&b'*') {
            i = skip_block_comment(b, i);
        } else {
            return false;
        }
    }
    true
}

/// Decode numeric character references and the five basic named entities in
/// an attribute value. Everything unrecognized passes through verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let b = raw.as_bytes();
    let mut i = 0;
    while i < b.len() {
        if b[i] != b'&' {
            let ch_len = utf8_len(b[i]);
            out.push_str(&raw[i..i + ch_len]);
            i += ch_len;
            continue;
        }
        let rest = &raw[i..];
        let semi = match rest.find(';') {
            Some(s) if s <= 10 => s,
            _ => {
                out.push('&');
                i += 1;
                continue;
            }
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "quot" => Some('"'),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "apos" => Some('\''),
            _ => {
                if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    None
                }
            }
        };
        match decoded {
            Some(c) => {
                out.push(c);
                i += semi + 1;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| match t {
                Token::Doctype { .. } => "doctype".to_string(),
                Token::Comment { .. } => "comment".to_string(),
                Token::Text { text, .. } => format!("text({})", text),
                Token::StartTag { name, .. } => format!("start({})", name),
                Token::EndTag { name, .. } => format!("end({})", name),
                Token::FrontmatterStart { .. } => "fm-start".to_string(),
                Token::FrontmatterEnd { .. } => "fm-end".to_string(),
                Token::ExpressionStart { .. } => "expr-start".to_string(),
                Token::ExpressionEnd { .. } => "expr-end".to_string(),
            })
            .collect()
    }

    fn roundtrip(source: &str) {
        let tokens = tokenize(source).unwrap();
        let rebuilt: String = tokens
            .iter()
            .map(|t| {
                let span = t.span();
                &source[span.start..span.end]
            })
            .collect();
        assert_eq!(rebuilt, source, "token spans must tile the source");
    }

    #[test]
    fn test_basic_element() {
        assert_eq!(
            kinds("<button>Click</button>"),
            vec!["start(button)", "text(Click)", "end(button)"]
        );
        roundtrip("<button>Click</button>");
    }

    #[test]
    fn test_frontmatter() {
        let source = "---\nconst a = 1;\n---\n<div>{a}</div>";
        assert_eq!(
            kinds(source),
            vec![
                "fm-start",
                "text(\nconst a = 1;\n)",
                "fm-end",
                "text(\n)",
                "start(div)",
                "expr-start",
                "text(a)",
                "expr-end",
                "end(div)",
            ]
        );
        roundtrip(source);
    }

    #[test]
    fn test_frontmatter_fence_inside_template_literal() {
        let source = "---\nconst s = `\n---\n`;\n---\n<p></p>";
        let tokens = tokenize(source).unwrap();
        assert!(matches!(tokens[0], Token::FrontmatterStart { .. }));
        match &tokens[1] {
            Token::Text { text, .. } => assert_eq!(*text, "\nconst s = `\n---\n`;\n"),
            other => panic!("expected frontmatter body, got {:?}", other),
        }
        roundtrip(source);
    }

    #[test]
    fn test_frontmatter_requires_line_start() {
        // an indented fence is ordinary text
        let source = "  ---\nnope";
        let tokens = tokenize(source).unwrap();
        assert!(tokens
            .iter()
            .all(|t| !matches!(t, Token::FrontmatterStart { .. })));
    }

    #[test]
    fn test_unterminated_frontmatter_is_fatal() {
        let err = tokenize("---\nconst a = 1;").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedFrontmatter { .. }));
    }

    #[test]
    fn test_attribute_kinds() {
        let source = r#"<a one two="2" three={3} {four} {...rest} five=`${5}` six='6' seven=bare>"#;
        let tokens = tokenize(source).unwrap();
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                let kinds: Vec<(&str, AttributeKind)> = attributes
                    .iter()
                    .map(|a| (a.name.as_str(), a.kind))
                    .collect();
                assert_eq!(
                    kinds,
                    vec![
                        ("one", AttributeKind::Empty),
                        ("two", AttributeKind::Quoted),
                        ("three", AttributeKind::Expression),
                        ("four", AttributeKind::Shorthand),
                        ("", AttributeKind::Spread),
                        ("five", AttributeKind::TemplateLiteral),
                        ("six", AttributeKind::Quoted),
                        ("seven", AttributeKind::Quoted),
                    ]
                );
                assert_eq!(attributes[4].value, "rest");
                assert_eq!(attributes[5].value, "${5}");
            }
            other => panic!("expected start tag, got {:?}", other),
        }
        roundtrip(source);
    }

    #[test]
    fn test_comment_attribute_dropped() {
        let source = "<h1 {/* a comment */} value=\"1\">Hello</h1>";
        let tokens = tokenize(source).unwrap();
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes.len(), 1);
                assert_eq!(attributes[0].name, "value");
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_template_literal_attribute() {
        let source = "<div value={`${attr ? `a/b ${`c`}` : \"d\"} awesome`} />";
        let tokens = tokenize(source).unwrap();
        match &tokens[0] {
            Token::StartTag {
                attributes,
                self_closing,
                ..
            } => {
                assert!(*self_closing);
                assert_eq!(attributes[0].kind, AttributeKind::Expression);
                assert_eq!(attributes[0].value, "`${attr ? `a/b ${`c`}` : \"d\"} awesome`");
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_with_nested_element() {
        let source = "<ul>{items.map(item => <li>{item}</li>)}</ul>";
        assert_eq!(
            kinds(source),
            vec![
                "start(ul)",
                "expr-start",
                "text(items.map(item => )",
                "start(li)",
                "expr-start",
                "text(item)",
                "expr-end",
                "end(li)",
                "text())",
                "expr-end",
                "end(ul)",
            ]
        );
        roundtrip(source);
    }

    #[test]
    fn test_expression_braces_in_comments() {
        let source = "<div>{items.map((item) => (\n// foo < > < }\n<div>color</div>\n))}</div>";
        let tokens = tokenize(source).unwrap();
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::StartTag { name, .. } if *name == "div")));
        roundtrip(source);
    }

    #[test]
    fn test_expression_deep_braces() {
        let source = "<div>{() => { let a = () => { return; }; }}</div>";
        assert_eq!(
            kinds(source),
            vec![
                "start(div)",
                "expr-start",
                "text(() => { let a = () => { return; }; })",
                "expr-end",
                "end(div)",
            ]
        );
    }

    #[test]
    fn test_unbalanced_braces_fatal() {
        let err = tokenize("<div>{cond && </div>").unwrap_err();
        match err {
            ParseError::UnbalancedBraces { span } => assert_eq!(span.start, 5),
            other => panic!("expected unbalanced braces, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_tag_fatal() {
        let err = tokenize("<div class=\"x\"").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedTag { .. }));
    }

    #[test]
    fn test_raw_script_content() {
        let source = "<script>if (a < b) { run(`<div>`); }</script>";
        assert_eq!(
            kinds(source),
            vec![
                "start(script)",
                "text(if (a < b) { run(`<div>`); })",
                "end(script)",
            ]
        );
        roundtrip(source);
    }

    #[test]
    fn test_rcdata_title_expression() {
        let source = "<title>a {expr} b</title>";
        assert_eq!(
            kinds(source),
            vec![
                "start(title)",
                "text(a )",
                "expr-start",
                "text(expr)",
                "expr-end",
                "text( b)",
                "end(title)",
            ]
        );
        roundtrip(source);
    }

    #[test]
    fn test_is_raw_suppresses_expressions() {
        let source = "<article is:raw><% awesome %>{not an expr}</article>";
        assert_eq!(
            kinds(source),
            vec![
                "start(article)",
                "text(<% awesome %>{not an expr})",
                "end(article)",
            ]
        );
    }

    #[test]
    fn test_textarea_inside_expression() {
        let source = "{bool && <textarea>{value}</textarea>}";
        assert_eq!(
            kinds(source),
            vec![
                "expr-start",
                "text(bool && )",
                "start(textarea)",
                "expr-start",
                "text(value)",
                "expr-end",
                "end(textarea)",
                "expr-end",
            ]
        );
        roundtrip(source);
    }

    #[test]
    fn test_fragment_shorthand() {
        let source = "<>hi</>";
        assert_eq!(kinds(source), vec!["start()", "text(hi)", "end()"]);
        roundtrip(source);
    }

    #[test]
    fn test_doctype() {
        let tokens = tokenize("<!DOCTYPE html><div/>").unwrap();
        match &tokens[0] {
            Token::Doctype { name, known, .. } => {
                assert_eq!(name, "html");
                assert!(*known);
            }
            other => panic!("expected doctype, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_with_backticks() {
        let source = "<body><!-- `npm install astro` --></body>";
        let tokens = tokenize(source).unwrap();
        match &tokens[1] {
            Token::Comment { text, .. } => assert_eq!(*text, " `npm install astro` "),
            other => panic!("expected comment, got {:?}", other),
        }
        roundtrip(source);
    }

    #[test]
    fn test_entity_decoding_in_attributes() {
        let tokens = tokenize("<img alt=\"A person saying &#x22;hello&#x22;\">").unwrap();
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes[0].value, "A person saying \"hello\"");
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_large_input_streams() {
        let mut source = String::from("<html><body>");
        for i in 0..1000 {
            source.push_str(&format!("<div id=\"n{}\">cell {}</div>", i, i));
        }
        source.push_str("</body></html>");
        assert!(source.len() > 4096);
        roundtrip(&source);
        let tokens = tokenize(&source).unwrap();
        let divs = tokens
            .iter()
            .filter(|t| matches!(t, Token::StartTag { name, .. } if *name == "div"))
            .count();
        assert_eq!(divs, 1000);
    }

    #[test]
    fn test_division_is_not_a_tag() {
        let source = "<div>{16 / 4}</div>";
        assert_eq!(
            kinds(source),
            vec![
                "start(div)",
                "expr-start",
                "text(16 / 4)",
                "expr-end",
                "end(div)",
            ]
        );
    }

    #[test]
    fn test_table_row_expression() {
        let source = "<table>{items.map(item => (<tr><td>{item}</td></tr>))}</table>";
        roundtrip(source);
        let tokens = tokenize(source).unwrap();
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::StartTag { name, .. } if *name == "tr")));
    }

    #[test]
    fn test_unquoted_attribute_value() {
        let tokens = tokenize("<meta charset=utf8>").unwrap();
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes[0].value, "utf8");
                assert_eq!(attributes[0].kind, AttributeKind::Quoted);
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }
}
