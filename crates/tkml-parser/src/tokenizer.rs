//! Incremental tokenizer
//!
//! Input is pushed in arbitrary pieces; [`Tokenizer::next_token`] only
//! returns a token once it is fully determined by the buffered input, so
//! the token stream never depends on where chunk boundaries fall (text may
//! arrive in several pieces, which the tree merges back together).
//!
//! In raw mode the tokenizer stops recognising markup and only looks for
//! open and close tags of the raw element's own kind, handing them back
//! verbatim so the parser can track nesting depth.

use std::collections::HashMap;

use memchr::{memchr, memrchr};

use crate::entities::{decode_entities, MAX_ENTITY_LEN};
use crate::error::ParseError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open {
        name: String,
        attributes: HashMap<String, String>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
    RawText(String),
    RawOpen {
        verbatim: String,
        self_closing: bool,
    },
    RawClose {
        verbatim: String,
    },
}

#[derive(Debug, Default)]
pub struct Tokenizer {
    buf: String,
    pos: usize,
    /// Bytes dropped from the front of `buf`
    consumed: usize,
    raw: Option<String>,
}

enum Prefix {
    Full,
    Partial,
    No,
}

fn prefix_ignore_case(haystack: &[u8], needle: &[u8]) -> Prefix {
    let n = haystack.len().min(needle.len());
    if !haystack[..n].eq_ignore_ascii_case(&needle[..n]) {
        Prefix::No
    } else if n == needle.len() {
        Prefix::Full
    } else {
        Prefix::Partial
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        if self.pos > 0 && self.pos * 2 >= self.buf.len() {
            self.buf.drain(..self.pos);
            self.consumed += self.pos;
            self.pos = 0;
        }
        self.buf.push_str(text);
    }

    /// Capture everything verbatim until the matching close of `tag`.
    pub fn enter_raw(&mut self, tag: &str) {
        self.raw = Some(tag.to_ascii_lowercase());
    }

    pub fn exit_raw(&mut self) {
        self.raw = None;
    }

    /// Absolute byte offset of the next unread input.
    pub fn offset(&self) -> usize {
        self.consumed + self.pos
    }

    /// Next complete token, or `None` when more input is needed.
    ///
    /// With `eof` set, nothing more will arrive; the buffer is drained and
    /// incomplete constructs become errors (or plain text, where lenient).
    pub fn next_token(&mut self, eof: bool) -> Result<Option<Token>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        if self.raw.is_some() {
            return Ok(self.next_raw(eof));
        }

        let rest = &self.buf[self.pos..];
        let bytes = rest.as_bytes();

        if bytes[0] != b'<' {
            let end = memchr(b'<', bytes).unwrap_or(bytes.len());
            let mut take = end;
            if end == bytes.len() && !eof {
                if let Some(amp) = memrchr(b'&', bytes) {
                    if memchr(b';', &bytes[amp..]).is_none() && bytes.len() - amp <= MAX_ENTITY_LEN
                    {
                        take = amp;
                    }
                }
            }
            if take == 0 {
                return Ok(None);
            }
            let text = decode_entities(&rest[..take]);
            self.pos += take;
            return Ok(Some(Token::Text(text)));
        }

        if bytes.len() < 2 {
            return Ok(self.lone_angle(eof));
        }

        match bytes[1] {
            b'!' => self.markup_declaration(eof),
            b'?' => self.skip_to_gt(2, eof),
            b'/' => self.close_tag(eof),
            b if b.is_ascii_alphabetic() => self.open_tag(eof),
            _ => {
                self.pos += 1;
                Ok(Some(Token::Text("<".to_string())))
            }
        }
    }

    fn lone_angle(&mut self, eof: bool) -> Option<Token> {
        if !eof {
            return None;
        }
        self.pos += 1;
        Some(Token::Text("<".to_string()))
    }

    /// Comments and `<!...>` declarations are dropped.
    fn markup_declaration(&mut self, eof: bool) -> Result<Option<Token>> {
        let bytes = &self.buf.as_bytes()[self.pos..];
        match prefix_ignore_case(bytes, b"<!--") {
            Prefix::Full => match self.buf[self.pos + 4..].find("-->") {
                Some(end) => {
                    self.pos += 4 + end + 3;
                    self.next_token(eof)
                }
                None if eof => Err(ParseError::UnterminatedComment {
                    offset: self.offset(),
                }),
                None => Ok(None),
            },
            Prefix::Partial if !eof => Ok(None),
            _ => self.skip_to_gt(2, eof),
        }
    }

    fn skip_to_gt(&mut self, from: usize, eof: bool) -> Result<Option<Token>> {
        match memchr(b'>', &self.buf.as_bytes()[self.pos + from..]) {
            Some(gt) => {
                self.pos += from + gt + 1;
                self.next_token(eof)
            }
            None if eof => Err(ParseError::UnterminatedTag {
                offset: self.offset(),
            }),
            None => Ok(None),
        }
    }

    fn close_tag(&mut self, eof: bool) -> Result<Option<Token>> {
        let rest = &self.buf[self.pos..];
        let Some(gt) = memchr(b'>', rest.as_bytes()) else {
            if eof {
                return Err(ParseError::UnterminatedTag {
                    offset: self.offset(),
                });
            }
            return Ok(None);
        };

        let name = rest[2..gt].trim();
        let valid = name.as_bytes().first().is_some_and(|b| b.is_ascii_alphabetic())
            && name.bytes().all(is_name_byte);
        if !valid {
            return Err(ParseError::InvalidCloseTag {
                offset: self.offset(),
                name: name.to_string(),
            });
        }

        let token = Token::Close {
            name: name.to_ascii_lowercase(),
        };
        self.pos += gt + 1;
        Ok(Some(token))
    }

    fn open_tag(&mut self, eof: bool) -> Result<Option<Token>> {
        match self.scan_open_tag()? {
            Some((token, len)) => {
                self.pos += len;
                Ok(Some(token))
            }
            None if eof => Err(ParseError::UnterminatedTag {
                offset: self.offset(),
            }),
            None => Ok(None),
        }
    }

    /// Parse `<name attr="v" ...>` at the cursor. `None` means the tag is
    /// not complete yet.
    fn scan_open_tag(&self) -> Result<Option<(Token, usize)>> {
        let rest = &self.buf[self.pos..];
        let b = rest.as_bytes();
        let malformed = |reason: String| ParseError::MalformedTag {
            offset: self.offset(),
            reason,
        };

        let mut i = 1;
        while i < b.len() && is_name_byte(b[i]) {
            i += 1;
        }
        if i >= b.len() {
            return Ok(None);
        }
        let name = rest[1..i].to_ascii_lowercase();
        if !(b[i].is_ascii_whitespace() || b[i] == b'>' || b[i] == b'/') {
            return Err(malformed(format!(
                "unexpected {:?} in <{}>",
                char::from(b[i]),
                name
            )));
        }

        let mut attributes = HashMap::new();
        loop {
            while i < b.len() && b[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= b.len() {
                return Ok(None);
            }
            match b[i] {
                b'>' => {
                    let token = Token::Open {
                        name,
                        attributes,
                        self_closing: false,
                    };
                    return Ok(Some((token, i + 1)));
                }
                b'/' => {
                    if i + 1 >= b.len() {
                        return Ok(None);
                    }
                    if b[i + 1] == b'>' {
                        let token = Token::Open {
                            name,
                            attributes,
                            self_closing: true,
                        };
                        return Ok(Some((token, i + 2)));
                    }
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let start = i;
            while i < b.len()
                && !b[i].is_ascii_whitespace()
                && !matches!(b[i], b'=' | b'>' | b'/' | b'"' | b'\'')
            {
                i += 1;
            }
            if i == start {
                return Err(malformed(format!("attribute without a name in <{}>", name)));
            }
            if i >= b.len() {
                return Ok(None);
            }
            let attr = rest[start..i].to_string();

            let mut j = i;
            while j < b.len() && b[j].is_ascii_whitespace() {
                j += 1;
            }
            if j >= b.len() {
                return Ok(None);
            }

            let mut value = String::new();
            if b[j] == b'=' {
                j += 1;
                while j < b.len() && b[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j >= b.len() {
                    return Ok(None);
                }
                if b[j] == b'"' || b[j] == b'\'' {
                    let Some(close) = memchr(b[j], &b[j + 1..]) else {
                        return Ok(None);
                    };
                    value = decode_entities(&rest[j + 1..j + 1 + close]);
                    j += close + 2;
                } else {
                    let start = j;
                    while j < b.len() && !b[j].is_ascii_whitespace() && b[j] != b'>' {
                        j += 1;
                    }
                    if j >= b.len() {
                        return Ok(None);
                    }
                    value = decode_entities(&rest[start..j]);
                }
                i = j;
            }

            attributes.entry(attr).or_insert(value);
        }
    }

    fn next_raw(&mut self, eof: bool) -> Option<Token> {
        let tag = self.raw.as_deref().unwrap_or_default();
        let rest = &self.buf[self.pos..];
        let b = rest.as_bytes();

        match memchr(b'<', b) {
            None => {
                self.pos += b.len();
                return Some(Token::RawText(rest.to_string()));
            }
            Some(lt) if lt > 0 => {
                self.pos += lt;
                return Some(Token::RawText(rest[..lt].to_string()));
            }
            Some(_) => {}
        }

        let close = format!("</{}", tag);
        let open = format!("<{}", tag);
        let close_match = prefix_ignore_case(b, close.as_bytes());
        let open_match = prefix_ignore_case(b, open.as_bytes());

        if matches!(close_match, Prefix::Full) {
            let mut k = close.len();
            while k < b.len() && b[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < b.len() && b[k] == b'>' {
                let verbatim = rest[..=k].to_string();
                self.pos += k + 1;
                return Some(Token::RawClose { verbatim });
            }
            if k >= b.len() && !eof {
                return None;
            }
        } else if matches!(open_match, Prefix::Full) {
            let k = open.len();
            if k >= b.len() && !eof {
                return None;
            }
            if k < b.len() && (b[k].is_ascii_whitespace() || b[k] == b'>' || b[k] == b'/') {
                match memchr(b'>', &b[k..]) {
                    Some(gt) => {
                        let end = k + gt + 1;
                        let verbatim = rest[..end].to_string();
                        let self_closing = verbatim.ends_with("/>");
                        self.pos += end;
                        return Some(Token::RawOpen {
                            verbatim,
                            self_closing,
                        });
                    }
                    None if !eof => return None,
                    None => {}
                }
            }
        } else if !eof
            && (matches!(close_match, Prefix::Partial) || matches!(open_match, Prefix::Partial))
        {
            return None;
        }

        self.pos += 1;
        Some(Token::RawText("<".to_string()))
    }
}
