// src/scanner/tokenizer.rs

//! Lazy, pull-based HTML tokenizer.
//!
//! Bytes are pulled from the reader in fixed-size chunks as tokens are
//! requested. The tokenizer is forgiving: stray `<` characters become text,
//! unknown character references are kept verbatim, and invalid UTF-8 is
//! replaced. Only input that ends inside a tag is reported as malformed.

use std::borrow::Cow;
use std::io::{self, Read};

use super::token::{Attribute, ScanError, Tag, Token};

const CHUNK_SIZE: usize = 8 * 1024;

/// Elements whose content is not tokenized.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Streaming tokenizer over any [`Read`] source.
///
/// Yields tokens until it emits exactly one [`Token::Error`], then `None`.
/// A clean end of input is reported as [`ScanError::EndOfStream`].
pub struct Scanner<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    raw_text: Option<String>,
    finished: bool,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            eof: false,
            raw_text: None,
            finished: false,
        }
    }

    // --- Buffer management ---

    /// Pull another chunk from the reader. Returns `false` at end of input.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + CHUNK_SIZE, 0);
        loop {
            match self.reader.read(&mut self.buf[start..]) {
                Ok(0) => {
                    self.buf.truncate(start);
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    fn peek_at(&mut self, offset: usize) -> io::Result<Option<u8>> {
        while self.pos + offset >= self.buf.len() {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos + offset]))
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        self.peek_at(0)
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.bump(1);
        }
        Ok(())
    }

    /// Whether the bytes at the cursor open a tag, comment or declaration.
    fn at_markup(&mut self) -> io::Result<bool> {
        if self.peek()? != Some(b'<') {
            return Ok(false);
        }
        Ok(matches!(
            self.peek_at(1)?,
            Some(b) if b.is_ascii_alphabetic() || b == b'/' || b == b'!' || b == b'?'
        ))
    }

    // --- Token scanning ---

    fn scan(&mut self) -> Result<Token, ScanError> {
        loop {
            if let Some(element) = self.raw_text.take() {
                let text = self.scan_raw_text(&element)?;
                if !text.is_empty() {
                    return Ok(Token::Text(text));
                }
                continue;
            }

            match self.peek()? {
                None => return Err(ScanError::EndOfStream),
                Some(b'<') => match self.peek_at(1)? {
                    Some(b) if b.is_ascii_alphabetic() => return self.scan_start_tag(),
                    Some(b'/') => match self.peek_at(2)? {
                        Some(b) if b.is_ascii_alphabetic() => return self.scan_end_tag(),
                        None => {
                            return Err(ScanError::Malformed("unterminated end tag".into()));
                        }
                        Some(_) => self.skip_until_gt()?,
                    },
                    Some(b'!') | Some(b'?') => self.skip_declaration()?,
                    _ => return self.scan_text(),
                },
                Some(_) => return self.scan_text(),
            }
        }
    }

    fn scan_text(&mut self) -> Result<Token, ScanError> {
        let mut bytes = Vec::new();
        // The first byte is always text, even a lone '<'.
        if let Some(b) = self.peek()? {
            bytes.push(b);
            self.bump(1);
        }
        while let Some(b) = self.peek()? {
            if b == b'<' && self.at_markup()? {
                break;
            }
            bytes.push(b);
            self.bump(1);
        }
        Ok(Token::Text(decode_entities(&String::from_utf8_lossy(&bytes)).into_owned()))
    }

    fn read_name(&mut self) -> io::Result<String> {
        let mut name = String::new();
        while let Some(b) = self.peek()? {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_') {
                name.push(b.to_ascii_lowercase() as char);
                self.bump(1);
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn scan_start_tag(&mut self) -> Result<Token, ScanError> {
        self.bump(1);
        let name = self.read_name()?;
        let mut attrs = Vec::new();

        let self_closing = loop {
            self.skip_whitespace()?;
            match self.peek()? {
                None => {
                    return Err(ScanError::Malformed(format!("unterminated <{name}> tag")));
                }
                Some(b'>') => {
                    self.bump(1);
                    break false;
                }
                Some(b'/') => {
                    self.bump(1);
                    if self.peek()? == Some(b'>') {
                        self.bump(1);
                        break true;
                    }
                }
                Some(_) => {
                    let key = self.read_attr_key()?;
                    self.skip_whitespace()?;
                    let value = if self.peek()? == Some(b'=') {
                        self.bump(1);
                        self.skip_whitespace()?;
                        self.read_attr_value(&name)?
                    } else {
                        String::new()
                    };
                    attrs.push(Attribute { key, value });
                }
            }
        };

        if self_closing {
            return Ok(Token::SelfClosingTag(Tag::new(name, attrs)));
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text = Some(name.clone());
        }
        Ok(Token::StartTag(Tag::new(name, attrs)))
    }

    fn read_attr_key(&mut self) -> io::Result<String> {
        let mut key = Vec::new();
        // A leading '=' belongs to the name so the cursor always advances.
        if self.peek()? == Some(b'=') {
            key.push(b'=');
            self.bump(1);
        }
        while let Some(b) = self.peek()? {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            key.push(b.to_ascii_lowercase());
            self.bump(1);
        }
        Ok(String::from_utf8_lossy(&key).into_owned())
    }

    fn read_attr_value(&mut self, tag: &str) -> Result<String, ScanError> {
        let mut value = Vec::new();
        match self.peek()? {
            Some(quote @ (b'"' | b'\'')) => {
                self.bump(1);
                loop {
                    match self.peek()? {
                        None => {
                            return Err(ScanError::Malformed(format!(
                                "unterminated attribute value in <{tag}>"
                            )));
                        }
                        Some(b) if b == quote => {
                            self.bump(1);
                            break;
                        }
                        Some(b) => {
                            value.push(b);
                            self.bump(1);
                        }
                    }
                }
            }
            _ => {
                while let Some(b) = self.peek()? {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    value.push(b);
                    self.bump(1);
                }
            }
        }
        Ok(decode_entities(&String::from_utf8_lossy(&value)).into_owned())
    }

    fn scan_end_tag(&mut self) -> Result<Token, ScanError> {
        self.bump(2);
        let name = self.read_name()?;
        loop {
            match self.peek()? {
                None => return Err(ScanError::Malformed(format!("unterminated </{name}> tag"))),
                Some(b'>') => {
                    self.bump(1);
                    return Ok(Token::EndTag(name));
                }
                Some(_) => self.bump(1),
            }
        }
    }

    /// Skip a comment, doctype or processing instruction.
    fn skip_declaration(&mut self) -> io::Result<()> {
        let is_comment = self.peek_at(2)? == Some(b'-') && self.peek_at(3)? == Some(b'-');
        if !is_comment {
            return self.skip_until_gt();
        }
        self.bump(4);
        while self.peek()?.is_some() {
            if self.peek()? == Some(b'-')
                && self.peek_at(1)? == Some(b'-')
                && self.peek_at(2)? == Some(b'>')
            {
                self.bump(3);
                return Ok(());
            }
            self.bump(1);
        }
        Ok(())
    }

    fn skip_until_gt(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek()? {
            self.bump(1);
            if b == b'>' {
                break;
            }
        }
        Ok(())
    }

    /// Collect the body of a raw text element up to (not including) its end tag.
    fn scan_raw_text(&mut self, element: &str) -> Result<String, ScanError> {
        let mut bytes = Vec::new();
        while let Some(b) = self.peek()? {
            if b == b'<' && self.peek_at(1)? == Some(b'/') && self.closes(element)? {
                break;
            }
            bytes.push(b);
            self.bump(1);
        }
        let text = String::from_utf8_lossy(&bytes);
        let text = match element {
            "textarea" | "title" => decode_entities(&text).into_owned(),
            _ => text.into_owned(),
        };
        Ok(text)
    }

    /// Whether `</element` starts at the cursor, followed by a name boundary.
    fn closes(&mut self, element: &str) -> io::Result<bool> {
        let name = element.as_bytes();
        for (i, expected) in name.iter().enumerate() {
            match self.peek_at(2 + i)? {
                Some(b) if b.to_ascii_lowercase() == *expected => {}
                _ => return Ok(false),
            }
        }
        Ok(match self.peek_at(2 + name.len())? {
            None => true,
            Some(b) => b.is_ascii_whitespace() || b == b'>' || b == b'/',
        })
    }
}

impl<R: Read> Iterator for Scanner<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        match self.scan() {
            Ok(token) => Some(token),
            Err(err) => {
                self.finished = true;
                Some(Token::Error(err))
            }
        }
    }
}

/// Decode the character references found in server-rendered markup.
///
/// Numeric references are decoded in full. Named references cover the markup
/// escapes plus the Latin-1 letters and typographic punctuation that show up
/// in team and venue names; any other name is kept verbatim, so text using
/// one will not compare equal to its decoded form.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_reference(&rest[1..=end]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    NAMED_REFERENCES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|&(_, c)| c)
}

const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    // Latin-1 letters
    ("Agrave", 'À'),
    ("Aacute", 'Á'),
    ("Acirc", 'Â'),
    ("Auml", 'Ä'),
    ("Ccedil", 'Ç'),
    ("Egrave", 'È'),
    ("Eacute", 'É'),
    ("Ecirc", 'Ê'),
    ("Iacute", 'Í'),
    ("Ntilde", 'Ñ'),
    ("Oacute", 'Ó'),
    ("Ouml", 'Ö'),
    ("Uacute", 'Ú'),
    ("Uuml", 'Ü'),
    ("szlig", 'ß'),
    ("agrave", 'à'),
    ("aacute", 'á'),
    ("acirc", 'â'),
    ("auml", 'ä'),
    ("aring", 'å'),
    ("ccedil", 'ç'),
    ("egrave", 'è'),
    ("eacute", 'é'),
    ("ecirc", 'ê'),
    ("euml", 'ë'),
    ("iacute", 'í'),
    ("icirc", 'î'),
    ("iuml", 'ï'),
    ("ntilde", 'ñ'),
    ("oacute", 'ó'),
    ("ocirc", 'ô'),
    ("ouml", 'ö'),
    ("oslash", 'ø'),
    ("uacute", 'ú'),
    ("ucirc", 'û'),
    ("uuml", 'ü'),
    // Punctuation and symbols
    ("copy", '©'),
    ("reg", '®'),
    ("deg", '°'),
    ("middot", '·'),
    ("ndash", '–'),
    ("mdash", '—'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("hellip", '…'),
    ("bull", '•'),
];
