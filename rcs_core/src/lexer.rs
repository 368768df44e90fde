//! Chunked tokenizer for the RCS archive lexical format.

use std::fmt;
use std::io::{ErrorKind, Read};

/// Refill size used when no configuration is supplied.
pub const DEFAULT_CHUNK_SIZE: usize = 192 * 512;

/// One lexical token of an RCS archive.
#[derive(Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier, keyword, or number, terminated by whitespace, `;`, or `:`.
    Word(Vec<u8>),
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// Contents of an `@`-delimited string with `@@` already unescaped.
    String(Vec<u8>),
}

impl Token {
    /// Whether this is the bare word `word`.
    #[must_use]
    pub fn is_word(&self, word: &[u8]) -> bool {
        matches!(self, Self::Word(bytes) if bytes == word)
    }

    /// Whether this is a word starting with a digit, i.e. a revision number.
    #[must_use]
    pub fn starts_with_digit(&self) -> bool {
        matches!(self, Self::Word(bytes) if bytes.first().is_some_and(u8::is_ascii_digit))
    }

    /// Raw bytes of a word or string token.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Word(bytes) | Self::String(bytes) => bytes,
            Self::Semicolon => b";",
            Self::Colon => b":",
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 40;
        match self {
            Self::Word(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Self::Semicolon => f.write_str(";"),
            Self::Colon => f.write_str(":"),
            Self::String(bytes) => {
                let shown = &bytes[..bytes.len().min(PREVIEW)];
                let ellipsis = if bytes.len() > PREVIEW { "..." } else { "" };
                write!(f, "@{}{ellipsis}@", String::from_utf8_lossy(shown))
            }
        }
    }
}

/// Failure to split the input into tokens.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    /// An `@` string was still open at end of input.
    #[error("unterminated string starting at byte {offset}")]
    IllegalCharacter {
        /// Byte offset of the opening `@`.
        offset: u64,
    },
    /// The underlying reader failed.
    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Token stream over a reader, refilled in fixed-size chunks.
///
/// Supports exactly one token of pushback through [`TokenStream::unget`].
pub struct TokenStream<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    consumed: u64,
    bytes_read: u64,
    chunk_size: usize,
    eof: bool,
    pending: Option<Token>,
}

impl<R> fmt::Debug for TokenStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStream")
            .field("offset", &(self.consumed + self.pos as u64))
            .field("bytes_read", &self.bytes_read)
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<R: Read> TokenStream<R> {
    /// Tokenize `reader` with the default refill size.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Tokenize `reader`, pulling at most `chunk_size` bytes per read.
    /// A zero size is treated as one.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            consumed: 0,
            bytes_read: 0,
            chunk_size: chunk_size.max(1),
            eof: false,
            pending: None,
        }
    }

    /// Total bytes pulled from the reader so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Offset of the next unread byte from the start of input.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.consumed + self.pos as u64
    }

    /// Push a token back; the next call to [`next_token`](Self::next_token)
    /// returns it. Only one token may be pending at a time.
    pub fn unget(&mut self, token: Token) {
        debug_assert!(self.pending.is_none(), "only one token of lookahead");
        self.pending = Some(token);
    }

    /// Read the next token, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError::IllegalCharacter`] for a string that is not closed
    /// before end of input and [`LexError::Io`] when reading fails.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        if let Some(token) = self.pending.take() {
            return Ok(Some(token));
        }

        loop {
            match self.peek_byte()? {
                None => return Ok(None),
                Some(byte) if is_whitespace(byte) => self.pos += 1,
                Some(_) => break,
            }
        }

        let start = self.offset();
        match self.peek_byte()? {
            None => Ok(None),
            Some(b';') => {
                self.pos += 1;
                Ok(Some(Token::Semicolon))
            }
            Some(b':') => {
                self.pos += 1;
                Ok(Some(Token::Colon))
            }
            Some(b'@') => {
                self.pos += 1;
                self.read_string(start).map(|bytes| Some(Token::String(bytes)))
            }
            Some(_) => self.read_word().map(|bytes| Some(Token::Word(bytes))),
        }
    }

    fn read_word(&mut self) -> Result<Vec<u8>, LexError> {
        let mut word = Vec::new();
        loop {
            let available = &self.buf[self.pos..];
            let end = available
                .iter()
                .position(|&b| is_whitespace(b) || b == b';' || b == b':')
                .unwrap_or(available.len());
            word.extend_from_slice(&available[..end]);
            self.pos += end;
            if self.pos < self.buf.len() || !self.fill()? {
                return Ok(word);
            }
        }
    }

    fn read_string(&mut self, start: u64) -> Result<Vec<u8>, LexError> {
        let mut contents = Vec::new();
        loop {
            let available = &self.buf[self.pos..];
            match available.iter().position(|&b| b == b'@') {
                Some(at) => {
                    contents.extend_from_slice(&available[..at]);
                    self.pos += at + 1;
                    // The byte after `@` decides between an escape and the end,
                    // and may only arrive with the next chunk.
                    if self.peek_byte()? == Some(b'@') {
                        contents.push(b'@');
                        self.pos += 1;
                    } else {
                        return Ok(contents);
                    }
                }
                None => {
                    contents.extend_from_slice(available);
                    self.pos = self.buf.len();
                    if !self.fill()? {
                        return Err(LexError::IllegalCharacter { offset: start });
                    }
                }
            }
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, LexError> {
        while self.pos >= self.buf.len() {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos]))
    }

    fn fill(&mut self) -> Result<bool, LexError> {
        if self.eof {
            return Ok(false);
        }
        self.consumed += self.pos as u64;
        self.buf.drain(..self.pos);
        self.pos = 0;

        let start = self.buf.len();
        self.buf.resize(start + self.chunk_size, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[start..]) {
                Ok(read) => break read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(LexError::Io(err));
                }
            }
        };
        self.buf.truncate(start + read);
        self.bytes_read += read as u64;
        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }
}

const fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}
