//! Streaming RCS grammar parser driving a [`Sink`].
//!
//! The archive is read in four phases: the admin section, the revision
//! tree, the description, and the deltatexts. Each phase reports to the
//! sink as it goes; a sink can end the parse early by returning
//! [`STOP`](rcs_sink_api::STOP) from any callback.

use std::io::Read;

use chrono::NaiveDate;
use rcs_api::{Revision, RevisionNumber, RevisionNumberError};
use rcs_sink_api::Sink;
use tracing::debug;

use crate::lexer::{LexError, Token, TokenStream, DEFAULT_CHUNK_SIZE};

/// How a successful parse ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every deltatext was read and `parse_completed` was delivered.
    Completed,
    /// A sink callback asked to stop.
    StoppedEarly,
}

/// Grammar violation or unreadable input.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The tokenizer failed.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// A token other than the one the grammar requires.
    #[error("expected {wanted}, but saw {got}")]
    ExpectedToken {
        /// Token actually read.
        got: String,
        /// What the grammar required.
        wanted: String,
    },
    /// Input ended in the middle of the archive.
    #[error("unexpected end of archive, expected {wanted}")]
    UnexpectedEof {
        /// What the grammar required.
        wanted: String,
    },
    /// A revision date is malformed or predates 1970.
    #[error("invalid date {date:?} for revision {revision}")]
    InvalidDate {
        /// Revision carrying the date.
        revision: String,
        /// Raw date field.
        date: String,
    },
    /// A revision number in a position that requires one did not parse.
    #[error("invalid revision number in archive: {source}")]
    InvalidRevision {
        /// Parse failure.
        #[from]
        source: RevisionNumberError,
    },
}

type ParseResult<T> = Result<T, ParseError>;

/// Propagate a sink's stop request out of the current phase.
macro_rules! emit {
    ($call:expr) => {
        if $call.is_break() {
            return Ok(Phase::Stopped);
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Done,
    Stopped,
}

/// Parse an archive from `reader` with the default refill size.
///
/// # Errors
///
/// Returns [`ParseError`] when the input is not a well-formed archive.
pub fn parse<R: Read, S: Sink + ?Sized>(reader: R, sink: &mut S) -> ParseResult<ParseOutcome> {
    Parser::new(reader).run(sink)
}

/// Single-use parser over one archive.
#[derive(Debug)]
pub struct Parser<R> {
    tokens: TokenStream<R>,
}

impl<R: Read> Parser<R> {
    /// Parse `reader` with the default refill size.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Parse `reader`, refilling `chunk_size` bytes at a time.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            tokens: TokenStream::with_chunk_size(reader, chunk_size),
        }
    }

    /// Bytes pulled from the reader so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.tokens.bytes_read()
    }

    /// Drive `sink` through the whole archive.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on lexical or grammar errors; a stop request
    /// from the sink is reported as [`ParseOutcome::StoppedEarly`].
    pub fn run<S: Sink + ?Sized>(&mut self, sink: &mut S) -> ParseResult<ParseOutcome> {
        let phases: [fn(&mut Self, &mut S) -> ParseResult<Phase>; 4] = [
            Self::parse_admin,
            Self::parse_tree,
            Self::parse_description,
            Self::parse_deltatexts,
        ];
        for phase in phases {
            if phase(self, sink)? == Phase::Stopped {
                debug!(offset = self.tokens.offset(), "parse stopped early by sink");
                return Ok(ParseOutcome::StoppedEarly);
            }
        }
        Ok(ParseOutcome::Completed)
    }

    fn parse_admin<S: Sink + ?Sized>(&mut self, sink: &mut S) -> ParseResult<Phase> {
        loop {
            let token = self.expect_any("admin keyword")?;
            if token.starts_with_digit() || token.is_word(b"desc") {
                self.tokens.unget(token);
                break;
            }
            let Token::Word(keyword) = &token else {
                return Err(expected(&token, "admin keyword"));
            };

            match keyword.as_slice() {
                b"head" => {
                    if let Some(word) = self.optional_word("head revision")? {
                        let revision = RevisionNumber::parse(&lossy(&word))?;
                        emit!(sink.set_head_revision(&revision));
                        self.expect_semicolon()?;
                    }
                }
                b"branch" => {
                    if let Some(word) = self.optional_word("principal branch")? {
                        emit!(sink.set_principal_branch(&lossy(&word)));
                        self.expect_semicolon()?;
                    }
                }
                b"access" => {
                    let users: Vec<String> = self
                        .until_semicolon("access list")?
                        .iter()
                        .map(|token| lossy(token.bytes()))
                        .collect();
                    if !users.is_empty() {
                        emit!(sink.set_access(&users));
                    }
                }
                b"symbols" => loop {
                    let name = self.expect_any("symbol name")?;
                    if name == Token::Semicolon {
                        break;
                    }
                    self.expect_colon()?;
                    let number = self.expect_any("symbol revision")?;
                    emit!(sink.define_tag(&lossy(name.bytes()), &lossy(number.bytes())));
                },
                b"locks" => loop {
                    let locker = self.expect_any("lock holder")?;
                    if locker == Token::Semicolon {
                        break;
                    }
                    self.expect_colon()?;
                    let number = self.expect_any("locked revision")?;
                    let revision = RevisionNumber::parse(&lossy(number.bytes()))?;
                    emit!(sink.set_locker(&revision, &lossy(locker.bytes())));
                },
                b"strict" => {
                    emit!(sink.set_locking("strict"));
                    self.expect_semicolon()?;
                }
                b"comment" => {
                    if let Some(comment) = self.optional_word("comment leader")? {
                        emit!(sink.set_comment(&lossy(&comment)));
                        self.expect_semicolon()?;
                    }
                }
                b"expand" => {
                    if let Some(mode) = self.optional_word("expansion mode")? {
                        emit!(sink.set_expansion(&lossy(&mode)));
                        self.expect_semicolon()?;
                    }
                }
                _ => {
                    self.until_semicolon("newphrase terminator")?;
                }
            }
        }

        debug!(offset = self.tokens.offset(), "admin section complete");
        emit!(sink.admin_completed());
        Ok(Phase::Done)
    }

    fn parse_tree<S: Sink + ?Sized>(&mut self, sink: &mut S) -> ParseResult<Phase> {
        loop {
            let token = self.expect_any("revision number or desc")?;
            if token.is_word(b"desc") {
                self.tokens.unget(token);
                break;
            }
            let revision = self.parse_tree_entry(&token)?;
            emit!(sink.define_revision(&revision));
        }

        debug!(offset = self.tokens.offset(), "revision tree complete");
        emit!(sink.tree_completed());
        Ok(Phase::Done)
    }

    fn parse_tree_entry(&mut self, number: &Token) -> ParseResult<Revision> {
        let Token::Word(raw) = number else {
            return Err(expected(number, "revision number"));
        };
        let raw = lossy(raw);
        let number = RevisionNumber::parse(&raw)?;

        self.expect_word(b"date")?;
        let date = lossy(self.expect_any("date")?.bytes());
        self.expect_semicolon()?;
        let timestamp = parse_date(&date).ok_or_else(|| ParseError::InvalidDate {
            revision: raw.clone(),
            date: date.clone(),
        })?;

        self.expect_word(b"author")?;
        let author = join_tokens(&self.until_semicolon("author terminator")?);

        self.expect_word(b"state")?;
        let state = join_tokens(&self.until_semicolon("state terminator")?);

        self.expect_word(b"branches")?;
        let branches = self
            .until_semicolon("branches terminator")?
            .iter()
            .map(|token| RevisionNumber::parse(&lossy(token.bytes())))
            .collect::<Result<Vec<_>, _>>()?;

        self.expect_word(b"next")?;
        let next = match self.optional_word("next revision")? {
            Some(word) => {
                self.expect_semicolon()?;
                Some(RevisionNumber::parse(&lossy(&word))?)
            }
            None => None,
        };

        loop {
            let token = self.expect_any("revision number or desc")?;
            if token.is_word(b"desc") || token.starts_with_digit() {
                self.tokens.unget(token);
                break;
            }
            self.until_semicolon("newphrase terminator")?;
        }

        Ok(Revision {
            number,
            timestamp,
            author,
            state,
            branches,
            next,
        })
    }

    fn parse_description<S: Sink + ?Sized>(&mut self, sink: &mut S) -> ParseResult<Phase> {
        self.expect_word(b"desc")?;
        let description = self.expect_string("description")?;
        emit!(sink.set_description(&lossy(&description)));
        Ok(Phase::Done)
    }

    fn parse_deltatexts<S: Sink + ?Sized>(&mut self, sink: &mut S) -> ParseResult<Phase> {
        while let Some(token) = self.tokens.next_token()? {
            let Token::Word(raw) = &token else {
                return Err(expected(&token, "revision number"));
            };
            let revision = RevisionNumber::parse(&lossy(raw))?;

            self.expect_word(b"log")?;
            let log = self.expect_string("log message")?;
            loop {
                let token = self.expect_any("text")?;
                if token.is_word(b"text") {
                    break;
                }
                if !matches!(token, Token::Word(_)) {
                    return Err(expected(&token, "text"));
                }
                self.tokens.unget(token);
                self.until_semicolon("newphrase terminator")?;
            }
            let text = self.expect_string("deltatext")?;
            emit!(sink.set_revision_info(&revision, &lossy(&log), &text));
        }

        debug!(offset = self.tokens.offset(), "deltatexts complete");
        emit!(sink.parse_completed());
        Ok(Phase::Done)
    }

    fn expect_any(&mut self, wanted: &str) -> ParseResult<Token> {
        self.tokens
            .next_token()?
            .ok_or_else(|| ParseError::UnexpectedEof {
                wanted: wanted.to_owned(),
            })
    }

    fn expect_word(&mut self, word: &[u8]) -> ParseResult<()> {
        let wanted = String::from_utf8_lossy(word);
        let token = self.expect_any(&wanted)?;
        if token.is_word(word) {
            Ok(())
        } else {
            Err(expected(&token, &wanted))
        }
    }

    fn expect_semicolon(&mut self) -> ParseResult<()> {
        match self.expect_any(";")? {
            Token::Semicolon => Ok(()),
            other => Err(expected(&other, ";")),
        }
    }

    fn expect_colon(&mut self) -> ParseResult<()> {
        match self.expect_any(":")? {
            Token::Colon => Ok(()),
            other => Err(expected(&other, ":")),
        }
    }

    fn expect_string(&mut self, wanted: &str) -> ParseResult<Vec<u8>> {
        match self.expect_any(wanted)? {
            Token::String(bytes) => Ok(bytes),
            other => Err(expected(&other, wanted)),
        }
    }

    /// A value that may be omitted before its `;`. Returns `None` when the
    /// `;` came first and has been consumed.
    fn optional_word(&mut self, wanted: &str) -> ParseResult<Option<Vec<u8>>> {
        match self.expect_any(wanted)? {
            Token::Semicolon => Ok(None),
            Token::Word(bytes) | Token::String(bytes) => Ok(Some(bytes)),
            other @ Token::Colon => Err(expected(&other, wanted)),
        }
    }

    fn until_semicolon(&mut self, wanted: &str) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            match self.expect_any(wanted)? {
                Token::Semicolon => return Ok(tokens),
                token => tokens.push(token),
            }
        }
    }
}

fn expected(got: &Token, wanted: &str) -> ParseError {
    ParseError::ExpectedToken {
        got: got.to_string(),
        wanted: wanted.to_owned(),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| lossy(token.bytes()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert an RCS `YY.MM.DD.hh.mm.ss` date to Unix seconds. Two-digit
/// years belong to the 1900s; anything before 1970 is rejected.
fn parse_date(date: &str) -> Option<i64> {
    let fields: Vec<&str> = date.split('.').collect();
    let [year, month, day, hour, minute, second] = fields.as_slice() else {
        return None;
    };
    let mut year: i32 = year.parse().ok()?;
    if fields[0].len() == 2 {
        year += 1900;
    }
    if year < 1970 {
        return None;
    }
    let timestamp = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?
        .and_hms_opt(hour.parse().ok()?, minute.parse().ok()?, second.parse().ok()?)?
        .and_utc()
        .timestamp();
    Some(timestamp)
}
