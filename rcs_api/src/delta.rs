use serde::{Deserialize, Serialize};

/// Lines added and removed by one revision relative to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChangeStats {
    /// Number of added lines.
    pub added: u32,
    /// Number of removed lines.
    pub removed: u32,
}

impl ChangeStats {
    /// A stats instance with zero additions and removals.
    pub const ZERO: Self = Self {
        added: 0,
        removed: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(added: u32, removed: u32) -> Self {
        Self { added, removed }
    }

    /// Swap additions and removals, turning a reverse delta's counts into
    /// the forward change it undoes.
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self {
            added: self.removed,
            removed: self.added,
        }
    }
}

/// One edit command of an RCS deltatext.
///
/// Line positions are 1-based and always refer to the source text the
/// script is applied to, never to a partially edited copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaCommand<'a> {
    /// `aN M`: insert `lines` after source line `at` (0 inserts at the top).
    Add {
        /// Source line the insertion follows.
        at: usize,
        /// Inserted lines, each keeping its trailing newline if it had one.
        lines: Vec<&'a [u8]>,
    },
    /// `dN M`: remove `count` source lines starting at line `at`.
    Delete {
        /// First removed source line.
        at: usize,
        /// Number of removed lines.
        count: usize,
    },
}

impl DeltaCommand<'_> {
    /// Number of lines the command inserts or removes.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Add { lines, .. } => lines.len(),
            Self::Delete { count, .. } => *count,
        }
    }
}

/// Failure to decode an edit script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// A command line is neither `aN M` nor `dN M`.
    #[error("malformed delta command {line:?}")]
    MalformedCommand {
        /// The offending line, lossily decoded.
        line: String,
    },
    /// An add command announced more lines than the script contains.
    #[error("delta add command wants {wanted} lines but only {available} remain")]
    Truncated {
        /// Lines announced by the command.
        wanted: usize,
        /// Lines left in the script.
        available: usize,
    },
}

/// A parsed deltatext: the ordered edit commands borrowed from the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeltaScript<'a> {
    commands: Vec<DeltaCommand<'a>>,
}

impl<'a> DeltaScript<'a> {
    /// Decode an edit script. Blank command lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError`] when a command is malformed or an add command
    /// runs past the end of the text.
    pub fn parse(text: &'a [u8]) -> Result<Self, DeltaError> {
        let lines = split_lines(text);
        let mut commands = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let raw = lines[index];
            index += 1;
            let line = trim_line_end(raw);
            if line.is_empty() {
                continue;
            }

            let (kind, at, count) = parse_command(line).ok_or_else(|| {
                DeltaError::MalformedCommand {
                    line: String::from_utf8_lossy(line).into_owned(),
                }
            })?;

            if kind == b'a' {
                let available = lines.len() - index;
                if count > available {
                    return Err(DeltaError::Truncated {
                        wanted: count,
                        available,
                    });
                }
                commands.push(DeltaCommand::Add {
                    at,
                    lines: lines[index..index + count].to_vec(),
                });
                index += count;
            } else {
                commands.push(DeltaCommand::Delete { at, count });
            }
        }

        Ok(Self { commands })
    }

    /// The commands in script order.
    #[must_use]
    pub fn commands(&self) -> &[DeltaCommand<'a>] {
        &self.commands
    }

    /// Totals of added and removed lines.
    #[must_use]
    pub fn stats(&self) -> ChangeStats {
        let mut stats = ChangeStats::ZERO;
        for command in &self.commands {
            let count = u32::try_from(command.count()).unwrap_or(u32::MAX);
            match command {
                DeltaCommand::Add { .. } => stats.added = stats.added.saturating_add(count),
                DeltaCommand::Delete { .. } => {
                    stats.removed = stats.removed.saturating_add(count);
                }
            }
        }
        stats
    }

    /// Net change in line count when the script is applied, saturating at
    /// the bounds of `isize`.
    #[must_use]
    pub fn line_delta(&self) -> isize {
        self.commands.iter().fold(0isize, |delta, command| match command {
            DeltaCommand::Add { lines, .. } => delta.saturating_add(to_signed(lines.len())),
            DeltaCommand::Delete { count, .. } => delta.saturating_sub(to_signed(*count)),
        })
    }

    /// Number of lines the script inserts.
    #[must_use]
    pub fn added_lines(&self) -> usize {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeltaCommand::Add { lines, .. } => Some(lines.len()),
                DeltaCommand::Delete { .. } => None,
            })
            .sum()
    }
}

/// Split text into lines, each keeping its `\n`; a final unterminated line
/// is kept as is.
#[must_use]
pub fn split_lines(text: &[u8]) -> Vec<&[u8]> {
    text.split_inclusive(|&b| b == b'\n').collect()
}

fn to_signed(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_command(line: &[u8]) -> Option<(u8, usize, usize)> {
    let (&kind, rest) = line.split_first()?;
    if kind != b'a' && kind != b'd' {
        return None;
    }
    let rest = std::str::from_utf8(rest).ok()?;
    let mut fields = rest.split_ascii_whitespace();
    let at = fields.next()?.parse().ok()?;
    let count = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((kind, at, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_and_delete_commands() {
        let script = DeltaScript::parse(b"d2 1\na3 2\nfoo\nbar\n").expect("parse");
        assert_eq!(
            script.commands(),
            &[
                DeltaCommand::Delete { at: 2, count: 1 },
                DeltaCommand::Add {
                    at: 3,
                    lines: vec![&b"foo\n"[..], &b"bar\n"[..]],
                },
            ]
        );
        assert_eq!(script.stats(), ChangeStats::new(2, 1));
        assert_eq!(script.line_delta(), 1);
    }

    #[test]
    fn added_lines_may_look_like_commands() {
        let script = DeltaScript::parse(b"a0 1\nd1 1\n").expect("parse");
        assert_eq!(
            script.commands(),
            &[DeltaCommand::Add {
                at: 0,
                lines: vec![&b"d1 1\n"[..]],
            }]
        );
    }

    #[test]
    fn keeps_missing_final_newline() {
        let script = DeltaScript::parse(b"a1 1\nlast").expect("parse");
        assert_eq!(
            script.commands(),
            &[DeltaCommand::Add {
                at: 1,
                lines: vec![&b"last"[..]],
            }]
        );
    }

    #[test]
    fn empty_script_has_no_commands() {
        let script = DeltaScript::parse(b"").expect("parse");
        assert!(script.commands().is_empty());
        assert_eq!(script.stats(), ChangeStats::ZERO);
    }

    #[test]
    fn rejects_malformed_and_truncated_scripts() {
        assert!(matches!(
            DeltaScript::parse(b"x1 2\n"),
            Err(DeltaError::MalformedCommand { .. })
        ));
        assert!(matches!(
            DeltaScript::parse(b"d1\n"),
            Err(DeltaError::MalformedCommand { .. })
        ));
        assert_eq!(
            DeltaScript::parse(b"a1 3\nonly\n"),
            Err(DeltaError::Truncated {
                wanted: 3,
                available: 1
            })
        );
    }

    #[test]
    fn huge_delete_counts_saturate() {
        let script =
            DeltaScript::parse(b"d1 18446744073709551615\nd2 18446744073709551615\na3 1\nx\n")
                .expect("parse");
        assert_eq!(script.line_delta(), isize::MIN + 1);
        assert_eq!(script.added_lines(), 1);
        assert_eq!(script.stats(), ChangeStats::new(1, u32::MAX));
    }

    #[test]
    fn inverted_stats_swap_counts() {
        assert_eq!(ChangeStats::new(4, 1).inverted(), ChangeStats::new(1, 4));
    }
}
