//! Builds RCS archives from successive file texts for integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use similar::{DiffTag, TextDiff};

/// One commit of a test archive.
#[derive(Debug, Clone)]
pub struct Commit {
    pub text: String,
    pub author: String,
    pub state: String,
    pub log: String,
    pub date: Option<String>,
}

impl Commit {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            author: "jrandom".to_owned(),
            state: "Exp".to_owned(),
            log: String::new(),
            date: None,
        }
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = author.to_owned();
        self
    }

    pub fn log(mut self, log: &str) -> Self {
        self.log = log.to_owned();
        self
    }

    pub fn dead(mut self) -> Self {
        self.state = "dead".to_owned();
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = Some(date.to_owned());
        self
    }
}

#[derive(Debug, Clone)]
struct BranchSpec {
    point: usize,
    number: u32,
    commits: Vec<Commit>,
}

/// Trunk revisions are numbered `1.1`, `1.2`, ... in commit order; branches
/// hang off trunk revisions as `1.N.B.1`, `1.N.B.2`, ...
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    trunk: Vec<Commit>,
    branches: Vec<BranchSpec>,
    symbols: Vec<(String, String)>,
    locks: Vec<(String, String)>,
    principal_branch: Option<String>,
    description: String,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trunk commit.
    pub fn commit(mut self, commit: Commit) -> Self {
        self.trunk.push(commit);
        self
    }

    /// Add branch `1.<point>.<number>` rooted at trunk revision `1.<point>`.
    pub fn branch(mut self, point: usize, number: u32, commits: Vec<Commit>) -> Self {
        self.branches.push(BranchSpec {
            point,
            number,
            commits,
        });
        self
    }

    pub fn symbol(mut self, name: &str, number: &str) -> Self {
        self.symbols.push((name.to_owned(), number.to_owned()));
        self
    }

    pub fn lock(mut self, user: &str, number: &str) -> Self {
        self.locks.push((user.to_owned(), number.to_owned()));
        self
    }

    pub fn principal_branch(mut self, branch: &str) -> Self {
        self.principal_branch = Some(branch.to_owned());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Text each revision should check out as.
    pub fn expected(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .trunk
            .iter()
            .enumerate()
            .map(|(index, commit)| (format!("1.{}", index + 1), commit.text.clone()))
            .collect();
        for branch in &self.branches {
            for (index, commit) in branch.commits.iter().enumerate() {
                out.push((
                    format!("1.{}.{}.{}", branch.point, branch.number, index + 1),
                    commit.text.clone(),
                ));
            }
        }
        out
    }

    pub fn build(&self) -> String {
        assert!(!self.trunk.is_empty(), "archive needs a trunk commit");
        let head = self.trunk.len();
        let mut out = String::new();

        writeln!(out, "head\t1.{head};").unwrap();
        if let Some(branch) = &self.principal_branch {
            writeln!(out, "branch\t{branch};").unwrap();
        }
        out.push_str("access;\nsymbols");
        for (name, number) in &self.symbols {
            write!(out, "\n\t{name}:{number}").unwrap();
        }
        out.push_str(";\nlocks");
        for (user, number) in &self.locks {
            write!(out, "\n\t{user}:{number}").unwrap();
        }
        out.push_str("; strict;\ncomment\t@# @;\n\n\n");

        let mut day = 0;
        let mut next_date = |commit: &Commit| {
            day += 1;
            commit
                .date
                .clone()
                .unwrap_or_else(|| format!("2024.01.{:02}.12.00.00", day.min(28)))
        };
        let trunk_dates: Vec<String> = self.trunk.iter().map(&mut next_date).collect();
        let branch_dates: Vec<Vec<String>> = self
            .branches
            .iter()
            .map(|branch| branch.commits.iter().map(&mut next_date).collect())
            .collect();

        for index in (0..head).rev() {
            let number = format!("1.{}", index + 1);
            let roots: Vec<String> = self
                .branches
                .iter()
                .filter(|branch| branch.point == index + 1 && !branch.commits.is_empty())
                .map(|branch| format!("{number}.{}.1", branch.number))
                .collect();
            let next = if index == 0 {
                String::new()
            } else {
                format!("1.{index}")
            };
            tree_entry(&mut out, &number, &trunk_dates[index], &self.trunk[index], &roots, &next);
        }
        for (branch, dates) in self.branches.iter().zip(&branch_dates) {
            for (index, commit) in branch.commits.iter().enumerate() {
                let number = branch_revision(branch, index);
                let next = if index + 1 < branch.commits.len() {
                    branch_revision(branch, index + 1)
                } else {
                    String::new()
                };
                tree_entry(&mut out, &number, &dates[index], commit, &[], &next);
            }
        }

        write!(out, "\ndesc\n@{}@\n", escape(&self.description)).unwrap();

        for index in (0..head).rev() {
            let commit = &self.trunk[index];
            let text = if index + 1 == head {
                commit.text.clone()
            } else {
                diff_script(&self.trunk[index + 1].text, &commit.text)
            };
            deltatext(&mut out, &format!("1.{}", index + 1), &commit.log, &text);
        }
        for branch in &self.branches {
            let mut base = &self.trunk[branch.point - 1].text;
            for (index, commit) in branch.commits.iter().enumerate() {
                let script = diff_script(base, &commit.text);
                deltatext(&mut out, &branch_revision(branch, index), &commit.log, &script);
                base = &commit.text;
            }
        }
        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name},v"));
        fs::write(&path, self.build()).expect("write archive");
        path
    }
}

fn branch_revision(branch: &BranchSpec, index: usize) -> String {
    format!("1.{}.{}.{}", branch.point, branch.number, index + 1)
}

fn tree_entry(out: &mut String, number: &str, date: &str, commit: &Commit, roots: &[String], next: &str) {
    write!(
        out,
        "\n{number}\ndate\t{date};\tauthor {};\tstate {};\nbranches",
        commit.author, commit.state
    )
    .unwrap();
    for root in roots {
        write!(out, "\n\t{root}").unwrap();
    }
    writeln!(out, ";\nnext\t{next};").unwrap();
}

fn deltatext(out: &mut String, number: &str, log: &str, text: &str) {
    write!(
        out,
        "\n\n{number}\nlog\n@{}@\ntext\n@{}@\n",
        escape(log),
        escape(text)
    )
    .unwrap();
}

/// Edit script turning `from` into `to`, in RCS `a`/`d` form.
pub fn diff_script(from: &str, to: &str) -> String {
    let diff = TextDiff::from_lines(from, to);
    let new_lines = diff.new_slices();
    let mut script = String::new();
    for op in diff.ops() {
        let (tag, old, new) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {}
            DiffTag::Delete => writeln!(script, "d{} {}", old.start + 1, old.len()).unwrap(),
            DiffTag::Insert => {
                writeln!(script, "a{} {}", old.start, new.len()).unwrap();
                script.extend(new_lines[new].iter().copied());
            }
            DiffTag::Replace => {
                writeln!(script, "d{} {}", old.start + 1, old.len()).unwrap();
                writeln!(script, "a{} {}", old.end, new.len()).unwrap();
                script.extend(new_lines[new].iter().copied());
            }
        }
    }
    script
}

pub fn escape(text: &str) -> String {
    text.replace('@', "@@")
}
