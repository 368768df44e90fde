mod support;

use std::collections::BTreeMap;
use std::fs;

use rcs_core::reconstruct::ReconstructionError;
use rcs_core::{Archive, Error, Result};
use similar::{DiffTag, TextDiff};
use support::{ArchiveBuilder, Commit};
use tempfile::TempDir;

const CONCRETE: &str = "head\t1.2;\naccess;\nsymbols;\nlocks; strict;\n\n\
1.2\ndate\t2024.01.02.00.00.00;\tauthor alice;\tstate Exp;\nbranches\n\t1.2.1.1;\nnext\t1.1;\n\n\
1.1\ndate\t2024.01.01.00.00.00;\tauthor bob;\tstate Exp;\nbranches;\nnext\t;\n\n\
1.2.1.1\ndate\t2024.01.03.00.00.00;\tauthor carol;\tstate Exp;\nbranches;\nnext\t;\n\n\
desc\n@@\n\n\
1.2\nlog\n@add bar\n@\ntext\n@foo\nbar\nbaz\n@\n\n\
1.1\nlog\n@initial\n@\ntext\n@d2 1\n@\n\n\
1.2.1.1\nlog\n@add qux\n@\ntext\n@a3 1\nqux\n@\n";

fn origins(archive: &Archive, request: &str) -> Result<Vec<String>> {
    Ok(archive
        .annotate(request)?
        .iter()
        .map(|line| line.revision.to_string())
        .collect())
}

#[test]
fn concrete_scenario_extracts_and_blames() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("sample,v");
    fs::write(&path, CONCRETE).expect("write archive");
    let archive = Archive::open(&path)?;

    assert_eq!(archive.checkout("1.1")?.text, b"foo\nbaz\n");
    assert_eq!(archive.checkout("1.2")?.text, b"foo\nbar\nbaz\n");
    assert_eq!(origins(&archive, "1.2")?, ["1.1", "1.2", "1.1"]);

    let branch = archive.checkout("1.2.1.1")?;
    assert_eq!(branch.text, b"foo\nbar\nbaz\nqux\n");
    assert_eq!(branch.revision.author, "carol");
    assert_eq!(origins(&archive, "1.2.1.1")?, ["1.1", "1.2", "1.1", "1.2.1.1"]);

    // The branch number itself resolves to its newest commit.
    assert_eq!(archive.checkout("1.2.1")?.revision.number.to_string(), "1.2.1.1");
    Ok(())
}

#[test]
fn oversized_delete_count_is_an_error() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("sample,v");
    fs::write(&path, CONCRETE.replace("@d2 1\n@", "@d2 18446744073709551615\n@"))
        .expect("write archive");
    let archive = Archive::open(&path)?;

    assert!(matches!(
        archive.checkout("1.1"),
        Err(Error::Reconstruction(ReconstructionError::DeltaOutOfRange { .. }))
    ));
    assert!(matches!(
        archive.annotate("1.2"),
        Err(Error::Reconstruction(ReconstructionError::InconsistentDeltaCount { .. }))
    ));
    assert_eq!(archive.checkout("1.2")?.text, b"foo\nbar\nbaz\n");
    Ok(())
}

fn history() -> ArchiveBuilder {
    ArchiveBuilder::new()
        .commit(Commit::new("a\nb\nc\n").author("alice").log("start"))
        .commit(Commit::new("a\nb\nx1\nc\ny1\n").author("bob"))
        .commit(Commit::new("b\nx1\nz1\nc\ny1\n").author("alice"))
        .commit(Commit::new("b\nz1\nc\ny1\nw1\nw2\n").author("carol"))
        .branch(
            2,
            2,
            vec![
                Commit::new("a\nq1\nb\nx1\nc\ny1\n").author("dave"),
                Commit::new("a\nq1\nb\nx1\ny1\nq2\n").author("dave"),
            ],
        )
        .branch(3, 4, vec![Commit::new("b\nx1\nz1\nc\ny1\nv@1 mail@example.org\n")])
        .symbol("BRANCH", "1.2.0.2")
        .symbol("OTHER", "1.3.0.4")
        .symbol("START", "1.1")
}

#[test]
fn every_revision_round_trips() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let builder = history();
    let archive = Archive::open(builder.write(temp.path(), "file.txt"))?;

    for (number, text) in builder.expected() {
        let checkout = archive.checkout(&number)?;
        assert_eq!(checkout.revision.number.to_string(), number);
        assert_eq!(String::from_utf8_lossy(&checkout.text), text, "revision {number}");
    }
    assert_eq!(archive.checkout("BRANCH")?.text, b"a\nq1\nb\nx1\ny1\nq2\n");
    assert_eq!(archive.checkout("START")?.text, b"a\nb\nc\n");
    assert_eq!(archive.checkout("")?.text, b"b\nz1\nc\ny1\nw1\nw2\n");
    Ok(())
}

/// Line provenance computed by replaying forward diffs of the texts.
fn replayed_blame(steps: &[(&str, &str)]) -> Vec<String> {
    let (first, text) = steps[0];
    let mut labels: Vec<String> = text.lines().map(|_| first.to_owned()).collect();
    let mut previous = text;
    for &(revision, text) in &steps[1..] {
        let diff = TextDiff::from_lines(previous, text);
        let mut next = Vec::new();
        for op in diff.ops() {
            let (tag, old, new) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => next.extend(labels[old].iter().cloned()),
                DiffTag::Delete => {}
                DiffTag::Insert | DiffTag::Replace => {
                    next.extend(new.map(|_| revision.to_owned()));
                }
            }
        }
        labels = next;
        previous = text;
    }
    labels
}

fn tally(labels: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn blame_partitions_lines_by_surviving_contribution() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let archive = Archive::open(history().write(temp.path(), "file.txt"))?;

    let trunk = [
        ("1.1", "a\nb\nc\n"),
        ("1.2", "a\nb\nx1\nc\ny1\n"),
        ("1.3", "b\nx1\nz1\nc\ny1\n"),
        ("1.4", "b\nz1\nc\ny1\nw1\nw2\n"),
    ];
    for end in 1..=trunk.len() {
        let target = trunk[end - 1].0;
        let expected = replayed_blame(&trunk[..end]);
        assert_eq!(tally(&origins(&archive, target)?), tally(&expected), "revision {target}");
    }

    let branch = [
        ("1.1", "a\nb\nc\n"),
        ("1.2", "a\nb\nx1\nc\ny1\n"),
        ("1.2.2.1", "a\nq1\nb\nx1\nc\ny1\n"),
        ("1.2.2.2", "a\nq1\nb\nx1\ny1\nq2\n"),
    ];
    let got = origins(&archive, "1.2.2.2")?;
    assert_eq!(tally(&got), tally(&replayed_blame(&branch)));
    assert_eq!(got, ["1.1", "1.2.2.1", "1.1", "1.2", "1.2", "1.2.2.2"]);

    let lines = archive.annotate("1.4")?;
    assert_eq!(lines[4].author, "carol");
    assert_eq!(lines[4].text, "w1\n");
    assert_eq!(lines[4].previous.as_ref().map(ToString::to_string).as_deref(), Some("1.3"));
    Ok(())
}

#[test]
fn escaped_at_signs_survive_reconstruction() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let archive = Archive::open(history().write(temp.path(), "file.txt"))?;
    let checkout = archive.checkout("OTHER")?;
    assert_eq!(checkout.revision.number.to_string(), "1.3.4.1");
    assert!(String::from_utf8_lossy(&checkout.text).ends_with("v@1 mail@example.org\n"));
    Ok(())
}
