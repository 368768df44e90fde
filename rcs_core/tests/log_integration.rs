mod support;

use rcs_api::ChangeStats;
use rcs_core::config::{Config, LogSort};
use rcs_core::{Archive, Error, ResolutionError, Result};
use support::{ArchiveBuilder, Commit};
use tempfile::TempDir;

fn fixture(temp: &TempDir) -> ArchiveBuilder {
    let builder = ArchiveBuilder::new()
        .commit(Commit::new("a\nb\n").log("import").date("2023.05.01.10.00.00"))
        .commit(Commit::new("a\nb\nc\nd\n").log("grow").date("2023.05.03.10.00.00"))
        .commit(Commit::new("a\nd\n").log("shrink").date("2023.05.05.10.00.00"))
        .branch(
            2,
            2,
            vec![Commit::new("a\nb\nc\nd\ne\n")
                .log("branch work")
                .date("2023.05.04.10.00.00")],
        )
        .symbol("REL_2", "1.2")
        .symbol("FEATURE", "1.2.0.2")
        .lock("alice", "1.3")
        .description("sample file");
    builder.write(temp.path(), "file.txt");
    builder
}

#[test]
fn log_reports_change_counts_and_links() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    fixture(&temp);
    let archive = Archive::open(temp.path().join("file.txt,v"))?;
    let log = archive.log(None, None)?;

    assert_eq!(log.description.as_deref(), Some("sample file"));
    let numbers: Vec<String> = log.entries.iter().map(|e| e.number.to_string()).collect();
    assert_eq!(numbers, ["1.1", "1.2", "1.2.2.1", "1.3"]);

    let grow = &log.entries[1];
    assert_eq!(grow.log, "grow");
    assert_eq!(grow.changes, Some(ChangeStats::new(2, 0)));
    assert_eq!(grow.tags, ["REL_2"]);
    assert_eq!(grow.branch_points, ["FEATURE"]);

    let shrink = &log.entries[3];
    assert_eq!(shrink.changes, Some(ChangeStats::new(0, 2)));
    assert_eq!(shrink.lock.as_deref(), Some("alice"));
    assert_eq!(shrink.prev.as_ref().map(ToString::to_string).as_deref(), Some("1.2"));
    assert!(shrink.tags.contains(&"HEAD".to_owned()));

    let branch = &log.entries[2];
    assert_eq!(branch.changes, Some(ChangeStats::new(1, 0)));
    assert_eq!(branch.parent.as_ref().map(ToString::to_string).as_deref(), Some("1.2"));
    assert_eq!(branch.branches, ["FEATURE"]);
    assert_eq!(branch.since.as_ref().map(ToString::to_string).as_deref(), Some("1.2"));

    assert_eq!(log.entries[0].changes, None);
    Ok(())
}

#[test]
fn log_filters_and_sorts() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    fixture(&temp);
    let archive = Archive::open(temp.path().join("file.txt,v"))?;

    let by_date = archive.log(Some("FEATURE"), Some(LogSort::Date))?;
    let numbers: Vec<String> = by_date.entries.iter().map(|e| e.number.to_string()).collect();
    assert_eq!(numbers, ["1.2.2.1", "1.2", "1.1"]);

    let config = Config::from_toml("[log]\nsort = \"revision\"\n")?;
    let archive = Archive::with_config(temp.path().join("file.txt,v"), config)?;
    let by_rev = archive.log(None, None)?;
    assert_eq!(by_rev.entries[0].number.to_string(), "1.3");

    let page = by_rev.paged(1, Some(2));
    let numbers: Vec<String> = page.entries.iter().map(|e| e.number.to_string()).collect();
    assert_eq!(numbers, ["1.2.2.1", "1.2"]);

    assert!(matches!(
        archive.log(Some("MISSING"), None),
        Err(Error::Resolution(ResolutionError::UnknownTag { .. }))
    ));
    Ok(())
}

#[test]
fn small_chunks_produce_identical_results() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    fixture(&temp);
    let path = temp.path().join("file.txt,v");
    let default = Archive::open(&path)?;
    let tiny = Archive::with_config(&path, Config::from_toml("[parser]\nchunk_size = 1\n")?)?;

    assert_eq!(default.log(None, None)?, tiny.log(None, None)?);
    assert_eq!(default.checkout("FEATURE")?, tiny.checkout("FEATURE")?);
    assert_eq!(default.annotate("REL_2")?, tiny.annotate("REL_2")?);
    Ok(())
}
