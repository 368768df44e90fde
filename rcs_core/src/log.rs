//! File-log construction: cross-links revisions with their neighbours and
//! tags, then filters and orders them for display.

use std::collections::BTreeMap;

use rcs_api::{FileLog, LogEntry, RevisionGraph, RevisionNumber, TagInfo, TagTarget};

use crate::config::LogSort;
use crate::ResolutionError;

const MAIN: &str = "MAIN";
const HEAD: &str = "HEAD";

/// Tag state accumulated while walking the revisions.
#[derive(Debug)]
struct TagState {
    name: String,
    key: Vec<u32>,
    is_branch: bool,
    co_rev: Option<RevisionNumber>,
    branch_rev: Option<RevisionNumber>,
}

impl TagState {
    fn new(name: &str, target: &TagTarget) -> Self {
        Self {
            name: name.to_owned(),
            key: target
                .number()
                .map(|number| number.components().to_vec())
                .unwrap_or_default(),
            is_branch: target.is_branch(),
            co_rev: None,
            branch_rev: None,
        }
    }

    fn number(&self) -> Option<RevisionNumber> {
        RevisionNumber::from_components(self.key.clone())
    }
}

/// Build the log of `graph`, keeping only revisions visible from `filter`
/// and ordering them by `sort`.
///
/// `filter` is a revision or branch number, or a tag name including the
/// artificial `MAIN` (the principal branch, or the trunk) and `HEAD` (the
/// newest revision on `MAIN`). A revision is visible when it is the filter
/// revision, lies on the filter branch, or precedes it on an ancestor
/// branch.
///
/// # Errors
///
/// Returns [`ResolutionError::UnknownTag`] when `filter` is neither a number
/// nor a known tag.
pub fn build_log(
    graph: &RevisionGraph,
    filter: Option<&str>,
    sort: LogSort,
) -> Result<FileLog, ResolutionError> {
    let mut tags = collect_tags(graph);
    let mut entries: BTreeMap<RevisionNumber, LogEntry> = BTreeMap::new();
    let mut branch_of: BTreeMap<RevisionNumber, Vec<u32>> = BTreeMap::new();
    let mut history: Vec<Option<RevisionNumber>> = Vec::new();

    for revision in graph.revisions.values() {
        let number = &revision.number;
        let components = number.components();
        let depth = number.depth();
        if history.len() <= depth {
            history.resize(depth + 1, None);
        }

        let prev = history[depth]
            .clone()
            .filter(|prev| depth == 0 || prev.branch_prefix() == number.branch_prefix());
        let parent = depth
            .checked_sub(1)
            .and_then(|up| history[up].clone())
            .filter(|parent| parent.components() == &components[..components.len() - 2]);

        if let Some(prev) = &prev {
            if let Some(entry) = entries.get_mut(prev) {
                entry.next = Some(number.clone());
            }
        }

        let undead = if revision.is_dead() {
            prev.as_ref()
                .or(parent.as_ref())
                .and_then(|link| entries.get(link))
                .and_then(|entry| entry.undead.clone())
        } else {
            Some(number.clone())
        };

        let branch = if number.is_trunk() {
            Vec::new()
        } else {
            number.branch_prefix().to_vec()
        };

        let mut entry = LogEntry {
            number: number.clone(),
            timestamp: revision.timestamp,
            author: revision.author.clone(),
            state: revision.state.clone(),
            dead: revision.is_dead(),
            log: graph.logs.get(number).cloned().unwrap_or_default(),
            lock: graph.locks.get(number).cloned(),
            changes: graph.changes(number),
            prev,
            next: None,
            parent,
            undead,
            since: number.previous_existing(|candidate| graph.revision(candidate).is_some()),
            tags: Vec::new(),
            branches: Vec::new(),
            branch_points: Vec::new(),
        };

        for tag in &mut tags {
            if tag.is_branch {
                if tag.key == branch {
                    entry.branches.push(tag.name.clone());
                    tag.co_rev = Some(number.clone());
                }
                if tag.key.split_last().is_some_and(|(_, root)| root == components) {
                    entry.branch_points.push(tag.name.clone());
                    tag.branch_rev = Some(number.clone());
                    // An empty branch checks out as its branch point.
                    if tag.co_rev.is_none() {
                        tag.co_rev = Some(number.clone());
                    }
                }
            } else if tag.key == components {
                entry.tags.push(tag.name.clone());
                tag.co_rev = Some(number.clone());
            }
        }

        branch_of.insert(number.clone(), branch);
        entries.insert(number.clone(), entry);
        history[depth] = Some(number.clone());
    }

    add_head_tag(&mut tags, &mut entries);

    let visible = match filter.filter(|filter| !filter.is_empty()) {
        Some(filter) => Some(resolve_filter(filter, &tags)?),
        None => None,
    };

    let mut entries: Vec<LogEntry> = entries
        .into_values()
        .filter(|entry| {
            visible.as_ref().map_or(true, |(key, branch)| {
                let own_branch = branch_of
                    .get(&entry.number)
                    .map_or(&[][..], Vec::as_slice);
                let components = entry.number.components();
                components == key.as_slice()
                    || own_branch == key.as_slice()
                    || (components < key.as_slice() && branch.starts_with(own_branch))
            })
        })
        .collect();

    match sort {
        LogSort::Default => {}
        LogSort::Date => entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.number.cmp(&a.number))
        }),
        LogSort::Revision => entries.sort_by(|a, b| b.number.cmp(&a.number)),
    }

    Ok(FileLog {
        head: graph.head.clone(),
        principal_branch: graph.principal_branch.clone(),
        description: graph.description.clone(),
        entries,
        tags: tag_infos(&tags),
    })
}

/// The archive's symbols plus the artificial `MAIN`, replacing any symbol of
/// that name.
fn collect_tags(graph: &RevisionGraph) -> Vec<TagState> {
    let mut tags: Vec<TagState> = graph
        .tags
        .iter()
        .filter(|tag| tag.name != MAIN && tag.name != HEAD)
        .map(|tag| TagState::new(&tag.name, &tag.target()))
        .collect();

    let main = graph
        .principal_branch
        .as_deref()
        .and_then(|branch| TagTarget::parse(branch).ok())
        .unwrap_or(TagTarget::Trunk);
    tags.push(TagState::new(MAIN, &main));
    tags
}

/// `HEAD` is a plain tag on whatever `MAIN` checks out as.
fn add_head_tag(tags: &mut Vec<TagState>, entries: &mut BTreeMap<RevisionNumber, LogEntry>) {
    let co_rev = tags
        .iter()
        .find(|tag| tag.name == MAIN)
        .and_then(|main| main.co_rev.clone());
    let mut head = TagState {
        name: HEAD.to_owned(),
        key: Vec::new(),
        is_branch: false,
        co_rev: None,
        branch_rev: None,
    };
    if let Some(co_rev) = co_rev {
        if let Some(entry) = entries.get_mut(&co_rev) {
            entry.tags.push(HEAD.to_owned());
        }
        head.key = co_rev.components().to_vec();
        head.co_rev = Some(co_rev);
    }
    tags.push(head);
}

/// Resolve a log filter to its number and the branch whose history is shown.
fn resolve_filter(
    filter: &str,
    tags: &[TagState],
) -> Result<(Vec<u32>, Vec<u32>), ResolutionError> {
    let (key, is_branch) = match TagTarget::parse(filter) {
        Ok(target) => {
            let state = TagState::new(filter, &target);
            (state.key, state.is_branch)
        }
        Err(_) => {
            let tag = tags
                .iter()
                .find(|tag| tag.name == filter)
                .ok_or_else(|| ResolutionError::UnknownTag {
                    name: filter.to_owned(),
                })?;
            (tag.key.clone(), tag.is_branch)
        }
    };
    let branch = if is_branch {
        key.clone()
    } else if key.len() > 2 {
        key[..key.len() - 1].to_vec()
    } else {
        Vec::new()
    };
    Ok((key, branch))
}

fn tag_infos(tags: &[TagState]) -> Vec<TagInfo> {
    let mut infos: Vec<TagInfo> = tags
        .iter()
        .map(|tag| TagInfo {
            name: tag.name.clone(),
            number: tag.number(),
            is_branch: tag.is_branch,
            co_rev: tag.co_rev.clone(),
            branch_rev: tag.branch_rev.clone(),
            aliases: tags
                .iter()
                .filter(|other| {
                    other.name != tag.name
                        && other.is_branch == tag.is_branch
                        && other.key == tag.key
                })
                .map(|other| other.name.clone())
                .collect(),
        })
        .collect();
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    infos
}
