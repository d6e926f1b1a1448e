//! Card grouping for the rendered feed.
//!
//! Items of the grouped container type are laid out 3-up and are clustered
//! into [`DisplayGroup`]s; every other item renders full-width as a
//! [`DisplaySingle`]. Because results stream in page by page, a group left
//! under-full by one page is completed by the next one before any new group
//! is started.

use std::collections::HashSet;

use crate::item::{ItemId, ResultItem};

/// Default number of cards in a grouped row.
pub const DEFAULT_GROUP_SIZE: usize = 3;

/// A cluster of grouped cards rendered side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayGroup {
    items: Vec<ResultItem>,
    rank: f64,
}

impl DisplayGroup {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            rank: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, item: ResultItem) {
        self.rank = self.rank.max(item.display_order);
        self.items.push(item);
    }

    /// Members in arrival order.
    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    /// Highest `display_order` among the members.
    pub fn rank(&self) -> f64 {
        self.rank
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn contains(&self, id: &ItemId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }
}

/// A card rendered on its own row.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySingle {
    item: ResultItem,
}

impl DisplaySingle {
    /// The wrapped item.
    pub fn item(&self) -> &ResultItem {
        &self.item
    }

    /// The item's own `display_order`.
    pub fn rank(&self) -> f64 {
        self.item.display_order
    }
}

/// One renderable row of the feed.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayEntry {
    /// A 3-up row of grouped cards.
    Group(DisplayGroup),
    /// A full-width card.
    Single(DisplaySingle),
}

impl DisplayEntry {
    /// Ordering rank of the row.
    pub fn rank(&self) -> f64 {
        match self {
            Self::Group(group) => group.rank(),
            Self::Single(single) => single.rank(),
        }
    }

    /// Stable identity of the row: the id of its first item.
    ///
    /// A group only ever grows at its tail, so the key survives carry-over.
    pub fn key(&self) -> &ItemId {
        match self {
            Self::Group(group) => &group.items[0].id,
            Self::Single(single) => &single.item.id,
        }
    }

    /// Items rendered by this row.
    pub fn items(&self) -> &[ResultItem] {
        match self {
            Self::Group(group) => group.items(),
            Self::Single(single) => std::slice::from_ref(&single.item),
        }
    }
}

/// The ordered sequence of rows actually rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    entries: Vec<DisplayEntry>,
}

impl DisplayList {
    /// Rows in render order.
    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of the final row, which the visibility sentinel observes.
    pub fn last_key(&self) -> Option<&ItemId> {
        self.entries.last().map(DisplayEntry::key)
    }

    /// All rendered items, row by row.
    pub fn items(&self) -> impl Iterator<Item = &ResultItem> {
        self.entries.iter().flat_map(DisplayEntry::items)
    }

    /// Total number of rendered items.
    pub fn item_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.items().len()).sum()
    }

    /// Drops every row.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn grouped_ids(&self) -> HashSet<&ItemId> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                DisplayEntry::Group(group) => Some(group.items.iter().map(|item| &item.id)),
                DisplayEntry::Single(_) => None,
            })
            .flatten()
            .collect()
    }
}

/// Rule deciding which items cluster and how large clusters get.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupingPolicy {
    grouped_type: String,
    group_size: usize,
}

impl GroupingPolicy {
    /// Creates a policy clustering `grouped_type` items into rows of
    /// `group_size` (at least one).
    pub fn new(grouped_type: impl Into<String>, group_size: usize) -> Self {
        Self {
            grouped_type: grouped_type.into(),
            group_size: group_size.max(1),
        }
    }

    /// The container type that clusters.
    pub fn grouped_type(&self) -> &str {
        &self.grouped_type
    }

    /// Maximum number of items per group.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Builds the display list for a fresh (page 1 or filter reset) load.
    pub fn build(&self, items: &[ResultItem]) -> DisplayList {
        let (grouped, others) = self.partition(items.iter());

        let mut entries = Vec::with_capacity(others.len() + grouped.len() / self.group_size + 1);
        self.fill_groups(grouped, None, &mut entries);
        entries.extend(others.into_iter().map(single));
        sort_by_rank(&mut entries);

        DisplayList { entries }
    }

    /// Appends a follow-up page to an existing display list.
    ///
    /// Grouped items first complete the last under-full group (which keeps
    /// its position); the remaining rows are sorted among themselves by rank
    /// and appended. The existing prefix is never re-sorted.
    pub fn append(&self, list: &mut DisplayList, new_items: &[ResultItem]) {
        let already_grouped = list.grouped_ids();
        let (grouped, others) = self.partition(
            new_items
                .iter()
                .filter(|item| !(item.is_grouped(&self.grouped_type) && already_grouped.contains(&item.id))),
        );

        let carry = list.entries.iter().rposition(|entry| match entry {
            DisplayEntry::Group(group) => group.len() < self.group_size,
            DisplayEntry::Single(_) => false,
        });
        let carry = carry.and_then(|idx| match &mut list.entries[idx] {
            DisplayEntry::Group(group) => Some(group),
            DisplayEntry::Single(_) => None,
        });

        let mut appended = Vec::new();
        self.fill_groups(grouped, carry, &mut appended);
        appended.extend(others.into_iter().map(single));
        sort_by_rank(&mut appended);

        list.entries.extend(appended);
    }

    fn partition<'a>(
        &self,
        items: impl Iterator<Item = &'a ResultItem>,
    ) -> (Vec<ResultItem>, Vec<ResultItem>) {
        items
            .cloned()
            .partition(|item| item.is_grouped(&self.grouped_type))
    }

    fn fill_groups(
        &self,
        grouped: Vec<ResultItem>,
        mut carry: Option<&mut DisplayGroup>,
        out: &mut Vec<DisplayEntry>,
    ) {
        let mut current = DisplayGroup::new();

        for item in grouped {
            if let Some(group) = carry.as_deref_mut() {
                if group.contains(&item.id) {
                    continue;
                }
                group.push(item);
                if group.len() >= self.group_size {
                    carry = None;
                }
                continue;
            }

            current.push(item);
            if current.len() >= self.group_size {
                out.push(DisplayEntry::Group(std::mem::replace(
                    &mut current,
                    DisplayGroup::new(),
                )));
            }
        }

        if !current.is_empty() {
            out.push(DisplayEntry::Group(current));
        }
    }
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        Self::new("Type-One", DEFAULT_GROUP_SIZE)
    }
}

/// Stable, so equal ranks keep groups ahead of singles.
fn sort_by_rank(entries: &mut [DisplayEntry]) {
    entries.sort_by(|a, b| a.rank().total_cmp(&b.rank()));
}

fn single(item: ResultItem) -> DisplayEntry {
    DisplayEntry::Single(DisplaySingle { item })
}
