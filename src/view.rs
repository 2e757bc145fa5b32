//! View Helpers
//!
//! Presentation-neutral shaping of the cached state: groups with their
//! items in display order, completion counts and the overall phase.

use crate::models::{TodoGroup, TodoItem};
use crate::store::ListState;

/// How items are ordered inside a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemOrder {
    /// Position order, as stored
    #[default]
    Insertion,
    /// Completed items first, position order within each half
    CompletedFirst,
}

/// Completion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of<'a>(items: impl IntoIterator<Item = &'a TodoItem>) -> Self {
        items.into_iter().fold(Self::default(), |acc, item| Self {
            completed: acc.completed + usize::from(item.done),
            total: acc.total + 1,
        })
    }

    /// Percentage complete, 0 when there is nothing to do
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// One group ready for display
#[derive(Debug, Clone)]
pub struct GroupView<'a> {
    pub group: &'a TodoGroup,
    pub items: Vec<&'a TodoItem>,
    pub progress: Progress,
}

/// Groups in position order, each with its items in the requested order
pub fn group_views(state: &ListState, order: ItemOrder) -> Vec<GroupView<'_>> {
    let mut groups: Vec<&TodoGroup> = state.groups.iter().collect();
    groups.sort_by_key(|g| g.position);

    groups
        .into_iter()
        .map(|group| {
            let mut items: Vec<&TodoItem> = state.group_items(group.id).collect();
            items.sort_by_key(|i| i.position);
            if order == ItemOrder::CompletedFirst {
                // Stable, so position order survives within each half
                items.sort_by_key(|i| !i.done);
            }
            let progress = Progress::of(items.iter().copied());
            GroupView {
                group,
                items,
                progress,
            }
        })
        .collect()
}

/// What the list page should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Loading,
    NotFound,
    Ready,
}

impl ListPhase {
    pub fn of(state: &ListState) -> Self {
        if state.loading {
            ListPhase::Loading
        } else if state.is_not_found() {
            ListPhase::NotFound
        } else {
            ListPhase::Ready
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::StoreError;
    use crate::models::TodoList;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_state() -> (ListState, TodoGroup, TodoGroup) {
        let list = TodoList::new("Week");
        let work = TodoGroup::new(list.id, "Work", 1);
        let home = TodoGroup::new(list.id, "Home", 0);

        let mut done = TodoItem::new(list.id, work.id, "Done later", 1);
        done.set_done(true, Utc::now());

        let mut state = ListState::new();
        state.loading = false;
        state.items = vec![
            TodoItem::new(list.id, work.id, "First", 0),
            done,
            TodoItem::new(list.id, work.id, "Third", 2),
            TodoItem::new(list.id, home.id, "Laundry", 0),
        ];
        state.groups = vec![work.clone(), home.clone()];
        state.list = Some(list);
        (state, work, home)
    }

    fn texts(view: &GroupView<'_>) -> Vec<String> {
        view.items.iter().map(|i| i.text.clone()).collect()
    }

    #[test]
    fn test_group_views_in_position_order() {
        let (state, work, home) = make_state();
        let views = group_views(&state, ItemOrder::Insertion);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].group.id, home.id);
        assert_eq!(views[1].group.id, work.id);
        assert_eq!(texts(&views[1]), vec!["First", "Done later", "Third"]);
        assert_eq!(views[1].progress, Progress { completed: 1, total: 3 });
    }

    #[test]
    fn test_completed_first_order() {
        let (state, _, _) = make_state();
        let views = group_views(&state, ItemOrder::CompletedFirst);

        assert_eq!(texts(&views[1]), vec!["Done later", "First", "Third"]);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::default().percent(), 0.0);
        assert_eq!(Progress { completed: 1, total: 4 }.percent(), 25.0);

        let (state, _, _) = make_state();
        let overall = Progress::of(&state.items);
        assert_eq!(overall, Progress { completed: 1, total: 4 });
    }

    #[test]
    fn test_list_phase() {
        let (mut state, _, _) = make_state();
        assert_eq!(ListPhase::of(&state), ListPhase::Ready);

        state.loading = true;
        assert_eq!(ListPhase::of(&state), ListPhase::Loading);

        state.loading = false;
        state.error = Some(StoreError::NotFound(Uuid::new_v4().to_string()));
        assert_eq!(ListPhase::of(&state), ListPhase::NotFound);
    }
}
