//! Completion figures derived from lists. Nothing here is cached; every call
//! recounts from the current tasks.

use super::list::TodoList;
use super::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.completed, self.total)
    }
}

/// `round(completed / total * 100)`, rounding halves up. Zero when `total` is zero.
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((completed * 200 + total) / (total * 2)) as u8
}

pub fn completed_count(list: &TodoList) -> usize {
    list.tasks.iter().filter(|t| t.completed).count()
}

pub fn pending_count(list: &TodoList) -> usize {
    list.tasks.iter().filter(|t| !t.completed).count()
}

pub fn completion_percentage(list: &TodoList) -> u8 {
    percentage(completed_count(list), list.tasks.len())
}

pub fn list_progress(list: &TodoList) -> Progress {
    Progress {
        completed: completed_count(list),
        total: list.tasks.len(),
    }
}

/// Progress across every list in the store.
pub fn overall_progress(store: &Store) -> Progress {
    store
        .lists()
        .iter()
        .map(list_progress)
        .fold(Progress::default(), |acc, p| Progress {
            completed: acc.completed + p.completed,
            total: acc.total + p.total,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::list::ListId;
    use crate::core::task::Task;
    use chrono::Utc;

    fn list_with(done: usize, open: usize) -> TodoList {
        let mut list = TodoList::with_id(ListId::from("1"), "Work");
        for i in 0..done {
            let mut t = Task::new(list.id.clone(), format!("done {}", i));
            t.toggle(Utc::now());
            list.tasks.push(t);
        }
        for i in 0..open {
            list.tasks.push(Task::new(list.id.clone(), format!("open {}", i)));
        }
        list
    }

    #[test]
    fn empty_list_is_zero_percent() {
        let list = list_with(0, 0);
        assert_eq!(completion_percentage(&list), 0);
        assert_eq!(pending_count(&list), 0);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(completion_percentage(&list_with(1, 2)), 33);
        assert_eq!(completion_percentage(&list_with(2, 1)), 67);
        assert_eq!(completion_percentage(&list_with(1, 7)), 13);
        assert_eq!(completion_percentage(&list_with(3, 0)), 100);
    }

    #[test]
    fn percentage_stays_in_bounds() {
        for total in 0..40 {
            for completed in 0..=total {
                assert!(percentage(completed, total) <= 100);
            }
        }
        assert_eq!(percentage(5, 3), 100);
    }

    #[test]
    fn counts_pending_and_completed() {
        let list = list_with(2, 3);
        let p = list.progress();
        assert_eq!(p.completed, 2);
        assert_eq!(p.pending(), 3);
        assert_eq!(pending_count(&list), 3);
        assert_eq!(p.percentage(), 40);
    }

    #[test]
    fn pending_never_underflows() {
        let p = Progress { completed: 5, total: 3 };
        assert_eq!(p.pending(), 0);
        assert_eq!(p.percentage(), 100);
    }

    #[test]
    fn overall_sums_every_list() {
        let store = Store::from_lists(vec![list_with(1, 1), {
            let mut l = list_with(2, 0);
            l.id = ListId::from("2");
            l
        }]);
        let p = overall_progress(&store);
        assert_eq!(p.completed, 3);
        assert_eq!(p.total, 4);
        assert_eq!(p.percentage(), 75);
    }
}
