// ── Filter criteria ──

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::model::Categorized;

/// A predicate a collection evaluates against each entity.
///
/// Collections AND together every registered criteria.
pub trait FilterCriteria<T>: Send + Sync {
    fn matches(&self, item: &T) -> bool;
}

/// "Entities in category `c`", or everything when nothing is selected.
///
/// The selection is swapped atomically so a collection can evaluate the
/// criteria while a view changes it.
pub struct CategoryFilter<T: Categorized> {
    selected: ArcSwapOption<T::Category>,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Categorized> CategoryFilter<T> {
    /// A criteria that matches everything.
    pub fn new() -> Self {
        Self {
            selected: ArcSwapOption::empty(),
            _entity: PhantomData,
        }
    }

    /// A criteria fixed to `category`.
    pub fn pinned(category: T::Category) -> Self {
        Self {
            selected: ArcSwapOption::from_pointee(category),
            _entity: PhantomData,
        }
    }

    pub fn selected(&self) -> Option<T::Category> {
        self.selected.load().as_deref().copied()
    }

    pub fn set(&self, category: Option<T::Category>) {
        self.selected.store(category.map(Arc::new));
    }
}

impl<T: Categorized> Default for CategoryFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Categorized> FilterCriteria<T> for CategoryFilter<T> {
    fn matches(&self, item: &T) -> bool {
        self.selected().is_none_or(|category| item.category() == category)
    }
}

impl<T: Categorized> fmt::Debug for CategoryFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryFilter")
            .field("selected", &self.selected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ViewFile, ViewFileStatus};

    fn file(status: ViewFileStatus) -> ViewFile {
        ViewFile {
            name: "f".into(),
            is_dir: false,
            status,
            remote_size: Some(1),
            local_size: None,
        }
    }

    #[test]
    fn unselected_matches_everything() {
        let criteria = CategoryFilter::<ViewFile>::new();
        assert!(criteria.matches(&file(ViewFileStatus::Queued)));
        assert!(criteria.matches(&file(ViewFileStatus::Stopped)));
    }

    #[test]
    fn selection_swaps_in_place() {
        let criteria = CategoryFilter::<ViewFile>::new();
        criteria.set(Some(ViewFileStatus::Queued));
        assert!(criteria.matches(&file(ViewFileStatus::Queued)));
        assert!(!criteria.matches(&file(ViewFileStatus::Downloaded)));

        criteria.set(None);
        assert_eq!(criteria.selected(), None);
        assert!(criteria.matches(&file(ViewFileStatus::Downloaded)));
    }
}
