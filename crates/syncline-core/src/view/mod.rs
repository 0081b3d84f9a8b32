// ── Derived filter view ──
//
// UI-facing state for one category axis: which categories can be
// selected (at least one entity would match) and which one is. The
// view is a pure function of the collection and the criteria, rebuilt
// wholesale whenever either changes.

mod criteria;

use std::sync::{Arc, Weak};

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

pub use criteria::{CategoryFilter, FilterCriteria};

use crate::model::Categorized;
use crate::observable::{Broadcaster, ListenerGuard, Subscription};
use crate::store::StreamedCollection;

// ── FilterView ───────────────────────────────────────────────────────

/// Flags for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFlags<C> {
    pub category: C,
    pub enabled: bool,
    pub selected: bool,
}

/// Immutable snapshot of a category axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterView<C> {
    /// No category selected: everything shown. Always enabled.
    pub all_selected: bool,
    /// Every category, in declaration order.
    pub categories: Vec<CategoryFlags<C>>,
}

impl<C> FilterView<C>
where
    C: Copy + Eq + IntoEnumIterator + Send + Sync + 'static,
{
    /// Build the view for `items` with `selected` as the current choice.
    pub fn compute<T>(items: &[Arc<T>], selected: Option<C>) -> Self
    where
        T: Categorized<Category = C>,
    {
        let categories = C::iter()
            .map(|category| {
                let pinned = CategoryFilter::<T>::pinned(category);
                CategoryFlags {
                    category,
                    enabled: items.iter().any(|item| pinned.matches(item)),
                    selected: selected == Some(category),
                }
            })
            .collect();

        Self {
            all_selected: selected.is_none(),
            categories,
        }
    }

    fn flags(&self, category: C) -> Option<&CategoryFlags<C>> {
        self.categories.iter().find(|f| f.category == category)
    }

    /// Whether `category` can be selected. `None` ("all") always can.
    pub fn is_enabled(&self, category: Option<C>) -> bool {
        category.is_none_or(|c| self.flags(c).is_some_and(|f| f.enabled))
    }

    pub fn is_selected(&self, category: Option<C>) -> bool {
        match category {
            None => self.all_selected,
            Some(c) => self.flags(c).is_some_and(|f| f.selected),
        }
    }

    /// The selected category, or `None` for "all".
    pub fn selected(&self) -> Option<C> {
        self.categories
            .iter()
            .find(|f| f.selected)
            .map(|f| f.category)
    }
}

// ── DerivedFilterView ────────────────────────────────────────────────

/// Owns a [`CategoryFilter`] registered with a collection and keeps a
/// [`FilterView`] of it current.
///
/// Collection changes recompute the view synchronously, inside the
/// collection's change notification.
pub struct DerivedFilterView<T: Categorized> {
    inner: Arc<ViewInner<T>>,
    _listener: ListenerGuard,
}

struct ViewInner<T: Categorized> {
    criteria: Arc<CategoryFilter<T>>,
    collection: Arc<StreamedCollection<T>>,
    view: Broadcaster<Arc<FilterView<T::Category>>>,
}

impl<T: Categorized> DerivedFilterView<T> {
    /// Register a fresh "all" criteria with `collection` and start
    /// tracking it.
    pub fn new(collection: Arc<StreamedCollection<T>>) -> Self {
        let criteria = Arc::new(CategoryFilter::<T>::new());
        collection.register_criteria(Arc::clone(&criteria) as Arc<dyn FilterCriteria<T>>);

        let initial = FilterView::compute(&collection.snapshot(), None);
        let inner = Arc::new(ViewInner {
            criteria,
            collection: Arc::clone(&collection),
            view: Broadcaster::new(Arc::new(initial)),
        });

        let weak: Weak<ViewInner<T>> = Arc::downgrade(&inner);
        let listener = collection.listen(move |items| {
            if let Some(inner) = weak.upgrade() {
                inner.recompute(items);
            }
        });

        Self {
            inner,
            _listener: listener,
        }
    }

    /// Select `category` (`None` for all).
    ///
    /// Returns `false` without side effects when `category` is already
    /// selected or is currently disabled.
    pub fn set_selected(&self, category: Option<T::Category>) -> bool {
        let inner = &self.inner;
        if inner.criteria.selected() == category {
            return false;
        }
        if !inner.view.current().is_enabled(category) {
            debug!(?category, "ignoring selection of disabled category");
            return false;
        }

        debug!(?category, "category selected");
        inner.criteria.set(category);
        inner.recompute(&inner.collection.snapshot());
        inner.collection.reapply_filters();
        true
    }

    pub fn selected(&self) -> Option<T::Category> {
        self.inner.criteria.selected()
    }

    pub fn current(&self) -> Arc<FilterView<T::Category>> {
        self.inner.view.current()
    }

    pub fn subscribe(&self) -> Subscription<Arc<FilterView<T::Category>>> {
        self.inner.view.subscribe()
    }

    pub fn listen(
        &self,
        listener: impl Fn(&Arc<FilterView<T::Category>>) + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.inner.view.listen(listener)
    }
}

impl<T: Categorized> ViewInner<T> {
    fn recompute(&self, items: &[Arc<T>]) {
        let next = FilterView::compute(items, self.criteria.selected());
        self.view.publish_if(|view| {
            if **view == next {
                return false;
            }
            *view = Arc::new(next);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ViewFile, ViewFileStatus};

    fn file(name: &str, status: ViewFileStatus) -> ViewFile {
        ViewFile {
            name: name.into(),
            is_dir: false,
            status,
            remote_size: None,
            local_size: None,
        }
    }

    fn setup(files: Vec<ViewFile>) -> (Arc<StreamedCollection<ViewFile>>, DerivedFilterView<ViewFile>) {
        let collection = Arc::new(StreamedCollection::new());
        collection.replace_all(files);
        let view = DerivedFilterView::new(Arc::clone(&collection));
        (collection, view)
    }

    #[test]
    fn compute_marks_selection_and_enabled_categories() {
        let files = vec![Arc::new(file("a", ViewFileStatus::Downloaded))];
        let view = FilterView::compute(&files, Some(ViewFileStatus::Downloaded));

        assert!(!view.all_selected);
        assert!(view.is_selected(Some(ViewFileStatus::Downloaded)));
        assert!(view.is_enabled(Some(ViewFileStatus::Downloaded)));
        assert!(!view.is_enabled(Some(ViewFileStatus::Queued)));
    }

    #[test]
    fn enabled_flags_follow_collection() {
        let (collection, view) = setup(vec![file("a", ViewFileStatus::Queued)]);

        let current = view.current();
        assert!(current.all_selected);
        assert!(current.is_enabled(Some(ViewFileStatus::Queued)));
        assert!(!current.is_enabled(Some(ViewFileStatus::Downloading)));
        assert!(current.is_enabled(None));

        collection.upsert(file("b", ViewFileStatus::Downloading));
        assert!(view.current().is_enabled(Some(ViewFileStatus::Downloading)));
    }

    #[test]
    fn selecting_filters_the_collection() {
        let (collection, view) = setup(vec![
            file("a", ViewFileStatus::Queued),
            file("b", ViewFileStatus::Downloaded),
        ]);

        assert!(view.set_selected(Some(ViewFileStatus::Downloaded)));

        let current = view.current();
        assert!(!current.all_selected);
        assert!(current.is_selected(Some(ViewFileStatus::Downloaded)));
        assert_eq!(current.selected(), Some(ViewFileStatus::Downloaded));
        let shown: Vec<_> = collection.filtered().iter().map(|f| f.name.clone()).collect();
        assert_eq!(shown, vec!["b"]);

        assert!(view.set_selected(None));
        assert_eq!(collection.filtered().len(), 2);
    }

    #[test]
    fn reselecting_is_a_silent_no_op() {
        let (_collection, view) = setup(vec![file("a", ViewFileStatus::Queued)]);
        assert!(view.set_selected(Some(ViewFileStatus::Queued)));

        let notifications = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notifications);
        let _guard = view.listen(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });
        let before = view.current();

        assert!(!view.set_selected(Some(ViewFileStatus::Queued)));
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&before, &view.current()));
    }

    #[test]
    fn disabled_category_is_rejected() {
        let (collection, view) = setup(vec![file("a", ViewFileStatus::Queued)]);

        assert!(!view.set_selected(Some(ViewFileStatus::Stopped)));
        assert_eq!(view.selected(), None);
        assert_eq!(collection.filtered().len(), 1);
    }

    #[test]
    fn dropping_view_detaches_listener() {
        let collection = Arc::new(StreamedCollection::<ViewFile>::new());
        let view = DerivedFilterView::new(Arc::clone(&collection));
        drop(view);
        collection.upsert(file("a", ViewFileStatus::Queued));
        assert_eq!(collection.snapshot().len(), 1);
    }
}
