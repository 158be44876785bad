// Path: crates/vmcore-test-support/src/fixtures.rs
//! Mock collaborators (spec.md §6) for tests that exercise a component
//! against the external interfaces the execution core only consumes.

use vmcore_storage::page::{BlockRef, Page, PageLoader};
use vmcore_types::VarLenFullID;

/// A `PageLoader` that treats every page as already current: `prepare_page`
/// and `update_page` are no-ops. Sufficient for tests that build pages
/// in-process via `Page::new_empty` rather than exercising a real PV-DB
/// round trip.
#[derive(Default)]
pub struct NoopPageLoader {
    current: std::sync::Mutex<Option<BlockRef>>,
}

impl NoopPageLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageLoader for NoopPageLoader {
    fn set_current_block(&mut self, block: BlockRef) {
        *self.current.lock().expect("mutex is never poisoned in tests") = Some(block);
    }

    fn prepare_page(&self, _id: &VarLenFullID, _page: &Page) -> Result<(), String> {
        Ok(())
    }

    fn update_page(&self, _id: &VarLenFullID, _page: &mut Page) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmcore_types::{FullID, LongID};

    #[test]
    fn noop_loader_leaves_a_fresh_page_untouched() {
        let loader = NoopPageLoader::new();
        let id = FullID::new(LongID(1), LongID(2), LongID(3));
        let var_id = VarLenFullID::encode(&id).unwrap();
        let mut page = Page::new_empty(var_id.clone(), 64, 0, true).unwrap();
        assert!(loader.prepare_page(&var_id, &page).is_ok());
        assert!(loader.update_page(&var_id, &mut page).is_ok());
        assert_eq!(page.version, 0);
    }
}
