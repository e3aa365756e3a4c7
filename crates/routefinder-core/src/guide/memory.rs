//! In-memory guide store for tests.
//!
//! Not durable and not shared across processes. `set_unavailable` makes every
//! call fail with `GuideDb`, which is how tests exercise the
//! store-unavailable path of the scheduler.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::error::{Result, RoutefinderError};

use super::record::{Guide, Season};
use super::GuideStore;

#[derive(Debug, Default)]
pub struct MemoryGuideStore {
    guide: Mutex<Option<Guide>>,
    season: Mutex<Option<Season>>,
    unavailable: AtomicBool,
    saves: AtomicUsize,
}

fn poison_err<T>(_: PoisonError<T>) -> RoutefinderError {
    RoutefinderError::GuideDb("lock poisoned".into())
}

impl MemoryGuideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `guide`.
    pub fn with_guide(guide: Guide) -> Self {
        let store = Self::default();
        *store.guide.lock().unwrap_or_else(PoisonError::into_inner) = Some(guide);
        store
    }

    pub fn set_season(&self, season: Option<Season>) {
        *self.season.lock().unwrap_or_else(PoisonError::into_inner) = season;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `save_guide` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RoutefinderError::GuideDb("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

impl GuideStore for MemoryGuideStore {
    fn load_guide(&self) -> Result<Option<Guide>> {
        self.check_available()?;
        Ok(self.guide.lock().map_err(poison_err)?.clone())
    }

    fn load_season(&self) -> Result<Option<Season>> {
        self.check_available()?;
        Ok(self.season.lock().map_err(poison_err)?.clone())
    }

    fn save_guide(&self, guide: &Guide) -> Result<Uuid> {
        self.check_available()?;
        let id = guide.id.unwrap_or_else(Uuid::new_v4);
        *self.guide.lock().map_err(poison_err)? = Some(Guide {
            id: Some(id),
            ..guide.clone()
        });
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn set_dirty(&self, dirty: bool) -> Result<bool> {
        self.check_available()?;
        let mut slot = self.guide.lock().map_err(poison_err)?;
        match slot.as_mut() {
            Some(guide) => {
                guide.dirty = dirty;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = MemoryGuideStore::new();
        store.set_unavailable(true);
        assert!(store.load_guide().unwrap_err().is_store_unavailable());
        assert!(store.load_season().unwrap_err().is_store_unavailable());
        assert!(store.save_guide(&Guide::default()).is_err());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn save_assigns_id_once() {
        let store = MemoryGuideStore::new();
        let id = store.save_guide(&Guide::default()).unwrap();
        let loaded = store.load_guide().unwrap().unwrap();
        assert_eq!(store.save_guide(&loaded).unwrap(), id);
        assert_eq!(store.save_count(), 2);
    }
}
