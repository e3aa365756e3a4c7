//! Guide store: persisted scheduling state.
//!
//! Provides `Guide`, `Season`, the `GuideStore` contract, and its two
//! implementations: `GuideDb` (redb file, used by the daemon) and
//! `MemoryGuideStore` (tests).

pub mod db;
pub mod memory;
pub mod record;

pub use db::GuideDb;
pub use memory::MemoryGuideStore;
pub use record::{Guide, Season, SeasonStatus};

use uuid::Uuid;

use crate::error::Result;

/// Read/write access to the guide record and read access to the season.
///
/// Every method may fail with `RoutefinderError::GuideDb` when the backing
/// store is unavailable; callers abort the current pass on such errors.
pub trait GuideStore: Send + Sync {
    /// The singleton guide, if one was ever persisted.
    fn load_guide(&self) -> Result<Option<Guide>>;

    /// The most recent season record.
    fn load_season(&self) -> Result<Option<Season>>;

    /// Upsert the guide. A guide carrying an id replaces that record;
    /// otherwise a fresh id is assigned. Returns the id the record lives under.
    fn save_guide(&self, guide: &Guide) -> Result<Uuid>;

    /// Set the dirty flag on the existing guide.
    ///
    /// Returns `false` when there is no guide to update.
    fn set_dirty(&self, dirty: bool) -> Result<bool>;
}
