//! Domain collaborator contracts.
//!
//! The matching library plugs into the pipeline through these two traits:
//! `Organizer` classifies what exists as of `calc_time`, `Handlers` acts on
//! the classification (notifications, compensations, persisting results).
//! Both are blocking; the scheduler runs iterations on the blocking pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque domain record (a reservation, a sale, a drive, a route).
pub type Document = serde_json::Value;

/// Accepted/rejected split produced by an organize step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub accepted: Vec<Document>,
    pub rejected: Vec<Document>,
}

impl Classification {
    pub fn new(accepted: Vec<Document>, rejected: Vec<Document>) -> Self {
        Self { accepted, rejected }
    }
}

pub trait Organizer: Send + Sync {
    fn organize_reserved_sales(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification>;

    fn organize_ordinary_sales(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification>;

    /// Re-derives eligible drivers for `calc_time`; does not take the accepted
    /// sales as input.
    fn organize_drivers(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification>;

    fn organize_routes(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Vec<Document>>;
}

pub trait Handlers: Send + Sync {
    fn handle_reservations(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    fn handle_sales(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    fn handle_drives(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// `is_provisional` marks routes as simulated rather than committed.
    fn handle_routes(
        &self,
        routes: &[Document],
        calc_time: DateTime<Utc>,
        is_provisional: bool,
    ) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// IdleDomain
// ---------------------------------------------------------------------------

/// Collaborators that organize nothing and only log what they are handed.
///
/// The daemon runs with these until a matching library is linked in; every
/// iteration then exits early after the sales stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleDomain;

impl Organizer for IdleDomain {
    fn organize_reserved_sales(&self, _calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(Classification::default())
    }

    fn organize_ordinary_sales(&self, _calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(Classification::default())
    }

    fn organize_drivers(&self, _calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(Classification::default())
    }

    fn organize_routes(&self, _calc_time: DateTime<Utc>) -> anyhow::Result<Vec<Document>> {
        Ok(Vec::new())
    }
}

impl Handlers for IdleDomain {
    fn handle_reservations(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        tracing::debug!(ok = ok.len(), failed = failed.len(), %calc_time, "reservations handled");
        Ok(())
    }

    fn handle_sales(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        tracing::debug!(ok = ok.len(), failed = failed.len(), %calc_time, "sales handled");
        Ok(())
    }

    fn handle_drives(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        tracing::debug!(ok = ok.len(), failed = failed.len(), %calc_time, "drives handled");
        Ok(())
    }

    fn handle_routes(
        &self,
        routes: &[Document],
        calc_time: DateTime<Utc>,
        is_provisional: bool,
    ) -> anyhow::Result<()> {
        tracing::debug!(routes = routes.len(), is_provisional, %calc_time, "routes handled");
        Ok(())
    }
}
