//! Test collaborators that record every call.

use std::mem::discriminant;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Classification, Document, Handlers, Organizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OrganizeReservations,
    HandleReservations { ok: usize, failed: usize },
    OrganizeSales,
    HandleSales { ok: usize, failed: usize },
    OrganizeDrivers,
    HandleDrives { ok: usize, failed: usize },
    OrganizeRoutes,
    HandleRoutes { routes: usize, is_provisional: bool },
}

#[derive(Debug, Default)]
struct Inner {
    reservations: Classification,
    sales: Classification,
    drivers: Classification,
    routes: Vec<Document>,
    fail_on: Option<Call>,
    calls: Vec<Call>,
    calc_times: Vec<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct RecordingDomain {
    inner: Mutex<Inner>,
}

impl RecordingDomain {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn set_reservations(&self, ok: Vec<Document>, failed: Vec<Document>) {
        self.lock().reservations = Classification::new(ok, failed);
    }

    pub fn set_sales(&self, ok: Vec<Document>, failed: Vec<Document>) {
        self.lock().sales = Classification::new(ok, failed);
    }

    pub fn set_drivers(&self, ok: Vec<Document>, failed: Vec<Document>) {
        self.lock().drivers = Classification::new(ok, failed);
    }

    pub fn set_routes(&self, routes: Vec<Document>) {
        self.lock().routes = routes;
    }

    /// Fail any call of the same variant as `call`.
    pub fn fail_on(&self, call: Call) {
        self.lock().fail_on = Some(call);
    }

    pub fn succeed(&self) {
        self.lock().fail_on = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calc_times(&self) -> Vec<DateTime<Utc>> {
        self.lock().calc_times.clone()
    }

    fn record(&self, call: Call, calc_time: DateTime<Utc>) -> anyhow::Result<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        if let Some(fail) = &inner.fail_on {
            if discriminant(fail) == discriminant(&call) {
                anyhow::bail!("injected failure in {call:?}");
            }
        }
        inner.calls.push(call);
        inner.calc_times.push(calc_time);
        Ok(inner)
    }
}

impl Organizer for RecordingDomain {
    fn organize_reserved_sales(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(self.record(Call::OrganizeReservations, calc_time)?.reservations.clone())
    }

    fn organize_ordinary_sales(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(self.record(Call::OrganizeSales, calc_time)?.sales.clone())
    }

    fn organize_drivers(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Classification> {
        Ok(self.record(Call::OrganizeDrivers, calc_time)?.drivers.clone())
    }

    fn organize_routes(&self, calc_time: DateTime<Utc>) -> anyhow::Result<Vec<Document>> {
        Ok(self.record(Call::OrganizeRoutes, calc_time)?.routes.clone())
    }
}

impl Handlers for RecordingDomain {
    fn handle_reservations(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let call = Call::HandleReservations {
            ok: ok.len(),
            failed: failed.len(),
        };
        self.record(call, calc_time).map(drop)
    }

    fn handle_sales(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let call = Call::HandleSales {
            ok: ok.len(),
            failed: failed.len(),
        };
        self.record(call, calc_time).map(drop)
    }

    fn handle_drives(
        &self,
        ok: &[Document],
        failed: &[Document],
        calc_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let call = Call::HandleDrives {
            ok: ok.len(),
            failed: failed.len(),
        };
        self.record(call, calc_time).map(drop)
    }

    fn handle_routes(
        &self,
        routes: &[Document],
        calc_time: DateTime<Utc>,
        is_provisional: bool,
    ) -> anyhow::Result<()> {
        let call = Call::HandleRoutes {
            routes: routes.len(),
            is_provisional,
        };
        self.record(call, calc_time).map(drop)
    }
}
