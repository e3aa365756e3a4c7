//! Stage descriptors and the per-iteration context they see.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Classification, Document};

/// Identity of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Reservations,
    Sales,
    Drivers,
    Routes,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Reservations => "reservations",
            Self::Sales => "sales",
            Self::Drivers => "drivers",
            Self::Routes => "routes",
        };
        f.write_str(s)
    }
}

/// What an organize step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Classified(Classification),
    /// Routes carry no accepted/rejected split at this boundary.
    Routes(Vec<Document>),
}

impl StageOutput {
    pub fn accepted(&self) -> &[Document] {
        match self {
            Self::Classified(c) => &c.accepted,
            Self::Routes(routes) => routes,
        }
    }

    pub fn rejected(&self) -> &[Document] {
        match self {
            Self::Classified(c) => &c.rejected,
            Self::Routes(_) => &[],
        }
    }
}

/// Outputs of the stages that already ran in the current iteration.
#[derive(Debug, Clone)]
pub struct IterationContext {
    calc_time: DateTime<Utc>,
    outputs: Vec<(StageKind, StageOutput)>,
}

impl IterationContext {
    pub fn new(calc_time: DateTime<Utc>) -> Self {
        Self {
            calc_time,
            outputs: Vec::new(),
        }
    }

    pub fn calc_time(&self) -> DateTime<Utc> {
        self.calc_time
    }

    pub fn record(&mut self, kind: StageKind, output: StageOutput) {
        self.outputs.push((kind, output));
    }

    pub fn output(&self, kind: StageKind) -> Option<&StageOutput> {
        self.outputs
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, output)| output)
    }

    /// Accepted reservations followed by accepted ordinary sales.
    pub fn demand(&self) -> Vec<&Document> {
        [StageKind::Reservations, StageKind::Sales]
            .into_iter()
            .filter_map(|kind| self.output(kind))
            .flat_map(|output| output.accepted())
            .collect()
    }
}

type OrganizeFn = Box<dyn Fn(DateTime<Utc>) -> anyhow::Result<StageOutput> + Send + Sync>;
type HandleFn = Box<dyn Fn(&StageOutput, DateTime<Utc>) -> anyhow::Result<()> + Send + Sync>;
type ExitPredicate = Box<dyn Fn(&IterationContext) -> bool + Send + Sync>;

/// One ordered unit of the pipeline: organize, then handle, then optionally
/// decide whether the rest of the iteration is skipped.
pub struct StageDescriptor {
    pub(crate) kind: StageKind,
    pub(crate) organize: OrganizeFn,
    pub(crate) handle: HandleFn,
    pub(crate) exit_after: Option<ExitPredicate>,
}

impl StageDescriptor {
    pub fn new<O, H>(kind: StageKind, organize: O, handle: H) -> Self
    where
        O: Fn(DateTime<Utc>) -> anyhow::Result<StageOutput> + Send + Sync + 'static,
        H: Fn(&StageOutput, DateTime<Utc>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            kind,
            organize: Box::new(organize),
            handle: Box::new(handle),
            exit_after: None,
        }
    }

    /// Skip all later stages when `predicate` holds after this stage ran.
    pub fn exit_after<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&IterationContext) -> bool + Send + Sync + 'static,
    {
        self.exit_after = Some(Box::new(predicate));
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }
}

impl std::fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("kind", &self.kind)
            .field("exit_after", &self.exit_after.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn demand_lists_reservations_before_sales() {
        let mut ctx = IterationContext::new(Utc::now());
        ctx.record(
            StageKind::Sales,
            StageOutput::Classified(Classification::new(vec![json!("sale")], vec![])),
        );
        ctx.record(
            StageKind::Reservations,
            StageOutput::Classified(Classification::new(
                vec![json!("res")],
                vec![json!("rejected")],
            )),
        );
        let demand = ctx.demand();
        assert_eq!(demand, vec![&json!("res"), &json!("sale")]);
    }

    #[test]
    fn routes_have_no_rejected_side() {
        let output = StageOutput::Routes(vec![json!({"route": 1})]);
        assert_eq!(output.accepted().len(), 1);
        assert!(output.rejected().is_empty());
    }
}
