//! Scripted payment [`Gateway`] for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use common::{
    operations::{Initialize, Verify},
    Money,
};
use serde_json::json;
use tracerr::Traced;

use crate::{
    domain::transaction,
    infra::gateway::{
        self, Checkout, Gateway, Initialized, Outcome, Verification,
    },
};

/// Payment [`Gateway`] answering verifications the way it's told to.
#[derive(Clone, Debug)]
pub(crate) struct Scripted(Arc<Mutex<Script>>);

/// Behavior of a [`Scripted`] payment [`Gateway`].
#[derive(Debug)]
struct Script {
    /// [`Outcome`] to report on verification, or [`None`] to fail the call.
    outcome: Option<Outcome>,

    /// [`Outcome`] to switch to after the next verification.
    next: Option<Outcome>,

    /// Amount to report as paid instead of the charged one.
    paid: Option<Money>,

    /// Charged amounts of initialized checkouts.
    charged: HashMap<transaction::Reference, Money>,

    /// Payments always reported as [`Outcome::Pending`].
    stalled: HashSet<transaction::Reference>,

    /// Number of verification calls made.
    verifications: usize,
}

impl Scripted {
    /// Creates a new [`Scripted`] gateway reporting the provided [`Outcome`].
    pub(crate) fn new(outcome: Outcome) -> Self {
        Self(Arc::new(Mutex::new(Script {
            outcome: Some(outcome),
            next: None,
            paid: None,
            charged: HashMap::new(),
            stalled: HashSet::new(),
            verifications: 0,
        })))
    }

    /// Makes the following verifications report the provided [`Outcome`].
    pub(crate) fn report(&self, outcome: Outcome) {
        self.0.lock().unwrap().outcome = Some(outcome);
    }

    /// Makes the verifications following the next one report the provided
    /// [`Outcome`].
    pub(crate) fn then_report(&self, outcome: Outcome) {
        self.0.lock().unwrap().next = Some(outcome);
    }

    /// Makes the following calls fail as unreachable.
    pub(crate) fn go_down(&self) {
        self.0.lock().unwrap().outcome = None;
    }

    /// Makes the following verifications report the provided paid amount.
    pub(crate) fn pay(&self, amount: Money) {
        self.0.lock().unwrap().paid = Some(amount);
    }

    /// Makes the payment with the provided [`transaction::Reference`] stay
    /// [`Outcome::Pending`] whatever is reported for others.
    pub(crate) fn stall(&self, reference: transaction::Reference) {
        _ = self.0.lock().unwrap().stalled.insert(reference);
    }

    /// Returns the number of verification calls made so far.
    pub(crate) fn verifications(&self) -> usize {
        self.0.lock().unwrap().verifications
    }
}

impl Gateway<Initialize<Checkout>> for Scripted {
    type Ok = Initialized;
    type Err = Traced<gateway::Error>;

    async fn execute(
        &self,
        Initialize(checkout): Initialize<Checkout>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut script = self.0.lock().unwrap();
        if script.outcome.is_none() {
            return Err(tracerr::new!(gateway::Error::Rejected(
                "gateway is down".into()
            )));
        }
        drop(
            script
                .charged
                .insert(checkout.reference.clone(), checkout.amount),
        );
        Ok(Initialized {
            authorization_url: format!(
                "https://checkout.test/{}",
                checkout.reference,
            ),
            access_code: format!("ac_{}", checkout.reference),
            reference: checkout.reference,
        })
    }
}

impl Gateway<Verify<transaction::Reference>> for Scripted {
    type Ok = Verification;
    type Err = Traced<gateway::Error>;

    async fn execute(
        &self,
        Verify(reference): Verify<transaction::Reference>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut script = self.0.lock().unwrap();
        script.verifications += 1;
        let mut outcome = script.outcome.clone().ok_or_else(|| {
            tracerr::new!(gateway::Error::Rejected("gateway is down".into()))
        })?;
        if let Some(next) = script.next.take() {
            script.outcome = Some(next);
        }
        if script.stalled.contains(&reference) {
            outcome = Outcome::Pending;
        }
        let gateway_status = match &outcome {
            Outcome::Success => "success",
            Outcome::Failed(_) => "failed",
            Outcome::Pending => "ongoing",
        }
        .to_owned();

        Ok(Verification {
            amount: script
                .paid
                .or_else(|| script.charged.get(&reference).copied()),
            raw: json!({"status": gateway_status, "reference": reference}),
            outcome,
            gateway_status,
        })
    }
}
