//! Reconciler - drives one resource from observed to desired state
//!
//! ```text
//! Unknown --get--> Absent  --present--> PresentNeedsCreate --upsert--> Terminal
//!                  Absent  --absent---> Terminal
//!          --get--> Present --absent---> NeedsDelete --delete--> Terminal
//!                  Present --present--> diff --> PresentUnchanged --> Terminal
//!                                            --> PresentNeedsUpdate --upsert--> Terminal
//! ```
//!
//! Dry-run walks the same transitions and reports the same `changed`
//! value, but never issues a mutating call.

use crate::client::ResourceClient;
use crate::diff::diff;
use crate::error::{Error, Result};
use crate::field::Record;
use crate::identity::ResourceIdentity;
use crate::kind::Unit;
use crate::outcome::{Action, DiffReport, Phase, ReconcileOutcome, ResultShape};
use crate::policy::FieldRules;
use crate::state::{DesiredState, Ensure};

/// Runs reconciliations against one client
#[derive(Debug, Clone)]
pub struct Reconciler<C> {
    client: C,
    dry_run: bool,
    diff: bool,
}

impl<C: ResourceClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            dry_run: false,
            diff: false,
        }
    }

    /// Compute and report, but never mutate
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Attach before/after records to outcomes
    pub fn with_diff(mut self, diff: bool) -> Self {
        self.diff = diff;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Reconcile one resource, failing on the first error
    pub fn reconcile(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        rules: &FieldRules,
        shape: &ResultShape,
    ) -> Result<ReconcileOutcome> {
        let mut phases = Vec::new();
        self.drive(identity, desired, rules, shape, &mut phases)
    }

    /// Reconcile one resource, folding any error into the outcome
    pub fn run(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        rules: &FieldRules,
        shape: &ResultShape,
    ) -> ReconcileOutcome {
        let mut phases = Vec::new();
        match self.drive(identity, desired, rules, shape, &mut phases) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::debug!("{identity}: {err}");
                ReconcileOutcome::failed(identity.clone(), self.dry_run, phases, &err)
            }
        }
    }

    /// [`Reconciler::run`] for a prepared unit
    pub fn run_unit(&self, unit: &Unit) -> ReconcileOutcome {
        self.run(&unit.identity, &unit.desired, &unit.rules, &unit.shape)
    }

    fn drive(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        rules: &FieldRules,
        shape: &ResultShape,
        phases: &mut Vec<Phase>,
    ) -> Result<ReconcileOutcome> {
        phases.push(Phase::Unknown);
        let observed = match self.client.get(identity) {
            Ok(lookup) => lookup.into_option(),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };
        phases.push(if observed.is_some() {
            Phase::Present
        } else {
            Phase::Absent
        });

        let result = diff(desired, observed.as_ref(), rules);

        let (action, record): (Action, Option<Record>) = match (desired.ensure(), &observed) {
            (Ensure::Absent, None) => (Action::None, None),
            (Ensure::Absent, Some(_)) => {
                phases.push(Phase::NeedsDelete);
                if !self.dry_run {
                    log::debug!("{identity}: deleting");
                    self.client.delete(identity)?;
                }
                (Action::Delete, None)
            }
            (Ensure::Present, None) => {
                phases.push(Phase::PresentNeedsCreate);
                (Action::Create, Some(self.upsert(identity, result.merged_body.clone())?))
            }
            (Ensure::Present, Some(current)) if !result.changed => {
                phases.push(Phase::PresentUnchanged);
                (Action::None, Some(current.body().clone()))
            }
            (Ensure::Present, Some(_)) => {
                phases.push(Phase::PresentNeedsUpdate);
                if !result.immutable.is_empty() {
                    return Err(Error::ImmutableField {
                        identity: identity.to_string(),
                        fields: result.immutable,
                    });
                }
                (Action::Update, Some(self.upsert(identity, result.merged_body.clone())?))
            }
        };
        phases.push(Phase::Terminal);

        let mut changes = result.changes;
        shape.redact_changes(&mut changes);

        let diff = self.diff.then(|| DiffReport {
            before: observed.as_ref().map(|o| shape.apply(o.body())),
            after: record.as_ref().map(|r| shape.apply(r)),
        });

        log::debug!(
            "{identity}: {action:?}{}",
            if self.dry_run { " (dry run)" } else { "" }
        );

        Ok(ReconcileOutcome {
            identity: identity.clone(),
            changed: action != Action::None,
            action,
            dry_run: self.dry_run,
            phases: phases.clone(),
            result: record.as_ref().map(|r| shape.apply(r)),
            changes,
            diff,
            error: None,
        })
    }

    /// Create or update, or predict the body in dry-run
    fn upsert(&self, identity: &ResourceIdentity, body: Record) -> Result<Record> {
        if self.dry_run {
            return Ok(body);
        }
        log::debug!("{identity}: create_or_update");
        Ok(self.client.create_or_update(identity, &body)?.into_body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProviderError, ProviderErrorKind};
    use crate::memory::{Call, MemoryClient, Operation};
    use crate::outcome::REDACTED;
    use crate::policy::Compare;
    use serde_json::{Value, json};

    fn id() -> ResourceIdentity {
        ResourceIdentity::builder("vpn_site")
            .segment("resource_group", "rg")
            .segment("name", "x")
            .build()
    }

    fn desired(sku: &str) -> DesiredState {
        DesiredState::present().set("name", json!("x")).set("sku", json!(sku))
    }

    fn reconcile<C: ResourceClient>(reconciler: &Reconciler<C>, desired: &DesiredState) -> ReconcileOutcome {
        reconciler
            .reconcile(&id(), desired, &FieldRules::new(), &ResultShape::new())
            .unwrap()
    }

    #[test]
    fn test_scenario_a_create() {
        let client = MemoryClient::new();
        let outcome = reconcile(&Reconciler::new(&client), &desired("Standard"));

        assert!(outcome.changed);
        assert_eq!(outcome.action, Action::Create);
        assert_eq!(
            outcome.phases,
            vec![Phase::Unknown, Phase::Absent, Phase::PresentNeedsCreate, Phase::Terminal]
        );
        assert_eq!(client.mutating_calls(), 1);
        let result = outcome.result.unwrap();
        assert_eq!(result["sku"], json!("Standard"));
        assert_eq!(result["provisioningState"], json!("Succeeded"));
    }

    #[test]
    fn test_scenario_b_unchanged() {
        let client = MemoryClient::new().with_resource(
            id(),
            json!({"name": "x", "sku": "Standard", "id": "/subscriptions/s/x"}),
        );
        let outcome = reconcile(&Reconciler::new(&client), &desired("Standard"));

        assert!(!outcome.changed);
        assert_eq!(outcome.action, Action::None);
        assert_eq!(
            outcome.phases,
            vec![Phase::Unknown, Phase::Present, Phase::PresentUnchanged, Phase::Terminal]
        );
        assert_eq!(client.calls(), vec![Call::Get("vpn_site:rg/x".into())]);
        assert_eq!(outcome.result.unwrap()["id"], json!("/subscriptions/s/x"));
    }

    #[test]
    fn test_scenario_c_update_carries_unset_fields() {
        let client = MemoryClient::new().with_resource(
            id(),
            json!({"name": "x", "sku": "Standard", "id": "/subscriptions/s/x"}),
        );
        let outcome = reconcile(&Reconciler::new(&client), &desired("Premium"));

        assert!(outcome.changed);
        assert_eq!(outcome.action, Action::Update);
        let stored = client.stored(&id()).unwrap();
        assert_eq!(stored["sku"], json!("Premium"));
        assert_eq!(stored["name"], json!("x"));
        assert_eq!(stored["id"], json!("/subscriptions/s/x"));
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].before, Some(json!("Standard")));
        assert_eq!(outcome.changes[0].after, Some(json!("Premium")));
    }

    #[test]
    fn test_scenario_d_delete() {
        let client = MemoryClient::new().with_resource(id(), json!({"name": "x"}));
        let outcome = reconcile(&Reconciler::new(&client), &DesiredState::absent());

        assert!(outcome.changed);
        assert_eq!(outcome.action, Action::Delete);
        assert_eq!(outcome.result, None);
        assert!(client.is_empty());
        assert_eq!(
            outcome.phases,
            vec![Phase::Unknown, Phase::Present, Phase::NeedsDelete, Phase::Terminal]
        );
    }

    #[test]
    fn test_scenario_e_dry_run_create() {
        let client = MemoryClient::new();
        let outcome = reconcile(&Reconciler::new(&client).dry_run(true), &desired("Standard"));

        assert!(outcome.changed);
        assert!(outcome.dry_run);
        assert_eq!(outcome.action, Action::Create);
        assert_eq!(client.mutating_calls(), 0);
        assert_eq!(
            Value::Object(outcome.result.unwrap()),
            json!({"name": "x", "sku": "Standard"})
        );
    }

    #[test]
    fn test_absent_on_absent() {
        let client = MemoryClient::new();
        let outcome = reconcile(&Reconciler::new(&client), &DesiredState::absent());

        assert!(!outcome.changed);
        assert_eq!(outcome.result, None);
        assert_eq!(client.mutating_calls(), 0);
        assert_eq!(outcome.phases, vec![Phase::Unknown, Phase::Absent, Phase::Terminal]);
    }

    #[test]
    fn test_converges_after_one_call() {
        let client = MemoryClient::new();
        let reconciler = Reconciler::new(&client);
        let target = desired("Premium").set("tags", json!({"env": "prod"}));

        assert!(reconcile(&reconciler, &target).changed);
        let second = reconcile(&reconciler, &target);
        assert!(!second.changed);
        assert_eq!(client.mutating_calls(), 1);
    }

    #[test]
    fn test_dry_run_matches_real_run() {
        let seeds = [
            (Some(json!({"name": "x", "sku": "Standard"})), desired("Standard")),
            (Some(json!({"name": "x", "sku": "Standard"})), desired("Premium")),
            (Some(json!({"name": "x"})), DesiredState::absent()),
            (None, desired("Standard")),
            (None, DesiredState::absent()),
        ];
        for (seed, target) in seeds {
            let make = || {
                let client = MemoryClient::new();
                if let Some(body) = &seed {
                    client.insert(id(), body.clone());
                }
                client
            };
            let dry_client = make();
            let dry = reconcile(&Reconciler::new(&dry_client).dry_run(true), &target);
            let real = reconcile(&Reconciler::new(make()), &target);

            assert_eq!(dry.changed, real.changed);
            assert_eq!(dry.action, real.action);
            assert_eq!(dry_client.mutating_calls(), 0);
        }
    }

    #[test]
    fn test_not_found_error_means_absent() {
        let client = MemoryClient::new();
        client.fail_next(Operation::Get, ProviderError::not_found("ResourceNotFound"));
        let outcome = reconcile(&Reconciler::new(&client), &desired("Standard"));
        assert_eq!(outcome.action, Action::Create);
    }

    #[test]
    fn test_get_failure_is_fatal() {
        let client = MemoryClient::new();
        client.fail_next(
            Operation::Get,
            ProviderError::new(ProviderErrorKind::Unauthorized, "The client does not have authorization")
                .with_status(403),
        );
        let outcome = Reconciler::new(&client).run(
            &id(),
            &desired("Standard"),
            &FieldRules::new(),
            &ResultShape::new(),
        );

        assert!(!outcome.changed);
        assert!(!outcome.is_success());
        let error = outcome.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Provider);
        assert_eq!(error.message, "The client does not have authorization");
        assert_eq!(outcome.phases, vec![Phase::Unknown]);
        assert_eq!(client.mutating_calls(), 0);
    }

    #[test]
    fn test_put_failure_is_fatal_and_not_retried() {
        let client = MemoryClient::new();
        client.fail_next(
            Operation::Put,
            ProviderError::new(ProviderErrorKind::BadRequest, "InvalidParameter"),
        );
        let err = Reconciler::new(&client)
            .reconcile(&id(), &desired("Standard"), &FieldRules::new(), &ResultShape::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(client.mutating_calls(), 1);
        assert!(client.is_empty());
    }

    #[test]
    fn test_create_only_field_refuses_update() {
        let client = MemoryClient::new()
            .with_resource(id(), json!({"name": "x", "location": "westeurope"}));
        let rules = FieldRules::new().create_only("location");
        let outcome = Reconciler::new(&client).run(
            &id(),
            &DesiredState::present().set("location", json!("northeurope")),
            &rules,
            &ResultShape::new(),
        );

        assert!(!outcome.changed);
        assert_eq!(outcome.error.unwrap().kind, ErrorKind::ImmutableField);
        assert_eq!(client.mutating_calls(), 0);
    }

    #[test]
    fn test_set_compare_is_idempotent() {
        let client = MemoryClient::new()
            .with_resource(id(), json!({"name": "x", "addressPrefixes": ["10.0.0.0/24", "10.1.0.0/24"]}));
        let target = DesiredState::present().set("addressPrefixes", json!(["10.1.0.0/24", "10.0.0.0/24"]));

        let as_set = Reconciler::new(&client)
            .reconcile(
                &id(),
                &target,
                &FieldRules::new().with("addressPrefixes", Compare::Set),
                &ResultShape::new(),
            )
            .unwrap();
        assert!(!as_set.changed);

        let as_sequence = Reconciler::new(&client)
            .dry_run(true)
            .reconcile(
                &id(),
                &target,
                &FieldRules::new().with("addressPrefixes", Compare::Sequence),
                &ResultShape::new(),
            )
            .unwrap();
        assert!(as_sequence.changed);
    }

    #[test]
    fn test_diff_report_and_redaction() {
        let client = MemoryClient::new().with_resource(
            id(),
            json!({"name": "x", "properties": {"version": "11", "administratorLoginPassword": null}}),
        );
        let shape = ResultShape::new().secret("properties.administratorLoginPassword");
        let target = DesiredState::present()
            .set("properties.version", json!("12"))
            .set("properties.administratorLoginPassword", json!("hunter2"));
        let rules = FieldRules::new().with("properties.administratorLoginPassword", Compare::Ignore);

        let outcome = Reconciler::new(&client)
            .with_diff(true)
            .reconcile(&id(), &target, &rules, &shape)
            .unwrap();

        assert!(outcome.changed);
        let result = outcome.result.unwrap();
        assert_eq!(result["properties"]["administratorLoginPassword"], json!(REDACTED));
        assert_eq!(result["properties"]["version"], json!("12"));

        let report = outcome.diff.unwrap();
        assert_eq!(report.before.unwrap()["properties"]["version"], json!("11"));
        assert_eq!(report.after.unwrap()["properties"]["administratorLoginPassword"], json!(REDACTED));

        assert_eq!(
            client.stored(&id()).unwrap()["properties"]["administratorLoginPassword"],
            json!("hunter2")
        );
        assert!(outcome.changes.iter().all(|c| c.after != Some(json!("hunter2"))));
    }

    #[test]
    fn test_dry_run_delete_reports_null_result() {
        let client = MemoryClient::new().with_resource(id(), json!({"name": "x"}));
        let outcome = reconcile(&Reconciler::new(&client).dry_run(true), &DesiredState::absent());
        assert!(outcome.changed);
        assert_eq!(outcome.result, None);
        assert_eq!(client.len(), 1);
    }

    #[test]
    fn test_run_unit() {
        let client = MemoryClient::new();
        let unit = Unit {
            identity: id(),
            desired: desired("Standard"),
            rules: FieldRules::new(),
            shape: ResultShape::new(),
            tier: 0,
        };
        let outcome = Reconciler::new(&client).run_unit(&unit);
        assert!(outcome.is_success());
        assert!(outcome.changed);
    }
}
