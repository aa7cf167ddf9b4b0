//! # Reconcile
//!
//! A generic declarative resource reconciliation loop.
//!
//! Every resource type goes through the same steps: validate parameters,
//! read the current state from the provider, diff it against the desired
//! state and issue at most one create, update or delete call.
//!
//! ## Core Concepts
//!
//! - **ResourceKind**: data describing one resource type (schema, identity,
//!   body bindings, comparison rules)
//! - **DesiredState**: tri-state fields (`Unset`, `Null`, `Set`) plus
//!   present/absent
//! - **ResourceClient**: the provider boundary (`get`, `create_or_update`,
//!   `delete`)
//! - **Reconciler**: the state machine driving one resource
//! - **ExecutionPlan** / **execute**: many units, in tiered waves, in parallel
//!
//! ## Example
//!
//! ```
//! use reconcile::{DesiredState, FieldRules, MemoryClient, Reconciler, ResourceIdentity, ResultShape};
//! use serde_json::json;
//!
//! let client = MemoryClient::new();
//! let identity = ResourceIdentity::builder("resource_group")
//!     .segment("name", "rg-demo")
//!     .build();
//! let desired = DesiredState::present().set("location", json!("westeurope"));
//!
//! let reconciler = Reconciler::new(&client);
//! let first = reconciler
//!     .reconcile(&identity, &desired, &FieldRules::new(), &ResultShape::new())
//!     .unwrap();
//! assert!(first.changed);
//!
//! let second = reconciler
//!     .reconcile(&identity, &desired, &FieldRules::new(), &ResultShape::new())
//!     .unwrap();
//! assert!(!second.changed);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ResourceClient`]: provider calls for one or more kinds
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: approves pending changes
//!
//! This keeps the crate free of any HTTP stack or terminal UI.

pub mod client;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod field;
pub mod identity;
pub mod kind;
pub mod memory;
pub mod outcome;
pub mod planner;
pub mod policy;
pub mod reconciler;
pub mod schema;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use client::{BoxedClient, Lookup, ResourceClient};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffResult, FieldChange, diff};
pub use error::{
    Error, ErrorKind, ExecuteError, ProviderError, ProviderErrorKind, Result, ValidationError,
};
pub use executor::{execute, execute_simple};
pub use field::{Field, FieldPath, Record};
pub use identity::ResourceIdentity;
pub use kind::{IDENTITY_PATTERN, ResourceKind, STATE_PARAM, Unit};
pub use memory::MemoryClient;
pub use outcome::{
    Action, DiffReport, OutcomeError, Phase, REDACTED, ReconcileOutcome, ResultShape,
};
pub use planner::{ExecutionPlan, Wave};
pub use policy::{Compare, FieldRule, FieldRules};
pub use reconciler::Reconciler;
pub use schema::{ArgSpec, ParamSpec, ParamType, Params, RequiredIf};
pub use state::{DesiredState, Ensure, ObservedState};
pub use types::{ExecuteOptions, ExecuteSummary};
