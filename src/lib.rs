#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # deployspec
//!
//! > **Declarative deployments of Lambda functions and ECS services.**
//!
//! A deploy spec declares the desired state of a set of resources (the code package of a
//! function, the task definition of a service) together with an *app spec skeleton*: the
//! list of deployment targets. [`framework::Reconciler`] walks the skeleton, performs the
//! provider calls each target needs and returns the filled-in app spec, recording the
//! versions and task definitions that were produced.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Envelopes, not strings
//! Every resource is decoded once, on its `Type` tag, into a typed envelope
//! ([`DeploySpecResource`](model::DeploySpecResource),
//! [`AppSpecResource`](model::AppSpecResource)). Code past the parser never inspects a tag
//! or an untyped map, and a kind this crate does not know survives as `Unknown` so it can
//! be skipped instead of rejected.
//!
//! ### One reconciler per kind
//! The top-level loop knows nothing about Lambda or ECS. It looks up the
//! [`ResourceReconciler`](framework::ResourceReconciler) registered for an entry's kind and
//! hands it the matched pair. Adding a kind means adding a reconciler.
//!
//! ### Dry runs are first class
//! With [`ReconcileOptions::dry_run`](framework::ReconcileOptions) no provider is called, yet
//! the result has exactly the same shape, with placeholders where real values would be.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Injected Providers
//! Reconcilers call [`LambdaApi`](clients::LambdaApi) and [`EcsApi`](clients::EcsApi) trait
//! objects. Live runs wire in the AWS SDK bindings, dry runs the [`Offline`](clients::Offline)
//! stand-in, and tests the expectation mocks of [`clients::mock`].
//!
//! ### 2. Type-Safe Error Handling
//! Each layer defines its own error type ([`ProviderError`](clients::ProviderError),
//! [`ReconcileError`](framework::ReconcileError), [`ApplyError`](runtime::ApplyError)).
//! The first failure aborts the run; errors name the resource and the provider step.
//!
//! ### 3. Concurrency Model
//! Resources are reconciled one after another, in skeleton order, and each resource's
//! provider calls are awaited in sequence. A failure leaves earlier resources deployed.
//!
//! ### 4. Observability
//! We use `tracing` everywhere with structured logging. See [`runtime::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Documents ([`model`])
//! Deploy spec and app spec schemas, the kind discriminator and the resource envelopes.
//!
//! ### 2. The Engine ([`framework`])
//! The reconciliation loop and the per-kind reconciler trait.
//!
//! ### 3. The Kinds ([`lambda`], [`ecs`])
//! The provider-call sequence of each resource kind.
//!
//! ### 4. The Interface ([`clients`])
//! Provider capabilities, their AWS bindings, the offline stand-in and mocks.
//!
//! ### 5. The Runtime ([`runtime`])
//! YAML I/O, wiring and tracing setup behind the `deployspec apply` command.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Preview the resulting app spec without touching AWS
//! RUST_LOG=info deployspec apply --file deployspec.yaml --dryrun
//!
//! # Deploy
//! deployspec --region us-east-1 apply --file deployspec.yaml > appspec.yaml
//! ```

pub mod clients;
pub mod ecs;
pub mod framework;
pub mod lambda;
pub mod model;
pub mod runtime;
