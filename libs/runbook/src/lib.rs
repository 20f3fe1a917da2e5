//! # minikeda-runbook
//!
//! The steps for bringing up a local Minikube cluster with KEDA and a sample
//! workload, executed strictly in order:
//!
//! 1. check tool versions (`docker`, `minikube`, `kubectl`, `helm`)
//! 2. start Minikube unless it is already running
//! 3. install KEDA from the `kedacore` Helm chart into the `keda` namespace
//! 4. create a Deployment, a Service and a KEDA ScaledObject via the API
//! 5. verify with `kubectl get` and report deployment health
//!
//! External tools are reached through [`ToolRunner`]; the API server through
//! [`ClusterApi`]. Both have in-memory mocks for tests.

pub mod cluster;
pub mod error;
pub mod health;
pub mod helm;
pub mod kubectl;
pub mod minikube;
pub mod runbook;
pub mod tools;

pub use cluster::{ClusterApi, CreatedResource, KubeCluster, MockCluster};
pub use error::{Result, RunbookError};
pub use health::{DeploymentHealth, HealthReport};
pub use helm::{HelmStatus, KedaChart};
pub use kubectl::{PodRow, VerifyReport, VerifyTargets};
pub use minikube::{ClusterState, StartOutcome};
pub use runbook::{DeployReport, Runbook, RunbookConfig, UpReport, WorkloadPlan};
pub use tools::{MockRunner, ProcessRunner, Tool, ToolCheck, ToolOutput, ToolRunner};
