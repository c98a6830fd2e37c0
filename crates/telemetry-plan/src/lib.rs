//! Declarative deployment plan for the telemetry pipeline
//!
//! Turns a typed [`AppContext`](telemetry_context::AppContext) into a
//! description of the five pipeline stacks:
//!
//! ```text
//!   {stage}-telemetry-logstash-queue        Kinesis stream + lease table
//!   {stage}-telemetry-logstash-in-ecr       image repository (inbound)
//!   {stage}-telemetry-logstash-in           nlb / cloudmap / pull services
//!   {stage}-telemetry-logstash-out-ecr      image repository (outbound)
//!   {stage}-telemetry-logstash-out          queue processor
//! ```
//!
//! The plan is data only. Provisioning, ordering and diffing belong to the
//! infrastructure engine that consumes it.

pub mod builder;
pub mod error;
pub mod iam;
pub mod model;

pub use error::{Error, Result};
pub use model::{
    DeployEnvironment, PipelinePlan, PlanValue, PolicyStatement, Protocol, ResourceRef,
    RolePlan, ServicePlan, StackBody, StackOutput, StackPlan, StackRole,
};
