//! Task and execution role permissions

use crate::model::{PlanValue, PolicyStatement, ResourceRef, RolePlan};

pub const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
pub const TASK_EXECUTION_POLICY: &str = "service-role/AmazonECSTaskExecutionRolePolicy";

const STREAM_WRITE_ACTIONS: &[&str] = &[
    "kinesis:ListShards",
    "kinesis:PutRecord",
    "kinesis:PutRecords",
];

const STREAM_READ_ACTIONS: &[&str] = &[
    "kinesis:DescribeStreamSummary",
    "kinesis:GetRecords",
    "kinesis:GetShardIterator",
    "kinesis:ListShards",
    "kinesis:SubscribeToShard",
];

const LOG_WRITE_ACTIONS: &[&str] = &["logs:CreateLogStream", "logs:PutLogEvents"];

const ARCHIVE_ACTIONS: &[&str] = &[
    "s3:PutObject",
    "s3:ListMultipartUploadParts",
    "s3:ListBucket",
    "s3:AbortMultipartUpload",
];

/// Service variables with this suffix name an archive bucket
pub const LOG_BUCKET_SUFFIX: &str = "_log_bucket";

fn statement(actions: &[&str], resources: Vec<PlanValue>) -> PolicyStatement {
    PolicyStatement {
        actions: actions.iter().map(|a| a.to_string()).collect(),
        resources,
    }
}

impl RolePlan {
    /// A role ECS tasks can assume, with no permissions yet
    pub fn for_ecs_tasks(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            assumed_by: ECS_TASKS_PRINCIPAL.to_string(),
            managed_policies: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub fn with_managed_policy(mut self, policy: &str) -> Self {
        self.managed_policies.push(policy.to_string());
        self
    }

    pub fn allow(&mut self, actions: &[&str], resources: Vec<PlanValue>) {
        self.statements.push(statement(actions, resources));
    }

    /// `cloudwatch:PutMetricData` on every resource
    pub fn allow_put_metrics(&mut self) {
        self.allow(
            &["cloudwatch:PutMetricData"],
            vec![PlanValue::literal("*")],
        );
    }

    pub fn allow_kms_decrypt(&mut self, key_arn: &str) {
        self.allow(&["kms:Decrypt"], vec![PlanValue::literal(key_arn)]);
    }

    pub fn grant_log_write(&mut self, log_group_arn: ResourceRef) {
        self.allow(LOG_WRITE_ACTIONS, vec![log_group_arn.into()]);
    }

    pub fn grant_stream_write(&mut self, stream_arn: ResourceRef) {
        self.allow(STREAM_WRITE_ACTIONS, vec![stream_arn.into()]);
    }

    pub fn grant_stream_read(&mut self, stream_arn: ResourceRef) {
        self.allow(STREAM_READ_ACTIONS, vec![stream_arn.into()]);
    }

    pub fn grant_table_full_access(&mut self, table_arn: ResourceRef) {
        self.allow(&["dynamodb:*"], vec![table_arn.into()]);
    }

    /// Upload permissions for each archive bucket, on the bucket and its keys.
    ///
    /// The statement is added even with no buckets so the role shape does not
    /// depend on which variables a stage defines.
    pub fn grant_archive_upload<I>(&mut self, buckets: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let resources = buckets
            .into_iter()
            .flat_map(|bucket| {
                let bucket = bucket.as_ref();
                [
                    PlanValue::literal(format!("arn:aws:s3:::{}", bucket)),
                    PlanValue::literal(format!("arn:aws:s3:::{}/*", bucket)),
                ]
            })
            .collect();
        self.allow(ARCHIVE_ACTIONS, resources);
    }

    /// All actions granted on `resource`, in statement order
    pub fn actions_on(&self, resource: &PlanValue) -> Vec<&str> {
        self.statements
            .iter()
            .filter(|s| s.resources.contains(resource))
            .flat_map(|s| s.actions.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_upload_covers_bucket_and_keys() {
        let mut role = RolePlan::for_ecs_tasks("processor_task_role");
        role.grant_archive_upload(["telemetry-archive"]);

        let statement = &role.statements[0];
        assert_eq!(statement.actions.len(), 4);
        assert_eq!(
            statement.resources,
            vec![
                PlanValue::literal("arn:aws:s3:::telemetry-archive"),
                PlanValue::literal("arn:aws:s3:::telemetry-archive/*"),
            ]
        );
    }

    #[test]
    fn actions_on_collects_matching_statements() {
        let stream = ResourceRef::new("dev-telemetry-logstash-queue", "logstash_queue", "stream_arn");
        let mut role = RolePlan::for_ecs_tasks("role");
        role.allow_put_metrics();
        role.grant_stream_read(stream.clone());
        role.allow(&["kinesis:ListShards"], vec![stream.clone().into()]);

        let actions = role.actions_on(&stream.into());
        assert!(actions.contains(&"kinesis:GetRecords"));
        assert_eq!(actions.iter().filter(|a| **a == "kinesis:ListShards").count(), 2);
        assert!(!actions.contains(&"cloudwatch:PutMetricData"));
    }

    #[test]
    fn execution_role_has_managed_policy() {
        let role = RolePlan::for_ecs_tasks("exec").with_managed_policy(TASK_EXECUTION_POLICY);
        assert_eq!(role.assumed_by, ECS_TASKS_PRINCIPAL);
        assert_eq!(role.managed_policies, vec![TASK_EXECUTION_POLICY]);
    }
}
