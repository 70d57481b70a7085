//! Well-known output payloads
//!
//! The ledger itself is payload-agnostic; these are the shapes the standard
//! foundation phases exchange. Leaf provisioning logic defines further kinds
//! by implementing [`OutputPayload`](crate::ledger::OutputPayload) the same
//! way.

use serde::{Deserialize, Serialize};

use crate::ledger::OutputPayload;

/// Central log-archive bucket, produced once by the log-archive account in
/// phase 0 and consumed by every later logging step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBucketOutput {
    pub bucket_name: String,
    pub bucket_arn: String,
    pub encryption_key_arn: String,
    pub region: String,
}

impl OutputPayload for LogBucketOutput {
    const KIND: &'static str = "LogBucket";
}

/// Per-account default bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBucketOutput {
    pub bucket_name: String,
    pub bucket_arn: String,
    pub encryption_key_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_id: Option<String>,
}

impl OutputPayload for AccountBucketOutput {
    const KIND: &'static str = "AccountBucket";
}

/// Default KMS key created per account/region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultKmsOutput {
    pub key_id: String,
    pub key_arn: String,
}

impl OutputPayload for DefaultKmsOutput {
    const KIND: &'static str = "DefaultKms";
}

/// A provisioned VPC and the subnets later phases attach into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcOutput {
    pub vpc_id: String,
    pub vpc_name: String,
    pub cidr_block: String,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

impl OutputPayload for VpcOutput {
    const KIND: &'static str = "Vpc";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            LogBucketOutput::KIND,
            AccountBucketOutput::KIND,
            DefaultKmsOutput::KIND,
            VpcOutput::KIND,
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn vpc_output_serde_camel_case() {
        let json = r#"{
            "vpcId": "vpc-1",
            "vpcName": "Central",
            "cidrBlock": "10.0.0.0/16"
        }"#;
        let output: VpcOutput = serde_json::from_str(json).unwrap();

        assert_eq!(output.vpc_id, "vpc-1");
        assert!(output.subnet_ids.is_empty()); // default
    }
}
