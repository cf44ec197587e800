//! Script-prefix topic manager
//!
//! Admits outputs whose locking script starts with a configured byte prefix
//! and, unless told otherwise, retains every input the topic already holds.

use crate::domain::context::AdmissionContext;
use crate::domain::entities::{Admittance, ServiceMetadata};
use crate::domain::errors::TopicManagerError;
use crate::ports::outbound::TopicManager;
use async_trait::async_trait;

pub struct ScriptPrefixTopicManager {
    name: String,
    prefix: Vec<u8>,
    dependencies: Vec<String>,
    retain_inputs: bool,
}

impl ScriptPrefixTopicManager {
    pub fn new(name: impl Into<String>, prefix: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            prefix,
            dependencies: Vec::new(),
            retain_inputs: true,
        }
    }

    /// Parse the prefix from hex.
    pub fn from_hex(name: impl Into<String>, prefix_hex: &str) -> Result<Self, TopicManagerError> {
        let prefix = hex::decode(prefix_hex)
            .map_err(|e| TopicManagerError::Rule(format!("invalid script prefix: {e}")))?;
        Ok(Self::new(name, prefix))
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Spent inputs become pruning candidates instead of provenance.
    pub fn without_retention(mut self) -> Self {
        self.retain_inputs = false;
        self
    }
}

#[async_trait]
impl TopicManager for ScriptPrefixTopicManager {
    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn identify_admissible_outputs(
        &self,
        ctx: &AdmissionContext<'_>,
    ) -> Result<Admittance, TopicManagerError> {
        let admitted = ctx
            .transaction()
            .outputs
            .iter()
            .enumerate()
            .filter(|(_, output)| output.locking_script.starts_with(&self.prefix))
            .map(|(vout, _)| vout as u32);

        let mut admittance = Admittance::new().admit_all(admitted);
        if self.retain_inputs {
            let known = ctx
                .inputs()
                .iter()
                .enumerate()
                .filter(|(_, input)| input.is_some())
                .map(|(index, _)| index as u32);
            admittance = admittance.retain_all(known);
        }
        Ok(admittance)
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new(
            &self.name,
            format!("Outputs with script prefix {}", hex::encode(&self.prefix)),
        )
    }
}
