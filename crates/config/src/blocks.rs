//! Typed configuration structs for the top-level blocks.
//!
//! These are the decode targets for component bodies; the shapes line up
//! with the block grammar:
//!
//! ```text
//! discovery "static" "<name>" { hosts = [..], labels = {..} }
//! discovery "chain" "<name>"  { input = [{ targets = [..], labels = {..} }, ..] }
//! scrape "<name>"             { targets = [..] }
//! remote_write "<name>"       { url = ".." }
//! ```

use trellis_common::{LabelSet, TargetGroup, ADDRESS_LABEL};

use crate::decode::{optional_field, reject_unknown, require_object, required_field};
use crate::decode::{FromValue, IntoValue};
use crate::value::{Value, ValueError};

/// Top-level scalar settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    pub scrape_interval: Option<String>,
    pub scrape_timeout: Option<String>,
}

impl FromValue for RootConfig {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["scrape_interval", "scrape_timeout"])?;
        Ok(RootConfig {
            scrape_interval: optional_field(fields, "scrape_interval")?,
            scrape_timeout: optional_field(fields, "scrape_timeout")?,
        })
    }
}

/// `discovery "static"`: a fixed set of hosts with optional shared labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticDiscoveryConfig {
    pub hosts: Vec<String>,
    pub labels: LabelSet,
}

impl StaticDiscoveryConfig {
    /// Resolve into one label set per host, with the address label carrying
    /// the host and the shared labels folded underneath.
    pub fn resolve(&self) -> Vec<LabelSet> {
        self.hosts
            .iter()
            .map(|host| {
                let mut resolved = self.labels.clone();
                resolved.insert(ADDRESS_LABEL.to_string(), host.clone());
                resolved
            })
            .collect()
    }
}

impl FromValue for StaticDiscoveryConfig {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["hosts", "labels"])?;
        Ok(StaticDiscoveryConfig {
            hosts: required_field(fields, "hosts")?,
            labels: optional_field(fields, "labels")?.unwrap_or_default(),
        })
    }
}

impl IntoValue for StaticDiscoveryConfig {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::object([
            ("hosts".to_string(), self.hosts.into_value()?),
            ("labels".to_string(), self.labels.into_value()?),
        ]))
    }
}

/// `discovery "chain"`: target groups assembled from other components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainDiscoveryConfig {
    pub input: Vec<TargetGroup>,
}

impl ChainDiscoveryConfig {
    /// Flatten the input groups into one resolved label set per target.
    pub fn resolve(&self) -> Vec<LabelSet> {
        self.input.iter().flat_map(TargetGroup::resolve).collect()
    }
}

impl FromValue for ChainDiscoveryConfig {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["input"])?;
        Ok(ChainDiscoveryConfig {
            input: required_field(fields, "input")?,
        })
    }
}

impl IntoValue for ChainDiscoveryConfig {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::object([(
            "input".to_string(),
            self.input.into_value()?,
        )]))
    }
}

/// `scrape`: a scrape job bound to its resolved target set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeBlockConfig {
    pub targets: Vec<LabelSet>,
}

impl FromValue for ScrapeBlockConfig {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["targets"])?;
        Ok(ScrapeBlockConfig {
            targets: required_field(fields, "targets")?,
        })
    }
}

impl IntoValue for ScrapeBlockConfig {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::object([(
            "targets".to_string(),
            self.targets.into_value()?,
        )]))
    }
}

/// `remote_write`: where collected samples are shipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteWriteBlockConfig {
    pub url: String,
}

impl FromValue for RemoteWriteBlockConfig {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["url"])?;
        Ok(RemoteWriteBlockConfig {
            url: required_field(fields, "url")?,
        })
    }
}

impl IntoValue for RemoteWriteBlockConfig {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::object([("url".to_string(), self.url.into_value()?)]))
    }
}
