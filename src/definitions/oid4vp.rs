//! The subset of a DIF presentation definition used to request mdoc elements over OpenID4VP.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationDefinition {
    pub id: String,
    pub input_descriptors: Vec<InputDescriptor>,
}

/// Request for one document. The descriptor `id` is the requested doc type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_disclosure: Option<String>,
    pub fields: Vec<Field>,
}

/// A requested element. Alternative paths are tried in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub path: Vec<String>,
    #[serde(default)]
    pub intent_to_retain: bool,
}

impl PresentationDefinition {
    pub fn input_descriptor(&self, doc_type: &str) -> Option<&InputDescriptor> {
        self.input_descriptors.iter().find(|d| d.id == doc_type)
    }
}

/// A JSONPath of the form `$['namespace']['element']`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath {
    pub namespace: String,
    pub element_identifier: String,
}

#[derive(Debug, thiserror::Error)]
#[error("unable to parse field path \"{0}\", expected $['namespace']['element']")]
pub struct FieldPathError(pub String);

impl FromStr for FieldPath {
    type Err = FieldPathError;

    /// The first two `['...']` segments name the namespace and the element.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut segments = path.split("['").skip(1).filter_map(|s| {
            let end = s.find("']")?;
            Some(&s[..end])
        });
        match (segments.next(), segments.next()) {
            (Some(namespace), Some(element)) if !namespace.is_empty() && !element.is_empty() => {
                Ok(FieldPath {
                    namespace: namespace.to_string(),
                    element_identifier: element.to_string(),
                })
            }
            _ => Err(FieldPathError(path.to_string())),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "$['{}']['{}']", self.namespace, self.element_identifier)
    }
}
