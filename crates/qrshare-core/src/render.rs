//! Display model for scanned health record bundles.

use serde::Serialize;
use serde_json::Value;

use crate::model::HealthBundle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    pub resource_type: String,
    pub title: String,
    pub raw_json: String,
}

impl DisplayEntry {
    /// Collapsed header line, e.g. `Patient - Jane Doe`.
    pub fn heading(&self) -> String {
        format!("{} - {}", self.resource_type, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DisplayModel {
    pub entries: Vec<DisplayEntry>,
}

/// Maps every bundle entry to a title and its pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleRenderer;

impl BundleRenderer {
    pub fn render(&self, bundle: &HealthBundle) -> DisplayModel {
        DisplayModel {
            entries: bundle
                .entries
                .iter()
                .map(|entry| DisplayEntry {
                    resource_type: entry.resource_type.clone(),
                    title: resource_title(&entry.resource_type, &entry.resource),
                    raw_json: serde_json::to_string_pretty(&entry.resource)
                        .unwrap_or_else(|_| entry.resource.to_string()),
                })
                .collect(),
        }
    }
}

pub fn resource_title(resource_type: &str, resource: &Value) -> String {
    match resource_type {
        "Patient" => {
            let name = resource.pointer("/name/0");
            let given = name
                .and_then(|n| n.pointer("/given/0"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let family = name
                .and_then(|n| n.get("family"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("{given} {family}")
        }
        "Observation" => coded_title(resource).unwrap_or("Observation").to_string(),
        "Condition" => coded_title(resource).unwrap_or("Condition").to_string(),
        "MedicationRequest" => non_empty_str(resource.pointer("/medicationCodeableConcept/text"))
            .unwrap_or("Medication")
            .to_string(),
        other => other.to_string(),
    }
}

fn coded_title(resource: &Value) -> Option<&str> {
    non_empty_str(resource.pointer("/code/text"))
        .or_else(|| non_empty_str(resource.pointer("/code/coding/0/display")))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
