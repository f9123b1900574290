//! The serialization contract between the core and the external `Logger`
//! (spec §6, design note in §9: "large integers in telemetry are rendered as
//! decimal strings, recursively, so any JSON-producing path handles them
//! without loss").

use primitive_types::U256;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// An attribute value attached to a pre-assembled span. `U256` renders as a
/// decimal string; nested lists/maps recurse through the same rule.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    String(String),
    Bool(bool),
    Int(i64),
    U256(U256),
    List(Vec<AttrValue>),
}

impl Serialize for AttrValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AttrValue::String(s) => serializer.serialize_str(s),
            AttrValue::Bool(b) => serializer.serialize_bool(*b),
            AttrValue::Int(i) => serializer.serialize_i64(*i),
            AttrValue::U256(u) => serializer.serialize_str(&u.to_string()),
            AttrValue::List(items) => items.serialize(serializer),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<U256> for AttrValue {
    fn from(u: U256) -> Self {
        AttrValue::U256(u)
    }
}

/// A span `TelemetryAssembler` has fully pre-computed, ready for the
/// external `Logger` to export without further transformation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PreAssembledSpan {
    pub name: String,
    pub attrs: BTreeMap<String, AttrValue>,
    pub events: Vec<SpanEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpanEvent {
    pub name: String,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl PreAssembledSpan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_event(mut self, event: SpanEvent) -> Self {
        self.events.push(event);
        self
    }
}

impl SpanEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// An opaque, collaborator-supplied tracing context the `Logger` can attach
/// a pre-assembled span to (e.g. a parent span id). Left opaque because the
/// OpenTelemetry exporter wiring is out of scope (spec §1).
#[derive(Clone, Debug, Default)]
pub struct SpanContext(pub Option<String>);

/// The §6 `Logger` collaborator.
#[async_trait::async_trait]
pub trait Logger: Send + Sync {
    async fn export_pre_assembled_span(&self, report: PreAssembledSpan, ctx: Option<SpanContext>);
}

/// Exports a span through `tracing` rather than an OpenTelemetry pipeline
/// (exporter wiring is out of scope per spec §1); the `severity` attribute,
/// when present, picks the tracing level so a HIGH-severity settlement shows
/// up as an error in whatever the process's subscriber is forwarding to.
pub struct TracingLogger;

#[async_trait::async_trait]
impl Logger for TracingLogger {
    async fn export_pre_assembled_span(&self, report: PreAssembledSpan, _ctx: Option<SpanContext>) {
        match severity_of(&report) {
            Some("HIGH") => {
                tracing::error!(name = %report.name, attrs = ?report.attrs, "settlement span")
            }
            Some("MEDIUM") => {
                tracing::warn!(name = %report.name, attrs = ?report.attrs, "settlement span")
            }
            _ => tracing::info!(name = %report.name, attrs = ?report.attrs, "settlement span"),
        }
        for event in &report.events {
            tracing::info!(name = %event.name, attrs = ?event.attrs, "settlement span event");
        }
    }
}

fn severity_of(report: &PreAssembledSpan) -> Option<&str> {
    match report.attrs.get("severity") {
        Some(AttrValue::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_attrs_serialize_as_decimal_strings() {
        let span = PreAssembledSpan::new("order")
            .with_attr("profit", AttrValue::from(U256::from(42u64)))
            .with_attr("ok", AttrValue::from(true));
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["attrs"]["profit"], "42");
        assert_eq!(json["attrs"]["ok"], true);
    }

    #[test]
    fn lists_of_u256_recurse() {
        let list = AttrValue::List(vec![
            AttrValue::from(U256::from(1u64)),
            AttrValue::from(U256::from(2u64)),
        ]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!(["1", "2"]));
    }
}
