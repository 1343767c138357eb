//! Descriptions wrapping another description to change how it is selected,
//! defaulted or merged.

use super::{ConfigDescription, Description, Fallback, Input, ParseResult, ParserContext, settle};
use serde_json::Value;
use std::sync::Arc;

/// Predicate evaluated on raw data.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Route the data to one of two descriptions based on a predicate. The
/// selected description never sees the inherited value.
pub struct ConditionalDescription {
    predicate: Predicate,
    if_description: Description,
    else_description: Description,
}

impl ConditionalDescription {
    pub fn new(
        predicate: Predicate,
        if_description: Description,
        else_description: Description,
    ) -> Self {
        Self {
            predicate,
            if_description,
            else_description,
        }
    }
}

impl ConfigDescription for ConditionalDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        match settle(data, context, Fallback::Mandatory) {
            Input::Present(value) => {
                let description = if (self.predicate)(value) {
                    &self.if_description
                } else {
                    &self.else_description
                };
                description.parse(Some(value), &context.without_parent())
            }
            Input::Settled(result) => result,
        }
    }
}

/// Substitute a default when no file provides the entry. Without a default
/// value, the entry is optional and stays undefined.
pub struct DefaultValueDescription {
    inner: Description,
    default: Option<Value>,
}

impl DefaultValueDescription {
    pub fn new(inner: Description, default: Option<Value>) -> Self {
        Self { inner, default }
    }
}

impl ConfigDescription for DefaultValueDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        let fallback = match &self.default {
            Some(value) => Fallback::Value(value),
            None => Fallback::Absent,
        };
        match settle(data, context, fallback) {
            Input::Present(value) => self.inner.parse(Some(value), context),
            Input::Settled(result) => result,
        }
    }
}

/// Replace the inherited value wholesale instead of merging into it.
pub struct OverrideDescription {
    inner: Description,
}

impl OverrideDescription {
    pub fn new(inner: Description) -> Self {
        Self { inner }
    }
}

impl ConfigDescription for OverrideDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        match (data, &context.parent) {
            (None, Some(parent)) => Ok(Some(parent.clone())),
            _ => self.inner.parse(data, &context.without_parent()),
        }
    }
}
