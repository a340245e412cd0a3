// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog query conditions.
//!
//! Conditions render to the catalog's query language, joined with `;`:
//!
//! ```text
//! name EQ 'login';scm_repository EQ {id EQ 5};id IN 1,2
//! ```

use std::fmt;
use tsync_core::EntityId;

/// One filter clause of an entity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `field EQ 'value'`
    Equals { field: String, value: String },
    /// `field EQ {id EQ id}`
    RefersTo { field: String, id: String },
    /// `field EQ {logical_name EQ 'name'}`
    RefersToLogicalName { field: String, logical_name: String },
    /// `id IN a,b,c`
    IdIn(Vec<EntityId>),
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn refers_to(field: &str, id: impl Into<String>) -> Self {
        Self::RefersTo {
            field: field.to_string(),
            id: id.into(),
        }
    }

    pub fn refers_to_logical_name(field: &str, logical_name: impl Into<String>) -> Self {
        Self::RefersToLogicalName {
            field: field.to_string(),
            logical_name: logical_name.into(),
        }
    }

    pub fn id_in(ids: &[EntityId]) -> Self {
        Self::IdIn(ids.to_vec())
    }
}

/// Quote a literal, escaping backslashes and single quotes.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { field, value } => write!(f, "{field} EQ {}", quote(value)),
            Condition::RefersTo { field, id } => write!(f, "{field} EQ {{id EQ {id}}}"),
            Condition::RefersToLogicalName {
                field,
                logical_name,
            } => write!(f, "{field} EQ {{logical_name EQ {}}}", quote(logical_name)),
            Condition::IdIn(ids) => {
                let ids: Vec<&str> = ids.iter().map(EntityId::as_str).collect();
                write!(f, "id IN {}", ids.join(","))
            }
        }
    }
}

/// A filtered query against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    pub collection: String,
    pub conditions: Vec<Condition>,
    /// Fields to return besides `id`; empty means the catalog default.
    pub fields: Vec<String>,
    pub offset: u32,
    pub limit: Option<u32>,
}

impl EntityQuery {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            conditions: Vec::new(),
            fields: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The `query` parameter value, quoted as the catalog expects.
    pub fn render(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self.conditions.iter().map(ToString::to_string).collect();
        Some(format!("\"{}\"", clauses.join(";")))
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
