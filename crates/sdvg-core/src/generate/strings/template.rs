//! Row templates: `{{ other_column | upper }}` rendered per row with every
//! already-generated column in scope. Template columns are evaluated after
//! the columns they reference (see `generate::topo`); distinct and ordered
//! constraints are rejected at validation because the engine cannot
//! guarantee them through an arbitrary template.

use regex::Regex;
use std::sync::OnceLock;
use tera::Tera;

use crate::error::{Result, SdvgError};
use crate::generate::producer::{RowValues, ValueProducer};
use crate::generate::value::Value;

const TEMPLATE_NAME: &str = "column";

pub struct TemplateProducer {
    column: String,
    tera: Tera,
    total: u64,
}

impl TemplateProducer {
    pub fn new(column: &str, template: &str) -> Result<TemplateProducer> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|e| SdvgError::Template {
                column: column.to_string(),
                message: e.to_string(),
            })?;
        Ok(TemplateProducer {
            column: column.to_string(),
            tera,
            total: 1,
        })
    }
}

impl ValueProducer for TemplateProducer {
    fn values_count(&self) -> u64 {
        // The domain is whatever the referenced columns produce; report an
        // unbounded capacity so the distinct budget never clamps on it.
        u64::MAX
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, _number: f64, row: &RowValues) -> Result<Value> {
        let mut ctx = tera::Context::new();
        for (name, value) in row {
            match value {
                Value::Null => ctx.insert(name, &tera::Value::Null),
                other => ctx.insert(name, other),
            }
        }
        let rendered =
            self.tera
                .render(TEMPLATE_NAME, &ctx)
                .map_err(|e| SdvgError::Template {
                    column: self.column.clone(),
                    message: e.to_string(),
                })?;
        Ok(Value::String(rendered))
    }
}

/// Column names referenced by a template: the leading identifier of every
/// `{{ ... }}` expression. Non-identifier expressions are ignored.
pub fn template_refs(template: &str) -> Vec<String> {
    static REF_RE: OnceLock<Regex> = OnceLock::new();
    let re = REF_RE
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)").expect("static regex"));
    let mut refs: Vec<String> = re
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect();
    refs.sort();
    refs.dedup();
    refs
}
