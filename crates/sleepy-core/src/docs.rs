//! Documentation listing for registered calls
//!
//! [`Api::docs`](crate::Api::docs) walks every registered call and produces a
//! serializable [`ApiDoc`]. Fields annotated `hidden` are left out of the
//! response model listings; request listings show every field.

use crate::call::{CallSpec, InputVar};
use crate::schema::{Annotations, Direction, FieldSchema, Record};
use serde::Serialize;

/// Every registered call
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ApiDoc {
    pub calls: Vec<CallDoc>,
}

impl ApiDoc {
    /// Find a call by operation name
    pub fn call(&self, operation_name: &str) -> Option<&CallDoc> {
        self.calls.iter().find(|c| c.operation_name == operation_name)
    }
}

/// One call's documentation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallDoc {
    pub operation_name: String,
    pub method: String,
    pub path: String,
    pub path_params: Vec<ParamDoc>,
    pub query_params: Vec<ParamDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reads: Option<ModelDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<ModelDoc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParamDoc {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelDoc {
    pub name: String,
    pub fields: Vec<FieldDoc>,
}

/// A documented field; nested fields use dotted names
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldDoc {
    pub name: String,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
}

impl From<&InputVar> for ParamDoc {
    fn from(var: &InputVar) -> Self {
        Self {
            name: var.name.clone(),
            description: var.description.clone(),
            required: var.required,
        }
    }
}

impl From<&CallSpec> for CallDoc {
    fn from(call: &CallSpec) -> Self {
        Self {
            operation_name: call.operation_name().to_string(),
            method: call.method().to_string(),
            path: call.path().to_string(),
            path_params: call.path_vars().iter().map(ParamDoc::from).collect(),
            query_params: call.query_vars().iter().map(ParamDoc::from).collect(),
            reads: call.input_schema().map(ModelDoc::from),
            returns: call.output_schema().map(ModelDoc::from),
        }
    }
}

impl From<&FieldSchema> for ModelDoc {
    fn from(schema: &FieldSchema) -> Self {
        let mut fields = Vec::new();
        let omit_hidden = schema.direction() == Direction::Out;
        collect_fields(schema.record(), "", omit_hidden, &mut fields);
        Self {
            name: schema.model_name().to_string(),
            fields,
        }
    }
}

/// `hidden` only applies to responses
fn collect_fields(record: &Record, parent: &str, omit_hidden: bool, out: &mut Vec<FieldDoc>) {
    for field in &record.fields {
        // Tokens were checked when the schema was introspected.
        let annotations: Annotations = field.annotations.parse().unwrap_or_default();
        if omit_hidden && annotations.hidden {
            continue;
        }

        let name = if parent.is_empty() {
            field.name.to_string()
        } else {
            format!("{}.{}", parent, field.name)
        };

        out.push(FieldDoc {
            name: name.clone(),
            required: annotations.required,
            read_only: annotations.read_only,
            write_only: annotations.write_only,
        });

        if let Some(nested) = &field.nested {
            collect_fields(nested, &name, omit_hidden, out);
        }
    }
}
