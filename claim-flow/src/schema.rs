//! Declarative output schemas for structured completions.
//!
//! A [`Schema`] is consumed twice: the prompt renderer embeds its
//! [`format_instructions`](Schema::format_instructions) and the completion client checks the
//! model's reply against it with [`parse_response`](Schema::parse_response).

use serde_json::{Map, Value, json};

use crate::error::CompletionError;

/// Type of a single schema field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    Number { minimum: Option<f64> },
    Enum(&'static [&'static str]),
}

/// A required field of a structured response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl Field {
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
            description,
        }
    }

    pub const fn number(
        name: &'static str,
        minimum: Option<f64>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Number { minimum },
            description,
        }
    }

    pub const fn enumeration(
        name: &'static str,
        values: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Enum(values),
            description,
        }
    }

    fn json_schema(&self) -> Value {
        match self.kind {
            FieldKind::String => json!({
                "type": "string",
                "description": self.description,
            }),
            FieldKind::Number { minimum } => {
                let mut property = json!({
                    "type": "number",
                    "description": self.description,
                });
                if let Some(minimum) = minimum {
                    property["minimum"] = json!(minimum);
                }
                property
            }
            FieldKind::Enum(values) => json!({
                "type": "string",
                "enum": values,
                "description": self.description,
            }),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match self.kind {
            FieldKind::String => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| format!("field `{}` must be a string", self.name)),
            FieldKind::Number { minimum } => {
                let number = value
                    .as_f64()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| format!("field `{}` must be a finite number", self.name))?;
                match minimum {
                    Some(min) if number < min => Err(format!(
                        "field `{}` must be at least {}, got {}",
                        self.name, min, number
                    )),
                    _ => Ok(()),
                }
            }
            FieldKind::Enum(values) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| format!("field `{}` must be a string", self.name))?;
                if values.contains(&text) {
                    Ok(())
                } else {
                    Err(format!(
                        "field `{}` must be one of {:?}, got {:?}",
                        self.name, values, text
                    ))
                }
            }
        }
    }
}

/// Shape of a structured completion result. All fields are required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self { name, fields }
    }

    /// JSON-schema document describing this schema
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.to_string(), field.json_schema()))
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|field| field.name).collect();

        json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Instructions telling the model how to format its reply
    pub fn format_instructions(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.json_schema())
            .unwrap_or_else(|_| self.json_schema().to_string());
        format!(
            "The output must be a single JSON object that conforms to the JSON schema below.\n\
             Respond with the JSON object ONLY: no Markdown, no code fences, no commentary.\n\
             Enum fields must use one of the listed values exactly.\n\n{schema}"
        )
    }

    /// Check that `value` has every field with the declared type.
    /// Keys not declared by the schema are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{} must be a JSON object", self.name))?;

        for field in self.fields {
            let field_value = object
                .get(field.name)
                .ok_or_else(|| format!("missing required field `{}`", field.name))?;
            field.check(field_value)?;
        }
        Ok(())
    }

    /// Parse a raw model reply and validate it against this schema
    pub fn parse_response(&self, raw: &str) -> Result<Value, CompletionError> {
        let cleaned = extract_json(raw);
        let value: Value = serde_json::from_str(cleaned).map_err(|e| {
            CompletionError::new(format!(
                "could not parse {} response as JSON: {}. Raw response: {}",
                self.name, e, raw
            ))
        })?;

        self.validate(&value).map_err(|e| {
            CompletionError::new(format!("{} response does not match schema: {}", self.name, e))
        })?;
        Ok(value)
    }
}

/// Strip code fences and any prose around the outermost JSON object
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = match trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        // Closing fence may be followed by more text
        Some(rest) => match rest.rfind("```") {
            Some(end) => &rest[..end],
            None => rest,
        },
        None => trimmed,
    };

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced.trim(),
    }
}
