use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use zdk_core::VendorFormat;

/// Generates JSON schema from a Rust type
pub fn generate_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// Generates a tool parameter schema from a Rust type.
///
/// Same as [`generate_schema`] without the `$schema` and `title` keys, which
/// vendors either ignore or reject inside tool definitions.
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let mut schema = generate_schema::<T>();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

/// Tool schema builder for manual schema creation
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub type_: String,
    pub properties: serde_json::Map<String, Value>,
    pub required: Vec<String>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self {
            type_: "object".to_string(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        type_: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut prop = serde_json::Map::new();
        prop.insert("type".to_string(), Value::String(type_.into()));
        prop.insert("description".to_string(), Value::String(description.into()));

        self.properties.insert(name.into(), Value::Object(prop));
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn build(self) -> Value {
        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), Value::String(self.type_));
        schema.insert("properties".to_string(), Value::Object(self.properties));
        schema.insert(
            "required".to_string(),
            Value::Array(self.required.into_iter().map(Value::String).collect()),
        );

        Value::Object(schema)
    }
}

impl Default for ToolSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// One advertised operation: qualified name, description and parameter schema.
///
/// This is the only thing the agent loop learns about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchemaDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchemaDescriptor {
    /// Render as the tool definition a vendor API expects.
    pub fn to_vendor(&self, format: VendorFormat) -> Value {
        let parameters = if self.parameters.is_object() {
            self.parameters.clone()
        } else {
            ToolSchema::new().build()
        };

        match format {
            VendorFormat::Claude => json!({
                "name": self.name,
                "description": self.description,
                "input_schema": parameters,
            }),
            VendorFormat::Gpt => json!({
                "type": "function",
                "function": {
                    "name": self.name,
                    "description": self.description,
                    "parameters": parameters,
                },
            }),
            VendorFormat::Gemini => json!({
                "name": self.name,
                "description": self.description,
                "parameters": parameters,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct TestParams {
        name: String,
        age: u32,
    }

    #[test]
    fn test_generate_schema() {
        let schema = generate_schema::<TestParams>();
        assert!(schema.is_object());

        let obj = schema.as_object().unwrap();
        assert!(obj.contains_key("$schema"));
    }

    #[test]
    fn test_parameters_schema_strips_meta_keys() {
        let schema = parameters_schema::<TestParams>();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("$schema"));
        assert!(!obj.contains_key("title"));
        assert_eq!(obj["type"], "object");
        assert!(obj["properties"]["age"].is_object());
    }

    #[test]
    fn test_tool_schema_builder() {
        let schema = ToolSchema::new()
            .property("expression", "string", "Math expression to calculate")
            .required("expression")
            .build();

        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].is_object());
        assert_eq!(
            schema["required"],
            Value::Array(vec![Value::String("expression".to_string())])
        );
    }

    #[test]
    fn test_vendor_definitions() {
        let descriptor = ToolSchemaDescriptor {
            name: "echo__echo".to_string(),
            description: "Echo a message".to_string(),
            parameters: ToolSchema::new().property("message", "string", "text").build(),
        };

        let claude = descriptor.to_vendor(VendorFormat::Claude);
        assert_eq!(claude["name"], "echo__echo");
        assert_eq!(claude["input_schema"]["type"], "object");

        let gpt = descriptor.to_vendor(VendorFormat::Gpt);
        assert_eq!(gpt["type"], "function");
        assert_eq!(gpt["function"]["name"], "echo__echo");
        assert!(gpt["function"]["parameters"]["properties"]["message"].is_object());

        let gemini = descriptor.to_vendor(VendorFormat::Gemini);
        assert_eq!(gemini["parameters"]["type"], "object");
    }

    #[test]
    fn test_null_parameters_become_empty_object_schema() {
        let descriptor = ToolSchemaDescriptor {
            name: "x__ping".to_string(),
            description: String::new(),
            parameters: Value::Null,
        };
        let claude = descriptor.to_vendor(VendorFormat::Claude);
        assert_eq!(claude["input_schema"]["type"], "object");
    }
}
