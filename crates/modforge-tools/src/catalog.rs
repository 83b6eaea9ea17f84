//! The immutable tool catalog and its function-calling schema export.

use modforge_core::{json_type_name, ModforgeError, ModforgeResult, ToolArguments};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

/// `syntax_check` tool name.
pub const SYNTAX_CHECK: &str = "syntax_check";
/// `lint_code` tool name.
pub const LINT_CODE: &str = "lint_code";
/// `security_scan` tool name.
pub const SECURITY_SCAN: &str = "security_scan";
/// `fix_error` tool name.
pub const FIX_ERROR: &str = "fix_error";
/// `validate_config` tool name.
pub const VALIDATE_CONFIG: &str = "validate_config";
/// `get_templates` tool name.
pub const GET_TEMPLATES: &str = "get_templates";
/// `get_snippets` tool name.
pub const GET_SNIPPETS: &str = "get_snippets";
/// `create_module` tool name.
pub const CREATE_MODULE: &str = "create_module";

/// Broad grouping of catalog tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Inspects code without changing it.
    Analysis,
    /// Rewrites code.
    Repair,
    /// Checks module metadata.
    Validation,
    /// Looks up templates and snippets.
    Knowledge,
    /// Creates modules in the host store.
    ModuleOps,
}

/// Primitive JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[allow(missing_docs)]
    String,
    #[allow(missing_docs)]
    Number,
    #[allow(missing_docs)]
    Boolean,
    #[allow(missing_docs)]
    Array,
    #[allow(missing_docs)]
    Object,
}

impl ParamType {
    /// JSON-Schema type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// True when `value` has this type.
    pub fn matches(&self, value: &Value) -> bool {
        json_type_name(value) == self.as_str()
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument name.
    pub name: String,
    /// Expected JSON type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Description for the model.
    pub description: String,
    /// Whether the argument must be supplied.
    pub required: bool,
    /// Allowed values, advertised to the model.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Value assumed when the argument is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParameter {
    fn new(name: &str, param_type: ParamType, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required,
            enum_values: None,
            default: None,
        }
    }

    fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(ToString::to_string).collect());
        self
    }

    fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Grouping.
    pub category: ToolCategory,
    /// Description for the model.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    /// Renders the definition as a function-calling schema.
    pub fn to_function_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = json!({
                "type": param.param_type.as_str(),
                "description": param.description,
            });
            if let Some(values) = &param.enum_values {
                prop["enum"] = json!(values);
            }
            properties.insert(param.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }

    /// Declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Checks presence of required arguments and the type of every declared
    /// argument that is present. Undeclared arguments are ignored.
    pub fn validate(&self, args: &ToolArguments) -> ModforgeResult<()> {
        for param in &self.parameters {
            match args.get(&param.name) {
                None if param.required => {
                    return Err(ModforgeError::MissingArgument(param.name.clone()));
                }
                None => {}
                Some(value) if !param.param_type.matches(value) => {
                    return Err(ModforgeError::InvalidArgumentType {
                        name: param.name.clone(),
                        expected: param.param_type.as_str().to_string(),
                        found: json_type_name(value).to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

const LANGUAGES: &[&str] = &["javascript", "css"];

static CATALOG: LazyLock<Vec<ToolDefinition>> = LazyLock::new(|| {
    use ParamType::{Array, Object, String as Str};

    let code = |desc: &str| ToolParameter::new("code", Str, desc, true);
    let language = || {
        ToolParameter::new("language", Str, "Code language", false)
            .one_of(LANGUAGES)
            .with_default(json!("javascript"))
    };

    vec![
        ToolDefinition {
            name: SYNTAX_CHECK.into(),
            category: ToolCategory::Analysis,
            description: "Check JavaScript or CSS code for syntax errors. Returns the errors, warnings and fix suggestions.".into(),
            parameters: vec![code("Code to check"), language()],
        },
        ToolDefinition {
            name: LINT_CODE.into(),
            category: ToolCategory::Analysis,
            description: "Check code style and best practices and compute a 0-100 quality score.".into(),
            parameters: vec![code("Code to lint"), language()],
        },
        ToolDefinition {
            name: SECURITY_SCAN.into(),
            category: ToolCategory::Analysis,
            description: "Scan code for security problems such as XSS sinks and eval.".into(),
            parameters: vec![code("Code to scan")],
        },
        ToolDefinition {
            name: FIX_ERROR.into(),
            category: ToolCategory::Repair,
            description: "Automatically fix common problems detected in the code.".into(),
            parameters: vec![
                code("Code containing errors"),
                ToolParameter::new("errors", Array, "Errors reported by syntax_check", true),
                language(),
            ],
        },
        ToolDefinition {
            name: VALIDATE_CONFIG.into(),
            category: ToolCategory::Validation,
            description: "Validate module configuration items for completeness.".into(),
            parameters: vec![
                ToolParameter::new("config_items", Array, "Configuration item descriptors", true),
                ToolParameter::new("config_values", Object, "Configuration values by key", false),
            ],
        },
        ToolDefinition {
            name: GET_TEMPLATES.into(),
            category: ToolCategory::Knowledge,
            description: "Fetch module templates related to the requirement.".into(),
            parameters: vec![
                ToolParameter::new("category", Str, "Module category", false),
                ToolParameter::new("keywords", Array, "Keywords to match", false),
            ],
        },
        ToolDefinition {
            name: GET_SNIPPETS.into(),
            category: ToolCategory::Knowledge,
            description: "Search the library of reusable code snippets.".into(),
            parameters: vec![
                ToolParameter::new("query", Str, "Search keywords", true),
                ToolParameter::new("category", Str, "Snippet category", false),
            ],
        },
        ToolDefinition {
            name: CREATE_MODULE.into(),
            category: ToolCategory::ModuleOps,
            description: "Create a new extension module.".into(),
            parameters: vec![
                ToolParameter::new("name", Str, "Module name", true),
                ToolParameter::new("description", Str, "Module description", true),
                ToolParameter::new("icon", Str, "Module icon (emoji)", false),
                ToolParameter::new("category", Str, "Module category", true),
                ToolParameter::new("js_code", Str, "JavaScript code", true),
                ToolParameter::new("css_code", Str, "CSS code", false),
                ToolParameter::new("config_items", Array, "Configuration items", false),
                ToolParameter::new("url_matches", Array, "URL match rules", false),
                ToolParameter::new("run_at", Str, "When the code runs", false)
                    .one_of(&["DOCUMENT_START", "DOCUMENT_END", "DOCUMENT_IDLE"])
                    .with_default(json!("DOCUMENT_END")),
            ],
        },
    ]
});

/// Every tool, in catalog order.
pub fn all() -> &'static [ToolDefinition] {
    CATALOG.as_slice()
}

/// Looks up a tool by name.
pub fn get(name: &str) -> Option<&'static ToolDefinition> {
    CATALOG.iter().find(|def| def.name == name)
}

/// Function schemas for every tool.
pub fn function_schemas() -> Vec<Value> {
    all().iter().map(ToolDefinition::to_function_schema).collect()
}
