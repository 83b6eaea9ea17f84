//! The module data model: loose drafts produced by the model and the typed
//! [`ExtensionModule`] handed to the module store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Closed set of module categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ModuleCategory {
    ContentFilter,
    ContentEnhance,
    StyleModifier,
    Theme,
    FunctionEnhance,
    Automation,
    Navigation,
    DataExtract,
    DataSave,
    Interaction,
    Accessibility,
    Media,
    Video,
    Image,
    Audio,
    Security,
    AntiTracking,
    Social,
    Shopping,
    Reading,
    Translate,
    Developer,
    Other,
}

impl ModuleCategory {
    /// Every category, in prompt order.
    pub const ALL: [ModuleCategory; 23] = [
        ModuleCategory::ContentFilter,
        ModuleCategory::ContentEnhance,
        ModuleCategory::StyleModifier,
        ModuleCategory::Theme,
        ModuleCategory::FunctionEnhance,
        ModuleCategory::Automation,
        ModuleCategory::Navigation,
        ModuleCategory::DataExtract,
        ModuleCategory::DataSave,
        ModuleCategory::Interaction,
        ModuleCategory::Accessibility,
        ModuleCategory::Media,
        ModuleCategory::Video,
        ModuleCategory::Image,
        ModuleCategory::Audio,
        ModuleCategory::Security,
        ModuleCategory::AntiTracking,
        ModuleCategory::Social,
        ModuleCategory::Shopping,
        ModuleCategory::Reading,
        ModuleCategory::Translate,
        ModuleCategory::Developer,
        ModuleCategory::Other,
    ];

    /// The tag used in prompts and module JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::ContentFilter => "CONTENT_FILTER",
            ModuleCategory::ContentEnhance => "CONTENT_ENHANCE",
            ModuleCategory::StyleModifier => "STYLE_MODIFIER",
            ModuleCategory::Theme => "THEME",
            ModuleCategory::FunctionEnhance => "FUNCTION_ENHANCE",
            ModuleCategory::Automation => "AUTOMATION",
            ModuleCategory::Navigation => "NAVIGATION",
            ModuleCategory::DataExtract => "DATA_EXTRACT",
            ModuleCategory::DataSave => "DATA_SAVE",
            ModuleCategory::Interaction => "INTERACTION",
            ModuleCategory::Accessibility => "ACCESSIBILITY",
            ModuleCategory::Media => "MEDIA",
            ModuleCategory::Video => "VIDEO",
            ModuleCategory::Image => "IMAGE",
            ModuleCategory::Audio => "AUDIO",
            ModuleCategory::Security => "SECURITY",
            ModuleCategory::AntiTracking => "ANTI_TRACKING",
            ModuleCategory::Social => "SOCIAL",
            ModuleCategory::Shopping => "SHOPPING",
            ModuleCategory::Reading => "READING",
            ModuleCategory::Translate => "TRANSLATE",
            ModuleCategory::Developer => "DEVELOPER",
            ModuleCategory::Other => "OTHER",
        }
    }

    /// Short display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleCategory::ContentFilter => "Content Filter",
            ModuleCategory::ContentEnhance => "Content Enhance",
            ModuleCategory::StyleModifier => "Style Modifier",
            ModuleCategory::Theme => "Theme",
            ModuleCategory::FunctionEnhance => "Function Enhance",
            ModuleCategory::Automation => "Automation",
            ModuleCategory::Navigation => "Navigation",
            ModuleCategory::DataExtract => "Data Extract",
            ModuleCategory::DataSave => "Data Save",
            ModuleCategory::Interaction => "Interaction",
            ModuleCategory::Accessibility => "Accessibility",
            ModuleCategory::Media => "Media",
            ModuleCategory::Video => "Video",
            ModuleCategory::Image => "Image",
            ModuleCategory::Audio => "Audio",
            ModuleCategory::Security => "Security & Privacy",
            ModuleCategory::AntiTracking => "Anti-Tracking",
            ModuleCategory::Social => "Social",
            ModuleCategory::Shopping => "Shopping",
            ModuleCategory::Reading => "Reading",
            ModuleCategory::Translate => "Translate",
            ModuleCategory::Developer => "Developer",
            ModuleCategory::Other => "Other",
        }
    }

    /// One-line description used in category hints.
    pub fn description(&self) -> &'static str {
        match self {
            ModuleCategory::ContentFilter => "Hide or remove ads, popups and unwanted page elements",
            ModuleCategory::ContentEnhance => "Add information or improve how page content is presented",
            ModuleCategory::StyleModifier => "Change fonts, colors, spacing and layout",
            ModuleCategory::Theme => "Apply a complete visual theme such as dark mode",
            ModuleCategory::FunctionEnhance => "Add new interactive features to a page",
            ModuleCategory::Automation => "Fill forms, click buttons or repeat tasks automatically",
            ModuleCategory::Navigation => "Improve scrolling, paging and in-page navigation",
            ModuleCategory::DataExtract => "Collect structured data from the page",
            ModuleCategory::DataSave => "Save page content for later use",
            ModuleCategory::Interaction => "Change gestures, clicks and keyboard behavior",
            ModuleCategory::Accessibility => "Make pages easier to read and operate",
            ModuleCategory::Media => "Control media playback in general",
            ModuleCategory::Video => "Enhance video players",
            ModuleCategory::Image => "View, zoom or save images",
            ModuleCategory::Audio => "Control audio playback",
            ModuleCategory::Security => "Protect privacy and block risky behavior",
            ModuleCategory::AntiTracking => "Block trackers and fingerprinting",
            ModuleCategory::Social => "Improve social network pages",
            ModuleCategory::Shopping => "Compare prices and simplify shopping pages",
            ModuleCategory::Reading => "Reader mode and long-form reading aids",
            ModuleCategory::Translate => "Translate page text",
            ModuleCategory::Developer => "Debugging and inspection helpers",
            ModuleCategory::Other => "Anything that fits no other category",
        }
    }

    /// Case-insensitive parse; unknown tags map to [`ModuleCategory::Other`].
    pub fn parse_lenient(tag: &str) -> Self {
        let normalized = tag.trim().to_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .unwrap_or(ModuleCategory::Other)
    }
}

/// The page-lifecycle point at which a module's code executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunAt {
    /// Before the DOM is ready; suitable for intercepting requests.
    DocumentStart,
    /// After the DOM is loaded.
    #[default]
    DocumentEnd,
    /// After the page has fully loaded.
    DocumentIdle,
}

impl RunAt {
    /// Every run-timing value, in prompt order.
    pub const ALL: [RunAt; 3] = [RunAt::DocumentStart, RunAt::DocumentEnd, RunAt::DocumentIdle];

    /// The tag used in prompts and module JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunAt::DocumentStart => "DOCUMENT_START",
            RunAt::DocumentEnd => "DOCUMENT_END",
            RunAt::DocumentIdle => "DOCUMENT_IDLE",
        }
    }

    /// Case-insensitive parse; unknown values map to [`RunAt::DocumentEnd`].
    pub fn parse_lenient(tag: &str) -> Self {
        let normalized = tag.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .unwrap_or_default()
    }
}

/// Input widget type of a module configuration item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ConfigItemType {
    #[default]
    Text,
    Textarea,
    Number,
    Boolean,
    Select,
    MultiSelect,
    Radio,
    Checkbox,
    Color,
    Url,
    Email,
    Password,
    Regex,
    CssSelector,
    Javascript,
    Json,
    Range,
    Date,
    Time,
    Datetime,
    File,
    Image,
}

impl ConfigItemType {
    /// Case-insensitive parse; unknown types map to [`ConfigItemType::Text`].
    pub fn parse_lenient(tag: &str) -> Self {
        let quoted = format!("\"{}\"", tag.trim().to_uppercase());
        serde_json::from_str(&quoted).unwrap_or_default()
    }
}

/// A configuration item as described by the model.
///
/// Every field is optional on the wire; scalars of any JSON type are
/// accepted for the string fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigItemDescriptor {
    /// Lookup key used by `getConfig(key)`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Help text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Widget type tag (see [`ConfigItemType`]).
    #[serde(default = "default_config_type", rename = "type", deserialize_with = "lenient_string")]
    pub item_type: String,
    /// Default value as text.
    #[serde(
        default,
        rename = "defaultValue",
        alias = "default_value",
        deserialize_with = "lenient_string"
    )]
    pub default_value: String,
    /// Allowed options for select-like widgets.
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub options: Vec<String>,
    /// Whether a value must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// A module draft produced by the model and refined by the fix loop.
///
/// Drafts are replaced wholesale at every repair iteration; a draft that has
/// been emitted to a consumer is never modified in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModuleData {
    /// Module name.
    #[serde(default = "default_module_name", deserialize_with = "lenient_string")]
    pub name: String,
    /// One-sentence description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Emoji icon.
    #[serde(default = "default_module_icon", deserialize_with = "lenient_string")]
    pub icon: String,
    /// Category tag (see [`ModuleCategory`]).
    #[serde(default = "default_category", deserialize_with = "lenient_string")]
    pub category: String,
    /// JavaScript body.
    #[serde(default, alias = "jsCode", deserialize_with = "lenient_string")]
    pub js_code: String,
    /// CSS body.
    #[serde(default, alias = "cssCode", deserialize_with = "lenient_string")]
    pub css_code: String,
    /// Configuration items.
    #[serde(default, alias = "configItems", deserialize_with = "lenient_config_items")]
    pub config_items: Vec<ConfigItemDescriptor>,
    /// URL match patterns; empty matches every site.
    #[serde(default, alias = "urlMatches", deserialize_with = "lenient_string_list")]
    pub url_matches: Vec<String>,
    /// Run-timing tag (see [`RunAt`]).
    #[serde(default = "default_run_at", alias = "runAt", deserialize_with = "lenient_string")]
    pub run_at: String,
    /// Result of the last security scan; `None` until a scan ran.
    #[serde(default)]
    pub security_safe: Option<bool>,
}

impl GeneratedModuleData {
    /// A best-effort draft built from bare code blocks.
    pub fn from_code(js_code: impl Into<String>, css_code: impl Into<String>) -> Self {
        Self {
            name: default_module_name(),
            description: "Extension module generated from the requirement".to_string(),
            icon: default_module_icon(),
            category: default_category(),
            js_code: js_code.into(),
            css_code: css_code.into(),
            config_items: Vec::new(),
            url_matches: Vec::new(),
            run_at: default_run_at(),
            security_safe: None,
        }
    }

    /// Copy with replaced JavaScript.
    pub fn with_js_code(&self, js_code: impl Into<String>) -> Self {
        Self {
            js_code: js_code.into(),
            ..self.clone()
        }
    }

    /// Copy stamped with a security scan verdict.
    pub fn with_security_safe(&self, safe: bool) -> Self {
        Self {
            security_safe: Some(safe),
            ..self.clone()
        }
    }

    /// Typed category.
    pub fn category(&self) -> ModuleCategory {
        ModuleCategory::parse_lenient(&self.category)
    }

    /// Typed run timing.
    pub fn run_at(&self) -> RunAt {
        RunAt::parse_lenient(&self.run_at)
    }

    /// Converts the draft into a module ready for persistence.
    pub fn to_extension_module(&self) -> ExtensionModule {
        let icon = if self.icon.trim().is_empty() {
            "📦".to_string()
        } else {
            self.icon.clone()
        };
        ExtensionModule {
            id: Uuid::new_v4().to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon,
            category: self.category(),
            code: self.js_code.clone(),
            css_code: self.css_code.clone(),
            run_at: self.run_at(),
            url_matches: self.url_matches.clone(),
            config_items: self
                .config_items
                .iter()
                .map(|item| ModuleConfigItem {
                    key: item.key.clone(),
                    name: item.name.clone(),
                    description: item.description.clone(),
                    item_type: ConfigItemType::parse_lenient(&item.item_type),
                    default_value: item.default_value.clone(),
                    options: item.options.clone(),
                    required: item.required,
                })
                .collect(),
            enabled: true,
            built_in: false,
            created_at: Utc::now(),
        }
    }
}

/// A typed configuration item of a persisted module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ModuleConfigItem {
    pub key: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub item_type: ConfigItemType,
    pub default_value: String,
    pub options: Vec<String>,
    pub required: bool,
}

/// A module as persisted by the host's module store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ExtensionModule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: ModuleCategory,
    pub code: String,
    pub css_code: String,
    pub run_at: RunAt,
    pub url_matches: Vec<String>,
    pub config_items: Vec<ModuleConfigItem>,
    pub enabled: bool,
    pub built_in: bool,
    pub created_at: DateTime<Utc>,
}

fn default_module_name() -> String {
    "AI Generated Module".to_string()
}

fn default_module_icon() -> String {
    "🤖".to_string()
}

fn default_category() -> String {
    ModuleCategory::Other.as_str().to_string()
}

fn default_run_at() -> String {
    RunAt::DocumentEnd.as_str().to_string()
}

fn default_config_type() -> String {
    "TEXT".to_string()
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(scalar_to_string)
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// Malformed entries are dropped instead of failing the whole module.
fn lenient_config_items<'de, D>(deserializer: D) -> Result<Vec<ConfigItemDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parse_lenient() {
        assert_eq!(ModuleCategory::parse_lenient("content_filter"), ModuleCategory::ContentFilter);
        assert_eq!(ModuleCategory::parse_lenient("Anti-Tracking"), ModuleCategory::AntiTracking);
        assert_eq!(ModuleCategory::parse_lenient("nonsense"), ModuleCategory::Other);
    }

    #[test]
    fn test_run_at_defaults_to_document_end() {
        assert_eq!(RunAt::parse_lenient("document_idle"), RunAt::DocumentIdle);
        assert_eq!(RunAt::parse_lenient("whenever"), RunAt::DocumentEnd);
    }

    #[test]
    fn test_config_item_type_parse() {
        assert_eq!(ConfigItemType::parse_lenient("css_selector"), ConfigItemType::CssSelector);
        assert_eq!(ConfigItemType::parse_lenient("slider"), ConfigItemType::Text);
    }

    #[test]
    fn test_module_json_accepts_camel_case_and_defaults() {
        let module: GeneratedModuleData = serde_json::from_value(json!({
            "jsCode": "console.info(1);",
            "runAt": "DOCUMENT_START",
            "configItems": [
                {"key": "delay", "name": "Delay", "type": "NUMBER", "default_value": 500},
                "not an object"
            ]
        }))
        .unwrap();
        assert_eq!(module.name, "AI Generated Module");
        assert_eq!(module.icon, "🤖");
        assert_eq!(module.category(), ModuleCategory::Other);
        assert_eq!(module.js_code, "console.info(1);");
        assert_eq!(module.run_at(), RunAt::DocumentStart);
        assert_eq!(module.config_items.len(), 1);
        assert_eq!(module.config_items[0].default_value, "500");
        assert!(module.security_safe.is_none());
    }

    #[test]
    fn test_copy_on_write_helpers() {
        let draft = GeneratedModuleData::from_code("let a = 1;", "");
        let fixed = draft.with_js_code("let a = 2;");
        let scanned = fixed.with_security_safe(false);
        assert_eq!(draft.js_code, "let a = 1;");
        assert_eq!(fixed.js_code, "let a = 2;");
        assert_eq!(scanned.security_safe, Some(false));
    }

    #[test]
    fn test_to_extension_module() {
        let mut draft = GeneratedModuleData::from_code("let a = 1;", "body{}");
        draft.icon = "  ".into();
        draft.category = "theme".into();
        draft.config_items.push(ConfigItemDescriptor {
            key: "color".into(),
            name: "Color".into(),
            item_type: "color".into(),
            ..Default::default()
        });
        let module = draft.to_extension_module();
        assert_eq!(module.icon, "📦");
        assert_eq!(module.category, ModuleCategory::Theme);
        assert_eq!(module.config_items[0].item_type, ConfigItemType::Color);
        assert!(module.enabled);
        assert!(!module.built_in);
    }
}
