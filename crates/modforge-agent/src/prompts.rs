//! Prompt text for module generation and repair.

use modforge_core::{ModuleCategory, RunAt};
use modforge_tools::CodeError;
use std::fmt::Write as _;

const PREAMBLE: &str = "\
You are an expert developer of browser extension modules. Your task is to \
generate high-quality module code from the user's requirement.

## Module System
Modules are JavaScript/CSS code injected into web pages, similar to browser \
extensions or userscripts. The host injects and runs each module when a page \
loads.";

const RUNTIME_CONTRACT: &str = "\
## Available Runtime APIs
```javascript
// Read a user configuration value
getConfig(key: string, defaultValue: any): any

// Module information
__MODULE_INFO__ = { id: string, name: string, version: string }

// User configuration values
__MODULE_CONFIG__ = { [key: string]: any }
```";

const CODING_RULES: &str = "\
## Coding Rules
1. Use 'use strict' mode
2. The code is already wrapped in an IIFE; do not wrap it again
3. Use const/let instead of var
4. Use === instead of ==
5. Handle errors with try-catch where appropriate
6. Use MutationObserver to follow dynamic content
7. Never use unsafe functions such as eval or document.write
8. Add clear comments";

const OUTPUT_CONTRACT: &str = r#"## Output Format
Reply with exactly one JSON object in a ```json fenced block and nothing else:

```json
{
  "name": "Module name (short and clear)",
  "description": "What the module does (one sentence)",
  "icon": "A fitting emoji",
  "category": "Category tag, e.g. CONTENT_FILTER",
  "run_at": "Run timing, e.g. DOCUMENT_END",
  "js_code": "JavaScript code (escaped string)",
  "css_code": "CSS code, or an empty string",
  "config_items": [
    {
      "key": "config_key",
      "name": "Display name",
      "description": "What the setting controls",
      "type": "TEXT|NUMBER|BOOLEAN|SELECT|TEXTAREA",
      "defaultValue": "Default value",
      "options": ["Option1", "Option2"]
    }
  ],
  "url_matches": ["URL pattern, e.g. *://*.example.com/*"]
}
```

## Notes
1. js_code must run as-is; no IIFE wrapper
2. Escape special characters in strings
3. Leave url_matches empty to match every site
4. Leave config_items empty when the module needs no settings"#;

/// System prompt for a development request.
pub fn development_system_prompt(
    category: Option<ModuleCategory>,
    existing_code: Option<&str>,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "{PREAMBLE}\n\n{RUNTIME_CONTRACT}\n\n{CODING_RULES}\n");

    let _ = writeln!(prompt, "## Module Categories");
    let tags: Vec<&str> = ModuleCategory::ALL.iter().map(ModuleCategory::as_str).collect();
    let _ = writeln!(prompt, "Available categories: {}\n", tags.join(", "));

    let _ = writeln!(prompt, "## Run Timing");
    for run_at in RunAt::ALL {
        let _ = writeln!(prompt, "- {}: {}", run_at.as_str(), run_at_hint(run_at));
    }
    prompt.push('\n');

    if let Some(category) = category {
        let _ = writeln!(
            prompt,
            "## Target Category\nThe user wants a \"{}\" module.\nCategory description: {}\n",
            category.display_name(),
            category.description()
        );
    }
    if let Some(code) = existing_code.filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(
            prompt,
            "## Existing Code\nThe user supplied existing code; modify or improve it:\n```javascript\n{code}\n```\n"
        );
    }

    prompt.push_str(OUTPUT_CONTRACT);
    prompt
}

fn run_at_hint(run_at: RunAt) -> &'static str {
    match run_at {
        RunAt::DocumentStart => "before the DOM is ready; suited to intercepting requests",
        RunAt::DocumentEnd => "after the DOM has loaded (recommended)",
        RunAt::DocumentIdle => "after the page has fully loaded",
    }
}

/// User turn carrying the requirement.
pub fn user_request(
    requirement: &str,
    category: Option<ModuleCategory>,
    existing_code: Option<&str>,
) -> String {
    let mut message = format!(
        "Please develop an extension module for the following requirement:\n\n\
         **Requirement**: {requirement}\n"
    );
    if let Some(category) = category {
        let _ = writeln!(message, "\n**Target Category**: {}", category.display_name());
    }
    if let Some(code) = existing_code.filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(
            message,
            "\n**Existing Code** (modify based on this):\n```javascript\n{code}\n```"
        );
    }
    message.push_str("\nGenerate the complete module and make sure it is correct and safe.");
    message
}

/// System prompt for a repair call.
pub const FIX_SYSTEM_PROMPT: &str = "You are a JavaScript repair expert. Fix the syntax errors \
in the code while keeping its behavior. Output only the fixed code, without explanations.";

/// User turn for a repair call.
pub fn fix_request(code: &str, errors: &[CodeError], attempt: u32, max_attempts: u32) -> String {
    let mut listing = String::new();
    for error in errors {
        let _ = write!(
            listing,
            "- Line {}, Column {}: {}",
            error.line, error.column, error.message
        );
        if let Some(suggestion) = &error.suggestion {
            let _ = write!(listing, "\n  Suggestion: {suggestion}");
        }
        listing.push('\n');
    }
    format!(
        "Please fix the syntax errors in the following JavaScript code \
         (attempt {attempt}/{max_attempts}):\n\n\
         **Errors**:\n{listing}\n\
         **Code**:\n```javascript\n{code}\n```\n\n\
         Output only the complete fixed code in a ```javascript block. Do not add explanations."
    )
}

/// Message for a run that ran out of fix attempts.
pub fn fix_limit_message(errors: &[CodeError], max_attempts: u32) -> String {
    let mut message = format!(
        "Reached the maximum of {max_attempts} automatic fix attempts; \
         the code still has syntax errors. Please fix them manually:"
    );
    for error in errors.iter().take(3) {
        let _ = write!(message, "\n  - Line {}: {}", error.line, error.message);
    }
    if errors.len() > 3 {
        let _ = write!(message, "\n  ... and {} more errors", errors.len() - 3);
    }
    message
}
