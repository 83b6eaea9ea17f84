//! Built-in module templates and code snippets served by the knowledge tools.

use modforge_core::ModuleCategory;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Most templates returned by one lookup.
pub const MAX_TEMPLATE_RESULTS: usize = 5;
/// Most snippets returned by one lookup.
pub const MAX_SNIPPET_RESULTS: usize = 10;
/// Length of the code preview in template summaries, in characters.
pub const PREVIEW_CHARS: usize = 200;

/// A complete starter module.
#[derive(Debug, Clone)]
pub struct ModuleTemplate {
    /// Stable id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// What the template does.
    pub description: &'static str,
    /// Emoji icon.
    pub icon: &'static str,
    /// Category.
    pub category: ModuleCategory,
    /// JavaScript body.
    pub code: &'static str,
}

/// A reusable piece of code.
#[derive(Debug, Clone)]
pub struct CodeSnippet {
    /// Stable id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// What the snippet does.
    pub description: &'static str,
    /// JavaScript body.
    pub code: &'static str,
    /// Search tags.
    pub tags: &'static [&'static str],
}

/// A named group of snippets.
#[derive(Debug, Clone)]
pub struct SnippetCategory {
    /// Stable id, e.g. `dom`.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Snippets in this group.
    pub snippets: Vec<CodeSnippet>,
}

/// Template entry as returned to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub description: String,
    #[allow(missing_docs)]
    pub icon: String,
    /// Category display name.
    pub category: String,
    /// First [`PREVIEW_CHARS`] characters of the code, with `...` when cut.
    pub code_preview: String,
}

/// Snippet entry as returned to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SnippetSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub code: String,
    pub tags: Vec<String>,
}

impl From<&ModuleTemplate> for TemplateSummary {
    fn from(t: &ModuleTemplate) -> Self {
        let mut preview: String = t.code.chars().take(PREVIEW_CHARS).collect();
        if t.code.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            id: t.id.to_string(),
            name: t.name.to_string(),
            description: t.description.to_string(),
            icon: t.icon.to_string(),
            category: t.category.display_name().to_string(),
            code_preview: preview,
        }
    }
}

impl From<&CodeSnippet> for SnippetSummary {
    fn from(s: &CodeSnippet) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.to_string(),
            description: s.description.to_string(),
            code: s.code.to_string(),
            tags: s.tags.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Every built-in template.
pub fn templates() -> &'static [ModuleTemplate] {
    TEMPLATES.as_slice()
}

/// Every built-in snippet group.
pub fn snippet_categories() -> &'static [SnippetCategory] {
    SNIPPETS.as_slice()
}

/// Templates matching an optional category and any of the keywords.
///
/// The category matches the enum tag or, case-insensitively, a substring of
/// its display name. Keywords match name or description case-insensitively.
pub fn find_templates(category: Option<&str>, keywords: &[String]) -> Vec<TemplateSummary> {
    let category = category.map(str::to_lowercase);
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    templates()
        .iter()
        .filter(|t| {
            category.as_deref().map_or(true, |wanted| {
                t.category.as_str().eq_ignore_ascii_case(wanted)
                    || t.category.display_name().to_lowercase().contains(wanted)
            })
        })
        .filter(|t| {
            keywords.is_empty()
                || keywords.iter().any(|k| {
                    t.name.to_lowercase().contains(k) || t.description.to_lowercase().contains(k)
                })
        })
        .take(MAX_TEMPLATE_RESULTS)
        .map(TemplateSummary::from)
        .collect()
}

/// Snippets whose name, description or tags contain `query`.
pub fn search_snippets(query: &str) -> Vec<&'static CodeSnippet> {
    let query = query.to_lowercase();
    snippet_categories()
        .iter()
        .flat_map(|c| c.snippets.iter())
        .filter(|s| {
            s.name.to_lowercase().contains(&query)
                || s.description.to_lowercase().contains(&query)
                || s.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
        })
        .collect()
}

/// The snippet group with the given id.
pub fn snippet_category(id: &str) -> Option<&'static SnippetCategory> {
    snippet_categories().iter().find(|c| c.id == id)
}

/// A short list of commonly useful snippets.
pub fn popular_snippets() -> Vec<&'static CodeSnippet> {
    const POPULAR: [(&str, &str); 6] = [
        ("dom", "dom-hide-element"),
        ("style", "style-inject-css"),
        ("ui", "ui-floating-button"),
        ("scroll", "scroll-to-top"),
        ("adblock", "ad-hide-common"),
        ("events", "event-mutation"),
    ];
    POPULAR
        .iter()
        .filter_map(|(group, id)| {
            snippet_category(group).and_then(|c| c.snippets.iter().find(|s| s.id == *id))
        })
        .collect()
}

/// Snippet lookup used by the `get_snippets` tool: query first, then
/// category, then the popular set. At most [`MAX_SNIPPET_RESULTS`] entries.
pub fn find_snippets(query: &str, category: Option<&str>) -> Vec<SnippetSummary> {
    let found: Vec<&CodeSnippet> = if !query.trim().is_empty() {
        search_snippets(query.trim())
    } else if let Some(category) = category {
        snippet_category(category)
            .map(|c| c.snippets.iter().collect())
            .unwrap_or_default()
    } else {
        popular_snippets()
    };
    found
        .into_iter()
        .take(MAX_SNIPPET_RESULTS)
        .map(SnippetSummary::from)
        .collect()
}

static TEMPLATES: LazyLock<Vec<ModuleTemplate>> = LazyLock::new(|| {
    vec![
        ModuleTemplate {
            id: "template-element-hider",
            name: "Element Hider",
            description: "Hide page elements matched by CSS selectors",
            icon: "🚫",
            category: ModuleCategory::ContentFilter,
            code: r#"const selectors = getConfig('selectors', '.ad-banner').split('\n').filter(Boolean);
const hide = () => selectors.forEach((sel) => {
  document.querySelectorAll(sel).forEach((el) => { el.style.display = 'none'; });
});
hide();
new MutationObserver(hide).observe(document.body, { childList: true, subtree: true });"#,
        },
        ModuleTemplate {
            id: "template-popup-blocker",
            name: "Popup Blocker",
            description: "Close overlays and modal popups as they appear",
            icon: "🛑",
            category: ModuleCategory::ContentFilter,
            code: r#"const isOverlay = (el) => {
  const style = getComputedStyle(el);
  return style.position === 'fixed' && Number(style.zIndex) > 1000;
};
const sweep = () => document.querySelectorAll('div, section').forEach((el) => {
  if (isOverlay(el)) el.remove();
});
sweep();
new MutationObserver(sweep).observe(document.body, { childList: true, subtree: true });"#,
        },
        ModuleTemplate {
            id: "template-dark-mode",
            name: "Force Dark Mode",
            description: "Apply a dark color scheme to any page",
            icon: "🌙",
            category: ModuleCategory::Theme,
            code: r#"const strength = Number(getConfig('strength', '0.9'));
const style = document.createElement('style');
style.textContent = `html { filter: invert(${strength}) hue-rotate(180deg); }
img, video, picture { filter: invert(1) hue-rotate(180deg); }`;
document.head.appendChild(style);"#,
        },
        ModuleTemplate {
            id: "template-font-changer",
            name: "Font Changer",
            description: "Replace the page font family and size",
            icon: "🔤",
            category: ModuleCategory::StyleModifier,
            code: r#"const family = getConfig('family', 'system-ui');
const size = getConfig('size', '16px');
const style = document.createElement('style');
style.textContent = `body, body * { font-family: ${family} !important; font-size: ${size}; }`;
document.head.appendChild(style);"#,
        },
        ModuleTemplate {
            id: "template-auto-clicker",
            name: "Auto Clicker",
            description: "Click an element automatically at an interval",
            icon: "👆",
            category: ModuleCategory::Automation,
            code: r#"const selector = getConfig('selector', 'button.load-more');
const interval = Number(getConfig('interval', '2000'));
const timer = setInterval(() => {
  const target = document.querySelector(selector);
  if (target) target.click();
}, interval);
window.addEventListener('beforeunload', () => clearInterval(timer));"#,
        },
        ModuleTemplate {
            id: "template-scroll-to-top",
            name: "Scroll To Top",
            description: "Floating button that scrolls back to the top of the page",
            icon: "⬆️",
            category: ModuleCategory::Navigation,
            code: r#"const button = document.createElement('button');
button.textContent = '↑';
button.style.cssText = 'position:fixed;right:16px;bottom:16px;z-index:99999;';
button.addEventListener('click', () => window.scrollTo({ top: 0, behavior: 'smooth' }));
document.body.appendChild(button);"#,
        },
        ModuleTemplate {
            id: "template-link-collector",
            name: "Link Collector",
            description: "Collect every link on the page and copy the list",
            icon: "🔗",
            category: ModuleCategory::DataExtract,
            code: r#"const links = Array.from(document.querySelectorAll('a[href]'))
  .map((a) => a.href)
  .filter((href, i, all) => all.indexOf(href) === i);
navigator.clipboard.writeText(links.join('\n')).catch((err) => console.warn(err));"#,
        },
        ModuleTemplate {
            id: "template-video-enhancer",
            name: "Video Speed Control",
            description: "Set a default playback speed for every video",
            icon: "🎬",
            category: ModuleCategory::Video,
            code: r#"const rate = Number(getConfig('rate', '1.5'));
const apply = () => document.querySelectorAll('video').forEach((v) => { v.playbackRate = rate; });
apply();
new MutationObserver(apply).observe(document.body, { childList: true, subtree: true });"#,
        },
        ModuleTemplate {
            id: "template-tracking-blocker",
            name: "Tracking Pixel Blocker",
            description: "Remove one-pixel tracking images",
            icon: "🕵️",
            category: ModuleCategory::AntiTracking,
            code: r#"const strip = () => document.querySelectorAll('img').forEach((img) => {
  if (img.naturalWidth <= 1 && img.naturalHeight <= 1) img.remove();
});
window.addEventListener('load', strip);"#,
        },
        ModuleTemplate {
            id: "template-reader-mode",
            name: "Reader Mode",
            description: "Keep only the main article text in a readable column",
            icon: "📖",
            category: ModuleCategory::Reading,
            code: r#"const article = document.querySelector('article') || document.querySelector('main');
if (article) {
  document.body.innerText = '';
  article.style.cssText = 'max-width:720px;margin:0 auto;line-height:1.7;';
  document.body.appendChild(article);
}"#,
        },
    ]
});

static SNIPPETS: LazyLock<Vec<SnippetCategory>> = LazyLock::new(|| {
    vec![
        SnippetCategory {
            id: "dom",
            name: "DOM",
            snippets: vec![
                CodeSnippet {
                    id: "dom-hide-element",
                    name: "Hide elements",
                    description: "Hide every element matching a selector",
                    code: "document.querySelectorAll(selector).forEach((el) => { el.style.display = 'none'; });",
                    tags: &["hide", "selector", "dom"],
                },
                CodeSnippet {
                    id: "dom-create-element",
                    name: "Create element",
                    description: "Create an element with text and append it",
                    code: "const el = document.createElement('div');\nel.textContent = text;\ndocument.body.appendChild(el);",
                    tags: &["create", "insert", "dom"],
                },
                CodeSnippet {
                    id: "dom-wait-for",
                    name: "Wait for element",
                    description: "Resolve once an element matching a selector exists",
                    code: "const waitFor = (sel) => new Promise((resolve) => {\n  const found = document.querySelector(sel);\n  if (found) return resolve(found);\n  const obs = new MutationObserver(() => {\n    const el = document.querySelector(sel);\n    if (el) { obs.disconnect(); resolve(el); }\n  });\n  obs.observe(document.documentElement, { childList: true, subtree: true });\n});",
                    tags: &["wait", "async", "selector"],
                },
            ],
        },
        SnippetCategory {
            id: "style",
            name: "Style",
            snippets: vec![
                CodeSnippet {
                    id: "style-inject-css",
                    name: "Inject CSS",
                    description: "Add a stylesheet to the page",
                    code: "const style = document.createElement('style');\nstyle.textContent = css;\ndocument.head.appendChild(style);",
                    tags: &["css", "style", "inject"],
                },
                CodeSnippet {
                    id: "style-toggle-class",
                    name: "Toggle class",
                    description: "Toggle a class on the root element",
                    code: "document.documentElement.classList.toggle(className);",
                    tags: &["class", "style", "toggle"],
                },
            ],
        },
        SnippetCategory {
            id: "ui",
            name: "UI",
            snippets: vec![
                CodeSnippet {
                    id: "ui-floating-button",
                    name: "Floating button",
                    description: "A fixed-position button in the corner of the page",
                    code: "const btn = document.createElement('button');\nbtn.textContent = label;\nbtn.style.cssText = 'position:fixed;right:16px;bottom:16px;z-index:99999;';\nbtn.addEventListener('click', onClick);\ndocument.body.appendChild(btn);",
                    tags: &["button", "floating", "ui"],
                },
                CodeSnippet {
                    id: "ui-toast",
                    name: "Toast message",
                    description: "Show a short message that disappears",
                    code: "const toast = document.createElement('div');\ntoast.textContent = message;\ntoast.style.cssText = 'position:fixed;left:50%;bottom:32px;transform:translateX(-50%);';\ndocument.body.appendChild(toast);\nsetTimeout(() => toast.remove(), 2500);",
                    tags: &["toast", "message", "hint"],
                },
            ],
        },
        SnippetCategory {
            id: "scroll",
            name: "Scroll",
            snippets: vec![
                CodeSnippet {
                    id: "scroll-to-top",
                    name: "Scroll to top",
                    description: "Smoothly scroll to the top of the page",
                    code: "window.scrollTo({ top: 0, behavior: 'smooth' });",
                    tags: &["scroll", "top", "navigation"],
                },
                CodeSnippet {
                    id: "scroll-infinite",
                    name: "Infinite scroll trigger",
                    description: "Run a callback when the page bottom is reached",
                    code: "window.addEventListener('scroll', () => {\n  if (window.innerHeight + window.scrollY >= document.body.offsetHeight - 200) onBottom();\n});",
                    tags: &["scroll", "infinite", "load"],
                },
            ],
        },
        SnippetCategory {
            id: "adblock",
            name: "Ad blocking",
            snippets: vec![CodeSnippet {
                id: "ad-hide-common",
                name: "Hide common ads",
                description: "Hide elements with typical ad class names",
                code: "document.querySelectorAll('[class*=\"ad-\"], [id*=\"ad-\"], iframe[src*=\"ads\"]').forEach((el) => el.remove());",
                tags: &["ad", "block", "hide"],
            }],
        },
        SnippetCategory {
            id: "events",
            name: "Events",
            snippets: vec![
                CodeSnippet {
                    id: "event-mutation",
                    name: "Observe DOM changes",
                    description: "Re-run a function whenever the DOM changes",
                    code: "new MutationObserver(() => apply()).observe(document.body, { childList: true, subtree: true });",
                    tags: &["mutation", "observer", "dynamic"],
                },
                CodeSnippet {
                    id: "event-keyboard",
                    name: "Keyboard shortcut",
                    description: "Run a callback on a key combination",
                    code: "document.addEventListener('keydown', (e) => {\n  if (e.ctrlKey && e.key === key) { e.preventDefault(); onShortcut(); }\n});",
                    tags: &["keyboard", "shortcut", "key"],
                },
            ],
        },
        SnippetCategory {
            id: "storage",
            name: "Storage",
            snippets: vec![CodeSnippet {
                id: "storage-json",
                name: "Persist JSON",
                description: "Save and load a JSON value in localStorage",
                code: "const save = (k, v) => localStorage.setItem(k, JSON.stringify(v));\nconst load = (k, d) => { try { return JSON.parse(localStorage.getItem(k)) ?? d; } catch (e) { return d; } };",
                tags: &["storage", "save", "json"],
            }],
        },
    ]
});
