use crate::agent::Agent;
use crate::citations;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tokenfix_tokens::TokenStore;
use tokenfix_types::fix::{Change, FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::{Issue, Locator, Severity, domains};
use tracing::debug;

/// A rendered element as seen by the markup checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub selector: String,
    pub tag: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementDescriptor {
    pub fn new(selector: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn non_empty_attr(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|v| !v.trim().is_empty())
    }

    fn has_accessible_name(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.non_empty_attr("aria-label")
            || self.non_empty_attr("aria-labelledby")
    }

    fn is_focusable(&self) -> bool {
        if let Some(index) = self.attributes.get("tabindex") {
            return index.trim().parse::<i64>().is_ok_and(|i| i >= 0);
        }
        match self.tag.as_str() {
            "a" => self.attributes.contains_key("href"),
            "button" | "input" | "select" | "textarea" => {
                !self.attributes.contains_key("disabled")
            }
            _ => false,
        }
    }
}

/// Read a JSON array of element descriptors.
pub fn load_elements(path: &Utf8Path) -> anyhow::Result<Vec<ElementDescriptor>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let elements: Vec<ElementDescriptor> =
        serde_json::from_str(&text).with_context(|| format!("parse markup descriptors {path}"))?;
    debug!(path = %path, count = elements.len(), "loaded markup descriptors");
    Ok(elements)
}

/// WAI-ARIA 1.2 roles, excluding abstract roles.
const KNOWN_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote", "button", "caption",
    "cell", "checkbox", "code", "columnheader", "combobox", "complementary", "contentinfo",
    "definition", "deletion", "dialog", "directory", "document", "emphasis", "feed", "figure",
    "form", "generic", "grid", "gridcell", "group", "heading", "img", "insertion", "link", "list",
    "listbox", "listitem", "log", "main", "marquee", "math", "menu", "menubar", "menuitem",
    "menuitemcheckbox", "menuitemradio", "meter", "navigation", "none", "note", "option",
    "paragraph", "presentation", "progressbar", "radio", "radiogroup", "region", "row",
    "rowgroup", "rowheader", "scrollbar", "search", "searchbox", "separator", "slider",
    "spinbutton", "status", "strong", "subscript", "superscript", "switch", "tab", "table",
    "tablist", "tabpanel", "term", "textbox", "time", "timer", "toolbar", "tooltip", "tree",
    "treegrid", "treeitem",
];

/// Accessibility checks over element descriptors. Owns the ARIA attribute fix types.
#[derive(Debug, Clone, Default)]
pub struct MarkupAgent {
    elements: Vec<ElementDescriptor>,
}

impl MarkupAgent {
    pub const MISSING_ALT: &'static str = "markup.img_missing_alt";
    pub const MISSING_NAME: &'static str = "markup.missing_accessible_name";
    pub const UNKNOWN_ROLE: &'static str = "markup.unknown_role";
    pub const HIDDEN_FOCUSABLE: &'static str = "markup.hidden_focusable";

    const ROUTING_KEYS: &'static [&'static str] = &[
        fix_types::ARIA_SET_ATTRIBUTE,
        fix_types::ARIA_REMOVE_ATTRIBUTE,
    ];
    const SET_RULE: &'static str = "set_attribute";
    const REMOVE_RULE: &'static str = "remove_attribute";

    pub fn new(elements: Vec<ElementDescriptor>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[ElementDescriptor] {
        &self.elements
    }

    fn check(el: &ElementDescriptor, out: &mut Vec<Issue>) {
        let locator = || Locator::element(el.selector.as_str());

        if el.tag == "img" && !el.attributes.contains_key("alt") {
            out.push(
                Issue::new(
                    domains::MARKUP,
                    Self::MISSING_ALT,
                    Severity::Error,
                    locator(),
                    "image has no alt attribute",
                )
                .with_citation(citations::NON_TEXT_CONTENT)
                .with_suggestion("describe the image, or set alt=\"\" if it is decorative"),
            );
        }

        if matches!(el.tag.as_str(), "button" | "a") && !el.has_accessible_name() {
            out.push(
                Issue::new(
                    domains::MARKUP,
                    Self::MISSING_NAME,
                    Severity::Error,
                    locator(),
                    format!("<{}> has no accessible name", el.tag),
                )
                .with_citation(citations::NAME_ROLE_VALUE)
                .with_suggestion("add visible text or an aria-label"),
            );
        }

        if let Some(role) = el.attributes.get("role") {
            let unknown = role
                .split_whitespace()
                .any(|r| !KNOWN_ROLES.contains(&r));
            if unknown || role.trim().is_empty() {
                out.push(
                    Issue::new(
                        domains::MARKUP,
                        Self::UNKNOWN_ROLE,
                        Severity::Warning,
                        locator(),
                        format!("unknown role '{role}'"),
                    )
                    .with_citation(citations::NAME_ROLE_VALUE),
                );
            }
        }

        if el.attributes.get("aria-hidden").map(String::as_str) == Some("true")
            && el.is_focusable()
        {
            out.push(
                Issue::new(
                    domains::MARKUP,
                    Self::HIDDEN_FOCUSABLE,
                    Severity::Error,
                    locator(),
                    "focusable element is hidden from assistive technology",
                )
                .with_citation(citations::NAME_ROLE_VALUE),
            );
        }
    }

    fn attribute_fix(
        issue: &Issue,
        fix_type: &str,
        args: Value,
        auto: bool,
        description: String,
    ) -> FixRequest {
        let rule_id = if fix_type == fix_types::ARIA_SET_ATTRIBUTE {
            Self::SET_RULE
        } else {
            Self::REMOVE_RULE
        };
        // Empty target: routed to whichever collaborator owns the ARIA keys.
        FixRequest::new(
            fix_type,
            "",
            issue.clone(),
            FixPayload::Transform {
                rule_id: rule_id.to_string(),
                args: Some(args),
            },
            description,
        )
        .auto_fixable(auto)
    }

    fn edit(&mut self, fix: &FixRequest) -> Result<Change, String> {
        let FixPayload::Transform { rule_id, args } = &fix.fix else {
            return Err(format!("'{}' needs a transform payload", fix.fix_type));
        };
        let args = args.as_ref().ok_or("missing transform args")?;
        let selector = args
            .get("selector")
            .and_then(Value::as_str)
            .ok_or("missing 'selector' arg")?;
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or("missing 'name' arg")?;

        let element = self
            .elements
            .iter_mut()
            .find(|e| e.selector == selector)
            .ok_or_else(|| format!("no element matches '{selector}'"))?;

        let before = element.attributes.get(name).cloned();
        let after = match rule_id.as_str() {
            Self::SET_RULE => {
                let value = args
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or("missing 'value' arg")?
                    .to_string();
                element.attributes.insert(name.to_string(), value.clone());
                Some(value)
            }
            Self::REMOVE_RULE => {
                if before.is_none() {
                    return Err(format!("'{selector}' has no '{name}' attribute"));
                }
                element.attributes.remove(name);
                None
            }
            other => return Err(format!("unknown markup rule '{other}'")),
        };

        Ok(Change {
            locator: Locator::element(selector),
            before,
            after,
        })
    }
}

impl Agent for MarkupAgent {
    fn routing_keys(&self) -> &[&'static str] {
        Self::ROUTING_KEYS
    }

    fn detect(&self, _store: &TokenStore) -> anyhow::Result<Vec<Issue>> {
        let mut out = Vec::new();
        for el in &self.elements {
            Self::check(el, &mut out);
        }
        Ok(out)
    }

    fn suggest_fixes(
        &self,
        _store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>> {
        let mut out = Vec::new();
        for issue in issues {
            let Locator::Element { selector } = &issue.locator else {
                continue;
            };
            let fix = match issue.code.as_str() {
                Self::MISSING_ALT => Self::attribute_fix(
                    issue,
                    fix_types::ARIA_SET_ATTRIBUTE,
                    json!({ "selector": selector, "name": "alt", "value": "" }),
                    false,
                    format!("mark {selector} as decorative with alt=\"\""),
                ),
                Self::UNKNOWN_ROLE => Self::attribute_fix(
                    issue,
                    fix_types::ARIA_REMOVE_ATTRIBUTE,
                    json!({ "selector": selector, "name": "role" }),
                    true,
                    format!("remove the unknown role from {selector}"),
                ),
                Self::HIDDEN_FOCUSABLE => Self::attribute_fix(
                    issue,
                    fix_types::ARIA_REMOVE_ATTRIBUTE,
                    json!({ "selector": selector, "name": "aria-hidden" }),
                    true,
                    format!("remove aria-hidden from focusable {selector}"),
                ),
                _ => continue,
            };
            out.push(fix);
        }
        Ok(out)
    }

    fn apply_fix(
        &mut self,
        _store: &mut TokenStore,
        fix: &FixRequest,
    ) -> anyhow::Result<FixResult> {
        Ok(match self.edit(fix) {
            Ok(change) => FixResult::applied(fix.id.clone(), vec![change]),
            Err(message) => FixResult::failed(fix.id.clone(), message),
        })
    }

    fn check_fix(&self, _store: &TokenStore, fix: &FixRequest) -> anyhow::Result<()> {
        self.clone().edit(fix).map(drop).map_err(anyhow::Error::msg)
    }

    fn custom(
        &mut self,
        _store: &mut TokenStore,
        name: &str,
        _params: &Value,
    ) -> anyhow::Result<Value> {
        match name {
            "list_elements" => Ok(serde_json::to_value(&self.elements)?),
            other => anyhow::bail!("unsupported action '{other}'"),
        }
    }
}
