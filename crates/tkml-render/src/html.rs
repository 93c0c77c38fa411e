//! Default HTML renderer
//!
//! Interactive kinds do not carry inline script. They are marked with
//! `data-href` / `data-target` / `data-runtime` attributes which the host
//! binds to the runtime's loader.

use tkml_dom::{sanitize_id, NodeId, NodeKind, Tree};

use crate::context::{Attachment, Effect, RenderContext};
use crate::escape::{encode_url, escape_text, safe_attr};
use crate::surface::HostTarget;
use crate::Render;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn children(&self, cx: &mut RenderContext<'_>, node: NodeId) -> String {
        let tree = cx.tree();
        self.render_children(cx, node, tree.children(node))
    }

    /// ` id="..."` when the markup named the element.
    fn id_attr(tree: &Tree, node: NodeId) -> String {
        match tree.get(node).explicit_identity() {
            Some(id) => format!(r#" id="{}""#, id),
            None => String::new(),
        }
    }

    fn flag(tree: &Tree, node: NodeId, name: &str, class: &str) -> String {
        if tree.get(node).has_attr(name) {
            format!(" {}", class)
        } else {
            String::new()
        }
    }

    /// Navigation attributes for kinds that accept `href`.
    fn link(&self, cx: &mut RenderContext<'_>, node: NodeId) -> String {
        let tree = cx.tree();
        let n = tree.get(node);
        let Some(href) = n.attr("href") else {
            return String::new();
        };

        if n.has_attr("external") {
            let mut attrs = format!(r#" data-external="{}""#, safe_attr(href));
            if let Some(target) = n.attr("target") {
                attrs.push_str(&format!(r#" data-window="{}""#, safe_attr(target)));
            }
            return attrs;
        }

        let mut attrs = format!(
            r#" data-runtime="{}" data-href="{}""#,
            cx.runtime_id(),
            safe_attr(href)
        );
        if let Some(target) = n.attr("target") {
            attrs.push_str(&format!(r#" data-target="{}""#, sanitize_id(target)));
        }
        if n.attr("preload").is_some_and(|v| v != "false") {
            cx.push_effect(Effect::Preload(href.to_string()));
        }
        attrs
    }

    /// One item div per child; whitespace-only text is dropped and, when
    /// `groupable`, consecutive pills share a single item.
    fn wrap_children(
        &self,
        cx: &mut RenderContext<'_>,
        children: &[NodeId],
        class: &str,
        groupable: bool,
    ) -> String {
        let tree = cx.tree();
        let mut out = String::new();
        let mut group = String::new();

        for &child in children {
            let node = tree.get(child);
            if groupable && node.tag() == "pill" {
                group.push_str(&self.render(cx, child));
                continue;
            }
            if node.as_text().is_some_and(|t| t.trim().is_empty()) {
                continue;
            }
            if !group.is_empty() {
                out.push_str(&format!(
                    r#"<div class="{c}-item {c}-group">{}</div>"#,
                    std::mem::take(&mut group),
                    c = class
                ));
            }
            let markup = self.render(cx, child);
            out.push_str(&format!(
                r#"<div class="{c}-item {c}-{}">{}</div>"#,
                node.tag(),
                markup,
                c = class
            ));
        }
        if !group.is_empty() {
            out.push_str(&format!(
                r#"<div class="{c}-item {c}-group">{}</div>"#,
                group,
                c = class
            ));
        }
        out
    }

    fn element(&self, cx: &mut RenderContext<'_>, node: NodeId, tag: &str) -> String {
        let tree = cx.tree();
        let n = tree.get(node);
        let id = Self::id_attr(tree, node);

        match tag {
            "tkml" => self.children(cx, node),
            "title" => {
                let center = Self::flag(tree, node, "center", "center");
                format!(
                    r#"<div class="title{}"{}>{}</div>"#,
                    center,
                    id,
                    self.children(cx, node)
                )
            }
            "desc" => {
                let center = Self::flag(tree, node, "center", "center");
                format!(
                    r#"<p class="desc{}"{}>{}</p>"#,
                    center,
                    id,
                    self.children(cx, node)
                )
            }
            "p" => format!("<p{}>{}</p>", id, self.children(cx, node)),
            "br" => "<br/>".to_string(),
            "w" => format!(r#"<span class="w">{}</span>"#, self.children(cx, node)),
            "small" => format!("<small>{}</small>", self.children(cx, node)),
            "bullet" => format!(
                r#"<div class="bullet-item"{}><div class="bullet-marker"></div><div class="bullet-content">{}</div></div>"#,
                id,
                self.children(cx, node)
            ),
            "pill" => {
                let link = self.link(cx, node);
                format!(
                    r#"<span id="{}" class="pill"{}>{}</span>"#,
                    tree.identity(node),
                    link,
                    self.children(cx, node)
                )
            }
            "list" | "info" => format!(
                r#"<div class="{}"{}>{}</div>"#,
                tag,
                id,
                self.children(cx, node)
            ),
            "section" | "option" => {
                let link = self.link(cx, node);
                let clickable = if link.is_empty() { "" } else { " clickable" };
                let deactivated = Self::flag(tree, node, "deactivated", "deactivated");
                let icon = match n.attr("icon") {
                    Some(icon) => format!(
                        r#"<img class="section-icon" src="{}" alt="icon"/>"#,
                        safe_attr(icon)
                    ),
                    None if !link.is_empty() => r#"<div class="section-arrow"></div>"#.to_string(),
                    None => String::new(),
                };
                format!(
                    r#"<div class="section{}{}"{}{}><div class="section-content">{}</div>{}</div>"#,
                    clickable,
                    deactivated,
                    id,
                    link,
                    self.children(cx, node),
                    icon
                )
            }
            "checkbox" | "radio" => {
                let link = self.link(cx, node);
                let checked = if n.has_attr("checked") { " checked" } else { "" };
                let name = n
                    .attr("name")
                    .map(|v| format!(r#" name="{}""#, safe_attr(v)))
                    .unwrap_or_default();
                format!(
                    r#"<label class="{tag}"{}{}><input type="{tag}"{}{}/><span class="{tag}-label">{}</span></label>"#,
                    id,
                    link,
                    name,
                    checked,
                    self.children(cx, node),
                    tag = tag
                )
            }
            "code" => {
                let lang = n
                    .attr("lang")
                    .map(|l| format!(" language-{}", safe_attr(l)))
                    .unwrap_or_default();
                let code = n.raw_text().unwrap_or_default().trim();
                format!(
                    r#"<pre class="code"><code class="hljs{}" id="{}">{}</code></pre>"#,
                    lang,
                    tree.identity(node),
                    safe_attr(code)
                )
            }
            "loader" => {
                let identity = tree.identity(node);
                if let Some(href) = n.attr("href") {
                    cx.push_effect(Effect::LazyLoad {
                        attachment: Attachment::for_node(tree, node),
                        href: href.to_string(),
                    });
                }
                format!(
                    r#"<div id="{}" class="loader"><div class="loader-spinner"></div></div>"#,
                    identity
                )
            }
            "menu" => {
                let identity = tree.identity(node);
                let content_url = n.attr("href").unwrap_or_default();
                cx.push_effect(Effect::Menu {
                    trigger: identity.to_string(),
                    content_url: content_url.to_string(),
                });
                format!(
                    r#"<div id="{}" class="header-menu" data-runtime="{}" data-menu="{}"></div>"#,
                    identity,
                    cx.runtime_id(),
                    encode_url(content_url)
                )
            }
            "a" => {
                let link = self.link(cx, node);
                format!(r#"<a class="a"{}{}>{}</a>"#, id, link, self.children(cx, node))
            }
            "button" => {
                let link = self.link(cx, node);
                let secondary = Self::flag(tree, node, "secondary", "secondary");
                format!(
                    r#"<button class="button{}"{}{}>{}</button>"#,
                    secondary,
                    id,
                    link,
                    self.children(cx, node)
                )
            }
            "back" => {
                let link = self.link(cx, node);
                let action = if link.is_empty() {
                    format!(r#" data-runtime="{}" data-history-back"#, cx.runtime_id())
                } else {
                    link
                };
                format!(
                    r#"<button id="{}" class="button back-button"{}>Back</button>"#,
                    tree.identity(node),
                    action
                )
            }
            "img" => {
                let circle = Self::flag(tree, node, "circle", "circle");
                let src = n
                    .attr("src")
                    .map(|s| format!(r#" src="{}""#, safe_attr(s)))
                    .unwrap_or_default();
                format!(r#"<img class="img{}"{}{}/>"#, circle, id, src)
            }
            "input" => {
                let mut attrs = id;
                for name in ["name", "placeholder", "value", "type"] {
                    if let Some(v) = n.attr(name) {
                        attrs.push_str(&format!(r#" {}="{}""#, name, safe_attr(v)));
                    }
                }
                if n.has_attr("required") {
                    attrs.push_str(" data-required");
                }
                format!(
                    r#"<div class="input-wrapper"><input class="input"{}/><div class="input-spinner"></div></div>"#,
                    attrs
                )
            }
            "textarea" => {
                let mut attrs = id;
                for name in ["name", "placeholder", "rows"] {
                    if let Some(v) = n.attr(name) {
                        attrs.push_str(&format!(r#" {}="{}""#, name, safe_attr(v)));
                    }
                }
                if n.has_attr("required") {
                    attrs.push_str(" data-required");
                }
                let value = n.attr("value").map(safe_attr).unwrap_or_default();
                format!(
                    r#"<div class="input-wrapper"><textarea class="textarea"{}>{}</textarea><div class="input-spinner"></div></div>"#,
                    attrs, value
                )
            }
            "header" | "footer" => format!(
                r#"<div id="{}" class="{}"{}>{}</div>"#,
                tree.identity(node),
                tag,
                Self::flag(tree, node, "center", "data-center"),
                self.children(cx, node)
            ),
            "navigation" => format!(
                r#"<div class="pagination"{}>{}</div>"#,
                id,
                self.children(cx, node)
            ),
            "next" | "prev" | "page" => {
                let link = self.link(cx, node);
                let active = Self::flag(tree, node, "active", "active");
                format!(
                    r#"<div class="pagination-item pagination-{}{}"{}{}>{}</div>"#,
                    tag,
                    active,
                    id,
                    link,
                    self.children(cx, node)
                )
            }
            "center" => format!(
                r#"<div class="center-container"{}>{}</div>"#,
                id,
                self.children(cx, node)
            ),
            "tab" => {
                let link = self.link(cx, node);
                let active = Self::flag(tree, node, "active", "active");
                format!(
                    r#"<div class="tab{}"{}{}>{}</div>"#,
                    active,
                    id,
                    link,
                    self.children(cx, node)
                )
            }
            "autoupdate" => {
                let interval = n
                    .attr("interval")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5)
                    * 1000;
                format!(
                    r#"<div id="{}" class="autoupdate" data-interval="{}" data-url="{}"></div>"#,
                    tree.identity(node),
                    interval,
                    safe_attr(n.attr("href").unwrap_or_default())
                )
            }
            "plugin" => format!(
                r#"<div id="{}" class="plugin" data-plugin-url="{}"></div>"#,
                tree.identity(node),
                safe_attr(n.attr("src").unwrap_or_default())
            ),
            _ if n.spec().is_some_and(|s| s.is_proxy()) => {
                format!("<{t}>{}</{t}>", self.children(cx, node), t = tag)
            }
            _ => format!(
                r#"<div class="{}"{}>{}</div>"#,
                tag,
                id,
                self.children(cx, node)
            ),
        }
    }
}

impl Render for HtmlRenderer {
    fn render(&self, cx: &mut RenderContext<'_>, node: NodeId) -> String {
        let tree = cx.tree();
        match tree.get(node).kind() {
            NodeKind::Text(text) => escape_text(text),
            NodeKind::Undefined { tag } => format!(
                r#"<div class="undefined"><div class="error">Undefined component: {}</div></div>"#,
                escape_text(tag)
            ),
            NodeKind::Error { message } => format!(
                r#"<div class="panic"><div class="error">Error: {}</div></div>"#,
                escape_text(message)
            ),
            NodeKind::Element(spec) => self.element(cx, node, spec.tag()),
        }
    }

    fn render_children(
        &self,
        cx: &mut RenderContext<'_>,
        parent: NodeId,
        children: &[NodeId],
    ) -> String {
        match cx.tree().get(parent).tag() {
            "list" => self.wrap_children(cx, children, "list", false),
            "info" => self.wrap_children(cx, children, "info", true),
            _ => children.iter().map(|&c| self.render(cx, c)).collect(),
        }
    }

    fn wrapping_host(&self, tree: &Tree, parent: NodeId, identity: &str) -> HostTarget {
        match tree.get(parent).tag() {
            "list" | "info" => HostTarget::ParentOf(identity.to_string()),
            _ => HostTarget::Element(identity.to_string()),
        }
    }
}
