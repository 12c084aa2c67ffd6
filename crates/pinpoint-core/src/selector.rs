//! Selector synthesis: turn a resolved node back into a CSS selector that can
//! find it again in a later session.

use pinpoint_common::{DomError, DomProvider, NodeHandle};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CSS_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").unwrap());

/// Maximum number of positional segments in a path selector.
pub const MAX_PATH_SEGMENTS: usize = 5;

fn is_css_ident(s: &str) -> bool {
    CSS_IDENT.is_match(s)
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `#id` when the id is a plain identifier, `[id="..."]` otherwise.
pub fn id_selector(id: &str) -> String {
    if is_css_ident(id) {
        format!("#{id}")
    } else {
        format!(r#"[id="{}"]"#, quote(id))
    }
}

async fn count(page: &dyn DomProvider, selector: &str) -> Result<usize, DomError> {
    Ok(page.query_all(selector).await?.len())
}

async fn id_of(page: &dyn DomProvider, node: NodeHandle) -> Result<Option<String>, DomError> {
    Ok(page
        .attribute(node, "id")
        .await?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

async fn classes_of(page: &dyn DomProvider, node: NodeHandle) -> Result<Vec<String>, DomError> {
    Ok(page
        .attribute(node, "class")
        .await?
        .unwrap_or_default()
        .split_whitespace()
        .filter(|c| is_css_ident(c))
        .map(String::from)
        .collect())
}

/// Selector used when caching a resolution result.
///
/// Tries, in order: the node's id; a `tag.class` pair that matches exactly
/// one node; a positional ancestor path. Falls back to the bare tag name
/// when the page cannot be read.
pub async fn durable_selector(page: &dyn DomProvider, node: NodeHandle) -> String {
    match try_durable_selector(page, node).await {
        Ok(selector) => selector,
        Err(e) => {
            debug!(%node, error = %e, "selector synthesis failed, using tag name");
            page.tag_name(node).await.unwrap_or_else(|_| "*".to_string())
        }
    }
}

async fn try_durable_selector(page: &dyn DomProvider, node: NodeHandle) -> Result<String, DomError> {
    if let Some(id) = id_of(page, node).await? {
        return Ok(id_selector(&id));
    }

    let tag = page.tag_name(node).await?;
    for class in classes_of(page, node).await? {
        let selector = format!("{tag}.{class}");
        if count(page, &selector).await? == 1 {
            return Ok(selector);
        }
    }

    positional_path(page, node).await
}

/// Selector used by the discovery catalog.
///
/// Tries, in order: a unique id; a unique tag plus up to three classes; a
/// tag plus `type`/`name`/`role` attributes matching at most three nodes; a
/// positional ancestor path.
pub async fn catalog_selector(page: &dyn DomProvider, node: NodeHandle) -> String {
    match try_catalog_selector(page, node).await {
        Ok(selector) => selector,
        Err(e) => {
            debug!(%node, error = %e, "catalog selector synthesis failed, using tag name");
            page.tag_name(node).await.unwrap_or_else(|_| "*".to_string())
        }
    }
}

async fn try_catalog_selector(page: &dyn DomProvider, node: NodeHandle) -> Result<String, DomError> {
    if let Some(id) = id_of(page, node).await? {
        let selector = id_selector(&id);
        if count(page, &selector).await? == 1 {
            return Ok(selector);
        }
    }

    let tag = page.tag_name(node).await?;
    let classes = classes_of(page, node).await?;
    if !classes.is_empty() {
        let selector = format!(
            "{tag}.{}",
            classes.iter().take(3).cloned().collect::<Vec<_>>().join(".")
        );
        if count(page, &selector).await? == 1 {
            return Ok(selector);
        }
    }

    let mut attrs = String::new();
    for name in ["type", "name", "role"] {
        if let Some(value) = page.attribute(node, name).await? {
            if !value.is_empty() {
                attrs.push_str(&format!(r#"[{name}="{}"]"#, quote(&value)));
            }
        }
    }
    if !attrs.is_empty() {
        let selector = format!("{tag}{attrs}");
        let n = count(page, &selector).await?;
        if (1..=3).contains(&n) {
            return Ok(selector);
        }
    }

    positional_path(page, node).await
}

/// `ancestor > ... > tag:nth-of-type(n)` path, at most
/// [`MAX_PATH_SEGMENTS`] positional segments, anchored at the first ancestor
/// carrying an id.
pub async fn positional_path(page: &dyn DomProvider, node: NodeHandle) -> Result<String, DomError> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node;

    loop {
        let tag = page.tag_name(current).await?;
        let Some(parent) = page.parent(current).await? else {
            segments.insert(0, tag);
            break;
        };

        let mut same_tag = Vec::new();
        for sibling in page.children(parent).await? {
            if page.tag_name(sibling).await? == tag {
                same_tag.push(sibling);
            }
        }
        let segment = if same_tag.len() > 1 {
            let index = same_tag.iter().position(|n| *n == current).unwrap_or(0) + 1;
            format!("{tag}:nth-of-type({index})")
        } else {
            tag
        };
        segments.insert(0, segment);

        if let Some(id) = id_of(page, parent).await? {
            segments.insert(0, id_selector(&id));
            break;
        }
        if segments.len() >= MAX_PATH_SEGMENTS {
            break;
        }
        current = parent;
    }

    Ok(segments.join(" > "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpoint_snapshot::HtmlSnapshot;

    fn page(body: &str) -> HtmlSnapshot {
        HtmlSnapshot::parse(
            "https://example.com/",
            &format!("<html><body>{body}</body></html>"),
        )
    }

    async fn nth(page: &HtmlSnapshot, selector: &str, index: usize) -> NodeHandle {
        page.query_all(selector).await.unwrap()[index]
    }

    /// The selector must lead back to the node it was built for.
    async fn assert_finds(page: &HtmlSnapshot, selector: &str, node: NodeHandle) {
        let found = page.query_all(selector).await.unwrap();
        assert!(found.contains(&node), "{selector} does not find {node}");
    }

    #[tokio::test]
    async fn test_durable_prefers_id() {
        let page = page(r#"<button id="save" class="btn">Save</button>"#);
        let node = nth(&page, "button", 0).await;
        assert_eq!(durable_selector(&page, node).await, "#save");
    }

    #[tokio::test]
    async fn test_durable_unique_tag_class() {
        let page = page(r#"<div><button class="btn primary">A</button><button class="btn">B</button></div>"#);
        let node = nth(&page, "button", 0).await;

        let selector = durable_selector(&page, node).await;
        assert_eq!(selector, "button.primary");
        assert_eq!(page.query_all(&selector).await.unwrap(), vec![node]);
    }

    #[tokio::test]
    async fn test_positional_path_indexes_same_tag_siblings() {
        let page = page("<ul><li>One</li><li>Two</li></ul>");
        let node = nth(&page, "li", 1).await;

        let selector = durable_selector(&page, node).await;
        assert_eq!(selector, "html > body > ul > li:nth-of-type(2)");
        assert_eq!(page.query_all(&selector).await.unwrap(), vec![node]);
    }

    #[tokio::test]
    async fn test_positional_path_is_capped() {
        let page = page("<div><div><div><div><div><span>deep</span></div></div></div></div></div>");
        let node = nth(&page, "span", 0).await;

        let selector = positional_path(&page, node).await.unwrap();
        assert_eq!(selector.split(" > ").count(), MAX_PATH_SEGMENTS);
        assert_eq!(selector, "div > div > div > div > span");
        assert_finds(&page, &selector, node).await;
    }

    #[tokio::test]
    async fn test_positional_path_anchors_at_id() {
        let page = page(r#"<section><div id="panel"><p>a</p><p>b</p></div></section>"#);
        let node = nth(&page, "p", 1).await;

        let selector = durable_selector(&page, node).await;
        assert_eq!(selector, "#panel > p:nth-of-type(2)");
        assert_eq!(page.query_all(&selector).await.unwrap(), vec![node]);
    }

    #[tokio::test]
    async fn test_catalog_class_tier_uses_three_classes() {
        let page = page(r#"<button class="btn primary large wide">Go</button><button class="btn">Stop</button>"#);
        let node = nth(&page, "button", 0).await;

        let selector = catalog_selector(&page, node).await;
        assert_eq!(selector, "button.btn.primary.large");
        assert_eq!(page.query_all(&selector).await.unwrap(), vec![node]);
    }

    #[tokio::test]
    async fn test_catalog_attribute_tier_allows_few_matches() {
        let page = page(
            r#"<form><input type="checkbox" name="opt"><input type="checkbox" name="opt"></form>"#,
        );
        let node = nth(&page, "input", 1).await;

        let selector = catalog_selector(&page, node).await;
        assert_eq!(selector, r#"input[type="checkbox"][name="opt"]"#);
        assert_finds(&page, &selector, node).await;
    }

    #[tokio::test]
    async fn test_catalog_attribute_tier_rejects_many_matches() {
        let radios = r#"<input type="radio" name="r">"#.repeat(4);
        let page = page(&format!("<div>{radios}</div>"));
        let node = nth(&page, "input", 2).await;

        let selector = catalog_selector(&page, node).await;
        assert_eq!(selector, "html > body > div > input:nth-of-type(3)");
        assert_eq!(page.query_all(&selector).await.unwrap(), vec![node]);
    }

    #[test]
    fn test_id_selector_escapes_odd_ids() {
        assert_eq!(id_selector("login-btn"), "#login-btn");
        assert_eq!(id_selector("form:email"), r#"[id="form:email"]"#);
        assert_eq!(id_selector("1st"), r#"[id="1st"]"#);
    }
}
