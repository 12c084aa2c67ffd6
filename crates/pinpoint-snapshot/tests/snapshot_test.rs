use pinpoint_common::{DomError, DomProvider, ReadyState};
use pinpoint_snapshot::{HtmlSnapshot, SnapshotSequence};
use std::time::Duration;

const PAGE: &str = r#"
<html>
  <head><title>Sign in</title></head>
  <body>
    <form id="login">
      <label for="email">Email</label>
      <input id="email" type="email" placeholder="Email">
      <input type="hidden" name="csrf" value="x">
      <div style="display: none"><button id="ghost">Ghost</button></div>
      <button id="go" class="btn primary"><span class="btn-text">Sign in</span></button>
    </form>
  </body>
</html>
"#;

#[tokio::test]
async fn test_query_all_in_document_order() {
    let page = HtmlSnapshot::parse("https://example.com/login", PAGE);
    let inputs = page.query_all("input").await.unwrap();
    assert_eq!(inputs.len(), 2);
    assert!(inputs[0] < inputs[1]);
    assert_eq!(
        page.attribute(inputs[0], "id").await.unwrap().as_deref(),
        Some("email")
    );
    assert_eq!(page.current_url().await.unwrap(), "https://example.com/login");
}

#[tokio::test]
async fn test_visibility_rules() {
    let page = HtmlSnapshot::parse("https://example.com", PAGE);
    let email = page.query_one("#email").await.unwrap().unwrap();
    let hidden_input = page.query_one("input[type=hidden]").await.unwrap().unwrap();
    let ghost = page.query_one("#ghost").await.unwrap().unwrap();
    let title = page.query_one("title").await.unwrap().unwrap();

    assert!(page.is_visible(email).await.unwrap());
    assert!(!page.is_visible(hidden_input).await.unwrap());
    assert!(!page.is_visible(ghost).await.unwrap());
    assert!(!page.is_visible(title).await.unwrap());
}

#[tokio::test]
async fn test_traversal() {
    let page = HtmlSnapshot::parse("https://example.com", PAGE);
    let email = page.query_one("#email").await.unwrap().unwrap();
    let form = page.parent(email).await.unwrap().unwrap();
    assert_eq!(page.tag_name(form).await.unwrap(), "form");

    let children = page.children(form).await.unwrap();
    assert_eq!(children.len(), 5);

    let label = page.previous_sibling(email).await.unwrap().unwrap();
    assert_eq!(page.tag_name(label).await.unwrap(), "label");
    assert_eq!(page.text(label).await.unwrap(), "Email");

    let siblings = page.siblings(email).await.unwrap();
    assert_eq!(siblings.len(), 4);
    assert!(!siblings.contains(&email));
}

#[tokio::test]
async fn test_query_within_excludes_scope() {
    let page = HtmlSnapshot::parse("https://example.com", PAGE);
    let button = page.query_one("#go").await.unwrap().unwrap();
    let spans = page.query_within(button, "span, button").await.unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(page.text(spans[0]).await.unwrap(), "Sign in");
}

#[tokio::test]
async fn test_invalid_selector_is_an_error() {
    let page = HtmlSnapshot::parse("https://example.com", PAGE);
    let err = page.query_all("button[").await.unwrap_err();
    assert!(matches!(err, DomError::InvalidSelector { .. }));
}

#[tokio::test]
async fn test_query_log() {
    let page = HtmlSnapshot::parse("https://example.com", PAGE);
    page.query_all("button").await.unwrap();
    page.query_one("#email").await.unwrap();
    assert_eq!(page.queries(), vec!["button".to_string(), "#email".to_string()]);
    page.clear_queries();
    assert!(page.queries().is_empty());
}

#[tokio::test]
async fn test_sequence_advances_after_first_wait() {
    let page = SnapshotSequence::new(
        "https://example.com",
        &[
            "<html><body><div class='spinner'></div></body></html>",
            "<html><body><button>Save</button></body></html>",
        ],
    );
    let wait = Duration::from_millis(10);

    page.wait_for_ready(ReadyState::ContentParsed, wait).await.unwrap();
    assert_eq!(page.frame_index(), 0);
    assert!(page.query_all("button").await.unwrap().is_empty());

    page.wait_for_ready(ReadyState::NetworkIdle, wait).await.unwrap();
    assert_eq!(page.frame_index(), 0);

    page.wait_for_ready(ReadyState::ContentParsed, wait).await.unwrap();
    assert_eq!(page.frame_index(), 1);
    assert_eq!(page.query_all("button").await.unwrap().len(), 1);

    // Stays on the last frame
    page.wait_for_ready(ReadyState::ContentParsed, wait).await.unwrap();
    assert_eq!(page.frame_index(), 1);
    assert_eq!(page.waits(), 3);
}
