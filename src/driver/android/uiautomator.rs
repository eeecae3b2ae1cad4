use crate::utils::config::RetryPolicy;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::future::Future;
use std::time::Duration;

/// Decode common HTML entities in a string
/// Handles: &amp; &lt; &gt; &quot; &apos; &#NNN; (decimal) &#xHHH; (hex)
fn decode_html_entities(s: &str) -> String {
    let mut result = s.to_string();

    // Named entities
    result = result.replace("&amp;", "&");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");

    // Numeric entities (decimal): &#NNN;
    let decimal_re = Regex::new(r"&#(\d+);").unwrap();
    result = decimal_re
        .replace_all(&result, |caps: &regex::Captures| {
            if let Ok(code) = caps[1].parse::<u32>() {
                if let Some(c) = char::from_u32(code) {
                    return c.to_string();
                }
            }
            caps[0].to_string()
        })
        .to_string();

    // Numeric entities (hex): &#xHHH;
    let hex_re = Regex::new(r"&#x([0-9A-Fa-f]+);").unwrap();
    result = hex_re
        .replace_all(&result, |caps: &regex::Captures| {
            if let Ok(code) = u32::from_str_radix(&caps[1], 16) {
                if let Some(c) = char::from_u32(code) {
                    return c.to_string();
                }
            }
            caps[0].to_string()
        })
        .to_string();

    result
}

/// Represents a UI element from the view hierarchy
#[derive(Debug, Clone)]
pub struct UiElement {
    pub class: String,
    pub text: String,
    pub resource_id: String,
    pub content_desc: String,
    pub bounds: Bounds,
    pub clickable: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Get the center point of the bounds
    pub fn center(&self) -> (i32, i32) {
        let x = (self.left + self.right) / 2;
        let y = (self.top + self.bottom) / 2;
        (x, y)
    }

    /// Parse bounds from string like "[0,0][1080,1920]"
    pub fn from_string(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split("][").collect();
        if parts.len() != 2 {
            return None;
        }

        let left_top = parts[0].strip_prefix('[')?;
        let right_bottom = parts[1].strip_suffix(']')?;

        let lt: Vec<i32> = left_top.split(',').filter_map(|s| s.parse().ok()).collect();
        let rb: Vec<i32> = right_bottom
            .split(',')
            .filter_map(|s| s.parse().ok())
            .collect();

        if lt.len() == 2 && rb.len() == 2 {
            Some(Bounds {
                left: lt[0],
                top: lt[1],
                right: rb[0],
                bottom: rb[1],
            })
        } else {
            None
        }
    }
}

/// Parse UI hierarchy XML from uiautomator dump
///
/// Elements are returned in document order. A malformed document is an
/// error, not an empty result.
pub fn parse_hierarchy(xml: &str) -> Result<Vec<UiElement>> {
    let mut elements = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Malformed UI hierarchy dump")?
        {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.name().as_ref() == b"node" {
                    let mut element = UiElement {
                        class: String::new(),
                        text: String::new(),
                        resource_id: String::new(),
                        content_desc: String::new(),
                        bounds: Bounds::default(),
                        clickable: false,
                        enabled: true,
                    };

                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        let key = String::from_utf8_lossy(attr.key.as_ref());
                        let value = String::from_utf8_lossy(&attr.value);

                        match key.as_ref() {
                            "class" => element.class = value.to_string(),
                            "text" => element.text = decode_html_entities(&value),
                            "resource-id" => element.resource_id = value.to_string(),
                            "content-desc" => element.content_desc = decode_html_entities(&value),
                            "bounds" => {
                                if let Some(b) = Bounds::from_string(&value) {
                                    element.bounds = b;
                                }
                            }
                            "clickable" => element.clickable = value == "true",
                            "enabled" => element.enabled = value == "true",
                            _ => {}
                        }
                    }

                    elements.push(element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(elements)
}

/// Find element by label text (exact, case-sensitive, first in document order)
pub fn find_by_text<'a>(elements: &'a [UiElement], text: &str) -> Option<&'a UiElement> {
    elements.iter().find(|e| e.text == text)
}

/// Locate the center point of the first element labeled `text`, polling the
/// dump until the retry budget is exhausted.
///
/// Each attempt sleeps `policy.delay_ms` before dumping so freshly launched
/// screens have a chance to render. Returns `Ok(None)` when no attempt
/// produced a match; a malformed dump aborts the whole call with `Err`.
pub async fn locate_with_retry<F, Fut>(
    mut fetch_dump: F,
    text: &str,
    policy: &RetryPolicy,
) -> Result<Option<(i32, i32)>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;

        let xml = fetch_dump().await?;
        let elements = parse_hierarchy(&xml)?;

        if let Some(element) = find_by_text(&elements, text) {
            return Ok(Some(element.bounds.center()));
        }

        log::debug!(
            "Element '{}' not visible (attempt {}/{})",
            text,
            attempt,
            policy.max_attempts
        );
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str, bounds: &str) -> String {
        format!(
            r#"<node class="android.widget.Button" text="{}" resource-id="" content-desc="" bounds="{}" clickable="true" enabled="true"/>"#,
            text, bounds
        )
    }

    fn hierarchy(nodes: &[String]) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?><hierarchy rotation=\"0\">{}</hierarchy>",
            nodes.concat()
        )
    }

    #[test]
    fn test_bounds_center() {
        let bounds = Bounds::from_string("[10,20][30,40]").unwrap();
        assert_eq!(bounds.center(), (20, 30));
    }

    #[test]
    fn test_bounds_center_floors() {
        let bounds = Bounds::from_string("[0,0][5,7]").unwrap();
        assert_eq!(bounds.center(), (2, 3));
    }

    #[test]
    fn test_bounds_malformed() {
        assert_eq!(Bounds::from_string(""), None);
        assert_eq!(Bounds::from_string("[10,20]"), None);
        assert_eq!(Bounds::from_string("10,20][30,40"), None);
        assert_eq!(Bounds::from_string("[a,b][c,d]"), None);
    }

    #[test]
    fn test_find_by_text_exact_case_sensitive() {
        let xml = hierarchy(&[node("install", "[0,0][10,10]")]);
        let elements = parse_hierarchy(&xml).unwrap();
        assert!(find_by_text(&elements, "Install").is_none());
        assert!(find_by_text(&elements, "install").is_some());
    }

    #[test]
    fn test_find_by_text_document_order() {
        let xml = hierarchy(&[
            node("Install", "[0,0][100,100]"),
            node("Install", "[200,200][300,300]"),
        ]);
        let elements = parse_hierarchy(&xml).unwrap();
        let found = find_by_text(&elements, "Install").unwrap();
        assert_eq!(found.bounds.center(), (50, 50));
    }

    #[test]
    fn test_parse_hierarchy_decodes_entities() {
        let xml = hierarchy(&[node("Devices &amp; Groups", "[0,0][100,100]")]);
        let elements = parse_hierarchy(&xml).unwrap();
        assert_eq!(elements[0].text, "Devices & Groups");
    }

    #[test]
    fn test_parse_hierarchy_malformed_is_error() {
        let xml = "<?xml version='1.0'?><hierarchy><node text=\"Install\"";
        assert!(parse_hierarchy(xml).is_err());
    }

    #[test]
    fn test_decode_html_entities_numeric() {
        assert_eq!(decode_html_entities("Security&#10;Safe"), "Security\nSafe");
        assert_eq!(decode_html_entities("&#x41;&#x42;&#x43;"), "ABC");
        assert_eq!(decode_html_entities("Normal text"), "Normal text");
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_locate_with_retry_found() {
        let xml = hierarchy(&[node("Install", "[10,20][30,40]")]);
        let result = locate_with_retry(|| async { Ok(xml.clone()) }, "Install", &fast_policy(3))
            .await
            .unwrap();
        assert_eq!(result, Some((20, 30)));
    }

    #[tokio::test]
    async fn test_locate_with_retry_exhausts_budget() {
        let xml = hierarchy(&[node("Open", "[0,0][10,10]")]);
        let mut attempts = 0u32;
        let result = locate_with_retry(
            || {
                attempts += 1;
                let xml = xml.clone();
                async move { Ok(xml) }
            },
            "Install",
            &fast_policy(4),
        )
        .await
        .unwrap();
        assert_eq!(result, None);
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn test_locate_with_retry_surfaces_parse_error() {
        let result = locate_with_retry(
            || async { Ok("<hierarchy><node".to_string()) },
            "Install",
            &fast_policy(5),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_locate_with_retry_becomes_visible() {
        let empty = hierarchy(&[]);
        let with_button = hierarchy(&[node("Install", "[100,200][300,400]")]);
        let mut attempts = 0u32;
        let result = locate_with_retry(
            || {
                attempts += 1;
                let xml = if attempts < 3 {
                    empty.clone()
                } else {
                    with_button.clone()
                };
                async move { Ok(xml) }
            },
            "Install",
            &fast_policy(5),
        )
        .await
        .unwrap();
        assert_eq!(result, Some((200, 300)));
        assert_eq!(attempts, 3);
    }
}
