#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Wikipedia page-preview supplier for the city popup.
//!
//! Fetches are fire-and-forget; each carries a generation nonce and a
//! completion whose nonce no longer matches the current one is discarded,
//! so a slow response can never populate the popup of a different city.

use leptos::prelude::*;
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;

/// The preview fields the popup consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewData {
    pub title: String,
    pub extract_html: Option<String>,
    pub img_url: Option<String>,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract_html: Option<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    source: String,
}

/// Percent-encode an article title for use in a URL path. Spaces become
/// underscores first, the way Wikipedia canonicalizes titles.
pub fn encode_title(title: &str) -> String {
    let canonical = title.replace(' ', "_");
    let mut out = String::with_capacity(canonical.len());
    for byte in canonical.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}

/// The external article link shown in the popup.
pub fn article_url(lang: &str, title: &str) -> String {
    format!("https://{lang}.wikipedia.org/wiki/{}", encode_title(title))
}

fn summary_endpoint(lang: &str, title: &str) -> String {
    format!(
        "https://{lang}.wikipedia.org/api/rest_v1/page/summary/{}",
        encode_title(title)
    )
}

pub async fn fetch_summary(lang: &str, title: &str) -> Result<PreviewData, String> {
    let resp = gloo_net::http::Request::get(&summary_endpoint(lang, title))
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let summary: SummaryResponse = resp
        .json()
        .await
        .map_err(|e| format!("parse error: {e}"))?;

    Ok(PreviewData {
        title: summary.title,
        extract_html: summary.extract_html,
        img_url: summary.thumbnail.map(|t| t.source),
    })
}

/// Start a preview fetch for the current selection. Bumps the fetch nonce so
/// any earlier in-flight request becomes stale, then applies the result only
/// if this request is still the latest by the time it lands. Failures leave
/// the popup's identity section on its own — preview content is optional.
pub fn load_preview(
    lang: &'static str,
    article: String,
    fetch_nonce: RwSignal<u64>,
    preview: RwSignal<Option<PreviewData>>,
) {
    let request_nonce = fetch_nonce.get_untracked().wrapping_add(1);
    fetch_nonce.set(request_nonce);
    preview.set(None);

    spawn_local(async move {
        let result = fetch_summary(lang, &article).await;
        if fetch_nonce.get_untracked() != request_nonce {
            return;
        }
        match result {
            Ok(data) => preview.set(Some(data)),
            Err(e) => {
                web_sys::console::warn_1(&format!("wikipedia preview failed: {e}").into());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces_as_underscores() {
        assert_eq!(encode_title("Ancient Rome"), "Ancient_Rome");
    }

    #[test]
    fn percent_encodes_reserved_and_non_ascii() {
        assert_eq!(encode_title("Side (Pamphylia)"), "Side_%28Pamphylia%29");
        assert_eq!(encode_title("Çatalhöyük"), "%C3%87atalh%C3%B6y%C3%BCk");
    }

    #[test]
    fn builds_article_urls_per_language() {
        assert_eq!(
            article_url("en", "Ancient Rome"),
            "https://en.wikipedia.org/wiki/Ancient_Rome"
        );
        assert_eq!(
            article_url("de", "Rom"),
            "https://de.wikipedia.org/wiki/Rom"
        );
    }

    #[test]
    fn summary_endpoint_targets_the_rest_api() {
        assert_eq!(
            summary_endpoint("en", "Sparta"),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Sparta"
        );
    }

    #[test]
    fn summary_response_tolerates_missing_fields() {
        let parsed: SummaryResponse = serde_json::from_str(r#"{ "title": "Sparta" }"#).unwrap();
        assert_eq!(parsed.title, "Sparta");
        assert!(parsed.extract_html.is_none());
        assert!(parsed.thumbnail.is_none());
    }
}
