//! Google Drive download source.
//!
//! Small files come straight back from the `uc?export=download` endpoint.
//! Larger ones get an HTML "can't scan this file for viruses" page first,
//! which carries a confirmation form; that form is turned into a second
//! request that returns the actual file.

use crate::provision::{ProvisionError, RemoteSource};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, Url};
use results_common::ProvisionConfig;
use scraper::{Html, Selector};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads one Drive file by ID
pub struct DriveSource {
    http: reqwest::Client,
    url: String,
}

impl DriveSource {
    pub fn new(config: &ProvisionConfig) -> Result<Self, ProvisionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("resultsd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisionError::FetchFailed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.download_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get(&self, url: &str) -> Result<Response, ProvisionError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProvisionError::FetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProvisionError::FetchFailed(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteSource for DriveSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch_to(&self, dest: &Path) -> Result<u64, ProvisionError> {
        let mut response = self.get(&self.url).await?;

        if is_html(&response) {
            let page = response
                .text()
                .await
                .map_err(|e| ProvisionError::FetchFailed(e.to_string()))?;
            let confirmed = confirm_url(&page, &self.url)?.ok_or_else(|| {
                ProvisionError::InvalidContent(
                    "Drive returned an HTML page without a download confirmation".to_string(),
                )
            })?;

            info!("Drive asked for download confirmation, following {}", confirmed);
            response = self.get(&confirmed).await?;
            if is_html(&response) {
                return Err(ProvisionError::InvalidContent(
                    "Drive returned HTML after confirmation".to_string(),
                ));
            }
        }

        write_body(response, dest).await
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().starts_with("text/html"))
        .unwrap_or(false)
}

async fn write_body(mut response: Response, dest: &Path) -> Result<u64, ProvisionError> {
    if let Some(len) = response.content_length() {
        debug!("Expecting {} bytes", len);
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| ProvisionError::io(dest, e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProvisionError::FetchFailed(format!("reading body: {}", e)))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ProvisionError::io(dest, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| ProvisionError::io(dest, e))?;
    file.sync_all()
        .await
        .map_err(|e| ProvisionError::io(dest, e))?;
    Ok(written)
}

/// Build the confirmed download URL from a Drive interstitial page.
///
/// Understands the current form-based page (form action plus hidden inputs)
/// and the older page that links to `uc?...&confirm=<token>`. Relative
/// actions and links resolve against `original_url`.
pub fn confirm_url(page: &str, original_url: &str) -> Result<Option<String>, ProvisionError> {
    let base = Url::parse(original_url)
        .map_err(|e| ProvisionError::FetchFailed(format!("bad download URL: {}", e)))?;
    let document = Html::parse_document(page);

    if let Some(url) = form_confirm_url(&document, &base)? {
        return Ok(Some(url));
    }
    legacy_confirm_url(&document, &base)
}

fn selector(css: &str) -> Result<Selector, ProvisionError> {
    Selector::parse(css).map_err(|e| {
        ProvisionError::InvalidContent(format!("selector {:?}: {}", css, e))
    })
}

fn form_confirm_url(document: &Html, base: &Url) -> Result<Option<String>, ProvisionError> {
    let form_selector = selector("form[action]")?;
    let input_selector = selector("input[name]")?;

    for form in document.select(&form_selector) {
        let fields: Vec<(&str, &str)> = form
            .select(&input_selector)
            .filter_map(|input| {
                let el = input.value();
                Some((el.attr("name")?, el.attr("value").unwrap_or("")))
            })
            .collect();

        if !fields.iter().any(|(name, _)| *name == "confirm") {
            continue;
        }

        let Some(action) = form.value().attr("action") else {
            continue;
        };
        let Ok(mut url) = base.join(action) else {
            continue;
        };
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(fields);
        return Ok(Some(url.to_string()));
    }
    Ok(None)
}

fn legacy_confirm_url(document: &Html, base: &Url) -> Result<Option<String>, ProvisionError> {
    let link_selector = selector("a[href]")?;

    let token = document
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .find_map(|link| {
            link.query_pairs()
                .find(|(k, v)| k == "confirm" && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        });
    let Some(token) = token else {
        return Ok(None);
    };

    let mut url = base.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "confirm")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("confirm", &token);
    Ok(Some(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "https://drive.google.com/uc?export=download&id=FILE123";

    #[test]
    fn test_confirm_form_page() {
        let page = r#"<html><body>
<p>Google Drive can't scan this file for viruses.</p>
<form id="download-form" action="https://drive.usercontent.google.com/download" method="get">
  <input type="submit" id="uc-download-link" class="goog-inline-block" value="Download anyway"/>
  <input type="hidden" name="id" value="FILE123">
  <input type="hidden" name="export" value="download">
  <input type="hidden" name="confirm" value="t">
  <input type="hidden" name="uuid" value="0f1e2d3c-aaaa-bbbb">
</form></body></html>"#;

        let url = confirm_url(page, ORIGINAL).unwrap().unwrap();
        assert_eq!(
            url,
            "https://drive.usercontent.google.com/download?id=FILE123&export=download&confirm=t&uuid=0f1e2d3c-aaaa-bbbb"
        );
    }

    #[test]
    fn test_confirm_form_any_attribute_order_and_quoting() {
        let page = r#"<form method='get' action='https://drive.usercontent.google.com/download?stale=1' id='download-form'>
  <input value="FILE123" type="hidden" name="id">
  <input value='t' name='confirm' type='hidden'>
  <input name=uuid value=abc-123 type=hidden>
</form>"#;

        let url = confirm_url(page, ORIGINAL).unwrap().unwrap();
        assert_eq!(
            url,
            "https://drive.usercontent.google.com/download?id=FILE123&confirm=t&uuid=abc-123"
        );
    }

    #[test]
    fn test_confirm_form_relative_action_and_entities() {
        let page = r#"<form action="/download"><input type="hidden" name="confirm" value="a&amp;b"></form>"#;

        let url = confirm_url(page, ORIGINAL).unwrap().unwrap();
        assert_eq!(url, "https://drive.google.com/download?confirm=a%26b");
    }

    #[test]
    fn test_legacy_confirm_link() {
        let page = r#"<a id="uc-download-link" href="/uc?export=download&amp;confirm=AbC_9-x&amp;id=FILE123">Download anyway</a>"#;

        let url = confirm_url(page, ORIGINAL).unwrap().unwrap();
        assert_eq!(
            url,
            "https://drive.google.com/uc?export=download&id=FILE123&confirm=AbC_9-x"
        );
    }

    #[test]
    fn test_form_without_confirm_field_is_ignored() {
        let page = r#"<form action="https://accounts.google.com/signin"><input type="hidden" name="continue" value="x"></form>"#;
        assert!(confirm_url(page, ORIGINAL).unwrap().is_none());
    }

    #[test]
    fn test_plain_error_page_has_no_confirmation() {
        let page = "<html><title>Quota exceeded</title><body>Too many users have viewed or downloaded this file recently.</body></html>";
        assert!(confirm_url(page, ORIGINAL).unwrap().is_none());
    }

    #[test]
    fn test_download_url_from_config() {
        let mut config = ProvisionConfig::default();
        config.drive_file_id = "XYZ".to_string();
        let source = DriveSource::new(&config).unwrap();
        assert_eq!(source.url(), "https://drive.google.com/uc?export=download&id=XYZ");
    }
}
