//! oEmbed Rewriter
//!
//! Browsers cannot render the editor's `<oembed>` element. YouTube embeds
//! are swapped for an iframe on the privacy-enhanced nocookie domain.

use crate::dom;
use crate::error::AssetResult;

const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";
const OEMBED_SELECTOR: &str = ".ck-content figure.media oembed";
const YOUTUBE_WATCH: &str = "youtube.com/watch";

/// Embed URL for a watch URL; extra query parameters are dropped
pub fn youtube_embed_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("v=")?;
    let video_id = rest.split('&').next().unwrap_or_default();
    if video_id.is_empty() {
        return None;
    }
    Some(format!("{}{}", EMBED_BASE, video_id))
}

pub fn youtube_oembed_to_iframe(url: &str) -> Option<String> {
    let src = youtube_embed_url(url)?;
    Some(format!(
        r#"<div class="oembed-video youtube-oembed-video"><iframe src="{}" allow="accelerometer; autoplay; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe></div>"#,
        src
    ))
}

/// Replace every YouTube oEmbed on the page; returns how many were replaced
pub fn replace_oembeds() -> AssetResult<usize> {
    let mut replaced = 0;
    for element in dom::query_all(OEMBED_SELECTOR)? {
        let Some(source) = element.get_attribute("url") else {
            continue;
        };
        if !source.contains(YOUTUBE_WATCH) {
            continue;
        }
        match youtube_oembed_to_iframe(&source) {
            Some(markup) => {
                element.set_outer_html(&markup);
                replaced += 1;
            }
            None => log::warn!("[OEMBED] No video id in {}", source),
        }
    }
    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_extra_query() {
        assert_eq!(
            youtube_embed_url("https://www.youtube.com/watch?v=abc123&t=5").as_deref(),
            Some("https://www.youtube-nocookie.com/embed/abc123")
        );
    }

    #[test]
    fn test_plain_watch_url() {
        assert_eq!(
            youtube_embed_url("https://youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_without_video_id() {
        assert_eq!(youtube_embed_url("https://www.youtube.com/watch?list=PL1"), None);
        assert_eq!(youtube_embed_url("https://www.youtube.com/watch?v=&t=1"), None);
    }

    #[test]
    fn test_iframe_markup() {
        let markup = youtube_oembed_to_iframe("https://www.youtube.com/watch?v=xyz").unwrap();
        assert!(markup.starts_with(r#"<div class="oembed-video youtube-oembed-video"><iframe src="https://www.youtube-nocookie.com/embed/xyz""#));
        assert!(markup.ends_with("allowfullscreen></iframe></div>"));
    }
}
