//! The single HTML page served at `/`.
//!
//! Rendered with [Maud](https://maud.lambda.xyz/). The page is a static shell:
//! the image list, thumbnails and metadata are fetched by `static/gallery.js`
//! from the JSON API once the page loads. CSS and JS are inlined so the server
//! has no asset routes to keep in sync.
//!
//! Element ids are the contract with the script:
//!
//! | Id | Role |
//! |----|------|
//! | `gallery` | Thumbnail grid |
//! | `search` | Filename filter input |
//! | `image-count` | Number of listed images |
//! | `preview-image` | Selected image in the detail panel |
//! | `metadata-content` | Metadata of the selected image |
//! | `image-modal`, `full-image`, `caption` | Full-size viewer |

use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/gallery.js");

/// Render the gallery page.
pub fn render_index(title: &str) -> Markup {
    let content = html! {
        div.layout {
            (toolbar(title))
            main #gallery .gallery {}
            (details_panel())
        }
        (viewer())
        script { (PreEscaped(JS)) }
    };
    base_document(title, content)
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn toolbar(title: &str) -> Markup {
    html! {
        header.toolbar {
            h1 { (title) }
            input #search type="search" placeholder="Filter by filename" autocomplete="off";
            span #image-count .image-count { "Loading..." }
        }
    }
}

fn details_panel() -> Markup {
    html! {
        aside #details-panel .details-panel {
            img #preview-image .preview alt="";
            div #metadata-content {
                p { "Select an image to see its metadata." }
            }
        }
    }
}

fn viewer() -> Markup {
    html! {
        div #image-modal .modal {
            button.close-modal type="button" title="Close" { "×" }
            img #full-image alt="";
            div #caption .caption {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_a_full_document() {
        let page = render_index("Gallery").into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Gallery</title>"));
    }

    #[test]
    fn page_has_script_anchors() {
        let page = render_index("Gallery").into_string();
        for id in [
            "gallery",
            "search",
            "image-count",
            "preview-image",
            "metadata-content",
            "image-modal",
            "full-image",
            "caption",
        ] {
            assert!(
                page.contains(&format!("id=\"{id}\"")),
                "missing element #{id}"
            );
        }
    }

    #[test]
    fn assets_are_inlined() {
        let page = render_index("Gallery").into_string();
        assert!(page.contains("/api/images"));
        assert!(page.contains(".thumbnail-card"));
        // Script runs after the elements it looks up
        assert!(page.find("id=\"caption\"").unwrap() < page.find("<script>").unwrap());
    }

    #[test]
    fn title_is_escaped() {
        let page = render_index("<b>x</b>").into_string();
        assert!(page.contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
