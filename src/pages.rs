//! HTML rendering for the two user-facing pages. The link page inlines the
//! provider logos as base64 data URIs so it works without a static file
//! route.

use std::path::Path;

use base64::Engine;

const LINK_TEMPLATE: &str = include_str!("../templates/link.html");
const HOME_TEMPLATE: &str = include_str!("../templates/home.html");

pub fn home_page() -> String {
    HOME_TEMPLATE.to_string()
}

/// Render the link page. Logos are loaded sequentially from the assets dir;
/// a missing or unreadable image leaves its slot empty and is only logged.
pub fn link_page(assets_dir: &Path) -> String {
    let slots = [
        ("{{gdrive_image}}", "googldrive.png"),
        ("{{gflicker_image}}", "gflicker.png"),
        ("{{flickr_image}}", "flickr.png"),
    ];

    let mut page = LINK_TEMPLATE.to_string();
    for (slot, file) in slots {
        let encoded = image_base64(&assets_dir.join(file)).unwrap_or_default();
        page = page.replace(slot, &encoded);
    }
    page
}

fn image_base64(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read link page image");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_page_embeds_available_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("googldrive.png"), b"fakepng").unwrap();

        let page = link_page(dir.path());
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fakepng");
        assert!(page.contains(&encoded));
        // Slots with missing images render empty, not as literal placeholders.
        assert!(!page.contains("{{flickr_image}}"));
    }

    #[test]
    fn home_page_has_upload_form() {
        let page = home_page();
        assert!(page.contains("/upload/file"));
        assert!(page.contains("multipart/form-data"));
    }
}
