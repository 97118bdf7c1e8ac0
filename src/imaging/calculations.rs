//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate thumbnail dimensions for a fixed target width.
///
/// The width is `min(target_width, original_width)`, so images are never
/// upscaled. The height follows the original aspect ratio, rounded to the
/// nearest pixel and never below 1.
///
/// # Examples
/// ```
/// # use comfy_gallery::imaging::calculate_thumbnail_dimensions;
/// // 1024x1536 portrait → 300x450
/// assert_eq!(calculate_thumbnail_dimensions((1024, 1536), 300), (300, 450));
///
/// // Narrower than the target: left alone
/// assert_eq!(calculate_thumbnail_dimensions((200, 100), 300), (200, 100));
/// ```
pub fn calculate_thumbnail_dimensions(original: (u32, u32), target_width: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return original;
    }

    let width = target_width.min(orig_w).max(1);
    let height = (width as f64 * orig_h as f64 / orig_w as f64).round() as u32;
    (width, height.max(1))
}
