use crate::engine::DetectedFace;
use crate::graph::model::SocialTag;

/// Resolves which tag, if any, labels a detected face.
///
/// Each tag's percentage anchor is converted to pixel space using the actual
/// image dimensions, then tested against the detection box expanded by
/// `tolerance` on all sides. The first tag in list order that passes the test
/// and carries a non-null identity wins; a tag inside the box without an
/// identity does not block later tags.
pub fn find_tag<'a>(
    tags: &'a [SocialTag],
    face: &DetectedFace,
    img_w: u32,
    img_h: u32,
    tolerance: f32,
) -> Option<&'a SocialTag> {
    for tag in tags {
        let tx = img_w as f32 * (tag.x / 100.0);
        let ty = img_h as f32 * (tag.y / 100.0);

        let left = face.x as f32 - tolerance;
        let right = face.x as f32 + face.width as f32 + tolerance;
        let top = face.y as f32 - tolerance;
        let bottom = face.y as f32 + face.height as f32 + tolerance;

        if tx >= left && tx <= right && ty >= top && ty <= bottom && tag.id.is_some() {
            return Some(tag);
        }
    }
    None
}

/// Square crop window for a detection, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Computes the square window to crop around a detection before scaling it
/// to the normalized training size. The side is the longer box dimension so
/// the downstream resize keeps the face undistorted; the window is centered
/// on the detection and clamped to the image bounds.
pub fn crop_region(face: &DetectedFace, img_w: u32, img_h: u32) -> CropRegion {
    let side = face.width.max(face.height).min(img_w).min(img_h);
    let cx = face.x as i64 + face.width as i64 / 2;
    let cy = face.y as i64 + face.height as i64 / 2;
    let max_x = img_w as i64 - side as i64;
    let max_y = img_h as i64 - side as i64;
    let x = (cx - side as i64 / 2).clamp(0, max_x) as u32;
    let y = (cy - side as i64 / 2).clamp(0, max_y) as u32;
    CropRegion { x, y, side }
}
