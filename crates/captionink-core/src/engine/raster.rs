//! CPU rasterization of a scene into an RGBA frame.

use super::fonts::{FontBook, ITALIC_SHEAR, bold_offset, line_widths};
use crate::scene::SceneDocument;
use crate::shapes::{BackgroundImage, ObjectId, SceneObject, SerializableColor, TextObject};
use ab_glyph::{Font, PxScale, ScaleFont, point};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use kurbo::Rect;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

/// A rendered frame (RGBA8, not premultiplied).
pub type Frame = RgbaImage;

/// Glyphs whose outline exceeds this many pixels on either axis are not
/// rasterized. Coverage buffers grow with the square of the glyph size.
pub(crate) const MAX_GLYPH_EXTENT: f32 = 4096.0;

/// Decoded pixels for the background images of a scene.
#[derive(Debug, Default, Clone)]
pub(crate) struct ImageCache {
    sources: HashMap<ObjectId, Arc<RgbaImage>>,
    scaled: HashMap<ObjectId, Arc<RgbaImage>>,
}

impl ImageCache {
    pub fn contains(&self, id: ObjectId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn insert(&mut self, id: ObjectId, pixels: Arc<RgbaImage>) {
        self.scaled.remove(&id);
        self.sources.insert(id, pixels);
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.scaled.clear();
    }

    /// Drop pixels for every image not in `keep`.
    pub fn retain(&mut self, keep: &[ObjectId]) {
        self.sources.retain(|id, _| keep.contains(id));
        self.scaled.retain(|id, _| keep.contains(id));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Source pixels resized to the image's display size.
    fn scaled_for(&mut self, image: &BackgroundImage) -> Option<Arc<RgbaImage>> {
        let width = image.width().round().max(1.0) as u32;
        let height = image.height().round().max(1.0) as u32;
        if let Some(scaled) = self.scaled.get(&image.id()) {
            if scaled.dimensions() == (width, height) {
                return Some(Arc::clone(scaled));
            }
        }
        let source = self.sources.get(&image.id())?;
        let scaled = if source.dimensions() == (width, height) {
            Arc::clone(source)
        } else {
            Arc::new(imageops::resize(source.as_ref(), width, height, FilterType::Triangle))
        };
        self.scaled.insert(image.id(), Arc::clone(&scaled));
        Some(scaled)
    }
}

/// Selection chrome drawn on top of the scene (display frames only).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SelectionOverlay {
    pub bounds: Rect,
    pub color: SerializableColor,
}

/// Rasterize every object of `document` back to front.
pub(crate) fn rasterize(
    document: &SceneDocument,
    images: &mut ImageCache,
    fonts: &FontBook,
    selection: Option<SelectionOverlay>,
) -> Frame {
    let mut frame = Frame::new(document.width.max(1), document.height.max(1));
    for object in &document.objects {
        match object {
            SceneObject::Image(image) => draw_image(&mut frame, images, image),
            SceneObject::Text(text) => draw_text(&mut frame, fonts, text),
        }
    }
    if let Some(overlay) = selection {
        stroke_rect(&mut frame, overlay.bounds.inflate(2.0, 2.0), overlay.color);
    }
    frame
}

fn draw_image(frame: &mut Frame, images: &mut ImageCache, image: &BackgroundImage) {
    let Some(scaled) = images.scaled_for(image) else {
        log::warn!("No pixels cached for image {}", image.id());
        return;
    };
    imageops::overlay(
        frame,
        scaled.as_ref(),
        image.position.x.round() as i64,
        image.position.y.round() as i64,
    );
}

fn draw_text(frame: &mut Frame, fonts: &FontBook, text: &TextObject) {
    let size = text.font_size as f32;
    if size <= 0.0 || !size.is_finite() {
        return;
    }
    let line_height = text.line_height() as f32;
    let origin_x = text.position.x as f32;
    let origin_y = text.position.y as f32;

    let Some(font) = fonts.resolve(&text.font_family) else {
        log::debug!("No font for family {}; drawing decorations only", text.font_family);
        if text.underline {
            let (width, _) = text.approximate_size();
            for line in 0..text.line_count() {
                let baseline = origin_y + line as f32 * line_height + size * 0.8;
                draw_underline(frame, origin_x, baseline, width as f32, size, text.fill);
            }
        }
        return;
    };

    let scaled = font.as_scaled(PxScale::from(size));
    let ascent = scaled.ascent();
    let shear = if text.is_italic() { ITALIC_SHEAR } else { 0.0 };
    let passes = if text.is_bold() { bold_offset(size) + 1 } else { 1 };
    let widths = line_widths(font, text);

    for (index, line) in text.content.split('\n').enumerate() {
        let baseline = origin_y + index as f32 * line_height + ascent;
        let mut caret = origin_x;
        let mut previous = None;
        for ch in line.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(PxScale::from(size), point(caret, baseline));
            caret += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            if bounds.width() > MAX_GLYPH_EXTENT || bounds.height() > MAX_GLYPH_EXTENT {
                log::debug!("Glyph {:?} too large to rasterize at size {}", ch, size);
                continue;
            }
            let slant = shear * (baseline - bounds.min.y).max(0.0);
            let left = bounds.min.x + shear * (baseline - bounds.max.y).min(0.0);
            let right = bounds.max.x + slant + passes as f32;
            let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);
            if right < 0.0 || bounds.max.y < 0.0 || left >= frame_w || bounds.min.y >= frame_h {
                continue;
            }
            outlined.draw(|gx, gy, coverage| {
                let y = bounds.min.y + gy as f32;
                let x = bounds.min.x + gx as f32 + shear * (baseline - y);
                for dx in 0..passes {
                    blend(frame, x as i64 + dx as i64, y as i64, text.fill, coverage);
                }
            });
        }
        if text.underline {
            let width = widths.get(index).copied().unwrap_or(0.0);
            draw_underline(frame, origin_x, baseline, width, size, text.fill);
        }
    }
}

fn draw_underline(frame: &mut Frame, x: f32, baseline: f32, width: f32, size: f32, color: SerializableColor) {
    let thickness = (size / 15.0).round().max(1.0) as i64;
    let top = (baseline + size * 0.1).round() as i64;
    let (xs, ys) = visible(frame, x.round() as i64, (x + width).round() as i64, top, top.saturating_add(thickness));
    for y in ys {
        for x in xs.clone() {
            blend(frame, x, y, color, 1.0);
        }
    }
}

fn stroke_rect(frame: &mut Frame, rect: Rect, color: SerializableColor) {
    let (x0, y0) = (rect.x0.round() as i64, rect.y0.round() as i64);
    let (x1, y1) = (rect.x1.round() as i64, rect.y1.round() as i64);
    let (xs, ys) = visible(frame, x0, x1.saturating_add(1), y0, y1.saturating_add(1));
    for x in xs {
        blend(frame, x, y0, color, 1.0);
        blend(frame, x, y1, color, 1.0);
    }
    for y in ys {
        blend(frame, x0, y, color, 1.0);
        blend(frame, x1, y, color, 1.0);
    }
}

/// Intersect the half-open spans `x0..x1` and `y0..y1` with the frame.
fn visible(frame: &Frame, x0: i64, x1: i64, y0: i64, y1: i64) -> (Range<i64>, Range<i64>) {
    let (width, height) = (frame.width() as i64, frame.height() as i64);
    (x0.clamp(0, width)..x1.clamp(0, width), y0.clamp(0, height)..y1.clamp(0, height))
}

/// Source-over blend of `color` scaled by `coverage` into one pixel.
fn blend(frame: &mut Frame, x: i64, y: i64, color: SerializableColor, coverage: f32) {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return;
    }
    let alpha = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = frame.get_pixel_mut(x as u32, y as u32);
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    let src = [color.r, color.g, color.b];
    for channel in 0..3 {
        let value = (src[channel] as f32 * alpha + dst[channel] as f32 * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Encode a frame as an 8-bit RGBA PNG.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, png::EncodingError> {
    let mut data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut data, frame.width(), frame.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(frame.as_raw())?;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::super::fonts::test_support::mono_book;
    use super::*;
    use kurbo::Point;
    use std::time::{Duration, Instant};

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    #[test]
    fn test_empty_scene_is_transparent() {
        let doc = SceneDocument::new(4, 4);
        let frame = rasterize(&doc, &mut ImageCache::default(), &FontBook::new(), None);
        assert_eq!(frame.dimensions(), (4, 4));
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_background_is_stretched_over_surface() {
        let mut doc = SceneDocument::new(8, 4);
        let image = BackgroundImage::new(&[], 2, 2, crate::shapes::ImageFormat::Png).fill(8.0, 4.0);
        let mut cache = ImageCache::default();
        cache.insert(image.id(), solid(2, 2, [0, 255, 0, 255]));
        doc.push(SceneObject::Image(image));

        let frame = rasterize(&doc, &mut cache, &FontBook::new(), None);
        assert_eq!(frame.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(frame.get_pixel(7, 3).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_underline_drawn_without_font() {
        let mut doc = SceneDocument::new(100, 40);
        let mut text = TextObject::new(Point::new(10.0, 5.0), "abc".to_string())
            .with_fill(SerializableColor::new(255, 0, 0, 255));
        text.underline = true;
        doc.push(SceneObject::Text(text));

        let frame = rasterize(&doc, &mut ImageCache::default(), &FontBook::new(), None);
        // baseline = 5 + 16, underline starts 2px below it
        assert_eq!(frame.get_pixel(12, 23).0, [255, 0, 0, 255]);
        assert_eq!(frame.get_pixel(5, 23).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_selection_overlay() {
        let doc = SceneDocument::new(20, 20);
        let overlay = SelectionOverlay {
            bounds: Rect::new(5.0, 5.0, 10.0, 10.0),
            color: SerializableColor::new(59, 130, 246, 255),
        };
        let frame = rasterize(&doc, &mut ImageCache::default(), &FontBook::new(), Some(overlay));
        assert_eq!(frame.get_pixel(3, 3).0, [59, 130, 246, 255]);
        assert_eq!(frame.get_pixel(7, 7).0, [0, 0, 0, 0]);
    }

    fn text_frame(text: TextObject, fonts: &FontBook, width: u32, height: u32) -> Frame {
        let mut doc = SceneDocument::new(width, height);
        doc.push(SceneObject::Text(text));
        rasterize(&doc, &mut ImageCache::default(), fonts, None)
    }

    fn inked(frame: &Frame) -> usize {
        frame.pixels().filter(|p| p[3] > 0).count()
    }

    fn mono(content: &str, position: Point) -> TextObject {
        TextObject::new(position, content.to_string()).with_font_family("Mono")
    }

    #[test]
    fn test_glyphs_drawn_with_font() {
        let fonts = mono_book();
        let frame = text_frame(mono("A", Point::new(2.0, 2.0)), &fonts, 40, 30);
        assert!(inked(&frame) > 20);
        assert!(text_frame(mono("A", Point::new(2.0, 2.0)), &FontBook::new(), 40, 30)
            .pixels()
            .all(|p| p[3] == 0));
    }

    #[test]
    fn test_bold_covers_more_than_regular() {
        let fonts = mono_book();
        let regular = inked(&text_frame(mono("Hi", Point::new(2.0, 2.0)), &fonts, 60, 30));
        let mut bold_text = mono("Hi", Point::new(2.0, 2.0));
        bold_text.weight = crate::shapes::FontWeight::Bold;
        let bold = inked(&text_frame(bold_text, &fonts, 60, 30));
        assert!(bold > regular, "bold {bold} regular {regular}");
    }

    #[test]
    fn test_italic_shears_glyphs() {
        let fonts = mono_book();
        let upright = text_frame(mono("l", Point::new(10.0, 2.0)), &fonts, 40, 30);
        let mut slanted = mono("l", Point::new(10.0, 2.0));
        slanted.style = crate::shapes::FontStyle::Italic;
        let italic = text_frame(slanted, &fonts, 40, 30);
        assert_ne!(upright, italic);
    }

    #[test]
    fn test_underline_width_follows_font_metrics() {
        let fonts = mono_book();
        let mut text = mono("MMMMMMMMMM", Point::ZERO);
        text.underline = true;
        let frame = text_frame(text, &fonts, 200, 40);
        // baseline at ascent 15.95, underline row 18, width 103.44
        assert_eq!(frame.get_pixel(101, 18).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(106, 18).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_offscreen_glyphs_are_skipped() {
        let fonts = mono_book();
        let frame = text_frame(mono("Hello", Point::new(-500.0, -500.0)), &fonts, 40, 30);
        assert_eq!(inked(&frame), 0);
    }

    #[test]
    fn test_huge_text_renders_quickly() {
        let started = Instant::now();

        let mut plain = TextObject::new(Point::new(-10.0, -150_000.0), "Hello".to_string());
        plain.font_size = 200_000.0;
        plain.underline = true;
        let mut doc = SceneDocument::new(80, 60);
        doc.push(SceneObject::Text(plain));
        let overlay = SelectionOverlay {
            bounds: Rect::new(-10.0, -150_000.0, 500_000.0, 100_000.0),
            color: SerializableColor::new(59, 130, 246, 255),
        };
        let frame = rasterize(&doc, &mut ImageCache::default(), &FontBook::new(), Some(overlay));
        assert_eq!(frame.dimensions(), (80, 60));

        let fonts = mono_book();
        let mut glyphs = mono("Hello", Point::new(0.0, 0.0));
        glyphs.font_size = 50_000.0;
        glyphs.underline = true;
        text_frame(glyphs, &fonts, 80, 60);

        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    }

    #[test]
    fn test_blend_half_coverage_over_opaque() {
        let mut frame = Frame::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        blend(&mut frame, 0, 0, SerializableColor::black(), 0.5);
        let px = frame.get_pixel(0, 0).0;
        assert_eq!(px[3], 255);
        assert!((127..=128).contains(&px[0]));
    }

    #[test]
    fn test_encode_png_dimensions() {
        let frame = Frame::new(3, 2);
        let data = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }
}
