//! Coordinate transformation logic for pan/zoom
//!
//! This module contains pure coordinate transformation logic that can be
//! easily unit tested without a running egui context.
//!
//! View coordinates are measured in screen points from the top-left corner
//! of the viewport. Image coordinates are pixels of the base image with
//! x = column, y = row and the origin at the top-left. At zoom 1 with no pan
//! one image pixel covers one screen point and the two systems coincide.

use egui::{Pos2, Rect, Vec2};

/// Zoom step multiplier for zoom in/out operations (wheel notches, buttons, keyboard)
pub const ZOOM_STEP: f32 = 1.25;

/// Pixel-precise wheel deltas per notch (the 120-unit angle-delta convention)
pub const RAW_UNITS_PER_DETENT: f32 = 120.0;

/// Line or page deltas per notch
pub const LINES_PER_DETENT: f32 = 1.0;

/// View transformation state for pan and zoom
#[derive(Clone, Debug)]
pub struct ViewTransform {
    /// Zoom level: 1.0 = one image pixel per screen point
    pub zoom: f32,
    /// Offset of the image origin from the viewport origin, in screen points
    pub pan_offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    /// Create a new transform at zoom 1 with no pan
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset zoom and pan
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_offset = Vec2::ZERO;
    }

    /// Set zoom back to 1, keeping the pan offset
    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    /// Check if transform is at default state (for showing/hiding reset button)
    pub fn is_default(&self) -> bool {
        (self.zoom - 1.0).abs() < 0.001 && self.pan_offset.length() < 0.5
    }

    /// Zoom in by one step, keeping `anchor` (view coordinates) fixed
    pub fn zoom_in(&mut self, anchor: Pos2) {
        self.zoom_around_point(ZOOM_STEP, anchor);
    }

    /// Zoom out by one step, keeping `anchor` (view coordinates) fixed
    pub fn zoom_out(&mut self, anchor: Pos2) {
        self.zoom_around_point(1.0 / ZOOM_STEP, anchor);
    }

    /// Apply a zoom factor while keeping the image point under `anchor` in place.
    ///
    /// A view point v shows image point (v - pan) / zoom. Keeping that fixed
    /// across a zoom change by ratio r gives:
    ///   pan_new = v * (1 - r) + pan_old * r
    ///
    /// The zoom factor is only kept inside the finite, positive f32 range.
    pub fn zoom_around_point(&mut self, zoom_delta: f32, anchor: Pos2) {
        if zoom_delta == 1.0 || !zoom_delta.is_finite() || zoom_delta <= 0.0 {
            return;
        }

        let old_zoom = self.zoom;
        let new_zoom = (old_zoom * zoom_delta).clamp(f32::MIN_POSITIVE, f32::MAX);
        if new_zoom == old_zoom {
            return;
        }

        let zoom_ratio = new_zoom / old_zoom;
        let v = anchor.to_vec2();
        self.pan_offset = v * (1.0 - zoom_ratio) + self.pan_offset * zoom_ratio;
        self.zoom = new_zoom;
    }

    /// Apply a pan delta (in screen coordinates)
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan_offset += delta;
    }

    /// Where the image is drawn, in screen coordinates, for a viewport rect
    pub fn calculate_image_rect(&self, viewport_rect: Rect, image_size: Vec2) -> Rect {
        Rect::from_min_size(viewport_rect.min + self.pan_offset, image_size * self.zoom)
    }

    /// Convert a view position to image coordinates (unclamped, fractional)
    pub fn view_to_image(&self, view_pos: Pos2) -> Pos2 {
        ((view_pos.to_vec2() - self.pan_offset) / self.zoom).to_pos2()
    }

    /// Convert image coordinates to a view position
    pub fn image_to_view(&self, image_pos: Pos2) -> Pos2 {
        (image_pos.to_vec2() * self.zoom + self.pan_offset).to_pos2()
    }

    /// Integer pixel under a view position, if it lies inside the image
    pub fn view_to_pixel(&self, view_pos: Pos2, image_size: (u32, u32)) -> Option<(u32, u32)> {
        let p = self.view_to_image(view_pos);
        let (x, y) = (p.x.floor(), p.y.floor());
        if x >= 0.0 && y >= 0.0 && x < image_size.0 as f32 && y < image_size.1 as f32 {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }
}

/// Turns raw wheel deltas into whole notches, carrying the remainder
#[derive(Clone, Debug)]
pub struct WheelAccumulator {
    units_per_detent: f32,
    remainder: f32,
}

impl WheelAccumulator {
    pub fn new(units_per_detent: f32) -> Self {
        Self {
            units_per_detent,
            remainder: 0.0,
        }
    }

    /// Add a raw delta and return the number of complete notches (signed)
    pub fn push(&mut self, delta: f32) -> i32 {
        if !delta.is_finite() || delta == 0.0 {
            return 0;
        }
        // a direction change discards the partial notch
        if self.remainder != 0.0 && self.remainder.signum() != delta.signum() {
            self.remainder = 0.0;
        }
        self.remainder += delta / self.units_per_detent;
        let detents = self.remainder.trunc();
        self.remainder -= detents;
        detents as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transform() {
        let t = ViewTransform::new();
        assert!((t.zoom - 1.0).abs() < 0.001);
        assert!(t.pan_offset.length() < 0.001);
        assert!(t.is_default());
    }

    #[test]
    fn test_reset() {
        let mut t = ViewTransform::new();
        t.zoom = 2.5;
        t.pan_offset = Vec2::new(100.0, 50.0);
        assert!(!t.is_default());

        t.reset();
        assert!(t.is_default());
    }

    #[test]
    fn test_reset_zoom_keeps_pan() {
        let mut t = ViewTransform::new();
        t.zoom_in(Pos2::new(40.0, 40.0));
        t.pan_by(Vec2::new(7.0, -3.0));
        let pan = t.pan_offset;

        t.reset_zoom();
        assert_eq!(t.zoom, 1.0);
        assert_eq!(t.pan_offset, pan);
    }

    #[test]
    fn test_zoom_in_out() {
        let mut t = ViewTransform::new();
        let center = Pos2::new(400.0, 300.0);

        t.zoom_in(center);
        assert!((t.zoom - ZOOM_STEP).abs() < 0.001);

        t.zoom_out(center);
        assert!((t.zoom - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_zoom_round_trip() {
        let anchor = Pos2::new(123.0, 45.0);
        for n in [1, 5, 20, 60] {
            let mut t = ViewTransform::new();
            for _ in 0..n {
                t.zoom_in(anchor);
            }
            for _ in 0..n {
                t.zoom_out(anchor);
            }
            assert!((t.zoom - 1.0).abs() < 1e-3, "zoom after {n} in/out = {}", t.zoom);

            for _ in 0..n {
                t.zoom_out(anchor);
            }
            for _ in 0..n {
                t.zoom_in(anchor);
            }
            assert!((t.zoom - 1.0).abs() < 1e-3, "zoom after {n} out/in = {}", t.zoom);
        }
    }

    #[test]
    fn test_zoom_is_unbounded() {
        let mut t = ViewTransform::new();
        let origin = Pos2::ZERO;
        for _ in 0..40 {
            t.zoom_in(origin);
        }
        assert!(t.zoom > 1000.0);

        t.reset();
        for _ in 0..40 {
            t.zoom_out(origin);
        }
        assert!(t.zoom < 0.001);
        assert!(t.zoom > 0.0);
    }

    #[test]
    fn test_zoom_stays_positive() {
        let mut t = ViewTransform::new();
        for _ in 0..2000 {
            t.zoom_out(Pos2::ZERO);
        }
        assert!(t.zoom > 0.0);
    }

    #[test]
    fn test_zoom_around_point_preserves_anchor() {
        let mut t = ViewTransform::new();
        t.pan_offset = Vec2::new(50.0, 30.0);
        let anchor = Pos2::new(200.0, 150.0);

        let before = t.view_to_image(anchor);
        t.zoom_around_point(2.0, anchor);
        let after = t.view_to_image(anchor);

        assert!((before.x - after.x).abs() < 0.01);
        assert!((before.y - after.y).abs() < 0.01);
        assert!((t.zoom - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_pan_by() {
        let mut t = ViewTransform::new();
        t.pan_by(Vec2::new(10.0, 20.0));
        assert!((t.pan_offset.x - 10.0).abs() < 0.001);
        assert!((t.pan_offset.y - 20.0).abs() < 0.001);

        t.pan_by(Vec2::new(-5.0, -10.0));
        assert!((t.pan_offset.x - 5.0).abs() < 0.001);
        assert!((t.pan_offset.y - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_identity_mapping() {
        let t = ViewTransform::new();
        let p = t.view_to_image(Pos2::new(10.0, 20.0));
        assert_eq!(p, Pos2::new(10.0, 20.0));
    }

    #[test]
    fn test_view_to_image_with_zoom_and_pan() {
        let mut t = ViewTransform::new();
        t.zoom = 2.0;
        t.pan_offset = Vec2::new(100.0, 50.0);

        let p = t.view_to_image(Pos2::new(120.0, 90.0));
        assert!((p.x - 10.0).abs() < 0.001);
        assert!((p.y - 20.0).abs() < 0.001);

        let back = t.image_to_view(p);
        assert!((back.x - 120.0).abs() < 0.001);
        assert!((back.y - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_view_to_image_outside_is_reported() {
        let t = ViewTransform::new();
        let p = t.view_to_image(Pos2::new(-5.0, 500.0));
        assert_eq!(p, Pos2::new(-5.0, 500.0));
        assert_eq!(t.view_to_pixel(Pos2::new(-5.0, 500.0), (100, 100)), None);
    }

    #[test]
    fn test_view_to_pixel_boundaries() {
        let mut t = ViewTransform::new();
        t.zoom = 4.0;
        assert_eq!(t.view_to_pixel(Pos2::new(0.0, 0.0), (10, 10)), Some((0, 0)));
        assert_eq!(t.view_to_pixel(Pos2::new(39.9, 3.9), (10, 10)), Some((9, 0)));
        assert_eq!(t.view_to_pixel(Pos2::new(40.0, 0.0), (10, 10)), None);
    }

    #[test]
    fn test_calculate_image_rect() {
        let mut t = ViewTransform::new();
        let viewport = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(800.0, 600.0));
        let image_size = Vec2::new(400.0, 300.0);

        let rect = t.calculate_image_rect(viewport, image_size);
        assert_eq!(rect.min, Pos2::new(10.0, 20.0));
        assert!((rect.width() - 400.0).abs() < 0.01);

        t.zoom = 2.0;
        t.pan_offset = Vec2::new(-30.0, 5.0);
        let rect = t.calculate_image_rect(viewport, image_size);
        assert_eq!(rect.min, Pos2::new(-20.0, 25.0));
        assert!((rect.width() - 800.0).abs() < 0.01);
        assert!((rect.height() - 600.0).abs() < 0.01);
    }

    #[test]
    fn test_wheel_accumulator_whole_notches() {
        let mut wheel = WheelAccumulator::new(RAW_UNITS_PER_DETENT);
        assert_eq!(wheel.push(120.0), 1);
        assert_eq!(wheel.push(-240.0), -2);
        assert_eq!(wheel.push(0.0), 0);
    }

    #[test]
    fn test_wheel_accumulator_lines() {
        let mut wheel = WheelAccumulator::new(LINES_PER_DETENT);
        assert_eq!(wheel.push(1.0), 1);
        assert_eq!(wheel.push(3.0), 3);
        assert_eq!(wheel.push(0.5), 0);
        assert_eq!(wheel.push(0.5), 1);
    }

    #[test]
    fn test_wheel_accumulator_carries_remainder() {
        let mut wheel = WheelAccumulator::new(RAW_UNITS_PER_DETENT);
        assert_eq!(wheel.push(50.0), 0);
        assert_eq!(wheel.push(50.0), 0);
        assert_eq!(wheel.push(50.0), 1);
        // direction change drops the partial notch
        assert_eq!(wheel.push(-100.0), 0);
        assert_eq!(wheel.push(-30.0), -1);
    }
}
