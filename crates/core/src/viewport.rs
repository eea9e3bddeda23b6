//! Viewport transform
//!
//! Converts between screen coordinates and surface coordinates. The displayed
//! surface is first scaled to fit the available display region, then the
//! user-controlled zoom multiplier and pan offset are applied on top. Both
//! conversions are pure and exact inverses of one another.

use crate::geometry::{ScreenPoint, SurfacePoint};

/// Multiplicative step applied by discrete zoom-in/zoom-out controls.
pub const ZOOM_STEP: f32 = 1.2;

/// Zoom clamp range, expressed as multiples of the fitted size.
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum ViewportError {
    #[error("invalid zoom factor {0}: must be finite and > 0")]
    InvalidZoom(f32),
}

/// Live zoom/pan state for the current drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    zoom: f32,
    origin_px: SurfacePoint,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { zoom: 1.0, origin_px: SurfacePoint::new(0.0, 0.0) }
    }
}

impl ViewportState {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Surface coordinate currently aligned to the viewport's top-left.
    pub fn origin_px(&self) -> SurfacePoint {
        self.origin_px
    }

    /// Multiply the current zoom by `factor`.
    ///
    /// Zero, negative, and non-finite factors are rejected rather than
    /// clamped: a zoom of zero would make the inverse transform divide by
    /// zero. The result is clamped to the sane display range.
    pub fn set_zoom(&mut self, factor: f32) -> Result<(), ViewportError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewportError::InvalidZoom(factor));
        }

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(())
    }

    pub fn zoom_in(&mut self) {
        // Step factor is a positive constant, so this cannot fail.
        let _ = self.set_zoom(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        let _ = self.set_zoom(1.0 / ZOOM_STEP);
    }

    pub fn pan_to(&mut self, origin_px: SurfacePoint) {
        self.origin_px = origin_px;
    }

    /// Reset to the fitted view of a freshly loaded surface.
    pub fn reset_for_surface(&mut self) {
        *self = Self::default();
    }
}

/// Static geometry of the display region and the surface shown in it.
///
/// Supplies the fit-to-viewport base scale that zoom multiplies. Kept apart
/// from [`ViewportState`] so resizing the rendering surface never mutates
/// zoom/pan state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    viewport_width_px: f32,
    viewport_height_px: f32,
    surface_width_px: f32,
    surface_height_px: f32,
}

impl DisplayGeometry {
    pub fn new(
        viewport_width_px: f32,
        viewport_height_px: f32,
        surface_width_px: u32,
        surface_height_px: u32,
    ) -> Self {
        Self {
            viewport_width_px: viewport_width_px.max(1.0),
            viewport_height_px: viewport_height_px.max(1.0),
            surface_width_px: surface_width_px.max(1) as f32,
            surface_height_px: surface_height_px.max(1) as f32,
        }
    }

    /// Identity display: one screen pixel per surface pixel at zoom 1.
    pub fn one_to_one(surface_width_px: u32, surface_height_px: u32) -> Self {
        Self::new(
            surface_width_px.max(1) as f32,
            surface_height_px.max(1) as f32,
            surface_width_px,
            surface_height_px,
        )
    }

    /// Fit-to-viewport base scale: the smaller of the width and height
    /// ratios, so the whole surface is visible at zoom 1.
    pub fn base_scale(&self) -> f32 {
        let width = self.viewport_width_px / self.surface_width_px;
        let height = self.viewport_height_px / self.surface_height_px;
        width.min(height)
    }
}

/// Convert a screen point to surface coordinates.
pub fn screen_to_surface(
    screen: ScreenPoint,
    viewport: &ViewportState,
    display: &DisplayGeometry,
) -> SurfacePoint {
    let scale = display.base_scale() * viewport.zoom();
    let origin = viewport.origin_px();

    SurfacePoint::new(screen.x / scale + origin.x, screen.y / scale + origin.y)
}

/// Convert a surface point to screen coordinates. Inverse of
/// [`screen_to_surface`].
pub fn surface_to_screen(
    surface: SurfacePoint,
    viewport: &ViewportState,
    display: &DisplayGeometry,
) -> ScreenPoint {
    let scale = display.base_scale() * viewport.zoom();
    let origin = viewport.origin_px();

    ScreenPoint::new((surface.x - origin.x) * scale, (surface.y - origin.y) * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn round_trip_is_identity_across_states() {
        let display = DisplayGeometry::new(900.0, 700.0, 1000, 800);

        let mut viewport = ViewportState::default();
        let states = [
            viewport,
            {
                viewport.set_zoom(2.5).unwrap();
                viewport.pan_to(SurfacePoint::new(120.0, -40.0));
                viewport
            },
            {
                viewport.set_zoom(0.2).unwrap();
                viewport
            },
        ];

        for state in states {
            for screen in [
                ScreenPoint::new(0.0, 0.0),
                ScreenPoint::new(450.0, 350.0),
                ScreenPoint::new(899.0, 1.0),
            ] {
                let surface = screen_to_surface(screen, &state, &display);
                let back = surface_to_screen(surface, &state, &display);
                assert_close(back.x, screen.x);
                assert_close(back.y, screen.y);
            }
        }
    }

    #[test]
    fn fit_scale_uses_smaller_dimension_ratio() {
        let display = DisplayGeometry::new(1000.0, 800.0, 500, 2000);
        assert_close(display.base_scale(), 0.4);
    }

    #[test]
    fn identity_display_maps_one_to_one() {
        let display = DisplayGeometry::one_to_one(1000, 800);
        let viewport = ViewportState::default();

        let surface = screen_to_surface(ScreenPoint::new(100.0, 200.0), &viewport, &display);
        assert_close(surface.x, 100.0);
        assert_close(surface.y, 200.0);
    }

    #[test]
    fn set_zoom_rejects_invalid_factors() {
        let mut viewport = ViewportState::default();

        assert!(matches!(viewport.set_zoom(0.0), Err(ViewportError::InvalidZoom(_))));
        assert!(matches!(viewport.set_zoom(-1.2), Err(ViewportError::InvalidZoom(_))));
        assert!(matches!(viewport.set_zoom(f32::NAN), Err(ViewportError::InvalidZoom(_))));
        assert!(matches!(
            viewport.set_zoom(f32::INFINITY),
            Err(ViewportError::InvalidZoom(_))
        ));

        // Rejected calls leave the prior zoom untouched.
        assert_eq!(viewport.zoom(), 1.0);
    }

    #[test]
    fn zoom_clamps_to_display_range() {
        let mut viewport = ViewportState::default();

        viewport.set_zoom(1000.0).unwrap();
        assert_eq!(viewport.zoom(), 16.0);

        viewport.set_zoom(1e-6).unwrap();
        assert_eq!(viewport.zoom(), 0.1);
    }

    #[test]
    fn zoom_steps_multiply_and_divide() {
        let mut viewport = ViewportState::default();

        viewport.zoom_in();
        assert!((viewport.zoom() - ZOOM_STEP).abs() < 1e-6);

        viewport.zoom_out();
        assert!((viewport.zoom() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pan_shifts_the_visible_origin() {
        let display = DisplayGeometry::one_to_one(1000, 800);
        let mut viewport = ViewportState::default();
        viewport.pan_to(SurfacePoint::new(50.0, 60.0));

        let surface = screen_to_surface(ScreenPoint::new(0.0, 0.0), &viewport, &display);
        assert_close(surface.x, 50.0);
        assert_close(surface.y, 60.0);
    }

    #[test]
    fn reset_restores_fitted_view() {
        let mut viewport = ViewportState::default();
        viewport.set_zoom(3.0).unwrap();
        viewport.pan_to(SurfacePoint::new(10.0, 10.0));

        viewport.reset_for_surface();
        assert_eq!(viewport, ViewportState::default());
    }
}
