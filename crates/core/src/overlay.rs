//! Annotation overlay projection
//!
//! Turns the session's measurements (and any pending first click) into
//! screen-space drawing primitives. A pure projection of state: every
//! primitive is re-derived from surface coordinates through the viewport
//! transform on every call, so nothing here can go stale across zoom or pan.

use crate::geometry::ScreenPoint;
use crate::session::MeasurementSession;
use crate::viewport::{surface_to_screen, DisplayGeometry};

/// Role of a point marker, for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
    /// First click of a measurement still awaiting its second point.
    Pending,
}

/// One screen-space primitive for the rendering shell to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    Marker { at: ScreenPoint, kind: MarkerKind },
    Segment { from: ScreenPoint, to: ScreenPoint },
    Label { at: ScreenPoint, text: String },
}

/// Project the session's annotations into screen space.
pub fn overlay_primitives(
    session: &MeasurementSession,
    display: &DisplayGeometry,
) -> Vec<OverlayPrimitive> {
    let viewport = session.viewport();
    let mut primitives = Vec::new();

    for measurement in session.measurements() {
        let start = surface_to_screen(measurement.start(), viewport, display);
        let end = surface_to_screen(measurement.end(), viewport, display);
        let label_at =
            surface_to_screen(measurement.start().midpoint(&measurement.end()), viewport, display);

        primitives.push(OverlayPrimitive::Segment { from: start, to: end });
        primitives.push(OverlayPrimitive::Marker { at: start, kind: MarkerKind::Start });
        primitives.push(OverlayPrimitive::Marker { at: end, kind: MarkerKind::End });
        primitives.push(OverlayPrimitive::Label {
            at: label_at,
            text: measurement.formatted_distance(),
        });
    }

    if let Some(pending) = session.pending_start() {
        primitives.push(OverlayPrimitive::Marker {
            at: surface_to_screen(pending, viewport, display),
            kind: MarkerKind::Pending,
        });
    }

    primitives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SurfacePoint;
    use planscale_raster::{DrawingSurface, RgbaImage, SourceKind};

    fn session_with_measurement() -> MeasurementSession {
        let surface = DrawingSurface::from_raster(
            RgbaImage::from_pixel(1000, 800, image::Rgba([255, 255, 255, 255])),
            SourceKind::Image,
            1.0,
            25.4 / 96.0,
            "plan.png",
        )
        .expect("surface should build");

        let mut session = MeasurementSession::new();
        session.load_surface(surface);
        session.set_manual_scale(50.0, "1:50").unwrap();
        session.start_measuring().unwrap();
        session.pointer_down_surface(SurfacePoint::new(100.0, 100.0)).unwrap();
        session.pointer_down_surface(SurfacePoint::new(100.0, 200.0)).unwrap();
        session
    }

    #[test]
    fn one_measurement_projects_to_four_primitives() {
        let session = session_with_measurement();
        let display = DisplayGeometry::one_to_one(1000, 800);

        let primitives = overlay_primitives(&session, &display);
        assert_eq!(primitives.len(), 4);

        assert_eq!(
            primitives[0],
            OverlayPrimitive::Segment {
                from: ScreenPoint::new(100.0, 100.0),
                to: ScreenPoint::new(100.0, 200.0),
            }
        );
        assert!(primitives.contains(&OverlayPrimitive::Label {
            at: ScreenPoint::new(100.0, 150.0),
            text: "5000.00 mm".to_owned(),
        }));
    }

    #[test]
    fn primitives_track_zoom_changes() {
        let mut session = session_with_measurement();
        let display = DisplayGeometry::one_to_one(1000, 800);

        session.viewport_mut().set_zoom(2.0).unwrap();
        let primitives = overlay_primitives(&session, &display);

        // Re-derived, not cached: screen positions follow the new zoom.
        assert_eq!(
            primitives[0],
            OverlayPrimitive::Segment {
                from: ScreenPoint::new(200.0, 200.0),
                to: ScreenPoint::new(200.0, 400.0),
            }
        );
    }

    #[test]
    fn pending_point_gets_its_own_marker() {
        let mut session = session_with_measurement();
        session.start_measuring().unwrap();
        session.pointer_down_surface(SurfacePoint::new(10.0, 20.0)).unwrap();

        let display = DisplayGeometry::one_to_one(1000, 800);
        let primitives = overlay_primitives(&session, &display);

        assert!(primitives.contains(&OverlayPrimitive::Marker {
            at: ScreenPoint::new(10.0, 20.0),
            kind: MarkerKind::Pending,
        }));
    }

    #[test]
    fn empty_session_projects_nothing() {
        let session = MeasurementSession::new();
        let display = DisplayGeometry::one_to_one(100, 100);
        assert!(overlay_primitives(&session, &display).is_empty());
    }
}
