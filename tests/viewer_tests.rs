//! # Viewer Tests
//!
//! Command sequences and rendering of the document view.

mod test_helpers;

#[cfg(test)]
mod tests {
    use crate::test_helpers::square_canvas;
    use image::Rgb;
    use scanprep::viewer::{render_view, PanTracker, MAX_ZOOM};
    use scanprep::{ViewerCommand, ViewerState};

    #[test]
    fn test_command_sequence() {
        let commands = [
            ViewerCommand::NextPage,
            ViewerCommand::ZoomIn,
            ViewerCommand::ZoomIn,
            ViewerCommand::RotateRight,
            ViewerCommand::MarkProcessed,
        ];
        let state = commands
            .iter()
            .fold(ViewerState::with_pages(3), |state, command| state.apply(*command));

        assert_eq!(state.page, 1);
        assert!((state.zoom - 1.21).abs() < 1e-4);
        assert_eq!(state.rotation, 90);
        assert!(state.processed);
        assert!(state.zoom <= MAX_ZOOM);
    }

    #[test]
    fn test_single_page_document_stays_on_first_page() {
        let state = ViewerState::default().apply(ViewerCommand::NextPage);
        assert_eq!(state.page, 0);
    }

    #[test]
    fn test_render_zoom_changes_size() {
        let state = ViewerState {
            zoom: 0.5,
            ..Default::default()
        };
        let view = render_view(&square_canvas(), &state);
        assert_eq!((view.width(), view.height()), (250, 150));
    }

    #[test]
    fn test_render_rotation_keeps_size_and_black_corners() {
        let state = ViewerState::default().apply(ViewerCommand::RotateRight);
        let view = render_view(&square_canvas(), &state).to_rgb8();
        assert_eq!(view.dimensions(), (500, 300));
        // 90 degrees on a wide frame leaves the left and right edges uncovered
        assert_eq!(*view.get_pixel(5, 150), Rgb([0, 0, 0]));
        assert_eq!(*view.get_pixel(494, 150), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_pan_shifts_content() {
        let mut tracker = PanTracker::default();
        assert!(tracker.update((0.0, 0.0)).is_none());
        let pan = tracker.update((0.5, 0.2)).unwrap();
        let state = ViewerState::default().apply(pan);

        let view = render_view(&square_canvas(), &state).to_rgb8();
        // The square at (100..200, 100..200) moves by (50, 20)
        assert_eq!(*view.get_pixel(150, 120), Rgb([255, 255, 255]));
        assert_eq!(*view.get_pixel(240, 210), Rgb([255, 255, 255]));
        assert_eq!(*view.get_pixel(120, 110), Rgb([0, 0, 0]));
    }
}
