use avatar_viewer::context::{MouseButtonState, MouseState};
use winit::{dpi::PhysicalPosition, event::MouseButton};

#[test]
fn no_pick_before_the_cursor_position_is_known() {
    let mut mouse = MouseState::default();

    assert_eq!(mouse.coords(), None);
    assert_eq!(mouse.press(MouseButton::Left), None);
    // the press still counts for dragging
    assert_eq!(mouse.pressed, MouseButtonState::Left);
}

#[test]
fn every_button_picks_at_the_cursor() {
    let at = PhysicalPosition::new(120.0, 80.0);
    for button in [MouseButton::Left, MouseButton::Right, MouseButton::Middle] {
        let mut mouse = MouseState::default();
        mouse.cursor_moved(at);

        assert_eq!(mouse.press(button), Some(at), "{:?}", button);
    }
}

#[test]
fn pressed_button_is_tracked_until_release() {
    let mut mouse = MouseState::default();
    mouse.press(MouseButton::Right);
    assert_eq!(mouse.pressed, MouseButtonState::Right);
    mouse.press(MouseButton::Middle);
    assert_eq!(mouse.pressed, MouseButtonState::Other);

    mouse.release();
    assert_eq!(mouse.pressed, MouseButtonState::None);
}

#[test]
fn only_a_left_drag_reports_movement() {
    let mut mouse = MouseState::default();
    assert_eq!(mouse.cursor_moved(PhysicalPosition::new(10.0, 10.0)), None);

    mouse.press(MouseButton::Left);
    assert_eq!(mouse.cursor_moved(PhysicalPosition::new(25.0, 4.0)), Some((15.0, -6.0)));

    mouse.release();
    mouse.press(MouseButton::Right);
    assert_eq!(mouse.cursor_moved(PhysicalPosition::new(40.0, 4.0)), None);
    assert_eq!(mouse.coords(), Some(PhysicalPosition::new(40.0, 4.0)));
}

#[test]
fn leaving_the_window_forgets_the_cursor() {
    let mut mouse = MouseState::default();
    mouse.cursor_moved(PhysicalPosition::new(10.0, 10.0));
    mouse.press(MouseButton::Left);

    mouse.cursor_left();

    assert_eq!(mouse.coords(), None);
    assert_eq!(mouse.pressed, MouseButtonState::None);
    assert_eq!(mouse.press(MouseButton::Left), None);
    // the first move after re-entering has no previous position to drag from
    assert_eq!(mouse.cursor_moved(PhysicalPosition::new(50.0, 50.0)), None);
}
