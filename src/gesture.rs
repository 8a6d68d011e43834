//! Touch swipe classification for the media viewer.

use serde::{Deserialize, Serialize};

/// Minimum travel, in pixels, for a touch to count as a swipe.
pub const SWIPE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
    Tap,
}

/// What the viewer does for a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Delete,
    Favorite,
    Previous,
    Next,
    ToggleControls,
}

/// Classify a touch from `start` to `end`. The axis with the larger travel decides;
/// moving the finger leftwards is `Left`, upwards is `Up`.
pub fn classify_swipe(start: Point, end: Point) -> SwipeDirection {
    let dx = start.x - end.x;
    let dy = start.y - end.y;
    if dx.abs() > dy.abs() {
        if dx > SWIPE_THRESHOLD {
            SwipeDirection::Left
        } else if dx < -SWIPE_THRESHOLD {
            SwipeDirection::Right
        } else {
            SwipeDirection::Tap
        }
    } else if dy > SWIPE_THRESHOLD {
        SwipeDirection::Up
    } else if dy < -SWIPE_THRESHOLD {
        SwipeDirection::Down
    } else {
        SwipeDirection::Tap
    }
}

impl SwipeDirection {
    pub fn action(self) -> SwipeAction {
        match self {
            SwipeDirection::Left => SwipeAction::Delete,
            SwipeDirection::Right => SwipeAction::Favorite,
            SwipeDirection::Up => SwipeAction::Previous,
            SwipeDirection::Down => SwipeAction::Next,
            SwipeDirection::Tap => SwipeAction::ToggleControls,
        }
    }
}
