//! Core types for the construction environment.
//!
//! Defines integer grid coordinates and the discrete action set shared by
//! the resolver, the policies and the observation layout.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An integer voxel coordinate.
///
/// `y` is the vertical axis (0 = ground level); `x` and `z` span the
/// horizontal plane. Coordinates are signed so that offsets and unsanitized
/// external input can be represented before bounds checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    /// Creates a new coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Origin coordinate (0, 0, 0).
    pub const fn origin() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns true if every component lies in `[0, size)`.
    pub fn in_bounds(&self, size: usize) -> bool {
        let n = size as i64;
        [self.x, self.y, self.z]
            .iter()
            .all(|&c| (c as i64) >= 0 && (c as i64) < n)
    }

    /// Returns a copy with every component clamped into `[0, size)`.
    ///
    /// `size` must be non-zero.
    pub fn clamped(self, size: usize) -> Self {
        let hi = size.saturating_sub(1).min(i32::MAX as usize) as i32;
        Self::new(self.x.clamp(0, hi), self.y.clamp(0, hi), self.z.clamp(0, hi))
    }

    /// Component-wise translation.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The cell directly below this one.
    pub fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Squared Euclidean distance to another coordinate.
    pub fn distance_sq(&self, other: &Coord) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Normalizes the coordinate to `[0, 1)` given the grid size.
    pub fn normalized(&self, size: usize) -> [f64; 3] {
        let n = size as f64;
        [self.x as f64 / n, self.y as f64 / n, self.z as f64 / n]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The eight discrete agent actions.
///
/// The numeric codes are part of the policy interface and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Action {
    /// Code 0: step towards −x.
    Forward,
    /// Code 1: step towards +z.
    Right,
    /// Code 2: step towards +x.
    Backward,
    /// Code 3: step towards −z.
    Left,
    /// Code 4: climb one cell (requires ground level or support below).
    Up,
    /// Code 5: descend one cell.
    Down,
    /// Code 6: drop the carried block into the current cell.
    Place,
    /// Code 7: take a block while standing in an empty cell.
    Pickup,
}

impl Action {
    /// Number of distinct actions.
    pub const COUNT: usize = 8;

    /// Returns all actions in code order.
    pub fn all() -> [Action; Self::COUNT] {
        [
            Action::Forward,
            Action::Right,
            Action::Backward,
            Action::Left,
            Action::Up,
            Action::Down,
            Action::Place,
            Action::Pickup,
        ]
    }

    /// Decodes a policy action code. Codes outside `0..8` yield `None`.
    pub fn from_code(code: usize) -> Option<Action> {
        Self::all().get(code).copied()
    }

    /// Returns the numeric action code.
    pub fn code(&self) -> usize {
        match self {
            Action::Forward => 0,
            Action::Right => 1,
            Action::Backward => 2,
            Action::Left => 3,
            Action::Up => 4,
            Action::Down => 5,
            Action::Place => 6,
            Action::Pickup => 7,
        }
    }

    /// Displacement `(dx, dy, dz)` for movement actions, `None` for block actions.
    pub fn displacement(&self) -> Option<(i32, i32, i32)> {
        match self {
            Action::Forward => Some((-1, 0, 0)),
            Action::Right => Some((0, 0, 1)),
            Action::Backward => Some((1, 0, 0)),
            Action::Left => Some((0, 0, -1)),
            Action::Up => Some((0, 1, 0)),
            Action::Down => Some((0, -1, 0)),
            Action::Place | Action::Pickup => None,
        }
    }

    /// True for the four horizontal movement actions.
    pub fn is_horizontal(&self) -> bool {
        matches!(
            self,
            Action::Forward | Action::Right | Action::Backward | Action::Left
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Forward => "forward",
            Action::Right => "right",
            Action::Backward => "backward",
            Action::Left => "left",
            Action::Up => "up",
            Action::Down => "down",
            Action::Place => "place",
            Action::Pickup => "pickup",
        };
        f.write_str(name)
    }
}

impl TryFrom<usize> for Action {
    type Error = crate::error::EnvError;

    fn try_from(code: usize) -> Result<Self, Self::Error> {
        Action::from_code(code).ok_or(crate::error::EnvError::InvalidActionCode(code))
    }
}
