use std::f64::consts::PI;

use crate::domain::UserId;

/// Dimensions of the circular table, in layout units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableGeometry {
    pub table_diameter: f64,
    pub seat_size: f64,
}

impl Default for TableGeometry {
    fn default() -> Self {
        Self {
            table_diameter: 320.0,
            seat_size: 64.0,
        }
    }
}

impl TableGeometry {
    /// Distance from table center to a seat's center; seats sit just inside
    /// the rim.
    pub fn radius(&self) -> f64 {
        (self.table_diameter - self.seat_size) / 2.0
    }

    pub fn center(&self) -> (f64, f64) {
        let half = self.table_diameter / 2.0;
        (half, half)
    }
}

/// Top-left placement of an opponent's avatar.
#[derive(Clone, Debug, PartialEq)]
pub struct SeatAnchor {
    pub player_id: UserId,
    /// Radians; seat 0 is at `-π/2` (top center).
    pub angle: f64,
    pub x: f64,
    pub y: f64,
}

/// Lay out `opponents` evenly around the table. The local player is never
/// part of this list and is rendered separately.
pub fn seat_anchors(opponents: &[UserId], geometry: &TableGeometry) -> Vec<SeatAnchor> {
    let n = opponents.len();
    if n == 0 {
        return Vec::new();
    }
    let radius = geometry.radius();
    let (cx, cy) = geometry.center();
    let half_seat = geometry.seat_size / 2.0;

    opponents
        .iter()
        .enumerate()
        .map(|(i, player_id)| {
            let angle = 2.0 * PI * (i as f64) / (n as f64) - PI / 2.0;
            SeatAnchor {
                player_id: player_id.clone(),
                angle,
                x: cx + radius * angle.cos() - half_seat,
                y: cy + radius * angle.sin() - half_seat,
            }
        })
        .collect()
}

/// Everyone in `order` except `me`, keeping turn order.
pub fn opponents_of(order: &[UserId], me: Option<&UserId>) -> Vec<UserId> {
    order
        .iter()
        .filter(|id| Some(*id) != me)
        .cloned()
        .collect()
}
