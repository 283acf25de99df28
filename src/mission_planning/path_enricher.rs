//! Turn-by-turn annotation of a merged route

use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::{Path2D, Point2D};
use crate::mission_planning::RouteLeg;

/// Bends sharper than this many degrees produce a turn instruction
pub const TURN_THRESHOLD_DEG: f64 = 45.0;

/// Navigation instruction attached to a path point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    #[serde(rename = "Turn left")]
    TurnLeft,
    #[serde(rename = "Turn right")]
    TurnRight,
    #[serde(rename = "You have arrived at your product")]
    Arrive,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::TurnLeft => write!(f, "Turn left"),
            Instruction::TurnRight => write!(f, "Turn right"),
            Instruction::Arrive => write!(f, "You have arrived at your product"),
        }
    }
}

/// Point of the route with its optional instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<Instruction>,
}

impl AnnotatedPoint {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Destination whose arrival should be marked on the route
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalTarget {
    pub item_id: u64,
    pub section_id: u64,
    pub target: Point2D,
}

/// Arrival is marked where the leg actually ended, which is the substituted
/// cell when the waypoint itself was blocked
impl From<&RouteLeg> for ArrivalTarget {
    fn from(leg: &RouteLeg) -> Self {
        ArrivalTarget {
            item_id: leg.waypoint.item_id,
            section_id: leg.waypoint.section_id,
            target: leg.reached().unwrap_or(leg.target),
        }
    }
}

/// Wrap an angle in degrees into (-180, 180]
pub fn normalize_degrees(mut angle: f64) -> f64 {
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Signed change of heading at `p2`, positive counter-clockwise
pub fn turn_angle(p1: &Point2D, p2: &Point2D, p3: &Point2D) -> f64 {
    let incoming = (p2.y - p1.y).atan2(p2.x - p1.x);
    let outgoing = (p3.y - p2.y).atan2(p3.x - p2.x);
    normalize_degrees((outgoing - incoming).to_degrees())
}

pub fn classify_turn(angle: f64) -> Option<Instruction> {
    if angle > TURN_THRESHOLD_DEG {
        Some(Instruction::TurnLeft)
    } else if angle < -TURN_THRESHOLD_DEG {
        Some(Instruction::TurnRight)
    } else {
        None
    }
}

/// Annotate `path` with turns at interior points and an arrival marker for
/// every target.
///
/// The arrival point of a target is the path point closest to it, the
/// earliest one on ties. Arrival replaces a turn at the same point.
pub fn annotate(path: &Path2D, targets: &[ArrivalTarget]) -> Vec<AnnotatedPoint> {
    let mut annotated: Vec<AnnotatedPoint> = path
        .points
        .iter()
        .map(|p| AnnotatedPoint { x: p.x, y: p.y, section_id: None, instruction: None })
        .collect();

    for (i, (p1, p2, p3)) in path.points.iter().tuple_windows().enumerate() {
        annotated[i + 1].instruction = classify_turn(turn_angle(p1, p2, p3));
    }

    for target in targets {
        let Some(index) = path
            .points
            .iter()
            .position_min_by_key(|p| OrderedFloat(p.distance(&target.target)))
        else {
            continue;
        };
        annotated[index].instruction = Some(Instruction::Arrive);
        annotated[index].section_id = Some(target.section_id);
    }

    annotated
}
