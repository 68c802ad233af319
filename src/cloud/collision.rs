use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::util::fallback_direction;

use super::graph::Node;

const MAX_BACKTRACK_STEPS: usize = 8;
const EJECT_GAP: f32 = 0.5;

/// Screen-space extent of a rendered token label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Box of a label drawn centred horizontally on `position` with its
    /// baseline at `position.y`.
    pub fn anchored(position: Pos2, size: Vec2) -> Self {
        let left = position.x - size.x * 0.5;
        let top = position.y - size.y;
        Self::new(left, top, left + size.x, top + size.y)
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
    }

    pub fn to_rect(self) -> Rect {
        Rect::from_min_max(pos2(self.x1, self.y1), pos2(self.x2, self.y2))
    }

    pub fn width(self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(self) -> f32 {
        self.y2 - self.y1
    }

    pub fn origin(self) -> Pos2 {
        pos2(self.x1, self.y1)
    }

    pub fn translate(self, delta: Vec2) -> Self {
        Self {
            x1: self.x1 + delta.x,
            y1: self.y1 + delta.y,
            x2: self.x2 + delta.x,
            y2: self.y2 + delta.y,
        }
    }

    pub fn overlap_area(self, other: Self) -> f32 {
        let width = self.x2.min(other.x2) - self.x1.max(other.x1);
        let height = self.y2.min(other.y2) - self.y1.max(other.y1);
        if width > 0.0 && height > 0.0 {
            width * height
        } else {
            0.0
        }
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BoundingBox", 6)?;
        state.serialize_field("x1", &self.x1)?;
        state.serialize_field("y1", &self.y1)?;
        state.serialize_field("x2", &self.x2)?;
        state.serialize_field("y2", &self.y2)?;
        state.serialize_field("width", &self.width())?;
        state.serialize_field("height", &self.height())?;
        state.end()
    }
}

/// Index pairs of boxes with a positive intersection area, found with a
/// sort-and-sweep along x.
pub fn overlapping_pairs(boxes: &[BoundingBox]) -> Vec<(usize, usize)> {
    let mut order = (0..boxes.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| boxes[a].x1.total_cmp(&boxes[b].x1));

    let mut pairs = Vec::new();
    for (position, &first) in order.iter().enumerate() {
        for &second in &order[position + 1..] {
            if boxes[second].x1 >= boxes[first].x2 {
                break;
            }
            if boxes[first].overlap_area(boxes[second]) > 0.0 {
                pairs.push((first.min(second), first.max(second)));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

pub fn total_overlap_area(boxes: &[BoundingBox]) -> f32 {
    overlapping_pairs(boxes)
        .into_iter()
        .map(|(a, b)| boxes[a].overlap_area(boxes[b]))
        .sum()
}

/// A label de-overlap pass run once per tick after the physics step.
pub trait CollisionStrategy {
    /// Moves token nodes apart and returns how many overlapping pairs were
    /// acted on. Nodes without a bounding box are skipped.
    fn resolve(&self, nodes: &mut [Node]) -> usize;

    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct NoCollision;

impl CollisionStrategy for NoCollision {
    fn resolve(&self, _nodes: &mut [Node]) -> usize {
        0
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Pushes each overlapping pair apart along the line between the box
/// origins. The push is proportional to the overlap depth: `strength` is the
/// share of the remaining overlap cleared per pass, `1.0` separating an
/// isolated pair completely.
///
/// A pass is only applied when it lowers the summed pairwise overlap area;
/// otherwise the step is halved, then single pairs are tried on their own,
/// and as a last resort one box is moved past all others on its cheapest
/// side.
pub struct BoxSeparation {
    strength: f32,
}

impl BoxSeparation {
    pub fn new(strength: f32) -> Self {
        Self {
            strength: strength.clamp(f32::EPSILON, 1.0),
        }
    }

    fn push(&self, first: (usize, BoundingBox), second: (usize, BoundingBox)) -> Vec2 {
        let (first_key, a) = first;
        let (second_key, b) = second;

        let delta = a.origin() - b.origin();
        let direction = if delta.length_sq() > 1e-8 {
            delta.normalized()
        } else {
            fallback_direction(first_key, second_key)
        };

        // Per axis: relative travel after which the overlap starts shrinking,
        // and travel that clears it entirely.
        let (start_x, clear_x) = if direction.x >= 0.0 {
            ((b.x2 - a.x2).max(0.0), b.x2 - a.x1)
        } else {
            ((a.x2 - b.x2).max(0.0), a.x2 - b.x1)
        };
        let (start_y, clear_y) = if direction.y >= 0.0 {
            ((b.y2 - a.y2).max(0.0), b.y2 - a.y1)
        } else {
            ((a.y2 - b.y2).max(0.0), a.y2 - b.y1)
        };

        let mut travel = f32::INFINITY;
        for (component, start, clear) in [
            (direction.x, start_x, clear_x),
            (direction.y, start_y, clear_y),
        ] {
            if component.abs() > 1e-6 {
                let needed = start + self.strength * (clear - start);
                travel = travel.min(needed / component.abs());
            }
        }
        if !travel.is_finite() || travel <= 0.0 {
            return Vec2::ZERO;
        }

        direction * (travel * 0.5)
    }
}

fn overlap_after(boxes: &[BoundingBox], shifts: &[Vec2], scale: f32) -> f32 {
    let moved = boxes
        .iter()
        .zip(shifts)
        .map(|(bounding_box, shift)| bounding_box.translate(*shift * scale))
        .collect::<Vec<_>>();
    total_overlap_area(&moved)
}

/// Smallest axis-aligned shift that puts `boxes[index]` beyond every other
/// box on one side.
fn eject(boxes: &[BoundingBox], index: usize) -> Vec2 {
    let this = boxes[index];
    let mut left = f32::INFINITY;
    let mut right = f32::NEG_INFINITY;
    let mut top = f32::INFINITY;
    let mut bottom = f32::NEG_INFINITY;
    for (other_index, other) in boxes.iter().enumerate() {
        if other_index == index {
            continue;
        }
        left = left.min(other.x1);
        right = right.max(other.x2);
        top = top.min(other.y1);
        bottom = bottom.max(other.y2);
    }

    [
        vec2(left - this.x2 - EJECT_GAP, 0.0),
        vec2(right - this.x1 + EJECT_GAP, 0.0),
        vec2(0.0, top - this.y2 - EJECT_GAP),
        vec2(0.0, bottom - this.y1 + EJECT_GAP),
    ]
    .into_iter()
    .filter(|shift| shift.is_finite())
    .min_by(|a, b| a.length_sq().total_cmp(&b.length_sq()))
    .unwrap_or(Vec2::ZERO)
}

fn apply_shifts(nodes: &mut [Node], measured: &[(usize, BoundingBox)], shifts: &[Vec2], scale: f32) {
    for (&(node_index, _), shift) in measured.iter().zip(shifts) {
        if *shift == Vec2::ZERO {
            continue;
        }
        if let Some(token) = nodes[node_index].as_token_mut() {
            token.move_by(*shift * scale);
        }
    }
}

impl CollisionStrategy for BoxSeparation {
    fn resolve(&self, nodes: &mut [Node]) -> usize {
        let measured = nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                node.as_token()
                    .and_then(|token| token.bounding_box)
                    .map(|bounding_box| (index, bounding_box))
            })
            .collect::<Vec<_>>();
        if measured.len() < 2 {
            return 0;
        }

        let boxes = measured.iter().map(|(_, bounding_box)| *bounding_box).collect::<Vec<_>>();
        let pairs = overlapping_pairs(&boxes);
        if pairs.is_empty() {
            return 0;
        }
        let before = total_overlap_area(&boxes);

        let mut shifts = vec![Vec2::ZERO; boxes.len()];
        for &(a, b) in &pairs {
            let push = self.push(measured[a], measured[b]);
            shifts[a] += push;
            shifts[b] -= push;
        }

        let mut scale = 1.0;
        for _ in 0..MAX_BACKTRACK_STEPS {
            if overlap_after(&boxes, &shifts, scale) < before {
                apply_shifts(nodes, &measured, &shifts, scale);
                return pairs.len();
            }
            scale *= 0.5;
        }

        for &(a, b) in &pairs {
            let push = self.push(measured[a], measured[b]);
            shifts.fill(Vec2::ZERO);
            shifts[a] = push;
            shifts[b] = -push;
            if overlap_after(&boxes, &shifts, 1.0) < before {
                apply_shifts(nodes, &measured, &shifts, 1.0);
                return 1;
            }
        }

        let mut crowded = pairs.iter().flat_map(|&(a, b)| [a, b]).collect::<Vec<_>>();
        crowded.sort_unstable();
        crowded.dedup();
        let cheapest = crowded
            .into_iter()
            .map(|index| (index, eject(&boxes, index)))
            .min_by(|(_, a), (_, b)| a.length_sq().total_cmp(&b.length_sq()));
        if let Some((index, shift)) = cheapest {
            shifts.fill(Vec2::ZERO);
            shifts[index] = shift;
            if overlap_after(&boxes, &shifts, 1.0) < before {
                apply_shifts(nodes, &measured, &shifts, 1.0);
                return 1;
            }
        }

        tracing::trace!(pairs = pairs.len(), "collision pass found no improving move");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::graph::{DocumentNode, TokenNode};

    fn token(name: &str, bounding_box: Option<BoundingBox>) -> Node {
        let position = bounding_box
            .map(|bounding_box| pos2(bounding_box.x1 + bounding_box.width() * 0.5, bounding_box.y2))
            .unwrap_or(pos2(0.0, 0.0));
        Node::Token(TokenNode {
            token: name.to_owned(),
            position,
            velocity: Vec2::ZERO,
            bounding_box,
        })
    }

    fn boxes_of(nodes: &[Node]) -> Vec<BoundingBox> {
        nodes.iter().filter_map(Node::bounding_box).collect()
    }

    #[test]
    fn anchored_box_matches_label_geometry() {
        let bounding_box = BoundingBox::anchored(pos2(100.0, 50.0), vec2(40.0, 12.0));
        assert_eq!(bounding_box, BoundingBox::new(80.0, 38.0, 120.0, 50.0));
        assert_eq!(bounding_box.width(), 40.0);
        assert_eq!(bounding_box.height(), 12.0);
    }

    #[test]
    fn overlap_requires_positive_area() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let touching = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        let crossing = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.overlap_area(touching), 0.0);
        assert_eq!(a.overlap_area(crossing), 25.0);
        assert_eq!(overlapping_pairs(&[a, touching, crossing]), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn separates_a_pair_and_moves_boxes_with_nodes() {
        let mut nodes = vec![
            token("left", Some(BoundingBox::new(0.0, 0.0, 40.0, 12.0))),
            token("right", Some(BoundingBox::new(30.0, 4.0, 70.0, 16.0))),
        ];
        let before = total_overlap_area(&boxes_of(&nodes));
        let start = nodes[0].position();

        let resolved = BoxSeparation::new(1.0).resolve(&mut nodes);

        assert_eq!(resolved, 1);
        let after = total_overlap_area(&boxes_of(&nodes));
        assert!(after < before);
        assert!(after < 1e-3);

        let moved = nodes[0].position() - start;
        let token = nodes[0].as_token().unwrap();
        let box_shift = token.bounding_box.unwrap().origin() - pos2(0.0, 0.0);
        assert!((moved - box_shift).length() < 1e-4);
        assert!(moved.x < 0.0);
    }

    #[test]
    fn coincident_and_nested_boxes_still_separate() {
        let same = BoundingBox::new(10.0, 10.0, 50.0, 22.0);
        let mut nodes = vec![token("a", Some(same)), token("b", Some(same))];
        let before = total_overlap_area(&boxes_of(&nodes));
        BoxSeparation::new(1.0).resolve(&mut nodes);
        assert!(total_overlap_area(&boxes_of(&nodes)) < before);

        let outer = BoundingBox::new(0.0, 0.0, 100.0, 20.0);
        let inner = BoundingBox::new(40.0, 5.0, 50.0, 15.0);
        let mut nodes = vec![token("outer", Some(outer)), token("inner", Some(inner))];
        let before = total_overlap_area(&boxes_of(&nodes));
        BoxSeparation::new(0.5).resolve(&mut nodes);
        assert!(total_overlap_area(&boxes_of(&nodes)) < before);
    }

    #[test]
    fn crowded_row_overlap_decreases() {
        let mut nodes = (0..5)
            .map(|index| {
                let x = index as f32 * 18.0;
                token(
                    &format!("t{index}"),
                    Some(BoundingBox::new(x, index as f32, x + 30.0, index as f32 + 12.0)),
                )
            })
            .collect::<Vec<_>>();
        let before = total_overlap_area(&boxes_of(&nodes));
        assert!(before > 0.0);

        assert!(BoxSeparation::new(1.0).resolve(&mut nodes) > 0);
        assert!(total_overlap_area(&boxes_of(&nodes)) < before);
    }

    #[test]
    fn eject_clears_every_other_box() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            BoundingBox::new(10.0, 10.0, 30.0, 20.0),
            BoundingBox::new(60.0, 70.0, 90.0, 95.0),
        ];
        let shift = eject(&boxes, 1);
        let moved = boxes[1].translate(shift);
        assert_eq!(moved.overlap_area(boxes[0]), 0.0);
        assert_eq!(moved.overlap_area(boxes[2]), 0.0);
        assert_eq!(shift, vec2(0.0, -20.5));
    }

    #[test]
    fn documents_and_unmeasured_tokens_are_left_alone() {
        let anchor = Node::Document(DocumentNode {
            id: "d".to_owned(),
            name: "d".to_owned(),
            center: pos2(20.0, 10.0),
        });
        let mut nodes = vec![
            anchor.clone(),
            token("measured", Some(BoundingBox::new(0.0, 0.0, 40.0, 20.0))),
            token("pending", None),
        ];
        let pending_before = nodes[2].clone();

        assert_eq!(BoxSeparation::new(1.0).resolve(&mut nodes), 0);
        assert_eq!(nodes[0], anchor);
        assert_eq!(nodes[2], pending_before);
    }

    #[test]
    fn disabled_strategy_is_a_no_op() {
        let overlapping = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let mut nodes = vec![token("a", Some(overlapping)), token("b", Some(overlapping))];
        let snapshot = nodes.clone();
        assert!(!NoCollision.is_enabled());
        assert_eq!(NoCollision.resolve(&mut nodes), 0);
        assert_eq!(nodes, snapshot);
    }
}
