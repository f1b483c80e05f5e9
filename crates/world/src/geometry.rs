use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_location_size(location: Vec2, size: Size) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Positive-area overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.max_x(), self.y),
            Vec2::new(self.max_x(), self.max_y()),
            Vec2::new(self.x, self.max_y()),
        ]
    }
}

/// A simple (non self-intersecting) polygon given by its vertices in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    vertices: Vec<Vec2>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn bounds(&self) -> Rect {
        let Some(first) = self.vertices.first() else {
            return Rect::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for vertex in &self.vertices[1..] {
            min_x = min_x.min(vertex.x);
            min_y = min_y.min(vertex.y);
            max_x = max_x.max(vertex.x);
            max_y = max_y.max(vertex.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Exact overlap test: clips the polygon against `rect` and checks the
    /// remaining area. Clipping runs in `f64` relative to the rect origin, so
    /// the result does not depend on how far from the world origin both sit.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        if self.vertices.len() < 3 || rect.is_empty() {
            return false;
        }
        let origin_x = f64::from(rect.x);
        let origin_y = f64::from(rect.y);
        let vertices = self
            .vertices
            .iter()
            .map(|vertex| Point {
                x: f64::from(vertex.x) - origin_x,
                y: f64::from(vertex.y) - origin_y,
            })
            .collect::<Vec<_>>();
        let width = f64::from(rect.max_x()) - origin_x;
        let height = f64::from(rect.max_y()) - origin_y;
        let clipped = clip_to_rect(vertices, width, height);

        let scale = clipped
            .iter()
            .fold(width.max(height), |scale, point| {
                scale.max(point.x.abs()).max(point.y.abs())
            });
        polygon_area(&clipped) > f64::EPSILON * scale * scale
    }
}

/// Query shapes accepted by spatial lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
    Circle { center: Vec2, radius: f32 },
}

impl Shape {
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rect(rect) => *rect,
            Shape::Polygon(polygon) => polygon.bounds(),
            Shape::Circle { center, radius } => Rect::new(
                center.x - radius,
                center.y - radius,
                radius * 2.0,
                radius * 2.0,
            ),
        }
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        match self {
            Shape::Rect(own) => own.intersects(rect),
            Shape::Polygon(polygon) => polygon.intersects_rect(rect),
            Shape::Circle { center, radius } => {
                if rect.is_empty() || *radius <= 0.0 {
                    return false;
                }
                let nearest_x = center.x.clamp(rect.min_x(), rect.max_x());
                let nearest_y = center.y.clamp(rect.min_y(), rect.max_y());
                let dx = center.x - nearest_x;
                let dy = center.y - nearest_y;
                dx * dx + dy * dy < radius * radius
            }
        }
    }
}

/// Open polyline in absolute world coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Path {
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Clone, Copy)]
enum ClipEdge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl ClipEdge {
    fn inside(self, point: Point) -> bool {
        match self {
            ClipEdge::Left(x) => point.x >= x,
            ClipEdge::Right(x) => point.x <= x,
            ClipEdge::Top(y) => point.y >= y,
            ClipEdge::Bottom(y) => point.y <= y,
        }
    }

    fn crossing(self, from: Point, to: Point) -> Point {
        match self {
            ClipEdge::Left(x) | ClipEdge::Right(x) => {
                let t = (x - from.x) / (to.x - from.x);
                Point {
                    x,
                    y: from.y + t * (to.y - from.y),
                }
            }
            ClipEdge::Top(y) | ClipEdge::Bottom(y) => {
                let t = (y - from.y) / (to.y - from.y);
                Point {
                    x: from.x + t * (to.x - from.x),
                    y,
                }
            }
        }
    }
}

/// Sutherland-Hodgman clip against the rect `[0, width] x [0, height]`.
fn clip_to_rect(vertices: Vec<Point>, width: f64, height: f64) -> Vec<Point> {
    let edges = [
        ClipEdge::Left(0.0),
        ClipEdge::Right(width),
        ClipEdge::Top(0.0),
        ClipEdge::Bottom(height),
    ];
    let mut output = vertices;
    for edge in edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut previous = input[input.len() - 1];
        for &current in &input {
            match (edge.inside(previous), edge.inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.push(edge.crossing(previous, current)),
                (false, true) => {
                    output.push(edge.crossing(previous, current));
                    output.push(current);
                }
                (false, false) => {}
            }
            previous = current;
        }
    }
    output
}

fn polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    let mut previous = vertices[vertices.len() - 1];
    for &current in vertices {
        twice_area += previous.x * current.y - current.x * previous.y;
        previous = current;
    }
    (twice_area / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Polygon {
        Polygon::new(vec![
            Vec2::new(x, y),
            Vec2::new(x + side, y),
            Vec2::new(x + side, y + side),
            Vec2::new(x, y + side),
        ])
    }

    #[test]
    fn rects_sharing_an_edge_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.5, 9.5, 1.0, 1.0)));
    }

    #[test]
    fn empty_rect_never_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&Rect::new(1.0, 1.0, 0.0, 5.0)));
    }

    #[test]
    fn polygon_bounds_cover_all_vertices() {
        let triangle = Polygon::new(vec![
            Vec2::new(2.0, 1.0),
            Vec2::new(8.0, 3.0),
            Vec2::new(4.0, 9.0),
        ]);
        assert_eq!(triangle.bounds(), Rect::new(2.0, 1.0, 6.0, 8.0));
    }

    #[test]
    fn square_polygon_matches_rect_semantics() {
        let query = square(0.0, 0.0, 10.0);
        let rect_query = Rect::new(0.0, 0.0, 10.0, 10.0);
        for candidate in [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, 10.0, 10.0),
            Rect::new(10.0, 0.0, 5.0, 5.0),
            Rect::new(-5.0, 3.0, 20.0, 2.0),
            Rect::new(20.0, 20.0, 1.0, 1.0),
        ] {
            assert_eq!(
                query.intersects_rect(&candidate),
                rect_query.intersects(&candidate),
                "candidate {candidate:?}"
            );
        }
    }

    #[test]
    fn triangle_misses_rect_inside_its_bounds() {
        let triangle = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
        ]);
        let corner = Rect::new(8.0, 8.0, 2.0, 2.0);
        assert!(triangle.bounds().intersects(&corner));
        assert!(!triangle.intersects_rect(&corner));
        assert!(triangle.intersects_rect(&Rect::new(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn circle_uses_nearest_point() {
        let circle = Shape::Circle {
            center: Vec2::new(0.0, 0.0),
            radius: 5.0,
        };
        assert!(circle.intersects_rect(&Rect::new(3.0, 3.0, 2.0, 2.0)));
        assert!(!circle.intersects_rect(&Rect::new(4.0, 4.0, 2.0, 2.0)));
        assert_eq!(circle.bounds(), Rect::new(-5.0, -5.0, 10.0, 10.0));
    }

    #[test]
    fn thin_overlap_counts_for_polygons_too() {
        let query = square(0.0, 0.0, 10.0);
        let sliver = Rect::new(9.995, 0.0, 1.0, 0.01);
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).intersects(&sliver));
        assert!(query.intersects_rect(&sliver));
    }

    #[test]
    fn polygon_agrees_with_rect_far_from_origin() {
        for base in [0.0_f32, 1_000.0, 4_000.0, 6_000.0, 100_000.0] {
            let rect_query = Rect::new(base, base, 16.0, 16.0);
            let query = square(base, base, 16.0);
            for candidate in [
                Rect::new(base + 15.5, base + 15.5, 16.0, 16.0),
                Rect::new(base + 16.0, base, 16.0, 16.0),
                Rect::new(base - 16.0, base - 16.0, 16.0, 16.0),
                Rect::new(base + 4.0, base + 4.0, 0.5, 0.5),
            ] {
                assert_eq!(
                    query.intersects_rect(&candidate),
                    rect_query.intersects(&candidate),
                    "base {base} candidate {candidate:?}"
                );
            }
        }
    }
}
