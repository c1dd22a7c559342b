/// Integer points on the segment from `start` to `end`, both endpoints included.
///
/// Works in every octant; consecutive points are 8-connected.
pub struct Bresenham {
    x: i32,
    y: i32,
    end_x: i32,
    end_y: i32,
    dx: i64,
    dy: i64,
    step_x: i32,
    step_y: i32,
    error: i64,
    done: bool,
}

impl Bresenham {
    #[inline]
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        let (x0, y0) = start;
        let (x1, y1) = end;
        // i64 so that endpoints anywhere in the i32 range cannot overflow
        let dx = (i64::from(x1) - i64::from(x0)).abs();
        let dy = -(i64::from(y1) - i64::from(y0)).abs();
        Self {
            x: x0,
            y: y0,
            end_x: x1,
            end_y: y1,
            dx,
            dy,
            step_x: if x0 < x1 { 1 } else { -1 },
            step_y: if y0 < y1 { 1 } else { -1 },
            error: dx + dy,
            done: false,
        }
    }
}

impl Iterator for Bresenham {
    type Item = (i32, i32);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let point = (self.x, self.y);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(point);
        }

        let e2 = 2 * self.error;
        if e2 >= self.dy {
            self.error += self.dy;
            self.x += self.step_x;
        }
        if e2 <= self.dx {
            self.error += self.dx;
            self.y += self.step_y;
        }
        Some(point)
    }
}
