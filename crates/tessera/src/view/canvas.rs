use crate::driver::ConsoleDriver;
use crate::geometry::{Point, Rect, Size};
use unicode_width::UnicodeWidthChar;

/// Drawing surface for one view.
///
/// Coordinates are view-local. Output is translated to the screen and
/// clipped to the view's visible area; a wide glyph that does not fit
/// entirely inside the clip is dropped.
pub struct Canvas<'a> {
    driver: &'a mut dyn ConsoleDriver,
    /// Screen position of the view's origin
    origin: Point,
    /// Visible area in screen coordinates
    clip: Rect,
    size: Size,
}

impl<'a> Canvas<'a> {
    pub fn new(driver: &'a mut dyn ConsoleDriver, frame: Rect, clip: Rect) -> Self {
        Self {
            driver,
            origin: frame.location(),
            clip: clip.intersect(&frame),
            size: frame.size(),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Visible part of the view, view-local
    pub fn visible_area(&self) -> Rect {
        self.clip
            .with_location(Point::new(self.clip.x - self.origin.x, self.clip.y - self.origin.y))
    }

    pub fn put_str(&mut self, at: Point, text: &str) {
        let y = self.origin.y + at.y;
        if y < self.clip.y || y >= self.clip.bottom() {
            return;
        }

        let mut x = self.origin.x + at.x;
        let mut run = String::new();
        let mut run_start = x;
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0) as i32;
            if width == 0 {
                continue;
            }
            let fits = x >= self.clip.x && x + width <= self.clip.right();
            if fits {
                if run.is_empty() {
                    run_start = x;
                }
                run.push(ch);
            } else if !run.is_empty() {
                self.driver.write_str(Point::new(run_start, y), &run);
                run.clear();
            }
            x += width;
        }
        if !run.is_empty() {
            self.driver.write_str(Point::new(run_start, y), &run);
        }
    }

    /// Fill `area` (view-local) with `ch`
    pub fn fill(&mut self, area: Rect, ch: char) {
        let line: String = std::iter::repeat(ch).take(usize::from(area.width)).collect();
        for dy in 0..i32::from(area.height) {
            self.put_str(Point::new(area.x, area.y + dy), &line);
        }
    }

    pub fn clear(&mut self) {
        let area = Rect::from_size(self.size);
        self.fill(area, ' ');
    }
}
