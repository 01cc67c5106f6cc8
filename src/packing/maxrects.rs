use super::{PackingHeuristic, Rect};

/// MaxRects bin packer.
///
/// Placement depends only on the sequence of inserted sizes: free rectangles
/// live in a `Vec` and ties keep the earliest candidate, so the same inserts
/// always produce the same layout.
pub struct MaxRectsPacker {
    bin_width: u32,
    bin_height: u32,
    free_rects: Vec<Rect>,
    used_rects: Vec<Rect>,
}

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bin_width: width,
            bin_height: height,
            free_rects: vec![Rect::new(0, 0, width, height)],
            used_rects: Vec::new(),
        }
    }

    /// Try to insert a rectangle with the given dimensions.
    /// Returns the placed rectangle if successful
    pub fn insert(&mut self, width: u32, height: u32, heuristic: PackingHeuristic) -> Option<Rect> {
        if width == 0 || height == 0 {
            return None;
        }
        let best_rect = self.find_position(width, height, heuristic)?;
        self.place_rect(best_rect);
        Some(best_rect)
    }

    pub fn can_fit(&self, width: u32, height: u32) -> bool {
        self.free_rects
            .iter()
            .any(|r| width <= r.width && height <= r.height)
    }

    pub fn used_rects(&self) -> &[Rect] {
        &self.used_rects
    }

    fn find_position(&self, width: u32, height: u32, heuristic: PackingHeuristic) -> Option<Rect> {
        let mut best_score = (i64::MAX, i64::MAX);
        let mut best_rect = None;

        for free_rect in &self.free_rects {
            if width <= free_rect.width && height <= free_rect.height {
                let candidate = Rect::new(free_rect.x, free_rect.y, width, height);
                let score = self.score_rect(free_rect, &candidate, heuristic);
                if score < best_score {
                    best_score = score;
                    best_rect = Some(candidate);
                }
            }
        }

        best_rect
    }

    fn score_rect(
        &self,
        free_rect: &Rect,
        candidate: &Rect,
        heuristic: PackingHeuristic,
    ) -> (i64, i64) {
        let leftover_h = i64::from(free_rect.width - candidate.width);
        let leftover_v = i64::from(free_rect.height - candidate.height);
        let short = leftover_h.min(leftover_v);
        let long = leftover_h.max(leftover_v);

        match heuristic {
            PackingHeuristic::BestShortSideFit | PackingHeuristic::Best => (short, long),
            PackingHeuristic::BestLongSideFit => (long, short),
            PackingHeuristic::BestAreaFit => {
                let waste = free_rect.area().saturating_sub(candidate.area());
                let waste = i64::try_from(waste).unwrap_or(i64::MAX);
                (waste, short)
            }
            PackingHeuristic::BottomLeft => {
                (i64::from(candidate.bottom()), i64::from(candidate.x))
            }
            PackingHeuristic::ContactPoint => {
                // Higher contact is better; negate so the minimum wins
                let contact = i64::try_from(self.contact_score(candidate)).unwrap_or(i64::MAX);
                (-contact, i64::from(candidate.bottom()))
            }
        }
    }

    /// Total edge length the candidate shares with the bin border and placed rects
    fn contact_score(&self, candidate: &Rect) -> u64 {
        let mut score = 0u64;

        if candidate.x == 0 || candidate.right() == self.bin_width {
            score += u64::from(candidate.height);
        }
        if candidate.y == 0 || candidate.bottom() == self.bin_height {
            score += u64::from(candidate.width);
        }

        for used in &self.used_rects {
            if used.x == candidate.right() || used.right() == candidate.x {
                score += u64::from(Rect::span_overlap(
                    candidate.y,
                    candidate.bottom(),
                    used.y,
                    used.bottom(),
                ));
            }
            if used.y == candidate.bottom() || used.bottom() == candidate.y {
                score += u64::from(Rect::span_overlap(
                    candidate.x,
                    candidate.right(),
                    used.x,
                    used.right(),
                ));
            }
        }

        score
    }

    fn place_rect(&mut self, rect: Rect) {
        let mut new_rects = Vec::new();

        self.free_rects.retain(|free_rect| {
            if !rect.intersects(free_rect) {
                return true;
            }

            // Left of the placed rect
            if rect.x > free_rect.x {
                new_rects.push(Rect::new(
                    free_rect.x,
                    free_rect.y,
                    rect.x - free_rect.x,
                    free_rect.height,
                ));
            }

            // Right
            if rect.right() < free_rect.right() {
                new_rects.push(Rect::new(
                    rect.right(),
                    free_rect.y,
                    free_rect.right() - rect.right(),
                    free_rect.height,
                ));
            }

            // Above
            if rect.y > free_rect.y {
                new_rects.push(Rect::new(
                    free_rect.x,
                    free_rect.y,
                    free_rect.width,
                    rect.y - free_rect.y,
                ));
            }

            // Below
            if rect.bottom() < free_rect.bottom() {
                new_rects.push(Rect::new(
                    free_rect.x,
                    rect.bottom(),
                    free_rect.width,
                    free_rect.bottom() - rect.bottom(),
                ));
            }

            false
        });

        self.free_rects.extend(new_rects);
        self.prune_free_rects();
        self.used_rects.push(rect);
    }

    /// Drop free rectangles fully covered by another free rectangle
    fn prune_free_rects(&mut self) {
        let mut i = 0;
        while i < self.free_rects.len() {
            let mut j = i + 1;
            let mut removed_i = false;
            while j < self.free_rects.len() {
                if self.free_rects[i].contains(&self.free_rects[j]) {
                    self.free_rects.remove(j);
                } else if self.free_rects[j].contains(&self.free_rects[i]) {
                    self.free_rects.remove(i);
                    removed_i = true;
                    break;
                } else {
                    j += 1;
                }
            }
            if !removed_i {
                i += 1;
            }
        }
    }

    /// Fraction of the bin covered by placed rectangles (0.0 to 1.0)
    pub fn occupancy(&self) -> f64 {
        let total_area = u64::from(self.bin_width) * u64::from(self.bin_height);
        if total_area == 0 {
            return 0.0;
        }
        let used_area: u64 = self.used_rects.iter().map(Rect::area).sum();
        used_area as f64 / total_area as f64
    }
}
