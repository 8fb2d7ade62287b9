//! Word cloud layout: ranked words in, non-overlapping boxes out.
//!
//! Words are placed one at a time, most frequent first. Each word gets a font
//! size from its count, a box estimated from its character count, and the first
//! free slot along an Archimedean spiral that starts at the canvas center.
//! Words that find no slot are left out and reported, never fatal.
//!
//! The engine only computes geometry; painting glyphs is up to the caller.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{ExplorerError, Result};

/// Axis-aligned box in canvas pixels. `(x, y)` is the top-left corner and y
/// grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the interiors overlap. Boxes that only share an edge do not.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn within(&self, width: f64, height: f64) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Horizontal,
    Vertical,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Horizontal => 0,
            Rotation::Vertical => 90,
        }
    }

    fn other(self) -> Rotation {
        match self {
            Rotation::Horizontal => Rotation::Vertical,
            Rotation::Vertical => Rotation::Horizontal,
        }
    }
}

/// Maps a count to a font size, linear in `count / max_count`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FontScale {
    pub min_size: f64,
    pub max_size: f64,
}

impl FontScale {
    /// Whole-pixel size in `[min_size, max_size]`, never decreasing in `count`.
    pub fn size_for(&self, count: usize, max_count: usize) -> f64 {
        let ratio = if max_count == 0 {
            0.0
        } else {
            (count as f64 / max_count as f64).clamp(0.0, 1.0)
        };
        let size = self.min_size + (self.max_size - self.min_size) * ratio;
        size.round().clamp(self.min_size, self.max_size)
    }
}

impl Default for FontScale {
    fn default() -> Self {
        FontScale {
            min_size: 4.0,
            max_size: 80.0,
        }
    }
}

/// Glyph size estimate relative to the font size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphMetrics {
    /// Average advance width of one character.
    pub advance_ratio: f64,
    pub line_height_ratio: f64,
}

impl GlyphMetrics {
    /// Horizontal box size (width, height) in whole pixels.
    pub fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
        let chars = text.chars().count() as f64;
        (
            (chars * self.advance_ratio * font_size).ceil(),
            (self.line_height_ratio * font_size).ceil(),
        )
    }
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        GlyphMetrics {
            advance_ratio: 0.6,
            line_height_ratio: 1.2,
        }
    }
}

/// Archimedean spiral `r = growth * theta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpiralParams {
    /// Radians between consecutive candidates.
    pub angle_step: f64,
    /// Pixels of radius gained per radian.
    pub growth: f64,
    /// Hard cap on candidates per word and orientation.
    pub max_iterations: usize,
}

impl Default for SpiralParams {
    fn default() -> Self {
        SpiralParams {
            angle_step: 0.1,
            growth: 0.5,
            max_iterations: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub font: FontScale,
    pub glyphs: GlyphMetrics,
    pub spiral: SpiralParams,
    /// Only the `max_words` most frequent words are considered.
    pub max_words: usize,
    pub allow_rotation: bool,
    /// Chance of trying horizontal first; only consulted when `seed` is set.
    pub prefer_horizontal: f64,
    /// Shuffles equal-count words and orientation preference reproducibly.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            width: 800,
            height: 400,
            font: FontScale::default(),
            glyphs: GlyphMetrics::default(),
            spiral: SpiralParams::default(),
            max_words: 200,
            allow_rotation: true,
            prefer_horizontal: 0.9,
            seed: None,
        }
    }
}

impl LayoutConfig {
    /// Largest accepted canvas side in pixels.
    pub const MAX_CANVAS_SIDE: u32 = 16_384;

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ExplorerError::config(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > Self::MAX_CANVAS_SIDE || self.height > Self::MAX_CANVAS_SIDE {
            return Err(ExplorerError::config(format!(
                "canvas sides must not exceed {} px, got {}x{}",
                Self::MAX_CANVAS_SIDE,
                self.width,
                self.height
            )));
        }
        let font = &self.font;
        if !(font.min_size > 0.0 && font.min_size <= font.max_size && font.max_size.is_finite()) {
            return Err(ExplorerError::config(format!(
                "font sizes must satisfy 0 < min <= max, got {}..{}",
                font.min_size, font.max_size
            )));
        }
        if !(self.glyphs.advance_ratio > 0.0 && self.glyphs.line_height_ratio > 0.0) {
            return Err(ExplorerError::config("glyph metrics must be positive"));
        }
        let spiral = &self.spiral;
        if !(spiral.angle_step > 0.0 && spiral.growth > 0.0 && spiral.max_iterations > 0) {
            return Err(ExplorerError::config(
                "spiral angle step, growth and iteration cap must be positive",
            ));
        }
        if self.max_words == 0 {
            return Err(ExplorerError::config("max words must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.prefer_horizontal) {
            return Err(ExplorerError::config(
                "prefer-horizontal must lie between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub text: String,
    pub count: usize,
    pub font_size: f64,
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub bbox: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OmitReason {
    /// The box is larger than the canvas in every allowed orientation.
    TooLarge,
    /// The spiral ran out before a free slot turned up.
    NoSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmittedWord {
    pub text: String,
    pub count: usize,
    pub font_size: f64,
    pub reason: OmitReason,
}

/// A completed layout. Words are listed in placement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub words: Vec<PlacedWord>,
    pub omitted: Vec<OmittedWord>,
}

/// Uniform grid over the canvas. Each cell lists the placed boxes touching it,
/// so a collision query only inspects boxes near the candidate.
struct OccupancyGrid {
    cell: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
    boxes: Vec<Rect>,
}

impl OccupancyGrid {
    const CELL_SIZE: f64 = 16.0;

    fn new(width: u32, height: u32) -> Self {
        let cols = (width as f64 / Self::CELL_SIZE).ceil().max(1.0) as usize;
        let rows = (height as f64 / Self::CELL_SIZE).ceil().max(1.0) as usize;
        OccupancyGrid {
            cell: Self::CELL_SIZE,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            boxes: Vec::new(),
        }
    }

    // Cells covering [x, right) x [y, bottom). The rect must be on the canvas.
    fn span(&self, r: &Rect) -> (usize, usize, usize, usize) {
        let last = |v: f64, n: usize| ((v / self.cell).ceil() as usize).clamp(1, n) - 1;
        let first = |v: f64, n: usize| ((v / self.cell).floor() as usize).min(n - 1);
        (
            first(r.x, self.cols),
            last(r.right(), self.cols),
            first(r.y, self.rows),
            last(r.bottom(), self.rows),
        )
    }

    fn is_free(&self, r: &Rect) -> bool {
        let (c0, c1, r0, r1) = self.span(r);
        (r0..=r1).all(|row| {
            (c0..=c1).all(|col| {
                self.cells[row * self.cols + col]
                    .iter()
                    .all(|&i| !self.boxes[i].intersects(r))
            })
        })
    }

    fn insert(&mut self, r: Rect) {
        let idx = self.boxes.len();
        let (c0, c1, r0, r1) = self.span(&r);
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.cells[row * self.cols + col].push(idx);
            }
        }
        self.boxes.push(r);
    }
}

/// Places ranked words on a canvas. Cheap to clone; each call to
/// [`LayoutEngine::layout`] is an independent run.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    /// Fails fast on invalid configuration.
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(LayoutEngine { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `words` (token, count). Entries with a zero count are ignored.
    pub fn layout(&self, words: &[(String, usize)]) -> Layout {
        let cfg = &self.config;
        let (width, height) = (cfg.width as f64, cfg.height as f64);

        let mut ranked: Vec<&(String, usize)> = words.iter().filter(|(_, c)| *c > 0).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(cfg.max_words);

        let mut rng = cfg.seed.map(StdRng::seed_from_u64);
        if let Some(rng) = rng.as_mut() {
            for group in ranked.chunk_by_mut(|a, b| a.1 == b.1) {
                group.shuffle(rng);
            }
        }

        let max_count = ranked.first().map_or(0, |(_, c)| *c);
        let mut grid = OccupancyGrid::new(cfg.width, cfg.height);
        let mut placed = Vec::new();
        let mut omitted = Vec::new();

        for (text, count) in ranked {
            let font_size = cfg.font.size_for(*count, max_count);
            let (w, h) = cfg.glyphs.measure(text, font_size);

            let vertical_first = match rng.as_mut() {
                Some(rng) if cfg.allow_rotation => !rng.random_bool(cfg.prefer_horizontal),
                _ => false,
            };
            let first = if vertical_first {
                Rotation::Vertical
            } else {
                Rotation::Horizontal
            };
            let mut orientations = vec![first];
            if cfg.allow_rotation {
                orientations.push(first.other());
            }
            orientations.retain(|rot| {
                let (bw, bh) = oriented(w, h, *rot);
                bw <= width && bh <= height
            });

            if orientations.is_empty() {
                debug!("'{text}' ({w}x{h} at size {font_size}) exceeds the canvas");
                omitted.push(OmittedWord {
                    text: text.clone(),
                    count: *count,
                    font_size,
                    reason: OmitReason::TooLarge,
                });
                continue;
            }

            let spot = orientations.iter().find_map(|rot| {
                let (bw, bh) = oriented(w, h, *rot);
                self.spiral_search(&grid, bw, bh).map(|bbox| (*rot, bbox))
            });

            match spot {
                Some((rotation, bbox)) => {
                    grid.insert(bbox);
                    placed.push(PlacedWord {
                        text: text.clone(),
                        count: *count,
                        font_size,
                        x: bbox.x,
                        y: bbox.y,
                        rotation,
                        bbox,
                    });
                }
                None => omitted.push(OmittedWord {
                    text: text.clone(),
                    count: *count,
                    font_size,
                    reason: OmitReason::NoSpace,
                }),
            }
        }

        info!(
            "Placed {} words on a {}x{} canvas",
            placed.len(),
            cfg.width,
            cfg.height
        );
        if !omitted.is_empty() {
            warn!("{} words did not fit and were left out", omitted.len());
        }

        Layout {
            width: cfg.width,
            height: cfg.height,
            words: placed,
            omitted,
        }
    }

    /// First free `w` x `h` box along the spiral, centered on the spiral point.
    fn spiral_search(&self, grid: &OccupancyGrid, w: f64, h: f64) -> Option<Rect> {
        let cfg = &self.config;
        let (width, height) = (cfg.width as f64, cfg.height as f64);
        let (cx, cy) = (width / 2.0, height / 2.0);
        let max_radius = width.hypot(height) / 2.0;

        for i in 0..cfg.spiral.max_iterations {
            let theta = i as f64 * cfg.spiral.angle_step;
            let r = cfg.spiral.growth * theta;
            if r > max_radius {
                break;
            }
            let candidate = Rect {
                x: (cx + r * theta.cos() - w / 2.0).round(),
                y: (cy + r * theta.sin() - h / 2.0).round(),
                width: w,
                height: h,
            };
            if candidate.within(width, height) && grid.is_free(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

fn oriented(w: f64, h: f64, rotation: Rotation) -> (f64, f64) {
    match rotation {
        Rotation::Horizontal => (w, h),
        Rotation::Vertical => (h, w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> Vec<(String, usize)> {
        (0..n).map(|i| (format!("word{i}"), n - i)).collect()
    }

    fn assert_valid(layout: &Layout) {
        let (w, h) = (layout.width as f64, layout.height as f64);
        for (i, a) in layout.words.iter().enumerate() {
            assert!(a.bbox.within(w, h), "{} is off the canvas", a.text);
            for b in &layout.words[i + 1..] {
                assert!(
                    !a.bbox.intersects(&b.bbox),
                    "{} overlaps {}",
                    a.text,
                    b.text
                );
            }
        }
    }

    #[test]
    fn test_oversized_word_is_dropped() {
        let cfg = LayoutConfig {
            font: FontScale {
                min_size: 10.0,
                max_size: 300.0,
            },
            ..Default::default()
        };
        let engine = LayoutEngine::new(cfg).unwrap();
        let layout = engine.layout(&[("supercalifragilistic".to_string(), 3)]);
        assert!(layout.words.is_empty());
        assert_eq!(layout.omitted.len(), 1);
        assert_eq!(layout.omitted[0].reason, OmitReason::TooLarge);
    }

    #[test]
    fn test_first_word_is_centered() {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let layout = engine.layout(&[("covid".to_string(), 10)]);
        let w = &layout.words[0];
        assert_eq!(w.font_size, 80.0);
        assert_eq!(w.rotation, Rotation::Horizontal);
        let center_x = w.bbox.x + w.bbox.width / 2.0;
        let center_y = w.bbox.y + w.bbox.height / 2.0;
        assert!((center_x - 400.0).abs() <= 1.0);
        assert!((center_y - 200.0).abs() <= 1.0);
    }

    #[test]
    fn test_no_overlap_and_in_bounds() {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let layout = engine.layout(&words(150));
        assert!(!layout.words.is_empty());
        assert_eq!(layout.words.len() + layout.omitted.len(), 150);
        assert_valid(&layout);
    }

    #[test]
    fn test_dense_canvas_degrades_gracefully() {
        let cfg = LayoutConfig {
            width: 120,
            height: 60,
            font: FontScale {
                min_size: 10.0,
                max_size: 20.0,
            },
            ..Default::default()
        };
        let engine = LayoutEngine::new(cfg).unwrap();
        let layout = engine.layout(&words(60));
        assert!(!layout.words.is_empty());
        assert!(
            layout
                .omitted
                .iter()
                .any(|o| o.reason == OmitReason::NoSpace)
        );
        assert_valid(&layout);
    }

    #[test]
    fn test_font_size_monotonic() {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let layout = engine.layout(&words(40));
        let mut sizes: Vec<(usize, f64)> = layout
            .words
            .iter()
            .map(|w| (w.count, w.font_size))
            .chain(layout.omitted.iter().map(|o| (o.count, o.font_size)))
            .collect();
        sizes.sort_by(|a, b| a.0.cmp(&b.0));
        assert!(sizes.windows(2).all(|p| p[0].1 <= p[1].1));
        let scale = FontScale::default();
        assert_eq!(scale.size_for(1, 1), 80.0);
        assert_eq!(scale.size_for(0, 10), 4.0);
    }

    #[test]
    fn test_deterministic_without_seed() {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let mut input = words(80);
        let a = engine.layout(&input);
        input.reverse();
        let b = engine.layout(&input);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let cfg = LayoutConfig {
            seed: Some(42),
            ..Default::default()
        };
        let engine = LayoutEngine::new(cfg).unwrap();
        let input: Vec<(String, usize)> = (0..50).map(|i| (format!("t{i}"), 1 + i % 3)).collect();
        let a = engine.layout(&input);
        assert_eq!(a, engine.layout(&input));
        assert_valid(&a);
    }

    #[test]
    fn test_rotation_disabled() {
        let cfg = LayoutConfig {
            allow_rotation: false,
            ..Default::default()
        };
        let engine = LayoutEngine::new(cfg).unwrap();
        let layout = engine.layout(&words(100));
        assert!(
            layout
                .words
                .iter()
                .all(|w| w.rotation == Rotation::Horizontal)
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero = LayoutConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            LayoutEngine::new(zero),
            Err(ExplorerError::Config(_))
        ));
        let inverted = LayoutConfig {
            font: FontScale {
                min_size: 50.0,
                max_size: 10.0,
            },
            ..Default::default()
        };
        assert!(LayoutEngine::new(inverted).is_err());
        let no_step = LayoutConfig {
            spiral: SpiralParams {
                angle_step: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(LayoutEngine::new(no_step).is_err());
    }

    #[test]
    fn test_huge_canvas_rejected() {
        let huge = LayoutConfig {
            width: u32::MAX,
            height: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            LayoutEngine::new(huge),
            Err(ExplorerError::Config(_))
        ));
        let wide = LayoutConfig {
            width: LayoutConfig::MAX_CANVAS_SIDE + 1,
            ..Default::default()
        };
        assert!(LayoutEngine::new(wide).is_err());

        let edge = LayoutConfig {
            width: LayoutConfig::MAX_CANVAS_SIDE,
            height: LayoutConfig::MAX_CANVAS_SIDE,
            ..Default::default()
        };
        let engine = LayoutEngine::new(edge).unwrap();
        let layout = engine.layout(&[("covid".to_string(), 3)]);
        assert_eq!(layout.words.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let layout = engine.layout(&[]);
        assert!(layout.words.is_empty());
        assert!(layout.omitted.is_empty());
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = Rect {
            x: 0.0,
            y: 0.0,
            width: 16.0,
            height: 10.0,
        };
        let b = Rect { x: 16.0, ..a };
        let c = Rect { x: 15.0, ..a };
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));

        let mut grid = OccupancyGrid::new(64, 64);
        grid.insert(a);
        assert!(grid.is_free(&b));
        assert!(!grid.is_free(&c));
    }
}
