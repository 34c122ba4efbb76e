//! # Rule Scorer
//!
//! Deterministic, I/O-free scoring of a [`PageRecord`] against fixed SEO
//! rules. Each component earns points up to its own maximum and reports the
//! issues that cost it points. Components are evaluated in a fixed order:
//! title, meta description, H1, content length, images.
//!
//! The page score is the component sum normalized onto a 0-100 scale.

use serde::{Deserialize, Serialize};

use crate::extractor::{ImageRef, PageRecord};

pub const TITLE_MAX: u32 = 20;
pub const TITLE_MIN_CHARS: usize = 30;
pub const TITLE_MAX_CHARS: usize = 60;

pub const META_MAX: u32 = 20;
pub const META_MIN_CHARS: usize = 50;
pub const META_MAX_CHARS: usize = 160;

pub const H1_MAX: u32 = 15;
pub const H1_MULTIPLE_POINTS: u32 = 7;

pub const CONTENT_MAX: u32 = 20;
pub const CONTENT_FULL_WORDS: usize = 800;
pub const CONTENT_FLOOR_WORDS: usize = 300;

pub const IMAGES_MAX: u32 = 10;

/// Scored component of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// Component name
    pub component: String,

    /// Points earned
    pub points: u32,

    /// Points available
    pub max_points: u32,

    /// Issues that cost points, in evaluation order
    pub issues: Vec<String>,
}

impl ScoreComponent {
    fn new(component: &str, points: u32, max_points: u32, issues: Vec<String>) -> Self {
        Self {
            component: component.to_string(),
            points: points.min(max_points),
            max_points,
            issues,
        }
    }
}

/// Ordered per-component scores of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown {
    pub components: Vec<ScoreComponent>,
}

impl ScoreBreakdown {
    /// Sum of earned component points
    pub fn points(&self) -> u32 {
        self.components.iter().map(|c| c.points).sum()
    }

    /// Sum of available component points
    pub fn max_points(&self) -> u32 {
        self.components.iter().map(|c| c.max_points).sum()
    }

    /// Page score in `0..=100`: the component sum normalized by the available
    /// points, rounded half up
    pub fn total(&self) -> u32 {
        let max = self.max_points();
        if max == 0 {
            return 0;
        }
        let scaled = (self.points() * 200 + max) / (2 * max);
        scaled.min(100)
    }

    /// All component issues, in component order
    pub fn issues(&self) -> Vec<String> {
        self.components
            .iter()
            .flat_map(|c| c.issues.iter().cloned())
            .collect()
    }

    pub fn component(&self, name: &str) -> Option<&ScoreComponent> {
        self.components.iter().find(|c| c.component == name)
    }
}

/// Score a page against all rules
pub fn score_page(record: &PageRecord) -> ScoreBreakdown {
    ScoreBreakdown {
        components: vec![
            score_title(record.title.as_deref()),
            score_meta_description(record.meta_description.as_deref()),
            score_h1(record.headings.h1.len()),
            score_content(record.word_count),
            score_images(&record.images),
        ],
    }
}

fn score_title(title: Option<&str>) -> ScoreComponent {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return ScoreComponent::new("title", 0, TITLE_MAX, vec!["Title missing".to_string()]);
    };

    let len = title.chars().count();
    let (points, issues) = if len < TITLE_MIN_CHARS {
        (12, vec![format!("Title too short ({} chars)", len)])
    } else if len > TITLE_MAX_CHARS {
        (15, vec![format!("Title too long ({} chars)", len)])
    } else {
        (TITLE_MAX, Vec::new())
    };
    ScoreComponent::new("title", points, TITLE_MAX, issues)
}

fn score_meta_description(meta: Option<&str>) -> ScoreComponent {
    let Some(meta) = meta.filter(|m| !m.trim().is_empty()) else {
        return ScoreComponent::new(
            "meta_description",
            0,
            META_MAX,
            vec!["Meta description missing".to_string()],
        );
    };

    let len = meta.chars().count();
    let (points, issues) = if len < META_MIN_CHARS {
        (10, vec![format!("Meta description too short ({} chars)", len)])
    } else if len > META_MAX_CHARS {
        (14, vec![format!("Meta description too long ({} chars)", len)])
    } else {
        (META_MAX, Vec::new())
    };
    ScoreComponent::new("meta_description", points, META_MAX, issues)
}

fn score_h1(count: usize) -> ScoreComponent {
    let (points, issues) = match count {
        0 => (0, vec!["Missing H1".to_string()]),
        1 => (H1_MAX, Vec::new()),
        n => (H1_MULTIPLE_POINTS, vec![format!("Multiple H1 tags ({})", n)]),
    };
    ScoreComponent::new("h1", points, H1_MAX, issues)
}

fn score_content(word_count: usize) -> ScoreComponent {
    let (points, issues) = if word_count >= CONTENT_FULL_WORDS {
        (CONTENT_MAX, Vec::new())
    } else if word_count >= CONTENT_FLOOR_WORDS {
        // 10 at the floor, scaling linearly toward 20 at full length
        let span = CONTENT_FULL_WORDS - CONTENT_FLOOR_WORDS;
        let extra = (word_count - CONTENT_FLOOR_WORDS) * 10 / span;
        (10 + extra as u32, Vec::new())
    } else {
        (0, vec![format!("Thin content ({} words)", word_count)])
    };
    ScoreComponent::new("content", points, CONTENT_MAX, issues)
}

/// Pages without images get full credit: there is nothing to penalize.
fn score_images(images: &[ImageRef]) -> ScoreComponent {
    if images.is_empty() {
        return ScoreComponent::new("images", IMAGES_MAX, IMAGES_MAX, Vec::new());
    }

    let total = images.len();
    let with_alt = images.iter().filter(|image| image.has_alt()).count();
    let points = (with_alt * IMAGES_MAX as usize / total) as u32;

    let mut issues = Vec::new();
    if with_alt < total {
        issues.push(format!("{} images missing alt text", total - with_alt));
    }
    ScoreComponent::new("images", points, IMAGES_MAX, issues)
}
