//! Bullet Extractor — splits raw resume text into discrete bullet statements.
//!
//! Purely local text segmentation: no network, no suspension points. The only
//! way this stage "fails" is by finding nothing, which yields an empty list.

use serde::{Deserialize, Serialize};

/// A single resume achievement/responsibility statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub text: String,
}

const BULLET_MARKERS: &[char] = &['-', '•', '*', '·'];

/// Minimum length for a marker-prefixed bullet after stripping the marker.
const MIN_MARKER_BULLET_LEN: usize = 3;
/// Minimum length for an unmarked line admitted via the action-verb heuristic.
const MIN_VERB_BULLET_LEN: usize = 5;

/// Action verbs that mark an unmarked line as an achievement statement.
/// Matched case-insensitively within the first 20 characters of the line.
const ACTION_VERBS: &[&str] = &[
    "developed",
    "created",
    "built",
    "implemented",
    "designed",
    "managed",
    "led",
    "improved",
    "optimized",
    "reduced",
    "increased",
    "used",
    "worked",
    "wrote",
    "tested",
];

/// Splits resume text into ordered bullet statements.
///
/// Recognizes marker-prefixed lines (`-`, `•`, `*`, `·`, numbered prefixes)
/// and unmarked lines opening with an action verb. Section headers and other
/// short fragments are dropped. If nothing matches, every non-trivial line is
/// treated as a bullet so that any non-empty resume yields at least one.
///
/// Empty or whitespace-only input yields an empty list, not an error.
pub fn extract_bullets(resume_text: &str) -> Vec<Bullet> {
    let mut bullets: Vec<Bullet> = Vec::new();

    for line in resume_text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        let is_marked = stripped.starts_with(BULLET_MARKERS)
            || stripped.chars().next().is_some_and(|c| c.is_ascii_digit());

        if is_marked {
            let text = stripped
                .trim_start_matches(|c: char| {
                    BULLET_MARKERS.contains(&c) || c.is_ascii_digit() || c == '.' || c == ')'
                })
                .trim();
            if text.len() >= MIN_MARKER_BULLET_LEN {
                bullets.push(Bullet {
                    text: text.to_string(),
                });
            }
        } else if opens_with_action_verb(stripped) && stripped.len() >= MIN_VERB_BULLET_LEN {
            bullets.push(Bullet {
                text: stripped.to_string(),
            });
        }
    }

    // Lenient fallback: no recognizable bullets, so take every non-trivial line.
    if bullets.is_empty() {
        bullets = resume_text
            .lines()
            .map(str::trim)
            .filter(|l| l.len() >= MIN_MARKER_BULLET_LEN)
            .map(|l| Bullet {
                text: l.to_string(),
            })
            .collect();
    }

    bullets
}

fn opens_with_action_verb(line: &str) -> bool {
    let head: String = line.chars().take(20).collect::<String>().to_lowercase();
    ACTION_VERBS.iter().any(|verb| head.contains(verb))
}
