//! Source roles, the download pattern set and staged-file lookup.

use std::fmt;

/// Semantic category of a source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Ambient occlusion / roughness / metalness packed map.
    Arm,
    Normal,
    Height,
    Diffuse,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Arm, Role::Normal, Role::Height, Role::Diffuse];

    pub fn name(self) -> &'static str {
        match self {
            Role::Arm => "arm",
            Role::Normal => "normal",
            Role::Height => "height",
            Role::Diffuse => "diffuse",
        }
    }

    /// Substrings that identify a staged file of this role, in preference order.
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            Role::Arm => &["_arm_"],
            Role::Normal => &["_nor_"],
            Role::Height => &["_disp_", "_height_"],
            Role::Diffuse => &["_diff_", "_color_"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File name suffixes worth downloading from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredFileSet {
    patterns: Vec<String>,
}

impl RequiredFileSet {
    /// Patterns for one resolution tier, e.g. `"4k"` gives `_arm_4k.png` and friends.
    pub fn for_resolution(resolution: &str) -> Self {
        let res = resolution.trim().to_lowercase();
        let patterns = ["diff", "color", "nor_dx", "arm", "disp", "height"]
            .iter()
            .map(|kind| format!("_{}_{}.png", kind, res))
            .collect();
        Self { patterns }
    }

    pub fn from_patterns(patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when `filename` contains any pattern.
    pub fn matches(&self, filename: &str) -> bool {
        self.patterns.iter().any(|p| filename.contains(p.as_str()))
    }
}

impl Default for RequiredFileSet {
    fn default() -> Self {
        Self::for_resolution("4k")
    }
}

/// Lowercased asset name with spaces replaced, as used by the staged file names.
pub fn asset_prefix(asset_name: &str) -> String {
    asset_name.trim().to_lowercase().replace(' ', "_")
}

/// Finds the staged file for `role` belonging to the asset `prefix`.
///
/// Comparison is case-insensitive. Markers are tried in order (height prefers
/// `_disp_` over `_height_`); among names matching the same marker the
/// lexicographically smallest wins, whatever order `listing` is in.
pub fn locate_source<'a>(listing: &'a [String], prefix: &str, role: Role) -> Option<&'a str> {
    let prefix = asset_prefix(prefix);
    role.markers().iter().find_map(|marker| {
        listing
            .iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                lower.starts_with(&prefix) && lower.contains(marker)
            })
            .min()
            .map(String::as_str)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn patterns_follow_resolution() {
        let set = RequiredFileSet::for_resolution("4k");
        assert_eq!(set.patterns().len(), 6);
        assert!(set.matches("rock_face_nor_dx_4k.png"));
        assert!(set.matches("rock_face_arm_4k.png"));
        assert!(!set.matches("rock_face_nor_gl_4k.png"));
        assert!(!set.matches("rock_face_arm_2k.png"));
        assert!(!set.matches("rock_face_arm_4k.exr"));
        assert!(RequiredFileSet::for_resolution(" 2K ").matches("x_disp_2k.png"));
    }

    #[test]
    fn asset_prefix_normalizes_display_names() {
        assert_eq!(asset_prefix("Rock Face 03"), "rock_face_03");
        assert_eq!(asset_prefix("brick_wall"), "brick_wall");
    }

    #[test]
    fn locate_is_case_insensitive_and_prefix_bound() {
        let listing = names(&["Rock_Face_ARM_4k.png", "other_arm_4k.png"]);
        assert_eq!(
            locate_source(&listing, "rock face", Role::Arm),
            Some("Rock_Face_ARM_4k.png")
        );
        assert_eq!(locate_source(&listing, "brick", Role::Arm), None);
    }

    #[test]
    fn height_prefers_disp_over_height() {
        let listing = names(&["rock_height_4k.png", "rock_disp_4k.png"]);
        assert_eq!(locate_source(&listing, "rock", Role::Height), Some("rock_disp_4k.png"));
        let only_height = names(&["rock_height_4k.png"]);
        assert_eq!(
            locate_source(&only_height, "rock", Role::Height),
            Some("rock_height_4k.png")
        );
    }

    #[test]
    fn ties_break_lexicographically() {
        let listing = names(&["rock_nor_gl_4k.png", "rock_nor_dx_4k.png"]);
        assert_eq!(locate_source(&listing, "rock", Role::Normal), Some("rock_nor_dx_4k.png"));
    }

    #[test]
    fn diffuse_falls_back_to_color() {
        let listing = names(&["rock_color_4k.png", "rock_arm_4k.png"]);
        assert_eq!(locate_source(&listing, "rock", Role::Diffuse), Some("rock_color_4k.png"));
    }
}
