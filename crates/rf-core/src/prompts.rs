//! Canned prompt material offered to users who start from a blank box.

/// Rotating placeholder suggestions.
pub const SUGGESTIONS: [&str; 6] = [
    "A mystical dragon soaring through ancient mountains...",
    "A futuristic cityscape with neon lights reflecting in rain...",
    "A peaceful forest scene with magical floating lights...",
    "An underwater kingdom with bioluminescent creatures...",
    "A space station orbiting a distant alien planet...",
    "A medieval castle surrounded by enchanted gardens...",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTemplate {
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const TEMPLATES: [SceneTemplate; 6] = [
    SceneTemplate { name: "Cinematic Landscape", icon: "🏔️", description: "Epic mountain scenery with dramatic lighting" },
    SceneTemplate { name: "Urban Night", icon: "🌃", description: "City lights and neon reflections" },
    SceneTemplate { name: "Ocean Waves", icon: "🌊", description: "Peaceful ocean with rolling waves" },
    SceneTemplate { name: "Forest Path", icon: "🌲", description: "Mystical forest with sunbeams" },
    SceneTemplate { name: "Space Journey", icon: "🚀", description: "Cosmic adventure through stars" },
    SceneTemplate { name: "Desert Sunset", icon: "🏜️", description: "Golden hour in vast desert" },
];

/// Picks the suggestion shown after `tick` placeholder rotations.
pub fn suggestion(tick: usize) -> &'static str {
    SUGGESTIONS[tick % SUGGESTIONS.len()]
}

pub fn find_template(name: &str) -> Option<&'static SceneTemplate> {
    let name = name.trim();
    TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}
