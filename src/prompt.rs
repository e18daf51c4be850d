//! Prompt composition: style preset, instruction, and tone options folded
//! into one ordered instruction text.

use std::collections::BTreeMap;

use crate::request::ToneOptions;

/// Built-in style presets, keyed by canonical name.
const PRESETS: &[(&str, &str)] = &[
    (
        "chibi",
        "Chibi anime style: super-deformed proportions with a large head and small body, \
         big sparkling eyes, soft pastel cel shading, clean bold line art.",
    ),
    (
        "mature",
        "Mature anime style: realistic adult proportions, refined facial features, detailed eyes, \
         elegant cel shading with soft gradients, polished line art.",
    ),
    (
        "pop",
        "Pop street anime style: bold saturated colors, thick clean outlines, \
         street-fashion attitude, flat shading with punchy highlights.",
    ),
];

/// Alternate preset keys, including the legacy numeric ones.
const ALIASES: &[(&str, &str)] = &[("1", "chibi"), ("2", "mature"), ("3", "pop"), ("street", "pop")];

/// Named background presets.
const BACKGROUNDS: &[(&str, &str)] = &[
    ("white", "Background: plain clean white."),
    ("pastel", "Background: soft pastel gradient."),
    ("sparkle", "Background: dreamy soft bokeh with gentle sparkles."),
    ("studio", "Background: neutral studio backdrop with soft even lighting."),
    ("city", "Background: softly blurred city street at dusk."),
];

const STRONG_STYLE: &str = "Apply the style strongly and consistently across the whole image.";
const BRIGHTEN: &str = "Slightly brighten the overall image while keeping natural contrast.";
const CLEAN: &str = "Lightly clean up skin blemishes and stray hairs; keep natural texture.";
const SMILE: &str = "Give the subject a gentle, natural smile.";
const TRANSPARENT_BACKGROUND: &str =
    "Background: fully transparent, subject cleanly isolated with no backdrop.";
const MOOD_BOOST: &str = "Slightly intensify the mood and atmosphere of the scene.";

const IDENTITY: &str = "Preserve identity: this must remain the same person. \
     Keep face shape, apparent age, gender, skin tone, eye shape and spacing, nose shape, \
     mouth shape and hairstyle length unchanged. \
     Do not change gender. Do not change age. Do not replace the person.";

const NEGATIVE: &str = "Avoid: blur, noise, compression artifacts, extra or missing fingers, \
     malformed hands, distorted anatomy, extra limbs, watermark, text, logo, \
     photorealistic rendering.";

/// Kinds of prompt block, declared in output order.
///
/// The derived `Ord` is the block order; input order never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKind {
    /// Resolved style preset text.
    Preset,
    /// The caller's own instruction, trimmed.
    Instruction,
    /// Stronger style application.
    StrongStyle,
    /// Mild brighten.
    Brighten,
    /// Skin and hair touch-up.
    Clean,
    /// Gentle smile.
    Smile,
    /// Transparent or preset background.
    Background,
    /// Mood intensification.
    MoodBoost,
    /// Identity preservation (edit mode only).
    Identity,
    /// Negative constraints, always last.
    Negative,
}

/// One block of a composed prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBlock {
    /// What this block expresses.
    pub kind: BlockKind,
    /// Block text.
    pub text: String,
}

/// Ordered blocks making up the final instruction text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedPrompt {
    blocks: Vec<PromptBlock>,
}

impl ComposedPrompt {
    /// The blocks in output order.
    #[must_use]
    pub fn blocks(&self) -> &[PromptBlock] {
        &self.blocks
    }

    /// Whether a block of the given kind is present.
    #[must_use]
    pub fn contains(&self, kind: BlockKind) -> bool {
        self.blocks.iter().any(|b| b.kind == kind)
    }

    /// Newline-joined prompt text.
    #[must_use]
    pub fn text(&self) -> String {
        self.blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

/// Immutable preset and negative-constraint tables used by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    presets: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    negative: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            presets: PRESETS.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
            aliases: ALIASES.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
            negative: Some(NEGATIVE.to_string()),
        }
    }
}

impl PromptConfig {
    /// Build a config from an explicit preset table and no aliases.
    #[must_use]
    pub fn with_presets<I, K, V>(presets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            presets: presets
                .into_iter()
                .map(|(k, v)| {
                    let key: String = k.into();
                    (normalize_key(&key), v.into())
                })
                .collect(),
            aliases: BTreeMap::new(),
            negative: Some(NEGATIVE.to_string()),
        }
    }

    /// Add or replace preset texts, keeping existing aliases.
    #[must_use]
    pub fn extend_presets<I, K, V>(mut self, presets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in presets {
            let key: String = k.into();
            self.presets.insert(normalize_key(&key), v.into());
        }
        self
    }

    /// Enable or disable the negative-constraints block.
    #[must_use]
    pub fn negative_block(mut self, enabled: bool) -> Self {
        self.negative = enabled.then(|| NEGATIVE.to_string());
        self
    }

    /// Resolve a preset key (named or alias) to its text.
    #[must_use]
    pub fn resolve_preset(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.presets.get(canonical).map(String::as_str)
    }

    /// Compose the prompt for one request. Never fails.
    #[must_use]
    pub fn compose(
        &self,
        instruction: &str,
        style_preset: Option<&str>,
        tone: &ToneOptions,
        is_edit: bool,
    ) -> ComposedPrompt {
        let mut blocks = Vec::new();
        let mut push = |kind: BlockKind, text: &str| {
            blocks.push(PromptBlock { kind, text: text.to_string() });
        };

        if let Some(text) = style_preset.and_then(|key| self.resolve_preset(key)) {
            push(BlockKind::Preset, text);
        }

        let instruction = instruction.trim();
        if !instruction.is_empty() {
            push(BlockKind::Instruction, instruction);
        }

        if tone.strong_style {
            push(BlockKind::StrongStyle, STRONG_STYLE);
        }
        if tone.brighten {
            push(BlockKind::Brighten, BRIGHTEN);
        }
        if tone.clean {
            push(BlockKind::Clean, CLEAN);
        }
        if tone.smile {
            push(BlockKind::Smile, SMILE);
        }
        if let Some(text) = background_text(tone) {
            push(BlockKind::Background, text);
        }
        if tone.mood_boost {
            push(BlockKind::MoodBoost, MOOD_BOOST);
        }

        if is_edit && tone.locks_face() {
            push(BlockKind::Identity, IDENTITY);
        }

        if let Some(ref negative) = self.negative {
            push(BlockKind::Negative, negative.as_str());
        }

        blocks.sort_by_key(|b| b.kind);
        ComposedPrompt { blocks }
    }
}

/// Transparency wins over a named background; unknown names contribute nothing.
fn background_text(tone: &ToneOptions) -> Option<&'static str> {
    if tone.bg_transparent {
        return Some(TRANSPARENT_BACKGROUND);
    }
    let name = normalize_key(tone.bg_preset.as_deref()?);
    BACKGROUNDS.iter().find(|&&(k, _)| k == name).map(|&(_, text)| text)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
