//! CLI argument parsing with clap.

use std::path::Path;

use clap::Parser;

use crate::codec;
use crate::error::PipelineError;
use crate::request::{GenerationRequest, ImageSource, ToneOptions};

/// Stylized image generation from an instruction, a style preset, and an
/// optional source image.
#[derive(Parser, Debug)]
#[command(name = "stylegen", version, about)]
pub struct Cli {
    /// Free-text instruction describing the desired image.
    #[arg(conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Path to a file containing the instruction text.
    #[arg(short = 'p', long, conflicts_with = "prompt")]
    pub prompt_file: Option<String>,

    /// Style preset name or legacy alias (chibi, mature, pop, 1, 2, 3, street).
    #[arg(long)]
    pub preset: Option<String>,

    /// Brighten the palette.
    #[arg(long)]
    pub lite: bool,

    /// Lift the mood.
    #[arg(long)]
    pub mood_boost: bool,

    /// Gentle smile.
    #[arg(long)]
    pub smile: bool,

    /// Clean line art and lighting.
    #[arg(long)]
    pub clean: bool,

    /// Transparent background (overrides --bg-preset).
    #[arg(long)]
    pub bg_transparent: bool,

    /// Background preset: white, pastel, sparkle, studio, city.
    #[arg(long)]
    pub bg_preset: Option<String>,

    /// Do not ask the provider to preserve the subject's identity in edits.
    #[arg(long)]
    pub no_lock_face: bool,

    /// Lean harder on the preset's style.
    #[arg(long)]
    pub strong_style: bool,

    /// Source image to edit (jpeg, png, webp; other formats are converted).
    #[arg(short, long)]
    pub image: Option<String>,

    /// Number of images to request.
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// Output file path for inline images (auto-generated if not specified).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Handle a JSON request body from a file, or `-` for stdin, and print
    /// the JSON response.
    #[arg(long, value_name = "PATH")]
    pub request: Option<String>,

    /// Describe --image as comma-separated tags instead of generating.
    #[arg(long, requires = "image")]
    pub describe: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the instruction from the positional argument or the file flag.
    ///
    /// Neither being present yields an empty instruction; a preset alone is
    /// still a valid request.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt file cannot be read.
    pub fn resolve_prompt(&self) -> Result<String, std::io::Error> {
        if let Some(ref text) = self.prompt {
            Ok(text.clone())
        } else if let Some(ref path) = self.prompt_file {
            std::fs::read_to_string(path)
        } else {
            Ok(String::new())
        }
    }

    /// Tone flags as options.
    #[must_use]
    pub fn tone(&self) -> ToneOptions {
        ToneOptions {
            brighten: self.lite,
            mood_boost: self.mood_boost,
            smile: self.smile,
            clean: self.clean,
            bg_transparent: self.bg_transparent,
            bg_preset: self.bg_preset.clone(),
            lock_face: self.no_lock_face.then_some(false),
            strong_style: self.strong_style,
        }
    }

    /// Load `--image`, if given.
    ///
    /// # Errors
    ///
    /// Returns I/O or media type errors from reading the file.
    pub fn source_image(&self) -> Result<Option<ImageSource>, PipelineError> {
        self.image
            .as_deref()
            .map(|path| codec::load_file(Path::new(path)).map(ImageSource::Encoded))
            .transpose()
    }

    /// Build the generation request from the parsed flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt file or source image cannot be loaded.
    pub fn to_request(&self) -> Result<GenerationRequest, PipelineError> {
        Ok(GenerationRequest {
            instruction: self.resolve_prompt()?,
            style_preset: self.preset.clone(),
            tone: self.tone(),
            source_image: self.source_image()?,
            batch_size: self.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_prompt() {
        let cli = Cli::parse_from(["stylegen", "a cat"]);
        assert_eq!(cli.prompt.as_deref(), Some("a cat"));
        assert!(cli.prompt_file.is_none());
        assert_eq!(cli.resolve_prompt().unwrap(), "a cat");
    }

    #[test]
    fn prompt_file_flag() {
        let dir = std::env::temp_dir().join("stylegen_cli_pf_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prompt.txt");
        std::fs::write(&path, "prompt from file").unwrap();

        let cli = Cli::parse_from(["stylegen", "-p", path.to_str().unwrap()]);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.resolve_prompt().unwrap(), "prompt from file");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_prompt_is_empty_instruction() {
        let cli = Cli::parse_from(["stylegen", "--preset", "chibi"]);
        assert_eq!(cli.resolve_prompt().unwrap(), "");
        let request = cli.to_request().unwrap();
        assert_eq!(request.style_preset.as_deref(), Some("chibi"));
        assert!(!request.is_edit());
    }

    #[test]
    fn default_values() {
        let cli = Cli::parse_from(["stylegen", "a cat"]);
        assert!(cli.preset.is_none());
        assert!(cli.image.is_none());
        assert!(cli.count.is_none());
        assert!(cli.output.is_none());
        assert!(cli.request.is_none());
        assert!(!cli.describe);
        assert!(!cli.verbose);
        assert_eq!(cli.tone(), ToneOptions::default());
    }

    #[test]
    fn tone_flags() {
        let cli = Cli::parse_from([
            "stylegen",
            "--lite",
            "--mood-boost",
            "--smile",
            "--clean",
            "--bg-transparent",
            "--bg-preset",
            "pastel",
            "--no-lock-face",
            "--strong-style",
            "-n",
            "3",
            "a cat",
        ]);
        let tone = cli.tone();
        assert!(tone.brighten);
        assert!(tone.mood_boost);
        assert!(tone.smile);
        assert!(tone.clean);
        assert!(tone.bg_transparent);
        assert_eq!(tone.bg_preset.as_deref(), Some("pastel"));
        assert_eq!(tone.lock_face, Some(false));
        assert!(tone.strong_style);
        assert_eq!(cli.to_request().unwrap().batch_size, Some(3));
    }

    #[test]
    fn image_flag_loads_file() {
        let dir = std::env::temp_dir().join("stylegen_cli_image_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("face.png");
        image::DynamicImage::new_rgb8(2, 2).save(&path).unwrap();

        let cli = Cli::parse_from(["stylegen", "-i", path.to_str().unwrap(), "make it chibi"]);
        let request = cli.to_request().unwrap();
        let Some(ImageSource::Encoded(image)) = request.source_image else {
            panic!("expected encoded image");
        };
        assert_eq!(image.media_type, "image/png");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn describe_requires_image() {
        assert!(Cli::try_parse_from(["stylegen", "--describe"]).is_err());
        assert!(Cli::try_parse_from(["stylegen", "--describe", "-i", "x.png"]).is_ok());
    }
}
