use std::path::PathBuf;

use clap::Parser;
use gloam_core::config::{load_config, ConfigError, RenderConfig};

#[derive(Parser, Debug, Default)]
#[command(name = "gloam", version, about = "gloam - deferred lighting renderer")]
pub struct CliArgs {
    /// Path to the renderer config YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of WGSL overrides (files missing there use the built-in copy)
    #[arg(long)]
    pub shaders: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Start with shadows disabled
    #[arg(long)]
    pub no_shadows: bool,

    /// Start with light-volume wireframes enabled
    #[arg(long)]
    pub wireframe: bool,

    /// Light grid RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// PNG for the ground plane's diffuse texture
    #[arg(long)]
    pub ground_texture: Option<PathBuf>,
}

impl CliArgs {
    /// Load the config file (or defaults) and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<RenderConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RenderConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_shadows {
            config.shadows.enabled = false;
        }
        if self.wireframe {
            config.debug.wireframe_volumes = true;
        }
        if let Some(seed) = self.seed {
            config.light_grid.seed = Some(seed);
        }
        if let Some(path) = &self.ground_texture {
            config.scene.ground_texture = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "gloam",
            "--width",
            "800",
            "--no-shadows",
            "--seed",
            "7",
        ]);
        assert_eq!(args.width, Some(800));
        assert!(args.no_shadows);
        assert!(!args.wireframe);
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "window: {{ width: 1024, height: 768 }}\nshadows: {{ enabled: true }}\nlight_grid: {{ seed: 1 }}"
        )
        .unwrap();
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            height: Some(600),
            no_shadows: true,
            wireframe: true,
            seed: Some(9),
            ground_texture: Some(PathBuf::from("ground.png")),
            ..Default::default()
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert!(!config.shadows.enabled);
        assert!(config.debug.wireframe_volumes);
        assert_eq!(config.light_grid.seed, Some(9));
        assert_eq!(config.scene.ground_texture, Some(PathBuf::from("ground.png")));
    }

    #[test]
    fn test_missing_config_file() {
        let args = CliArgs {
            config: Some(PathBuf::from("/nonexistent/gloam.yaml")),
            ..Default::default()
        };
        assert!(matches!(args.resolve_config(), Err(ConfigError::Io(_))));
    }
}
