//! Import/export options and persisted user settings
//!
//! Options are plain values handed to each pipeline call. [`Settings`] holds
//! the defaults a user has saved; reading and writing the settings file is
//! left to the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::{MeshEncodeOptions, SkeletonEncodeOptions, SkeletonVersion};
use crate::geometry::WeldTolerance;

/// Colour layer whose RGB mean becomes vertex alpha.
pub const DEFAULT_ALPHA_LAYER: &str = "Alpha";

fn default_true() -> bool {
    true
}

fn default_alpha_layer() -> String {
    DEFAULT_ALPHA_LAYER.to_string()
}

fn default_xml_converter() -> String {
    if cfg!(windows) {
        "C:\\OgreCommandLineTools\\OgreXmlConverter.exe".to_string()
    } else {
        "OgreXMLConverter".to_string()
    }
}

/// Options for importing a mesh into a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Write the decoded model as `<file>.json` next to the input.
    #[serde(default)]
    pub keep_intermediate: bool,
    /// Apply the file's normals as custom normals.
    #[serde(default = "default_true")]
    pub import_normals: bool,
    #[serde(default = "default_true")]
    pub import_animations: bool,
    /// Set the scene frame rate from the animation key spacing.
    #[serde(default = "default_true")]
    pub adjust_frame_rate: bool,
    #[serde(default = "default_true")]
    pub import_shape_keys: bool,
    /// Bind skin weights to the scene's selected armature instead of the
    /// linked skeleton file.
    #[serde(default)]
    pub use_selected_skeleton: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            keep_intermediate: false,
            import_normals: true,
            import_animations: true,
            adjust_frame_rate: true,
            import_shape_keys: true,
            use_selected_skeleton: false,
        }
    }
}

/// Options for exporting a scene to a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Write the encoded model as `<file>.json` next to each output.
    pub keep_intermediate: bool,
    pub edge_lists: bool,
    pub tangents: bool,
    /// Store tangent handedness in w.
    pub tangent_parity: bool,
    pub binormals: bool,
    pub colours: bool,
    /// Colour layer used for alpha; matched exactly.
    #[serde(default = "default_alpha_layer")]
    pub alpha_layer: String,
    /// One submesh per material.
    pub group_by_material: bool,
    /// Bake object transforms into the vertices.
    pub apply_transform: bool,
    pub apply_modifiers: bool,
    /// Export shape keys as poses.
    pub shape_keys: bool,
    /// Write a new skeleton rather than linking the existing one.
    pub export_skeleton: bool,
    pub export_animation: bool,
    pub export_materials: bool,
    /// Replace an existing `.material` file.
    pub overwrite_material: bool,
    /// Copy material textures next to the `.material` file.
    pub copy_textures: bool,
    pub skeleton_version: SkeletonVersion,
    pub weld_tolerance: WeldTolerance,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            keep_intermediate: false,
            edge_lists: false,
            tangents: false,
            tangent_parity: false,
            binormals: false,
            colours: false,
            alpha_layer: default_alpha_layer(),
            group_by_material: false,
            apply_transform: false,
            apply_modifiers: false,
            shape_keys: false,
            export_skeleton: false,
            export_animation: false,
            export_materials: false,
            overwrite_material: false,
            copy_textures: false,
            skeleton_version: SkeletonVersion::default(),
            weld_tolerance: WeldTolerance::default(),
        }
    }
}

impl ExportOptions {
    #[must_use]
    pub fn mesh_encode_options(&self) -> MeshEncodeOptions {
        MeshEncodeOptions {
            edge_lists: self.edge_lists,
            tangents: self.tangents,
            tangent_parity: self.tangent_parity,
            binormals: self.binormals,
            colours: self.colours,
            group_by_material: self.group_by_material,
        }
    }

    #[must_use]
    pub fn skeleton_encode_options(&self) -> SkeletonEncodeOptions {
        SkeletonEncodeOptions { version: self.skeleton_version }
    }
}

/// Saved user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub import: ImportOptions,
    #[serde(default)]
    pub export: ExportOptions,
    /// Path of the legacy `OgreXMLConverter` tool, kept for reference.
    #[serde(default = "default_xml_converter")]
    pub xml_converter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            import: ImportOptions::default(),
            export: ExportOptions::default(),
            xml_converter: default_xml_converter(),
        }
    }
}

impl Settings {
    /// `<config dir>/torchmesh/settings.toml`, when the platform has a config
    /// directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("torchmesh").join("settings.toml"))
    }

    /// Parse settings; missing fields take their defaults.
    ///
    /// # Errors
    /// [`crate::Error::TomlDe`] for invalid TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    /// [`crate::Error::TomlSer`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The converter path with `~` and environment variables expanded.
    #[must_use]
    pub fn xml_converter_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.xml_converter).map_or_else(
            |_| self.xml_converter.clone(),
            std::borrow::Cow::into_owned,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_settings_take_defaults() {
        let settings = Settings::from_toml_str("[export]\ntangents = true\nalpha_layer = \"A\"\n").unwrap();
        assert!(settings.export.tangents);
        assert_eq!(settings.export.alpha_layer, "A");
        assert!(!settings.export.edge_lists);
        assert!(settings.import.import_normals);
        assert_eq!(settings.xml_converter, default_xml_converter());
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = Settings::default();
        settings.export.group_by_material = true;
        settings.export.skeleton_version = SkeletonVersion::V1_80;
        settings.import.use_selected_skeleton = true;
        let text = settings.to_toml_string().unwrap();
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_xml_converter_tilde() {
        let settings = Settings { xml_converter: "~/tools/OgreXMLConverter".into(), ..Settings::default() };
        let path = settings.xml_converter_path();
        if dirs::home_dir().is_some() {
            assert!(!path.starts_with("~"));
        }
        assert!(path.ends_with("tools/OgreXMLConverter"));
    }
}
