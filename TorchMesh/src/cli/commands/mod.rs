use clap::Subcommand;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{ExportOptions, ImportOptions};
use crate::formats::SkeletonVersion;
use crate::geometry::UpAxis;

/// Skeleton serializer version for exports
#[derive(Debug, Clone, Copy)]
pub struct SkeletonVersionArg(pub SkeletonVersion);

impl FromStr for SkeletonVersionArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches('v') {
            "1.10" | "1_10" | "110" => Ok(SkeletonVersionArg(SkeletonVersion::V1_10)),
            "1.80" | "1_80" | "180" => Ok(SkeletonVersionArg(SkeletonVersion::V1_80)),
            _ => Err(format!("Invalid skeleton version '{s}'. Valid values: 1.10, 1.80")),
        }
    }
}

pub mod config;
pub mod export;
pub mod import;
pub mod inspect;
pub mod json;
pub mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the chunk tree and contents of a .mesh or .skeleton file
    Inspect {
        file: PathBuf,

        /// Print the chunk tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a .mesh or .skeleton file to JSON
    ToJson {
        source: PathBuf,

        /// Output file (defaults to <source>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode a JSON document back to .mesh or .skeleton
    FromJson {
        source: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a .mesh (with its skeleton and materials) into a scene file
    Import {
        mesh: PathBuf,

        /// Scene JSON file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Add to an existing scene instead of starting an empty one
        #[arg(long)]
        scene: Option<PathBuf>,

        /// New scenes use Z as the up axis
        #[arg(long)]
        z_up: bool,

        /// Bind weights to the scene's armature
        #[arg(long)]
        use_selected_skeleton: bool,

        /// Skip animations
        #[arg(long)]
        no_animations: bool,

        /// Skip shape keys
        #[arg(long)]
        no_shape_keys: bool,

        /// Keep the decoded model as JSON next to the input
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// Export a scene file to .mesh (plus .skeleton and .material)
    Export {
        scene: PathBuf,

        /// Output .mesh file
        #[arg(short, long)]
        output: PathBuf,

        /// Write a skeleton from the scene armature
        #[arg(long)]
        skeleton: bool,

        /// Include actions in the skeleton
        #[arg(long)]
        animations: bool,

        /// Export shape keys as poses
        #[arg(long)]
        shape_keys: bool,

        /// Write a .material file
        #[arg(long)]
        materials: bool,

        #[arg(long)]
        tangents: bool,

        #[arg(long)]
        edge_lists: bool,

        /// One submesh per material
        #[arg(long)]
        group_by_material: bool,

        /// Skeleton version (1.10 or 1.80)
        #[arg(long)]
        skeleton_version: Option<SkeletonVersionArg>,
    },

    /// Decode every model file under a directory
    Validate {
        dir: PathBuf,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the settings file, or create it with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { file, json } => inspect::execute(file, *json),

            Commands::ToJson { source, output } => json::to_json(source, output.as_deref()),

            Commands::FromJson { source, output } => {
                let settings = config::load_settings()?;
                json::from_json(source, output, &settings.export)
            }

            Commands::Import {
                mesh,
                output,
                scene,
                z_up,
                use_selected_skeleton,
                no_animations,
                no_shape_keys,
                keep_intermediate,
            } => {
                let settings = config::load_settings()?;
                let options = ImportOptions {
                    keep_intermediate: settings.import.keep_intermediate || *keep_intermediate,
                    import_animations: settings.import.import_animations && !*no_animations,
                    import_shape_keys: settings.import.import_shape_keys && !*no_shape_keys,
                    use_selected_skeleton: settings.import.use_selected_skeleton || *use_selected_skeleton,
                    ..settings.import
                };
                let up_axis = if *z_up { UpAxis::Z } else { UpAxis::Y };
                import::execute(mesh, output, scene.as_deref(), up_axis, &options)
            }

            Commands::Export {
                scene,
                output,
                skeleton,
                animations,
                shape_keys,
                materials,
                tangents,
                edge_lists,
                group_by_material,
                skeleton_version,
            } => {
                let settings = config::load_settings()?;
                let base = settings.export;
                let options = ExportOptions {
                    export_skeleton: base.export_skeleton || *skeleton,
                    export_animation: base.export_animation || *animations,
                    shape_keys: base.shape_keys || *shape_keys,
                    export_materials: base.export_materials || *materials,
                    tangents: base.tangents || *tangents,
                    edge_lists: base.edge_lists || *edge_lists,
                    group_by_material: base.group_by_material || *group_by_material,
                    skeleton_version: skeleton_version.map_or(base.skeleton_version, |v| v.0),
                    ..base
                };
                export::execute(scene, output, &options)
            }

            Commands::Validate { dir, quiet } => validate::execute(dir, *quiet),

            Commands::Config { init } => config::execute(*init),
        }
    }
}
