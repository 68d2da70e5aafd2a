//! OGRE `.material` scripts
//!
//! Only material names and their `texture` entries are carried. Export writes
//! one single-pass technique per material; import reads every `material`
//! block and collects the textures it names, ignoring everything else.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A material name and the textures its units reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialScript {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<String>,
}

impl MaterialScript {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), textures: Vec::new() }
    }
}

/// `<stem>.material` next to a mesh file.
#[must_use]
pub fn material_path(mesh_path: &Path) -> PathBuf {
    mesh_path.with_extension("material")
}

/// Render materials as a script.
#[must_use]
pub fn render_materials(materials: &[MaterialScript]) -> String {
    let mut out = String::new();
    for (i, material) in materials.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "material {}", material.name);
        out.push_str("{\n\ttechnique\n\t{\n\t\tpass\n\t\t{\n");
        for texture in &material.textures {
            out.push_str("\t\t\ttexture_unit\n\t\t\t{\n");
            let _ = writeln!(out, "\t\t\t\ttexture {texture}");
            out.push_str("\t\t\t}\n");
        }
        out.push_str("\t\t}\n\t}\n}\n");
    }
    out
}

/// Parse the material blocks of a script.
///
/// # Errors
/// [`Error::MaterialScript`] for unbalanced braces or a `material` line
/// without a name.
pub fn parse_materials(source: &str) -> Result<Vec<MaterialScript>> {
    let mut materials = Vec::new();
    let mut current: Option<MaterialScript> = None;
    let mut depth = 0usize;

    for (number, raw) in source.lines().enumerate() {
        let line_no = number + 1;
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("material") if depth == 0 => {
                let Some(name) = words.next() else {
                    return Err(Error::MaterialScript { line: line_no, reason: "material without a name".to_string() });
                };
                if let Some(done) = current.replace(MaterialScript::new(name)) {
                    materials.push(done);
                }
            }
            Some("texture") if current.is_some() => {
                if let (Some(material), Some(file)) = (current.as_mut(), words.next()) {
                    material.textures.push(file.to_string());
                }
            }
            _ => {}
        }

        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth = depth.checked_sub(1).ok_or_else(|| Error::MaterialScript {
                        line: line_no,
                        reason: "unmatched '}'".to_string(),
                    })?;
                    if depth == 0
                        && let Some(done) = current.take()
                    {
                        materials.push(done);
                    }
                }
                _ => {}
            }
        }
    }

    if depth != 0 {
        return Err(Error::MaterialScript {
            line: source.lines().count(),
            reason: format!("{depth} unclosed block(s) at end of script"),
        });
    }
    materials.extend(current);
    Ok(materials)
}

/// Read and parse a `.material` file.
///
/// # Errors
/// IO errors or [`Error::MaterialScript`], wrapped with the file path.
pub fn read_materials<P: AsRef<Path>>(path: P) -> Result<Vec<MaterialScript>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
    parse_materials(&source).map_err(|e| e.in_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_then_parse() {
        let materials = vec![
            MaterialScript { name: "Stone".into(), textures: vec!["stone_d.dds".into(), "stone_n.dds".into()] },
            MaterialScript::new("Plain"),
        ];
        let text = render_materials(&materials);
        assert!(text.starts_with("material Stone\n{"));
        assert_eq!(parse_materials(&text).unwrap(), materials);
    }

    #[test]
    fn test_parse_ignores_other_directives() {
        let text = "// exported by hand\n\
                    material Armor/Chest\n\
                    {\n\
                      receive_shadows on\n\
                      technique { pass { lighting off\n\
                        texture_unit { texture chest.dds // diffuse\n\
                        tex_address_mode clamp }\n\
                      } }\n\
                    }\n";
        let materials = parse_materials(text).unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, "Armor/Chest");
        assert_eq!(materials[0].textures, vec!["chest.dds".to_string()]);
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(parse_materials("material A\n{\n"), Err(Error::MaterialScript { .. })));
        assert!(matches!(parse_materials("}\n"), Err(Error::MaterialScript { line: 1, .. })));
    }
}
