//! Shader compile/link checks and one-time binding resolution.
//!
//! The WGSL source is parsed and validated with naga before wgpu ever sees
//! it, so compile and link failures surface as typed errors instead of a
//! device panic. Every name the render step needs is resolved here once and
//! cached in [`ShaderBindings`].

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Module, ShaderStage, TypeInner};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const PARALLAX_WGSL: &str = include_str!("shaders/parallax.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub const IMAGE_TEXTURE: &str = "u_image";
pub const DEPTH_TEXTURE: &str = "u_map";
pub const SAMPLER: &str = "u_sampler";
pub const POINTER_UNIFORM: &str = "u_pointer";
pub const COVER_UNIFORM: &str = "u_cover";
pub const POSITION_ATTRIBUTE: &str = "position";
pub const TEX_COORD_ATTRIBUTE: &str = "tex_coord";

/// Binding slot index inside bind group 0.
pub type Slot = u32;

/// All resource and attribute locations the pipeline uses.
///
/// `cover` is optional: without it the shader samples with the identity
/// window and cover uploads are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBindings {
    pub image: Slot,
    pub depth_map: Slot,
    pub sampler: Slot,
    pub pointer: Slot,
    pub cover: Option<Slot>,
    pub position_location: u32,
    pub tex_coord_location: u32,
}

/// A parsed, validated shader together with its resolved bindings.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    source: String,
    bindings: ShaderBindings,
}

impl CompiledShader {
    /// The built-in parallax shader.
    pub fn parallax() -> Result<Self> {
        compile(PARALLAX_WGSL)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bindings(&self) -> &ShaderBindings {
        &self.bindings
    }
}

/// Parse, validate and reflect a WGSL program.
pub fn compile(source: &str) -> Result<CompiledShader> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| Error::ShaderCompile(err.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| Error::ProgramLink(err.emit_to_string(source)))?;

    for (name, stage) in [
        (VERTEX_ENTRY, ShaderStage::Vertex),
        (FRAGMENT_ENTRY, ShaderStage::Fragment),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage);
        if !found {
            return Err(Error::ProgramLink(format!(
                "missing {stage:?} entry point `{name}`"
            )));
        }
    }

    let bindings = reflect(&module)?;
    debug!(?bindings, "shader bindings resolved");
    Ok(CompiledShader {
        source: source.to_owned(),
        bindings,
    })
}

fn reflect(module: &Module) -> Result<ShaderBindings> {
    let cover = match resource_slot(module, COVER_UNIFORM)? {
        Some(slot) => Some(slot),
        None => {
            warn!(
                binding = COVER_UNIFORM,
                "optional uniform absent; cover fit disabled"
            );
            None
        }
    };
    Ok(ShaderBindings {
        image: required(resource_slot(module, IMAGE_TEXTURE)?, IMAGE_TEXTURE)?,
        depth_map: required(resource_slot(module, DEPTH_TEXTURE)?, DEPTH_TEXTURE)?,
        sampler: required(resource_slot(module, SAMPLER)?, SAMPLER)?,
        pointer: required(resource_slot(module, POINTER_UNIFORM)?, POINTER_UNIFORM)?,
        cover,
        position_location: required(
            vertex_location(module, POSITION_ATTRIBUTE),
            POSITION_ATTRIBUTE,
        )?,
        tex_coord_location: required(
            vertex_location(module, TEX_COORD_ATTRIBUTE),
            TEX_COORD_ATTRIBUTE,
        )?,
    })
}

fn required<T>(found: Option<T>, name: &'static str) -> Result<T> {
    found.ok_or(Error::BindingLookup(name))
}

fn resource_slot(module: &Module, name: &str) -> Result<Option<Slot>> {
    let Some(var) = module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .find(|var| var.name.as_deref() == Some(name))
    else {
        return Ok(None);
    };
    match var.binding.as_ref() {
        Some(rb) if rb.group == 0 => Ok(Some(rb.binding)),
        Some(rb) => Err(Error::ProgramLink(format!(
            "`{name}` is bound in group {}; only group 0 is supported",
            rb.group
        ))),
        None => Ok(None),
    }
}

fn vertex_location(module: &Module, name: &str) -> Option<u32> {
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == VERTEX_ENTRY && ep.stage == ShaderStage::Vertex)?;

    for arg in &entry.function.arguments {
        if arg.name.as_deref() == Some(name) {
            if let Some(Binding::Location { location, .. }) = arg.binding {
                return Some(location);
            }
        }
        // vertex inputs declared as a struct
        if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
            for member in members {
                if member.name.as_deref() == Some(name) {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        return Some(location);
                    }
                }
            }
        }
    }
    None
}
