//! Recovers the located inputs and outputs of a compiled shader's `main`
//! entry point through naga's SPIR-V frontend.

use naga::{front::spv, Binding, Module, TypeInner};
use thiserror::Error;

const ENTRY_NAME: &str = "main";

#[derive(Error, Debug, PartialEq)]
pub enum ReflectError {
    #[error("SPIR-V parse error: {0}")]
    Parse(String),
    #[error("no `{}` entry point", ENTRY_NAME)]
    MissingEntryPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub location: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interface {
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
}

impl Interface {
    pub fn parse(words: &[u32]) -> Result<Self, ReflectError> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes().to_vec()).collect();
        let module = spv::parse_u8_slice(&bytes, &spv::Options::default())
            .map_err(|e| ReflectError::Parse(format!("{:?}", e)))?;
        Self::from_module(&module)
    }

    fn from_module(module: &Module) -> Result<Self, ReflectError> {
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == ENTRY_NAME)
            .ok_or(ReflectError::MissingEntryPoint)?;
        let function = &entry.function;

        let mut interface = Interface::default();
        for arg in &function.arguments {
            if let Some(location) = location_of(&arg.binding) {
                interface.inputs.push(Variable {
                    name: arg.name.clone().unwrap_or_default(),
                    location,
                });
            }
        }

        if let Some(result) = &function.result {
            match &module.types[result.ty].inner {
                TypeInner::Struct { members, .. } if result.binding.is_none() => {
                    for member in members {
                        if let Some(location) = location_of(&member.binding) {
                            interface.outputs.push(Variable {
                                name: member.name.clone().unwrap_or_default(),
                                location,
                            });
                        }
                    }
                }
                _ => {
                    if let Some(location) = location_of(&result.binding) {
                        interface.outputs.push(Variable {
                            name: String::new(),
                            location,
                        });
                    }
                }
            }
        }

        interface.inputs.sort_by_key(|v| v.location);
        interface.outputs.sort_by_key(|v| v.location);
        Ok(interface)
    }

    pub fn input(&self, name: &str) -> Option<&Variable> {
        self.inputs.iter().find(|v| v.name == name)
    }

    pub fn output_at(&self, location: u32) -> Option<&Variable> {
        self.outputs.iter().find(|v| v.location == location)
    }
}

fn location_of(binding: &Option<Binding>) -> Option<u32> {
    match binding {
        Some(Binding::Location { location, .. }) => Some(*location),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{FRAGMENT_SOURCE, VERTEX_SOURCE};

    fn compile(source: &str, ty: glsl_to_spirv::ShaderType) -> Vec<u32> {
        let file = glsl_to_spirv::compile(source, ty).unwrap();
        gfx_hal::pso::read_spirv(file).unwrap()
    }

    #[test]
    fn vertex_interface_has_both_attributes() {
        let words = compile(VERTEX_SOURCE, glsl_to_spirv::ShaderType::Vertex);
        let interface = Interface::parse(&words).unwrap();

        assert_eq!(interface.input("inPosition").unwrap().location, 0);
        assert_eq!(interface.input("inColor").unwrap().location, 1);
        assert_eq!(interface.inputs.len(), 2);
        assert!(interface.input("matrix").is_none());
    }

    #[test]
    fn builtin_position_is_not_a_located_output() {
        let words = compile(VERTEX_SOURCE, glsl_to_spirv::ShaderType::Vertex);
        let interface = Interface::parse(&words).unwrap();

        assert_eq!(interface.outputs.len(), 1);
        assert!(interface.output_at(0).is_some());
    }

    #[test]
    fn fragment_reads_location_zero() {
        let words = compile(FRAGMENT_SOURCE, glsl_to_spirv::ShaderType::Fragment);
        let interface = Interface::parse(&words).unwrap();

        assert_eq!(interface.inputs.len(), 1);
        assert_eq!(interface.inputs[0].location, 0);
        assert_eq!(interface.outputs.len(), 1);
    }

    #[test]
    fn rejects_non_spirv_words() {
        match Interface::parse(&[0xdead_beef, 0, 0, 0, 0]) {
            Err(ReflectError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
