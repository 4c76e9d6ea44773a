use crate::error::Error;
use gfx_hal::pso;
use log::debug;
use std::fmt;

mod reflect;

use reflect::Interface;

pub const POSITION_ATTRIBUTE: &str = "inPosition";
pub const COLOR_ATTRIBUTE: &str = "inColor";

pub const SHADING_LANGUAGE: &str = "GLSL 450 -> SPIR-V";

pub const VERTEX_SOURCE: &str = r#"#version 450
layout(location = 0) in vec3 inPosition;
layout(location = 1) in vec3 inColor;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(inColor, 1.0);
    gl_Position = vec4(inPosition, 1.0);
}
"#;

pub const FRAGMENT_SOURCE: &str = r#"#version 450
layout(location = 0) in vec4 outColor;
layout(location = 0) out vec4 fragColor;

void main() {
    fragColor = outColor;
}
"#;

/// Longest diagnostic kept from the compiler or linker, in bytes.
pub const INFO_LOG_CAPACITY: usize = 255;

/// Compiler or linker diagnostics, cut at `INFO_LOG_CAPACITY`.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoLog(String);

impl InfoLog {
    pub fn new(text: &str) -> Self {
        let text = text.trim_end();
        let mut end = text.len().min(INFO_LOG_CAPACITY);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        InfoLog(text[..end].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfoLog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderKind::Vertex => f.write_str("vertex"),
            ShaderKind::Fragment => f.write_str("fragment"),
        }
    }
}

impl From<ShaderKind> for glsl_to_spirv::ShaderType {
    fn from(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Vertex => glsl_to_spirv::ShaderType::Vertex,
            ShaderKind::Fragment => glsl_to_spirv::ShaderType::Fragment,
        }
    }
}

/// One compiled pipeline stage.
#[derive(Debug)]
pub struct ShaderStage {
    pub kind: ShaderKind,
    pub spirv: Vec<u32>,
    interface: Interface,
}

impl ShaderStage {
    pub fn compile(kind: ShaderKind, source: &str) -> Result<Self, Error> {
        let failed = |log: &str| Error::Compile {
            stage: kind,
            log: InfoLog::new(log),
        };

        let file = glsl_to_spirv::compile(source, kind.into()).map_err(|log| failed(&log))?;
        let spirv = pso::read_spirv(file).map_err(|err| failed(&err.to_string()))?;
        let interface = Interface::parse(&spirv).map_err(|err| failed(&err.to_string()))?;
        debug!("{} shader interface: {:?}", kind, interface);

        Ok(ShaderStage {
            kind,
            spirv,
            interface,
        })
    }
}

/// A vertex and fragment stage whose interfaces agree.
#[derive(Debug)]
pub struct Program {
    pub vertex: ShaderStage,
    pub fragment: ShaderStage,
}

impl Program {
    pub fn link(vertex: ShaderStage, fragment: ShaderStage) -> Result<Self, Error> {
        let failed = |message: String| Error::Link(InfoLog::new(&message));

        if vertex.kind != ShaderKind::Vertex || fragment.kind != ShaderKind::Fragment {
            return Err(failed(format!(
                "expected vertex and fragment stages, got {} and {}",
                vertex.kind, fragment.kind
            )));
        }

        for input in &fragment.interface.inputs {
            if vertex.interface.output_at(input.location).is_none() {
                return Err(failed(format!(
                    "fragment input `{}` at location {} is not written by the vertex stage",
                    input.name, input.location
                )));
            }
        }

        for name in &[POSITION_ATTRIBUTE, COLOR_ATTRIBUTE] {
            if vertex.interface.input(name).is_none() {
                return Err(failed(format!("attribute `{}` is not an active input", name)));
            }
        }

        Ok(Program { vertex, fragment })
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.vertex.interface.input(name).map(|v| v.location)
    }
}

/// Compiles and links the embedded quad shaders.
pub fn build_program() -> Result<Program, Error> {
    let vertex = ShaderStage::compile(ShaderKind::Vertex, VERTEX_SOURCE)?;
    let fragment = ShaderStage::compile(ShaderKind::Fragment, FRAGMENT_SOURCE)?;
    Program::link(vertex, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_log_is_truncated() {
        let long = "x".repeat(1000);
        let log = InfoLog::new(&long);
        assert_eq!(log.as_str().len(), INFO_LOG_CAPACITY);

        let short = InfoLog::new("ERROR: 0:3: '' : syntax error\n");
        assert_eq!(short.to_string(), "ERROR: 0:3: '' : syntax error");
    }

    #[test]
    fn info_log_truncates_on_char_boundary() {
        let text = format!("{}é", "a".repeat(INFO_LOG_CAPACITY - 1));
        let log = InfoLog::new(&text);
        assert_eq!(log.as_str().len(), INFO_LOG_CAPACITY - 1);
    }

    #[test]
    fn embedded_shaders_link() {
        let program = build_program().unwrap();
        assert_eq!(program.attribute_location(POSITION_ATTRIBUTE), Some(0));
        assert_eq!(program.attribute_location(COLOR_ATTRIBUTE), Some(1));
        assert_eq!(program.attribute_location("matrix"), None);
    }

    #[test]
    fn broken_vertex_source_fails_to_compile() {
        let broken = VERTEX_SOURCE.replace("void main()", "void main(");
        match ShaderStage::compile(ShaderKind::Vertex, &broken) {
            Err(err @ Error::Compile { .. }) => assert_eq!(err.exit_code(), 1),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn broken_fragment_source_fails_to_compile() {
        let broken = FRAGMENT_SOURCE.replace("fragColor = outColor;", "fragColor = ;");
        match ShaderStage::compile(ShaderKind::Fragment, &broken) {
            Err(Error::Compile { stage, log }) => {
                assert_eq!(stage, ShaderKind::Fragment);
                assert!(log.as_str().len() <= INFO_LOG_CAPACITY);
            }
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn mismatched_interface_fails_to_link() {
        let vertex = ShaderStage::compile(ShaderKind::Vertex, VERTEX_SOURCE).unwrap();
        let fragment_source = FRAGMENT_SOURCE.replace(
            "layout(location = 0) in vec4 outColor;",
            "layout(location = 3) in vec4 outColor;",
        );
        let fragment = ShaderStage::compile(ShaderKind::Fragment, &fragment_source).unwrap();

        match Program::link(vertex, fragment) {
            Err(err @ Error::Link(_)) => assert_eq!(err.exit_code(), 1),
            other => panic!("expected link error, got {:?}", other),
        }
    }

    #[test]
    fn renamed_attribute_fails_to_link() {
        let vertex_source = VERTEX_SOURCE.replace("inColor", "inColour");
        let vertex = ShaderStage::compile(ShaderKind::Vertex, &vertex_source).unwrap();
        let fragment = ShaderStage::compile(ShaderKind::Fragment, FRAGMENT_SOURCE).unwrap();

        match Program::link(vertex, fragment) {
            Err(Error::Link(log)) => assert!(log.as_str().contains(COLOR_ATTRIBUTE)),
            other => panic!("expected link error, got {:?}", other),
        }
    }

    #[test]
    fn stages_in_wrong_order_fail_to_link() {
        let vertex = ShaderStage::compile(ShaderKind::Vertex, VERTEX_SOURCE).unwrap();
        let fragment = ShaderStage::compile(ShaderKind::Fragment, FRAGMENT_SOURCE).unwrap();
        assert!(Program::link(fragment, vertex).is_err());
    }
}
