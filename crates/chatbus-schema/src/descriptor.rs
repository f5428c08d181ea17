//! Static interface descriptors.
//!
//! A descriptor is built once as a `static` and shared read-only by every handler.
//! It drives argument decoding in the bus layer, the access checks of the property
//! accessor, and the introspection document.

use crate::identity::INTERFACE_NAME;
use crate::value::ArgType;
use crate::SchemaError;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
    pub name: &'static str,
    pub ty: ArgType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: &'static str,
    pub inputs: &'static [Arg],
    pub outputs: &'static [Arg],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec {
    pub name: &'static str,
    pub args: &'static [Arg],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }

    /// Spelling used by the introspection format.
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ReadWrite => "readwrite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub access: Access,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    pub methods: &'static [MethodSpec],
    pub signals: &'static [SignalSpec],
    pub properties: &'static [PropertySpec],
}

impl InterfaceDescriptor {
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn signal(&self, name: &str) -> Option<&SignalSpec> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Reject empty or duplicated member names within each member kind.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.check_names("method", self.methods.iter().map(|m| m.name))?;
        self.check_names("signal", self.signals.iter().map(|s| s.name))?;
        self.check_names("property", self.properties.iter().map(|p| p.name))
    }

    fn check_names<'a>(
        &self,
        kind: &'static str,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() {
                return Err(SchemaError::EmptyMember {
                    interface: self.name.to_owned(),
                    kind,
                });
            }
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateMember {
                    interface: self.name.to_owned(),
                    kind,
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// The one interface chatbus exports.
pub static TEST_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: INTERFACE_NAME,
    methods: &[
        MethodSpec {
            name: "Login",
            inputs: &[Arg {
                name: "greeting",
                ty: ArgType::Str,
            }],
            outputs: &[Arg {
                name: "response",
                ty: ArgType::Str,
            }],
        },
        MethodSpec {
            name: "SendMsg",
            inputs: &[Arg {
                name: "msg",
                ty: ArgType::Str,
            }],
            outputs: &[],
        },
    ],
    signals: &[SignalSpec {
        name: "MsgNotification",
        args: &[
            Arg {
                name: "sender",
                ty: ArgType::Str,
            },
            Arg {
                name: "msg",
                ty: ArgType::Str,
            },
        ],
    }],
    properties: &[PropertySpec {
        name: "Title",
        ty: ArgType::Str,
        access: Access::ReadWrite,
    }],
};
