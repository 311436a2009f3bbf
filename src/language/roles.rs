use crate::language::ast::Positional;
use std::{collections::BTreeMap, fmt};

/// Declared role of an image parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageRole {
    /// Read-only input image.
    Source,
    /// Write-only output image.
    Dest,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Source => f.write_str("source"),
            ImageRole::Dest => f.write_str("dest"),
        }
    }
}

/// Role assigned to an identifier by the variable classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarRole {
    Source,
    Dest,
    Positional(Positional),
    Constant,
    Local,
}

impl VarRole {
    pub fn image_role(self) -> Option<ImageRole> {
        match self {
            VarRole::Source => Some(ImageRole::Source),
            VarRole::Dest => Some(ImageRole::Dest),
            _ => None,
        }
    }
}

impl From<ImageRole> for VarRole {
    fn from(role: ImageRole) -> Self {
        match role {
            ImageRole::Source => VarRole::Source,
            ImageRole::Dest => VarRole::Dest,
        }
    }
}

/// Identifier name to role, ordered by name so downstream passes are deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VarRoles {
    roles: BTreeMap<String, VarRole>,
}

impl VarRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<VarRole> {
        self.roles.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, role: VarRole) {
        self.roles.insert(name.into(), role);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Every image the script works with, inferred sources included.
    pub fn images(&self) -> impl Iterator<Item = (&str, ImageRole)> {
        self.roles
            .iter()
            .filter_map(|(name, role)| role.image_role().map(|r| (name.as_str(), r)))
    }

    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .filter(|(_, role)| **role == VarRole::Local)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VarRole)> {
        self.roles.iter().map(|(name, role)| (name.as_str(), *role))
    }
}
