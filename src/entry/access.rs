// JVM access flags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Access flag bitset as stored in the class file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const PUBLIC: AccessFlags = AccessFlags(0x0001);
    pub const PRIVATE: AccessFlags = AccessFlags(0x0002);
    pub const PROTECTED: AccessFlags = AccessFlags(0x0004);
    pub const STATIC: AccessFlags = AccessFlags(0x0008);
    pub const FINAL: AccessFlags = AccessFlags(0x0010);
    pub const SUPER: AccessFlags = AccessFlags(0x0020);
    pub const SYNCHRONIZED: AccessFlags = AccessFlags(0x0020);
    pub const BRIDGE: AccessFlags = AccessFlags(0x0040);
    pub const VARARGS: AccessFlags = AccessFlags(0x0080);
    pub const NATIVE: AccessFlags = AccessFlags(0x0100);
    pub const INTERFACE: AccessFlags = AccessFlags(0x0200);
    pub const ABSTRACT: AccessFlags = AccessFlags(0x0400);
    pub const SYNTHETIC: AccessFlags = AccessFlags(0x1000);
    pub const ANNOTATION: AccessFlags = AccessFlags(0x2000);
    pub const ENUM: AccessFlags = AccessFlags(0x4000);

    const VISIBILITY_MASK: u16 = 0x0007;

    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, other: AccessFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub fn is_protected(&self) -> bool {
        self.contains(Self::PROTECTED)
    }

    pub fn is_package_private(&self) -> bool {
        self.0 & Self::VISIBILITY_MASK == 0
    }

    pub fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_synthetic(&self) -> bool {
        self.contains(Self::SYNTHETIC)
    }

    pub fn is_bridge(&self) -> bool {
        self.contains(Self::BRIDGE)
    }

    pub fn is_interface(&self) -> bool {
        self.contains(Self::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub fn is_enum(&self) -> bool {
        self.contains(Self::ENUM)
    }

    pub fn is_annotation(&self) -> bool {
        self.contains(Self::ANNOTATION)
    }

    /// Replace the visibility bits, keeping everything else
    pub fn with_visibility(self, visibility: AccessFlags) -> Self {
        Self((self.0 & !Self::VISIBILITY_MASK) | (visibility.0 & Self::VISIBILITY_MASK))
    }
}

impl BitOr for AccessFlags {
    type Output = AccessFlags;

    fn bitor(self, rhs: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visibility = if self.is_public() {
            "public"
        } else if self.is_protected() {
            "protected"
        } else if self.is_private() {
            "private"
        } else {
            "package"
        };
        write!(f, "{}", visibility)?;
        if self.is_static() {
            write!(f, " static")?;
        }
        if self.is_synthetic() {
            write!(f, " synthetic")?;
        }
        Ok(())
    }
}
