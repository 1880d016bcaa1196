// JVM field and method descriptors

use super::ClassEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A field type descriptor such as `I`, `[J` or `Ljava/lang/String;`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeDescriptor(String);

impl TypeDescriptor {
    pub fn new(desc: impl Into<String>) -> Self {
        Self(desc.into())
    }

    fn from_parsed(parsed: &jdescriptor::TypeDescriptor) -> Self {
        Self(descriptor_string(parsed))
    }

    /// Descriptor for an object type with the given internal name
    pub fn of_class(class: &ClassEntry) -> Self {
        Self(format!("L{};", class.full_name()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_void(&self) -> bool {
        self.0 == "V"
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.0.as_str(),
            "Z" | "B" | "C" | "S" | "I" | "J" | "F" | "D"
        )
    }

    pub fn is_array(&self) -> bool {
        self.0.starts_with('[')
    }

    /// True for a plain object type (not an array, not a primitive)
    pub fn is_type(&self) -> bool {
        self.0.starts_with('L') && self.0.ends_with(';')
    }

    /// The class named by an object type or by the element type of an array
    pub fn type_entry(&self) -> Option<ClassEntry> {
        let element = self.0.trim_start_matches('[');
        element
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .map(ClassEntry::new)
    }

    /// Rewrite every class name embedded in this descriptor
    pub fn remap<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        Self(remap_class_names(&self.0, &mut f))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A method descriptor such as `(ILjava/lang/Object;)V`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodDescriptor(String);

impl MethodDescriptor {
    pub fn new(desc: impl Into<String>) -> Self {
        Self(desc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parsed(&self) -> Option<jdescriptor::MethodDescriptor> {
        jdescriptor::MethodDescriptor::from_str(&self.0).ok()
    }

    /// Argument types in declaration order, empty for a malformed descriptor
    pub fn arguments(&self) -> Vec<TypeDescriptor> {
        self.parsed()
            .map(|desc| desc.parameter_types().iter().map(TypeDescriptor::from_parsed).collect())
            .unwrap_or_default()
    }

    pub fn argument_count(&self) -> usize {
        self.parsed().map_or(0, |desc| desc.parameter_types().len())
    }

    pub fn return_desc(&self) -> TypeDescriptor {
        self.parsed()
            .map(|desc| TypeDescriptor::from_parsed(desc.return_type()))
            .unwrap_or_else(|| TypeDescriptor::new("V"))
    }

    pub fn remap<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        Self(remap_class_names(&self.0, &mut f))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn descriptor_string(parsed: &jdescriptor::TypeDescriptor) -> String {
    use jdescriptor::TypeDescriptor as Parsed;

    match parsed {
        Parsed::Byte => "B".to_string(),
        Parsed::Char => "C".to_string(),
        Parsed::Double => "D".to_string(),
        Parsed::Float => "F".to_string(),
        Parsed::Int => "I".to_string(),
        Parsed::Long => "J".to_string(),
        Parsed::Short => "S".to_string(),
        Parsed::Boolean => "Z".to_string(),
        Parsed::Void => "V".to_string(),
        Parsed::Object(name) => format!("L{};", name),
        Parsed::Array(element, dims) => {
            format!("{}{}", "[".repeat(*dims as usize), descriptor_string(element))
        }
    }
}

fn remap_class_names<F>(desc: &str, f: &mut F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    while let Some(start) = rest.find('L') {
        let prefix = &rest[..start];
        out.push_str(prefix);
        let after = &rest[start + 1..];
        match after.find(';') {
            Some(end) => {
                out.push('L');
                out.push_str(&f(&after[..end]));
                out.push(';');
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
