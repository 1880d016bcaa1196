// Related implementations of a virtual method

use super::Relations;
use crate::entry::{Entry, EntryReference, MethodEntry};
use crate::index::IndexError;
use std::collections::HashSet;
use tracing::debug;

impl<'a> Relations<'a> {
    /// Every declaration a virtual call to `method` may dispatch to.
    ///
    /// Private and static methods only relate to themselves. Otherwise the
    /// closure starts at the inheritance base and follows overrides,
    /// interface implementations and bridges in both directions.
    pub fn related_implementations(
        &self,
        method: &MethodEntry,
    ) -> Result<HashSet<MethodEntry>, IndexError> {
        let access = self
            .index
            .access_flags(&Entry::Method(method.clone()))
            .ok_or_else(|| IndexError::UnknownMethod(method.clone()))?;

        let mut related = HashSet::new();
        if access.is_private() || access.is_static() {
            related.insert(method.clone());
            return Ok(related);
        }

        let hierarchy = self.index.hierarchy();
        let mut visited = HashSet::new();
        let mut pending = vec![self.find_base_method(method)];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            // Overrides live below, whether or not this level declares it
            for class in hierarchy
                .subclasses(&current.parent)
                .iter()
                .chain(hierarchy.implementers(&current.parent))
            {
                pending.push(current.with_owner(class.clone()));
            }

            let Some(flags) = self.index.access_flags(&Entry::Method(current.clone())) else {
                continue;
            };
            if flags.is_private() || flags.is_static() {
                continue;
            }
            related.insert(current.clone());

            for bridged in [self.index.bridged_method(&current), self.index.bridge_of(&current)]
                .into_iter()
                .flatten()
            {
                pending.push(self.find_base_method(bridged));
            }

            if !hierarchy.is_interface(&current.parent) {
                for interface in hierarchy.all_interfaces(&current.parent) {
                    let declared = current.with_owner(interface);
                    if self.index.contains_obf_method(&declared) {
                        pending.push(declared);
                    }
                }
            }
        }

        debug!("{} related implementations of {}", related.len(), method);
        Ok(related)
    }

    /// Callers of `method`; with `recurse`, callers of every related
    /// implementation as well. Direct callers of a method outside the jar
    /// are still listed, but recursing from one is an `UnknownMethod` error.
    pub fn methods_referencing(
        &self,
        method: &MethodEntry,
        recurse: bool,
    ) -> Result<Vec<EntryReference>, IndexError> {
        let targets = if recurse {
            self.related_implementations(method)?
        } else {
            HashSet::from([method.clone()])
        };

        let mut seen = HashSet::new();
        let mut references: Vec<EntryReference> = targets
            .iter()
            .flat_map(|target| self.index.methods_referencing(target))
            .filter(|reference| seen.insert(reference.clone()))
            .collect();
        references.sort_by_cached_key(|reference| reference.to_string());
        Ok(references)
    }
}
