// Bridge method detection

use super::JarIndex;
use crate::entry::MethodEntry;

const OBJECT_DESC: &str = "Ljava/lang/Object;";

/// Find (bridge, target) pairs among the synthetic methods of the index.
///
/// A synthetic method is a candidate when it calls exactly one distinct
/// method; [`is_bridged_method`] decides whether that call is a bridge.
pub(super) fn detect_bridges(index: &JarIndex) -> Vec<(MethodEntry, MethodEntry)> {
    let mut candidates: Vec<&MethodEntry> = index.synthetic_methods.iter().collect();
    candidates.sort();

    candidates
        .into_iter()
        .filter_map(|synthetic| {
            let mut called = index.methods_called_by(synthetic);
            if called.len() != 1 {
                return None;
            }
            let target = called.remove(0);
            is_bridged_method(index, &target, synthetic).then(|| (synthetic.clone(), target))
        })
        .collect()
}

/// Does `access` forward to `called` only to adapt its return type?
fn is_bridged_method(index: &JarIndex, called: &MethodEntry, access: &MethodEntry) -> bool {
    // Same name and arity, though the descriptors themselves differ
    if called.name != access.name || called.desc.argument_count() != access.desc.argument_count() {
        return false;
    }

    let access_return = access.desc.return_desc();
    let called_return = called.desc.return_desc();
    if called_return.is_void()
        || called_return.is_primitive()
        || access_return.is_void()
        || access_return.is_primitive()
    {
        return false;
    }

    if access_return == called_return {
        return false;
    }

    // Erased to Object by a generic signature
    if access_return.as_str() == OBJECT_DESC {
        return true;
    }

    // Narrowed to a subtype of the declared bound (covariant return)
    match (called_return.type_entry(), access_return.type_entry()) {
        (Some(called_type), Some(access_type)) => index
            .hierarchy
            .ancestry(&called_type)
            .contains(&access_type),
        _ => false,
    }
}
