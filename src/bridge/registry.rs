//! Binding registry
//!
//! Owns signature descriptors for the life of the process. Registration
//! is first-write-wins per name; re-registering a conflicting descriptor
//! is a binding-setup programmer error and fails loudly.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::signature::SignatureDescriptor;
use super::types::{CStrOwnership, ParamKind};

/// Process-lifetime owner of signature descriptors
#[derive(Default)]
pub struct BindingRegistry {
    inner: RwLock<HashMap<String, SignatureDescriptor>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its function name.
    ///
    /// Registering the identical descriptor again is a no-op; a
    /// conflicting descriptor under the same name panics.
    pub fn register(&self, desc: SignatureDescriptor) {
        let mut map = self.inner.write();
        match map.get(&desc.name) {
            Some(existing) if *existing != desc => panic!(
                "binding '{}' re-registered with a conflicting signature",
                desc.name
            ),
            Some(_) => {}
            None => {
                map.insert(desc.name.clone(), desc);
            }
        }
    }

    /// Descriptor registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<SignatureDescriptor> {
        self.inner.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

fn cstr() -> ParamKind {
    ParamKind::CStr(CStrOwnership::Borrowed)
}

/// Canonical descriptors for the fixed-shape fixture functions.
///
/// Array-taking fixture functions carry their buffer length in the
/// descriptor, which is call-time data; they get the constructor
/// functions below instead of registry entries.
pub fn fixture_registry() -> &'static BindingRegistry {
    static REGISTRY: Lazy<BindingRegistry> = Lazy::new(|| {
        let r = BindingRegistry::new();
        r.register(SignatureDescriptor::new(
            "add_i32",
            vec![ParamKind::I32, ParamKind::I32],
            ParamKind::I32,
        ));
        r.register(SignatureDescriptor::new(
            "add_u64",
            vec![ParamKind::U64, ParamKind::U64],
            ParamKind::U64,
        ));
        r.register(SignatureDescriptor::new(
            "mul_f32",
            vec![ParamKind::F32, ParamKind::F32],
            ParamKind::F32,
        ));
        r.register(SignatureDescriptor::new(
            "mul_f64",
            vec![ParamKind::F64, ParamKind::F64],
            ParamKind::F64,
        ));
        r.register(SignatureDescriptor::new(
            "str_length",
            vec![cstr()],
            ParamKind::I32,
        ));
        r.register(SignatureDescriptor::new(
            "echo_string",
            vec![cstr()],
            cstr(),
        ));
        r.register(SignatureDescriptor::new("print_hello", vec![], ParamKind::Void));
        r.register(SignatureDescriptor::new(
            "get_version",
            vec![
                ParamKind::OutParam(Box::new(ParamKind::I32)),
                ParamKind::OutParam(Box::new(ParamKind::I32)),
            ],
            ParamKind::Void,
        ));
        r.register(SignatureDescriptor::new(
            "out_echo_string",
            vec![cstr(), ParamKind::OutCStr],
            ParamKind::Void,
        ));
        r.register(SignatureDescriptor::new(
            "apply_i32",
            vec![
                ParamKind::I32,
                ParamKind::I32,
                ParamKind::Callback(Box::new(SignatureDescriptor::operator("op"))),
            ],
            ParamKind::I32,
        ));
        r
    });
    &REGISTRY
}

/// `sum_i32_array(arr, len) -> i32` for a call-time buffer length
pub fn sum_i32_array_sig(len: usize) -> SignatureDescriptor {
    SignatureDescriptor::new(
        "sum_i32_array",
        vec![
            ParamKind::Array(Box::new(ParamKind::I32), len),
            ParamKind::USize,
        ],
        ParamKind::I32,
    )
}

/// `fill_seq_i32(out, len)` for a call-time buffer length
pub fn fill_seq_i32_sig(len: usize) -> SignatureDescriptor {
    SignatureDescriptor::new(
        "fill_seq_i32",
        vec![
            ParamKind::OutArray(Box::new(ParamKind::I32), len),
            ParamKind::USize,
        ],
        ParamKind::Void,
    )
}

/// `sort_i32_copy(in, out, len, compar)` for a call-time buffer length
pub fn sort_i32_copy_sig(len: usize) -> SignatureDescriptor {
    SignatureDescriptor::new(
        "sort_i32_copy",
        vec![
            ParamKind::Array(Box::new(ParamKind::I32), len),
            ParamKind::OutArray(Box::new(ParamKind::I32), len),
            ParamKind::USize,
            ParamKind::Callback(Box::new(SignatureDescriptor::comparator("compar"))),
        ],
        ParamKind::Void,
    )
}
