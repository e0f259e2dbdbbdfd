//! Function signature descriptors
//!
//! A descriptor mirrors one native function's ABI signature bit-for-bit.
//! Descriptors are pure data with structural equality; a descriptor that
//! contradicts the actual native signature is a programmer error the
//! invoker fails loudly on, never a recoverable condition.

use super::types::ParamKind;

/// Signature of one native function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDescriptor {
    /// Exported symbol name
    pub name: String,
    /// Parameter kinds in declared order
    pub params: Vec<ParamKind>,
    /// Return kind (`Void` for procedures)
    pub ret: ParamKind,
}

impl SignatureDescriptor {
    /// Create a new descriptor.
    ///
    /// Panics if a parameter kind is `Void` or the return kind is not
    /// returnable; both are binding-setup programmer errors.
    pub fn new(name: impl Into<String>, params: Vec<ParamKind>, ret: ParamKind) -> Self {
        let name = name.into();
        for (i, p) in params.iter().enumerate() {
            assert!(
                p.valid_param(),
                "signature '{name}': parameter {i} may not be void"
            );
        }
        assert!(
            ret.valid_return(),
            "signature '{name}': {ret:?} is not a returnable kind"
        );
        Self { name, params, ret }
    }

    /// Descriptor of the two-argument integer operator callback shape:
    /// `(i32, i32) -> i32`.
    pub fn operator(name: impl Into<String>) -> Self {
        Self::new(name, vec![ParamKind::I32, ParamKind::I32], ParamKind::I32)
    }

    /// Descriptor of the three-way comparator callback shape:
    /// `(ptr, ptr) -> i32`, negative/zero/positive ordering.
    pub fn comparator(name: impl Into<String>) -> Self {
        Self::new(name, vec![ParamKind::Ptr, ParamKind::Ptr], ParamKind::I32)
    }

    /// Number of out-parameters in the signature
    pub fn out_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_out()).count()
    }
}
