//! Test suite for the bridge internals

use super::marshal::{self, MarshalError, NativeArg, OutSlot};
use super::*;

use core::ffi::c_void;

// Test helpers
extern "C" fn local_add(a: i32, b: i32) -> i32 {
    a + b
}

extern "C" fn forty_two() -> i32 {
    42
}

#[test]
fn test_param_kind_predicates() {
    assert!(ParamKind::I32.is_scalar());
    assert!(ParamKind::F64.is_scalar());
    assert!(!ParamKind::Ptr.is_scalar());
    assert!(!ParamKind::I32.tolerates_null());
    assert!(ParamKind::CStr(CStrOwnership::Borrowed).tolerates_null());
    assert!(ParamKind::Array(Box::new(ParamKind::I32), 3).tolerates_null());
    assert!(ParamKind::OutParam(Box::new(ParamKind::I32)).tolerates_null());
    assert!(ParamKind::OutCStr.is_out());
    assert!(!ParamKind::Void.valid_param());
    assert!(ParamKind::Void.valid_return());
    assert!(!ParamKind::OutCStr.valid_return());
}

#[test]
fn test_descriptor_structural_equality() {
    let a = SignatureDescriptor::new("f", vec![ParamKind::I32], ParamKind::Void);
    let b = SignatureDescriptor::new("f", vec![ParamKind::I32], ParamKind::Void);
    let c = SignatureDescriptor::new("f", vec![ParamKind::U64], ParamKind::Void);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
#[should_panic(expected = "may not be void")]
fn test_descriptor_rejects_void_param() {
    SignatureDescriptor::new("bad", vec![ParamKind::Void], ParamKind::Void);
}

#[test]
fn test_nul_terminated_plain() {
    assert_eq!(marshal::nul_terminated(b"abc"), b"abc\0");
    assert_eq!(marshal::nul_terminated(b""), b"\0");
}

#[test]
fn test_nul_terminated_truncates_at_embedded_nul() {
    // Bytes past the embedded NUL are dropped, matching native semantics
    assert_eq!(marshal::nul_terminated(b"ab\0cd"), b"ab\0");
}

#[test]
fn test_decode_non_utf8_preserves_bytes() {
    let raw: &[u8] = b"\xffok\xfe";
    let p = unsafe { libc::malloc(raw.len() + 1) } as *mut u8;
    unsafe {
        core::ptr::copy_nonoverlapping(raw.as_ptr(), p, raw.len());
        *p.add(raw.len()) = 0;
    }
    let (value, handle) = marshal::decode_owned_cstr(p as *mut std::os::raw::c_char);
    assert_eq!(value, Value::Bytes(raw.to_vec()));
    handle.expect("release obligation").release();
}

#[test]
fn test_encode_scalars_width_preserving() {
    let (a, s) = marshal::encode(0, &ParamKind::I32, &Value::I32(-7)).unwrap();
    assert!(matches!(a, NativeArg::I32(-7)));
    assert!(s.is_none());

    let (a, _) = marshal::encode(0, &ParamKind::U64, &Value::U64(u64::MAX)).unwrap();
    assert!(matches!(a, NativeArg::U64(u64::MAX)));

    let (a, _) = marshal::encode(0, &ParamKind::F32, &Value::F32(1.5)).unwrap();
    match a {
        NativeArg::F32(v) => assert_eq!(v.to_bits(), 1.5f32.to_bits()),
        other => panic!("unexpected encoding {other:?}"),
    }
}

#[test]
fn test_encode_null_for_scalar_rejected() {
    let err = marshal::encode(2, &ParamKind::I32, &Value::Null).unwrap_err();
    assert_eq!(err, MarshalError::NullNotAllowed { index: 2 });
}

#[test]
fn test_encode_array_length_mismatch() {
    let kind = ParamKind::Array(Box::new(ParamKind::I32), 3);
    let err = marshal::encode(
        1,
        &kind,
        &Value::Array(vec![Value::I32(1), Value::I32(2)]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        MarshalError::LengthMismatch {
            index: 1,
            expected: 3,
            actual: 2
        }
    );
}

#[test]
fn test_encode_null_array_is_null_pointer() {
    let kind = ParamKind::Array(Box::new(ParamKind::I32), 3);
    let (a, s) = marshal::encode(0, &kind, &Value::Null).unwrap();
    match a {
        NativeArg::Ptr(p) => assert!(p.is_null()),
        other => panic!("unexpected encoding {other:?}"),
    }
    assert!(s.is_none());
}

#[test]
fn test_out_slot_roundtrip() {
    let mut slot = OutSlot::for_kind(&ParamKind::I32);
    let p = slot.as_ptr() as *mut i32;
    unsafe { *p = 42 };
    let (value, handle) = slot.decode();
    assert_eq!(value, Value::I32(42));
    assert!(handle.is_none());
}

#[test]
fn test_decode_null_cstr_is_absent() {
    let (value, handle) = marshal::decode_owned_cstr(core::ptr::null_mut());
    assert_eq!(value, Value::Null);
    assert!(handle.is_none());
}

#[test]
fn test_invoke_nullary() {
    let desc = SignatureDescriptor::new("forty_two", vec![], ParamKind::I32);
    let entry = EntryPoint::new(forty_two as *const c_void);
    let result = invoke(entry, &desc, &[]).unwrap();
    assert_eq!(result.ret, Value::I32(42));
}

#[test]
fn test_invoke_scalar_binary() {
    let desc = SignatureDescriptor::new("local_add", vec![ParamKind::I32, ParamKind::I32], ParamKind::I32);
    let entry = EntryPoint::new(local_add as *const c_void);
    let result = invoke(
        entry,
        &desc,
        &[CallArg::Value(Value::I32(2)), CallArg::Value(Value::I32(40))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(42));
}

#[test]
#[should_panic(expected = "arguments supplied")]
fn test_invoke_arg_count_mismatch_is_fatal() {
    let desc = SignatureDescriptor::new("local_add", vec![ParamKind::I32, ParamKind::I32], ParamKind::I32);
    let entry = EntryPoint::new(local_add as *const c_void);
    let _ = invoke(entry, &desc, &[CallArg::Value(Value::I32(2))]);
}

#[test]
fn test_operator_trampoline_roundtrip() {
    let op = |a: i32, b: i32| a * b;
    let binding = CallbackBinding::new(HostCallback::Operator(&op));
    let closure = binding.closure();
    binding.arm();
    let f: &unsafe extern "C" fn(i32, i32) -> i32 = unsafe { closure.instantiate_code_ptr() };
    assert_eq!(unsafe { f(6, 7) }, 42);
    assert_eq!(binding.invocations(), 1);
    binding.disarm();
}

#[test]
fn test_comparator_trampoline_roundtrip() {
    let cmp = |a: *const c_void, b: *const c_void| -> i32 {
        let (x, y) = unsafe { (*(a as *const i32), *(b as *const i32)) };
        x.cmp(&y) as i32
    };
    let binding = CallbackBinding::new(HostCallback::Comparator(&cmp));
    let closure = binding.closure();
    binding.arm();
    let f: &unsafe extern "C" fn(*const c_void, *const c_void) -> i32 =
        unsafe { closure.instantiate_code_ptr() };
    let (lo, hi) = (1i32, 9i32);
    let a = &lo as *const i32 as *const c_void;
    let b = &hi as *const i32 as *const c_void;
    assert!(unsafe { f(a, b) } < 0);
    assert!(unsafe { f(b, a) } > 0);
    assert_eq!(unsafe { f(a, a) }, 0);
    assert_eq!(binding.invocations(), 3);
    binding.disarm();
}

#[test]
fn test_registry_fixture_table() {
    let registry = fixture_registry();
    for name in [
        "add_i32",
        "add_u64",
        "mul_f32",
        "mul_f64",
        "str_length",
        "echo_string",
        "print_hello",
        "get_version",
        "out_echo_string",
        "apply_i32",
    ] {
        assert!(registry.contains(name), "missing fixture binding '{name}'");
    }
    assert_eq!(sum_i32_array_sig(4).params.len(), 2);
    assert_eq!(fill_seq_i32_sig(4).params.len(), 2);
    assert_eq!(sort_i32_copy_sig(4).params.len(), 4);
}

#[test]
fn test_registry_reregister_identical_is_noop() {
    let registry = BindingRegistry::new();
    let desc = SignatureDescriptor::new("f", vec![ParamKind::I32], ParamKind::Void);
    registry.register(desc.clone());
    registry.register(desc.clone());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("f"), Some(desc));
}

#[test]
#[should_panic(expected = "conflicting signature")]
fn test_registry_conflicting_reregistration_is_fatal() {
    let registry = BindingRegistry::new();
    registry.register(SignatureDescriptor::new("f", vec![ParamKind::I32], ParamKind::Void));
    registry.register(SignatureDescriptor::new("f", vec![ParamKind::U64], ParamKind::Void));
}

#[test]
fn test_platform_lib_name() {
    let name = platform_lib_name("test");
    #[cfg(target_os = "windows")]
    assert_eq!(name, "test.dll");
    #[cfg(target_os = "macos")]
    assert_eq!(name, "libtest.dylib");
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    assert_eq!(name, "libtest.so");
}

#[test]
fn test_finder_passes_paths_through() {
    let finder = LibraryFinder::new(vec![]);
    let found = finder.find("./some/dir/libx.so").unwrap();
    assert_eq!(found.to_str().unwrap(), "./some/dir/libx.so");
}

#[test]
fn test_finder_reports_searched_dirs() {
    let finder = LibraryFinder::new(vec![]);
    let err = finder.find("definitely_not_a_real_library_name").unwrap_err();
    let FindError::NotFound { name, .. } = err;
    assert_eq!(name, "definitely_not_a_real_library_name");
}

#[test]
fn test_stats_counters_move() {
    let before = stats().calls_made;
    let desc = SignatureDescriptor::new("forty_two", vec![], ParamKind::I32);
    let entry = EntryPoint::new(forty_two as *const c_void);
    invoke(entry, &desc, &[]).unwrap();
    assert!(stats().calls_made > before);
}
