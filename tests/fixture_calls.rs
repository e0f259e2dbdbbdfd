//! End-to-end validation of the bridge against the native fixture.
//!
//! Entry points are taken from the fixture's in-process function
//! pointers, so every call goes through the full descriptor, marshal,
//! invoke and decode path without a dlopen round-trip. The resolver is
//! exercised separately against a real on-disk system library.

use core::ffi::c_void;

use callbridge::bridge::{
    fill_seq_i32_sig, fixture_registry, invoke, sort_i32_copy_sig, sum_i32_array_sig, CallArg,
    CallError, EntryPoint, HostCallback, MarshalError, NativeLibrary, ParamKind,
    SignatureDescriptor, SymbolError, Value,
};
use callbridge::fixture;

fn desc(name: &str) -> SignatureDescriptor {
    fixture_registry().get(name).expect("fixture binding")
}

fn val(v: Value) -> CallArg<'static> {
    CallArg::Value(v)
}

fn i32s(values: &[i32]) -> Value {
    Value::Array(values.iter().map(|&v| Value::I32(v)).collect())
}

#[test]
fn add_i32_adds() {
    let entry = EntryPoint::new(fixture::add_i32 as *const c_void);
    let result = invoke(entry, &desc("add_i32"), &[val(Value::I32(2)), val(Value::I32(3))]).unwrap();
    assert_eq!(result.ret, Value::I32(5));
    assert!(result.outputs.is_empty());
    assert!(result.owned.is_empty());
}

#[test]
fn add_i32_wraps_on_overflow() {
    let entry = EntryPoint::new(fixture::add_i32 as *const c_void);
    let result = invoke(
        entry,
        &desc("add_i32"),
        &[val(Value::I32(i32::MAX)), val(Value::I32(1))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(i32::MIN));
}

#[test]
fn add_u64_preserves_width() {
    let entry = EntryPoint::new(fixture::add_u64 as *const c_void);
    let big = u64::from(u32::MAX) + 10;
    let result = invoke(
        entry,
        &desc("add_u64"),
        &[val(Value::U64(big)), val(Value::U64(1))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::U64(big + 1));
}

#[test]
fn mul_f32_multiplies() {
    let entry = EntryPoint::new(fixture::mul_f32 as *const c_void);
    let result = invoke(
        entry,
        &desc("mul_f32"),
        &[val(Value::F32(1.5)), val(Value::F32(4.0))],
    )
    .unwrap();
    match result.ret {
        Value::F32(v) => assert!((v - 6.0).abs() < 1e-6),
        other => panic!("unexpected return {other:?}"),
    }
}

#[test]
fn mul_f64_multiplies() {
    let entry = EntryPoint::new(fixture::mul_f64 as *const c_void);
    let result = invoke(
        entry,
        &desc("mul_f64"),
        &[val(Value::F64(2.5)), val(Value::F64(4.0))],
    )
    .unwrap();
    match result.ret {
        Value::F64(v) => assert!((v - 10.0).abs() < 1e-12),
        other => panic!("unexpected return {other:?}"),
    }
}

#[test]
fn str_length_of_null_is_zero() {
    let entry = EntryPoint::new(fixture::str_length as *const c_void);
    let result = invoke(entry, &desc("str_length"), &[val(Value::Null)]).unwrap();
    assert_eq!(result.ret, Value::I32(0));
}

#[test]
fn str_length_counts_bytes() {
    let entry = EntryPoint::new(fixture::str_length as *const c_void);
    let result = invoke(
        entry,
        &desc("str_length"),
        &[val(Value::Str("hello".to_string()))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(5));
}

#[test]
fn embedded_nul_truncates_silently() {
    let entry = EntryPoint::new(fixture::str_length as *const c_void);
    let result = invoke(
        entry,
        &desc("str_length"),
        &[val(Value::Str("ab\0cd".to_string()))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(2));
}

#[test]
fn echo_string_returns_owned_copy() {
    let entry = EntryPoint::new(fixture::echo_string as *const c_void);
    let mut result = invoke(
        entry,
        &desc("echo_string"),
        &[val(Value::Str("round trip".to_string()))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::Str("round trip".to_string()));
    assert_eq!(result.owned.len(), 1);
    result.owned.pop().expect("release obligation").release();
}

#[test]
fn echo_string_preserves_non_utf8_bytes() {
    let entry = EntryPoint::new(fixture::echo_string as *const c_void);
    let raw = vec![0xff_u8, b'o', b'k', 0xfe];
    let mut result = invoke(
        entry,
        &desc("echo_string"),
        &[val(Value::Bytes(raw.clone()))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::Bytes(raw));
    assert_eq!(result.owned.len(), 1);
    result.owned.pop().expect("release obligation").release();
}

#[test]
fn echo_string_null_is_absent_without_obligation() {
    let entry = EntryPoint::new(fixture::echo_string as *const c_void);
    let result = invoke(entry, &desc("echo_string"), &[val(Value::Null)]).unwrap();
    assert_eq!(result.ret, Value::Null);
    assert!(result.owned.is_empty());
}

#[test]
fn print_hello_returns_unit() {
    let entry = EntryPoint::new(fixture::print_hello as *const c_void);
    let result = invoke(entry, &desc("print_hello"), &[]).unwrap();
    assert_eq!(result.ret, Value::Unit);
}

#[test]
fn get_version_fills_both_outputs() {
    let entry = EntryPoint::new(fixture::get_version as *const c_void);
    let result = invoke(entry, &desc("get_version"), &[CallArg::Out, CallArg::Out]).unwrap();
    assert_eq!(result.ret, Value::Unit);
    assert_eq!(result.output(0), Some(&Value::I32(1)));
    assert_eq!(result.output(1), Some(&Value::I32(2)));
}

#[test]
fn get_version_skips_null_outputs() {
    let entry = EntryPoint::new(fixture::get_version as *const c_void);
    let result = invoke(
        entry,
        &desc("get_version"),
        &[val(Value::Null), val(Value::Null)],
    )
    .unwrap();
    assert_eq!(result.ret, Value::Unit);
    assert_eq!(result.output(0), Some(&Value::Null));
    assert_eq!(result.output(1), Some(&Value::Null));
    assert!(result.owned.is_empty());
}

#[test]
fn out_echo_string_fills_out_parameter() {
    let entry = EntryPoint::new(fixture::out_echo_string as *const c_void);
    let mut result = invoke(
        entry,
        &desc("out_echo_string"),
        &[val(Value::Str("copy me".to_string())), CallArg::Out],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&Value::Str("copy me".to_string())));
    assert_eq!(result.owned.len(), 1);
    result.owned.pop().expect("release obligation").release();
}

#[test]
fn out_echo_string_null_input_yields_absent_output() {
    let entry = EntryPoint::new(fixture::out_echo_string as *const c_void);
    let result = invoke(
        entry,
        &desc("out_echo_string"),
        &[val(Value::Null), CallArg::Out],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&Value::Null));
    assert!(result.owned.is_empty());
}

#[test]
fn sum_i32_array_of_null_is_zero() {
    let entry = EntryPoint::new(fixture::sum_i32_array as *const c_void);
    let result = invoke(
        entry,
        &sum_i32_array_sig(5),
        &[val(Value::Null), val(Value::USize(5))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(0));
}

#[test]
fn sum_i32_array_sums() {
    let entry = EntryPoint::new(fixture::sum_i32_array as *const c_void);
    let result = invoke(
        entry,
        &sum_i32_array_sig(3),
        &[val(i32s(&[1, 2, 3])), val(Value::USize(3))],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(6));
}

#[test]
fn array_length_mismatch_is_rejected_before_the_call() {
    let entry = EntryPoint::new(fixture::sum_i32_array as *const c_void);
    let err = invoke(
        entry,
        &sum_i32_array_sig(3),
        &[val(i32s(&[1, 2])), val(Value::USize(3))],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CallError::Marshal(MarshalError::LengthMismatch {
            index: 0,
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn null_for_scalar_is_rejected() {
    let entry = EntryPoint::new(fixture::add_i32 as *const c_void);
    let err = invoke(
        entry,
        &desc("add_i32"),
        &[val(Value::Null), val(Value::I32(1))],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CallError::Marshal(MarshalError::NullNotAllowed { index: 0 })
    ));
}

#[test]
fn fill_seq_i32_writes_sequence() {
    let entry = EntryPoint::new(fixture::fill_seq_i32 as *const c_void);
    let result = invoke(
        entry,
        &fill_seq_i32_sig(5),
        &[CallArg::Out, val(Value::USize(5))],
    )
    .unwrap();
    assert_eq!(result.output(0), Some(&i32s(&[0, 1, 2, 3, 4])));
}

#[test]
fn fill_seq_i32_null_buffer_is_skipped() {
    let entry = EntryPoint::new(fixture::fill_seq_i32 as *const c_void);
    let result = invoke(
        entry,
        &fill_seq_i32_sig(5),
        &[val(Value::Null), val(Value::USize(5))],
    )
    .unwrap();
    assert_eq!(result.output(0), Some(&Value::Null));
}

#[test]
fn apply_i32_null_operator_defaults_to_zero() {
    let entry = EntryPoint::new(fixture::apply_i32 as *const c_void);
    let result = invoke(
        entry,
        &desc("apply_i32"),
        &[val(Value::I32(3)), val(Value::I32(4)), val(Value::Null)],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(0));
}

#[test]
fn apply_i32_calls_back_into_host_operator() {
    let entry = EntryPoint::new(fixture::apply_i32 as *const c_void);
    let add = |a: i32, b: i32| a + b;
    let result = invoke(
        entry,
        &desc("apply_i32"),
        &[
            val(Value::I32(3)),
            val(Value::I32(4)),
            CallArg::Callback(HostCallback::Operator(&add)),
        ],
    )
    .unwrap();
    assert_eq!(result.ret, Value::I32(7));
}

#[test]
fn sort_i32_copy_null_comparator_sorts_ascending() {
    let entry = EntryPoint::new(fixture::sort_i32_copy as *const c_void);
    let result = invoke(
        entry,
        &sort_i32_copy_sig(3),
        &[
            val(i32s(&[3, 1, 2])),
            CallArg::Out,
            val(Value::USize(3)),
            val(Value::Null),
        ],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&i32s(&[1, 2, 3])));
}

#[test]
fn sort_i32_copy_honors_host_comparator() {
    let entry = EntryPoint::new(fixture::sort_i32_copy as *const c_void);
    let descending = |a: *const c_void, b: *const c_void| -> i32 {
        let (x, y) = unsafe { (*(a as *const i32), *(b as *const i32)) };
        y.cmp(&x) as i32
    };
    let result = invoke(
        entry,
        &sort_i32_copy_sig(4),
        &[
            val(i32s(&[3, 1, 4, 2])),
            CallArg::Out,
            val(Value::USize(4)),
            CallArg::Callback(HostCallback::Comparator(&descending)),
        ],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&i32s(&[4, 3, 2, 1])));
}

#[test]
fn sort_i32_copy_zero_length_touches_nothing() {
    let entry = EntryPoint::new(fixture::sort_i32_copy as *const c_void);
    let result = invoke(
        entry,
        &sort_i32_copy_sig(0),
        &[
            val(Value::Array(vec![])),
            CallArg::Out,
            val(Value::USize(0)),
            val(Value::Null),
        ],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&Value::Array(vec![])));
}

#[test]
fn input_and_output_buffers_are_independent() {
    // The input array must be unchanged regardless of how the callee
    // produced the sorted output.
    let entry = EntryPoint::new(fixture::sort_i32_copy as *const c_void);
    let input = i32s(&[9, 7, 8]);
    let result = invoke(
        entry,
        &sort_i32_copy_sig(3),
        &[
            val(input.clone()),
            CallArg::Out,
            val(Value::USize(3)),
            val(Value::Null),
        ],
    )
    .unwrap();
    assert_eq!(result.output(1), Some(&i32s(&[7, 8, 9])));
    assert_eq!(input, i32s(&[9, 7, 8]));
}

#[test]
fn concurrent_invocations_use_independent_scratch() {
    let entry = EntryPoint::new(fixture::sort_i32_copy as *const c_void);
    let handles: Vec<_> = (0..4)
        .map(|t| {
            std::thread::spawn(move || {
                let input: Vec<i32> = (0..8).map(|i| ((i * 7 + t) % 8) as i32).collect();
                let mut expected = input.clone();
                expected.sort_unstable();
                let result = invoke(
                    entry,
                    &sort_i32_copy_sig(8),
                    &[
                        val(i32s(&input)),
                        CallArg::Out,
                        val(Value::USize(8)),
                        val(Value::Null),
                    ],
                )
                .unwrap();
                assert_eq!(result.output(1), Some(&i32s(&expected)));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn stats_count_calls() {
    let before = callbridge::bridge::stats().calls_made;
    let entry = EntryPoint::new(fixture::print_hello as *const c_void);
    invoke(entry, &desc("print_hello"), &[]).unwrap();
    assert!(callbridge::bridge::stats().calls_made > before);
}

// Resolver behavior needs a real on-disk library; probe the C math
// library and skip quietly where it cannot be found.
#[cfg(unix)]
#[test]
fn resolver_is_idempotent_and_reports_missing_symbols() {
    let candidates = ["libm.so.6", "libm.so", "libm.dylib"];
    let Some(lib) = candidates.iter().find_map(|c| NativeLibrary::load(c).ok()) else {
        eprintln!("no loadable libm found, skipping resolver test");
        return;
    };

    let first = lib.resolve("cos").expect("libm exports cos");
    let second = lib.resolve("cos").expect("cached resolution");
    assert_eq!(first.addr(), second.addr());

    let missing = lib.resolve("definitely_not_a_libm_symbol");
    assert!(matches!(missing, Err(SymbolError::NotFound { .. })));

    // Drive a resolved symbol through the full call path.
    let cos_desc = SignatureDescriptor::new("cos", vec![ParamKind::F64], ParamKind::F64);
    let result = invoke(first, &cos_desc, &[val(Value::F64(0.0))]).unwrap();
    match result.ret {
        Value::F64(v) => assert!((v - 1.0).abs() < 1e-12),
        other => panic!("unexpected return {other:?}"),
    }

    // Idempotence of results, not just addresses
    let again = invoke(second, &cos_desc, &[val(Value::F64(0.0))]).unwrap();
    assert_eq!(result.ret, again.ret);
}
