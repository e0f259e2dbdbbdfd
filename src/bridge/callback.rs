//! Callback trampolines
//!
//! Exposes a host closure as a native function pointer that is valid for
//! exactly one native call. The binding walks a fixed lifecycle:
//! registered, armed while the native call is in flight, then disarmed.
//! A native invocation outside the armed window is a misuse that aborts
//! the process; unwinding across the C boundary is never an option.

use core::cell::Cell;
use core::ffi::c_void;

use libffi::low::ffi_cif;
use libffi::middle::{Cif, Closure, Type};

use crate::logging;

/// Host logic exposed to native code through a trampoline
#[derive(Clone, Copy)]
pub enum HostCallback<'a> {
    /// Two-argument integer operator: `(i32, i32) -> i32`
    Operator(&'a dyn Fn(i32, i32) -> i32),
    /// qsort-style three-way comparator over two raw element addresses,
    /// returning negative/zero/positive
    Comparator(&'a dyn Fn(*const c_void, *const c_void) -> i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrampolineState {
    Registered,
    Armed,
    Disarmed,
}

/// One host closure paired with one native function pointer
///
/// Created by the invoker immediately before a call and dropped right
/// after it; the trampoline captures no storage of its own, so the native
/// side must not retain the pointer past the call.
pub struct CallbackBinding<'a> {
    host: HostCallback<'a>,
    state: Cell<TrampolineState>,
    invocations: Cell<u32>,
}

impl<'a> CallbackBinding<'a> {
    pub fn new(host: HostCallback<'a>) -> Self {
        Self {
            host,
            state: Cell::new(TrampolineState::Registered),
            invocations: Cell::new(0),
        }
    }

    /// Build the native-callable stub for this binding.
    ///
    /// The returned closure borrows the binding; the code pointer it
    /// exposes dies with it.
    pub fn closure(&self) -> Closure<'_> {
        match self.host {
            HostCallback::Operator(_) => Closure::new(
                Cif::new([Type::i32(), Type::i32()], Type::i32()),
                operator_trampoline,
                self,
            ),
            HostCallback::Comparator(_) => Closure::new(
                Cif::new([Type::pointer(), Type::pointer()], Type::i32()),
                comparator_trampoline,
                self,
            ),
        }
    }

    /// Native call about to start; invocations are honored from here.
    pub(crate) fn arm(&self) {
        debug_assert_eq!(self.state.get(), TrampolineState::Registered);
        self.state.set(TrampolineState::Armed);
    }

    /// Native call returned; any later invocation is fatal.
    pub(crate) fn disarm(&self) {
        self.state.set(TrampolineState::Disarmed);
    }

    /// Times the native side called back during the armed window
    pub fn invocations(&self) -> u32 {
        self.invocations.get()
    }

    /// Invocation gate run on every native entry
    fn enter(&self) {
        if self.state.get() != TrampolineState::Armed {
            logging::error!(
                state = ?self.state.get(),
                "native code invoked a callback outside its armed window"
            );
            std::process::abort();
        }
        self.invocations.set(self.invocations.get() + 1);
    }
}

unsafe extern "C" fn operator_trampoline(
    _cif: &ffi_cif,
    result: &mut i32,
    args: *const *const c_void,
    binding: &CallbackBinding,
) {
    binding.enter();
    let a = unsafe { *(*args as *const i32) };
    let b = unsafe { *(*args.add(1) as *const i32) };
    let f = match binding.host {
        HostCallback::Operator(f) => f,
        HostCallback::Comparator(_) => unreachable!("operator stub bound to comparator logic"),
    };
    logging::log_callback_entry("operator", binding.invocations());
    *result = f(a, b);
}

unsafe extern "C" fn comparator_trampoline(
    _cif: &ffi_cif,
    result: &mut i32,
    args: *const *const c_void,
    binding: &CallbackBinding,
) {
    binding.enter();
    // Each args[i] points at the argument slot; the slots hold the two
    // element addresses qsort hands to a comparator.
    let x = unsafe { *(*args as *const *const c_void) };
    let y = unsafe { *(*args.add(1) as *const *const c_void) };
    let f = match binding.host {
        HostCallback::Comparator(f) => f,
        HostCallback::Operator(_) => unreachable!("comparator stub bound to operator logic"),
    };
    logging::log_callback_entry("comparator", binding.invocations());
    *result = f(x, y);
}
