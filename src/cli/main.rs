//! Command-line interface for calling C functions in shared libraries
//!
//! ```text
//! callbridge [OPTIONS] <LIBRARY> <FUNCTION> (TYPE VALUE)...
//! callbridge -lm -r double sqrt double 16
//! callbridge -r i32 ./libcallbridge.so add_i32 i32 2 i32 3
//! ```
//!
//! Arguments are TYPE VALUE pairs; out-parameter types take no value.
//! Options come before the positional tokens so that negative numbers
//! pass through as values. With `-l`, the library is located by name
//! through the platform search paths and the positional LIBRARY is
//! omitted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use callbridge::bridge::{
    invoke, CallArg, CallResult, LibraryFinder, NativeLibrary, ParamKind, SignatureDescriptor,
    Value,
};
use callbridge::{logging, parse};

#[derive(Parser, Debug)]
#[command(
    name = "callbridge",
    version,
    about = "Call C functions in shared libraries from the command line"
)]
struct Cli {
    /// Library name to search for (e.g. -l m for libm)
    #[arg(short = 'l', long = "lib")]
    lib: Option<String>,

    /// Add a directory to the library search path
    #[arg(short = 'L', long = "lib-path")]
    lib_paths: Vec<PathBuf>,

    /// Return type
    #[arg(short = 'r', long = "ret", default_value = "void")]
    ret: String,

    /// Show what would be executed without calling
    #[arg(long)]
    dry_run: bool,

    /// Output result in JSON format
    #[arg(long)]
    json: bool,

    /// Show detailed information
    #[arg(long)]
    verbose: bool,

    /// <LIBRARY> <FUNCTION> (TYPE VALUE)...
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        logging::init_at(logging::Level::DEBUG);
    } else {
        logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("Error: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut rest: &[String] = &cli.tokens;

    let lib_path: PathBuf = if let Some(name) = &cli.lib {
        LibraryFinder::new(cli.lib_paths.clone())
            .find(name)
            .map_err(|e| e.to_string())?
    } else {
        let Some(first) = rest.first() else {
            return Err("missing required arguments\nUsage: callbridge [OPTIONS] <LIBRARY> <FUNCTION> (TYPE VALUE)...".to_string());
        };
        let path = PathBuf::from(first);
        rest = &rest[1..];
        path
    };

    let Some(function) = rest.first().cloned() else {
        return Err("missing function name".to_string());
    };
    rest = &rest[1..];

    let pairs = parse::parse_args(rest).map_err(|e| e.to_string())?;
    let ret = parse::parse_return_type(&cli.ret).map_err(|e| e.to_string())?;
    let params: Vec<ParamKind> = pairs.iter().map(|(k, _)| k.clone()).collect();
    let desc = SignatureDescriptor::new(function.clone(), params, ret);

    if cli.verbose {
        eprintln!("Library: {}", lib_path.display());
        eprintln!("Function: {}", function);
        eprintln!("Return type: {}", cli.ret);
    }

    if cli.dry_run {
        print_dry_run(&cli, &lib_path, &desc, &pairs);
        return Ok(());
    }

    let library = NativeLibrary::load(&lib_path).map_err(|e| e.to_string())?;
    let entry = library.resolve(&function).map_err(|e| e.to_string())?;

    let args: Vec<CallArg> = pairs
        .iter()
        .map(|(kind, value)| {
            if kind.is_out() && *value == Value::Unit {
                CallArg::Out
            } else {
                CallArg::Value(value.clone())
            }
        })
        .collect();

    let mut result = invoke(entry, &desc, &args).map_err(|e| e.to_string())?;
    print_result(&cli, &lib_path, &desc, &result);

    // Native-owned strings were copied during decode; give them back.
    for handle in result.owned.drain(..) {
        handle.release();
    }
    Ok(())
}

#[derive(Serialize)]
struct ArgumentReport {
    index: usize,
    r#type: String,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct CallReport<'a> {
    library: String,
    function: &'a str,
    return_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<ArgumentReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<ArgumentReport>,
}

fn print_dry_run(cli: &Cli, lib_path: &PathBuf, desc: &SignatureDescriptor, pairs: &[(ParamKind, Value)]) {
    let arguments: Vec<ArgumentReport> = pairs
        .iter()
        .enumerate()
        .map(|(i, (kind, value))| ArgumentReport {
            index: i,
            r#type: kind_label(kind),
            value: json_value(value),
        })
        .collect();

    if cli.json {
        let report = CallReport {
            library: lib_path.display().to_string(),
            function: &desc.name,
            return_type: kind_label(&desc.ret),
            result: None,
            outputs: Vec::new(),
            arguments,
        };
        println!("{}", serde_json::to_string_pretty(&report).expect("report is serializable"));
        return;
    }

    println!("Library:  {}", lib_path.display());
    println!("Function: {}", desc.name);
    println!("Return:   {}", kind_label(&desc.ret));
    if !arguments.is_empty() {
        println!("Arguments:");
        for arg in &arguments {
            println!("  [{}] {} = {}", arg.index, arg.r#type, arg.value);
        }
    }
}

fn print_result(cli: &Cli, lib_path: &PathBuf, desc: &SignatureDescriptor, result: &CallResult) {
    let outputs: Vec<ArgumentReport> = result
        .outputs
        .iter()
        .map(|o| ArgumentReport {
            index: o.index,
            r#type: kind_label(&desc.params[o.index]),
            value: json_value(&o.value),
        })
        .collect();

    if cli.json {
        let report = CallReport {
            library: lib_path.display().to_string(),
            function: &desc.name,
            return_type: kind_label(&desc.ret),
            result: Some(json_value(&result.ret)),
            outputs,
            arguments: Vec::new(),
        };
        println!("{}", serde_json::to_string_pretty(&report).expect("report is serializable"));
        return;
    }

    match &result.ret {
        Value::Unit => {}
        Value::Null => println!("(null)"),
        other => println!("{}", display_value(other)),
    }
    if !outputs.is_empty() {
        println!("Output parameters:");
        for out in &outputs {
            println!("  [{}] {} = {}", out.index, out.r#type, out.value);
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::I32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::USize(v) => v.to_string(),
        Value::Ptr(addr) => format!("{addr:#x}"),
        Value::Str(s) => s.clone(),
        // Display is rendering only; the value itself keeps the raw bytes
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Unit | Value::Null => "(null)".to_string(),
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::I32(v) => serde_json::json!(v),
        Value::U64(v) => serde_json::json!(v),
        Value::F32(v) => serde_json::json!(v),
        Value::F64(v) => serde_json::json!(v),
        Value::USize(v) => serde_json::json!(v),
        Value::Ptr(addr) => serde_json::json!(format!("{addr:#x}")),
        Value::Str(s) => serde_json::json!(s),
        Value::Bytes(b) => serde_json::json!(b),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(json_value).collect())
        }
        Value::Unit | Value::Null => serde_json::Value::Null,
    }
}

fn kind_label(kind: &ParamKind) -> String {
    match kind {
        ParamKind::I32 => "i32".to_string(),
        ParamKind::U64 => "u64".to_string(),
        ParamKind::F32 => "f32".to_string(),
        ParamKind::F64 => "f64".to_string(),
        ParamKind::USize => "usize".to_string(),
        ParamKind::Ptr => "ptr".to_string(),
        ParamKind::Void => "void".to_string(),
        ParamKind::CStr(_) => "cstr".to_string(),
        ParamKind::OutCStr => "out:cstr".to_string(),
        ParamKind::Array(elem, len) => format!("arr:{}[{}]", kind_label(elem), len),
        ParamKind::OutArray(elem, len) => format!("out_arr:{}:{}", kind_label(elem), len),
        ParamKind::OutParam(inner) => format!("out:{}", kind_label(inner)),
        ParamKind::Callback(sig) => format!("callback:{}", sig.name),
    }
}
