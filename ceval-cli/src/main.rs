#![deny(clippy::all)]

use anyhow::Context as _;
use ceval::{Compiler, Context, PrimitiveType, Runtime, Type, Value};
use serde::Deserialize;
use std::{fs, path::PathBuf, process};
use structopt::StructOpt;

/// Registrations a host would normally wire up in code: the named inputs
/// and constants an expression can reference. Loaded from a JSON file so
/// this demo binary has something to point at without writing Rust.
#[derive(Debug, Default, Deserialize)]
struct ExpressionSpec {
    #[serde(default)]
    inputs: Vec<InputSpec>,
    #[serde(default)]
    consts: Vec<ConstSpec>,
}

#[derive(Debug, Deserialize)]
struct InputSpec {
    name: String,
    #[serde(rename = "type")]
    ty: TypeSpec,
}

#[derive(Debug, Deserialize)]
struct ConstSpec {
    name: String,
    value: ValueSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TypeSpec {
    Number,
    String,
    Bool,
    ArrayNumber,
    ArrayString,
    ArrayBool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ValueSpec {
    Number(f64),
    Bool(bool),
    String(String),
    Array(Vec<ValueSpec>),
}

fn to_type(ty: &TypeSpec) -> Type {
    match ty {
        TypeSpec::Number => Type::NUMBER,
        TypeSpec::String => Type::STRING,
        TypeSpec::Bool => Type::BOOL,
        TypeSpec::ArrayNumber => Type::array(PrimitiveType::Number),
        TypeSpec::ArrayString => Type::array(PrimitiveType::String),
        TypeSpec::ArrayBool => Type::array(PrimitiveType::Bool),
    }
}

fn to_value(spec: &ValueSpec) -> Value {
    match spec {
        ValueSpec::Number(n) => Value::number(*n),
        ValueSpec::Bool(b) => Value::bool(*b),
        ValueSpec::String(s) => Value::string(s.clone()),
        ValueSpec::Array(elems) => Value::array(elems.iter().map(to_value).collect()),
    }
}

/// The sub-command to execute.
#[derive(Debug, StructOpt)]
enum Command {
    /// Compile an expression and report success or the compile error.
    #[structopt(name = "compile")]
    Compile {
        /// Path to a JSON file describing registered inputs/consts. If not
        /// provided, the expression is compiled with nothing registered.
        #[structopt(parse(from_os_str), long = "registrations", short = "r")]
        registrations_path: Option<PathBuf>,
        /// Path to the expression source file.
        #[structopt(parse(from_os_str), long = "source", short = "s")]
        source_path: PathBuf,
    },

    /// Compile an expression and evaluate it against a JSON input vector.
    #[structopt(name = "run")]
    Run {
        /// Path to a JSON file describing registered inputs/consts.
        #[structopt(parse(from_os_str), long = "registrations", short = "r")]
        registrations_path: Option<PathBuf>,
        /// Path to a JSON array of input values, in registration order.
        #[structopt(parse(from_os_str), long = "inputs", short = "i")]
        inputs_path: Option<PathBuf>,
        /// Path to the expression source file.
        #[structopt(parse(from_os_str), long = "source", short = "s")]
        source_path: PathBuf,
        /// Zero-based index of the top-level (`;`-separated) expression to
        /// run.
        #[structopt(long = "expr", default_value = "0")]
        expr_index: usize,
    },
}

/// ceval executable, for compiling and running ceval expressions
#[derive(Debug, StructOpt)]
#[structopt(name = "ceval")]
struct Opt {
    #[structopt(subcommand)]
    cmd: Command,
}

fn read_file(path: &PathBuf) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Loads an [ExpressionSpec] from a file. If the path is `None`, returns
/// the default (no registrations) instead.
fn load_registrations(path: &Option<PathBuf>) -> anyhow::Result<ExpressionSpec> {
    match path {
        None => Ok(ExpressionSpec::default()),
        Some(path) => {
            let text = read_file(path)?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
        }
    }
}

/// Loads a JSON array of input values. If the path is `None`, returns an
/// empty vector (valid only for expressions with no registered inputs).
fn load_inputs(path: &Option<PathBuf>) -> anyhow::Result<Vec<ValueSpec>> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => {
            let text = read_file(path)?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
        }
    }
}

fn build_compiler(spec: &ExpressionSpec) -> anyhow::Result<Compiler> {
    let mut compiler = Compiler::new();
    for input in &spec.inputs {
        compiler
            .register_input(&input.name, to_type(&input.ty))
            .with_context(|| format!("failed to register input `{}`", input.name))?;
    }
    for c in &spec.consts {
        compiler
            .register_const(&c.name, to_value(&c.value))
            .with_context(|| format!("failed to register const `{}`", c.name))?;
    }
    Ok(compiler)
}

fn run(opt: Opt) -> anyhow::Result<()> {
    match opt.cmd {
        Command::Compile {
            registrations_path,
            source_path,
        } => {
            let spec = load_registrations(&registrations_path)?;
            let compiler = build_compiler(&spec)?;
            let source = read_file(&source_path)?;
            let program = compiler.compile(&source)?;
            log::info!(
                "compiled {} top-level expression(s), result type {}",
                program.expr_count(),
                program.result_type()
            );
            println!("OK ({} expression(s))", program.expr_count());
        }

        Command::Run {
            registrations_path,
            inputs_path,
            source_path,
            expr_index,
        } => {
            let spec = load_registrations(&registrations_path)?;
            let compiler = build_compiler(&spec)?;
            let source = read_file(&source_path)?;
            let program = compiler.compile(&source)?;

            let input_specs = load_inputs(&inputs_path)?;
            let inputs: Vec<Value> = input_specs.iter().map(to_value).collect();

            let mut runtime = Runtime::new(&program);
            let result = runtime
                .run(&Context::new(), expr_index, &inputs)
                .with_context(|| format!("evaluating expression {}", expr_index))?;

            println!("{}", result);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
