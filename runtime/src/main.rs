use clap::{Parser as ClapParser, Subcommand};
use num_bigint::BigInt;
use std::process;

use mrt::{
    CompareOp, DisplayValue, Env, EnvCreateInfo, Heap, HeapCreateInfo, IntOp, MethodFn,
    RuntimeError, TypeRegistry, TypeRepr, Value, allocate_instance, boxed, call_virtual, int_add,
    object_init, print, set_slot,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Heap chunk size in bytes (multiple of the page size)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Requests of at least this many bytes get their own chunk
    #[arg(long)]
    large_size: Option<usize>,

    /// Upper bound for mapped heap memory in bytes
    #[arg(long)]
    max_size: Option<usize>,

    /// Initial evaluation stack capacity in words
    #[arg(long, default_value_t = 1024)]
    stack_size: usize,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a two slot instance and call its method through the vtable
    Scenario,
    /// Evaluate one integer operation, e.g. `eval 4611686018427387903 + 1`
    Eval {
        #[arg(allow_hyphen_values = true)]
        left: String,
        op: String,
        #[arg(allow_hyphen_values = true)]
        right: String,
    },
    /// List registered types
    Types,
}

// ── Demo type ─────────────────────────────────────────────────────────

const COUNTER_VALUE: usize = 0;
const COUNTER_NEXT: usize = 1;

/// `self.value + 1`
fn counter_next(env: &mut Env) -> Value {
    let this = env.local(0);
    // SAFETY: dispatched through COUNTER_TYPE, so `this` has both slots
    let value = unsafe { mrt::get_slot(this, COUNTER_VALUE) };
    int_add(env, value, Value::from_i64(1))
}

static COUNTER_VTABLE: [MethodFn; 2] = [object_init, counter_next];
static COUNTER_TYPE: TypeRepr = TypeRepr::new("demo.Counter", 2, &COUNTER_VTABLE);

// ── Commands ──────────────────────────────────────────────────────────

fn run_scenario(env: &mut Env) {
    let counter = allocate_instance(env, &COUNTER_TYPE);
    // SAFETY: freshly allocated COUNTER_TYPE instance
    unsafe {
        set_slot(counter, COUNTER_VALUE, Value::from_i64(41));
        set_slot(counter, 1, Value::NONE);
    }
    let result = call_virtual(env, counter, COUNTER_NEXT, &[]);
    env.call(&[result], print);
}

fn parse_int(env: &mut Env, literal: &str) -> Result<Value, RuntimeError> {
    let n: BigInt = literal
        .parse()
        .map_err(|_| RuntimeError::InvalidInteger(literal.to_owned()))?;
    Ok(boxed::from_bigint(env, n))
}

fn eval(env: &mut Env, left: &str, op: &str, right: &str) -> Result<(), RuntimeError> {
    let l = parse_int(env, left)?;
    let r = parse_int(env, right)?;

    if let Ok(op) = op.parse::<IntOp>() {
        let path = if op.takes_boxed_path(l, r) {
            "boxed"
        } else {
            "fast"
        };
        let result = op.apply(env, l, r);
        println!("{} ({path} path)", DisplayValue(result));
        return Ok(());
    }

    let op: CompareOp = op.parse()?;
    let result = if op.apply(l, r) { "True" } else { "False" };
    println!("{result}");
    Ok(())
}

fn list_types(registry: &TypeRegistry) {
    for ty in registry.types() {
        println!(
            "{:<20} slots: {:<3} methods: {}",
            ty.full_name(),
            ty.num_slots(),
            ty.vtable().len()
        );
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<(), RuntimeError> {
    let settings = HeapCreateInfo {
        chunk_size: cli.chunk_size,
        large_size: cli.large_size,
        max_size: cli.max_size,
    }
    .settings();
    let heap = Heap::init_global(settings)?;

    let registry = TypeRegistry::global();
    registry.insert(&COUNTER_TYPE)?;

    let mut env = Env::new(
        heap,
        &EnvCreateInfo {
            stack_size: cli.stack_size,
            ..EnvCreateInfo::default()
        },
    );

    match cli.command {
        Command::Scenario => run_scenario(&mut env),
        Command::Eval { left, op, right } => eval(&mut env, &left, &op, &right)?,
        Command::Types => list_types(registry),
    }

    env.heap().flush_stats();
    let stats = heap.stats();
    log::info!(
        "heap: {} chunks, {} bytes mapped, {} bytes allocated",
        stats.chunks,
        stats.mapped_bytes,
        stats.allocated_bytes
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
