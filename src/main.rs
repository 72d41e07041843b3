/// arrayrt - scenario runner replaying container behaviours
use arrayrt::runtime::ops::{change_key_case, intersect_uassoc, ksort, strcasecmp, KeyCase, SortFlags};
use arrayrt::runtime::{dump_with, ArrayBuffer, Cursor, FixedArray};
use arrayrt::{ContainerError, ContainerResult, Handle, Key, RuntimeConfig, Value, ValueStore};
use std::env;
use std::path::Path;
use std::process;
use std::rc::Rc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

type Scenario = fn(&RuntimeConfig) -> ContainerResult<String>;

const SCENARIOS: &[(&str, &str, Scenario)] = &[
    ("reset-alias", "aliased arrays share one internal pointer", reset_alias),
    ("fixed-array", "range/type checks, count vs size, clone isolation", fixed_array),
    ("change-key-case", "change_key_case through a reference", change_key_case_by_ref),
    ("intersect-uassoc", "intersect_uassoc with a referenced element", intersect_with_reference),
    ("store-iterator", "pattern snapshot of the value store, then ksort", store_iterator),
];

fn print_usage() {
    eprintln!("arrayrt v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    arrayrt [OPTIONS] <SCENARIO>...");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help           Print this help message");
    eprintln!("    -v, --version        Print version information");
    eprintln!("    -l, --list           List available scenarios");
    eprintln!("    -c, --config <FILE>  Read configuration from FILE (TOML)");
    eprintln!("    --debug              Log at debug level");
    eprintln!("    --trace              Log at trace level (CoW forks, compaction)");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <SCENARIO>           Scenario name, or 'all'");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    arrayrt reset-alias");
    eprintln!("    arrayrt --trace fixed-array");
    eprintln!("    ARRAYRT_LOG=arrayrt::store=debug arrayrt store-iterator");
}

fn print_version() {
    println!("arrayrt {}", VERSION);
}

fn print_list() {
    for (name, about, _) in SCENARIOS {
        println!("{:<18} {}", name, about);
    }
}

struct Options {
    scenarios: Vec<String>,
    config: Option<String>,
    level: Option<&'static str>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut scenarios = Vec::new();
    let mut config = None;
    let mut level = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-l" | "--list" => {
                print_list();
                process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config file after --config".to_string());
                }
                config = Some(args[i].clone());
            }
            "--debug" => {
                level = level.or(Some("debug"));
            }
            "--trace" => {
                level = Some("trace");
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            "all" => {
                scenarios.extend(SCENARIOS.iter().map(|(name, _, _)| name.to_string()));
            }
            arg => {
                scenarios.push(arg.to_string());
            }
        }
        i += 1;
    }

    Ok(Options {
        scenarios,
        config,
        level,
    })
}

/// `ARRAYRT_LOG` wins over flags, flags win over the config file
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("ARRAYRT_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Scenarios
// ============================================================================

/// `current()` past the end prints as `bool(false)`
fn or_false(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Bool(false))
}

fn buffer_of(handle: &Handle) -> ContainerResult<Rc<ArrayBuffer>> {
    match handle.value() {
        Value::Array(buf) => Ok(buf),
        other => Err(ContainerError::Type(format!(
            "expected array, {} given",
            other.type_name()
        ))),
    }
}

fn reset_alias(config: &RuntimeConfig) -> ContainerResult<String> {
    let dump = |v: &Value| dump_with(v, &config.dump);
    let mut out = String::new();

    let array1 = Handle::new(Value::list([
        Value::from("zero"),
        Value::from("one"),
        Value::from("two"),
    ]));
    out.push_str("-- Initial position of internal pointer --\n");
    out.push_str(&dump(&or_false(array1.current())));

    let mut array2 = Handle::array();
    array2.bind_ref(&array1);
    array1.next();

    out.push_str("-- Position after calling next() --\n");
    out.push_str(&format!("$array1: {}", dump(&or_false(array1.current()))));
    out.push_str(&format!("$array2: {}", dump(&or_false(array2.current()))));

    out.push_str("-- Position after calling reset() --\n");
    out.push_str(&dump(&or_false(array1.reset())));
    out.push_str(&format!("$array1: {}", dump(&or_false(array1.current()))));
    out.push_str(&format!("$array2: {}", dump(&or_false(array2.current()))));
    Ok(out)
}

fn fixed_array(config: &RuntimeConfig) -> ContainerResult<String> {
    let dump = |v: &Value| dump_with(v, &config.dump);
    let mut out = String::new();

    let a = FixedArray::new(0);
    if let Err(e) = a.set(0i64, Value::from("value1")) {
        out.push_str(&format!("Exception: {}\n", e));
    }
    match a.get("asdf") {
        Ok(v) => out.push_str(&dump(&v)),
        Err(e) => out.push_str(&format!("Exception: {}\n", e)),
    }
    if let Err(e) = a.unset(-1i64) {
        out.push_str(&format!("Exception: {}\n", e));
    }
    a.set_size(10);

    for i in 0..4i64 {
        a.set(i, Value::from(format!("value{}", i)))?;
    }
    let reference = Handle::new(Value::from("value4"));
    let mut alias = Handle::new(Value::Null);
    alias.bind_ref(&reference);
    a.set(4i64, reference.value())?;
    reference.assign(Value::from("value5"))?;

    a.unset(1i64)?;
    for i in [0i64, 2, 3, 4] {
        out.push_str(&dump(&a.get(i)?));
    }

    let count = a.count() as i64;
    let size = a.size() as i64;
    out.push_str(&dump(&Value::Int(count)));
    out.push_str(&dump(&Value::Int(size)));
    out.push_str(&dump(&Value::Bool(count == size)));

    let b = a.clone();
    a.set(0i64, Value::from("valueNew"))?;
    out.push_str(&dump(&b.get(0i64)?));
    Ok(out)
}

fn change_key_case_by_ref(config: &RuntimeConfig) -> ContainerResult<String> {
    let dump = |v: &Value| dump_with(v, &config.dump);
    let mut out = String::new();

    let input = Handle::new(Value::from(ArrayBuffer::from_pairs([
        ("one", Value::Int(1)),
        ("two", Value::Int(2)),
        ("ABC", Value::from("xyz")),
    ])));
    let mut new_input = Handle::array();
    new_input.bind_ref(&input);

    let result = change_key_case(&*buffer_of(&new_input)?, KeyCase::Upper);
    out.push_str("Result:\n");
    out.push_str(&dump(&Value::from(result)));
    out.push_str("Original:\n");
    out.push_str(&dump(&input.value()));
    out.push_str("Referenced:\n");
    out.push_str(&dump(&new_input.value()));
    Ok(out)
}

fn intersect_with_reference(config: &RuntimeConfig) -> ContainerResult<String> {
    let dump = |v: &Value| dump_with(v, &config.dump);
    let mut out = String::new();

    let ref_var = Handle::new(Value::from("a"));
    let array1 = Handle::new(Value::list([Value::from("a"), ref_var.value()]));
    let mut array2 = Handle::array();
    array2.set("a", Value::Int(1))?;
    array2.set_ref(0i64, &ref_var)?;

    out.push_str("-- referenced variable has value 'a' --\n");
    let (first, second) = (buffer_of(&array1)?, buffer_of(&array2)?);
    out.push_str(&dump(&Value::from(intersect_uassoc(&first, &[&*second], strcasecmp))));

    ref_var.assign(Value::Int(10))?;
    out.push_str("-- referenced variable changed to 10 --\n");
    out.push_str(&dump(&Value::from(intersect_uassoc(&first, &[&*second], strcasecmp))));

    array2.bind_ref(&array1);
    out.push_str("-- $array2 is a reference to $array1 --\n");
    let (first, second) = (buffer_of(&array1)?, buffer_of(&array2)?);
    out.push_str(&dump(&Value::from(intersect_uassoc(&first, &[&*second], strcasecmp))));
    Ok(out)
}

fn store_iterator(config: &RuntimeConfig) -> ContainerResult<String> {
    let store = ValueStore::with_config(&config.store);
    for i in 0..41 {
        store.store(&format!("key{}", i), &Value::from(format!("value{}", i)))?;
    }

    let mut it = store.iterate("/key[0-9]0/")?;
    let vals = Handle::array();
    it.reset();
    while it.valid() {
        if let (Some(key), Some(info)) = (it.key(), it.current()) {
            let name = info
                .as_array()
                .and_then(|buf| buf.get(&Key::from("key")).ok())
                .unwrap_or(Value::Null);
            vals.set(key, name)?;
        }
        it.next();
    }
    ksort(&vals, SortFlags::Regular)?;
    Ok(dump_with(&vals.value(), &config.dump))
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let config = match &options.config {
        Some(path) => match RuntimeConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };

    init_logging(options.level.unwrap_or(config.log.level.as_str()));

    if options.scenarios.is_empty() {
        eprintln!("Error: Missing scenario name");
        eprintln!();
        print_usage();
        process::exit(1);
    }

    for name in &options.scenarios {
        let Some((_, _, run)) = SCENARIOS.iter().find(|(n, _, _)| *n == name.as_str()) else {
            eprintln!("Error: Unknown scenario: {} (see --list)", name);
            process::exit(1);
        };
        debug!(target: "arrayrt::scenario", scenario = name.as_str(), "Running scenario");
        match run(&config) {
            Ok(output) => {
                println!("*** {} ***", name);
                print!("{}", output);
            }
            Err(e) => {
                eprintln!("Error in {}: {}", name, e);
                process::exit(1);
            }
        }
    }
}
